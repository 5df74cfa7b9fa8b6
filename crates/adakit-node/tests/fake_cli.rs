//! Node client round trips against the in-process fake node.

use adakit_node::{BuildRaw, FakeNode, NodeCli, NodeError, TxSource};
use adakit_types::{Network, SessionConfig};
use std::path::{Path, PathBuf};

fn client() -> NodeCli<FakeNode> {
    let config = SessionConfig::default().with_network(Network::Testnet { magic: 42 });
    NodeCli::new(&config, FakeNode::new().with_tip(2_000))
}

struct Keys {
    skey: PathBuf,
    address: String,
}

async fn payment_keys(node: &NodeCli<FakeNode>, dir: &Path, name: &str) -> Keys {
    let vkey = dir.join(format!("{name}.payment.vkey"));
    let skey = dir.join(format!("{name}.payment.skey"));
    let addr = dir.join(format!("{name}.payment.addr"));
    node.address_key_gen(&vkey, &skey).await.unwrap();
    node.address_build(&vkey, None, &addr).await.unwrap();
    Keys {
        skey,
        address: std::fs::read_to_string(&addr).unwrap(),
    }
}

async fn body(node: &NodeCli<FakeNode>, dir: &Path, from: &Keys, to: &str, fee: u64) -> PathBuf {
    let utxo = &node.runner().utxos(&from.address)[0];
    let out_file = dir.join(format!("tx_{fee}.raw"));
    let change = utxo.amount - 1_000_000 - fee;
    node.build_raw(&BuildRaw {
        tx_ins: vec![utxo.tx_in()],
        tx_outs: vec![
            format!("{}+{}", to, 1_000_000),
            format!("{}+{}", from.address, change),
        ],
        invalid_hereafter: 2_000 + 10_000,
        fee,
        out_file: out_file.clone(),
        ..Default::default()
    })
    .await
    .unwrap();
    out_file
}

#[tokio::test]
async fn test_tip_and_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let node = client();
    assert_eq!(node.query_tip().await.unwrap().slot, 2_000);

    let params = dir.path().join("params.json");
    node.query_protocol_parameters(&params).await.unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&params).unwrap()).unwrap();
    assert_eq!(json["txFeePerByte"], 44);
}

#[tokio::test]
async fn test_build_sign_submit() {
    let dir = tempfile::tempdir().unwrap();
    let node = client();
    let alice = payment_keys(&node, dir.path(), "alice").await;
    node.runner().add_utxo(&alice.address, 10_000_000);

    let raw = body(&node, dir.path(), &alice, "addr_test1bob", 0).await;
    let params = dir.path().join("params.json");
    node.query_protocol_parameters(&params).await.unwrap();
    let fee = node.calculate_min_fee(&raw, 1, 2, 1, &params).await.unwrap();
    assert!(fee > 155_381);

    let raw = body(&node, dir.path(), &alice, "addr_test1bob", fee).await;
    let signed = dir.path().join("tx.signed");
    node.sign(&raw, &[alice.skey.clone()], None, &signed).await.unwrap();

    let body_id = node.txid(&TxSource::Body(raw.clone())).await.unwrap();
    let signed_id = node.txid(&TxSource::Signed(signed.clone())).await.unwrap();
    assert_eq!(body_id, signed_id);

    node.submit(&signed).await.unwrap();
    assert_eq!(node.runner().submitted(), vec![body_id.0.clone()]);
    assert_eq!(node.runner().utxos("addr_test1bob")[0].amount, 1_000_000);
    assert_eq!(
        node.runner().utxos(&alice.address)[0].amount,
        10_000_000 - 1_000_000 - fee
    );
}

#[tokio::test]
async fn test_submit_rejects_foreign_signature() {
    let dir = tempfile::tempdir().unwrap();
    let node = client();
    let alice = payment_keys(&node, dir.path(), "alice").await;
    let mallory = payment_keys(&node, dir.path(), "mallory").await;
    node.runner().add_utxo(&alice.address, 10_000_000);

    let raw = body(&node, dir.path(), &alice, &mallory.address, 200_000).await;
    let signed = dir.path().join("tx.signed");
    node.sign(&raw, &[mallory.skey.clone()], None, &signed).await.unwrap();

    let err = node.submit(&signed).await.unwrap_err();
    assert!(err.node_message().unwrap().contains("MissingVKeyWitnesses"));
    assert!(node.runner().submitted().is_empty());
}

#[tokio::test]
async fn test_witness_from_other_body_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let node = client();
    let alice = payment_keys(&node, dir.path(), "alice").await;
    node.runner().add_utxo(&alice.address, 10_000_000);

    let first = body(&node, dir.path(), &alice, "addr_test1bob", 200_000).await;
    let second = body(&node, dir.path(), &alice, "addr_test1bob", 210_000).await;
    let witness = dir.path().join("w.witness");
    node.witness(&first, &alice.skey, None, &witness).await.unwrap();

    let out = dir.path().join("tx.signed");
    let err = node.assemble(&second, &[witness], &out).await.unwrap_err();
    assert!(matches!(err, NodeError::Failed { .. }));
    assert!(!out.exists());
}

#[tokio::test]
async fn test_stake_pool_identity() {
    let dir = tempfile::tempdir().unwrap();
    let node = client();
    let vkey = dir.path().join("p.node.vkey");
    let skey = dir.path().join("p.node.skey");
    let counter = dir.path().join("p.node.counter");
    node.node_key_gen(&vkey, &skey, &counter).await.unwrap();

    let id = node.stake_pool_id(&vkey).await.unwrap();
    assert!(id.starts_with("pool1"));
    assert_eq!(id, node.stake_pool_id(&vkey).await.unwrap());

    let kes_vkey = dir.path().join("p.kes.vkey");
    let kes_skey = dir.path().join("p.kes.skey");
    node.node_key_gen_kes(&kes_vkey, &kes_skey).await.unwrap();
    let cert = dir.path().join("p.node.cert");
    node.node_issue_op_cert(&kes_vkey, &skey, &counter, 3, &cert)
        .await
        .unwrap();
    assert!(cert.exists());
    let counter_text = std::fs::read_to_string(&counter).unwrap();
    assert!(counter_text.contains("Next certificate issue number: 1"));
}
