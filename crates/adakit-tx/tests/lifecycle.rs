//! Full transaction lifecycle against the in-process fake node.

use adakit_node::FakeNode;
use adakit_tx::{
    Session, SubmissionClient, TransactionBuilder, TxBodyFile, TxError, WitnessCoordinator,
};
use adakit_types::{Network, SessionConfig, TxOut, UnspentOutput};
use std::path::PathBuf;
use tempfile::TempDir;

const TIP: u64 = 50_000;

fn session() -> (TempDir, Session<FakeNode>) {
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig::new(dir.path())
        .with_network(Network::Testnet { magic: 42 })
        .with_scratch_tag("test");
    let session = Session::with_runner(config, FakeNode::new().with_tip(TIP)).unwrap();
    (dir, session)
}

struct Party {
    skey: PathBuf,
    address: String,
}

async fn party(session: &Session<FakeNode>, dir: &TempDir, name: &str) -> Party {
    let vkey = dir.path().join(format!("{name}.payment.vkey"));
    let skey = dir.path().join(format!("{name}.payment.skey"));
    let addr = dir.path().join(format!("{name}.payment.addr"));
    session.node().address_key_gen(&vkey, &skey).await.unwrap();
    session.node().address_build(&vkey, None, &addr).await.unwrap();
    Party {
        skey,
        address: std::fs::read_to_string(addr).unwrap(),
    }
}

fn fund(session: &Session<FakeNode>, party: &Party, amount: u64) -> UnspentOutput {
    session.node().runner().add_utxo(&party.address, amount)
}

fn scratch_entries(dir: &TempDir, ext: &str) -> usize {
    std::fs::read_dir(dir.path().join("tmp"))
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .path()
                .extension()
                .map_or(false, |x| x == ext)
        })
        .count()
}

// ─── Balancing ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_change_scenario_balances_and_submits() {
    let (dir, session) = session();
    let alice = party(&session, &dir, "alice").await;
    let a = fund(&session, &alice, 5_000_000);
    let b = fund(&session, &alice, 3_000_000);

    let draft = TransactionBuilder::new()
        .add_inputs([a, b])
        .add_output(TxOut::new("addr_test1bob", 4_000_000))
        .change_address(alice.address.clone())
        .build_raw(&session)
        .await
        .unwrap();
    assert_eq!(draft.body().validity_upper_bound, TIP + 10_000);

    let final_tx = draft.finalize_with_fee(&session, 180_000).await.unwrap();
    let body = final_tx.body();
    assert_eq!(body.inputs.len(), 2);
    assert_eq!(body.outputs[0], TxOut::new("addr_test1bob", 4_000_000));
    assert_eq!(body.outputs[1], TxOut::new(alice.address.clone(), 3_820_000));
    assert_eq!(body.output_total().map(|o| o + body.fee), body.input_total());

    let signed = WitnessCoordinator::new(&session)
        .sign(&final_tx, &[alice.skey.clone()], None)
        .await
        .unwrap();
    let submitted = SubmissionClient::new(&session).submit(signed).await.unwrap();

    let node = session.node().runner();
    assert_eq!(node.submitted(), vec![submitted.txid.0.clone()]);
    assert_eq!(node.utxos("addr_test1bob")[0].amount, 4_000_000);
    assert_eq!(node.utxos(&alice.address)[0].amount, 3_820_000);
}

#[tokio::test]
async fn test_two_pass_finalize() {
    let (dir, session) = session();
    let alice = party(&session, &dir, "alice").await;
    let utxo = fund(&session, &alice, 20_000_000);

    let draft = TransactionBuilder::new()
        .add_input(utxo)
        .add_output(TxOut::new("addr_test1bob", 1_000_000))
        .change_address(alice.address.clone())
        .build_raw(&session)
        .await
        .unwrap();
    assert_eq!(draft.body().fee, 0);
    let estimate = draft.estimate_fee(&session, 1).await.unwrap();

    let final_tx = draft.finalize(&session, 1).await.unwrap();
    assert_eq!(final_tx.body().fee, estimate);
    assert_eq!(
        final_tx.body().outputs[1].amount,
        20_000_000 - 1_000_000 - estimate
    );

    let node = session.node().runner();
    assert_eq!(node.call_count("transaction build-raw"), 2);
    assert_eq!(node.call_count("query tip"), 2);
    assert_eq!(node.call_count("query protocol-parameters"), 1);
}

#[tokio::test]
async fn test_fee_non_decreasing_in_witnesses() {
    let (dir, session) = session();
    let alice = party(&session, &dir, "alice").await;
    let utxo = fund(&session, &alice, 5_000_000);
    let draft = TransactionBuilder::new()
        .add_input(utxo)
        .add_output(TxOut::new("addr_test1bob", 1_000_000))
        .build_raw(&session)
        .await
        .unwrap();

    let mut last = 0;
    for witnesses in 0..5 {
        let fee = draft.estimate_fee(&session, witnesses).await.unwrap();
        assert!(fee >= last, "fee dropped at {witnesses} witnesses");
        last = fee;
    }
}

// ─── Identifiers and witnesses ──────────────────────────────────────────────

#[tokio::test]
async fn test_txid_stable_and_witness_independent() {
    let (dir, session) = session();
    let alice = party(&session, &dir, "alice").await;
    let utxo = fund(&session, &alice, 5_000_000);
    let final_tx = TransactionBuilder::new()
        .add_input(utxo)
        .add_output(TxOut::new("addr_test1bob", 4_000_000))
        .change_address(alice.address.clone())
        .build_raw(&session)
        .await
        .unwrap()
        .finalize(&session, 1)
        .await
        .unwrap();

    let first = final_tx.txid(&session).await.unwrap();
    assert_eq!(first, final_tx.txid(&session).await.unwrap());

    let coordinator = WitnessCoordinator::new(&session);
    let signed = coordinator
        .sign(&final_tx, &[alice.skey.clone()], None)
        .await
        .unwrap();
    assert_eq!(signed.txid(&session).await.unwrap(), first);

    let witness = coordinator.witness(&final_tx, &alice.skey, None).await.unwrap();
    let assembled = coordinator.assemble(&final_tx, &[witness]).await.unwrap();
    assert_eq!(assembled.txid(&session).await.unwrap(), first);
}

#[tokio::test]
async fn test_multi_party_witness_order_irrelevant() {
    let (dir, session) = session();
    let alice = party(&session, &dir, "alice").await;
    let carol = party(&session, &dir, "carol").await;
    let a = fund(&session, &alice, 6_000_000);
    let c = fund(&session, &carol, 4_000_000);

    let final_tx = TransactionBuilder::new()
        .add_inputs([a, c])
        .add_output(TxOut::new("addr_test1bob", 9_000_000))
        .change_address(alice.address.clone())
        .build_raw(&session)
        .await
        .unwrap()
        .finalize(&session, 2)
        .await
        .unwrap();

    // Carol only learns the body's path.
    let remote_body = TxBodyFile::from_path(final_tx.body_file().path());
    let coordinator = WitnessCoordinator::new(&session);
    let w_alice = coordinator.witness(&final_tx, &alice.skey, None).await.unwrap();
    let w_carol = coordinator.witness(&remote_body, &carol.skey, None).await.unwrap();

    let forward = coordinator
        .assemble(&final_tx, &[w_alice.clone(), w_carol.clone()])
        .await
        .unwrap();
    let reverse = coordinator
        .assemble(&final_tx, &[w_carol, w_alice])
        .await
        .unwrap();
    assert_eq!(
        forward.txid(&session).await.unwrap(),
        reverse.txid(&session).await.unwrap()
    );
    assert_eq!(
        std::fs::read(forward.path()).unwrap(),
        std::fs::read(reverse.path()).unwrap()
    );

    let submitted = SubmissionClient::new(&session).submit(reverse).await.unwrap();
    assert_eq!(submitted.txid, final_tx.txid(&session).await.unwrap());
}

#[tokio::test]
async fn test_mixed_body_witnesses_rejected() {
    let (dir, session) = session();
    let alice = party(&session, &dir, "alice").await;
    let utxo = fund(&session, &alice, 5_000_000);

    let build = |fee| {
        TransactionBuilder::new()
            .add_input(utxo.clone())
            .add_output(TxOut::new("addr_test1bob", 1_000_000))
            .fee(fee)
    };
    let one = build(170_000).build_raw(&session).await.unwrap();
    let two = build(180_000).build_raw(&session).await.unwrap();

    let coordinator = WitnessCoordinator::new(&session);
    let w_one = coordinator.witness(one.body_file(), &alice.skey, None).await.unwrap();
    let w_two = coordinator.witness(two.body_file(), &alice.skey, None).await.unwrap();

    let err = coordinator
        .assemble(one.body_file(), &[w_one, w_two])
        .await
        .unwrap_err();
    assert!(matches!(err, TxError::Submission { .. }));
    assert!(err.node_message().is_some());
}

#[tokio::test]
async fn test_empty_key_and_witness_sets() {
    let (dir, session) = session();
    let alice = party(&session, &dir, "alice").await;
    let utxo = fund(&session, &alice, 5_000_000);
    let draft = TransactionBuilder::new()
        .add_input(utxo)
        .add_output(TxOut::new("addr_test1bob", 1_000_000))
        .build_raw(&session)
        .await
        .unwrap();

    let coordinator = WitnessCoordinator::new(&session);
    assert!(matches!(
        coordinator.sign(draft.body_file(), &[], None).await,
        Err(TxError::Validation(_))
    ));
    assert!(matches!(
        coordinator.assemble(draft.body_file(), &[]).await,
        Err(TxError::Validation(_))
    ));
}

// ─── Failure modes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_empty_inputs_write_nothing() {
    let (dir, session) = session();
    let err = TransactionBuilder::new()
        .add_output(TxOut::new("addr_test1bob", 1_000_000))
        .build_raw(&session)
        .await
        .unwrap_err();
    assert!(matches!(err, TxError::Validation(_)));
    assert_eq!(scratch_entries(&dir, "raw"), 0);
    assert!(session.node().runner().calls().is_empty());
}

#[tokio::test]
async fn test_expired_body_rejected() {
    let (dir, session) = session();
    let alice = party(&session, &dir, "alice").await;
    let utxo = fund(&session, &alice, 5_000_000);
    let final_tx = TransactionBuilder::new()
        .add_input(utxo)
        .add_output(TxOut::new("addr_test1bob", 1_000_000))
        .change_address(alice.address.clone())
        .build_raw(&session)
        .await
        .unwrap()
        .finalize(&session, 1)
        .await
        .unwrap();
    let signed = WitnessCoordinator::new(&session)
        .sign(&final_tx, &[alice.skey.clone()], None)
        .await
        .unwrap();

    session
        .node()
        .runner()
        .set_tip(final_tx.body().validity_upper_bound + 1);
    let err = SubmissionClient::new(&session).submit(signed).await.unwrap_err();
    assert!(matches!(err, TxError::Submission { .. }));
    assert!(err.node_message().unwrap().contains("ExpiredUTxO"));
    assert!(session.node().runner().submitted().is_empty());
}

#[tokio::test]
async fn test_rejection_text_kept_verbatim() {
    let (dir, session) = session();
    let alice = party(&session, &dir, "alice").await;
    let utxo = fund(&session, &alice, 5_000_000);
    let final_tx = TransactionBuilder::new()
        .add_input(utxo)
        .add_output(TxOut::new("addr_test1bob", 1_000_000))
        .change_address(alice.address.clone())
        .build_raw(&session)
        .await
        .unwrap()
        .finalize(&session, 1)
        .await
        .unwrap();
    let signed = WitnessCoordinator::new(&session)
        .sign(&final_tx, &[alice.skey.clone()], None)
        .await
        .unwrap();

    session.node().runner().reject_next_submit("OutsideValidityIntervalUTxO (42)");
    let err = SubmissionClient::new(&session).submit(signed).await.unwrap_err();
    assert!(err.to_string().contains("OutsideValidityIntervalUTxO (42)"));
    assert_eq!(session.node().runner().call_count("transaction submit"), 1);
}

#[tokio::test]
async fn test_horizon_is_configurable() {
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig::new(dir.path()).with_validity_horizon(300);
    let session = Session::with_runner(config, FakeNode::new().with_tip(TIP)).unwrap();
    let utxo = session.node().runner().add_utxo("addr_test1me", 1_000_000);
    let draft = TransactionBuilder::new()
        .add_input(utxo)
        .add_output(TxOut::new("addr_test1bob", 1_000_000))
        .build_raw(&session)
        .await
        .unwrap();
    assert_eq!(draft.body().validity_upper_bound, TIP + 300);
}
