//! Live node integration tests.
//!
//! Run with: cargo test -p adakit-node --test live_node -- --ignored
//!
//! Requires `cardano-cli` on PATH and CARDANO_NODE_SOCKET_PATH pointing at a
//! synced preprod node.

use adakit_node::NodeCli;
use adakit_types::{Network, SessionConfig};

fn node() -> NodeCli {
    let mut config = SessionConfig::default().with_network(Network::Testnet { magic: 1 });
    if let Ok(socket) = std::env::var("CARDANO_NODE_SOCKET_PATH") {
        config = config.with_socket_path(socket);
    }
    NodeCli::from_config(&config)
}

#[tokio::test]
#[ignore]
async fn test_live_tip() {
    let tip = node().query_tip().await.expect("query tip failed");
    assert!(tip.slot > 0);
    println!("Tip slot: {} epoch: {:?}", tip.slot, tip.epoch);
}

#[tokio::test]
#[ignore]
async fn test_live_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("protocol-parameters.json");
    node()
        .query_protocol_parameters(&out)
        .await
        .expect("query protocol-parameters failed");
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert!(json.get("txFeePerByte").is_some() || json.get("minFeeA").is_some());
}
