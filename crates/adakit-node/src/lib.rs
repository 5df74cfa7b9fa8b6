//! adakit node client library.
//!
//! Wraps the ledger node's command-line interface (`cardano-cli` compatible)
//! behind typed async methods: chain queries, key and address management,
//! certificate issue and the transaction surface (build-raw, fee, sign,
//! witness, assemble, submit, txid).
//!
//! Every call spawns one subprocess and waits for it to finish. There are no
//! timeouts and no cancellation.
//!
//! # Example
//!
//! ```ignore
//! use adakit_node::NodeCli;
//! use adakit_types::SessionConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let node = NodeCli::from_config(&SessionConfig::new("/srv/ada"));
//!     let tip = node.query_tip().await.unwrap();
//!     println!("Slot: {}", tip.slot);
//! }
//! ```

pub mod error;
pub mod runner;
pub mod client;
pub mod query;
pub mod keys;
pub mod certificates;
pub mod transaction;
#[cfg(any(test, feature = "fake"))]
pub mod fake;

pub use client::{CliArgs, NodeCli};
pub use error::NodeError;
#[cfg(any(test, feature = "fake"))]
pub use fake::FakeNode;
pub use query::{StakeAddressInfo, Tip};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner};
pub use transaction::{BuildRaw, TxSource};
