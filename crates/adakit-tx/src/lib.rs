//! adakit transaction lifecycle engine.
//!
//! Drives a transaction from loose inputs to an accepted submission:
//!
//! ```text
//! TransactionBuilder --build_raw--> DraftTx --finalize--> FinalTx
//!     --sign/assemble--> SignedTx --submit--> SubmittedTx
//! ```
//!
//! Every transition consumes its input. Bodies are rebuilt, never edited in
//! place. Node calls go through the [`Session`]'s [`NodeCli`](adakit_node::NodeCli).

pub mod session;
pub mod scratch;
pub mod params;
pub mod types;
pub mod builder;
pub mod fee;
pub mod witness;
pub mod submit;

pub use builder::TransactionBuilder;
pub use fee::FeeEstimator;
pub use params::{ProtocolParameterCache, ProtocolParameters};
pub use scratch::ScratchSpace;
pub use session::Session;
pub use submit::SubmissionClient;
pub use types::{DraftTx, FinalTx, SignedTx, SubmittedTx, TxBody, TxBodyFile, WitnessFile};
pub use witness::WitnessCoordinator;

use adakit_node::NodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TxError {
    #[error("validation error: {0}")]
    Validation(String),

    /// A read-only node call failed: queries, build-raw, min-fee, txid.
    #[error("{context} failed: {source}")]
    Query {
        context: String,
        #[source]
        source: NodeError,
    },

    /// Signing, witnessing, assembly or submission was rejected.
    #[error("{context} rejected: {source}")]
    Submission {
        context: String,
        #[source]
        source: NodeError,
    },

    #[error("insufficient inputs: need {need}, have {have}")]
    InsufficientInputs { need: u64, have: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TxError {
    pub(crate) fn query(context: &'static str) -> impl FnOnce(NodeError) -> TxError {
        move |source| TxError::Query {
            context: context.to_string(),
            source,
        }
    }

    pub(crate) fn submission(context: &'static str) -> impl FnOnce(NodeError) -> TxError {
        move |source| TxError::Submission {
            context: context.to_string(),
            source,
        }
    }

    /// Text the node printed when it rejected the call.
    pub fn node_message(&self) -> Option<&str> {
        match self {
            TxError::Query { source, .. } | TxError::Submission { source, .. } => {
                source.node_message()
            }
            _ => None,
        }
    }
}
