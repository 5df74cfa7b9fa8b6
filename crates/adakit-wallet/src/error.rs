//! Wallet error types.

use adakit_node::NodeError;
use adakit_tx::TxError;
use adakit_types::{EntityKind, Role};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("{context} failed: {source}")]
    Query {
        context: String,
        #[source]
        source: NodeError,
    },

    #[error("{role} of {kind} {name} not found at {}", .path.display())]
    ArtifactNotFound {
        kind: EntityKind,
        name: String,
        role: Role,
        path: PathBuf,
    },

    #[error("insufficient balance: need {need}, have {have}")]
    InsufficientBalance { need: u64, have: u64 },

    #[error("staking key not registered: {0}")]
    NotRegistered(String),

    #[error(transparent)]
    Tx(#[from] TxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WalletError {
    pub(crate) fn query(context: &'static str) -> impl FnOnce(NodeError) -> WalletError {
        move |source| WalletError::Query {
            context: context.to_string(),
            source,
        }
    }
}
