//! Core types and constants for adakit.
//!
//! This crate provides the foundational types used across all adakit crates:
//! network and era selection, lovelace amount handling, unspent outputs and
//! transaction outputs, certificate descriptions, artifact addressing and the
//! immutable session configuration.

pub mod amount;
pub mod artifact;
pub mod certificate;
pub mod config;
pub mod constants;
pub mod utxo;

pub use artifact::{ArtifactId, EntityKind, Role};
pub use certificate::{Certificate, CertificateKind, Margin, PoolRegistration, Relay};
pub use config::SessionConfig;
pub use constants::{Era, Network};
pub use utxo::{TxId, TxOut, UnspentOutput, Withdrawal};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid margin: {0}")]
    InvalidMargin(String),

    #[error("unknown network: {0} (use mainnet, preprod, preview or a testnet magic number)")]
    UnknownNetwork(String),

    #[error("unknown era: {0}")]
    UnknownEra(String),

    #[error("invalid relay: {0} (use host:port or multi:dns-name)")]
    InvalidRelay(String),

    #[error("invalid output reference: {0}")]
    InvalidOutputRef(String),
}
