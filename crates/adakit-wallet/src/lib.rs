//! adakit wallet core.
//!
//! Wallet and pool identities on top of the transaction engine: the
//! filesystem artifact registry, UTXO listing and selection, certificate
//! issue, key management and the end-to-end flows (send, reward
//! withdrawal, certificate submission).

pub mod error;
pub mod registry;
pub mod utxo;
pub mod certificate;
pub mod keys;
pub mod wallet;
pub mod transfer;

pub use certificate::{CertificateBuilder, PoolRegistrationRequest};
pub use error::WalletError;
pub use keys::{KeyManager, OpCert, WalletAddresses};
pub use registry::{ArtifactRegistry, FsRegistry};
pub use utxo::{SelectionResult, SelectionStrategy, UtxoSelector};
pub use wallet::{PoolIdentity, RewardBalance, Wallet, WalletIdentity};
