//! Lifecycle states and the artifacts they carry.

use crate::builder::{sum, TransactionBuilder};
use crate::session::Session;
use crate::TxError;
use adakit_node::{CommandRunner, TxSource};
use adakit_types::{Certificate, TxId, TxOut, UnspentOutput, Withdrawal};
use std::path::{Path, PathBuf};

/// Logical content of a raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxBody {
    pub inputs: Vec<UnspentOutput>,
    pub outputs: Vec<TxOut>,
    pub certificates: Vec<Certificate>,
    pub withdrawal: Option<Withdrawal>,
    pub fee: u64,
    /// Last slot at which the body is valid (exclusive).
    pub validity_upper_bound: u64,
}

impl TxBody {
    /// Sum of input amounts; `None` on overflow.
    pub fn input_total(&self) -> Option<u64> {
        sum(self.inputs.iter().map(|u| u.amount))
    }

    /// Sum of output amounts; `None` on overflow.
    pub fn output_total(&self) -> Option<u64> {
        sum(self.outputs.iter().map(|o| o.amount))
    }

    pub fn withdrawal_amount(&self) -> u64 {
        self.withdrawal.as_ref().map(|w| w.amount).unwrap_or(0)
    }
}

/// Path to a body artifact. All a remote signer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxBodyFile {
    path: PathBuf,
}

impl TxBodyFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AsRef<TxBodyFile> for TxBodyFile {
    fn as_ref(&self) -> &TxBodyFile {
        self
    }
}

/// Body built with a provisional fee.
#[derive(Debug)]
pub struct DraftTx {
    pub(crate) body: TxBody,
    pub(crate) file: TxBodyFile,
    pub(crate) template: TransactionBuilder,
}

impl DraftTx {
    pub fn body(&self) -> &TxBody {
        &self.body
    }

    pub fn body_file(&self) -> &TxBodyFile {
        &self.file
    }

    /// Minimum fee of this body with `witness_count` witnesses.
    pub async fn estimate_fee<R: CommandRunner>(
        &self,
        session: &Session<R>,
        witness_count: usize,
    ) -> Result<u64, TxError> {
        crate::fee::FeeEstimator::new(session)
            .estimate(
                &self.file,
                self.body.inputs.len(),
                self.body.outputs.len(),
                witness_count,
            )
            .await
    }

    /// Estimate the fee, then rebuild the body from scratch with it.
    pub async fn finalize<R: CommandRunner>(
        self,
        session: &Session<R>,
        witness_count: usize,
    ) -> Result<FinalTx, TxError> {
        let fee = self.estimate_fee(session, witness_count).await?;
        self.finalize_with_fee(session, fee).await
    }

    /// Rebuild the body with a fee the caller already knows.
    pub async fn finalize_with_fee<R: CommandRunner>(
        self,
        session: &Session<R>,
        fee: u64,
    ) -> Result<FinalTx, TxError> {
        let rebuilt = self.template.fee(fee).build_raw(session).await?;
        log::info!(
            "fee finalized at {} lovelace: {}",
            fee,
            rebuilt.file.path().display()
        );
        Ok(FinalTx {
            body: rebuilt.body,
            file: rebuilt.file,
        })
    }

    pub async fn txid<R: CommandRunner>(&self, session: &Session<R>) -> Result<TxId, TxError> {
        session.txid(&TxSource::Body(self.file.path.clone())).await
    }
}

/// Body whose fee has been computed; ready for witnessing.
#[derive(Debug, Clone)]
pub struct FinalTx {
    body: TxBody,
    file: TxBodyFile,
}

impl FinalTx {
    pub fn body(&self) -> &TxBody {
        &self.body
    }

    pub fn body_file(&self) -> &TxBodyFile {
        &self.file
    }

    pub async fn txid<R: CommandRunner>(&self, session: &Session<R>) -> Result<TxId, TxError> {
        session.txid(&TxSource::Body(self.file.path.clone())).await
    }
}

impl AsRef<TxBodyFile> for FinalTx {
    fn as_ref(&self) -> &TxBodyFile {
        &self.file
    }
}

/// Detached witness produced by one signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessFile {
    path: PathBuf,
}

impl WitnessFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Fully witnessed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    path: PathBuf,
}

impl SignedTx {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn txid<R: CommandRunner>(&self, session: &Session<R>) -> Result<TxId, TxError> {
        session.txid(&TxSource::Signed(self.path.clone())).await
    }
}

/// Transaction accepted by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTx {
    pub txid: TxId,
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(inputs: &[u64], outputs: &[u64]) -> TxBody {
        TxBody {
            inputs: inputs
                .iter()
                .enumerate()
                .map(|(i, &amount)| UnspentOutput::new("ab", i as u32, amount))
                .collect(),
            outputs: outputs
                .iter()
                .map(|&amount| TxOut::new("addr_test1x", amount))
                .collect(),
            certificates: Vec::new(),
            withdrawal: None,
            fee: 0,
            validity_upper_bound: 0,
        }
    }

    #[test]
    fn test_totals() {
        let b = body(&[5_000_000, 3_000_000], &[4_000_000, 3_820_000]);
        assert_eq!(b.input_total(), Some(8_000_000));
        assert_eq!(b.output_total(), Some(7_820_000));
        assert_eq!(body(&[], &[]).input_total(), Some(0));
    }

    #[test]
    fn test_totals_overflow() {
        let b = body(&[u64::MAX, 1], &[u64::MAX, u64::MAX]);
        assert_eq!(b.input_total(), None);
        assert_eq!(b.output_total(), None);
    }
}
