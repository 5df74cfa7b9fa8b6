//! Transaction commands: build-raw, min-fee, sign, witness, assemble, submit, txid.

use crate::client::{first_token, CliArgs, NodeCli};
use crate::error::NodeError;
use crate::runner::CommandRunner;
use adakit_types::TxId;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Arguments of `transaction build-raw`, already rendered to node notation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRaw {
    /// `hash#index` references.
    pub tx_ins: Vec<String>,
    /// `address+amount` outputs.
    pub tx_outs: Vec<String>,
    pub certificate_files: Vec<PathBuf>,
    /// `stake_address+amount`.
    pub withdrawal: Option<String>,
    pub invalid_hereafter: u64,
    pub fee: u64,
    pub out_file: PathBuf,
}

/// What a transaction id is computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxSource {
    /// Unsigned body file.
    Body(PathBuf),
    /// Signed transaction file.
    Signed(PathBuf),
}

impl<R: CommandRunner> NodeCli<R> {
    /// Write a raw transaction body.
    pub async fn build_raw(&self, build: &BuildRaw) -> Result<(), NodeError> {
        let args = CliArgs::new(&["transaction", "build-raw"])
            .repeated("--tx-in", &build.tx_ins)
            .repeated("--tx-out", &build.tx_outs)
            .repeated(
                "--certificate-file",
                build.certificate_files.iter().map(|p| p.display()),
            )
            .repeated("--withdrawal", &build.withdrawal)
            .flag("--invalid-hereafter", build.invalid_hereafter)
            .flag("--fee", build.fee)
            .path("--out-file", &build.out_file)
            .extend(self.era_args());
        self.run_producing(args, &build.out_file).await
    }

    /// Minimum fee for a body with the given shape, in lovelace.
    pub async fn calculate_min_fee(
        &self,
        body_file: &Path,
        tx_in_count: usize,
        tx_out_count: usize,
        witness_count: usize,
        protocol_params_file: &Path,
    ) -> Result<u64, NodeError> {
        let args = CliArgs::new(&["transaction", "calculate-min-fee"])
            .path("--tx-body-file", body_file)
            .flag("--tx-in-count", tx_in_count)
            .flag("--tx-out-count", tx_out_count)
            .extend(self.network_args())
            .flag("--witness-count", witness_count)
            .path("--protocol-params-file", protocol_params_file);
        parse_min_fee(&self.run(args).await?)
    }

    /// Sign a body with every key in one pass.
    pub async fn sign(
        &self,
        body_file: &Path,
        signing_keys: &[PathBuf],
        script_file: Option<&Path>,
        out_file: &Path,
    ) -> Result<(), NodeError> {
        let args = CliArgs::new(&["transaction", "sign"])
            .path("--tx-body-file", body_file)
            .repeated("--script-file", script_file.map(|p| p.display()))
            .extend(self.network_args())
            .repeated(
                "--signing-key-file",
                signing_keys.iter().map(|p| p.display()),
            )
            .path("--out-file", out_file);
        self.run_producing(args, out_file).await
    }

    /// Produce one detached witness.
    pub async fn witness(
        &self,
        body_file: &Path,
        signing_key: &Path,
        script_file: Option<&Path>,
        out_file: &Path,
    ) -> Result<(), NodeError> {
        let args = CliArgs::new(&["transaction", "witness"])
            .path("--tx-body-file", body_file)
            .repeated("--script-file", script_file.map(|p| p.display()))
            .extend(self.network_args())
            .path("--signing-key-file", signing_key)
            .path("--out-file", out_file);
        self.run_producing(args, out_file).await
    }

    /// Combine a body with detached witnesses.
    pub async fn assemble(
        &self,
        body_file: &Path,
        witness_files: &[PathBuf],
        out_file: &Path,
    ) -> Result<(), NodeError> {
        let args = CliArgs::new(&["transaction", "assemble"])
            .path("--tx-body-file", body_file)
            .repeated(
                "--witness-file",
                witness_files.iter().map(|p| p.display()),
            )
            .path("--out-file", out_file);
        self.run_producing(args, out_file).await
    }

    /// Submit a signed transaction.
    pub async fn submit(&self, tx_file: &Path) -> Result<(), NodeError> {
        let args = CliArgs::new(&["transaction", "submit"])
            .extend(self.network_args())
            .path("--tx-file", tx_file);
        self.run(args).await.map(|_| ())
    }

    pub async fn txid(&self, source: &TxSource) -> Result<TxId, NodeError> {
        let args = match source {
            TxSource::Body(path) => {
                CliArgs::new(&["transaction", "txid"]).path("--tx-body-file", path)
            }
            TxSource::Signed(path) => {
                CliArgs::new(&["transaction", "txid"]).path("--tx-file", path)
            }
        };
        parse_txid(&self.run(args).await?)
    }
}

// ─── Response parsing ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct FeeJson {
    fee: u64,
}

#[derive(Deserialize)]
struct TxIdJson {
    txhash: String,
}

/// Accepts `"171793 Lovelace"` or `{"fee": 171793}`.
pub(crate) fn parse_min_fee(stdout: &str) -> Result<u64, NodeError> {
    let trimmed = stdout.trim();
    if trimmed.starts_with('{') {
        return serde_json::from_str::<FeeJson>(trimmed)
            .map(|f| f.fee)
            .map_err(|e| NodeError::Json {
                context: "transaction calculate-min-fee".to_string(),
                source: e,
            });
    }
    first_token(trimmed)
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| NodeError::Parse(format!("unrecognised fee output: {:?}", trimmed)))
}

/// Accepts a bare hex id or `{"txhash": "..."}`.
pub(crate) fn parse_txid(stdout: &str) -> Result<TxId, NodeError> {
    let trimmed = stdout.trim();
    let id = if trimmed.starts_with('{') {
        serde_json::from_str::<TxIdJson>(trimmed)
            .map_err(|e| NodeError::Json {
                context: "transaction txid".to_string(),
                source: e,
            })?
            .txhash
    } else {
        first_token(trimmed).unwrap_or_default().to_string()
    };
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(NodeError::Parse(format!("unrecognised txid output: {:?}", trimmed)));
    }
    Ok(TxId(id.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_min_fee_text() {
        assert_eq!(parse_min_fee("171793 Lovelace\n").unwrap(), 171_793);
    }

    #[test]
    fn test_parse_min_fee_json() {
        assert_eq!(parse_min_fee("{\"fee\": 200001}\n").unwrap(), 200_001);
    }

    #[test]
    fn test_parse_min_fee_garbage() {
        assert!(parse_min_fee("Lovelace").is_err());
        assert!(parse_min_fee("").is_err());
    }

    #[test]
    fn test_parse_txid_forms() {
        let hex = "4b0a47f2b6ad0c5a7a3c4a1b8d1d5b8e2f8e0f3a9b6d7e1c2a3b4c5d6e7f8091";
        assert_eq!(parse_txid(&format!("{}\n", hex)).unwrap().as_str(), hex);
        let json = format!("{{\"txhash\": \"{}\"}}", hex);
        assert_eq!(parse_txid(&json).unwrap().as_str(), hex);
        assert!(parse_txid("not-a-hash").is_err());
        assert!(parse_txid("  ").is_err());
    }
}
