//! Protocol parameter snapshot and its per-session cache.

use crate::TxError;
use adakit_node::{CommandRunner, NodeCli, NodeError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Prefix of the per-session snapshot file in the scratch directory.
pub const PARAMS_PREFIX: &str = "protocol-parameters";

/// Structured view of the parameters the engine uses. Every other field is
/// kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolParameters {
    /// Linear fee coefficient, lovelace per byte.
    #[serde(rename = "txFeePerByte", alias = "minFeeA")]
    pub tx_fee_per_byte: u64,
    /// Constant fee term, lovelace.
    #[serde(rename = "txFeeFixed", alias = "minFeeB")]
    pub tx_fee_fixed: u64,
    #[serde(rename = "maxTxSize", default)]
    pub max_tx_size: Option<u64>,
    #[serde(rename = "stakeAddressDeposit", alias = "keyDeposit", default)]
    pub stake_address_deposit: u64,
    #[serde(rename = "stakePoolDeposit", alias = "poolDeposit", default)]
    pub stake_pool_deposit: u64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProtocolParameters {
    pub fn from_json(text: &str) -> Result<Self, NodeError> {
        serde_json::from_str(text).map_err(|e| NodeError::Json {
            context: "protocol parameters".to_string(),
            source: e,
        })
    }
}

/// Holds at most one snapshot per session.
///
/// `refresh` is the only path that queries the node; `current` delegates to
/// it exactly when nothing is held yet.
pub struct ProtocolParameterCache {
    path: PathBuf,
    snapshot: Mutex<Option<ProtocolParameters>>,
}

impl ProtocolParameterCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            snapshot: Mutex::new(None),
        }
    }

    /// File the fee calculation reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Held snapshot, without fetching.
    pub fn cached(&self) -> Option<ProtocolParameters> {
        self.snapshot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Query the node, persist the snapshot and replace the held value.
    pub async fn refresh<R: CommandRunner>(
        &self,
        node: &NodeCli<R>,
    ) -> Result<ProtocolParameters, TxError> {
        node.query_protocol_parameters(&self.path)
            .await
            .map_err(TxError::query("query protocol-parameters"))?;
        let text = tokio::fs::read_to_string(&self.path).await?;
        let params = ProtocolParameters::from_json(&text)
            .map_err(TxError::query("query protocol-parameters"))?;

        log::info!(
            "protocol parameters refreshed (fee {} * size + {})",
            params.tx_fee_per_byte,
            params.tx_fee_fixed
        );
        *self.snapshot.lock().unwrap_or_else(|e| e.into_inner()) = Some(params.clone());
        Ok(params)
    }

    /// Held snapshot, fetched on first use.
    pub async fn current<R: CommandRunner>(
        &self,
        node: &NodeCli<R>,
    ) -> Result<ProtocolParameters, TxError> {
        match self.cached() {
            Some(params) => Ok(params),
            None => self.refresh(node).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_current_names() {
        let json = r#"{
            "txFeePerByte": 44, "txFeeFixed": 155381, "maxTxSize": 16384,
            "stakeAddressDeposit": 2000000, "stakePoolDeposit": 500000000,
            "collateralPercentage": 150
        }"#;
        let p = ProtocolParameters::from_json(json).unwrap();
        assert_eq!(p.tx_fee_per_byte, 44);
        assert_eq!(p.tx_fee_fixed, 155_381);
        assert_eq!(p.max_tx_size, Some(16384));
        assert_eq!(p.stake_pool_deposit, 500_000_000);
        assert_eq!(p.extra["collateralPercentage"], 150);
    }

    #[test]
    fn test_parse_legacy_names() {
        let json = r#"{"minFeeA": 44, "minFeeB": 155381, "keyDeposit": 2000000, "poolDeposit": 500000000}"#;
        let p = ProtocolParameters::from_json(json).unwrap();
        assert_eq!(p.tx_fee_fixed, 155_381);
        assert_eq!(p.stake_address_deposit, 2_000_000);
        assert!(p.max_tx_size.is_none());
    }

    #[test]
    fn test_missing_fee_terms_rejected() {
        assert!(ProtocolParameters::from_json(r#"{"maxTxSize": 1}"#).is_err());
    }

    #[test]
    fn test_cache_starts_empty() {
        let cache = ProtocolParameterCache::new("/w/tmp/protocol-parameters.json");
        assert!(cache.cached().is_none());
        assert_eq!(cache.path(), Path::new("/w/tmp/protocol-parameters.json"));
    }
}
