//! Read-only chain queries: tip, protocol parameters, delegation state, UTXOs.

use crate::client::{parse_json, CliArgs, NodeCli};
use crate::error::NodeError;
use crate::runner::CommandRunner;
use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// Response Types
// =============================================================================

/// `query tip` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tip {
    #[serde(alias = "slotNo")]
    pub slot: u64,
    #[serde(default)]
    pub epoch: Option<u64>,
    #[serde(default, alias = "blockNo")]
    pub block: Option<u64>,
    #[serde(default, alias = "headerHash")]
    pub hash: Option<String>,
    #[serde(default)]
    pub era: Option<String>,
    #[serde(default, rename = "syncProgress")]
    pub sync_progress: Option<String>,
}

/// One entry of the `query stake-address-info` response array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeAddressInfo {
    pub address: String,
    #[serde(rename = "rewardAccountBalance")]
    pub reward_account_balance: u64,
    #[serde(default, alias = "stakeDelegation")]
    pub delegation: Option<String>,
}

// =============================================================================
// Queries
// =============================================================================

impl<R: CommandRunner> NodeCli<R> {
    /// Current chain tip.
    pub async fn query_tip(&self) -> Result<Tip, NodeError> {
        let args = CliArgs::new(&["query", "tip"]).extend(self.network_args());
        let stdout = self.run(args).await?;
        parse_json(&stdout, "query tip")
    }

    /// Write the current protocol parameters to `out_file`.
    pub async fn query_protocol_parameters(&self, out_file: &Path) -> Result<(), NodeError> {
        let args = CliArgs::new(&["query", "protocol-parameters"])
            .extend(self.network_args())
            .path("--out-file", out_file)
            .extend(self.era_args());
        self.run_producing(args, out_file).await
    }

    /// Delegation and reward state of a staking address.
    pub async fn query_stake_address_info(
        &self,
        stake_address: &str,
    ) -> Result<Vec<StakeAddressInfo>, NodeError> {
        let args = CliArgs::new(&["query", "stake-address-info"])
            .extend(self.network_args())
            .flag("--address", stake_address)
            .extend(self.era_args());
        let stdout = self.run(args).await?;
        parse_json(&stdout, "query stake-address-info")
    }

    /// Raw UTXO table for an address (two header lines, one row per output).
    pub async fn query_utxo(&self, address: &str) -> Result<String, NodeError> {
        let args = CliArgs::new(&["query", "utxo"])
            .extend(self.network_args())
            .flag("--address", address)
            .extend(self.era_args());
        self.run(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tip_current_format() {
        let json = r#"{"block": 812, "epoch": 41, "era": "Babbage", "hash": "ab12",
                       "slot": 35410, "syncProgress": "100.00"}"#;
        let tip: Tip = serde_json::from_str(json).unwrap();
        assert_eq!(tip.slot, 35410);
        assert_eq!(tip.epoch, Some(41));
        assert_eq!(tip.sync_progress.as_deref(), Some("100.00"));
    }

    #[test]
    fn test_tip_legacy_format() {
        let json = r#"{"blockNo": 4712, "headerHash": "cd34", "slotNo": 8612201}"#;
        let tip: Tip = serde_json::from_str(json).unwrap();
        assert_eq!(tip.slot, 8612201);
        assert_eq!(tip.block, Some(4712));
        assert_eq!(tip.hash.as_deref(), Some("cd34"));
    }

    #[test]
    fn test_stake_address_info() {
        let json = r#"[{"address": "stake_test1uq", "delegation": "pool1xyz",
                        "rewardAccountBalance": 1234567}]"#;
        let info: Vec<StakeAddressInfo> = serde_json::from_str(json).unwrap();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].reward_account_balance, 1_234_567);
        assert_eq!(info[0].delegation.as_deref(), Some("pool1xyz"));

        let empty: Vec<StakeAddressInfo> = serde_json::from_str("[]").unwrap();
        assert!(empty.is_empty());
    }
}
