//! Key, address and pool identity commands.

use crate::client::{first_token, parse_json, CliArgs, NodeCli};
use crate::error::NodeError;
use crate::runner::CommandRunner;
use std::path::Path;

impl<R: CommandRunner> NodeCli<R> {
    // ─── Payment and stake keys ────────────────────────────────────────────

    /// Generate a payment key pair.
    pub async fn address_key_gen(&self, vkey: &Path, skey: &Path) -> Result<(), NodeError> {
        let args = CliArgs::new(&["address", "key-gen"])
            .path("--verification-key-file", vkey)
            .path("--signing-key-file", skey);
        self.run_producing(args, skey).await
    }

    /// Generate a stake key pair.
    pub async fn stake_address_key_gen(&self, vkey: &Path, skey: &Path) -> Result<(), NodeError> {
        let args = CliArgs::new(&["stake-address", "key-gen"])
            .path("--verification-key-file", vkey)
            .path("--signing-key-file", skey);
        self.run_producing(args, skey).await
    }

    /// Build a payment address, optionally with a stake part.
    pub async fn address_build(
        &self,
        payment_vkey: &Path,
        stake_vkey: Option<&Path>,
        out_file: &Path,
    ) -> Result<(), NodeError> {
        let mut args = CliArgs::new(&["address", "build"])
            .path("--payment-verification-key-file", payment_vkey);
        if let Some(stake_vkey) = stake_vkey {
            args = args.path("--staking-verification-key-file", stake_vkey);
        }
        let args = args
            .path("--out-file", out_file)
            .extend(self.network_args());
        self.run_producing(args, out_file).await
    }

    /// Build a stake (reward) address.
    pub async fn stake_address_build(
        &self,
        stake_vkey: &Path,
        out_file: &Path,
    ) -> Result<(), NodeError> {
        let args = CliArgs::new(&["stake-address", "build"])
            .path("--staking-verification-key-file", stake_vkey)
            .path("--out-file", out_file)
            .extend(self.network_args());
        self.run_producing(args, out_file).await
    }

    pub async fn address_key_hash(&self, payment_vkey: &Path) -> Result<String, NodeError> {
        let args = CliArgs::new(&["address", "key-hash"])
            .path("--payment-verification-key-file", payment_vkey);
        single_value(self.run(args).await?, "address key-hash")
    }

    pub async fn stake_address_key_hash(&self, stake_vkey: &Path) -> Result<String, NodeError> {
        let args = CliArgs::new(&["stake-address", "key-hash"])
            .path("--staking-verification-key-file", stake_vkey);
        single_value(self.run(args).await?, "stake-address key-hash")
    }

    /// Decoded description of an address.
    pub async fn address_info(&self, address: &str) -> Result<serde_json::Value, NodeError> {
        let args = CliArgs::new(&["address", "info"]).flag("--address", address);
        let stdout = self.run(args).await?;
        parse_json(&stdout, "address info")
    }

    /// Address of a native script.
    pub async fn address_build_script(&self, script_file: &Path) -> Result<String, NodeError> {
        let args = CliArgs::new(&["address", "build-script"])
            .path("--script-file", script_file)
            .extend(self.network_args());
        single_value(self.run(args).await?, "address build-script")
    }

    // ─── Pool keys ─────────────────────────────────────────────────────────

    /// Generate cold keys and the operational certificate issue counter.
    pub async fn node_key_gen(
        &self,
        cold_vkey: &Path,
        cold_skey: &Path,
        counter: &Path,
    ) -> Result<(), NodeError> {
        let args = CliArgs::new(&["node", "key-gen"])
            .path("--cold-verification-key-file", cold_vkey)
            .path("--cold-signing-key-file", cold_skey)
            .path("--operational-certificate-issue-counter", counter);
        self.run_producing(args, cold_skey).await
    }

    pub async fn node_key_gen_kes(&self, vkey: &Path, skey: &Path) -> Result<(), NodeError> {
        let args = CliArgs::new(&["node", "key-gen-KES"])
            .path("--verification-key-file", vkey)
            .path("--signing-key-file", skey);
        self.run_producing(args, skey).await
    }

    pub async fn node_key_gen_vrf(&self, vkey: &Path, skey: &Path) -> Result<(), NodeError> {
        let args = CliArgs::new(&["node", "key-gen-VRF"])
            .path("--verification-key-file", vkey)
            .path("--signing-key-file", skey);
        self.run_producing(args, skey).await
    }

    /// Issue an operational certificate, bumping the issue counter.
    pub async fn node_issue_op_cert(
        &self,
        kes_vkey: &Path,
        cold_skey: &Path,
        counter: &Path,
        kes_period: u64,
        out_file: &Path,
    ) -> Result<(), NodeError> {
        let args = CliArgs::new(&["node", "issue-op-cert"])
            .path("--kes-verification-key-file", kes_vkey)
            .path("--cold-signing-key-file", cold_skey)
            .path("--operational-certificate-issue-counter", counter)
            .flag("--kes-period", kes_period)
            .path("--out-file", out_file);
        self.run_producing(args, out_file).await
    }

    /// Pool id derived from the cold verification key.
    pub async fn stake_pool_id(&self, cold_vkey: &Path) -> Result<String, NodeError> {
        let args = CliArgs::new(&["stake-pool", "id"])
            .path("--cold-verification-key-file", cold_vkey);
        single_value(self.run(args).await?, "stake-pool id")
    }

    /// Hash of a pool metadata document.
    pub async fn stake_pool_metadata_hash(&self, metadata_file: &Path) -> Result<String, NodeError> {
        let args = CliArgs::new(&["stake-pool", "metadata-hash"])
            .path("--pool-metadata-file", metadata_file);
        single_value(self.run(args).await?, "stake-pool metadata-hash")
    }
}

fn single_value(stdout: String, context: &str) -> Result<String, NodeError> {
    first_token(&stdout)
        .map(str::to_string)
        .ok_or_else(|| NodeError::Parse(format!("{}: empty output", context)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_value() {
        assert_eq!(single_value("pool1abc\n".into(), "id").unwrap(), "pool1abc");
        assert!(matches!(
            single_value("\n".into(), "id"),
            Err(NodeError::Parse(_))
        ));
    }
}
