//! Certificate issue commands.

use crate::client::{CliArgs, NodeCli};
use crate::error::NodeError;
use crate::runner::CommandRunner;
use adakit_types::PoolRegistration;
use std::path::Path;

impl<R: CommandRunner> NodeCli<R> {
    pub async fn stake_registration_certificate(
        &self,
        stake_vkey: &Path,
        out_file: &Path,
    ) -> Result<(), NodeError> {
        let args = CliArgs::new(&["stake-address", "registration-certificate"])
            .path("--staking-verification-key-file", stake_vkey)
            .path("--out-file", out_file);
        self.run_producing(args, out_file).await
    }

    pub async fn stake_deregistration_certificate(
        &self,
        stake_vkey: &Path,
        out_file: &Path,
    ) -> Result<(), NodeError> {
        let args = CliArgs::new(&["stake-address", "deregistration-certificate"])
            .path("--staking-verification-key-file", stake_vkey)
            .path("--out-file", out_file);
        self.run_producing(args, out_file).await
    }

    /// Delegate the stake key to `pool_id`.
    pub async fn stake_delegation_certificate(
        &self,
        stake_vkey: &Path,
        pool_id: &str,
        out_file: &Path,
    ) -> Result<(), NodeError> {
        let args = CliArgs::new(&["stake-address", "delegation-certificate"])
            .path("--staking-verification-key-file", stake_vkey)
            .flag("--stake-pool-id", pool_id)
            .path("--out-file", out_file);
        self.run_producing(args, out_file).await
    }

    /// Register (or re-register) a stake pool.
    pub async fn pool_registration_certificate(
        &self,
        cold_vkey: &Path,
        vrf_vkey: &Path,
        registration: &PoolRegistration,
        out_file: &Path,
    ) -> Result<(), NodeError> {
        let mut args = CliArgs::new(&["stake-pool", "registration-certificate"])
            .path("--cold-verification-key-file", cold_vkey)
            .path("--vrf-verification-key-file", vrf_vkey)
            .flag("--pool-pledge", registration.pledge)
            .flag("--pool-cost", registration.cost)
            .flag("--pool-margin", registration.margin)
            .path(
                "--pool-reward-account-verification-key-file",
                &registration.reward_account,
            )
            .repeated(
                "--pool-owner-stake-verification-key-file",
                registration.owners.iter().map(|p| p.display()),
            );
        for relay in &registration.relays {
            args = args.extend(relay.cli_args());
        }
        let args = args
            .extend(self.network_args())
            .flag("--metadata-url", &registration.metadata_url)
            .flag("--metadata-hash", &registration.metadata_hash)
            .path("--out-file", out_file);
        self.run_producing(args, out_file).await
    }

    /// Retire the pool at the start of `epoch`.
    pub async fn pool_deregistration_certificate(
        &self,
        cold_vkey: &Path,
        epoch: u64,
        out_file: &Path,
    ) -> Result<(), NodeError> {
        let args = CliArgs::new(&["stake-pool", "deregistration-certificate"])
            .path("--cold-verification-key-file", cold_vkey)
            .flag("--epoch", epoch)
            .path("--out-file", out_file);
        self.run_producing(args, out_file).await
    }
}
