//! Key management: wallet and pool key generation, operational certificates
//! and the small identity helpers (key hashes, pool id, metadata hash,
//! script address, address info).

use crate::error::WalletError;
use crate::registry::ArtifactRegistry;
use crate::wallet::read_address;
use adakit_node::CommandRunner;
use adakit_tx::Session;
use adakit_types::{ArtifactId, EntityKind, Role};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Genesis field holding the KES period length in slots.
const SLOTS_PER_KES_PERIOD: &str = "slotsPerKESPeriod";

/// Addresses of a freshly created wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAddresses {
    pub payment: String,
    pub stake: String,
}

/// Freshly issued operational certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpCert {
    pub path: PathBuf,
    pub kes_period: u64,
}

pub struct KeyManager<'a, R, G> {
    session: &'a Session<R>,
    registry: &'a G,
}

impl<'a, R: CommandRunner, G: ArtifactRegistry> KeyManager<'a, R, G> {
    pub fn new(session: &'a Session<R>, registry: &'a G) -> Self {
        Self { session, registry }
    }

    // ─── Wallets ───────────────────────────────────────────────────────────

    /// Generate payment and stake keys and both addresses for `name`.
    ///
    /// Refuses to touch a wallet that already has a payment signing key.
    pub async fn create_wallet(&self, name: &str) -> Result<WalletAddresses, WalletError> {
        let id = |role| ArtifactId::wallet(name, role);
        if self.registry.exists(&id(Role::PaymentSkey)) {
            return Err(WalletError::Validation(format!("wallet {} already exists", name)));
        }
        self.ensure_dir(EntityKind::Wallet, name).await?;

        let node = self.session.node();
        let payment_vkey = self.registry.locate(&id(Role::PaymentVkey));
        let stake_vkey = self.registry.locate(&id(Role::StakeVkey));
        let payment_addr = self.registry.locate(&id(Role::PaymentAddr));
        let stake_addr = self.registry.locate(&id(Role::StakeAddr));

        node.address_key_gen(&payment_vkey, &self.registry.locate(&id(Role::PaymentSkey)))
            .await
            .map_err(WalletError::query("address key-gen"))?;
        node.stake_address_key_gen(&stake_vkey, &self.registry.locate(&id(Role::StakeSkey)))
            .await
            .map_err(WalletError::query("stake-address key-gen"))?;
        node.stake_address_build(&stake_vkey, &stake_addr)
            .await
            .map_err(WalletError::query("stake-address build"))?;
        node.address_build(&payment_vkey, Some(&stake_vkey), &payment_addr)
            .await
            .map_err(WalletError::query("address build"))?;

        let addresses = WalletAddresses {
            payment: read_address(&payment_addr).await?,
            stake: read_address(&stake_addr).await?,
        };
        log::info!("created wallet {} ({})", name, addresses.payment);
        Ok(addresses)
    }

    pub async fn payment_key_hash(&self, wallet: &str) -> Result<String, WalletError> {
        let vkey = self.registry.resolve(&ArtifactId::wallet(wallet, Role::PaymentVkey))?;
        self.session
            .node()
            .address_key_hash(&vkey)
            .await
            .map_err(WalletError::query("address key-hash"))
    }

    pub async fn stake_key_hash(&self, wallet: &str) -> Result<String, WalletError> {
        let vkey = self.registry.resolve(&ArtifactId::wallet(wallet, Role::StakeVkey))?;
        self.session
            .node()
            .stake_address_key_hash(&vkey)
            .await
            .map_err(WalletError::query("stake-address key-hash"))
    }

    // ─── Pools ─────────────────────────────────────────────────────────────

    /// Generate cold keys with their issue counter, KES keys and VRF keys.
    /// Returns the pool id.
    pub async fn create_pool(&self, name: &str) -> Result<String, WalletError> {
        let id = |role| ArtifactId::pool(name, role);
        if self.registry.exists(&id(Role::NodeSkey)) {
            return Err(WalletError::Validation(format!("pool {} already exists", name)));
        }
        self.ensure_dir(EntityKind::Pool, name).await?;

        let node = self.session.node();
        node.node_key_gen(
            &self.registry.locate(&id(Role::NodeVkey)),
            &self.registry.locate(&id(Role::NodeSkey)),
            &self.registry.locate(&id(Role::NodeCounter)),
        )
        .await
        .map_err(WalletError::query("node key-gen"))?;
        node.node_key_gen_kes(
            &self.registry.locate(&id(Role::KesVkey)),
            &self.registry.locate(&id(Role::KesSkey)),
        )
        .await
        .map_err(WalletError::query("node key-gen-KES"))?;
        node.node_key_gen_vrf(
            &self.registry.locate(&id(Role::VrfVkey)),
            &self.registry.locate(&id(Role::VrfSkey)),
        )
        .await
        .map_err(WalletError::query("node key-gen-VRF"))?;

        let pool_id = self.pool_id(name).await?;
        log::info!("created pool {} ({})", name, pool_id);
        Ok(pool_id)
    }

    pub async fn pool_id(&self, pool: &str) -> Result<String, WalletError> {
        let cold_vkey = self.registry.resolve(&ArtifactId::pool(pool, Role::NodeVkey))?;
        self.session
            .node()
            .stake_pool_id(&cold_vkey)
            .await
            .map_err(WalletError::query("stake-pool id"))
    }

    /// Current KES period: `tip.slot / slotsPerKESPeriod`.
    pub async fn kes_period(&self) -> Result<u64, WalletError> {
        let genesis = self.session.config().shelley_genesis.as_deref().ok_or_else(|| {
            WalletError::Validation("no Shelley genesis file configured".into())
        })?;
        let slots_per_period = slots_per_kes_period(genesis).await?;
        let tip = self.session.tip().await?;
        Ok(tip.slot / slots_per_period)
    }

    /// Issue a new operational certificate for `pool`, replacing `node.cert`.
    ///
    /// The node bumps the issue counter. The certificate is written to
    /// scratch first and only moved into place once complete.
    pub async fn issue_op_cert(
        &self,
        pool: &str,
        kes_period: Option<u64>,
    ) -> Result<OpCert, WalletError> {
        let id = |role| ArtifactId::pool(pool, role);
        let kes_vkey = self.registry.resolve(&id(Role::KesVkey))?;
        let cold_skey = self.registry.resolve(&id(Role::NodeSkey))?;
        let counter = self.registry.resolve(&id(Role::NodeCounter))?;
        let kes_period = match kes_period {
            Some(period) => period,
            None => self.kes_period().await?,
        };

        let staged = self.session.scratch().next_path("opcert", "cert");
        self.session
            .node()
            .node_issue_op_cert(&kes_vkey, &cold_skey, &counter, kes_period, &staged)
            .await
            .map_err(WalletError::query("node issue-op-cert"))?;

        let path = self.registry.locate(&id(Role::NodeCert));
        tokio::fs::rename(&staged, &path).await?;
        log::info!(
            "issued operational certificate for {} at KES period {}: {}",
            pool,
            kes_period,
            path.display()
        );
        Ok(OpCert { path, kes_period })
    }

    // ─── Helpers ───────────────────────────────────────────────────────────

    /// Hash of a pool metadata document.
    pub async fn metadata_hash(&self, metadata: &str) -> Result<String, WalletError> {
        let file = self.session.scratch().next_path("metadata", "json");
        tokio::fs::write(&file, metadata).await?;
        let result = self.session.node().stake_pool_metadata_hash(&file).await;
        remove_scratch(&file).await;
        result.map_err(WalletError::query("stake-pool metadata-hash"))
    }

    /// Address of a native script given as JSON.
    pub async fn script_address(&self, script: &serde_json::Value) -> Result<String, WalletError> {
        let file = self.session.scratch().next_path("script", "json");
        let text = serde_json::to_string_pretty(script)
            .map_err(|e| WalletError::Validation(format!("script: {}", e)))?;
        tokio::fs::write(&file, text).await?;
        let result = self.session.node().address_build_script(&file).await;
        remove_scratch(&file).await;
        result.map_err(WalletError::query("address build-script"))
    }

    pub async fn address_info(&self, address: &str) -> Result<serde_json::Value, WalletError> {
        self.session
            .node()
            .address_info(address)
            .await
            .map_err(WalletError::query("address info"))
    }

    async fn ensure_dir(&self, kind: EntityKind, name: &str) -> Result<(), WalletError> {
        tokio::fs::create_dir_all(self.registry.entity_dir(kind, name)).await?;
        Ok(())
    }
}

async fn slots_per_kes_period(genesis: &Path) -> Result<u64, WalletError> {
    let text = tokio::fs::read_to_string(genesis).await?;
    let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
        WalletError::Validation(format!("{}: {}", genesis.display(), e))
    })?;
    match value.get(SLOTS_PER_KES_PERIOD).and_then(serde_json::Value::as_u64) {
        Some(0) | None => Err(WalletError::Validation(format!(
            "{}: missing or zero {}",
            genesis.display(),
            SLOTS_PER_KES_PERIOD
        ))),
        Some(slots) => Ok(slots),
    }
}

async fn remove_scratch(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        log::warn!("could not remove {}: {}", path.display(), e);
    }
}
