//! Wallet and pool identities.
//!
//! Identities hold names and paths only. Addresses, balances, rewards and
//! delegation are read from the registry and the node on every access and
//! never cached, so a value obtained before a submission is stale after it.

use crate::error::WalletError;
use crate::registry::ArtifactRegistry;
use crate::utxo::UtxoSelector;
use adakit_node::{CommandRunner, StakeAddressInfo};
use adakit_tx::Session;
use adakit_types::{ArtifactId, Role, UnspentOutput};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Reward state of a staking address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardBalance {
    Registered(u64),
    NotRegistered,
}

impl RewardBalance {
    pub fn amount(&self) -> Option<u64> {
        match self {
            RewardBalance::Registered(amount) => Some(*amount),
            RewardBalance::NotRegistered => None,
        }
    }
}

impl std::fmt::Display for RewardBalance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RewardBalance::Registered(amount) => write!(f, "{} lovelace", amount),
            RewardBalance::NotRegistered => f.write_str("Staking key not registered"),
        }
    }
}

/// Point-in-time view of a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletIdentity {
    pub name: String,
    pub payment_address: String,
    pub staking_address: String,
    /// Sum of the payment address's unspent outputs, in lovelace.
    pub balance: u64,
    pub reward: RewardBalance,
    /// Pool the stake key delegates to, if any.
    pub delegation: Option<String>,
}

/// Read an address artifact (a single line of text).
pub(crate) async fn read_address(path: &Path) -> Result<String, WalletError> {
    let text = tokio::fs::read_to_string(path).await?;
    let address = text.trim();
    if address.is_empty() {
        return Err(WalletError::Validation(format!(
            "{} holds no address",
            path.display()
        )));
    }
    Ok(address.to_string())
}

/// A named wallet in the registry.
pub struct Wallet<'a, R, G> {
    pub(crate) session: &'a Session<R>,
    pub(crate) registry: &'a G,
    name: String,
}

impl<'a, R: CommandRunner, G: ArtifactRegistry> Wallet<'a, R, G> {
    /// Open an existing wallet. Fails if it has no payment address.
    pub fn open(
        session: &'a Session<R>,
        registry: &'a G,
        name: impl Into<String>,
    ) -> Result<Self, WalletError> {
        let name = name.into();
        registry.resolve(&ArtifactId::wallet(&name, Role::PaymentAddr))?;
        Ok(Self {
            session,
            registry,
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session(&self) -> &'a Session<R> {
        self.session
    }

    /// Location of an existing artifact of this wallet.
    pub fn artifact(&self, role: Role) -> Result<PathBuf, WalletError> {
        self.registry.resolve(&ArtifactId::wallet(&self.name, role))
    }

    pub async fn payment_address(&self) -> Result<String, WalletError> {
        read_address(&self.artifact(Role::PaymentAddr)?).await
    }

    pub async fn staking_address(&self) -> Result<String, WalletError> {
        read_address(&self.artifact(Role::StakeAddr)?).await
    }

    /// Unspent outputs at the payment address, queried now.
    pub async fn utxos(&self) -> Result<Vec<UnspentOutput>, WalletError> {
        let address = self.payment_address().await?;
        UtxoSelector::new(self.session.node()).list(&address).await
    }

    pub async fn balance(&self) -> Result<u64, WalletError> {
        let address = self.payment_address().await?;
        UtxoSelector::new(self.session.node()).balance(&address).await
    }

    async fn stake_info(&self) -> Result<Option<StakeAddressInfo>, WalletError> {
        let address = self.staking_address().await?;
        let entries = self
            .session
            .node()
            .query_stake_address_info(&address)
            .await
            .map_err(WalletError::query("query stake-address-info"))?;
        Ok(entries.into_iter().find(|entry| entry.address == address))
    }

    /// Reward balance; [`RewardBalance::NotRegistered`] when the node lists
    /// no delegation entry for this wallet's staking address.
    pub async fn reward_balance(&self) -> Result<RewardBalance, WalletError> {
        Ok(match self.stake_info().await? {
            Some(info) => RewardBalance::Registered(info.reward_account_balance),
            None => RewardBalance::NotRegistered,
        })
    }

    pub async fn delegation(&self) -> Result<Option<String>, WalletError> {
        Ok(self.stake_info().await?.and_then(|info| info.delegation))
    }

    /// Full snapshot, re-fetched from the node on every call.
    pub async fn identity(&self) -> Result<WalletIdentity, WalletError> {
        let payment_address = self.payment_address().await?;
        let staking_address = self.staking_address().await?;
        let balance = UtxoSelector::new(self.session.node())
            .balance(&payment_address)
            .await?;
        let info = self.stake_info().await?;
        let (reward, delegation) = match info {
            Some(info) => (
                RewardBalance::Registered(info.reward_account_balance),
                info.delegation,
            ),
            None => (RewardBalance::NotRegistered, None),
        };
        Ok(WalletIdentity {
            name: self.name.clone(),
            payment_address,
            staking_address,
            balance,
            reward,
            delegation,
        })
    }
}

/// Roles a pool entity may hold.
const POOL_ROLES: [Role; 10] = [
    Role::NodeVkey,
    Role::NodeSkey,
    Role::NodeCounter,
    Role::NodeCert,
    Role::KesVkey,
    Role::KesSkey,
    Role::VrfVkey,
    Role::VrfSkey,
    Role::PoolCert,
    Role::PoolDereg,
];

/// A named pool with its id and the artifacts present on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolIdentity {
    pub name: String,
    pub pool_id: String,
    pub artifacts: Vec<(Role, PathBuf)>,
}

impl PoolIdentity {
    /// Look the pool up; the pool id is derived from the cold key each time.
    pub async fn load<R: CommandRunner, G: ArtifactRegistry>(
        session: &Session<R>,
        registry: &G,
        name: &str,
    ) -> Result<Self, WalletError> {
        let cold_vkey = registry.resolve(&ArtifactId::pool(name, Role::NodeVkey))?;
        let pool_id = session
            .node()
            .stake_pool_id(&cold_vkey)
            .await
            .map_err(WalletError::query("stake-pool id"))?;
        let artifacts = POOL_ROLES
            .iter()
            .map(|&role| (role, registry.locate(&ArtifactId::pool(name, role))))
            .filter(|(_, path)| path.exists())
            .collect();
        Ok(Self {
            name: name.to_string(),
            pool_id,
            artifacts,
        })
    }

    pub fn artifact(&self, role: Role) -> Option<&Path> {
        self.artifacts
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, path)| path.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_display() {
        assert_eq!(
            RewardBalance::NotRegistered.to_string(),
            "Staking key not registered"
        );
        assert_eq!(RewardBalance::Registered(42).to_string(), "42 lovelace");
        assert_eq!(RewardBalance::Registered(0).amount(), Some(0));
        assert_eq!(RewardBalance::NotRegistered.amount(), None);
    }

    #[tokio::test]
    async fn test_read_address_trims() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.payment.addr");
        std::fs::write(&path, "addr_test1abc\n").unwrap();
        assert_eq!(read_address(&path).await.unwrap(), "addr_test1abc");

        std::fs::write(&path, "  \n").unwrap();
        assert!(read_address(&path).await.is_err());
    }
}
