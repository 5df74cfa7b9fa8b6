//! Certificate issue.
//!
//! Every constructor resolves the key files it needs through the registry,
//! asks the node to write the certificate to a fresh write-once location and
//! returns the resulting [`Certificate`]. A certificate file, once written, is
//! never overwritten by a later call.

use crate::error::WalletError;
use crate::registry::ArtifactRegistry;
use adakit_node::{CommandRunner, NodeCli};
use adakit_types::{
    ArtifactId, Certificate, CertificateKind, Margin, PoolRegistration, Relay, Role,
};
use serde::{Deserialize, Serialize};

/// Pool registration parameters as supplied by a caller.
///
/// Every field is optional so that a partial request can be reported in full.
/// Reward account and owners are wallet names whose stake keys are looked up
/// in the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRegistrationRequest {
    pub pledge: Option<u64>,
    pub cost: Option<u64>,
    pub margin: Option<Margin>,
    pub metadata_url: Option<String>,
    pub metadata_hash: Option<String>,
    pub reward_account: Option<String>,
    pub owners: Option<Vec<String>>,
    pub relays: Option<Vec<Relay>>,
}

/// Fields of a request, validated but with wallet names not yet resolved.
struct CheckedRequest {
    pledge: u64,
    cost: u64,
    margin: Margin,
    metadata_url: String,
    metadata_hash: String,
    reward_account: String,
    owners: Vec<String>,
    relays: Vec<Relay>,
}

impl PoolRegistrationRequest {
    /// Names of all missing fields, in declaration order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.pledge.is_none() {
            missing.push("pledge");
        }
        if self.cost.is_none() {
            missing.push("cost");
        }
        if self.margin.is_none() {
            missing.push("margin");
        }
        if self.metadata_url.is_none() {
            missing.push("metadata_url");
        }
        if self.metadata_hash.is_none() {
            missing.push("metadata_hash");
        }
        if self.reward_account.is_none() {
            missing.push("reward_account");
        }
        if self.owners.as_ref().map_or(true, Vec::is_empty) {
            missing.push("owners");
        }
        if self.relays.is_none() {
            missing.push("relays");
        }
        missing
    }

    fn check(self) -> Result<CheckedRequest, WalletError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(WalletError::MissingFields(missing));
        }
        match self {
            PoolRegistrationRequest {
                pledge: Some(pledge),
                cost: Some(cost),
                margin: Some(margin),
                metadata_url: Some(metadata_url),
                metadata_hash: Some(metadata_hash),
                reward_account: Some(reward_account),
                owners: Some(owners),
                relays: Some(relays),
            } => Ok(CheckedRequest {
                pledge,
                cost,
                margin,
                metadata_url,
                metadata_hash,
                reward_account,
                owners,
                relays,
            }),
            _ => Err(WalletError::Validation("incomplete pool registration".into())),
        }
    }
}

/// Issues certificates for wallets and pools held in a registry.
pub struct CertificateBuilder<'a, R, G> {
    node: &'a NodeCli<R>,
    registry: &'a G,
}

impl<'a, R: CommandRunner, G: ArtifactRegistry> CertificateBuilder<'a, R, G> {
    pub fn new(node: &'a NodeCli<R>, registry: &'a G) -> Self {
        Self { node, registry }
    }

    pub async fn stake_registration(&self, wallet: &str) -> Result<Certificate, WalletError> {
        let stake_vkey = self.registry.resolve(&ArtifactId::wallet(wallet, Role::StakeVkey))?;
        let out = self.registry.fresh(&ArtifactId::wallet(wallet, Role::StakeCert));
        self.node
            .stake_registration_certificate(&stake_vkey, &out)
            .await
            .map_err(WalletError::query("stake-address registration-certificate"))?;
        log::info!("stake registration certificate for {}: {}", wallet, out.display());
        Ok(Certificate::new(CertificateKind::StakeRegistration, out))
    }

    pub async fn stake_deregistration(&self, wallet: &str) -> Result<Certificate, WalletError> {
        let stake_vkey = self.registry.resolve(&ArtifactId::wallet(wallet, Role::StakeVkey))?;
        let out = self.registry.fresh(&ArtifactId::wallet(wallet, Role::StakeDereg));
        self.node
            .stake_deregistration_certificate(&stake_vkey, &out)
            .await
            .map_err(WalletError::query("stake-address deregistration-certificate"))?;
        log::info!("stake deregistration certificate for {}: {}", wallet, out.display());
        Ok(Certificate::new(CertificateKind::StakeDeregistration, out))
    }

    pub async fn stake_delegation(
        &self,
        wallet: &str,
        pool_id: &str,
    ) -> Result<Certificate, WalletError> {
        if pool_id.is_empty() {
            return Err(WalletError::Validation("pool id is empty".into()));
        }
        let stake_vkey = self.registry.resolve(&ArtifactId::wallet(wallet, Role::StakeVkey))?;
        let out = self.registry.fresh(&ArtifactId::wallet(wallet, Role::DelegCert));
        self.node
            .stake_delegation_certificate(&stake_vkey, pool_id, &out)
            .await
            .map_err(WalletError::query("stake-address delegation-certificate"))?;
        log::info!("delegation certificate {} -> {}: {}", wallet, pool_id, out.display());
        Ok(Certificate::new(
            CertificateKind::StakeDelegation {
                pool_id: pool_id.to_string(),
            },
            out,
        ))
    }

    /// Register or re-register `pool`.
    ///
    /// The request is validated before any key lookup or node call: all
    /// missing fields are reported together and nothing is written.
    pub async fn pool_registration(
        &self,
        pool: &str,
        request: PoolRegistrationRequest,
    ) -> Result<Certificate, WalletError> {
        let request = request.check()?;

        let cold_vkey = self.registry.resolve(&ArtifactId::pool(pool, Role::NodeVkey))?;
        let vrf_vkey = self.registry.resolve(&ArtifactId::pool(pool, Role::VrfVkey))?;
        let reward_account = self
            .registry
            .resolve(&ArtifactId::wallet(&request.reward_account, Role::StakeVkey))?;
        let owners = request
            .owners
            .iter()
            .map(|owner| self.registry.resolve(&ArtifactId::wallet(owner, Role::StakeVkey)))
            .collect::<Result<Vec<_>, _>>()?;

        let registration = PoolRegistration {
            pledge: request.pledge,
            cost: request.cost,
            margin: request.margin,
            metadata_url: request.metadata_url,
            metadata_hash: request.metadata_hash,
            reward_account,
            owners,
            relays: request.relays,
        };

        let out = self.registry.fresh(&ArtifactId::pool(pool, Role::PoolCert));
        self.node
            .pool_registration_certificate(&cold_vkey, &vrf_vkey, &registration, &out)
            .await
            .map_err(WalletError::query("stake-pool registration-certificate"))?;
        log::info!(
            "pool registration certificate for {} ({} owner(s), {} relay(s)): {}",
            pool,
            registration.owners.len(),
            registration.relays.len(),
            out.display()
        );
        Ok(Certificate::new(
            CertificateKind::PoolRegistration(Box::new(registration)),
            out,
        ))
    }

    /// Retire `pool` at the start of `epoch`.
    pub async fn pool_retirement(&self, pool: &str, epoch: u64) -> Result<Certificate, WalletError> {
        let cold_vkey = self.registry.resolve(&ArtifactId::pool(pool, Role::NodeVkey))?;
        let out = self.registry.fresh(&ArtifactId::pool(pool, Role::PoolDereg));
        self.node
            .pool_deregistration_certificate(&cold_vkey, epoch, &out)
            .await
            .map_err(WalletError::query("stake-pool deregistration-certificate"))?;
        log::info!("pool {} retires at epoch {}: {}", pool, epoch, out.display());
        Ok(Certificate::new(CertificateKind::PoolRetirement { epoch }, out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> PoolRegistrationRequest {
        PoolRegistrationRequest {
            pledge: Some(0),
            cost: Some(340_000_000),
            margin: Some("0.02".parse().unwrap()),
            metadata_url: Some("https://example.com/pool.json".into()),
            metadata_hash: Some("ab".repeat(32)),
            reward_account: Some("owner".into()),
            owners: Some(vec!["owner".into()]),
            relays: Some(vec![]),
        }
    }

    #[test]
    fn test_complete_request_has_nothing_missing() {
        assert!(complete().missing_fields().is_empty());
    }

    #[test]
    fn test_zero_pledge_counts_as_present() {
        let request = complete();
        assert_eq!(request.pledge, Some(0));
        assert!(request.check().is_ok());
    }

    #[test]
    fn test_each_missing_field_is_named() {
        let cases: [(&str, fn(&mut PoolRegistrationRequest)); 8] = [
            ("pledge", |r| r.pledge = None),
            ("cost", |r| r.cost = None),
            ("margin", |r| r.margin = None),
            ("metadata_url", |r| r.metadata_url = None),
            ("metadata_hash", |r| r.metadata_hash = None),
            ("reward_account", |r| r.reward_account = None),
            ("owners", |r| r.owners = None),
            ("relays", |r| r.relays = None),
        ];
        for (field, clear) in cases {
            let mut request = complete();
            clear(&mut request);
            assert_eq!(request.missing_fields(), vec![field]);
        }
    }

    #[test]
    fn test_empty_owners_is_missing() {
        let mut request = complete();
        request.owners = Some(vec![]);
        match request.check() {
            Err(WalletError::MissingFields(fields)) => assert_eq!(fields, vec!["owners"]),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_all_missing_reported_together() {
        let fields = PoolRegistrationRequest::default().missing_fields();
        assert_eq!(fields.len(), 8);
        assert_eq!(fields[0], "pledge");
        assert_eq!(fields[7], "relays");
    }
}
