//! Artifact addressing: which entity, which name, which role.
//!
//! Storage backends turn an [`ArtifactId`] into a concrete location; nothing
//! outside the registry builds artifact paths by string concatenation.

use serde::{Deserialize, Serialize};

/// Kind of entity owning a set of artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Wallet,
    Pool,
}

impl EntityKind {
    pub fn dir_name(&self) -> &'static str {
        match self {
            EntityKind::Wallet => "wallet",
            EntityKind::Pool => "pool",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Role of an artifact within its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    PaymentVkey,
    PaymentSkey,
    PaymentAddr,
    StakeVkey,
    StakeSkey,
    StakeAddr,
    StakeCert,
    StakeDereg,
    DelegCert,
    /// Cold verification key.
    NodeVkey,
    /// Cold signing key.
    NodeSkey,
    /// Operational certificate issue counter.
    NodeCounter,
    /// Operational certificate.
    NodeCert,
    KesVkey,
    KesSkey,
    VrfVkey,
    VrfSkey,
    PoolCert,
    PoolDereg,
}

impl Role {
    /// File-name suffix after `{name}.`.
    pub fn suffix(&self) -> &'static str {
        match self {
            Role::PaymentVkey => "payment.vkey",
            Role::PaymentSkey => "payment.skey",
            Role::PaymentAddr => "payment.addr",
            Role::StakeVkey => "stake.vkey",
            Role::StakeSkey => "stake.skey",
            Role::StakeAddr => "stake.addr",
            Role::StakeCert => "stake.cert",
            Role::StakeDereg => "stake.dereg",
            Role::DelegCert => "deleg.cert",
            Role::NodeVkey => "node.vkey",
            Role::NodeSkey => "node.skey",
            Role::NodeCounter => "node.counter",
            Role::NodeCert => "node.cert",
            Role::KesVkey => "kes.vkey",
            Role::KesSkey => "kes.skey",
            Role::VrfVkey => "vrf.vkey",
            Role::VrfSkey => "vrf.skey",
            Role::PoolCert => "pool.cert",
            Role::PoolDereg => "pool.dereg",
        }
    }

    /// Look a role up by its suffix (`"payment.skey"`, `"vrf.vkey"`, ...).
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        ALL_ROLES.iter().copied().find(|r| r.suffix() == suffix)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Every role, in declaration order.
pub static ALL_ROLES: [Role; 19] = [
    Role::PaymentVkey,
    Role::PaymentSkey,
    Role::PaymentAddr,
    Role::StakeVkey,
    Role::StakeSkey,
    Role::StakeAddr,
    Role::StakeCert,
    Role::StakeDereg,
    Role::DelegCert,
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

/// Fully qualified artifact reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId {
    pub kind: EntityKind,
    pub name: String,
    pub role: Role,
}

impl ArtifactId {
    pub fn wallet(name: impl Into<String>, role: Role) -> Self {
        Self {
            kind: EntityKind::Wallet,
            name: name.into(),
            role,
        }
    }

    pub fn pool(name: impl Into<String>, role: Role) -> Self {
        Self {
            kind: EntityKind::Pool,
            name: name.into(),
            role,
        }
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} of {}", self.role, self.kind, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_roundtrip() {
        for role in ALL_ROLES {
            assert_eq!(Role::from_suffix(role.suffix()), Some(role));
        }
        assert_eq!(Role::from_suffix("payment.pem"), None);
    }

    #[test]
    fn test_display() {
        let id = ArtifactId::pool("alpha", Role::VrfVkey);
        assert_eq!(id.to_string(), "vrf.vkey pool of alpha");
    }
}
