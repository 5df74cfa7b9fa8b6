//! Ledger certificate descriptions.
//!
//! A [`Certificate`] pairs the logical variant with the artifact file the node
//! wrote for it. The artifact is immutable once produced.

use crate::artifact::Role;
use crate::TypesError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// =============================================================================
// Pool Margin
// =============================================================================

/// Parts per unit used to store a margin exactly.
const MARGIN_SCALE: u64 = 1_000_000_000;

const MARGIN_DECIMALS: usize = 9;

/// Pool margin, an exact decimal fraction in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Margin {
    parts_per_billion: u64,
}

impl Margin {
    pub fn from_parts_per_billion(ppb: u64) -> Result<Self, TypesError> {
        if ppb > MARGIN_SCALE {
            return Err(TypesError::InvalidMargin(format!("{} ppb exceeds 1", ppb)));
        }
        Ok(Self { parts_per_billion: ppb })
    }

    pub fn parts_per_billion(&self) -> u64 {
        self.parts_per_billion
    }
}

impl std::fmt::Display for Margin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let whole = self.parts_per_billion / MARGIN_SCALE;
        let frac = self.parts_per_billion % MARGIN_SCALE;
        if frac == 0 {
            write!(f, "{}", whole)
        } else {
            let frac_str = format!("{:09}", frac);
            write!(f, "{}.{}", whole, frac_str.trim_end_matches('0'))
        }
    }
}

impl std::str::FromStr for Margin {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, TypesError> {
        let invalid = || TypesError::InvalidMargin(s.to_string());
        let s = s.trim();
        let (whole_str, frac_str) = s.split_once('.').unwrap_or((s, ""));
        if whole_str.is_empty() && frac_str.is_empty() {
            return Err(invalid());
        }
        if !whole_str.chars().all(|c| c.is_ascii_digit())
            || !frac_str.chars().all(|c| c.is_ascii_digit())
            || frac_str.len() > MARGIN_DECIMALS
        {
            return Err(invalid());
        }
        let whole: u64 = if whole_str.is_empty() {
            0
        } else {
            whole_str.parse().map_err(|_| invalid())?
        };
        let frac: u64 = if frac_str.is_empty() {
            0
        } else {
            format!("{:0<9}", frac_str).parse().map_err(|_| invalid())?
        };
        let ppb = whole
            .checked_mul(MARGIN_SCALE)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(invalid)?;
        Self::from_parts_per_billion(ppb).map_err(|_| invalid())
    }
}

// =============================================================================
// Relays
// =============================================================================

/// Pool relay endpoint descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relay {
    SingleHostAddr {
        ipv4: Option<String>,
        ipv6: Option<String>,
        port: u16,
    },
    SingleHostName {
        dns_name: String,
        port: u16,
    },
    MultiHostName {
        dns_name: String,
    },
}

impl Relay {
    /// Registration-certificate flags describing this relay.
    pub fn cli_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        match self {
            Relay::SingleHostAddr { ipv4, ipv6, port } => {
                if let Some(ip) = ipv4 {
                    args.push("--pool-relay-ipv4".to_string());
                    args.push(ip.clone());
                }
                if let Some(ip) = ipv6 {
                    args.push("--pool-relay-ipv6".to_string());
                    args.push(ip.clone());
                }
                args.push("--pool-relay-port".to_string());
                args.push(port.to_string());
            }
            Relay::SingleHostName { dns_name, port } => {
                args.push("--single-host-pool-relay".to_string());
                args.push(dns_name.clone());
                args.push("--pool-relay-port".to_string());
                args.push(port.to_string());
            }
            Relay::MultiHostName { dns_name } => {
                args.push("--multi-host-pool-relay".to_string());
                args.push(dns_name.clone());
            }
        }
        args
    }
}

impl std::str::FromStr for Relay {
    type Err = TypesError;

    /// Parses `host:port` (IPv4 literal or DNS name) or `multi:dns-name`.
    fn from_str(s: &str) -> Result<Self, TypesError> {
        let invalid = || TypesError::InvalidRelay(s.to_string());
        if let Some(dns_name) = s.strip_prefix("multi:") {
            if dns_name.is_empty() {
                return Err(invalid());
            }
            return Ok(Relay::MultiHostName {
                dns_name: dns_name.to_string(),
            });
        }
        let (host, port) = s.rsplit_once(':').ok_or_else(invalid)?;
        let port: u16 = port.parse().map_err(|_| invalid())?;
        if host.is_empty() {
            return Err(invalid());
        }
        if host.parse::<std::net::Ipv4Addr>().is_ok() {
            Ok(Relay::SingleHostAddr {
                ipv4: Some(host.to_string()),
                ipv6: None,
                port,
            })
        } else {
            Ok(Relay::SingleHostName {
                dns_name: host.to_string(),
                port,
            })
        }
    }
}

// =============================================================================
// Certificates
// =============================================================================

/// Fully specified pool registration parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRegistration {
    /// Pledged lovelace.
    pub pledge: u64,
    /// Fixed cost per epoch in lovelace.
    pub cost: u64,
    pub margin: Margin,
    pub metadata_url: String,
    pub metadata_hash: String,
    /// Stake verification key file of the reward account.
    pub reward_account: PathBuf,
    /// Stake verification key files of the pool owners (at least one).
    pub owners: Vec<PathBuf>,
    /// Relay endpoints, possibly empty.
    pub relays: Vec<Relay>,
}

/// Certificate variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateKind {
    StakeRegistration,
    StakeDeregistration,
    StakeDelegation { pool_id: String },
    PoolRegistration(Box<PoolRegistration>),
    PoolRetirement { epoch: u64 },
}

impl CertificateKind {
    /// Artifact role the certificate file is stored under.
    pub fn role(&self) -> Role {
        match self {
            CertificateKind::StakeRegistration => Role::StakeCert,
            CertificateKind::StakeDeregistration => Role::StakeDereg,
            CertificateKind::StakeDelegation { .. } => Role::DelegCert,
            CertificateKind::PoolRegistration(_) => Role::PoolCert,
            CertificateKind::PoolRetirement { .. } => Role::PoolDereg,
        }
    }
}

/// A certificate artifact produced by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub kind: CertificateKind,
    pub path: PathBuf,
}

impl Certificate {
    pub fn new(kind: CertificateKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_parse_and_display() {
        let m: Margin = "0.05".parse().unwrap();
        assert_eq!(m.parts_per_billion(), 50_000_000);
        assert_eq!(m.to_string(), "0.05");
        assert_eq!("1".parse::<Margin>().unwrap().to_string(), "1");
        assert_eq!("0".parse::<Margin>().unwrap().to_string(), "0");
        assert_eq!(".000000001".parse::<Margin>().unwrap().parts_per_billion(), 1);
    }

    #[test]
    fn test_margin_rejects() {
        assert!("1.5".parse::<Margin>().is_err());
        assert!("-0.1".parse::<Margin>().is_err());
        assert!("0.0000000001".parse::<Margin>().is_err());
        assert!("".parse::<Margin>().is_err());
    }

    #[test]
    fn test_relay_args() {
        let relay: Relay = "10.0.0.1:3001".parse().unwrap();
        assert_eq!(
            relay.cli_args(),
            vec!["--pool-relay-ipv4", "10.0.0.1", "--pool-relay-port", "3001"]
        );

        let relay: Relay = "relay.example.com:6000".parse().unwrap();
        assert_eq!(
            relay.cli_args(),
            vec!["--single-host-pool-relay", "relay.example.com", "--pool-relay-port", "6000"]
        );

        let relay: Relay = "multi:pool.example.com".parse().unwrap();
        assert_eq!(relay.cli_args(), vec!["--multi-host-pool-relay", "pool.example.com"]);

        assert!("relay.example.com".parse::<Relay>().is_err());
    }

    #[test]
    fn test_roles_are_distinct() {
        let kinds = [
            CertificateKind::StakeRegistration,
            CertificateKind::StakeDeregistration,
            CertificateKind::StakeDelegation { pool_id: "pool1x".into() },
            CertificateKind::PoolRetirement { epoch: 300 },
        ];
        let mut tags: Vec<_> = kinds.iter().map(|k| k.role().suffix()).collect();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), kinds.len());
    }
}
