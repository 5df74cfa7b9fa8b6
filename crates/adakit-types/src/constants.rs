//! Network selectors, ledger eras and protocol-level constants.

use crate::TypesError;
use serde::{Deserialize, Serialize};

// =============================================================================
// Network Types
// =============================================================================

/// Network magic of the public pre-production testnet.
pub const PREPROD_MAGIC: u32 = 1;

/// Network magic of the public preview testnet.
pub const PREVIEW_MAGIC: u32 = 2;

/// Network selector passed to every network-aware node command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    Mainnet,
    Testnet { magic: u32 },
}

impl Network {
    /// Command-line flags selecting this network.
    pub fn cli_args(&self) -> Vec<String> {
        match self {
            Self::Mainnet => vec!["--mainnet".to_string()],
            Self::Testnet { magic } => vec!["--testnet-magic".to_string(), magic.to_string()],
        }
    }

    pub fn is_mainnet(&self) -> bool {
        matches!(self, Self::Mainnet)
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::Mainnet
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Testnet { magic: PREPROD_MAGIC } => write!(f, "preprod"),
            Self::Testnet { magic: PREVIEW_MAGIC } => write!(f, "preview"),
            Self::Testnet { magic } => write!(f, "testnet-magic {}", magic),
        }
    }
}

impl std::str::FromStr for Network {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, TypesError> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "mainnet" | "main" => Ok(Self::Mainnet),
            "preprod" => Ok(Self::Testnet { magic: PREPROD_MAGIC }),
            "preview" => Ok(Self::Testnet { magic: PREVIEW_MAGIC }),
            _ => {
                let magic = s
                    .strip_prefix("testnet-magic")
                    .map(|rest| rest.trim_start_matches([' ', '=', ':']))
                    .unwrap_or(s.as_str());
                magic
                    .parse()
                    .map(|magic| Self::Testnet { magic })
                    .map_err(|_| TypesError::UnknownNetwork(s.clone()))
            }
        }
    }
}

// =============================================================================
// Eras
// =============================================================================

/// Ledger era, selected explicitly on era-sensitive commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Era {
    Shelley,
    Allegra,
    Mary,
    Alonzo,
    Babbage,
    Conway,
}

impl Era {
    /// The `--{era}-era` flag.
    pub fn cli_flag(&self) -> String {
        format!("--{}-era", self)
    }
}

impl std::fmt::Display for Era {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Shelley => "shelley",
            Self::Allegra => "allegra",
            Self::Mary => "mary",
            Self::Alonzo => "alonzo",
            Self::Babbage => "babbage",
            Self::Conway => "conway",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Era {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, TypesError> {
        match s.trim().trim_end_matches("-era").to_lowercase().as_str() {
            "shelley" => Ok(Self::Shelley),
            "allegra" => Ok(Self::Allegra),
            "mary" => Ok(Self::Mary),
            "alonzo" => Ok(Self::Alonzo),
            "babbage" => Ok(Self::Babbage),
            "conway" => Ok(Self::Conway),
            other => Err(TypesError::UnknownEra(other.to_string())),
        }
    }
}

// =============================================================================
// Protocol Constants
// =============================================================================

/// Slots added to the current tip to form a transaction's validity upper bound.
pub const DEFAULT_VALIDITY_HORIZON: u64 = 10_000;

/// Default name of the node command-line binary.
pub const DEFAULT_CLI_PATH: &str = "cardano-cli";

/// Environment variable the node binary reads its socket location from.
pub const SOCKET_PATH_ENV: &str = "CARDANO_NODE_SOCKET_PATH";
