//! Immutable session configuration.
//!
//! Built once at session start and threaded into every component; nothing
//! reads network, era or directory settings from ambient global state.

use crate::constants::{Era, Network, DEFAULT_CLI_PATH, DEFAULT_VALIDITY_HORIZON};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the scratch sub-directory under the working directory.
pub const SCRATCH_DIR: &str = "tmp";

/// Name of the private-artifact sub-directory under the working directory.
pub const PRIVATE_DIR: &str = "priv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Network selector.
    pub network: Network,
    /// Explicit ledger era, if the node needs one.
    pub era: Option<Era>,
    /// Root of the `priv/` artifact tree and the `tmp/` scratch space.
    pub working_dir: PathBuf,
    /// Node command-line binary.
    pub cli_path: PathBuf,
    /// Node socket, exported to every node invocation when set.
    pub socket_path: Option<PathBuf>,
    /// Slots added to the tip for a body's validity upper bound.
    pub validity_horizon: u64,
    /// Tag namespacing this session's scratch artifacts.
    pub scratch_tag: Option<String>,
    /// Shelley genesis file, needed for KES period computation.
    pub shelley_genesis: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            era: None,
            working_dir: PathBuf::from("."),
            cli_path: PathBuf::from(DEFAULT_CLI_PATH),
            socket_path: None,
            validity_horizon: DEFAULT_VALIDITY_HORIZON,
            scratch_tag: None,
            shelley_genesis: None,
        }
    }
}

impl SessionConfig {
    /// Default configuration rooted at `working_dir`.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    pub fn with_era(mut self, era: Era) -> Self {
        self.era = Some(era);
        self
    }

    pub fn with_cli_path(mut self, cli_path: impl Into<PathBuf>) -> Self {
        self.cli_path = cli_path.into();
        self
    }

    pub fn with_socket_path(mut self, socket_path: impl Into<PathBuf>) -> Self {
        self.socket_path = Some(socket_path.into());
        self
    }

    pub fn with_validity_horizon(mut self, slots: u64) -> Self {
        self.validity_horizon = slots;
        self
    }

    pub fn with_scratch_tag(mut self, tag: impl Into<String>) -> Self {
        self.scratch_tag = Some(tag.into());
        self
    }

    pub fn with_shelley_genesis(mut self, path: impl Into<PathBuf>) -> Self {
        self.shelley_genesis = Some(path.into());
        self
    }

    /// Directory holding per-call scratch artifacts.
    pub fn scratch_dir(&self) -> PathBuf {
        self.working_dir.join(SCRATCH_DIR)
    }

    /// Root of the private artifact tree.
    pub fn private_dir(&self) -> PathBuf {
        self.working_dir.join(PRIVATE_DIR)
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.network, Network::Mainnet);
        assert_eq!(cfg.validity_horizon, 10_000);
        assert_eq!(cfg.cli_path, PathBuf::from("cardano-cli"));
        assert!(cfg.era.is_none());
    }

    #[test]
    fn test_dirs() {
        let cfg = SessionConfig::new("/srv/ada").with_era(Era::Babbage);
        assert_eq!(cfg.scratch_dir(), PathBuf::from("/srv/ada/tmp"));
        assert_eq!(cfg.private_dir(), PathBuf::from("/srv/ada/priv"));
        assert_eq!(cfg.era, Some(Era::Babbage));
    }
}
