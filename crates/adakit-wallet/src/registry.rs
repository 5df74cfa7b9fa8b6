//! Artifact registry.
//!
//! Maps `(entity kind, name, role)` to a storage location. [`FsRegistry`]
//! lays artifacts out as
//!
//! ```text
//! {root}/{wallet|pool}/{name}/{name}.{role}
//! ```
//!
//! where `root` is the session's `priv/` directory. Nothing else in the
//! workspace builds artifact paths.

use crate::error::WalletError;
use adakit_types::{ArtifactId, EntityKind, SessionConfig};
use std::path::{Path, PathBuf};

pub trait ArtifactRegistry: Send + Sync {
    /// Directory holding every artifact of one entity.
    fn entity_dir(&self, kind: EntityKind, name: &str) -> PathBuf;

    /// Canonical location, whether or not anything is stored there.
    fn locate(&self, id: &ArtifactId) -> PathBuf {
        self.entity_dir(id.kind, &id.name)
            .join(format!("{}.{}", id.name, id.role.suffix()))
    }

    fn exists(&self, id: &ArtifactId) -> bool {
        self.locate(id).exists()
    }

    /// Location of an existing artifact.
    fn resolve(&self, id: &ArtifactId) -> Result<PathBuf, WalletError> {
        let path = self.locate(id);
        if path.exists() {
            Ok(path)
        } else {
            Err(WalletError::ArtifactNotFound {
                kind: id.kind,
                name: id.name.clone(),
                role: id.role,
                path,
            })
        }
    }

    /// First unused location for a write-once artifact: the canonical path,
    /// then `{name}.1.{role}`, `{name}.2.{role}`, ...
    fn fresh(&self, id: &ArtifactId) -> PathBuf {
        let canonical = self.locate(id);
        if !canonical.exists() {
            return canonical;
        }
        let dir = self.entity_dir(id.kind, &id.name);
        (1u64..)
            .map(|n| dir.join(format!("{}.{}.{}", id.name, n, id.role.suffix())))
            .find(|p| !p.exists())
            .unwrap_or(canonical)
    }
}

/// Filesystem registry rooted at the private artifact directory.
#[derive(Debug, Clone)]
pub struct FsRegistry {
    root: PathBuf,
}

impl FsRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.private_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the entity directory if needed.
    pub async fn ensure_dir(&self, kind: EntityKind, name: &str) -> Result<PathBuf, WalletError> {
        let dir = self.entity_dir(kind, name);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }
}

impl ArtifactRegistry for FsRegistry {
    fn entity_dir(&self, kind: EntityKind, name: &str) -> PathBuf {
        self.root.join(kind.dir_name()).join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adakit_types::Role;

    #[test]
    fn test_layout() {
        let reg = FsRegistry::new("/srv/ada/priv");
        assert_eq!(
            reg.locate(&ArtifactId::wallet("alice", Role::PaymentSkey)),
            PathBuf::from("/srv/ada/priv/wallet/alice/alice.payment.skey")
        );
        assert_eq!(
            reg.locate(&ArtifactId::pool("stake1", Role::NodeCounter)),
            PathBuf::from("/srv/ada/priv/pool/stake1/stake1.node.counter")
        );
    }

    #[test]
    fn test_resolve_missing() {
        let dir = tempfile::tempdir().unwrap();
        let reg = FsRegistry::new(dir.path());
        let err = reg
            .resolve(&ArtifactId::wallet("ghost", Role::StakeVkey))
            .unwrap_err();
        match err {
            WalletError::ArtifactNotFound { kind, name, role, .. } => {
                assert_eq!(kind, EntityKind::Wallet);
                assert_eq!(name, "ghost");
                assert_eq!(role, Role::StakeVkey);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_fresh_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let reg = FsRegistry::new(dir.path());
        let id = ArtifactId::wallet("alice", Role::StakeCert);
        std::fs::create_dir_all(reg.entity_dir(EntityKind::Wallet, "alice")).unwrap();

        let first = reg.fresh(&id);
        assert!(first.ends_with("alice.stake.cert"));
        std::fs::write(&first, "a").unwrap();

        let second = reg.fresh(&id);
        assert!(second.ends_with("alice.1.stake.cert"));
        std::fs::write(&second, "b").unwrap();

        assert!(reg.fresh(&id).ends_with("alice.2.stake.cert"));
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "a");
    }
}
