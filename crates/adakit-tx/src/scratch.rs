//! Collision-free scratch artifact naming.
//!
//! Paths look like `{dir}/{prefix}_{tag}_{counter:06}.{ext}`. The tag
//! namespaces one session; the counter is monotonic within it and skips any
//! name already present on disk, so two sessions sharing a working directory
//! only collide if they share a tag.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

pub struct ScratchSpace {
    dir: PathBuf,
    tag: String,
    counter: AtomicU64,
}

impl ScratchSpace {
    pub fn new(dir: impl Into<PathBuf>, tag: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            tag: tag.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Tag used when the caller supplies none: `s{pid}`.
    pub fn default_tag() -> String {
        format!("s{}", std::process::id())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Reserve the next unused artifact path.
    pub fn next_path(&self, prefix: &str, ext: &str) -> PathBuf {
        loop {
            let n = self.counter.fetch_add(1, Ordering::Relaxed);
            let path = self
                .dir
                .join(format!("{}_{}_{:06}.{}", prefix, self.tag, n, ext));
            if !path.exists() {
                return path;
            }
        }
    }

    /// Single per-session file: `{dir}/{prefix}_{tag}.{ext}`.
    pub fn session_path(&self, prefix: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.{}", prefix, self.tag, ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_sequential() {
        let scratch = ScratchSpace::new("/work/tmp", "alpha");
        assert_eq!(
            scratch.next_path("tx", "raw"),
            PathBuf::from("/work/tmp/tx_alpha_000000.raw")
        );
        assert_eq!(
            scratch.next_path("tx", "signed"),
            PathBuf::from("/work/tmp/tx_alpha_000001.signed")
        );
    }

    #[test]
    fn test_skips_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tx_t_000000.raw"), "").unwrap();
        std::fs::write(dir.path().join("tx_t_000001.raw"), "").unwrap();

        let scratch = ScratchSpace::new(dir.path(), "t");
        assert_eq!(scratch.next_path("tx", "raw"), dir.path().join("tx_t_000002.raw"));
    }

    #[test]
    fn test_distinct_tags_never_collide() {
        let a = ScratchSpace::new("/w", "a");
        let b = ScratchSpace::new("/w", "b");
        let from_a: Vec<_> = (0..50).map(|_| a.next_path("tx", "raw")).collect();
        for _ in 0..50 {
            assert!(!from_a.contains(&b.next_path("tx", "raw")));
        }
    }

    #[test]
    fn test_session_path_is_tagged() {
        let a = ScratchSpace::new("/w", "a");
        let b = ScratchSpace::new("/w", "b");
        assert_eq!(a.session_path("params", "json"), PathBuf::from("/w/params_a.json"));
        assert_ne!(a.session_path("params", "json"), b.session_path("params", "json"));
        assert_ne!(a.session_path("params", "json"), a.next_path("params", "json"));
    }

    #[test]
    fn test_default_tag() {
        assert_eq!(ScratchSpace::default_tag(), format!("s{}", std::process::id()));
    }
}
