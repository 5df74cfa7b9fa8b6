//! Witness production and combination.
//!
//! Single-party signing uses [`WitnessCoordinator::sign`]. Multi-party
//! signing has every signer call [`WitnessCoordinator::witness`] against the
//! same body file (possibly in another process, via
//! [`TxBodyFile::from_path`]) and one party [`assemble`](WitnessCoordinator::assemble)
//! the results. Witness order does not matter.

use crate::session::Session;
use crate::types::{SignedTx, TxBodyFile, WitnessFile};
use crate::TxError;
use adakit_node::CommandRunner;
use std::path::{Path, PathBuf};

pub struct WitnessCoordinator<'a, R> {
    session: &'a Session<R>,
}

impl<'a, R: CommandRunner> WitnessCoordinator<'a, R> {
    pub fn new(session: &'a Session<R>) -> Self {
        Self { session }
    }

    /// Sign with every key in one pass.
    pub async fn sign(
        &self,
        body: &impl AsRef<TxBodyFile>,
        signing_keys: &[PathBuf],
        script: Option<&Path>,
    ) -> Result<SignedTx, TxError> {
        if signing_keys.is_empty() {
            return Err(TxError::Validation("no signing keys given".into()));
        }
        let body = body.as_ref();
        let out_file = self.session.scratch().next_path("tx", "signed");
        self.session
            .node()
            .sign(body.path(), signing_keys, script, &out_file)
            .await
            .map_err(TxError::submission("transaction sign"))?;
        log::info!(
            "signed {} with {} key(s)",
            body.path().display(),
            signing_keys.len()
        );
        Ok(SignedTx::from_path(out_file))
    }

    /// Produce one detached witness.
    pub async fn witness(
        &self,
        body: &impl AsRef<TxBodyFile>,
        signing_key: &Path,
        script: Option<&Path>,
    ) -> Result<WitnessFile, TxError> {
        let body = body.as_ref();
        let out_file = self.session.scratch().next_path("tx", "witness");
        self.session
            .node()
            .witness(body.path(), signing_key, script, &out_file)
            .await
            .map_err(TxError::submission("transaction witness"))?;
        log::debug!("witness {} for {}", out_file.display(), body.path().display());
        Ok(WitnessFile::from_path(out_file))
    }

    /// Combine detached witnesses into a signed transaction.
    pub async fn assemble(
        &self,
        body: &impl AsRef<TxBodyFile>,
        witnesses: &[WitnessFile],
    ) -> Result<SignedTx, TxError> {
        if witnesses.is_empty() {
            return Err(TxError::Validation("no witnesses to assemble".into()));
        }
        let body = body.as_ref();
        let files: Vec<PathBuf> = witnesses.iter().map(|w| w.path().to_path_buf()).collect();
        let out_file = self.session.scratch().next_path("tx", "signed");
        self.session
            .node()
            .assemble(body.path(), &files, &out_file)
            .await
            .map_err(TxError::submission("transaction assemble"))?;
        log::info!(
            "assembled {} witness(es) into {}",
            witnesses.len(),
            out_file.display()
        );
        Ok(SignedTx::from_path(out_file))
    }
}
