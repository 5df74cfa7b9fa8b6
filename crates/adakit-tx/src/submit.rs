//! Submission of signed transactions.

use crate::session::Session;
use crate::types::{SignedTx, SubmittedTx};
use crate::TxError;
use adakit_node::CommandRunner;

pub struct SubmissionClient<'a, R> {
    session: &'a Session<R>,
}

impl<'a, R: CommandRunner> SubmissionClient<'a, R> {
    pub fn new(session: &'a Session<R>) -> Self {
        Self { session }
    }

    /// Submit once. A rejection carries the node's message unchanged and is
    /// never retried.
    pub async fn submit(&self, tx: SignedTx) -> Result<SubmittedTx, TxError> {
        let txid = tx.txid(self.session).await?;
        self.session
            .node()
            .submit(tx.path())
            .await
            .map_err(TxError::submission("transaction submit"))?;
        log::info!("submitted {}", txid);
        Ok(SubmittedTx {
            txid,
            path: tx.path().to_path_buf(),
        })
    }
}
