//! Fee estimation.
//!
//! The node computes the minimum fee from the body, its shape and the
//! protocol parameter snapshot. The estimate is a pure read: it writes
//! nothing and changes no state.

use crate::session::Session;
use crate::types::TxBodyFile;
use crate::TxError;
use adakit_node::CommandRunner;

pub struct FeeEstimator<'a, R> {
    session: &'a Session<R>,
}

impl<'a, R: CommandRunner> FeeEstimator<'a, R> {
    pub fn new(session: &'a Session<R>) -> Self {
        Self { session }
    }

    /// Minimum fee in lovelace.
    pub async fn estimate(
        &self,
        body: &TxBodyFile,
        input_count: usize,
        output_count: usize,
        witness_count: usize,
    ) -> Result<u64, TxError> {
        self.session.protocol_parameters().await?;
        let fee = self
            .session
            .node()
            .calculate_min_fee(
                body.path(),
                input_count,
                output_count,
                witness_count,
                self.session.parameter_cache().path(),
            )
            .await
            .map_err(TxError::query("transaction calculate-min-fee"))?;
        log::debug!(
            "min fee {} for {} ({} in, {} out, {} witnesses)",
            fee,
            body.path().display(),
            input_count,
            output_count,
            witness_count
        );
        Ok(fee)
    }
}
