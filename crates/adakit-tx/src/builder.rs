//! Transaction builder.
//!
//! Collects inputs, outputs, certificates and an optional withdrawal, then
//! writes a raw body through the node. The validity upper bound is always
//! `tip + horizon` at build time and cannot be supplied by the caller.
//!
//! With a change address set, the builder balances the body itself:
//!
//! ```text
//! change = inputs + withdrawal + refund - outputs - fee - deposit
//! ```
//!
//! and appends the change as the last output when it is non-zero.

use crate::session::Session;
use crate::types::{DraftTx, TxBody, TxBodyFile};
use crate::TxError;
use adakit_node::{BuildRaw, CommandRunner};
use adakit_types::{Certificate, TxOut, UnspentOutput, Withdrawal};
use std::collections::HashSet;

/// Builder for raw transaction bodies.
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    inputs: Vec<UnspentOutput>,
    outputs: Vec<TxOut>,
    certificates: Vec<Certificate>,
    withdrawal: Option<Withdrawal>,
    fee: u64,
    change_address: Option<String>,
    deposit: u64,
    refund: u64,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(mut self, input: UnspentOutput) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn add_inputs(mut self, inputs: impl IntoIterator<Item = UnspentOutput>) -> Self {
        self.inputs.extend(inputs);
        self
    }

    pub fn add_output(mut self, output: TxOut) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn add_certificate(mut self, certificate: Certificate) -> Self {
        self.certificates.push(certificate);
        self
    }

    pub fn add_certificates(mut self, certificates: impl IntoIterator<Item = Certificate>) -> Self {
        self.certificates.extend(certificates);
        self
    }

    /// Withdraw from a reward account. Replaces any earlier withdrawal.
    pub fn withdrawal(mut self, withdrawal: Withdrawal) -> Self {
        self.withdrawal = Some(withdrawal);
        self
    }

    /// Fee in lovelace (defaults to 0).
    pub fn fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    /// Send the remaining balance to `address`.
    pub fn change_address(mut self, address: impl Into<String>) -> Self {
        self.change_address = Some(address.into());
        self
    }

    /// Deposit locked by the body's certificates.
    pub fn deposit(mut self, amount: u64) -> Self {
        self.deposit = amount;
        self
    }

    /// Deposit returned by the body's certificates.
    pub fn refund(mut self, amount: u64) -> Self {
        self.refund = amount;
        self
    }

    /// Check the builder and compute the final output list.
    ///
    /// Runs no command, so a rejected builder leaves no artifact behind.
    pub fn resolve_outputs(&self) -> Result<Vec<TxOut>, TxError> {
        if self.inputs.is_empty() {
            return Err(TxError::Validation("transaction has no inputs".into()));
        }

        let mut seen = HashSet::new();
        for input in &self.inputs {
            if !seen.insert((input.tx_hash.as_str(), input.output_index)) {
                return Err(TxError::Validation(format!(
                    "input {} listed twice",
                    input.tx_in()
                )));
            }
        }

        let mut outputs = self.outputs.clone();
        if let Some(ref address) = self.change_address {
            let change = self.change()?;
            if change > 0 {
                outputs.push(TxOut::new(address.clone(), change));
            }
        }

        if outputs.is_empty() {
            return Err(TxError::Validation("transaction has no outputs".into()));
        }
        Ok(outputs)
    }

    fn change(&self) -> Result<u64, TxError> {
        let have = sum(self.inputs.iter().map(|u| u.amount))
            .and_then(|s| s.checked_add(self.withdrawal.as_ref().map_or(0, |w| w.amount)))
            .and_then(|s| s.checked_add(self.refund))
            .ok_or_else(|| TxError::Validation("input total overflows".into()))?;
        let need = sum(self.outputs.iter().map(|o| o.amount))
            .and_then(|s| s.checked_add(self.fee))
            .and_then(|s| s.checked_add(self.deposit))
            .ok_or_else(|| TxError::Validation("output total overflows".into()))?;
        have.checked_sub(need)
            .ok_or(TxError::InsufficientInputs { need, have })
    }

    /// Write the raw body to a fresh scratch artifact.
    pub async fn build_raw<R: CommandRunner>(self, session: &Session<R>) -> Result<DraftTx, TxError> {
        let outputs = self.resolve_outputs()?;

        let tip = session.tip().await?;
        let validity_upper_bound = tip
            .slot
            .checked_add(session.config().validity_horizon)
            .ok_or_else(|| TxError::Validation("validity bound overflows".into()))?;

        let out_file = session.scratch().next_path("tx", "raw");
        let request = BuildRaw {
            tx_ins: self.inputs.iter().map(UnspentOutput::tx_in).collect(),
            tx_outs: outputs.iter().map(TxOut::tx_out).collect(),
            certificate_files: self.certificates.iter().map(|c| c.path.clone()).collect(),
            withdrawal: self.withdrawal.as_ref().map(Withdrawal::cli_value),
            invalid_hereafter: validity_upper_bound,
            fee: self.fee,
            out_file: out_file.clone(),
        };
        session
            .node()
            .build_raw(&request)
            .await
            .map_err(TxError::query("transaction build-raw"))?;

        log::info!(
            "built body {} ({} in, {} out, fee {}, valid until slot {})",
            out_file.display(),
            self.inputs.len(),
            outputs.len(),
            self.fee,
            validity_upper_bound
        );

        let body = TxBody {
            inputs: self.inputs.clone(),
            outputs,
            certificates: self.certificates.clone(),
            withdrawal: self.withdrawal.clone(),
            fee: self.fee,
            validity_upper_bound,
        };
        Ok(DraftTx {
            body,
            file: TxBodyFile::from_path(out_file),
            template: self,
        })
    }
}

pub(crate) fn sum(amounts: impl Iterator<Item = u64>) -> Option<u64> {
    amounts.into_iter().try_fold(0u64, |acc, a| acc.checked_add(a))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utxo(tag: &str, amount: u64) -> UnspentOutput {
        UnspentOutput::new(tag.repeat(64 / tag.len()), 0, amount)
    }

    #[test]
    fn test_change_appended_last() {
        let outputs = TransactionBuilder::new()
            .add_inputs([utxo("a", 5_000_000), utxo("b", 3_000_000)])
            .add_output(TxOut::new("addr_test1dest", 4_000_000))
            .fee(180_000)
            .change_address("addr_test1self")
            .resolve_outputs()
            .unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[1], TxOut::new("addr_test1self", 3_820_000));
        let total: u64 = outputs.iter().map(|o| o.amount).sum();
        assert_eq!(total + 180_000, 8_000_000);
    }

    #[test]
    fn test_zero_change_omitted() {
        let outputs = TransactionBuilder::new()
            .add_input(utxo("a", 1_200_000))
            .add_output(TxOut::new("addr_test1dest", 1_000_000))
            .fee(200_000)
            .change_address("addr_test1self")
            .resolve_outputs()
            .unwrap();
        assert_eq!(outputs.len(), 1);
    }

    #[test]
    fn test_withdrawal_and_deposit_in_change() {
        let outputs = TransactionBuilder::new()
            .add_input(utxo("a", 10_000_000))
            .withdrawal(Withdrawal::new("stake_test1me", 700_000))
            .deposit(2_000_000)
            .fee(200_000)
            .change_address("addr_test1self")
            .resolve_outputs()
            .unwrap();
        assert_eq!(outputs, vec![TxOut::new("addr_test1self", 8_500_000)]);
    }

    #[test]
    fn test_refund_in_change() {
        let outputs = TransactionBuilder::new()
            .add_input(utxo("a", 1_000_000))
            .refund(2_000_000)
            .fee(200_000)
            .change_address("addr_test1self")
            .resolve_outputs()
            .unwrap();
        assert_eq!(outputs[0].amount, 2_800_000);
    }

    #[test]
    fn test_insufficient_inputs() {
        let err = TransactionBuilder::new()
            .add_input(utxo("a", 1_000_000))
            .add_output(TxOut::new("addr_test1dest", 1_000_000))
            .fee(170_000)
            .change_address("addr_test1self")
            .resolve_outputs()
            .unwrap_err();
        assert!(matches!(
            err,
            TxError::InsufficientInputs { need: 1_170_000, have: 1_000_000 }
        ));
    }

    #[test]
    fn test_validation_errors() {
        let no_inputs = TransactionBuilder::new()
            .add_output(TxOut::new("addr_test1dest", 1))
            .resolve_outputs();
        assert!(matches!(no_inputs, Err(TxError::Validation(_))));

        let no_outputs = TransactionBuilder::new()
            .add_input(utxo("a", 1))
            .resolve_outputs();
        assert!(matches!(no_outputs, Err(TxError::Validation(_))));

        let duplicate = TransactionBuilder::new()
            .add_input(utxo("a", 1))
            .add_input(utxo("a", 1))
            .add_output(TxOut::new("addr_test1dest", 1))
            .resolve_outputs();
        assert!(matches!(duplicate, Err(TxError::Validation(m)) if m.contains("twice")));
    }

    #[test]
    fn test_no_change_address_leaves_outputs_alone() {
        let outputs = TransactionBuilder::new()
            .add_input(utxo("a", 1))
            .add_output(TxOut::new("addr_test1dest", 5))
            .resolve_outputs()
            .unwrap();
        assert_eq!(outputs, vec![TxOut::new("addr_test1dest", 5)]);
    }
}
