//! End-to-end flows on a [`Wallet`]: payments, reward withdrawal and
//! certificate submission.
//!
//! Each flow selects inputs from a fresh UTXO listing, drafts a body with
//! change back to the payment address, estimates the fee, reselects when the
//! fee is not covered, rebuilds the body with the final fee, signs and
//! submits once.

use crate::error::WalletError;
use crate::registry::ArtifactRegistry;
use crate::utxo::{select_utxos, SelectionStrategy, UtxoSelector};
use crate::wallet::{RewardBalance, Wallet};
use adakit_node::CommandRunner;
use adakit_tx::{
    FinalTx, SubmissionClient, SubmittedTx, TransactionBuilder, WitnessCoordinator,
};
use adakit_types::{Certificate, Role, TxOut, Withdrawal};
use std::path::PathBuf;

/// Selection rounds before giving up on covering the fee.
const MAX_FEE_ROUNDS: usize = 4;

/// What a body must fund beyond its inputs.
struct Funding {
    /// Outputs plus deposits.
    target: u64,
    /// Withdrawal plus refunds.
    credit: u64,
    witness_count: usize,
}

impl<'a, R: CommandRunner, G: ArtifactRegistry> Wallet<'a, R, G> {
    /// Build a fee-final payment body without signing it.
    pub async fn prepare_payment(
        &self,
        outputs: Vec<TxOut>,
        strategy: SelectionStrategy,
    ) -> Result<FinalTx, WalletError> {
        if outputs.is_empty() {
            return Err(WalletError::Validation("payment has no outputs".into()));
        }
        let target = outputs
            .iter()
            .try_fold(0u64, |acc, o| acc.checked_add(o.amount))
            .ok_or_else(|| WalletError::Validation("payment total overflows".into()))?;
        let template = TransactionBuilder::new();
        let template = outputs.into_iter().fold(template, TransactionBuilder::add_output);
        let funding = Funding {
            target,
            credit: 0,
            witness_count: 1,
        };
        self.fund(template, funding, strategy).await
    }

    /// Pay `outputs` from this wallet, returning change to its payment address.
    pub async fn send(
        &self,
        outputs: Vec<TxOut>,
        strategy: SelectionStrategy,
    ) -> Result<SubmittedTx, WalletError> {
        let body = self.prepare_payment(outputs, strategy).await?;
        let keys = vec![self.artifact(Role::PaymentSkey)?];
        self.sign_and_submit(&body, &keys).await
    }

    /// Withdraw the full reward balance to the payment address.
    pub async fn withdraw_rewards(&self) -> Result<SubmittedTx, WalletError> {
        let staking_address = self.staking_address().await?;
        let amount = match self.reward_balance().await? {
            RewardBalance::NotRegistered => {
                return Err(WalletError::NotRegistered(staking_address))
            }
            RewardBalance::Registered(0) => {
                return Err(WalletError::Validation(format!(
                    "no rewards to withdraw from {}",
                    staking_address
                )))
            }
            RewardBalance::Registered(amount) => amount,
        };
        let keys = vec![
            self.artifact(Role::PaymentSkey)?,
            self.artifact(Role::StakeSkey)?,
        ];

        let template =
            TransactionBuilder::new().withdrawal(Withdrawal::new(staking_address, amount));
        let funding = Funding {
            target: 0,
            credit: amount,
            witness_count: keys.len(),
        };
        let body = self.fund(template, funding, SelectionStrategy::default()).await?;
        log::info!("withdrawing {} lovelace of rewards for {}", amount, self.name());
        self.sign_and_submit(&body, &keys).await
    }

    /// Submit `certificates` in one transaction funded by this wallet.
    ///
    /// `deposit` is locked and `refund` returned by the certificates; both are
    /// the caller's to compute from the protocol parameters. The body is
    /// signed with the payment key, the stake key when present, and every
    /// key in `extra_signers` (cold keys, owner stake keys).
    pub async fn submit_certificates(
        &self,
        certificates: Vec<Certificate>,
        deposit: u64,
        refund: u64,
        extra_signers: &[PathBuf],
    ) -> Result<SubmittedTx, WalletError> {
        if certificates.is_empty() {
            return Err(WalletError::Validation("no certificates to submit".into()));
        }
        let mut keys = vec![self.artifact(Role::PaymentSkey)?];
        if let Ok(stake_skey) = self.artifact(Role::StakeSkey) {
            keys.push(stake_skey);
        }
        keys.extend(extra_signers.iter().cloned());

        let template = TransactionBuilder::new()
            .add_certificates(certificates)
            .deposit(deposit)
            .refund(refund);
        let funding = Funding {
            target: deposit,
            credit: refund,
            witness_count: keys.len(),
        };
        let body = self.fund(template, funding, SelectionStrategy::default()).await?;
        self.sign_and_submit(&body, &keys).await
    }

    /// Select inputs for `template` until they cover its needs and the fee,
    /// then rebuild it with that fee.
    async fn fund(
        &self,
        template: TransactionBuilder,
        funding: Funding,
        strategy: SelectionStrategy,
    ) -> Result<FinalTx, WalletError> {
        let address = self.payment_address().await?;
        let utxos = UtxoSelector::new(self.session.node()).list(&address).await?;
        let have: u64 = utxos.iter().map(|u| u.amount).sum();
        let template = template.change_address(address);

        let mut fee = 0u64;
        for round in 0..MAX_FEE_ROUNDS {
            let need = funding
                .target
                .checked_add(fee)
                .ok_or_else(|| WalletError::Validation("amount overflows".into()))?;
            let from_inputs = need.saturating_sub(funding.credit);
            let selection = select_utxos(&utxos, from_inputs, 0, strategy)
                .ok_or(WalletError::InsufficientBalance { need: from_inputs, have })?;

            let draft = template
                .clone()
                .add_inputs(selection.selected)
                .fee(0)
                .build_raw(self.session)
                .await?;
            let estimate = draft.estimate_fee(self.session, funding.witness_count).await?;
            log::debug!(
                "round {}: {} input(s) totalling {}, fee estimate {}",
                round,
                draft.body().inputs.len(),
                selection.total,
                estimate
            );

            let covered = selection
                .total
                .checked_add(funding.credit)
                .map_or(true, |available| {
                    funding
                        .target
                        .checked_add(estimate)
                        .map_or(false, |required| available >= required)
                });
            if covered {
                return Ok(draft.finalize_with_fee(self.session, estimate).await?);
            }
            fee = estimate;
        }

        Err(WalletError::InsufficientBalance {
            need: funding.target.saturating_add(fee),
            have,
        })
    }

    async fn sign_and_submit(
        &self,
        body: &FinalTx,
        keys: &[PathBuf],
    ) -> Result<SubmittedTx, WalletError> {
        let signed = WitnessCoordinator::new(self.session)
            .sign(body, keys, None)
            .await?;
        let submitted = SubmissionClient::new(self.session).submit(signed).await?;
        log::info!("{} submitted {}", self.name(), submitted.txid);
        Ok(submitted)
    }
}
