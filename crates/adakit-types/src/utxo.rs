//! Unspent outputs, transaction outputs, withdrawals and transaction ids.

use crate::TypesError;
use serde::{Deserialize, Serialize};

/// An unspent transaction output locked by some address.
///
/// Unique by `(tx_hash, output_index)`. A value is a snapshot: it goes stale
/// as soon as any transaction spends the referenced output, so callers
/// re-query before reusing one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnspentOutput {
    pub tx_hash: String,
    pub output_index: u32,
    /// Amount in lovelace.
    pub amount: u64,
}

impl UnspentOutput {
    pub fn new(tx_hash: impl Into<String>, output_index: u32, amount: u64) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            output_index,
            amount,
        }
    }

    /// Input reference in node syntax, `hash#index`.
    pub fn tx_in(&self) -> String {
        format!("{}#{}", self.tx_hash, self.output_index)
    }

    /// Parse a `hash#index` reference (amount unknown, set to 0).
    pub fn parse_ref(s: &str) -> Result<Self, TypesError> {
        let (hash, index) = s
            .split_once('#')
            .ok_or_else(|| TypesError::InvalidOutputRef(s.to_string()))?;
        if hash.is_empty() {
            return Err(TypesError::InvalidOutputRef(s.to_string()));
        }
        let index = index
            .parse()
            .map_err(|_| TypesError::InvalidOutputRef(s.to_string()))?;
        Ok(Self::new(hash, index, 0))
    }
}

/// A transaction output: lovelace paid to an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub address: String,
    pub amount: u64,
}

impl TxOut {
    pub fn new(address: impl Into<String>, amount: u64) -> Self {
        Self {
            address: address.into(),
            amount,
        }
    }

    /// Output in node syntax, `address+amount`.
    pub fn tx_out(&self) -> String {
        format!("{}+{}", self.address, self.amount)
    }

    /// Parse an `address+amount` output.
    pub fn parse(s: &str) -> Result<Self, TypesError> {
        let (address, amount) = s
            .rsplit_once('+')
            .ok_or_else(|| TypesError::InvalidAmount(s.to_string()))?;
        let amount = crate::amount::parse_lovelace(amount)?;
        Ok(Self::new(address, amount))
    }
}

/// Reward withdrawal from a staking address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub stake_address: String,
    pub amount: u64,
}

impl Withdrawal {
    pub fn new(stake_address: impl Into<String>, amount: u64) -> Self {
        Self {
            stake_address: stake_address.into(),
            amount,
        }
    }

    /// Withdrawal in node syntax, `stake_address+amount`.
    pub fn cli_value(&self) -> String {
        format!("{}+{}", self.stake_address, self.amount)
    }
}

/// Canonical, content-derived transaction identifier (hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub String);

impl TxId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
