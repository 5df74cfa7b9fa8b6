//! UTXO listing and selection strategies.
//!
//! Outputs are never cached: every listing re-queries the node. The default
//! selection spends every output at the funding address.

use crate::error::WalletError;
use adakit_node::{CommandRunner, NodeCli, NodeError};
use adakit_types::UnspentOutput;
use serde::{Deserialize, Serialize};

// =============================================================================
// Listing
// =============================================================================

/// Header lines of the node's UTXO table.
const TABLE_HEADER_LINES: usize = 2;

/// Parse the node's UTXO table.
///
/// Drops the two header lines and blank lines, then maps whitespace-split
/// fields positionally to `(hash, index, amount)`. Anything after the amount
/// must start with the `lovelace` unit.
pub fn parse_utxo_table(table: &str) -> Result<Vec<UnspentOutput>, NodeError> {
    table
        .lines()
        .skip(TABLE_HEADER_LINES)
        .filter(|line| !line.trim().is_empty())
        .map(parse_row)
        .collect()
}

fn parse_row(line: &str) -> Result<UnspentOutput, NodeError> {
    let malformed = |why: &str| NodeError::Parse(format!("utxo row {:?}: {}", line.trim(), why));
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 3 {
        return Err(malformed("expected hash, index and amount"));
    }
    let index: u32 = fields[1].parse().map_err(|_| malformed("index is not an integer"))?;
    let amount: u64 = fields[2].parse().map_err(|_| malformed("amount is not an integer"))?;
    if fields.len() > 3 && fields[3] != "lovelace" {
        return Err(malformed("unexpected unit"));
    }
    Ok(UnspentOutput::new(fields[0], index, amount))
}

/// Lists unspent outputs of an address.
pub struct UtxoSelector<'a, R> {
    node: &'a NodeCli<R>,
}

impl<'a, R: CommandRunner> UtxoSelector<'a, R> {
    pub fn new(node: &'a NodeCli<R>) -> Self {
        Self { node }
    }

    /// Fresh listing of `address`.
    pub async fn list(&self, address: &str) -> Result<Vec<UnspentOutput>, WalletError> {
        let table = self
            .node
            .query_utxo(address)
            .await
            .map_err(WalletError::query("query utxo"))?;
        let utxos = parse_utxo_table(&table).map_err(WalletError::query("query utxo"))?;
        log::debug!("{} unspent output(s) at {}", utxos.len(), address);
        Ok(utxos)
    }

    /// Sum of every unspent output at `address`.
    pub async fn balance(&self, address: &str) -> Result<u64, WalletError> {
        Ok(self.list(address).await?.iter().map(|u| u.amount).sum())
    }
}

// =============================================================================
// Selection
// =============================================================================

/// Available UTXO selection strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionStrategy {
    /// Spend every output at the address.
    #[default]
    All,
    /// Smallest single output that covers the target, else largest-first.
    BestFit,
    /// Prefer largest outputs first (minimizes number of inputs).
    LargestFirst,
    /// Prefer smallest outputs first (consolidates dust).
    SmallestFirst,
}

impl std::str::FromStr for SelectionStrategy {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, WalletError> {
        match s {
            "best-fit" => Ok(SelectionStrategy::BestFit),
            "largest" | "largest-first" => Ok(SelectionStrategy::LargestFirst),
            "smallest" | "smallest-first" => Ok(SelectionStrategy::SmallestFirst),
            "all" => Ok(SelectionStrategy::All),
            other => Err(WalletError::Validation(format!(
                "unknown selection strategy: {}",
                other
            ))),
        }
    }
}

/// Result of UTXO selection.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    /// Selected UTXOs.
    pub selected: Vec<UnspentOutput>,
    /// Total amount of selected UTXOs.
    pub total: u64,
    /// Change amount (total - target - fee).
    pub change: u64,
}

/// Select UTXOs to meet a target amount.
///
/// Returns `None` if insufficient funds.
pub fn select_utxos(
    candidates: &[UnspentOutput],
    target_amount: u64,
    fee: u64,
    strategy: SelectionStrategy,
) -> Option<SelectionResult> {
    if candidates.is_empty() {
        return None;
    }

    let needed = target_amount.checked_add(fee)?;

    match strategy {
        SelectionStrategy::All => select_all(candidates, needed),
        SelectionStrategy::LargestFirst => select_sorted(candidates, needed, true),
        SelectionStrategy::SmallestFirst => select_sorted(candidates, needed, false),
        SelectionStrategy::BestFit => select_best_fit(candidates, needed),
    }
}

fn select_all(candidates: &[UnspentOutput], needed: u64) -> Option<SelectionResult> {
    let total = candidates
        .iter()
        .try_fold(0u64, |acc, c| acc.checked_add(c.amount))?;
    Some(SelectionResult {
        selected: candidates.to_vec(),
        total,
        change: total.checked_sub(needed)?,
    })
}

fn select_sorted(
    candidates: &[UnspentOutput],
    needed: u64,
    largest_first: bool,
) -> Option<SelectionResult> {
    let mut sorted: Vec<_> = candidates.to_vec();
    if largest_first {
        sorted.sort_by(|a, b| b.amount.cmp(&a.amount));
    } else {
        sorted.sort_by(|a, b| a.amount.cmp(&b.amount));
    }

    accumulate(&sorted, needed)
}

fn select_best_fit(candidates: &[UnspentOutput], needed: u64) -> Option<SelectionResult> {
    let best = candidates
        .iter()
        .filter(|c| c.amount >= needed)
        .min_by_key(|c| c.amount);

    if let Some(best) = best {
        return Some(SelectionResult {
            selected: vec![best.clone()],
            total: best.amount,
            change: best.amount - needed,
        });
    }

    select_sorted(candidates, needed, true)
}

/// Accumulate outputs in order until we meet the target.
fn accumulate(ordered: &[UnspentOutput], needed: u64) -> Option<SelectionResult> {
    let mut selected = Vec::new();
    let mut total = 0u64;

    for candidate in ordered {
        selected.push(candidate.clone());
        total = total.checked_add(candidate.amount)?;
        if total >= needed {
            return Some(SelectionResult {
                selected,
                total,
                change: total - needed,
            });
        }
    }

    None
}
