//! Cost definitions and the two-phase resolve/commit transaction.
//!
//! A node's [`CostDefinition`] is abstract: it names pools and amounts,
//! optionally varying with the level being bought. [`resolve`] binds it to
//! concrete pools and checks every balance without mutating anything;
//! [`commit`] then deducts all amounts or none.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use skilltree_types::{PoolId, ResourceShortfall};

use crate::{LedgerError, ResourcePools};

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// One pool and the amount it charges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEntry {
    /// Pool the amount is drawn from.
    pub pool: PoolId,
    /// Flat amount charged for any level not covered by `per_level`.
    #[serde(default)]
    pub amount: u32,
    /// Amount per target level; index 0 is the cost of reaching level 1.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub per_level: Vec<u32>,
}

impl CostEntry {
    /// A cost that charges the same amount for every level.
    pub fn flat(pool: impl Into<PoolId>, amount: u32) -> Self {
        Self {
            pool: pool.into(),
            amount,
            per_level: Vec::new(),
        }
    }

    /// A cost that varies by target level, falling back to the last table
    /// entry's flat `amount` for levels past the end of the table.
    pub fn scaled(pool: impl Into<PoolId>, per_level: Vec<u32>) -> Self {
        let amount = per_level.last().copied().unwrap_or(0);
        Self {
            pool: pool.into(),
            amount,
            per_level,
        }
    }

    /// Amount charged to reach `target_level` (1-based).
    pub fn amount_for_level(&self, target_level: u32) -> u32 {
        usize::try_from(target_level)
            .ok()
            .and_then(|level| level.checked_sub(1))
            .and_then(|index| self.per_level.get(index))
            .copied()
            .unwrap_or(self.amount)
    }
}

/// The full cost of a node: zero or more pool charges.
///
/// An empty definition means the node is free.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CostDefinition {
    entries: Vec<CostEntry>,
}

impl CostDefinition {
    /// A free cost definition.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builder-style helper that appends an entry.
    #[must_use]
    pub fn with_entry(mut self, entry: CostEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// The configured entries, in declaration order.
    pub fn entries(&self) -> &[CostEntry] {
        &self.entries
    }

    /// Whether the definition charges nothing at any level.
    pub fn is_free(&self) -> bool {
        self.entries.is_empty()
    }

    /// Amount per pool charged to reach `target_level`.
    ///
    /// Entries naming the same pool are summed. Zero amounts are dropped.
    pub fn for_level(&self, target_level: u32) -> Result<BTreeMap<PoolId, u32>, LedgerError> {
        let mut amounts: BTreeMap<PoolId, u32> = BTreeMap::new();
        for entry in &self.entries {
            let amount = entry.amount_for_level(target_level);
            if amount == 0 {
                continue;
            }
            let slot = amounts.entry(entry.pool.clone()).or_insert(0);
            *slot = slot
                .checked_add(amount)
                .ok_or_else(|| LedgerError::ArithmeticOverflow {
                    context: format!("summing cost entries for pool {}", entry.pool),
                })?;
        }
        Ok(amounts)
    }
}

// ---------------------------------------------------------------------------
// Resolved cost
// ---------------------------------------------------------------------------

/// A cost bound to concrete pools, every one of which could cover it at
/// resolution time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCost {
    amounts: BTreeMap<PoolId, u32>,
}

impl ResolvedCost {
    /// Wrap an already-validated amount map.
    pub const fn from_amounts(amounts: BTreeMap<PoolId, u32>) -> Self {
        Self { amounts }
    }

    /// Amount charged to a pool (0 if the pool is not charged).
    pub fn amount(&self, pool: &PoolId) -> u32 {
        self.amounts.get(pool).copied().unwrap_or(0)
    }

    /// Whether nothing is charged.
    pub fn is_free(&self) -> bool {
        self.amounts.is_empty()
    }

    /// Iterate over the charged pools.
    pub fn iter(&self) -> impl Iterator<Item = (&PoolId, u32)> {
        self.amounts.iter().map(|(pool, amount)| (pool, *amount))
    }

    /// The underlying amount map.
    pub const fn amounts(&self) -> &BTreeMap<PoolId, u32> {
        &self.amounts
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// Bind `definition` at `target_level` to `pools`.
///
/// Every pool is checked; when any is short the error lists all shortfalls.
/// Nothing is mutated.
pub fn resolve(
    definition: &CostDefinition,
    target_level: u32,
    pools: &ResourcePools,
) -> Result<ResolvedCost, LedgerError> {
    let amounts = definition.for_level(target_level)?;

    let shortfalls: Vec<ResourceShortfall> = amounts
        .iter()
        .filter(|(pool, required)| !pools.has(pool, **required))
        .filter_map(|(pool, required)| {
            let available = pools.available(pool);
            let shortfall = required.checked_sub(available)?;
            Some(ResourceShortfall {
                pool: pool.clone(),
                required: *required,
                available,
                shortfall,
            })
        })
        .collect();

    if shortfalls.is_empty() {
        Ok(ResolvedCost { amounts })
    } else {
        Err(LedgerError::InsufficientResource { shortfalls })
    }
}

/// Deduct a resolved cost from `pools`, all-or-nothing.
///
/// Withdrawals run on a copy that is swapped in only when every pool can
/// pay, so a failure leaves `pools` exactly as it was.
pub fn commit(resolved: &ResolvedCost, pools: &mut ResourcePools) -> Result<(), LedgerError> {
    let mut staged = pools.clone();
    let mut shortfalls = Vec::new();

    for (pool, amount) in resolved.iter() {
        match staged.withdraw(pool, amount) {
            Ok(()) => {}
            Err(LedgerError::InsufficientResource { shortfalls: short }) => {
                shortfalls.extend(short);
            }
            Err(other) => return Err(other),
        }
    }

    if !shortfalls.is_empty() {
        return Err(LedgerError::InsufficientResource { shortfalls });
    }

    *pools = staged;
    tracing::debug!(cost = ?resolved.amounts(), "Cost committed");
    Ok(())
}

/// Credit `amounts` back to `pools`, all-or-nothing.
pub fn refund(amounts: &BTreeMap<PoolId, u32>, pools: &mut ResourcePools) -> Result<(), LedgerError> {
    let mut staged = pools.balances().clone();
    add_amounts(&mut staged, amounts)?;
    pools.replace_balances(staged);
    Ok(())
}

/// Add every amount in `amounts` to `total`, checking for overflow.
pub fn add_amounts(
    total: &mut BTreeMap<PoolId, u32>,
    amounts: &BTreeMap<PoolId, u32>,
) -> Result<(), LedgerError> {
    for (pool, amount) in amounts {
        let slot = total.entry(pool.clone()).or_insert(0);
        *slot = slot
            .checked_add(*amount)
            .ok_or_else(|| LedgerError::ArithmeticOverflow {
                context: format!("totalling {pool}"),
            })?;
    }
    Ok(())
}
