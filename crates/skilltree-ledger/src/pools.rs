//! Named resource balances owned by one tree instance.
//!
//! All mutation goes through checked arithmetic; a withdrawal never leaves a
//! pool negative and a deposit never wraps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use skilltree_types::{PoolId, ResourceShortfall};

use crate::LedgerError;

/// Resource pools available to a tree instance, e.g. `{SkillPoint: 3}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePools {
    balances: BTreeMap<PoolId, u32>,
}

impl ResourcePools {
    /// Create an empty set of pools.
    pub const fn new() -> Self {
        Self {
            balances: BTreeMap::new(),
        }
    }

    /// Create pools from an existing balance map.
    pub const fn from_balances(balances: BTreeMap<PoolId, u32>) -> Self {
        Self { balances }
    }

    /// Builder-style helper that sets a pool balance.
    #[must_use]
    pub fn with_pool(mut self, pool: impl Into<PoolId>, amount: u32) -> Self {
        self.balances.insert(pool.into(), amount);
        self
    }

    /// Overwrite the balance of a pool.
    pub fn set(&mut self, pool: impl Into<PoolId>, amount: u32) {
        self.balances.insert(pool.into(), amount);
    }

    /// Current balance of a pool. Unknown pools hold 0.
    pub fn available(&self, pool: &PoolId) -> u32 {
        self.balances.get(pool).copied().unwrap_or(0)
    }

    /// Whether the pool holds at least `amount`.
    pub fn has(&self, pool: &PoolId, amount: u32) -> bool {
        self.available(pool) >= amount
    }

    /// Add `amount` to a pool.
    pub fn deposit(&mut self, pool: &PoolId, amount: u32) -> Result<(), LedgerError> {
        let entry = self.balances.entry(pool.clone()).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| LedgerError::ArithmeticOverflow {
                context: format!("deposit of {amount} into {pool}"),
            })?;
        Ok(())
    }

    /// Remove `amount` from a pool.
    ///
    /// Fails with [`LedgerError::InsufficientResource`] if the pool holds
    /// less than `amount`; the pool is left untouched in that case.
    pub fn withdraw(&mut self, pool: &PoolId, amount: u32) -> Result<(), LedgerError> {
        let available = self.available(pool);
        let remaining =
            available
                .checked_sub(amount)
                .ok_or_else(|| LedgerError::InsufficientResource {
                    shortfalls: vec![ResourceShortfall {
                        pool: pool.clone(),
                        required: amount,
                        available,
                        shortfall: amount.saturating_sub(available),
                    }],
                })?;
        self.balances.insert(pool.clone(), remaining);
        Ok(())
    }

    /// Iterate over all pools and their balances, in pool order.
    pub fn iter(&self) -> impl Iterator<Item = (&PoolId, u32)> {
        self.balances.iter().map(|(pool, amount)| (pool, *amount))
    }

    /// Copy of the raw balance map, used when capturing save data.
    pub fn to_balances(&self) -> BTreeMap<PoolId, u32> {
        self.balances.clone()
    }

    pub(crate) const fn balances(&self) -> &BTreeMap<PoolId, u32> {
        &self.balances
    }

    pub(crate) fn replace_balances(&mut self, balances: BTreeMap<PoolId, u32>) {
        self.balances = balances;
    }
}
