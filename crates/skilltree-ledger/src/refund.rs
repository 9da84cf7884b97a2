//! Refund policy applied when levels are removed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use skilltree_types::PoolId;

use crate::LedgerError;

/// Share of the paid cost returned on deactivation or respec.
///
/// The percentage applies uniformly to every pool and rounds down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RefundPolicy {
    percent: u8,
}

impl RefundPolicy {
    /// Create a policy refunding `percent` of each paid amount.
    pub const fn new(percent: u8) -> Result<Self, LedgerError> {
        if percent > 100 {
            return Err(LedgerError::InvalidRefundPercent(percent));
        }
        Ok(Self { percent })
    }

    /// Refund everything that was paid.
    pub const fn full() -> Self {
        Self { percent: 100 }
    }

    /// Refund nothing.
    pub const fn none() -> Self {
        Self { percent: 0 }
    }

    /// The configured percentage.
    pub const fn percent(self) -> u8 {
        self.percent
    }

    /// Portion of `paid` that is returned.
    pub fn apply(self, paid: u32) -> u32 {
        u64::from(paid)
            .checked_mul(u64::from(self.percent))
            .and_then(|scaled| scaled.checked_div(100))
            .and_then(|amount| u32::try_from(amount).ok())
            .unwrap_or(paid)
    }

    /// Apply the policy to every pool, dropping pools that refund nothing.
    pub fn apply_all(self, paid: &BTreeMap<PoolId, u32>) -> BTreeMap<PoolId, u32> {
        paid.iter()
            .filter_map(|(pool, amount)| {
                let refunded = self.apply(*amount);
                (refunded > 0).then(|| (pool.clone(), refunded))
            })
            .collect()
    }
}

impl Default for RefundPolicy {
    fn default() -> Self {
        Self::full()
    }
}

impl TryFrom<u8> for RefundPolicy {
    type Error = LedgerError;

    fn try_from(percent: u8) -> Result<Self, Self::Error> {
        Self::new(percent)
    }
}

impl From<RefundPolicy> for u8 {
    fn from(policy: RefundPolicy) -> Self {
        policy.percent
    }
}
