//! Resource pools, cost resolution and allocation bookkeeping.
//!
//! Every point spent on a skill node flows through this crate. Pools are
//! never deducted partially: a cost is first resolved against the pools,
//! then committed as a single all-or-nothing transaction. Each committed
//! spend and each refund is appended to the [`AllocationLedger`] so that
//! refunds and "points spent" conditions can be answered later.
//!
//! # Architecture
//!
//! - [`pools`] -- The [`ResourcePools`] struct: named balances.
//! - [`cost`] -- Cost definitions, [`resolve`], [`commit`] and [`refund`].
//! - [`ledger`] -- The [`AllocationLedger`]: append-only spend/refund log.
//! - [`refund`] -- The [`RefundPolicy`] applied on deactivation and respec.
//!
//! # Usage
//!
//! ```
//! use skilltree_ledger::{CostDefinition, CostEntry, ResourcePools, commit, resolve};
//!
//! let mut pools = ResourcePools::new().with_pool("SkillPoint", 2);
//! let cost = CostDefinition::new().with_entry(CostEntry::flat("SkillPoint", 2));
//!
//! let resolved = resolve(&cost, 1, &pools).ok();
//! assert!(resolved.is_some());
//! if let Some(resolved) = resolved {
//!     assert!(commit(&resolved, &mut pools).is_ok());
//! }
//! assert_eq!(pools.available(&"SkillPoint".into()), 0);
//! ```

pub mod cost;
pub mod ledger;
pub mod pools;
pub mod refund;

// Re-export primary types at crate root.
pub use cost::{CostDefinition, CostEntry, ResolvedCost, add_amounts, commit, refund, resolve};
pub use ledger::{AllocationEntry, AllocationKind, AllocationLedger};
pub use pools::ResourcePools;
pub use refund::RefundPolicy;

use skilltree_types::ResourceShortfall;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur while resolving or moving resources.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// One or more pools cannot cover the cost.
    #[error("insufficient resources: {}", format_shortfalls(.shortfalls))]
    InsufficientResource {
        /// Every pool that is short, in pool order.
        shortfalls: Vec<ResourceShortfall>,
    },

    /// An arithmetic overflow occurred while summing or moving amounts.
    #[error("arithmetic overflow in ledger computation: {context}")]
    ArithmeticOverflow {
        /// Description of what was being computed.
        context: String,
    },

    /// A refund percentage outside 0..=100 was configured.
    #[error("refund percentage must be between 0 and 100, got {0}")]
    InvalidRefundPercent(u8),
}

fn format_shortfalls(shortfalls: &[ResourceShortfall]) -> String {
    shortfalls
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use skilltree_types::PoolId;

    #[test]
    fn insufficient_resource_message_lists_every_pool() {
        let err = LedgerError::InsufficientResource {
            shortfalls: vec![
                ResourceShortfall {
                    pool: PoolId::from("Gold"),
                    required: 10,
                    available: 4,
                    shortfall: 6,
                },
                ResourceShortfall {
                    pool: PoolId::from("SkillPoint"),
                    required: 2,
                    available: 1,
                    shortfall: 1,
                },
            ],
        };
        let message = err.to_string();
        assert!(message.contains("Gold short by 6"));
        assert!(message.contains("SkillPoint short by 1"));
    }
}
