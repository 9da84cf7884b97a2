//! Enumeration types shared by the engine, the persistence layer and the UI.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Node state
// ---------------------------------------------------------------------------

/// Runtime state of a skill node.
///
/// `Unlockable` is a UI affordance only: it is recomputed after every
/// mutation and never gates a transaction. A node is `Unlocked` from level 1
/// up to and including its maximum level.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum NodeState {
    /// Not yet acquired and not currently activatable.
    #[default]
    Locked,
    /// Not yet acquired, but every condition currently passes.
    Unlockable,
    /// Acquired at level 1 or higher.
    Unlocked,
}

impl NodeState {
    /// Whether the node has been acquired.
    pub const fn is_unlocked(self) -> bool {
        matches!(self, Self::Unlocked)
    }
}

// ---------------------------------------------------------------------------
// Comparison operators
// ---------------------------------------------------------------------------

/// Comparison applied by an attribute requirement.
///
/// The attribute's live value is the left-hand side, the configured threshold
/// the right-hand side.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ComparisonOp {
    /// `value > threshold`
    GreaterThan,
    /// `value >= threshold`
    #[default]
    GreaterOrEqual,
    /// `value == threshold`
    Equal,
    /// `value != threshold`
    NotEqual,
    /// `value <= threshold`
    LessOrEqual,
    /// `value < threshold`
    LessThan,
}

impl ComparisonOp {
    /// Apply the comparison to `value` (left) and `threshold` (right).
    pub fn compare(self, value: Decimal, threshold: Decimal) -> bool {
        match self {
            Self::GreaterThan => value > threshold,
            Self::GreaterOrEqual => value >= threshold,
            Self::Equal => value == threshold,
            Self::NotEqual => value != threshold,
            Self::LessOrEqual => value <= threshold,
            Self::LessThan => value < threshold,
        }
    }

    /// Mathematical symbol for tooltips and failure messages.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::GreaterThan => ">",
            Self::GreaterOrEqual => ">=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessOrEqual => "<=",
            Self::LessThan => "<",
        }
    }
}

impl core::fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.symbol())
    }
}
