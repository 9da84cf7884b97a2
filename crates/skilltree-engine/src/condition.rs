//! Activation conditions and the condition evaluator.
//!
//! Conditions are tagged variants. Code-defined checks plug in through the
//! [`ConditionCheck`] trait and the [`ActivationCondition::Custom`] variant.
//!
//! Evaluation is side-effect free and never short-circuits: every condition
//! on a node is checked so that the UI can show every failure reason at once.

use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use skilltree_ledger::AllocationLedger;
use skilltree_types::{AttributeId, ComparisonOp, NodeId, PoolId};

use crate::attributes::AttributeSource;
use crate::graph::SkillTreeGraph;
use crate::node::SkillNode;

// ---------------------------------------------------------------------------
// Evaluation result
// ---------------------------------------------------------------------------

/// Outcome of evaluating one or more conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Whether every evaluated condition passed.
    pub satisfied: bool,
    /// One human-readable message per failing condition.
    pub failure_reasons: Vec<String>,
}

impl Evaluation {
    /// A passing evaluation.
    pub const fn pass() -> Self {
        Self {
            satisfied: true,
            failure_reasons: Vec::new(),
        }
    }

    /// A failing evaluation with a single reason.
    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            satisfied: false,
            failure_reasons: vec![reason.into()],
        }
    }

    /// Fold another evaluation into this one with AND semantics.
    pub fn merge(&mut self, other: Self) {
        self.satisfied = self.satisfied && other.satisfied;
        self.failure_reasons.extend(other.failure_reasons);
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Read-only view handed to every condition.
#[derive(Clone, Copy)]
pub struct ConditionContext<'a> {
    /// The graph holding the node and its relatives.
    pub graph: &'a SkillTreeGraph,
    /// The node whose conditions are evaluated.
    pub node: NodeId,
    /// Live attribute values of the owner.
    pub attributes: &'a dyn AttributeSource,
    /// Spend history of the tree instance.
    pub ledger: &'a AllocationLedger,
}

impl fmt::Debug for ConditionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionContext")
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

/// Extension point for code-defined conditions.
pub trait ConditionCheck: fmt::Debug + Send + Sync {
    /// Test the condition.
    fn evaluate(&self, ctx: &ConditionContext<'_>) -> Evaluation;

    /// Short text for tooltips.
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// A predicate gating the purchase of a node level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivationCondition {
    /// A live attribute compared against a threshold.
    AttributeRequirement {
        /// Attribute to read.
        attribute: AttributeId,
        /// Comparison applied as `value <op> threshold`.
        #[serde(default)]
        op: ComparisonOp,
        /// Right-hand side of the comparison.
        threshold: Decimal,
    },

    /// A parent node must have reached a level.
    ///
    /// With `parent` set, that specific node is checked. Without it, any one
    /// of the owning node's parents suffices.
    ParentLevel {
        /// The specific node to check, if any.
        #[serde(default)]
        parent: Option<NodeId>,
        /// Minimum level.
        required_level: u32,
    },

    /// At least `required` units of a pool spent across the tree, net of
    /// refunds.
    ResourceSpent {
        /// Pool to total.
        pool: PoolId,
        /// Minimum net amount spent.
        required: u32,
    },

    /// Every child condition must pass.
    All {
        /// Child conditions.
        conditions: Vec<Self>,
    },

    /// At least one child condition must pass. An empty list passes.
    Any {
        /// Child conditions.
        conditions: Vec<Self>,
    },

    /// A code-defined condition. Not serializable.
    #[serde(skip)]
    Custom(Arc<dyn ConditionCheck>),
}

impl ActivationCondition {
    /// Shorthand for an attribute requirement.
    pub fn attribute(attribute: impl Into<AttributeId>, op: ComparisonOp, threshold: Decimal) -> Self {
        Self::AttributeRequirement {
            attribute: attribute.into(),
            op,
            threshold,
        }
    }

    /// Shorthand for "any parent at `required_level` or above".
    pub const fn any_parent_level(required_level: u32) -> Self {
        Self::ParentLevel {
            parent: None,
            required_level,
        }
    }

    /// Evaluate this condition.
    pub fn evaluate(&self, ctx: &ConditionContext<'_>) -> Evaluation {
        match self {
            Self::AttributeRequirement {
                attribute,
                op,
                threshold,
            } => match ctx.attributes.attribute(attribute) {
                Some(value) if op.compare(value, *threshold) => Evaluation::pass(),
                Some(value) => Evaluation::fail(format!(
                    "{attribute} must be {op} {threshold} (currently {value})"
                )),
                None => Evaluation::fail(format!("{attribute} is not available")),
            },

            Self::ParentLevel {
                parent: Some(parent),
                required_level,
            } => match ctx.graph.node(*parent) {
                Some(node) if node.level() >= *required_level => Evaluation::pass(),
                Some(node) => Evaluation::fail(format!(
                    "{} must be level {required_level} (currently {})",
                    node.name,
                    node.level()
                )),
                None => Evaluation::fail(format!("required parent {parent} does not exist")),
            },

            Self::ParentLevel {
                parent: None,
                required_level,
            } => evaluate_any_parent(ctx, *required_level),

            Self::ResourceSpent { pool, required } => {
                let spent = ctx.ledger.spent_on_pool(pool);
                if spent >= *required {
                    Evaluation::pass()
                } else {
                    Evaluation::fail(format!(
                        "requires {required} {pool} spent in this tree (currently {spent})"
                    ))
                }
            }

            Self::All { conditions } => conditions.iter().fold(Evaluation::pass(), |mut acc, c| {
                acc.merge(c.evaluate(ctx));
                acc
            }),

            Self::Any { conditions } => {
                if conditions.is_empty() {
                    return Evaluation::pass();
                }
                let results: Vec<Evaluation> = conditions.iter().map(|c| c.evaluate(ctx)).collect();
                if results.iter().any(|r| r.satisfied) {
                    Evaluation::pass()
                } else {
                    let reasons: Vec<String> =
                        results.into_iter().flat_map(|r| r.failure_reasons).collect();
                    Evaluation::fail(format!("none of: {}", reasons.join("; ")))
                }
            }

            Self::Custom(check) => check.evaluate(ctx),
        }
    }

    /// Short text for tooltips.
    pub fn describe(&self) -> String {
        match self {
            Self::AttributeRequirement {
                attribute,
                op,
                threshold,
            } => format!("{attribute} {op} {threshold}"),
            Self::ParentLevel {
                parent: Some(parent),
                required_level,
            } => format!("parent {parent} at level {required_level}"),
            Self::ParentLevel {
                parent: None,
                required_level,
            } => format!("any parent at level {required_level}"),
            Self::ResourceSpent { pool, required } => format!("{required} {pool} spent"),
            Self::All { conditions } => join_descriptions(conditions, " and "),
            Self::Any { conditions } => join_descriptions(conditions, " or "),
            Self::Custom(check) => check.describe(),
        }
    }
}

fn evaluate_any_parent(ctx: &ConditionContext<'_>, required_level: u32) -> Evaluation {
    let parents = ctx.graph.parents(ctx.node).unwrap_or_default();
    if parents.is_empty() {
        return Evaluation::fail(format!(
            "requires a parent at level {required_level}, but the node has no parents"
        ));
    }

    let highest = parents
        .iter()
        .filter_map(|id| ctx.graph.node(*id))
        .map(SkillNode::level)
        .max()
        .unwrap_or(0);

    if highest >= required_level {
        Evaluation::pass()
    } else {
        Evaluation::fail(format!(
            "requires a parent at level {required_level} (highest is {highest})"
        ))
    }
}

fn join_descriptions(conditions: &[ActivationCondition], separator: &str) -> String {
    let parts: Vec<String> = conditions.iter().map(ActivationCondition::describe).collect();
    format!("({})", parts.join(separator))
}

/// Evaluate every condition on `node` with AND semantics.
///
/// All conditions are evaluated even after one fails.
pub fn evaluate_node(node: &SkillNode, ctx: &ConditionContext<'_>) -> Evaluation {
    node.conditions
        .iter()
        .fold(Evaluation::pass(), |mut acc, condition| {
            acc.merge(condition.evaluate(ctx));
            acc
        })
}
