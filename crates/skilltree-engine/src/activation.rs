//! The activation engine: buying, removing and resetting node levels.
//!
//! # Purchase pipeline
//!
//! [`ActivationEngine::try_activate`] runs these steps in order and stops at
//! the first rejection. Nothing is mutated before step 4.
//!
//! 1. Node at max level: [`ActivationOutcome::AlreadyUnlocked`].
//! 2. Structural prerequisite (non-root node with no unlocked parent):
//!    [`ActivationOutcome::NotUnlockable`].
//! 3. Conditions: [`ActivationOutcome::ConditionsFailed`] with every reason.
//! 4. Cost resolution: [`ActivationOutcome::InsufficientResource`].
//! 5. Commit the cost (all-or-nothing) and record it in the ledger.
//! 6. Write the new level.
//! 7. Fire node events in declaration order. Failures are logged and
//!    reported, never rolled back.
//!
//! Every mutation ends by recomputing the `Locked`/`Unlockable` affordance of
//! the nodes still at level 0.

use std::collections::{BTreeMap, BTreeSet};

use skilltree_ledger::{
    AllocationLedger, LedgerError, RefundPolicy, add_amounts, commit, refund, resolve,
};
use skilltree_types::{NodeId, NodeStatus, PoolId, ResourceShortfall, SaveGameData};

use crate::attributes::AttributeSource;
use crate::condition::{ConditionContext, Evaluation, evaluate_node};
use crate::error::{EngineError, GraphError};
use crate::event::{EventContext, EventFailure, EventPhase, GameplayHost, fire_events};
use crate::graph::SkillTreeGraph;
use crate::node::SkillNode;
use crate::save::{self, RestoreReport};
use crate::tree::SkillTree;

// ---------------------------------------------------------------------------
// Context and outcomes
// ---------------------------------------------------------------------------

/// Collaborators consulted during one engine call.
pub struct ActivationContext<'a> {
    /// Live attribute values of the owner.
    pub attributes: &'a dyn AttributeSource,
    /// Gameplay system that node events act on.
    pub host: &'a mut dyn GameplayHost,
}

/// Result of [`ActivationEngine::try_activate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// The level was bought.
    Activated {
        /// The node.
        node: NodeId,
        /// Level after the purchase.
        level: u32,
        /// Events that failed to fire. The purchase stands regardless.
        failed_events: Vec<EventFailure>,
    },
    /// At least one condition failed. Nothing was changed.
    ConditionsFailed {
        /// One message per failing condition.
        reasons: Vec<String>,
    },
    /// At least one pool cannot cover the cost. Nothing was changed.
    InsufficientResource {
        /// Every short pool.
        shortfalls: Vec<ResourceShortfall>,
    },
    /// The node is already at its maximum level. Nothing was changed.
    AlreadyUnlocked,
    /// The node has parents but none of them is unlocked. Nothing was changed.
    NotUnlockable,
}

impl ActivationOutcome {
    /// Whether a level was bought.
    pub const fn is_activated(&self) -> bool {
        matches!(self, Self::Activated { .. })
    }
}

/// Result of [`ActivationEngine::deactivate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeactivationOutcome {
    /// One level was removed and refunded.
    Deactivated {
        /// Level after removal.
        level: u32,
        /// Amount returned to each pool.
        refunded: BTreeMap<PoolId, u32>,
        /// Events that failed to fire.
        failed_events: Vec<EventFailure>,
    },
    /// The node is at level 0.
    NotActive,
    /// Removing the level would leave these unlocked nodes without a
    /// satisfied prerequisite. Nothing was changed.
    WouldInvalidate {
        /// Nodes that would be invalidated.
        dependents: Vec<NodeId>,
    },
}

/// Result of [`ActivationEngine::initialize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitializeSummary {
    /// Default-active nodes that were unlocked.
    pub defaults_applied: Vec<NodeId>,
    /// Number of events that failed while unlocking them.
    pub failed_events: usize,
}

/// Result of [`ActivationEngine::force_unlock`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForceUnlockOutcome {
    /// Level after the unlock.
    pub level: u32,
    /// Events that failed to fire. The unlock stands regardless.
    pub failed_events: Vec<EventFailure>,
}

/// Result of [`ActivationEngine::force_unlock_descendants`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForceUnlockSummary {
    /// Nodes whose level changed, parents first.
    pub changed: Vec<NodeId>,
    /// Number of events that failed across those nodes.
    pub failed_events: usize,
}

/// Summary of a full respec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RespecSummary {
    /// Number of nodes reset to level 0.
    pub nodes_reset: usize,
    /// Amount returned to each pool.
    pub refunded: BTreeMap<PoolId, u32>,
    /// Nodes unlocked again because they are active by default.
    pub defaults_applied: Vec<NodeId>,
    /// Number of events that failed while resetting or re-applying defaults.
    pub failed_events: usize,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Policy knobs for activation, deactivation and respec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationEngine {
    refund_policy: RefundPolicy,
    require_unlocked_parent: bool,
}

impl Default for ActivationEngine {
    fn default() -> Self {
        Self::new(RefundPolicy::full(), true)
    }
}

impl ActivationEngine {
    /// Create an engine.
    ///
    /// With `require_unlocked_parent`, a node that has parents can only be
    /// bought once at least one of them is unlocked.
    pub const fn new(refund_policy: RefundPolicy, require_unlocked_parent: bool) -> Self {
        Self {
            refund_policy,
            require_unlocked_parent,
        }
    }

    /// The refund policy applied on deactivation and respec.
    pub const fn refund_policy(&self) -> RefundPolicy {
        self.refund_policy
    }

    /// Whether the structural prerequisite is enforced.
    pub const fn require_unlocked_parent(&self) -> bool {
        self.require_unlocked_parent
    }

    /// Unlock every default-active node and compute the initial affordances.
    ///
    /// Called once when a tree instance is created.
    pub fn initialize(
        &self,
        tree: &mut SkillTree,
        ctx: &mut ActivationContext<'_>,
    ) -> InitializeSummary {
        let (defaults_applied, failed_events) = apply_defaults(tree, ctx.host);
        self.refresh_states(tree, ctx.attributes);
        InitializeSummary {
            defaults_applied,
            failed_events,
        }
    }

    /// Buy the next level of a node.
    pub fn try_activate(
        &self,
        tree: &mut SkillTree,
        node_id: NodeId,
        ctx: &mut ActivationContext<'_>,
    ) -> Result<ActivationOutcome, EngineError> {
        let node = lookup(&tree.graph, node_id)?;
        let previous = node.level();

        let Some(target) = node.next_level() else {
            tracing::debug!(node = %node_id, level = previous, "Activation rejected: already at max level");
            return Ok(ActivationOutcome::AlreadyUnlocked);
        };

        if self.require_unlocked_parent && !structurally_reachable(&tree.graph, node_id) {
            tracing::debug!(node = %node_id, "Activation rejected: no unlocked parent");
            return Ok(ActivationOutcome::NotUnlockable);
        }

        let evaluation = evaluate(&tree.graph, &tree.ledger, node, ctx.attributes);
        if !evaluation.satisfied {
            tracing::debug!(
                node = %node_id,
                reasons = ?evaluation.failure_reasons,
                "Activation rejected: conditions failed"
            );
            return Ok(ActivationOutcome::ConditionsFailed {
                reasons: evaluation.failure_reasons,
            });
        }

        let resolved = match resolve(&node.cost, target, &tree.pools) {
            Ok(resolved) => resolved,
            Err(LedgerError::InsufficientResource { shortfalls }) => {
                tracing::debug!(node = %node_id, ?shortfalls, "Activation rejected: insufficient resources");
                return Ok(ActivationOutcome::InsufficientResource { shortfalls });
            }
            Err(other) => return Err(other.into()),
        };

        commit(&resolved, &mut tree.pools)?;
        tree.ledger.record_spend(node_id, target, &resolved);
        set_level(&mut tree.graph, node_id, target);

        let failed_events = fire(&tree.graph, node_id, previous, target, EventPhase::LevelUp, ctx.host);
        self.refresh_states(tree, ctx.attributes);

        tracing::info!(
            node = %node_id,
            level = target,
            failed_events = failed_events.len(),
            "Node activated"
        );
        Ok(ActivationOutcome::Activated {
            node: node_id,
            level: target,
            failed_events,
        })
    }

    /// Remove the top level of a node and refund what it cost.
    ///
    /// Refused with [`DeactivationOutcome::WouldInvalidate`] when an unlocked
    /// node that currently satisfies its prerequisites would stop doing so.
    pub fn deactivate(
        &self,
        tree: &mut SkillTree,
        node_id: NodeId,
        ctx: &mut ActivationContext<'_>,
    ) -> Result<DeactivationOutcome, EngineError> {
        let level = lookup(&tree.graph, node_id)?.level();
        let Some(lower) = level.checked_sub(1) else {
            return Ok(DeactivationOutcome::NotActive);
        };

        let paid = tree.ledger.spent_for_level(node_id, level);
        let dependents = self.invalidated_by(tree, node_id, lower, &paid, ctx.attributes);
        if !dependents.is_empty() {
            tracing::debug!(node = %node_id, ?dependents, "Deactivation rejected: would invalidate dependents");
            return Ok(DeactivationOutcome::WouldInvalidate { dependents });
        }

        let refunded = self.refund_policy.apply_all(&paid);
        refund(&refunded, &mut tree.pools)?;
        tree.ledger.record_refund(node_id, level, &paid);
        set_level(&mut tree.graph, node_id, lower);

        let failed_events = fire(&tree.graph, node_id, level, lower, EventPhase::LevelDown, ctx.host);
        self.refresh_states(tree, ctx.attributes);

        tracing::info!(node = %node_id, level = lower, ?refunded, "Node deactivated");
        Ok(DeactivationOutcome::Deactivated {
            level: lower,
            refunded,
            failed_events,
        })
    }

    /// Reset every node to level 0 and refund the tree's net spending.
    ///
    /// Nodes are reset children first. The refund policy is applied to the
    /// per-pool totals. Default-active nodes are unlocked again afterwards.
    pub fn respec(
        &self,
        tree: &mut SkillTree,
        ctx: &mut ActivationContext<'_>,
    ) -> Result<RespecSummary, EngineError> {
        let plan: Vec<(NodeId, u32)> = tree
            .graph
            .topological_order()
            .into_iter()
            .rev()
            .filter_map(|id| tree.graph.node(id).map(|n| (id, n.level())))
            .filter(|(_, level)| *level > 0)
            .collect();

        let mut total_paid = BTreeMap::new();
        for (id, _) in &plan {
            add_amounts(&mut total_paid, &tree.ledger.spent_on_node(*id))?;
        }
        let refunded = self.refund_policy.apply_all(&total_paid);
        refund(&refunded, &mut tree.pools)?;

        let mut failed_events = 0_usize;
        for (id, level) in &plan {
            for released in (1..=*level).rev() {
                let paid = tree.ledger.spent_for_level(*id, released);
                tree.ledger.record_refund(*id, released, &paid);
            }
            set_level(&mut tree.graph, *id, 0);
            let failures = fire(&tree.graph, *id, *level, 0, EventPhase::Reset, ctx.host);
            failed_events = failed_events.saturating_add(failures.len());
        }

        let (defaults_applied, default_failures) = apply_defaults(tree, ctx.host);
        failed_events = failed_events.saturating_add(default_failures);
        self.refresh_states(tree, ctx.attributes);

        tracing::info!(
            nodes_reset = plan.len(),
            ?refunded,
            defaults = defaults_applied.len(),
            "Tree respecced"
        );
        Ok(RespecSummary {
            nodes_reset: plan.len(),
            refunded,
            defaults_applied,
            failed_events,
        })
    }

    /// Unlock a node without checking conditions or charging its cost.
    ///
    /// Raises the node by one level, or straight to its maximum with
    /// `to_max`.
    pub fn force_unlock(
        &self,
        tree: &mut SkillTree,
        node_id: NodeId,
        to_max: bool,
        ctx: &mut ActivationContext<'_>,
    ) -> Result<ForceUnlockOutcome, EngineError> {
        let outcome = force_unlock_one(tree, node_id, to_max, ctx.host)?;
        self.refresh_states(tree, ctx.attributes);
        Ok(outcome)
    }

    /// Force unlock a node and its descendants up to `max_depth` edges away.
    pub fn force_unlock_descendants(
        &self,
        tree: &mut SkillTree,
        node_id: NodeId,
        max_depth: Option<u32>,
        to_max: bool,
        ctx: &mut ActivationContext<'_>,
    ) -> Result<ForceUnlockSummary, EngineError> {
        let mut targets = vec![node_id];
        targets.extend(tree.graph.descendants(node_id, max_depth)?);

        let mut summary = ForceUnlockSummary::default();
        for id in targets {
            let before = lookup(&tree.graph, id)?.level();
            let outcome = force_unlock_one(tree, id, to_max, ctx.host)?;
            if outcome.level != before {
                summary.changed.push(id);
            }
            summary.failed_events = summary
                .failed_events
                .saturating_add(outcome.failed_events.len());
        }
        self.refresh_states(tree, ctx.attributes);
        Ok(summary)
    }

    /// Recompute `Locked`/`Unlockable` for every node at level 0.
    ///
    /// A node is unlockable when its structural prerequisite holds and every
    /// condition passes. Cost is not considered.
    pub fn refresh_states(&self, tree: &mut SkillTree, attributes: &dyn AttributeSource) {
        let updates: Vec<(NodeId, bool)> = tree
            .graph
            .nodes()
            .filter(|n| !n.is_unlocked())
            .map(|n| {
                let unlockable = self.prerequisites_hold(&tree.graph, &tree.ledger, n, attributes);
                (n.id, unlockable)
            })
            .collect();

        for (id, unlockable) in updates {
            if let Some(node) = tree.graph.node_mut(id) {
                node.set_affordance(unlockable);
            }
        }
    }

    /// Read-only summary of a node for UI and gameplay callers.
    pub fn node_status(
        &self,
        tree: &SkillTree,
        node_id: NodeId,
        attributes: &dyn AttributeSource,
    ) -> Result<NodeStatus, EngineError> {
        let node = lookup(&tree.graph, node_id)?;

        let mut evaluation = Evaluation::pass();
        if self.require_unlocked_parent && !structurally_reachable(&tree.graph, node_id) {
            evaluation.merge(Evaluation::fail("requires an unlocked parent"));
        }
        evaluation.merge(evaluate(&tree.graph, &tree.ledger, node, attributes));

        let next_level_cost = match node.next_level() {
            Some(level) => node.cost.for_level(level)?,
            None => BTreeMap::new(),
        };

        Ok(NodeStatus {
            node_id,
            name: node.name.clone(),
            state: node.state(),
            level: node.level(),
            max_level: node.max_level(),
            conditions_met: evaluation.satisfied,
            failure_reasons: evaluation.failure_reasons,
            next_level_cost,
        })
    }

    /// Overwrite the tree from save data and resynchronise node events.
    ///
    /// The snapshot is checked with [`save::plan`] before the host is
    /// touched, so a rejected snapshot leaves both tree and host as they
    /// were. Effects of the current levels are then reset, children before
    /// parents, and the restored levels are replayed, parents before
    /// children.
    pub fn restore(
        &self,
        tree: &mut SkillTree,
        data: &SaveGameData,
        ctx: &mut ActivationContext<'_>,
    ) -> Result<RestoreReport, EngineError> {
        let plan = save::plan(data, tree)?;
        let order = tree.graph.topological_order();
        let mut failed_events = 0_usize;

        for id in order.iter().rev() {
            let level = tree.graph.node(*id).map_or(0, SkillNode::level);
            if level > 0 {
                let failures = fire(&tree.graph, *id, level, 0, EventPhase::Reset, ctx.host);
                failed_events = failed_events.saturating_add(failures.len());
            }
        }

        let mut report = plan.commit(tree);

        for id in &order {
            let level = tree.graph.node(*id).map_or(0, SkillNode::level);
            if level > 0 {
                let failures = fire(&tree.graph, *id, 0, level, EventPhase::LevelUp, ctx.host);
                failed_events = failed_events.saturating_add(failures.len());
            }
        }

        report.failed_events = failed_events;
        self.refresh_states(tree, ctx.attributes);
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Whether `node` could be bought right now, ignoring cost.
    fn prerequisites_hold(
        &self,
        graph: &SkillTreeGraph,
        ledger: &AllocationLedger,
        node: &SkillNode,
        attributes: &dyn AttributeSource,
    ) -> bool {
        (!self.require_unlocked_parent || structurally_reachable(graph, node.id))
            && evaluate(graph, ledger, node, attributes).satisfied
    }

    /// Unlocked nodes whose prerequisites hold now but would fail if
    /// `node_id` dropped to `lower` and released `paid`.
    fn invalidated_by(
        &self,
        tree: &mut SkillTree,
        node_id: NodeId,
        lower: u32,
        paid: &BTreeMap<PoolId, u32>,
        attributes: &dyn AttributeSource,
    ) -> Vec<NodeId> {
        let Some(current) = tree.graph.node(node_id).map(SkillNode::level) else {
            return Vec::new();
        };

        let holding_now: BTreeSet<NodeId> = self
            .unlocked_satisfied(&tree.graph, &tree.ledger, node_id, attributes)
            .into_iter()
            .collect();

        let mut simulated = tree.ledger.clone();
        simulated.record_refund(node_id, current, paid);
        set_level(&mut tree.graph, node_id, lower);
        let holding_after: BTreeSet<NodeId> = self
            .unlocked_satisfied(&tree.graph, &simulated, node_id, attributes)
            .into_iter()
            .collect();
        set_level(&mut tree.graph, node_id, current);

        holding_now.difference(&holding_after).copied().collect()
    }

    fn unlocked_satisfied(
        &self,
        graph: &SkillTreeGraph,
        ledger: &AllocationLedger,
        except: NodeId,
        attributes: &dyn AttributeSource,
    ) -> Vec<NodeId> {
        graph
            .nodes()
            .filter(|n| n.id != except && n.is_unlocked())
            .filter(|n| self.prerequisites_hold(graph, ledger, n, attributes))
            .map(|n| n.id)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn lookup(graph: &SkillTreeGraph, id: NodeId) -> Result<&SkillNode, EngineError> {
    graph
        .node(id)
        .ok_or_else(|| GraphError::NodeNotFound(id).into())
}

/// Roots are always reachable; other nodes need a parent at level 1 or more.
fn structurally_reachable(graph: &SkillTreeGraph, id: NodeId) -> bool {
    let parents = graph.parents(id).unwrap_or_default();
    parents.is_empty()
        || parents
            .iter()
            .filter_map(|p| graph.node(*p))
            .any(SkillNode::is_unlocked)
}

fn evaluate(
    graph: &SkillTreeGraph,
    ledger: &AllocationLedger,
    node: &SkillNode,
    attributes: &dyn AttributeSource,
) -> Evaluation {
    let ctx = ConditionContext {
        graph,
        node: node.id,
        attributes,
        ledger,
    };
    evaluate_node(node, &ctx)
}

fn set_level(graph: &mut SkillTreeGraph, id: NodeId, level: u32) {
    if let Some(node) = graph.node_mut(id) {
        node.set_level(level);
    }
}

fn fire(
    graph: &SkillTreeGraph,
    id: NodeId,
    previous_level: u32,
    new_level: u32,
    phase: EventPhase,
    host: &mut dyn GameplayHost,
) -> Vec<EventFailure> {
    let Some(node) = graph.node(id) else {
        return Vec::new();
    };
    let ctx = EventContext {
        node_id: id,
        node_name: &node.name,
        previous_level,
        new_level,
        phase,
    };
    fire_events(node, &ctx, host)
}

/// Unlock every default-active node still at level 0, free of charge.
///
/// Returns the unlocked nodes and the number of events that failed.
fn apply_defaults(tree: &mut SkillTree, host: &mut dyn GameplayHost) -> (Vec<NodeId>, usize) {
    let defaults: Vec<NodeId> = tree
        .graph
        .nodes()
        .filter(|n| n.active_by_default && !n.is_unlocked())
        .map(|n| n.id)
        .collect();

    let mut failed_events = 0_usize;
    for id in &defaults {
        set_level(&mut tree.graph, *id, 1);
        let failures = fire(&tree.graph, *id, 0, 1, EventPhase::LevelUp, host);
        failed_events = failed_events.saturating_add(failures.len());
        tracing::debug!(node = %id, "Default node unlocked");
    }
    (defaults, failed_events)
}

fn force_unlock_one(
    tree: &mut SkillTree,
    node_id: NodeId,
    to_max: bool,
    host: &mut dyn GameplayHost,
) -> Result<ForceUnlockOutcome, EngineError> {
    let node = lookup(&tree.graph, node_id)?;
    let previous = node.level();
    let target = if to_max {
        node.max_level()
    } else {
        node.next_level().unwrap_or(previous)
    };
    if target == previous {
        return Ok(ForceUnlockOutcome {
            level: previous,
            failed_events: Vec::new(),
        });
    }

    set_level(&mut tree.graph, node_id, target);
    let failed_events = fire(&tree.graph, node_id, previous, target, EventPhase::LevelUp, host);
    tracing::info!(
        node = %node_id,
        level = target,
        failed_events = failed_events.len(),
        "Node force unlocked"
    );
    Ok(ForceUnlockOutcome {
        level: target,
        failed_events,
    })
}
