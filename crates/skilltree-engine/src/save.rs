//! Capture and apply tree state.
//!
//! Both directions are synchronous, pure data transforms. [`capture`] visits
//! every node once. [`apply`] overwrites the tree from a snapshot without
//! re-checking conditions: restored state is trusted.
//!
//! Nodes missing from the snapshot end up `Locked` at level 0. Records that
//! name unknown nodes are skipped and reported, never fatal.
//!
//! When the snapshot was taken from a different tree version, node records
//! are not applied. The saved pools are restored and the full cost of every
//! saved level is credited back, so the player can spend the points again on
//! the new layout. Default-active nodes come back at level 1.

use std::collections::BTreeMap;

use chrono::Utc;
use skilltree_ledger::{ResolvedCost, ResourcePools, add_amounts, refund};
use skilltree_types::{NodeId, NodeState, PoolId, SaveGameData, SavedNodeState};

use crate::error::EngineError;
use crate::graph::SkillTreeGraph;
use crate::tree::SkillTree;

/// What [`apply`] did with a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Number of node records written to the tree.
    pub applied: usize,
    /// Record ids with no matching node. Skipped.
    pub unknown_node_ids: Vec<NodeId>,
    /// Nodes whose saved level exceeded their max level.
    pub clamped: Vec<NodeId>,
    /// The snapshot came from a different tree or version.
    pub version_mismatch: bool,
    /// Amounts credited back because of a version mismatch.
    pub refunded: BTreeMap<PoolId, u32>,
    /// Default-active nodes unlocked again after a version mismatch.
    pub defaults_applied: Vec<NodeId>,
    /// Number of node events that failed while resyncing the host.
    pub failed_events: usize,
}

impl RestoreReport {
    /// Whether every record was applied as saved.
    pub fn is_complete(&self) -> bool {
        self.unknown_node_ids.is_empty() && self.clamped.is_empty() && !self.version_mismatch
    }
}

/// Snapshot the tree: one record per node in graph order, plus pool balances.
pub fn capture(tree: &SkillTree) -> SaveGameData {
    let nodes = tree
        .graph
        .nodes()
        .map(|node| SavedNodeState {
            node_id: node.id,
            state: node.state(),
            level: node.level(),
        })
        .collect();

    SaveGameData {
        tree_id: Some(tree.graph.id()),
        tree_version: tree.graph.version(),
        saved_at: Some(Utc::now()),
        nodes,
        pools: tree.pools.to_balances(),
    }
}

fn is_version_mismatch(data: &SaveGameData, graph: &SkillTreeGraph) -> bool {
    let other_tree = data.tree_id.is_some_and(|id| id != graph.id());
    let other_version = data.tree_version != 0 && data.tree_version != graph.version();
    other_tree || other_version
}

/// A snapshot checked against a tree, ready to be written into it.
///
/// Built by [`plan`], which does every fallible computation. Committing
/// cannot fail, so callers can run side effects between the two steps.
#[derive(Debug, Clone)]
pub struct RestorePlan {
    report: RestoreReport,
    saved_version: u32,
    levels: BTreeMap<NodeId, (NodeState, u32)>,
    spends: Vec<(NodeId, u32, BTreeMap<PoolId, u32>)>,
    pools: ResourcePools,
}

impl RestorePlan {
    /// What committing this plan will report.
    pub const fn report(&self) -> &RestoreReport {
        &self.report
    }

    /// Write the planned state into `tree`.
    ///
    /// `tree` must be the tree the plan was built from.
    pub fn commit(self, tree: &mut SkillTree) -> RestoreReport {
        let Self {
            mut report,
            saved_version,
            levels,
            spends,
            pools,
        } = self;

        for node in tree.graph.nodes_mut() {
            node.set_level(0);
        }
        tree.ledger.clear();
        tree.pools = pools;

        if report.version_mismatch {
            // Default-active nodes keep their free first level.
            for node in tree.graph.nodes_mut() {
                if node.active_by_default {
                    node.set_level(1);
                    report.defaults_applied.push(node.id);
                }
            }
            tracing::warn!(
                saved_version,
                version = tree.graph.version(),
                refunded = ?report.refunded,
                defaults = report.defaults_applied.len(),
                "Save data is from another tree version, levels refunded"
            );
            return report;
        }

        for (id, (state, level)) in &levels {
            if let Some(node) = tree.graph.node_mut(*id) {
                node.restore(*state, *level);
                report.applied = report.applied.saturating_add(1);
            }
        }
        for (id, level, amounts) in spends {
            tree.ledger
                .record_spend(id, level, &ResolvedCost::from_amounts(amounts));
        }

        tracing::info!(
            applied = report.applied,
            unknown = report.unknown_node_ids.len(),
            clamped = report.clamped.len(),
            "Save data applied"
        );
        report
    }
}

/// Check a snapshot against the tree without touching it.
///
/// The first level of a default-active node was never paid for, so it is
/// neither recorded in the ledger nor refunded.
pub fn plan(data: &SaveGameData, tree: &SkillTree) -> Result<RestorePlan, EngineError> {
    let mut report = RestoreReport {
        version_mismatch: is_version_mismatch(data, &tree.graph),
        ..RestoreReport::default()
    };

    // Last record wins when a node appears twice.
    let mut levels: BTreeMap<NodeId, (NodeState, u32)> = BTreeMap::new();
    for record in &data.nodes {
        let Some(node) = tree.graph.node(record.node_id) else {
            tracing::warn!(node = %record.node_id, "Save record names an unknown node, skipped");
            report.unknown_node_ids.push(record.node_id);
            continue;
        };
        let level = record.level.min(node.max_level());
        if level < record.level {
            tracing::warn!(
                node = %record.node_id,
                saved = record.level,
                max = node.max_level(),
                "Saved level above max level, clamped"
            );
            report.clamped.push(record.node_id);
        }
        levels.insert(record.node_id, (record.state, level));
    }

    // Cost of every paid level, for the ledger or for the refund.
    let mut spends: Vec<(NodeId, u32, BTreeMap<PoolId, u32>)> = Vec::new();
    for (id, (_, level)) in &levels {
        let Some(node) = tree.graph.node(*id) else {
            continue;
        };
        let first_paid = if node.active_by_default { 2 } else { 1 };
        for bought in first_paid..=*level {
            spends.push((*id, bought, node.cost.for_level(bought)?));
        }
    }

    let mut pools = if data.pools.is_empty() {
        tree.pools.clone()
    } else {
        ResourcePools::from_balances(data.pools.clone())
    };
    if report.version_mismatch {
        let mut total = BTreeMap::new();
        for (_, _, amounts) in &spends {
            add_amounts(&mut total, amounts)?;
        }
        refund(&total, &mut pools)?;
        report.refunded = total;
    }

    Ok(RestorePlan {
        report,
        saved_version: data.tree_version,
        levels,
        spends,
        pools,
    })
}

/// Overwrite the tree from a snapshot.
///
/// Every fallible computation runs before the tree is touched, so an error
/// leaves the tree unchanged. An empty pool map in the snapshot keeps the
/// tree's current pools.
pub fn apply(data: &SaveGameData, tree: &mut SkillTree) -> Result<RestoreReport, EngineError> {
    Ok(plan(data, tree)?.commit(tree))
}
