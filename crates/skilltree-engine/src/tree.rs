//! A live skill tree: one graph with its pools and spend history.

use skilltree_ledger::{AllocationLedger, ResourcePools};

use crate::graph::SkillTreeGraph;

/// Everything the activation engine mutates for one owner.
#[derive(Debug, Clone)]
pub struct SkillTree {
    /// Nodes, edges and per-node progress.
    pub graph: SkillTreeGraph,
    /// Resource balances available to buy levels.
    pub pools: ResourcePools,
    /// Every spend and refund made on this tree.
    pub ledger: AllocationLedger,
}

impl SkillTree {
    /// Wrap a graph and starting pools. The ledger starts empty.
    pub const fn new(graph: SkillTreeGraph, pools: ResourcePools) -> Self {
        Self {
            graph,
            pools,
            ledger: AllocationLedger::new(),
        }
    }
}
