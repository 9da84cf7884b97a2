//! Persisted records and read-only views exchanged with collaborators.
//!
//! [`SaveGameData`] is the persisted layout of one tree instance. It is
//! forward compatible: unknown fields are ignored on load and every field
//! has a default, so records written by older or newer builds still decode.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::NodeState;
use crate::ids::{NodeId, PoolId, TreeId};

// ---------------------------------------------------------------------------
// Save data
// ---------------------------------------------------------------------------

/// Saved state of a single node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SavedNodeState {
    /// The node this record belongs to.
    pub node_id: NodeId,
    /// State at the time of the save.
    #[serde(default)]
    pub state: NodeState,
    /// Level at the time of the save.
    #[serde(default)]
    pub level: u32,
}

/// Saved state of one tree instance.
///
/// Built from the live graph on save and consumed to overwrite graph state on
/// load. The live graph stays the source of truth at runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SaveGameData {
    /// Tree the records were captured from, if known.
    #[serde(default)]
    pub tree_id: Option<TreeId>,
    /// Version of the tree definition at save time.
    #[serde(default)]
    pub tree_version: u32,
    /// When the snapshot was taken.
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    /// Per-node records, in graph order.
    #[serde(default)]
    pub nodes: Vec<SavedNodeState>,
    /// Resource pool balances at save time. Empty when the writer did not
    /// capture pools.
    #[serde(default)]
    pub pools: BTreeMap<PoolId, u32>,
}

impl SaveGameData {
    /// Look up the saved record for a node.
    pub fn record(&self, node_id: NodeId) -> Option<&SavedNodeState> {
        self.nodes.iter().find(|r| r.node_id == node_id)
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// A single pool that could not cover a cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResourceShortfall {
    /// The pool that is short.
    pub pool: PoolId,
    /// Amount the cost requires.
    pub required: u32,
    /// Amount currently in the pool.
    pub available: u32,
    /// `required - available`.
    pub shortfall: u32,
}

impl core::fmt::Display for ResourceShortfall {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} short by {} (requires {}, have {})",
            self.pool, self.shortfall, self.required, self.available
        )
    }
}

/// Snapshot of a node for UI and gameplay callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NodeStatus {
    /// The node described.
    pub node_id: NodeId,
    /// Display name of the node.
    pub name: String,
    /// Current state.
    pub state: NodeState,
    /// Current level.
    pub level: u32,
    /// Maximum level.
    pub max_level: u32,
    /// Whether every activation condition currently passes.
    pub conditions_met: bool,
    /// Human-readable reasons for each failing condition.
    pub failure_reasons: Vec<String>,
    /// Cost of the next level per pool; empty at max level or when free.
    pub next_level_cost: BTreeMap<PoolId, u32>,
}
