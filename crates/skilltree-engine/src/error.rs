//! Error types for the skilltree-engine crate.
//!
//! Gameplay outcomes such as failed conditions or missing points are not
//! errors; they are reported through [`ActivationOutcome`]. The types here
//! cover structural faults: a malformed graph, an id that does not exist,
//! or an arithmetic overflow while moving resources.
//!
//! [`ActivationOutcome`]: crate::ActivationOutcome

use skilltree_ledger::LedgerError;
use skilltree_types::NodeId;

/// Errors raised while building or mutating the graph structure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// A node with the same id is already in the graph.
    #[error("duplicate node: {0}")]
    DuplicateNode(NodeId),

    /// No node with the given id exists in the graph.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// The edge already exists.
    #[error("duplicate edge: {parent} -> {child}")]
    DuplicateEdge {
        /// Parent end of the edge.
        parent: NodeId,
        /// Child end of the edge.
        child: NodeId,
    },

    /// The edge does not exist.
    #[error("edge not found: {parent} -> {child}")]
    EdgeNotFound {
        /// Parent end of the edge.
        parent: NodeId,
        /// Child end of the edge.
        child: NodeId,
    },

    /// Adding the edge would close a cycle.
    #[error("cycle detected: {child} already reaches {parent}")]
    CycleDetected {
        /// Proposed parent.
        parent: NodeId,
        /// Proposed child.
        child: NodeId,
    },
}

/// Errors raised by the activation engine and the save/restore layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// A graph lookup or mutation failed.
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// A resource movement failed for a reason other than a gameplay shortfall.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
