//! Shared type definitions for the skill tree runtime.
//!
//! This crate is the single source of truth for identifiers, state enums and
//! the records exchanged with collaborators (UI, persistence). Types that the
//! UI reads are exported to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifiers for nodes, trees, owners, pools, attributes
//! - [`enums`] -- Node state and comparison operators
//! - [`structs`] -- Save records and node status views

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{ComparisonOp, NodeState};
pub use ids::{AttributeId, NodeId, OwnerId, PoolId, TreeId};
pub use structs::{NodeStatus, ResourceShortfall, SaveGameData, SavedNodeState};
