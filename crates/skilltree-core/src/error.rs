//! Error types for the manager layer.
//!
//! Expected gameplay outcomes (failed conditions, missing points) are values
//! returned by the engine. The variants here cover structural faults only.

use skilltree_engine::EngineError;
use skilltree_ledger::LedgerError;
use skilltree_types::OwnerId;

use crate::codec::CodecError;
use crate::storage::StorageError;

/// Errors returned by [`crate::SkillTreeManager`].
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// No tree instance exists for the owner.
    #[error("no skill tree for owner {0}")]
    UnknownOwner(OwnerId),

    /// The engine rejected the call (unknown node, overflow).
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Resource pool arithmetic failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A save blob could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The save store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
