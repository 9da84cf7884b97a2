//! One owner's live tree.

use chrono::{DateTime, Utc};
use skilltree_engine::SkillTree;
use skilltree_types::OwnerId;

/// A skill tree scoped to a single owner.
#[derive(Debug, Clone)]
pub struct TreeInstance {
    owner: OwnerId,
    created_at: DateTime<Utc>,
    /// Graph, pools and ledger of this owner.
    pub tree: SkillTree,
}

impl TreeInstance {
    /// Wrap a tree for `owner`, stamped with the current time.
    pub fn new(owner: OwnerId, tree: SkillTree) -> Self {
        Self {
            owner,
            created_at: Utc::now(),
            tree,
        }
    }

    /// The owning actor.
    pub const fn owner(&self) -> OwnerId {
        self.owner
    }

    /// When the instance was created.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
