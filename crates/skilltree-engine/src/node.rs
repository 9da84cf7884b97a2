//! Skill node definition and runtime progress.

use skilltree_ledger::CostDefinition;
use skilltree_types::{NodeId, NodeState};

use crate::condition::ActivationCondition;
use crate::event::NodeEvent;

/// A single unlockable step in a skill tree.
///
/// The definition fields are public and may be edited freely. The runtime
/// progress (`state`, `level`) is only changed by the activation engine and
/// the save/restore layer, which keep `0 <= level <= max_level` and
/// `state == Unlocked` exactly when `level > 0`.
#[derive(Debug, Clone)]
pub struct SkillNode {
    /// Stable identifier.
    pub id: NodeId,
    /// Display name.
    pub name: String,
    /// Tooltip text.
    pub description: String,
    /// Highest level the node can reach. Always at least 1.
    max_level: u32,
    /// Unlocked for free when the tree instance is created or respecced.
    pub active_by_default: bool,
    /// Every condition must pass before a level can be bought.
    pub conditions: Vec<ActivationCondition>,
    /// Cost of each level.
    pub cost: CostDefinition,
    /// Side effects fired on level changes, in declaration order.
    pub events: Vec<NodeEvent>,
    state: NodeState,
    level: u32,
}

impl SkillNode {
    /// Create a free, single-level node with no conditions or events.
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            max_level: 1,
            active_by_default: false,
            conditions: Vec::new(),
            cost: CostDefinition::new(),
            events: Vec::new(),
            state: NodeState::Locked,
            level: 0,
        }
    }

    /// Set the tooltip text.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the maximum level. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_max_level(mut self, max_level: u32) -> Self {
        self.max_level = max_level.max(1);
        self
    }

    /// Mark the node as unlocked by default.
    #[must_use]
    pub const fn active_by_default(mut self) -> Self {
        self.active_by_default = true;
        self
    }

    /// Append an activation condition.
    #[must_use]
    pub fn with_condition(mut self, condition: ActivationCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Set the cost definition.
    #[must_use]
    pub fn with_cost(mut self, cost: CostDefinition) -> Self {
        self.cost = cost;
        self
    }

    /// Append a node event.
    #[must_use]
    pub fn with_event(mut self, event: NodeEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Highest level the node can reach.
    pub const fn max_level(&self) -> u32 {
        self.max_level
    }

    /// Current state.
    pub const fn state(&self) -> NodeState {
        self.state
    }

    /// Current level.
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Whether the node has been acquired.
    pub const fn is_unlocked(&self) -> bool {
        self.level > 0
    }

    /// Whether no further level can be bought.
    pub const fn is_max_level(&self) -> bool {
        self.level >= self.max_level
    }

    /// The level the next purchase would reach, if any.
    pub const fn next_level(&self) -> Option<u32> {
        if self.is_max_level() {
            None
        } else {
            self.level.checked_add(1)
        }
    }

    /// Set the level, deriving the state from it.
    ///
    /// `level` must already be within bounds.
    pub(crate) const fn set_level(&mut self, level: u32) {
        self.level = level;
        self.state = if level > 0 {
            NodeState::Unlocked
        } else {
            NodeState::Locked
        };
    }

    /// Update the UI affordance of a node at level 0.
    pub(crate) const fn set_affordance(&mut self, unlockable: bool) {
        if self.level == 0 {
            self.state = if unlockable {
                NodeState::Unlockable
            } else {
                NodeState::Locked
            };
        }
    }

    /// Overwrite state and level from trusted save data.
    ///
    /// The level is clamped to `max_level`; a positive level always yields
    /// `Unlocked` and a zero level never does. Returns whether clamping
    /// occurred.
    pub(crate) fn restore(&mut self, state: NodeState, level: u32) -> bool {
        let clamped = level > self.max_level;
        self.level = level.min(self.max_level);
        self.state = match (self.level, state) {
            (0, NodeState::Unlockable) => NodeState::Unlockable,
            (0, _) => NodeState::Locked,
            _ => NodeState::Unlocked,
        };
        clamped
    }
}
