//! Node events: gameplay side effects fired when a node's level changes.
//!
//! Events are best-effort. The activation engine fires them after the cost
//! has been committed and the level written; a failing event is logged and
//! the remaining events still run. Nothing is rolled back.
//!
//! Each event reacts to three phases:
//!
//! - **level up** -- the node gained one or more levels.
//! - **level down** -- the node lost a level (deactivation).
//! - **reset** -- the node dropped to level 0 (respec, reload).

use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use skilltree_types::NodeId;

use crate::node::SkillNode;

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// Errors reported by the gameplay host.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The ability, effect or property is unknown to the host.
    #[error("unknown target: {0}")]
    UnknownTarget(String),

    /// The host refused the operation.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// The gameplay-ability system the events act on.
///
/// Implementations must tolerate repeated calls: granting an ability that is
/// already granted updates its level, applying an effect that is already
/// active replaces it.
pub trait GameplayHost {
    /// Grant `ability` at `level`, or update its level if already granted.
    fn grant_ability(&mut self, ability: &str, level: u32) -> Result<(), HostError>;

    /// Remove a previously granted ability.
    fn revoke_ability(&mut self, ability: &str) -> Result<(), HostError>;

    /// Apply `effect` at `level`, replacing any active instance.
    fn apply_effect(&mut self, effect: &str, level: u32) -> Result<(), HostError>;

    /// Remove an active effect.
    fn remove_effect(&mut self, effect: &str) -> Result<(), HostError>;

    /// Add `delta` to a float property on the owner.
    fn modify_float_property(&mut self, property: &str, delta: Decimal) -> Result<(), HostError>;
}

/// A host that accepts everything and does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl GameplayHost for NullHost {
    fn grant_ability(&mut self, _ability: &str, _level: u32) -> Result<(), HostError> {
        Ok(())
    }

    fn revoke_ability(&mut self, _ability: &str) -> Result<(), HostError> {
        Ok(())
    }

    fn apply_effect(&mut self, _effect: &str, _level: u32) -> Result<(), HostError> {
        Ok(())
    }

    fn remove_effect(&mut self, _effect: &str) -> Result<(), HostError> {
        Ok(())
    }

    fn modify_float_property(&mut self, _property: &str, _delta: Decimal) -> Result<(), HostError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Event context
// ---------------------------------------------------------------------------

/// Which kind of level change is being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPhase {
    /// One or more levels were gained.
    LevelUp,
    /// A level was removed.
    LevelDown,
    /// The node was reset to level 0.
    Reset,
}

/// Level change handed to each event.
#[derive(Debug, Clone, Copy)]
pub struct EventContext<'a> {
    /// Node whose level changed.
    pub node_id: NodeId,
    /// Display name of that node.
    pub node_name: &'a str,
    /// Level before the change.
    pub previous_level: u32,
    /// Level after the change.
    pub new_level: u32,
    /// Kind of change.
    pub phase: EventPhase,
}

/// Errors raised while firing a single event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// The gameplay host refused the call.
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// The property delta overflowed.
    #[error("arithmetic overflow computing delta for {property}")]
    Overflow {
        /// Property being modified.
        property: String,
    },

    /// A custom handler failed.
    #[error("{0}")]
    Custom(String),
}

/// Extension point for code-defined events.
pub trait NodeEventHandler: fmt::Debug + Send + Sync {
    /// The node gained levels.
    fn on_level_up(&self, ctx: &EventContext<'_>, host: &mut dyn GameplayHost) -> Result<(), EventError>;

    /// The node lost a level.
    fn on_level_down(&self, _ctx: &EventContext<'_>, _host: &mut dyn GameplayHost) -> Result<(), EventError> {
        Ok(())
    }

    /// The node was reset to level 0.
    fn on_reset(&self, _ctx: &EventContext<'_>, _host: &mut dyn GameplayHost) -> Result<(), EventError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A gameplay side effect attached to a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeEvent {
    /// Grant an ability at the node's level; revoke it at level 0.
    GrantAbility {
        /// Ability reference understood by the host.
        ability: String,
    },

    /// Apply a gameplay effect at the node's level; remove it at level 0.
    ApplyGameplayEffect {
        /// Effect reference understood by the host.
        effect: String,
    },

    /// Add `delta` to a float property for every level held.
    ModifyFloatProperty {
        /// Property path understood by the host.
        property: String,
        /// Change per level.
        delta: Decimal,
    },

    /// A code-defined event. Not serializable.
    #[serde(skip)]
    Custom(Arc<dyn NodeEventHandler>),
}

impl NodeEvent {
    /// React to a level change.
    pub fn fire(&self, ctx: &EventContext<'_>, host: &mut dyn GameplayHost) -> Result<(), EventError> {
        match self {
            Self::GrantAbility { ability } => {
                if ctx.new_level == 0 {
                    host.revoke_ability(ability)?;
                } else {
                    host.grant_ability(ability, ctx.new_level)?;
                }
            }
            Self::ApplyGameplayEffect { effect } => {
                if ctx.new_level == 0 {
                    host.remove_effect(effect)?;
                } else {
                    host.apply_effect(effect, ctx.new_level)?;
                }
            }
            Self::ModifyFloatProperty { property, delta } => {
                let change = level_delta(*delta, ctx.previous_level, ctx.new_level).ok_or_else(
                    || EventError::Overflow {
                        property: property.clone(),
                    },
                )?;
                if !change.is_zero() {
                    host.modify_float_property(property, change)?;
                }
            }
            Self::Custom(handler) => match ctx.phase {
                EventPhase::LevelUp => handler.on_level_up(ctx, host)?,
                EventPhase::LevelDown => handler.on_level_down(ctx, host)?,
                EventPhase::Reset => handler.on_reset(ctx, host)?,
            },
        }
        Ok(())
    }

    /// Short text for tooltips.
    pub fn describe(&self) -> String {
        match self {
            Self::GrantAbility { ability } => format!("grants {ability}"),
            Self::ApplyGameplayEffect { effect } => format!("applies {effect}"),
            Self::ModifyFloatProperty { property, delta } => {
                let sign = if delta.is_sign_negative() { "" } else { "+" };
                format!("{property} {sign}{delta} per level")
            }
            Self::Custom(handler) => format!("{handler:?}"),
        }
    }
}

/// `delta * (new - old)`, or `None` on overflow.
fn level_delta(delta: Decimal, previous: u32, new: u32) -> Option<Decimal> {
    Decimal::from(new)
        .checked_sub(Decimal::from(previous))
        .and_then(|steps| steps.checked_mul(delta))
}

/// One event that failed while firing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFailure {
    /// Position of the event in the node's event list.
    pub index: usize,
    /// Error message.
    pub message: String,
}

/// Fire every event on `node` for the given level change.
///
/// Level-up events run in declaration order; level-down and reset events run
/// in reverse so that later effects are unwound first. Failures are logged
/// and collected; the remaining events still fire.
pub fn fire_events(node: &SkillNode, ctx: &EventContext<'_>, host: &mut dyn GameplayHost) -> Vec<EventFailure> {
    let mut failures = Vec::new();
    let mut fire_one = |index: usize, event: &NodeEvent| {
        if let Err(err) = event.fire(ctx, host) {
            tracing::warn!(
                node = %ctx.node_id,
                name = ctx.node_name,
                index,
                phase = ?ctx.phase,
                error = %err,
                "Node event failed"
            );
            failures.push(EventFailure {
                index,
                message: err.to_string(),
            });
        }
    };

    match ctx.phase {
        EventPhase::LevelUp => node
            .events
            .iter()
            .enumerate()
            .for_each(|(i, e)| fire_one(i, e)),
        EventPhase::LevelDown | EventPhase::Reset => node
            .events
            .iter()
            .enumerate()
            .rev()
            .for_each(|(i, e)| fire_one(i, e)),
    }
    failures
}
