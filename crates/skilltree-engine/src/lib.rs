//! Skill tree graph model and resolution engine.
//!
//! This crate owns everything that decides whether a node can be bought and
//! what happens when it is: the acyclic node graph, activation conditions,
//! node events, the activation engine and the save/restore layer. It performs
//! no I/O. Attributes and gameplay side effects are reached through the
//! [`AttributeSource`] and [`GameplayHost`] traits supplied by the caller.
//!
//! # Modules
//!
//! - [`graph`] -- Arena-backed DAG with cycle detection ([`SkillTreeGraph`])
//! - [`node`] -- Node definition and runtime progress ([`SkillNode`])
//! - [`condition`] -- Activation conditions and the evaluator
//! - [`event`] -- Node events and the gameplay host interface
//! - [`attributes`] -- Live attribute lookup
//! - [`tree`] -- Graph + pools + allocation ledger ([`SkillTree`])
//! - [`activation`] -- The [`ActivationEngine`]
//! - [`save`] -- [`capture`] and [`apply`]
//! - [`error`] -- [`GraphError`] and [`EngineError`]

pub mod activation;
pub mod attributes;
pub mod condition;
pub mod error;
pub mod event;
pub mod graph;
pub mod node;
pub mod save;
pub mod tree;

// Re-export primary types at crate root for convenience.
pub use activation::{
    ActivationContext, ActivationEngine, ActivationOutcome, DeactivationOutcome,
    ForceUnlockOutcome, ForceUnlockSummary, InitializeSummary, RespecSummary,
};
pub use attributes::{AttributeSource, NoAttributes};
pub use condition::{ActivationCondition, ConditionCheck, ConditionContext, Evaluation, evaluate_node};
pub use error::{EngineError, GraphError};
pub use event::{
    EventContext, EventError, EventFailure, EventPhase, GameplayHost, HostError, NodeEvent,
    NodeEventHandler, NullHost, fire_events,
};
pub use graph::SkillTreeGraph;
pub use node::SkillNode;
pub use save::{RestorePlan, RestoreReport, apply, capture, plan};
pub use tree::SkillTree;
