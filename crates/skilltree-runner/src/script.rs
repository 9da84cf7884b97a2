//! Scripted sessions against one owner's tree.
//!
//! A script is a YAML list of steps replayed in order:
//!
//! ```yaml
//! owner: hero
//! steps:
//!   - action: activate
//!     node: power_strike
//!   - action: set_attribute
//!     attribute: Strength
//!     value: 4
//!   - action: grant
//!     pool: SkillPoint
//!     amount: 2
//!   - action: force_unlock
//!     node: cleave
//!     to_max: true
//!   - action: save
//!   - action: respec
//!   - action: load
//! ```
//!
//! Gameplay rejections (missing points, failed conditions) are recorded in
//! the step log and the script carries on. Structural errors (unknown node
//! key, storage failure) abort the run.

use std::collections::BTreeMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use skilltree_core::{SaveStore, SkillTreeManager};
use skilltree_engine::{ActivationContext, ActivationOutcome, DeactivationOutcome};
use skilltree_types::{AttributeId, NodeStatus, OwnerId, PoolId};

use crate::definition::TreeDefinition;
use crate::error::RunnerError;
use crate::host::RecordingHost;

/// A parsed script.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    /// Name of the owner the steps act on.
    #[serde(default = "default_owner")]
    pub owner: String,
    /// Steps, in order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_owner() -> String {
    "player".to_owned()
}

impl Script {
    /// Read a script from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Io`] or [`RunnerError::Yaml`].
    pub fn from_file(path: &Path) -> Result<Self, RunnerError> {
        let contents = std::fs::read_to_string(path).map_err(|source| RunnerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Parse a script from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Yaml`] if the document does not match the schema.
    pub fn parse(yaml: &str) -> Result<Self, RunnerError> {
        serde_yml::from_str(yaml).map_err(|source| RunnerError::Yaml {
            what: "script",
            source,
        })
    }
}

/// One scripted action.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Buy the next level of a node.
    Activate {
        /// Node key.
        node: String,
    },
    /// Remove the top level of a node.
    Deactivate {
        /// Node key.
        node: String,
    },
    /// Reset the whole tree.
    Respec,
    /// Change a live attribute value.
    SetAttribute {
        /// Attribute to set.
        attribute: AttributeId,
        /// New value.
        value: Decimal,
    },
    /// Add points to a pool.
    Grant {
        /// Pool to credit.
        pool: PoolId,
        /// Amount to add.
        amount: u32,
    },
    /// Unlock without conditions or cost.
    ForceUnlock {
        /// Node key.
        node: String,
        /// Go straight to max level.
        #[serde(default)]
        to_max: bool,
        /// Also unlock descendants.
        #[serde(default)]
        descendants: bool,
        /// Descendant depth limit. Unlimited when absent.
        #[serde(default)]
        depth: Option<u32>,
    },
    /// Write the owner's tree to the save store.
    Save,
    /// Restore the owner's tree from the save store.
    Load,
}

impl Step {
    const fn name(&self) -> &'static str {
        match self {
            Self::Activate { .. } => "activate",
            Self::Deactivate { .. } => "deactivate",
            Self::Respec => "respec",
            Self::SetAttribute { .. } => "set_attribute",
            Self::Grant { .. } => "grant",
            Self::ForceUnlock { .. } => "force_unlock",
            Self::Save => "save",
            Self::Load => "load",
        }
    }
}

/// What one step did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    /// Position in the script, from 0.
    pub index: usize,
    /// Step action name.
    pub action: &'static str,
    /// Human-readable result.
    pub outcome: String,
}

/// Final state printed after a run.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    /// Owner name from the script.
    pub owner: &'a str,
    /// Every step's result.
    pub steps: &'a [StepRecord],
    /// Every node, parents first.
    pub nodes: Vec<NodeStatus>,
    /// Pool balances at the end.
    pub pools: BTreeMap<PoolId, u32>,
    /// Abilities, effects and properties the events produced.
    pub host: &'a RecordingHost,
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Replays steps against one owner.
pub struct ScriptRunner<'d> {
    definition: &'d TreeDefinition,
    manager: SkillTreeManager,
    store: Box<dyn SaveStore>,
    attributes: BTreeMap<AttributeId, Decimal>,
    host: RecordingHost,
    owner: OwnerId,
    owner_name: String,
    log: Vec<StepRecord>,
}

impl<'d> ScriptRunner<'d> {
    /// Create the owner's tree and get ready to replay steps.
    pub fn new(
        definition: &'d TreeDefinition,
        mut manager: SkillTreeManager,
        store: Box<dyn SaveStore>,
        owner_name: &str,
    ) -> Self {
        let owner = OwnerId::from_key(owner_name);
        let attributes = definition.attributes.clone();
        let mut host = RecordingHost::default();
        {
            let mut ctx = ActivationContext {
                attributes: &attributes,
                host: &mut host,
            };
            let _ = manager.get_or_create_tree(owner, &mut ctx);
        }
        Self {
            definition,
            manager,
            store,
            attributes,
            host,
            owner,
            owner_name: owner_name.to_owned(),
            log: Vec::new(),
        }
    }

    /// Run every step in order.
    ///
    /// # Errors
    ///
    /// Stops at the first structural error.
    pub fn run(&mut self, steps: &[Step]) -> Result<(), RunnerError> {
        for step in steps {
            let outcome = self.run_step(step)?;
            let index = self.log.len();
            tracing::info!(index, action = step.name(), %outcome, "Step done");
            self.log.push(StepRecord {
                index,
                action: step.name(),
                outcome,
            });
        }
        Ok(())
    }

    /// Results of the steps run so far.
    pub fn log(&self) -> &[StepRecord] {
        &self.log
    }

    /// Current state of the owner's tree.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Core`] if the tree cannot be read.
    pub fn report(&self) -> Result<RunReport<'_>, RunnerError> {
        let nodes = self.manager.statuses(self.owner, &self.attributes)?;
        let pools = self
            .manager
            .tree(self.owner)
            .map(|i| i.tree.pools.to_balances())
            .unwrap_or_default();
        Ok(RunReport {
            owner: &self.owner_name,
            steps: &self.log,
            nodes,
            pools,
            host: &self.host,
        })
    }

    fn run_step(&mut self, step: &Step) -> Result<String, RunnerError> {
        if let Step::SetAttribute { attribute, value } = step {
            self.attributes.insert(attribute.clone(), *value);
            self.manager.refresh(self.owner, &self.attributes)?;
            return Ok(format!("{attribute} set to {value}"));
        }

        let Self {
            definition,
            manager,
            store,
            attributes,
            host,
            owner,
            ..
        } = self;
        let owner = *owner;
        let mut ctx = ActivationContext {
            attributes: &*attributes,
            host,
        };

        let outcome = match step {
            Step::Activate { node } => {
                let id = definition.node_id(node)?;
                describe_activation(&manager.try_activate(owner, id, &mut ctx)?)
            }
            Step::Deactivate { node } => {
                let id = definition.node_id(node)?;
                describe_deactivation(&manager.deactivate(owner, id, &mut ctx)?)
            }
            Step::Respec => {
                let summary = manager.respec(owner, &mut ctx)?;
                with_failures(
                    format!(
                        "reset {} node(s), refunded {}",
                        summary.nodes_reset,
                        describe_amounts(&summary.refunded)
                    ),
                    summary.failed_events,
                )
            }
            Step::Grant { pool, amount } => {
                let balance = manager.grant_resource(owner, pool, *amount, &mut ctx)?;
                format!("{pool} now {balance}")
            }
            Step::ForceUnlock {
                node,
                to_max,
                descendants,
                depth,
            } => {
                let id = definition.node_id(node)?;
                if *descendants {
                    let summary =
                        manager.force_unlock_descendants(owner, id, *depth, *to_max, &mut ctx)?;
                    with_failures(
                        format!("force unlocked {} node(s)", summary.changed.len()),
                        summary.failed_events,
                    )
                } else {
                    let outcome = manager.force_unlock(owner, id, *to_max, &mut ctx)?;
                    with_failures(
                        format!("force unlocked to level {}", outcome.level),
                        outcome.failed_events.len(),
                    )
                }
            }
            Step::Save => {
                manager.save_to_store(owner, &mut **store)?;
                format!("saved to slot {}", manager.slot_name())
            }
            Step::Load => match manager.load_from_store(owner, &**store, &mut ctx)? {
                Some(report) => with_failures(
                    format!(
                        "restored {} node(s), {} unknown{}",
                        report.applied,
                        report.unknown_node_ids.len(),
                        if report.version_mismatch {
                            ", version mismatch refunded"
                        } else {
                            ""
                        }
                    ),
                    report.failed_events,
                ),
                None => "no save found".to_owned(),
            },
            // Handled above.
            Step::SetAttribute { .. } => String::new(),
        };
        Ok(outcome)
    }
}

fn with_failures(outcome: String, failed_events: usize) -> String {
    if failed_events == 0 {
        outcome
    } else {
        format!("{outcome}, {failed_events} event(s) failed")
    }
}

fn describe_amounts(amounts: &BTreeMap<PoolId, u32>) -> String {
    if amounts.is_empty() {
        return "nothing".to_owned();
    }
    amounts
        .iter()
        .map(|(pool, amount)| format!("{amount} {pool}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_activation(outcome: &ActivationOutcome) -> String {
    match outcome {
        ActivationOutcome::Activated {
            level,
            failed_events,
            ..
        } if failed_events.is_empty() => format!("activated, level {level}"),
        ActivationOutcome::Activated {
            level,
            failed_events,
            ..
        } => format!("activated, level {level}, {} event(s) failed", failed_events.len()),
        ActivationOutcome::ConditionsFailed { reasons } => {
            format!("conditions failed: {}", reasons.join("; "))
        }
        ActivationOutcome::InsufficientResource { shortfalls } => format!(
            "insufficient resources: {}",
            shortfalls
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        ),
        ActivationOutcome::AlreadyUnlocked => "already at max level".to_owned(),
        ActivationOutcome::NotUnlockable => "requires an unlocked parent".to_owned(),
    }
}

fn describe_deactivation(outcome: &DeactivationOutcome) -> String {
    match outcome {
        DeactivationOutcome::Deactivated {
            level, refunded, ..
        } => format!("deactivated, level {level}, refunded {}", describe_amounts(refunded)),
        DeactivationOutcome::NotActive => "not active".to_owned(),
        DeactivationOutcome::WouldInvalidate { dependents } => {
            format!("refused, would invalidate {} node(s)", dependents.len())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use skilltree_core::MemorySaveStore;
    use skilltree_engine::ActivationEngine;
    use skilltree_types::NodeState;

    use super::*;

    const TREE: &str = r"
id: ranger
pools:
  SkillPoint: 3
attributes:
  Dexterity: 5
nodes:
  - key: aim
    name: Aim
    cost:
      - pool: SkillPoint
        amount: 1
    events:
      - type: grant_ability
        ability: Aim
  - key: volley
    name: Volley
    parents: [aim]
    conditions:
      - type: attribute_requirement
        attribute: Dexterity
        threshold: 10
    cost:
      - pool: SkillPoint
        amount: 2
";

    fn runner(definition: &TreeDefinition) -> ScriptRunner<'_> {
        let manager = SkillTreeManager::new(
            definition.build_graph().unwrap(),
            definition.starting_pools(),
            ActivationEngine::default(),
        );
        ScriptRunner::new(definition, manager, Box::new(MemorySaveStore::new()), "hero")
    }

    fn level_of(report: &RunReport<'_>, name: &str) -> u32 {
        report
            .nodes
            .iter()
            .find(|n| n.name == name)
            .map(|n| n.level)
            .unwrap()
    }

    #[test]
    fn rejected_steps_are_logged_and_the_script_continues() {
        let definition = TreeDefinition::parse(TREE).unwrap();
        let mut runner = runner(&definition);
        let script = Script::parse(
            "steps:\n  - action: activate\n    node: aim\n  - action: activate\n    node: volley\n  - action: set_attribute\n    attribute: Dexterity\n    value: 12\n  - action: activate\n    node: volley\n",
        )
        .unwrap();

        runner.run(&script.steps).unwrap();
        let log = runner.log();
        assert_eq!(log.len(), 4);
        assert_eq!(log[0].outcome, "activated, level 1");
        assert!(log[1].outcome.starts_with("conditions failed: Dexterity must be >= 10"));
        assert_eq!(log[3].outcome, "activated, level 1");

        let report = runner.report().unwrap();
        assert_eq!(level_of(&report, "Volley"), 1);
        assert_eq!(report.pools.get(&PoolId::from("SkillPoint")).copied(), Some(0));
        assert_eq!(report.host.abilities.get("Aim").copied(), Some(1));
    }

    #[test]
    fn save_respec_load_restores_levels() {
        let definition = TreeDefinition::parse(TREE).unwrap();
        let mut runner = runner(&definition);
        let script = Script::parse(
            "steps:\n  - action: activate\n    node: aim\n  - action: save\n  - action: respec\n  - action: load\n",
        )
        .unwrap();

        runner.run(&script.steps).unwrap();
        assert_eq!(runner.log()[2].outcome, "reset 1 node(s), refunded 1 SkillPoint");
        let report = runner.report().unwrap();
        assert_eq!(level_of(&report, "Aim"), 1);
        assert_eq!(report.pools.get(&PoolId::from("SkillPoint")).copied(), Some(2));
        assert_eq!(report.host.abilities.get("Aim").copied(), Some(1));
    }

    #[test]
    fn force_unlock_with_descendants_skips_conditions() {
        let definition = TreeDefinition::parse(TREE).unwrap();
        let mut runner = runner(&definition);
        let script =
            Script::parse("steps:\n  - action: force_unlock\n    node: aim\n    descendants: true\n")
                .unwrap();

        runner.run(&script.steps).unwrap();
        assert_eq!(runner.log()[0].outcome, "force unlocked 2 node(s)");
        let report = runner.report().unwrap();
        assert!(report.nodes.iter().all(|n| n.state == NodeState::Unlocked));
        assert_eq!(report.pools.get(&PoolId::from("SkillPoint")).copied(), Some(3));
    }

    #[test]
    fn warrior_demo_runs_to_completion() {
        let definition =
            TreeDefinition::parse(include_str!("../../../demos/warrior.yaml")).unwrap();
        let script = Script::parse(include_str!("../../../demos/warrior-session.yaml")).unwrap();
        let mut runner = runner(&definition);

        runner.run(&script.steps).unwrap();
        let log = runner.log();
        assert_eq!(log.len(), 11);
        assert!(log[3].outcome.starts_with("conditions failed"));
        assert!(log[5].outcome.starts_with("insufficient resources"));
        assert_eq!(log[7].outcome, "activated, level 1");

        let report = runner.report().unwrap();
        assert_eq!(level_of(&report, "Whirlwind"), 1);
        assert_eq!(level_of(&report, "Toughness"), 2);
        assert_eq!(report.host.abilities.get("Whirlwind").copied(), Some(1));
        assert_eq!(
            report.host.properties.get("MaxHealth").copied(),
            Some(Decimal::new(60, 0))
        );
    }

    #[test]
    fn failed_events_are_appended_to_the_outcome() {
        assert_eq!(with_failures("respecced".to_owned(), 0), "respecced");
        assert_eq!(
            with_failures("force unlocked to level 1".to_owned(), 2),
            "force unlocked to level 1, 2 event(s) failed"
        );
    }

    #[test]
    fn unknown_node_key_aborts_the_run() {
        let definition = TreeDefinition::parse(TREE).unwrap();
        let mut runner = runner(&definition);
        let script = Script::parse("steps:\n  - action: activate\n    node: ghost\n").unwrap();
        assert!(matches!(
            runner.run(&script.steps),
            Err(RunnerError::UnknownNodeKey(k)) if k == "ghost"
        ));
    }
}
