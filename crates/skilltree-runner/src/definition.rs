//! YAML skill tree definitions.
//!
//! A definition names nodes by designer key. Keys are turned into stable
//! node ids with [`NodeId::from_key`], so saves written by one run load in
//! the next as long as the keys stay the same.
//!
//! ```yaml
//! id: warrior
//! name: Warrior
//! version: 1
//! pools:
//!   SkillPoint: 3
//! attributes:
//!   Strength: 12
//! nodes:
//!   - key: power_strike
//!     name: Power Strike
//!     conditions:
//!       - type: attribute_requirement
//!         attribute: Strength
//!         op: greater_or_equal
//!         threshold: 10
//!     cost:
//!       - pool: SkillPoint
//!         amount: 2
//!     events:
//!       - type: grant_ability
//!         ability: PowerStrike
//!   - key: cleave
//!     parents: [power_strike]
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use skilltree_engine::{ActivationCondition, NodeEvent, SkillNode, SkillTreeGraph};
use skilltree_ledger::{CostDefinition, CostEntry, ResourcePools};
use skilltree_types::{AttributeId, ComparisonOp, NodeId, PoolId, TreeId};

use crate::error::RunnerError;

/// A complete tree definition with its starting pools and attributes.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeDefinition {
    /// Designer key of the tree.
    pub id: String,
    /// Display name. Defaults to the key.
    #[serde(default)]
    pub name: Option<String>,
    /// Definition version recorded in saves.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Pool balances every new owner starts with.
    #[serde(default)]
    pub pools: BTreeMap<PoolId, u32>,
    /// Attribute values the script starts with.
    #[serde(default)]
    pub attributes: BTreeMap<AttributeId, Decimal>,
    /// Nodes, in display order.
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
}

const fn default_version() -> u32 {
    1
}

/// One node of a definition.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeDefinition {
    /// Designer key, unique within the tree.
    pub key: String,
    /// Display name. Defaults to the key.
    #[serde(default)]
    pub name: Option<String>,
    /// Tooltip text.
    #[serde(default)]
    pub description: String,
    /// Highest level the node can reach.
    #[serde(default = "default_max_level")]
    pub max_level: u32,
    /// Unlocked for free when an owner's tree is created or respecced.
    #[serde(default)]
    pub active_by_default: bool,
    /// Keys of the parent nodes.
    #[serde(default)]
    pub parents: Vec<String>,
    /// Conditions gating every level.
    #[serde(default)]
    pub conditions: Vec<ConditionDefinition>,
    /// Cost per level.
    #[serde(default)]
    pub cost: Vec<CostEntry>,
    /// Events fired on level changes.
    #[serde(default)]
    pub events: Vec<NodeEvent>,
}

const fn default_max_level() -> u32 {
    1
}

/// A condition as written in a definition, with parents named by key.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionDefinition {
    /// See [`ActivationCondition::AttributeRequirement`].
    AttributeRequirement {
        /// Attribute to read.
        attribute: AttributeId,
        /// Comparison operator.
        #[serde(default)]
        op: ComparisonOp,
        /// Threshold.
        threshold: Decimal,
    },
    /// See [`ActivationCondition::ParentLevel`].
    ParentLevel {
        /// Key of a specific parent. Any parent when absent.
        #[serde(default)]
        parent: Option<String>,
        /// Minimum level.
        required_level: u32,
    },
    /// See [`ActivationCondition::ResourceSpent`].
    ResourceSpent {
        /// Pool to total.
        pool: PoolId,
        /// Minimum net amount spent.
        required: u32,
    },
    /// See [`ActivationCondition::All`].
    All {
        /// Child conditions.
        conditions: Vec<Self>,
    },
    /// See [`ActivationCondition::Any`].
    Any {
        /// Child conditions.
        conditions: Vec<Self>,
    },
}

impl ConditionDefinition {
    fn resolve(&self, keys: &BTreeSet<&str>) -> Result<ActivationCondition, RunnerError> {
        Ok(match self {
            Self::AttributeRequirement {
                attribute,
                op,
                threshold,
            } => ActivationCondition::AttributeRequirement {
                attribute: attribute.clone(),
                op: *op,
                threshold: *threshold,
            },
            Self::ParentLevel {
                parent,
                required_level,
            } => ActivationCondition::ParentLevel {
                parent: parent.as_deref().map(|k| node_id(keys, k)).transpose()?,
                required_level: *required_level,
            },
            Self::ResourceSpent { pool, required } => ActivationCondition::ResourceSpent {
                pool: pool.clone(),
                required: *required,
            },
            Self::All { conditions } => ActivationCondition::All {
                conditions: resolve_all(conditions, keys)?,
            },
            Self::Any { conditions } => ActivationCondition::Any {
                conditions: resolve_all(conditions, keys)?,
            },
        })
    }
}

fn resolve_all(
    conditions: &[ConditionDefinition],
    keys: &BTreeSet<&str>,
) -> Result<Vec<ActivationCondition>, RunnerError> {
    conditions.iter().map(|c| c.resolve(keys)).collect()
}

fn node_id(keys: &BTreeSet<&str>, key: &str) -> Result<NodeId, RunnerError> {
    if keys.contains(key) {
        Ok(NodeId::from_key(key))
    } else {
        Err(RunnerError::UnknownNodeKey(key.to_owned()))
    }
}

impl TreeDefinition {
    /// Read a definition from a YAML file.
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

    /// Parse a definition from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Yaml`] if the document does not match the schema.
    pub fn parse(yaml: &str) -> Result<Self, RunnerError> {
        serde_yml::from_str(yaml).map_err(|source| RunnerError::Yaml {
            what: "tree definition",
            source,
        })
    }

    /// The id a node key maps to, if the key is defined.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::UnknownNodeKey`] for undefined keys.
    pub fn node_id(&self, key: &str) -> Result<NodeId, RunnerError> {
        node_id(&self.keys(), key)
    }

    fn keys(&self) -> BTreeSet<&str> {
        self.nodes.iter().map(|n| n.key.as_str()).collect()
    }

    /// Starting pools for new owners.
    pub fn starting_pools(&self) -> ResourcePools {
        ResourcePools::from_balances(self.pools.clone())
    }

    /// Build the template graph.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::DuplicateNodeKey`] or
    /// [`RunnerError::UnknownNodeKey`] for bad keys, and
    /// [`RunnerError::Graph`] if the parent links form a cycle.
    pub fn build_graph(&self) -> Result<SkillTreeGraph, RunnerError> {
        let keys = self.keys();
        if keys.len() != self.nodes.len() {
            let mut seen = BTreeSet::new();
            if let Some(dup) = self.nodes.iter().find(|n| !seen.insert(n.key.as_str())) {
                return Err(RunnerError::DuplicateNodeKey(dup.key.clone()));
            }
        }

        let name = self.name.clone().unwrap_or_else(|| self.id.clone());
        let mut graph =
            SkillTreeGraph::new(TreeId::from_key(&self.id), name).with_version(self.version);

        for def in &self.nodes {
            let name = def.name.clone().unwrap_or_else(|| def.key.clone());
            let mut node = SkillNode::new(NodeId::from_key(&def.key), name)
                .with_description(def.description.clone())
                .with_max_level(def.max_level)
                .with_cost(def.cost.iter().cloned().fold(CostDefinition::new(), CostDefinition::with_entry));
            if def.active_by_default {
                node = node.active_by_default();
            }
            for condition in &def.conditions {
                node = node.with_condition(condition.resolve(&keys)?);
            }
            for event in &def.events {
                node = node.with_event(event.clone());
            }
            graph.add_node(node)?;
        }

        for def in &self.nodes {
            let child = NodeId::from_key(&def.key);
            for parent in &def.parents {
                graph.add_edge(node_id(&keys, parent)?, child)?;
            }
        }

        tracing::debug!(
            tree = %self.id,
            version = self.version,
            nodes = graph.len(),
            "Tree definition built"
        );
        Ok(graph)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use skilltree_engine::GraphError;

    use super::*;

    const WARRIOR: &str = r"
id: warrior
name: Warrior
pools:
  SkillPoint: 3
attributes:
  Strength: 12
nodes:
  - key: power_strike
    name: Power Strike
    conditions:
      - type: attribute_requirement
        attribute: Strength
        op: greater_or_equal
        threshold: 10
    cost:
      - pool: SkillPoint
        amount: 2
    events:
      - type: grant_ability
        ability: PowerStrike
  - key: cleave
    max_level: 3
    parents: [power_strike]
    conditions:
      - type: parent_level
        parent: power_strike
        required_level: 1
";

    #[test]
    fn definition_builds_graph_with_stable_ids() {
        let def = TreeDefinition::parse(WARRIOR).unwrap();
        let graph = def.build_graph().unwrap();

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.version(), 1);
        assert_eq!(graph.id(), TreeId::from_key("warrior"));

        let strike = NodeId::from_key("power_strike");
        let cleave = def.node_id("cleave").unwrap();
        assert_eq!(graph.children(strike).unwrap(), vec![cleave]);
        assert_eq!(graph.node(cleave).map(SkillNode::max_level), Some(3));
        assert_eq!(
            graph.find_by_name("Power Strike").map(|n| n.id),
            Some(strike)
        );
        assert_eq!(def.starting_pools().available(&PoolId::from("SkillPoint")), 3);
        assert_eq!(
            def.attributes.get(&AttributeId::from("Strength")).copied(),
            Some(Decimal::new(12, 0))
        );
    }

    #[test]
    fn unknown_parent_key_is_rejected() {
        let yaml = "id: t\nnodes:\n  - key: a\n    parents: [ghost]\n";
        let result = TreeDefinition::parse(yaml).unwrap().build_graph();
        assert!(matches!(result, Err(RunnerError::UnknownNodeKey(k)) if k == "ghost"));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let yaml = "id: t\nnodes:\n  - key: a\n  - key: a\n";
        let result = TreeDefinition::parse(yaml).unwrap().build_graph();
        assert!(matches!(result, Err(RunnerError::DuplicateNodeKey(k)) if k == "a"));
    }

    #[test]
    fn cyclic_parents_are_rejected() {
        let yaml = "id: t\nnodes:\n  - key: a\n    parents: [b]\n  - key: b\n    parents: [a]\n";
        let result = TreeDefinition::parse(yaml).unwrap().build_graph();
        assert!(matches!(
            result,
            Err(RunnerError::Graph {
                source: GraphError::CycleDetected { .. }
            })
        ));
    }
}
