//! End-to-end scenarios for the activation engine and save/restore layer.
//!
//! Each test builds a small tree by hand and drives it through the public
//! API only.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::too_many_lines
)]

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use skilltree_engine::{
    ActivationCondition, ActivationContext, ActivationEngine, ActivationOutcome,
    DeactivationOutcome, EngineError, GameplayHost, GraphError, HostError, NodeEvent, NullHost,
    SkillNode, SkillTree, SkillTreeGraph, apply, capture,
};
use skilltree_ledger::{CostDefinition, CostEntry, LedgerError, RefundPolicy, ResourcePools};
use skilltree_types::{
    AttributeId, ComparisonOp, NodeId, NodeState, PoolId, SaveGameData, SavedNodeState, TreeId,
};

// =============================================================================
// Helpers
// =============================================================================

fn sp() -> PoolId {
    PoolId::from("SkillPoint")
}

fn attributes(strength: i64) -> BTreeMap<AttributeId, Decimal> {
    let mut map = BTreeMap::new();
    map.insert(AttributeId::from("Strength"), Decimal::new(strength, 0));
    map
}

fn costs(points: u32) -> CostDefinition {
    CostDefinition::new().with_entry(CostEntry::flat("SkillPoint", points))
}

/// Node A: requires Strength >= 10, costs 2 `SkillPoint`.
fn strength_node() -> SkillNode {
    SkillNode::new(NodeId::from_key("A"), "Power Strike")
        .with_condition(ActivationCondition::attribute(
            "Strength",
            ComparisonOp::GreaterOrEqual,
            Decimal::new(10, 0),
        ))
        .with_cost(costs(2))
}

fn single_node_tree(points: u32) -> (SkillTree, NodeId) {
    let mut graph = SkillTreeGraph::new(TreeId::from_key("warrior"), "Warrior");
    let id = graph.add_node(strength_node()).unwrap();
    (SkillTree::new(graph, ResourcePools::new().with_pool("SkillPoint", points)), id)
}

/// root (max 2, 1 pt) -> mid (1 pt, parent level 2) -> leaf (1 pt)
fn chain_tree(points: u32) -> (SkillTree, NodeId, NodeId, NodeId) {
    let mut graph = SkillTreeGraph::new(TreeId::from_key("chain"), "Chain");
    let root = graph
        .add_node(SkillNode::new(NodeId::from_key("root"), "Root").with_max_level(2).with_cost(costs(1)))
        .unwrap();
    let mid = graph
        .add_node(
            SkillNode::new(NodeId::from_key("mid"), "Mid")
                .with_condition(ActivationCondition::ParentLevel { parent: Some(root), required_level: 2 })
                .with_cost(costs(1)),
        )
        .unwrap();
    let leaf = graph
        .add_node(SkillNode::new(NodeId::from_key("leaf"), "Leaf").with_cost(costs(1)))
        .unwrap();
    graph.add_edge(root, mid).unwrap();
    graph.add_edge(mid, leaf).unwrap();
    (SkillTree::new(graph, ResourcePools::new().with_pool("SkillPoint", points)), root, mid, leaf)
}

/// Gameplay host that records granted abilities and property totals.
#[derive(Debug, Default)]
struct RecordingHost {
    abilities: BTreeMap<String, u32>,
    properties: BTreeMap<String, Decimal>,
    fail_effects: bool,
}

impl GameplayHost for RecordingHost {
    fn grant_ability(&mut self, ability: &str, level: u32) -> Result<(), HostError> {
        self.abilities.insert(ability.to_owned(), level);
        Ok(())
    }

    fn revoke_ability(&mut self, ability: &str) -> Result<(), HostError> {
        self.abilities.remove(ability);
        Ok(())
    }

    fn apply_effect(&mut self, effect: &str, _level: u32) -> Result<(), HostError> {
        if self.fail_effects {
            Err(HostError::UnknownTarget(effect.to_owned()))
        } else {
            Ok(())
        }
    }

    fn remove_effect(&mut self, _effect: &str) -> Result<(), HostError> {
        Ok(())
    }

    fn modify_float_property(&mut self, property: &str, delta: Decimal) -> Result<(), HostError> {
        let total = self.properties.entry(property.to_owned()).or_insert(Decimal::ZERO);
        *total += delta;
        Ok(())
    }
}

fn level(tree: &SkillTree, id: NodeId) -> u32 {
    tree.graph.node(id).unwrap().level()
}

fn state(tree: &SkillTree, id: NodeId) -> NodeState {
    tree.graph.node(id).unwrap().state()
}

// =============================================================================
// Required properties
// =============================================================================

#[test]
fn insufficient_skill_points_names_pool_and_shortfall() {
    let (mut tree, a) = single_node_tree(1);
    let attrs = attributes(12);
    let mut host = NullHost;
    let mut ctx = ActivationContext { attributes: &attrs, host: &mut host };

    let outcome = ActivationEngine::default().try_activate(&mut tree, a, &mut ctx).unwrap();

    let ActivationOutcome::InsufficientResource { shortfalls } = outcome else {
        panic!("expected InsufficientResource, got {outcome:?}");
    };
    assert_eq!(shortfalls.len(), 1);
    assert_eq!(shortfalls[0].pool, sp());
    assert_eq!(shortfalls[0].shortfall, 1);
    assert_eq!(tree.pools.available(&sp()), 1);
    assert_eq!(level(&tree, a), 0);
}

#[test]
fn enough_skill_points_activates_and_deducts() {
    let (mut tree, a) = single_node_tree(2);
    let attrs = attributes(12);
    let mut host = NullHost;
    let mut ctx = ActivationContext { attributes: &attrs, host: &mut host };

    let outcome = ActivationEngine::default().try_activate(&mut tree, a, &mut ctx).unwrap();

    assert_eq!(
        outcome,
        ActivationOutcome::Activated { node: a, level: 1, failed_events: vec![] }
    );
    assert_eq!(tree.pools.available(&sp()), 0);
    assert_eq!(state(&tree, a), NodeState::Unlocked);
    assert_eq!(level(&tree, a), 1);
}

#[test]
fn failed_conditions_never_deduct() {
    let (mut tree, a) = single_node_tree(5);
    let attrs = attributes(3);
    let mut host = NullHost;
    let mut ctx = ActivationContext { attributes: &attrs, host: &mut host };

    let outcome = ActivationEngine::default().try_activate(&mut tree, a, &mut ctx).unwrap();

    let ActivationOutcome::ConditionsFailed { reasons } = outcome else {
        panic!("expected ConditionsFailed, got {outcome:?}");
    };
    assert_eq!(reasons, vec!["Strength must be >= 10 (currently 3)".to_owned()]);
    assert_eq!(tree.pools.available(&sp()), 5);
    assert!(tree.ledger.is_empty());
    assert_eq!(level(&tree, a), 0);
}

#[test]
fn maxed_node_is_idempotent() {
    let (mut tree, a) = single_node_tree(10);
    let attrs = attributes(12);
    let mut host = NullHost;
    let mut ctx = ActivationContext { attributes: &attrs, host: &mut host };
    let engine = ActivationEngine::default();

    assert!(engine.try_activate(&mut tree, a, &mut ctx).unwrap().is_activated());
    let pools_after_first = tree.pools.clone();
    let ledger_after_first = tree.ledger.clone();

    for _ in 0..3 {
        assert_eq!(
            engine.try_activate(&mut tree, a, &mut ctx).unwrap(),
            ActivationOutcome::AlreadyUnlocked
        );
    }
    assert_eq!(tree.pools, pools_after_first);
    assert_eq!(tree.ledger, ledger_after_first);
    assert_eq!(level(&tree, a), 1);
}

#[test]
fn reverse_edge_is_rejected_and_first_edge_kept() {
    let mut graph = SkillTreeGraph::new(TreeId::new(), "Cycle");
    let x = graph.add_node(SkillNode::new(NodeId::from_key("X"), "X")).unwrap();
    let y = graph.add_node(SkillNode::new(NodeId::from_key("Y"), "Y")).unwrap();

    assert!(graph.add_edge(x, y).is_ok());
    assert_eq!(graph.add_edge(y, x), Err(GraphError::CycleDetected { parent: y, child: x }));
    assert_eq!(graph.edges(), vec![(x, y)]);
    assert_eq!(graph.roots(), vec![x]);
}

#[test]
fn capture_then_apply_round_trips_every_node() {
    let (mut tree, root, mid, leaf) = chain_tree(10);
    let attrs = attributes(0);
    let mut host = NullHost;
    let mut ctx = ActivationContext { attributes: &attrs, host: &mut host };
    let engine = ActivationEngine::default();
    engine.try_activate(&mut tree, root, &mut ctx).unwrap();
    engine.try_activate(&mut tree, root, &mut ctx).unwrap();
    engine.try_activate(&mut tree, mid, &mut ctx).unwrap();

    let snapshot: Vec<(NodeId, NodeState, u32)> =
        tree.graph.nodes().map(|n| (n.id, n.state(), n.level())).collect();

    let data = capture(&tree);
    let report = apply(&data, &mut tree).unwrap();
    assert!(report.is_complete());

    let restored: Vec<(NodeId, NodeState, u32)> =
        tree.graph.nodes().map(|n| (n.id, n.state(), n.level())).collect();
    assert_eq!(restored, snapshot);
    assert_eq!(state(&tree, leaf), NodeState::Unlockable);
    assert_eq!(tree.ledger.spent_on_pool(&sp()), 3);
}

#[test]
fn restore_skips_deleted_node_and_applies_the_rest() {
    let (mut tree, root, mid, _) = chain_tree(10);
    let deleted = NodeId::from_key("removed-in-patch");
    let data = SaveGameData {
        nodes: vec![
            SavedNodeState { node_id: root, state: NodeState::Unlocked, level: 2 },
            SavedNodeState { node_id: deleted, state: NodeState::Unlocked, level: 1 },
            SavedNodeState { node_id: mid, state: NodeState::Unlocked, level: 1 },
        ],
        ..SaveGameData::default()
    };

    let report = apply(&data, &mut tree).unwrap();

    assert_eq!(report.unknown_node_ids, vec![deleted]);
    assert_eq!(report.applied, 2);
    assert_eq!(level(&tree, root), 2);
    assert_eq!(level(&tree, mid), 1);
}

// =============================================================================
// Structural prerequisite and parent conditions
// =============================================================================

#[test]
fn child_of_locked_parent_is_not_unlockable() {
    let (mut tree, _, _, leaf) = chain_tree(10);
    let attrs = attributes(0);
    let mut host = NullHost;
    let mut ctx = ActivationContext { attributes: &attrs, host: &mut host };

    let outcome = ActivationEngine::default().try_activate(&mut tree, leaf, &mut ctx).unwrap();
    assert_eq!(outcome, ActivationOutcome::NotUnlockable);
    assert_eq!(tree.pools.available(&sp()), 10);
}

#[test]
fn structural_prerequisite_can_be_disabled() {
    let (mut tree, _, _, leaf) = chain_tree(10);
    let attrs = attributes(0);
    let mut host = NullHost;
    let mut ctx = ActivationContext { attributes: &attrs, host: &mut host };

    let engine = ActivationEngine::new(RefundPolicy::full(), false);
    assert!(engine.try_activate(&mut tree, leaf, &mut ctx).unwrap().is_activated());
}

#[test]
fn parent_level_condition_gates_child() {
    let (mut tree, root, mid, _) = chain_tree(10);
    let attrs = attributes(0);
    let mut host = NullHost;
    let mut ctx = ActivationContext { attributes: &attrs, host: &mut host };
    let engine = ActivationEngine::default();

    engine.try_activate(&mut tree, root, &mut ctx).unwrap();
    assert_eq!(state(&tree, mid), NodeState::Locked);
    assert!(matches!(
        engine.try_activate(&mut tree, mid, &mut ctx).unwrap(),
        ActivationOutcome::ConditionsFailed { .. }
    ));

    engine.try_activate(&mut tree, root, &mut ctx).unwrap();
    assert_eq!(state(&tree, mid), NodeState::Unlockable);
    assert!(engine.try_activate(&mut tree, mid, &mut ctx).unwrap().is_activated());
}

#[test]
fn unknown_node_is_an_error() {
    let (mut tree, _) = single_node_tree(1);
    let attrs = attributes(0);
    let mut host = NullHost;
    let mut ctx = ActivationContext { attributes: &attrs, host: &mut host };
    assert!(ActivationEngine::default()
        .try_activate(&mut tree, NodeId::new(), &mut ctx)
        .is_err());
}

// =============================================================================
// Deactivation, respec, force unlock
// =============================================================================

#[test]
fn deactivate_refunds_by_policy() {
    let (mut tree, a) = single_node_tree(2);
    let attrs = attributes(12);
    let mut host = NullHost;
    let mut ctx = ActivationContext { attributes: &attrs, host: &mut host };
    let engine = ActivationEngine::new(RefundPolicy::new(50).unwrap(), true);

    engine.try_activate(&mut tree, a, &mut ctx).unwrap();
    let outcome = engine.deactivate(&mut tree, a, &mut ctx).unwrap();

    let DeactivationOutcome::Deactivated { level: after, refunded, .. } = outcome else {
        panic!("expected Deactivated, got {outcome:?}");
    };
    assert_eq!(after, 0);
    assert_eq!(refunded.get(&sp()).copied(), Some(1));
    assert_eq!(tree.pools.available(&sp()), 1);
    assert_eq!(tree.ledger.spent_on_pool(&sp()), 0);
    assert_eq!(
        engine.deactivate(&mut tree, a, &mut ctx).unwrap(),
        DeactivationOutcome::NotActive
    );
}

#[test]
fn deactivate_refuses_to_strand_children() {
    let (mut tree, root, mid, _) = chain_tree(10);
    let attrs = attributes(0);
    let mut host = NullHost;
    let mut ctx = ActivationContext { attributes: &attrs, host: &mut host };
    let engine = ActivationEngine::default();
    engine.try_activate(&mut tree, root, &mut ctx).unwrap();
    engine.try_activate(&mut tree, root, &mut ctx).unwrap();
    engine.try_activate(&mut tree, mid, &mut ctx).unwrap();

    let outcome = engine.deactivate(&mut tree, root, &mut ctx).unwrap();
    assert_eq!(outcome, DeactivationOutcome::WouldInvalidate { dependents: vec![mid] });
    assert_eq!(level(&tree, root), 2);
    assert_eq!(tree.pools.available(&sp()), 7);

    // Removing the child first frees the parent.
    assert!(matches!(
        engine.deactivate(&mut tree, mid, &mut ctx).unwrap(),
        DeactivationOutcome::Deactivated { .. }
    ));
    assert!(matches!(
        engine.deactivate(&mut tree, root, &mut ctx).unwrap(),
        DeactivationOutcome::Deactivated { level: 1, .. }
    ));
}

#[test]
fn respec_refunds_everything_and_reapplies_defaults() {
    let mut graph = SkillTreeGraph::new(TreeId::from_key("mage"), "Mage");
    let basics = graph
        .add_node(
            SkillNode::new(NodeId::from_key("basics"), "Basics")
                .active_by_default()
                .with_event(NodeEvent::GrantAbility { ability: "Bolt".to_owned() }),
        )
        .unwrap();
    let fire = graph
        .add_node(
            SkillNode::new(NodeId::from_key("fire"), "Fire")
                .with_max_level(3)
                .with_cost(CostDefinition::new().with_entry(CostEntry::scaled("SkillPoint", vec![1, 2, 3])))
                .with_event(NodeEvent::GrantAbility { ability: "Fireball".to_owned() }),
        )
        .unwrap();
    graph.add_edge(basics, fire).unwrap();
    let mut tree = SkillTree::new(graph, ResourcePools::new().with_pool("SkillPoint", 6));

    let attrs = attributes(0);
    let mut host = RecordingHost::default();
    let engine = ActivationEngine::default();
    {
        let mut ctx = ActivationContext { attributes: &attrs, host: &mut host };
        assert_eq!(engine.initialize(&mut tree, &mut ctx).defaults_applied, vec![basics]);
        for _ in 0..3 {
            assert!(engine.try_activate(&mut tree, fire, &mut ctx).unwrap().is_activated());
        }
    }
    assert_eq!(tree.pools.available(&sp()), 0);
    assert_eq!(host.abilities.get("Fireball").copied(), Some(3));

    let summary = {
        let mut ctx = ActivationContext { attributes: &attrs, host: &mut host };
        engine.respec(&mut tree, &mut ctx).unwrap()
    };

    assert_eq!(summary.nodes_reset, 2);
    assert_eq!(summary.refunded.get(&sp()).copied(), Some(6));
    assert_eq!(summary.defaults_applied, vec![basics]);
    assert_eq!(tree.pools.available(&sp()), 6);
    assert_eq!(level(&tree, fire), 0);
    assert_eq!(level(&tree, basics), 1);
    assert!(!host.abilities.contains_key("Fireball"));
    assert_eq!(host.abilities.get("Bolt").copied(), Some(1));
}

#[test]
fn force_unlock_descendants_bypasses_conditions_and_cost() {
    let (mut tree, root, mid, leaf) = chain_tree(0);
    let attrs = attributes(0);
    let mut host = NullHost;
    let mut ctx = ActivationContext { attributes: &attrs, host: &mut host };
    let engine = ActivationEngine::default();

    let summary = engine
        .force_unlock_descendants(&mut tree, root, Some(1), true, &mut ctx)
        .unwrap();
    assert_eq!(summary.changed, vec![root, mid]);
    assert_eq!(summary.failed_events, 0);
    assert_eq!(level(&tree, root), 2);
    assert_eq!(level(&tree, mid), 1);
    assert_eq!(level(&tree, leaf), 0);
    assert_eq!(state(&tree, leaf), NodeState::Unlockable);
    assert!(tree.ledger.is_empty());
}

// =============================================================================
// Events
// =============================================================================

#[test]
fn event_failure_does_not_roll_back_activation() {
    let mut graph = SkillTreeGraph::new(TreeId::new(), "Rogue");
    let sprint = graph
        .add_node(
            SkillNode::new(NodeId::from_key("sprint"), "Sprint")
                .with_max_level(2)
                .with_cost(costs(1))
                .with_event(NodeEvent::ApplyGameplayEffect { effect: "Missing".to_owned() })
                .with_event(NodeEvent::ModifyFloatProperty {
                    property: "MaxWalkSpeed".to_owned(),
                    delta: Decimal::new(50, 0),
                }),
        )
        .unwrap();
    let mut tree = SkillTree::new(graph, ResourcePools::new().with_pool("SkillPoint", 2));

    let attrs = attributes(0);
    let mut host = RecordingHost { fail_effects: true, ..RecordingHost::default() };
    let engine = ActivationEngine::default();
    let outcome = {
        let mut ctx = ActivationContext { attributes: &attrs, host: &mut host };
        engine.try_activate(&mut tree, sprint, &mut ctx).unwrap()
    };

    let ActivationOutcome::Activated { failed_events, .. } = outcome else {
        panic!("expected Activated, got {outcome:?}");
    };
    assert_eq!(failed_events.len(), 1);
    assert_eq!(failed_events[0].index, 0);
    assert_eq!(tree.pools.available(&sp()), 1);
    assert_eq!(host.properties.get("MaxWalkSpeed").copied(), Some(Decimal::new(50, 0)));
}

#[test]
fn engine_restore_resyncs_host() {
    let mut graph = SkillTreeGraph::new(TreeId::from_key("paladin"), "Paladin");
    let aura = graph
        .add_node(
            SkillNode::new(NodeId::from_key("aura"), "Aura")
                .with_max_level(2)
                .with_event(NodeEvent::GrantAbility { ability: "Aura".to_owned() })
                .with_event(NodeEvent::ModifyFloatProperty {
                    property: "Armor".to_owned(),
                    delta: Decimal::new(10, 0),
                }),
        )
        .unwrap();
    let mut tree = SkillTree::new(graph, ResourcePools::new());
    let attrs = attributes(0);
    let mut host = RecordingHost::default();
    let engine = ActivationEngine::default();

    {
        let mut ctx = ActivationContext { attributes: &attrs, host: &mut host };
        engine.try_activate(&mut tree, aura, &mut ctx).unwrap();
    }
    let saved = capture(&tree);
    {
        let mut ctx = ActivationContext { attributes: &attrs, host: &mut host };
        engine.try_activate(&mut tree, aura, &mut ctx).unwrap();
        engine.restore(&mut tree, &saved, &mut ctx).unwrap();
    }

    assert_eq!(level(&tree, aura), 1);
    assert_eq!(host.abilities.get("Aura").copied(), Some(1));
    assert_eq!(host.properties.get("Armor").copied(), Some(Decimal::new(10, 0)));
}

#[test]
fn older_save_keeps_default_nodes_unlocked_and_refunds_paid_levels() {
    let mut graph = SkillTreeGraph::new(TreeId::from_key("monk"), "Monk").with_version(2);
    let stance = graph
        .add_node(
            SkillNode::new(NodeId::from_key("stance"), "Stance")
                .active_by_default()
                .with_cost(costs(3))
                .with_event(NodeEvent::GrantAbility { ability: "Stance".to_owned() }),
        )
        .unwrap();
    let palm = graph
        .add_node(SkillNode::new(NodeId::from_key("palm"), "Palm").with_cost(costs(1)))
        .unwrap();
    graph.add_edge(stance, palm).unwrap();
    let tree_id = graph.id();
    let mut tree = SkillTree::new(graph, ResourcePools::new().with_pool("SkillPoint", 1));

    let attrs = attributes(0);
    let mut host = RecordingHost::default();
    let engine = ActivationEngine::default();
    let mut ctx = ActivationContext { attributes: &attrs, host: &mut host };
    engine.initialize(&mut tree, &mut ctx);

    let mut pools = BTreeMap::new();
    pools.insert(sp(), 0);
    let old_save = SaveGameData {
        tree_id: Some(tree_id),
        tree_version: 1,
        nodes: vec![
            SavedNodeState { node_id: stance, state: NodeState::Unlocked, level: 1 },
            SavedNodeState { node_id: palm, state: NodeState::Unlocked, level: 1 },
        ],
        pools,
        ..SaveGameData::default()
    };
    let report = engine.restore(&mut tree, &old_save, &mut ctx).unwrap();

    assert!(report.version_mismatch);
    assert_eq!(report.refunded.get(&sp()).copied(), Some(1));
    assert_eq!(report.defaults_applied, vec![stance]);
    assert_eq!((state(&tree, stance), level(&tree, stance)), (NodeState::Unlocked, 1));
    assert_eq!(state(&tree, palm), NodeState::Unlockable);
    assert_eq!(tree.pools.available(&sp()), 1);

    let outcome = engine.try_activate(&mut tree, palm, &mut ctx).unwrap();
    assert!(outcome.is_activated());
    assert_eq!(tree.pools.available(&sp()), 0);
    assert_eq!(host.abilities.get("Stance").copied(), Some(1));
}

#[test]
fn rejected_snapshot_leaves_host_untouched() {
    let mut graph = SkillTreeGraph::new(TreeId::from_key("bard"), "Bard");
    let song = graph
        .add_node(
            SkillNode::new(NodeId::from_key("song"), "Song")
                .with_cost(costs(2))
                .with_event(NodeEvent::GrantAbility { ability: "Song".to_owned() }),
        )
        .unwrap();
    let mut tree = SkillTree::new(graph, ResourcePools::new().with_pool("SkillPoint", 2));
    let attrs = attributes(0);
    let mut host = RecordingHost::default();
    let engine = ActivationEngine::default();

    let result = {
        let mut ctx = ActivationContext { attributes: &attrs, host: &mut host };
        assert!(engine.try_activate(&mut tree, song, &mut ctx).unwrap().is_activated());

        // Refunding the old level on top of a full pool overflows.
        let mut overflowing = capture(&tree);
        overflowing.tree_version = 9;
        overflowing.pools.insert(sp(), u32::MAX);
        engine.restore(&mut tree, &overflowing, &mut ctx)
    };

    assert!(matches!(
        result,
        Err(EngineError::Ledger(LedgerError::ArithmeticOverflow { .. }))
    ));
    assert_eq!(level(&tree, song), 1);
    assert_eq!(host.abilities.get("Song").copied(), Some(1));
}

#[test]
fn event_failures_are_counted_outside_activation() {
    let mut graph = SkillTreeGraph::new(TreeId::from_key("cleric"), "Cleric");
    let ward = graph
        .add_node(
            SkillNode::new(NodeId::from_key("ward"), "Ward")
                .with_event(NodeEvent::ApplyGameplayEffect { effect: "Ward".to_owned() }),
        )
        .unwrap();
    let mut tree = SkillTree::new(graph, ResourcePools::new());
    let attrs = attributes(0);
    let engine = ActivationEngine::default();

    let mut host = RecordingHost::default();
    let saved = {
        let mut ctx = ActivationContext { attributes: &attrs, host: &mut host };
        assert!(engine.try_activate(&mut tree, ward, &mut ctx).unwrap().is_activated());
        capture(&tree)
    };

    let mut failing = RecordingHost { fail_effects: true, ..RecordingHost::default() };
    let mut ctx = ActivationContext { attributes: &attrs, host: &mut failing };
    let report = engine.restore(&mut tree, &saved, &mut ctx).unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(report.failed_events, 1);

    engine.respec(&mut tree, &mut ctx).unwrap();
    let outcome = engine.force_unlock(&mut tree, ward, false, &mut ctx).unwrap();
    assert_eq!(outcome.level, 1);
    assert_eq!(outcome.failed_events.len(), 1);
    assert_eq!(outcome.failed_events[0].index, 0);
}

#[test]
fn node_status_reports_reasons_and_next_cost() {
    let (tree, a) = single_node_tree(0);
    let status = ActivationEngine::default()
        .node_status(&tree, a, &attributes(4))
        .unwrap();

    assert_eq!(status.state, NodeState::Locked);
    assert!(!status.conditions_met);
    assert_eq!(status.failure_reasons.len(), 1);
    assert_eq!(status.next_level_cost.get(&sp()).copied(), Some(2));
}
