//! Per-owner skill tree manager.
//!
//! The [`SkillTreeManager`] is the entry point for gameplay and UI callers.
//! It holds one template graph and one [`TreeInstance`] per owner, created
//! from the template on first use and dropped when the owner goes away.
//!
//! Every call that can change a tree takes an [`ActivationContext`] with the
//! owner's live attributes and the gameplay host, and creates the owner's
//! instance if it does not exist yet. Read-only calls return
//! [`CoreError::UnknownOwner`] for owners that have no instance.
//!
//! Calls on one owner must be serialized by the caller. `&mut self` already
//! guarantees this within one manager.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use skilltree_engine::{
    ActivationContext, ActivationEngine, ActivationOutcome, AttributeSource, DeactivationOutcome,
    ForceUnlockOutcome, ForceUnlockSummary, RespecSummary, RestoreReport, SkillTree,
    SkillTreeGraph, capture,
};
use skilltree_ledger::ResourcePools;
use skilltree_types::{NodeId, NodeStatus, OwnerId, PoolId, SaveGameData};

use crate::codec;
use crate::config::{ConfigError, SkillTreeConfig};
use crate::error::CoreError;
use crate::instance::TreeInstance;
use crate::storage::SaveStore;

/// Slot used when none is configured.
pub const DEFAULT_SLOT_NAME: &str = "SkillTreeSaveSlot";

/// Owns every live tree instance, keyed by owner.
#[derive(Debug, Clone)]
pub struct SkillTreeManager {
    template: SkillTreeGraph,
    starting_pools: ResourcePools,
    engine: ActivationEngine,
    slot_name: String,
    instances: BTreeMap<OwnerId, TreeInstance>,
}

impl SkillTreeManager {
    /// Create a manager that stamps new instances from `template` with
    /// `starting_pools`.
    pub fn new(
        template: SkillTreeGraph,
        starting_pools: ResourcePools,
        engine: ActivationEngine,
    ) -> Self {
        Self {
            template,
            starting_pools,
            engine,
            slot_name: DEFAULT_SLOT_NAME.to_owned(),
            instances: BTreeMap::new(),
        }
    }

    /// Create a manager with the engine and save slot from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the activation section is out of
    /// range.
    pub fn from_config(
        template: SkillTreeGraph,
        starting_pools: ResourcePools,
        config: &SkillTreeConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(template, starting_pools, config.engine()?)
            .with_slot_name(config.save.slot_name.clone()))
    }

    /// Use `slot_name` for every save written or read through a store.
    #[must_use]
    pub fn with_slot_name(mut self, slot_name: impl Into<String>) -> Self {
        self.slot_name = slot_name.into();
        self
    }

    /// The graph new instances are cloned from.
    pub const fn template(&self) -> &SkillTreeGraph {
        &self.template
    }

    /// The activation engine shared by every instance.
    pub const fn engine(&self) -> &ActivationEngine {
        &self.engine
    }

    /// The save slot name.
    pub fn slot_name(&self) -> &str {
        &self.slot_name
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether no owner has an instance.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Owners with a live instance.
    pub fn owners(&self) -> impl Iterator<Item = OwnerId> + '_ {
        self.instances.keys().copied()
    }

    /// The owner's instance, if one exists.
    pub fn tree(&self, owner: OwnerId) -> Option<&TreeInstance> {
        self.instances.get(&owner)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Return the owner's instance, creating it from the template if needed.
    ///
    /// A new instance starts with the configured pools and its default-active
    /// nodes unlocked.
    pub fn get_or_create_tree(
        &mut self,
        owner: OwnerId,
        ctx: &mut ActivationContext<'_>,
    ) -> &mut TreeInstance {
        self.instance_mut(owner, ctx).1
    }

    /// Drop the owner's instance. Returns whether one existed.
    ///
    /// No events fire: the owner is gone.
    pub fn destroy_owner(&mut self, owner: OwnerId) -> bool {
        let removed = self.instances.remove(&owner).is_some();
        if removed {
            tracing::info!(%owner, "Skill tree instance destroyed");
        }
        removed
    }

    fn instance_mut(
        &mut self,
        owner: OwnerId,
        ctx: &mut ActivationContext<'_>,
    ) -> (&ActivationEngine, &mut TreeInstance) {
        let Self {
            template,
            starting_pools,
            engine,
            instances,
            ..
        } = self;
        let instance = match instances.entry(owner) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let mut tree = SkillTree::new(template.clone(), starting_pools.clone());
                let summary = engine.initialize(&mut tree, ctx);
                tracing::info!(
                    %owner,
                    tree = %template.id(),
                    nodes = tree.graph.len(),
                    defaults = summary.defaults_applied.len(),
                    failed_events = summary.failed_events,
                    "Skill tree instance created"
                );
                entry.insert(TreeInstance::new(owner, tree))
            }
        };
        (&*engine, instance)
    }

    fn instance(&self, owner: OwnerId) -> Result<&TreeInstance, CoreError> {
        self.instances
            .get(&owner)
            .ok_or(CoreError::UnknownOwner(owner))
    }

    // -----------------------------------------------------------------------
    // Resources and activation
    // -----------------------------------------------------------------------

    /// Add `amount` to one of the owner's pools. Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Ledger`] if the balance would overflow.
    pub fn grant_resource(
        &mut self,
        owner: OwnerId,
        pool: &PoolId,
        amount: u32,
        ctx: &mut ActivationContext<'_>,
    ) -> Result<u32, CoreError> {
        let (_, instance) = self.instance_mut(owner, ctx);
        let tree = &mut instance.tree;
        tree.pools.deposit(pool, amount)?;
        let balance = tree.pools.available(pool);
        tracing::debug!(%owner, %pool, amount, balance, "Resource granted");
        Ok(balance)
    }

    /// Buy the next level of a node for the owner.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Engine`] if the node does not exist in the tree.
    pub fn try_activate(
        &mut self,
        owner: OwnerId,
        node: NodeId,
        ctx: &mut ActivationContext<'_>,
    ) -> Result<ActivationOutcome, CoreError> {
        let (engine, instance) = self.instance_mut(owner, ctx);
        Ok(engine.try_activate(&mut instance.tree, node, ctx)?)
    }

    /// Remove the top level of a node and refund it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Engine`] if the node does not exist in the tree.
    pub fn deactivate(
        &mut self,
        owner: OwnerId,
        node: NodeId,
        ctx: &mut ActivationContext<'_>,
    ) -> Result<DeactivationOutcome, CoreError> {
        let (engine, instance) = self.instance_mut(owner, ctx);
        Ok(engine.deactivate(&mut instance.tree, node, ctx)?)
    }

    /// Reset every node of the owner's tree and refund what was spent.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Engine`] if a refund overflows a pool.
    pub fn respec(
        &mut self,
        owner: OwnerId,
        ctx: &mut ActivationContext<'_>,
    ) -> Result<RespecSummary, CoreError> {
        let (engine, instance) = self.instance_mut(owner, ctx);
        Ok(engine.respec(&mut instance.tree, ctx)?)
    }

    /// Unlock a node for free, one level or to max.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Engine`] if the node does not exist in the tree.
    pub fn force_unlock(
        &mut self,
        owner: OwnerId,
        node: NodeId,
        to_max: bool,
        ctx: &mut ActivationContext<'_>,
    ) -> Result<ForceUnlockOutcome, CoreError> {
        let (engine, instance) = self.instance_mut(owner, ctx);
        Ok(engine.force_unlock(&mut instance.tree, node, to_max, ctx)?)
    }

    /// Unlock a node and its descendants for free.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Engine`] if the node does not exist in the tree.
    pub fn force_unlock_descendants(
        &mut self,
        owner: OwnerId,
        node: NodeId,
        max_depth: Option<u32>,
        to_max: bool,
        ctx: &mut ActivationContext<'_>,
    ) -> Result<ForceUnlockSummary, CoreError> {
        let (engine, instance) = self.instance_mut(owner, ctx);
        Ok(engine.force_unlock_descendants(&mut instance.tree, node, max_depth, to_max, ctx)?)
    }

    /// Recompute UI affordances after the owner's attributes changed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownOwner`] if the owner has no instance.
    pub fn refresh(
        &mut self,
        owner: OwnerId,
        attributes: &dyn AttributeSource,
    ) -> Result<(), CoreError> {
        let instance = self
            .instances
            .get_mut(&owner)
            .ok_or(CoreError::UnknownOwner(owner))?;
        self.engine.refresh_states(&mut instance.tree, attributes);
        Ok(())
    }

    /// State, level and condition summary of one node.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownOwner`] if the owner has no instance, or
    /// [`CoreError::Engine`] if the node does not exist.
    pub fn node_status(
        &self,
        owner: OwnerId,
        node: NodeId,
        attributes: &dyn AttributeSource,
    ) -> Result<NodeStatus, CoreError> {
        let instance = self.instance(owner)?;
        Ok(self.engine.node_status(&instance.tree, node, attributes)?)
    }

    /// Status of every node, parents before children.
    ///
    /// # Errors
    ///
    /// Same as [`Self::node_status`].
    pub fn statuses(
        &self,
        owner: OwnerId,
        attributes: &dyn AttributeSource,
    ) -> Result<Vec<NodeStatus>, CoreError> {
        let instance = self.instance(owner)?;
        instance
            .tree
            .graph
            .topological_order()
            .into_iter()
            .map(|id| {
                self.engine
                    .node_status(&instance.tree, id, attributes)
                    .map_err(CoreError::from)
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Snapshot the owner's tree.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownOwner`] if the owner has no instance.
    pub fn capture(&self, owner: OwnerId) -> Result<SaveGameData, CoreError> {
        Ok(capture(&self.instance(owner)?.tree))
    }

    /// Encode the owner's tree as a save blob.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownOwner`] if the owner has no instance, or
    /// [`CoreError::Codec`] if encoding fails.
    pub fn save(&self, owner: OwnerId) -> Result<Vec<u8>, CoreError> {
        let data = self.capture(owner)?;
        let blob = codec::encode(&data)?;
        tracing::debug!(%owner, nodes = data.nodes.len(), bytes = blob.len(), "Skill tree saved");
        Ok(blob)
    }

    /// Overwrite the owner's tree from a save blob.
    ///
    /// Unknown node ids are skipped and listed in the report. Events are
    /// resynchronised so the host ends up matching the restored levels.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Codec`] if the blob cannot be decoded. The tree is
    /// untouched in that case.
    pub fn load(
        &mut self,
        owner: OwnerId,
        blob: &[u8],
        ctx: &mut ActivationContext<'_>,
    ) -> Result<RestoreReport, CoreError> {
        let data = codec::decode(blob)?;
        let (engine, instance) = self.instance_mut(owner, ctx);
        let report = engine.restore(&mut instance.tree, &data, ctx)?;
        tracing::info!(
            %owner,
            applied = report.applied,
            unknown = report.unknown_node_ids.len(),
            version_mismatch = report.version_mismatch,
            "Skill tree loaded"
        );
        Ok(report)
    }

    /// Save the owner's tree into `store` under the configured slot.
    ///
    /// # Errors
    ///
    /// Same as [`Self::save`], plus [`CoreError::Storage`] on write failure.
    pub fn save_to_store(&self, owner: OwnerId, store: &mut dyn SaveStore) -> Result<(), CoreError> {
        let blob = self.save(owner)?;
        store.write(&self.slot_name, owner, &blob)?;
        Ok(())
    }

    /// Load the owner's tree from `store`. `None` when nothing was saved, in
    /// which case the tree is left as it is.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`], plus [`CoreError::Storage`] on read failure.
    pub fn load_from_store(
        &mut self,
        owner: OwnerId,
        store: &dyn SaveStore,
        ctx: &mut ActivationContext<'_>,
    ) -> Result<Option<RestoreReport>, CoreError> {
        let Some(blob) = store.read(&self.slot_name, owner)? else {
            tracing::debug!(%owner, slot = %self.slot_name, "No saved skill tree");
            return Ok(None);
        };
        self.load(owner, &blob, ctx).map(Some)
    }
}
