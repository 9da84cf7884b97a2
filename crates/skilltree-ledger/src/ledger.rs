//! The allocation ledger: an append-only log of spends and refunds.
//!
//! Every committed level purchase appends one [`AllocationEntry`] per charged
//! pool, and every refund appends the matching credit. Net figures are the
//! spends minus the refunds, so the ledger always answers "what did this node
//! actually cost" even after partial refunds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use skilltree_types::{NodeId, PoolId};

use crate::ResolvedCost;

/// Direction of an allocation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationKind {
    /// Points moved from a pool into a node.
    Spend,
    /// Points returned from a node to a pool.
    Refund,
}

/// One recorded movement of points between a pool and a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationEntry {
    /// Node the points were allocated to or returned from.
    pub node_id: NodeId,
    /// Pool involved.
    pub pool: PoolId,
    /// Amount moved. Always positive.
    pub amount: u32,
    /// Level the spend bought or the refund gave back.
    pub level: u32,
    /// Spend or refund.
    pub kind: AllocationKind,
}

/// Append-only record of every allocation made on one tree instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationLedger {
    /// All entries, in insertion order.
    entries: Vec<AllocationEntry>,
}

impl AllocationLedger {
    /// Create an empty ledger.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of recorded entries.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[AllocationEntry] {
        &self.entries
    }

    /// Record the spend that bought `level` of `node_id`.
    pub fn record_spend(&mut self, node_id: NodeId, level: u32, cost: &ResolvedCost) {
        self.append(node_id, level, cost.amounts(), AllocationKind::Spend);
    }

    /// Record a refund of `level` of `node_id`.
    pub fn record_refund(&mut self, node_id: NodeId, level: u32, amounts: &BTreeMap<PoolId, u32>) {
        self.append(node_id, level, amounts, AllocationKind::Refund);
    }

    fn append(
        &mut self,
        node_id: NodeId,
        level: u32,
        amounts: &BTreeMap<PoolId, u32>,
        kind: AllocationKind,
    ) {
        for (pool, amount) in amounts {
            if *amount == 0 {
                continue;
            }
            self.entries.push(AllocationEntry {
                node_id,
                pool: pool.clone(),
                amount: *amount,
                level,
                kind,
            });
        }
    }

    /// Net amount spent from `pool` across every node.
    pub fn spent_on_pool(&self, pool: &PoolId) -> u32 {
        net(self.entries.iter().filter(|e| &e.pool == pool))
    }

    /// Net amount per pool currently allocated to `node_id`.
    pub fn spent_on_node(&self, node_id: NodeId) -> BTreeMap<PoolId, u32> {
        net_by_pool(self.entries.iter().filter(|e| e.node_id == node_id))
    }

    /// Net amount per pool paid for one specific level of `node_id`.
    pub fn spent_for_level(&self, node_id: NodeId, level: u32) -> BTreeMap<PoolId, u32> {
        net_by_pool(
            self.entries
                .iter()
                .filter(|e| e.node_id == node_id && e.level == level),
        )
    }

    /// Drop every entry for `node_id`, spends and refunds alike.
    ///
    /// The node stops counting toward any pool's spent total. Use
    /// [`Self::clear`] to drop the whole history.
    pub fn clear_node(&mut self, node_id: NodeId) {
        self.entries.retain(|e| e.node_id != node_id);
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn signed(entry: &AllocationEntry) -> i64 {
    match entry.kind {
        AllocationKind::Spend => i64::from(entry.amount),
        AllocationKind::Refund => i64::from(entry.amount).saturating_neg(),
    }
}

fn clamp_to_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn net<'a>(entries: impl Iterator<Item = &'a AllocationEntry>) -> u32 {
    clamp_to_u32(entries.fold(0_i64, |acc, e| acc.saturating_add(signed(e))))
}

fn net_by_pool<'a>(entries: impl Iterator<Item = &'a AllocationEntry>) -> BTreeMap<PoolId, u32> {
    let mut totals: BTreeMap<PoolId, i64> = BTreeMap::new();
    for entry in entries {
        let slot = totals.entry(entry.pool.clone()).or_insert(0);
        *slot = slot.saturating_add(signed(entry));
    }
    totals
        .into_iter()
        .filter_map(|(pool, total)| {
            let amount = clamp_to_u32(total);
            (amount > 0).then_some((pool, amount))
        })
        .collect()
}
