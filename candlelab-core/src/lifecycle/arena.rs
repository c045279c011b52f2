//! Position arena: every position ever opened, keyed by id, plus an index
//! of the ids that are still open.
//!
//! Positions are never removed; closing one flips its state and drops it
//! from the open index. Iterating the open index in id order keeps the
//! per-tick update order deterministic.

use std::collections::BTreeSet;

use crate::domain::{Position, PositionId};

#[derive(Debug, Clone, Default)]
pub struct PositionArena {
    slots: Vec<Position>,
    open: BTreeSet<PositionId>,
}

impl PositionArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next inserted position will receive.
    pub fn next_id(&self) -> PositionId {
        PositionId::from(self.slots.len())
    }

    /// Store an open position. Its id is overwritten with the allocated slot.
    pub fn insert(&mut self, mut position: Position) -> PositionId {
        let id = self.next_id();
        position.id = id;
        position.closed = false;
        self.slots.push(position);
        self.open.insert(id);
        id
    }

    pub fn get(&self, id: PositionId) -> Option<&Position> {
        self.slots.get(id.index())
    }

    pub fn get_mut(&mut self, id: PositionId) -> Option<&mut Position> {
        self.slots.get_mut(id.index())
    }

    /// Drop `id` from the open index. Returns false if it was not open.
    pub fn release(&mut self, id: PositionId) -> bool {
        self.open.remove(&id)
    }

    /// Snapshot of open ids in ascending order.
    pub fn open_ids(&self) -> Vec<PositionId> {
        self.open.iter().copied().collect()
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> + '_ {
        self.open.iter().filter_map(|id| self.slots.get(id.index()))
    }

    /// Total positions ever opened.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Sum of unrealised PnL of open positions at `price`.
    pub fn mark_to_market(&self, price: f64) -> f64 {
        self.open_positions().map(|p| p.pnl_at(price)).sum()
    }
}
