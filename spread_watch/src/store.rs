//! Latest order-book snapshot per tracked instrument.
//!
//! The store has exactly three slots, one per leg, fixed at construction.
//! Every `update` replaces one slot (last write wins, no cross-instrument
//! atomicity); readers take `Arc` clones so a lock is held only for pointer
//! copies. A single mutex over the whole store is enough at quote rates.
use std::sync::{Arc, Mutex};

use spread_common::instrument::{InstrumentId, InstrumentTriple, LegSet};
use spread_common::{Result, SpreadError};

use crate::model::snapshot::OrderBookSnapshot;

/// Per-leg slot contents.
pub type Slots = LegSet<Option<Arc<OrderBookSnapshot>>>;

/// Thread-safe mapping from the three tracked ids to their latest snapshot.
pub struct SnapshotStore {
    legs: InstrumentTriple,
    slots: Mutex<Slots>,
}

impl SnapshotStore {
    /// Creates an empty store for `legs`.
    pub fn new(legs: InstrumentTriple) -> Self {
        Self {
            legs,
            slots: Mutex::new(LegSet::new(None, None, None)),
        }
    }

    /// The tracked instruments.
    pub fn legs(&self) -> &InstrumentTriple {
        &self.legs
    }

    /// The tracked ids in leg order.
    pub fn tracked_ids(&self) -> Vec<InstrumentId> {
        self.legs.iter().map(|(_, id)| id.clone()).collect()
    }

    /// Replaces the snapshot stored for `id`.
    ///
    /// Fails with `UnknownInstrument` if `id` is not tracked, and with `Format`
    /// if the snapshot belongs to another instrument.
    pub fn update(&self, id: &InstrumentId, snapshot: OrderBookSnapshot) -> Result<()> {
        let leg = self
            .legs
            .leg_of(id)
            .ok_or_else(|| SpreadError::UnknownInstrument(id.to_string()))?;
        if snapshot.instrument_id != *id {
            return Err(SpreadError::Format(format!(
                "snapshot for {} offered under {}",
                snapshot.instrument_id, id
            )));
        }

        let mut slots = self.slots.lock()?;
        *slots.get_mut(leg) = Some(Arc::new(snapshot));
        Ok(())
    }

    /// Current snapshot for `id`; `None` if never observed or not tracked.
    pub fn get(&self, id: &InstrumentId) -> Result<Option<Arc<OrderBookSnapshot>>> {
        let Some(leg) = self.legs.leg_of(id) else {
            return Ok(None);
        };
        let slots = self.slots.lock()?;
        Ok(slots.get(leg).clone())
    }

    /// All three slots read under one lock.
    pub fn view(&self) -> Result<Slots> {
        Ok(self.slots.lock()?.clone())
    }

    /// `true` iff every id in `ids` has a snapshot.
    pub fn all_present(&self, ids: &[InstrumentId]) -> Result<bool> {
        let slots = self.slots.lock()?;
        Ok(ids.iter().all(|id| {
            self.legs
                .leg_of(id)
                .is_some_and(|leg| slots.get(leg).is_some())
        }))
    }
}
