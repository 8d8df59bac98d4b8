use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Per-slot mutual exclusion.
///
/// Each slot id maps to its own async mutex, so operations on one slot queue
/// behind each other while different slots proceed in parallel. Entries are
/// created on first use and dropped again once the last holder or waiter is
/// gone.
#[derive(Debug, Default)]
pub struct SlotLocks {
    slots: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of a check-and-write on one slot.
#[derive(Debug)]
pub struct SlotGuard<'a> {
    locks: &'a SlotLocks,
    slot_id: Uuid,
    _guard: OwnedMutexGuard<()>,
}

impl SlotLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, slot_id: Uuid) -> SlotGuard<'_> {
        let lock = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(slot_id).or_default())
        };

        let guard = lock.lock_owned().await;

        SlotGuard {
            locks: self,
            slot_id,
            _guard: guard,
        }
    }

    /// Acquires several slots in ascending id order. Any two callers of this
    /// method therefore take overlapping locks in the same order.
    pub async fn acquire_many(&self, slot_ids: impl IntoIterator<Item = Uuid>) -> Vec<SlotGuard<'_>> {
        let mut slot_ids: Vec<Uuid> = slot_ids.into_iter().collect();
        slot_ids.sort_unstable();
        slot_ids.dedup();

        let mut guards = Vec::with_capacity(slot_ids.len());
        for slot_id in slot_ids {
            guards.push(self.acquire(slot_id).await);
        }
        guards
    }

    /// Number of slots currently tracked.
    pub fn tracked(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let mut slots = self.locks.slots.lock().unwrap_or_else(PoisonError::into_inner);

        // One reference in the map plus the one inside our own guard.
        let idle = slots
            .get(&self.slot_id)
            .is_some_and(|lock| Arc::strong_count(lock) <= 2);
        if idle {
            slots.remove(&self.slot_id);
        }
    }
}
