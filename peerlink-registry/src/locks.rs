//! Per-group mutual exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Lock table keyed by transfer group id.
///
/// Serializes the "count remaining assignees, then delete if orphaned"
/// sequence for one group while leaving different groups independent.
/// Slots are dropped once nobody holds or waits on them.
#[derive(Default)]
pub struct GroupLocks {
    slots: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl GroupLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for `group_id`.
    pub fn with_group<T>(&self, group_id: i64, f: impl FnOnce() -> T) -> T {
        let slot = Arc::clone(self.slots().entry(group_id).or_default());

        let result = {
            // The guarded data is (), so a panic elsewhere leaves nothing to repair.
            let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        let mut slots = self.slots();
        // One reference in the table, one here: no other holder or waiter.
        if Arc::strong_count(&slot) == 2 {
            slots.remove(&group_id);
        }
        result
    }

    /// Number of groups with a live lock slot.
    pub fn active(&self) -> usize {
        self.slots().len()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<i64, Arc<Mutex<()>>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
