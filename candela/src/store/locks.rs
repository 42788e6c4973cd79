use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use candela_core::SeriesKey;

/// One async lock per series key.
///
/// Held across load, merge and persist so each store file has a single writer.
/// Slots nobody holds or waits on are dropped on the next acquisition, so
/// the table stays bounded by the number of series in flight.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    inner: Mutex<HashMap<SeriesKey, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    /// Empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &SeriesKey) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // Only the map references an idle slot
            map.retain(|k, m| k == key || Arc::strong_count(m) > 1);
            Arc::clone(map.entry(key.clone()).or_default())
        };
        slot.lock_owned().await
    }

    /// Number of slots currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True when no slot is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
