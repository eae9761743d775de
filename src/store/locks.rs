//! Per-record write serialization.
//!
//! DESIGN
//! ======
//! One async mutex per record key, created on demand and held only through a
//! `Weak` in the table so idle keys cost nothing once their last guard drops.
//! Dead entries are pruned whenever a new key is inserted.
//!
//! Callers hold at most one guard at a time, so lock ordering never arises.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::Collection;

#[derive(Clone, Default)]
pub struct KeyedLocks {
    inner: Arc<Mutex<HashMap<String, Weak<AsyncMutex<()>>>>>,
}

impl KeyedLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `collection/id`.
    pub async fn lock(&self, collection: Collection, id: &str) -> OwnedMutexGuard<()> {
        let mutex = self.entry(format!("{collection}/{id}"));
        mutex.lock_owned().await
    }

    fn entry(&self, key: String) -> Arc<AsyncMutex<()>> {
        let mut table = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(live) = table.get(&key).and_then(Weak::upgrade) {
            return live;
        }

        table.retain(|_, weak| weak.strong_count() > 0);
        let fresh = Arc::new(AsyncMutex::new(()));
        table.insert(key, Arc::downgrade(&fresh));
        fresh
    }

    /// Number of keys with a live guard or waiter.
    #[cfg(test)]
    pub fn active(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
