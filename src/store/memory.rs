//! In-memory store with the same semantics as `FileStore`.
//!
//! Used by tests and by `STORAGE_BACKEND=memory` for throwaway local runs.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Collection, KvStore, StoreError, StoreResult, validate_key};

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<(Collection, String), serde_json::Value>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held in `collection`.
    #[cfg(test)]
    pub async fn count(&self, collection: Collection) -> usize {
        self.records
            .read()
            .await
            .keys()
            .filter(|(c, _)| *c == collection)
            .count()
    }
}

fn not_found(collection: Collection, id: &str) -> StoreError {
    StoreError::NotFound { collection, id: id.to_owned() }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn create(&self, collection: Collection, id: &str, record: serde_json::Value) -> StoreResult<()> {
        validate_key(id)?;
        let mut records = self.records.write().await;
        match records.entry((collection, id.to_owned())) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists { collection, id: id.to_owned() }),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn read(&self, collection: Collection, id: &str) -> StoreResult<serde_json::Value> {
        validate_key(id)?;
        self.records
            .read()
            .await
            .get(&(collection, id.to_owned()))
            .cloned()
            .ok_or_else(|| not_found(collection, id))
    }

    async fn update(&self, collection: Collection, id: &str, record: serde_json::Value) -> StoreResult<()> {
        validate_key(id)?;
        let mut records = self.records.write().await;
        let slot = records
            .get_mut(&(collection, id.to_owned()))
            .ok_or_else(|| not_found(collection, id))?;
        *slot = record;
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
        validate_key(id)?;
        self.records
            .write()
            .await
            .remove(&(collection, id.to_owned()))
            .map(|_| ())
            .ok_or_else(|| not_found(collection, id))
    }
}
