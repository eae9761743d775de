//! Record store: collection-scoped JSON blobs keyed by string id.
//!
//! DESIGN
//! ======
//! Services talk to storage only through `KvStore`, which offers exactly four
//! operations: exclusive create, read, overwrite-existing update, and delete.
//! Records are opaque `serde_json::Value`s; typed (de)serialization happens in
//! the `get`/`put` helpers so backends never see domain types.
//!
//! CONCURRENCY
//! ===========
//! Backends only guarantee single-record atomicity. Multi-step sequences that
//! must not interleave take a `KeyedLocks` guard for the record they mutate.

pub mod file;
pub mod locks;
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use file::FileStore;
pub use locks::KeyedLocks;
pub use memory::MemoryStore;

// =============================================================================
// TYPES
// =============================================================================

/// The three record collections the API persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Tokens,
    Checks,
}

impl Collection {
    pub const ALL: [Self; 3] = [Self::Users, Self::Tokens, Self::Checks];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Tokens => "tokens",
            Self::Checks => "checks",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{collection}/{id} already exists")]
    AlreadyExists { collection: Collection, id: String },
    #[error("{collection}/{id} not found")]
    NotFound { collection: Collection, id: String },
    #[error("invalid record key: {0:?}")]
    InvalidKey(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// TRAIT
// =============================================================================

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Write a new record. Fails with `AlreadyExists` if `id` is taken.
    async fn create(&self, collection: Collection, id: &str, record: serde_json::Value) -> StoreResult<()>;

    /// Read a record. Fails with `NotFound` if absent.
    async fn read(&self, collection: Collection, id: &str) -> StoreResult<serde_json::Value>;

    /// Overwrite an existing record. Fails with `NotFound` if absent.
    async fn update(&self, collection: Collection, id: &str, record: serde_json::Value) -> StoreResult<()>;

    /// Remove a record. Fails with `NotFound` if absent.
    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()>;
}

// =============================================================================
// TYPED HELPERS
// =============================================================================

/// Read and deserialize a record.
///
/// # Errors
///
/// Propagates backend errors; a record that does not match `T` is `Serde`.
pub async fn get<T: DeserializeOwned>(store: &dyn KvStore, collection: Collection, id: &str) -> StoreResult<T> {
    let value = store.read(collection, id).await?;
    Ok(serde_json::from_value(value)?)
}

/// Like [`get`], but maps `NotFound` to `Ok(None)`.
///
/// # Errors
///
/// Propagates every backend error other than `NotFound`.
pub async fn find<T: DeserializeOwned>(
    store: &dyn KvStore,
    collection: Collection,
    id: &str,
) -> StoreResult<Option<T>> {
    match get(store, collection, id).await {
        Ok(record) => Ok(Some(record)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Serialize and create a record.
///
/// # Errors
///
/// Propagates backend errors, including `AlreadyExists`.
pub async fn insert<T: Serialize>(store: &dyn KvStore, collection: Collection, id: &str, record: &T) -> StoreResult<()> {
    store.create(collection, id, serde_json::to_value(record)?).await
}

/// Serialize and overwrite an existing record.
///
/// # Errors
///
/// Propagates backend errors, including `NotFound`.
pub async fn put<T: Serialize>(store: &dyn KvStore, collection: Collection, id: &str, record: &T) -> StoreResult<()> {
    store.update(collection, id, serde_json::to_value(record)?).await
}

/// Reject ids that cannot safely name a single record.
///
/// Ids double as file names, and user ids are caller-supplied emails, so
/// anything that could address another path is refused.
///
/// # Errors
///
/// Returns `InvalidKey` for empty ids, `.`/`..`, path separators, and control characters.
pub fn validate_key(id: &str) -> StoreResult<()> {
    let bad = id.is_empty()
        || id == "."
        || id == ".."
        || id.chars().any(|c| c == '/' || c == '\\' || c.is_control());
    if bad {
        return Err(StoreError::InvalidKey(id.to_owned()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
