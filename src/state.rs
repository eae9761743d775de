//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor and
//! passed by reference into the services. It holds the record store, the
//! parsed config, and the per-record lock table that serializes
//! read-modify-write sequences on the same record.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::{KeyedLocks, KvStore};

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KvStore>,
    pub config: Arc<AppConfig>,
    pub locks: KeyedLocks,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, config: AppConfig) -> Self {
        Self { store, config: Arc::new(config), locks: KeyedLocks::new() }
    }
}

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use crate::store::MemoryStore;

    /// App state over a fresh `MemoryStore` with default config.
    #[must_use]
    pub fn test_app_state() -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), AppConfig::default());
        (state, store)
    }

    /// App state over an arbitrary store, for fault-injection tests.
    #[must_use]
    pub fn test_app_state_with(store: Arc<dyn KvStore>) -> AppState {
        AppState::new(store, AppConfig::default())
    }
}
