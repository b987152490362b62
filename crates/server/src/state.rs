//! Application state shared across handlers.

use crate::cache::ContentCache;
use sluice_core::FragmentBuilder;
use sluice_core::config::AppConfig;
use sluice_storage::ObjectStore;
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Backing object store.
    pub storage: Arc<dyn ObjectStore>,
    /// In-memory archive loaded from the backing store.
    pub cache: Arc<ContentCache>,
    /// Fragment builder sized from `server.max_fragment_bytes`.
    pub fragments: FragmentBuilder,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: AppConfig, storage: Arc<dyn ObjectStore>) -> Self {
        let cache = Arc::new(ContentCache::new(storage.clone(), &config.content));
        let fragments = FragmentBuilder::new(config.server.max_fragment_bytes);
        Self {
            config: Arc::new(config),
            storage,
            cache,
            fragments,
        }
    }
}
