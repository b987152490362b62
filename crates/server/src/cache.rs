//! Process-wide archive cache.
//!
//! The archive named by `content.cache_object` is fetched from the backing
//! store on the first lookup and kept for the life of the process. Concurrent
//! first lookups share a single load; a failed load is retried by the next
//! request.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use sluice_core::Archive;
use sluice_core::Document;
use sluice_core::config::ContentConfig;
use sluice_storage::ObjectStore;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, instrument};

/// Outcome of an archive lookup.
#[derive(Debug)]
pub enum CacheLookup {
    /// The archive holds a document for the path.
    Hit(Document),
    /// The backing store should handle the request.
    Delegate,
}

/// Lazily loaded, immutable archive shared by all handlers.
pub struct ContentCache {
    storage: Arc<dyn ObjectStore>,
    object_name: Option<String>,
    search_subpaths: bool,
    cell: RwLock<Arc<OnceCell<Arc<Archive>>>>,
}

impl ContentCache {
    pub fn new(storage: Arc<dyn ObjectStore>, config: &ContentConfig) -> Self {
        let object_name = config
            .cache_object
            .as_deref()
            .map(|name| name.trim_start_matches('/').to_string())
            .filter(|name| !name.is_empty());

        Self {
            storage,
            object_name,
            search_subpaths: config.search_subpaths,
            cell: RwLock::new(Arc::new(OnceCell::new())),
        }
    }

    /// Store key of the archive, if one is configured.
    pub fn object_name(&self) -> Option<&str> {
        self.object_name.as_deref()
    }

    /// Whether `path` names the archive object itself.
    pub fn is_backing_object(&self, path: &str) -> bool {
        self.object_name
            .as_deref()
            .is_some_and(|name| path.trim_start_matches('/') == name)
    }

    /// Whether the archive has been loaded in this process.
    pub async fn is_loaded(&self) -> bool {
        self.cell.read().await.initialized()
    }

    /// Get the archive, loading it on first use.
    pub async fn archive(&self) -> ApiResult<Option<Arc<Archive>>> {
        let Some(name) = self.object_name.as_deref() else {
            return Ok(None);
        };

        let cell = self.cell.read().await.clone();
        let archive = cell.get_or_try_init(|| self.load(name)).await?;
        Ok(Some(archive.clone()))
    }

    /// Resolve a request path against the archive.
    pub async fn lookup(&self, path: &str) -> ApiResult<CacheLookup> {
        let Some(archive) = self.archive().await? else {
            return Ok(CacheLookup::Delegate);
        };

        match archive.resolve(path) {
            Some(found) => {
                if found.via_fallback {
                    metrics::ARCHIVE_FALLBACK_HITS.inc();
                }
                debug!(
                    path,
                    entry = %found.entry_name,
                    via_fallback = found.via_fallback,
                    "Archive hit"
                );
                Ok(CacheLookup::Hit(found.document))
            }
            None => {
                debug!(path, "Archive miss, delegating to store");
                Ok(CacheLookup::Delegate)
            }
        }
    }

    /// Drop the loaded archive so the next lookup loads it again.
    ///
    /// Intended for test harnesses; production processes load once.
    pub async fn reset(&self) {
        *self.cell.write().await = Arc::new(OnceCell::new());
    }

    #[instrument(skip(self), fields(backend = self.storage.backend_name()))]
    async fn load(&self, name: &str) -> ApiResult<Arc<Archive>> {
        let result = async {
            let object = self.storage.get(name).await.map_err(|e| {
                ApiError::Internal(format!("failed to fetch archive {name}: {e}"))
            })?;
            let archive = Archive::load(name, object.data)
                .map_err(|e| ApiError::Internal(e.to_string()))?
                .with_subpath_search(self.search_subpaths);
            Ok::<_, ApiError>(archive)
        }
        .await;

        metrics::record_archive_load(result.is_ok());
        let archive = result?;
        info!(archive = name, entries = archive.len(), "Archive loaded");
        Ok(Arc::new(archive))
    }
}

impl std::fmt::Debug for ContentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCache")
            .field("object_name", &self.object_name)
            .field("search_subpaths", &self.search_subpaths)
            .finish_non_exhaustive()
    }
}
