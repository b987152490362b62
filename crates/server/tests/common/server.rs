//! Server test utilities.

use bytes::Bytes;
use sluice_core::config::{AppConfig, ContentConfig, StorageConfig};
use sluice_server::{AppState, create_router};
use sluice_storage::{FilesystemBackend, ObjectStore};
use std::sync::Arc;
use tempfile::TempDir;

/// Key of the archive object in test storage.
#[allow(dead_code)]
pub const CACHE_OBJECT: &str = "cache.zip";

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a test server with temporary storage and an archive cache at
    /// [`CACHE_OBJECT`].
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    ///
    /// The modifier runs after the storage path is filled in.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let storage_path = temp_dir.path().join("storage");
        std::fs::create_dir_all(&storage_path).expect("Failed to create storage directory");
        let storage: Arc<dyn ObjectStore> = Arc::new(
            FilesystemBackend::new(&storage_path)
                .await
                .expect("Failed to create storage backend"),
        );

        let mut config = AppConfig {
            storage: StorageConfig::Filesystem {
                path: storage_path,
            },
            content: ContentConfig {
                cache_object: Some(CACHE_OBJECT.to_string()),
                ..Default::default()
            },
            ..AppConfig::for_testing()
        };
        modifier(&mut config);
        config.validate().expect("Invalid test configuration");

        sluice_server::metrics::register_metrics();

        let state = AppState::new(config, storage);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Store an object in the backing store.
    pub async fn put_object(&self, key: &str, data: impl Into<Bytes>) {
        self.state
            .storage
            .put(key, data.into())
            .await
            .expect("Failed to store object");
    }

    /// Store the archive cache with the given files.
    pub async fn put_archive(&self, files: &[(&str, &[u8])]) {
        self.put_object(CACHE_OBJECT, super::fixtures::zip_archive(files, &[]))
            .await;
    }
}
