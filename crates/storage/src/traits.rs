//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;

/// An object fetched from the backing store.
#[derive(Clone, Debug)]
pub struct StoredObject {
    /// Object content.
    pub data: Bytes,
    /// Content type recorded by the backend, if any.
    pub content_type: Option<String>,
}

impl StoredObject {
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            content_type: None,
        }
    }
}

/// Object store holding the documents being served.
///
/// Keys are relative, `/`-separated paths. Every call goes to the backend;
/// nothing is cached at this layer.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Fetch an object's content and content type.
    async fn get(&self, key: &str) -> StorageResult<StoredObject>;

    /// Store an object, replacing any previous content atomically.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;

    /// Verify the backend is reachable.
    ///
    /// Called during startup so the server fails fast on a misconfigured
    /// store. The default implementation succeeds.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
