//! Backing object stores for Sluice.
//!
//! Documents that are not served from the in-memory archive are read from an
//! object store on every request. This crate provides the [`ObjectStore`]
//! trait and two backends: local filesystem and S3-compatible.

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::filesystem::FilesystemBackend;
pub use backends::s3::{S3Backend, S3Options};
pub use error::{StorageError, StorageResult};
pub use traits::{ObjectStore, StoredObject};

use sluice_core::config::StorageConfig;
use std::sync::Arc;

/// Create an object store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    config.validate().map_err(StorageError::Config)?;

    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
        StorageConfig::S3 {
            bucket,
            endpoint,
            region,
            prefix,
            access_key_id,
            secret_access_key,
            force_path_style,
        } => {
            let backend = S3Backend::connect(S3Options {
                bucket: bucket.clone(),
                endpoint: endpoint.clone(),
                region: region.clone(),
                prefix: prefix.clone(),
                credentials: access_key_id.clone().zip(secret_access_key.clone()),
                force_path_style: *force_path_style,
            })
            .await?;
            Ok(Arc::new(backend))
        }
    }
}
