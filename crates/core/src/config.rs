//! Configuration types shared across crates.

use crate::{DEFAULT_MAX_FRAGMENT_BYTES, MIN_FRAGMENT_BYTES, PLATFORM_RESPONSE_CEILING};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum encoded bytes per response fragment. Rounded down to a
    /// multiple of four when fragments are built.
    #[serde(default = "default_max_fragment_bytes")]
    pub max_fragment_bytes: usize,
    /// Serve Prometheus metrics at /metrics (default: false).
    /// Off by default since the route shadows a document of the same name.
    #[serde(default)]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_fragment_bytes() -> usize {
    DEFAULT_MAX_FRAGMENT_BYTES
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_fragment_bytes: default_max_fragment_bytes(),
            metrics_enabled: false,
        }
    }
}

impl ServerConfig {
    /// Validate fragment sizing against the platform response ceiling.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_fragment_bytes < MIN_FRAGMENT_BYTES {
            return Err(format!(
                "server.max_fragment_bytes must be at least {MIN_FRAGMENT_BYTES}, got {}",
                self.max_fragment_bytes
            ));
        }
        if self.max_fragment_bytes > PLATFORM_RESPONSE_CEILING {
            return Err(format!(
                "server.max_fragment_bytes must not exceed {PLATFORM_RESPONSE_CEILING}, got {}",
                self.max_fragment_bytes
            ));
        }
        Ok(())
    }
}

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
    /// S3-compatible storage.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Optional endpoint URL (for MinIO, etc.).
        endpoint: Option<String>,
        /// AWS region.
        region: Option<String>,
        /// Optional key prefix.
        prefix: Option<String>,
        /// AWS access key ID. Falls back to the default credential chain if not set.
        access_key_id: Option<String>,
        /// AWS secret access key. Falls back to the default credential chain if not set.
        secret_access_key: Option<String>,
        /// Force path-style URLs (`endpoint/bucket/key`). Required for MinIO.
        #[serde(default)]
        force_path_style: bool,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/documents"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StorageConfig::S3 {
                bucket,
                access_key_id,
                secret_access_key,
                ..
            } => {
                if bucket.trim().is_empty() {
                    return Err("s3 config requires a non-empty bucket".to_string());
                }
                match (access_key_id.as_ref(), secret_access_key.as_ref()) {
                    (Some(_), Some(_)) | (None, None) => Ok(()),
                    _ => Err(
                        "s3 config requires both access_key_id and secret_access_key when either is set"
                            .to_string(),
                    ),
                }
            }
            _ => Ok(()),
        }
    }
}

/// Document lookup configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Object key of the archive served from memory (e.g. "cache.zip").
    /// Without it every request goes to the backing store.
    #[serde(default)]
    pub cache_object: Option<String>,
    /// Retry archive lookups with leading path segments removed.
    #[serde(default = "default_search_subpaths")]
    pub search_subpaths: bool,
    /// Document name tried under a directory-like path (e.g. "index.html").
    #[serde(default)]
    pub default_document: Option<String>,
}

fn default_search_subpaths() -> bool {
    true
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            cache_object: None,
            search_subpaths: default_search_subpaths(),
            default_document: None,
        }
    }
}

impl ContentConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.cache_object {
            let name = name.trim_start_matches('/');
            if name.is_empty() {
                return Err("content.cache_object must not be empty".to_string());
            }
            crate::ArchiveFormat::from_name(name).map_err(|e| format!("content.cache_object: {e}"))?;
        }
        if let Some(document) = &self.default_document
            && (document.is_empty() || document.contains('/'))
        {
            return Err(format!(
                "content.default_document must be a plain file name, got {document:?}"
            ));
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Document lookup configuration.
    #[serde(default)]
    pub content: ContentConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses filesystem storage with no archive.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            content: ContentConfig::default(),
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.server.validate()?;
        self.storage.validate()?;
        self.content.validate()
    }
}
