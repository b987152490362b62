//! Local filesystem storage backend.
//!
//! Keys map to paths under a root directory. A key may not climb out of the
//! root, either with `..` segments or through a symlink that points outside.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ObjectStore, StoredObject};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Local filesystem object store.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend, creating the root if needed.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Root directory documents are served from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a path inside the root.
    ///
    /// The checks stat and canonicalize paths, so they run on the blocking
    /// pool.
    async fn resolve(&self, key: &str) -> StorageResult<PathBuf> {
        let root = self.root.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || resolve_key(&root, &key))
            .await
            .map_err(|e| {
                StorageError::Io(std::io::Error::other(format!("spawn_blocking failed: {e}")))
            })?
    }
}

/// Validate `key` and return its path under `root`.
fn resolve_key(root: &Path, key: &str) -> StorageResult<PathBuf> {
    let invalid = |reason: &str| StorageError::InvalidKey(format!("{reason}: {key}"));

    if key.starts_with('/') || key.contains('\\') {
        return Err(invalid("key must be relative"));
    }
    if key.split('/').any(|segment| segment == ".." || segment == ".") {
        return Err(invalid("dot segments not allowed"));
    }

    let path = root.join(key);
    let root_canonical = root.canonicalize().map_err(|e| {
        StorageError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to canonicalize root: {e}"),
        ))
    })?;

    // The nearest existing path (the key itself or an ancestor) must resolve
    // inside the root, so neither reads nor writes follow a symlink out.
    let mut existing = path.as_path();
    loop {
        match std::fs::symlink_metadata(existing) {
            Ok(meta) => {
                let canonical = existing.canonicalize().map_err(|e| {
                    if meta.file_type().is_symlink() {
                        invalid("symlink target missing")
                    } else {
                        StorageError::Io(e)
                    }
                })?;
                if !canonical.starts_with(&root_canonical) {
                    return Err(invalid("resolved path escapes storage root"));
                }
                return Ok(path);
            }
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {}
            Err(e) => return Err(StorageError::Io(e)),
        }

        match existing.parent() {
            Some(parent) => existing = parent,
            None => return Ok(path),
        }
    }
}

/// Map a read failure on `key` to a storage error.
///
/// Directories and paths running through a regular file are not documents,
/// so they read as missing.
fn map_read_error(key: &str, err: std::io::Error) -> StorageError {
    match err.kind() {
        ErrorKind::NotFound | ErrorKind::IsADirectory | ErrorKind::NotADirectory => {
            StorageError::NotFound(key.to_string())
        }
        ErrorKind::PermissionDenied => StorageError::AccessDenied(key.to_string()),
        _ => StorageError::Io(err),
    }
}

#[async_trait]
impl ObjectStore for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get(&self, key: &str) -> StorageResult<StoredObject> {
        let path = self.resolve(key).await?;
        let data = fs::read(&path).await.map_err(|e| map_read_error(key, e))?;
        debug!(size = data.len(), "Read object");
        Ok(StoredObject::new(Bytes::from(data)))
    }

    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        if key.is_empty() || key.ends_with('/') {
            return Err(StorageError::InvalidKey(format!("key names no file: {key}")));
        }
        let path = self.resolve(key).await?;
        let (Some(parent), Some(file_name)) = (path.parent(), path.file_name()) else {
            return Err(StorageError::InvalidKey(format!("key names no file: {key}")));
        };
        fs::create_dir_all(parent).await?;

        // Written beside the target and renamed over it, so readers never see
        // a partial object
        let temp_path = parent.join(format!(
            ".{}.tmp.{}",
            file_name.to_string_lossy(),
            Uuid::new_v4()
        ));
        let written = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
            fs::rename(&temp_path, &path).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            StorageError::Config(format!(
                "storage root {} not accessible: {e}",
                self.root.display()
            ))
        })?;
        if !metadata.is_dir() {
            return Err(StorageError::Config(format!(
                "storage root {} is not a directory",
                self.root.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn backend() -> (tempfile::TempDir, FilesystemBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();
        (dir, backend)
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let (_dir, backend) = backend().await;

        backend
            .put("docs/readme.txt", Bytes::from("hello world"))
            .await
            .unwrap();

        let object = backend.get("docs/readme.txt").await.unwrap();
        assert_eq!(object.data, "hello world");
        assert!(object.content_type.is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_content() {
        let (dir, backend) = backend().await;

        backend.put("doc", Bytes::from("first")).await.unwrap();
        backend.put("doc", Bytes::from("second")).await.unwrap();
        assert_eq!(backend.get("doc").await.unwrap().data, "second");

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("doc")]);
    }

    #[tokio::test]
    async fn test_missing_and_directory_keys_are_not_found() {
        let (_dir, backend) = backend().await;
        backend
            .put("subdir/index.html", Bytes::from("index"))
            .await
            .unwrap();

        for key in ["absent", "subdir", "subdir/", "subdir/index.html/nested"] {
            assert!(
                matches!(backend.get(key).await, Err(StorageError::NotFound(_))),
                "{key:?} should read as not found"
            );
        }
    }

    #[tokio::test]
    async fn test_put_without_file_name_is_rejected() {
        let (_dir, backend) = backend().await;
        assert!(matches!(
            backend.put("", Bytes::from("x")).await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path().join("root")).await.unwrap();
        backend.health_check().await.unwrap();
        assert_eq!(backend.backend_name(), "filesystem");

        std::fs::remove_dir(dir.path().join("root")).unwrap();
        assert!(matches!(
            backend.health_check().await,
            Err(StorageError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let (_dir, backend) = backend().await;

        for key in [
            "../escape",
            "/absolute/path",
            "foo/../bar",
            "foo/./bar",
            "foo\\bar",
        ] {
            assert!(
                matches!(backend.get(key).await, Err(StorageError::InvalidKey(_))),
                "{key:?} should be rejected"
            );
        }

        // Dots inside a name are fine
        backend.put("v1..2.txt", Bytes::from("ok")).await.unwrap();
        assert_eq!(backend.get("v1..2.txt").await.unwrap().data, "ok");
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_symlink_out_of_root_rejected() {
        use std::os::unix::fs::symlink;

        let (dir, backend) = backend().await;
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "secret").unwrap();

        symlink(outside.path().join("secret.txt"), dir.path().join("file_link")).unwrap();
        symlink(outside.path(), dir.path().join("dir_link")).unwrap();

        for key in ["file_link", "dir_link/secret.txt"] {
            match backend.get(key).await {
                Err(StorageError::InvalidKey(msg)) => {
                    assert!(msg.contains("escapes storage root"), "{msg}")
                }
                other => panic!("expected InvalidKey for {key:?}, got {other:?}"),
            }
        }

        // Writes through the link must not create anything outside
        assert!(matches!(
            backend
                .put("dir_link/nested/file.txt", Bytes::from("data"))
                .await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(!outside.path().join("nested").exists());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_symlink_inside_root_is_followed() {
        use std::os::unix::fs::symlink;

        let (dir, backend) = backend().await;
        backend.put("real.txt", Bytes::from("real")).await.unwrap();
        symlink(dir.path().join("real.txt"), dir.path().join("alias.txt")).unwrap();

        assert_eq!(backend.get("alias.txt").await.unwrap().data, "real");
    }
}
