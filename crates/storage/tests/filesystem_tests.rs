// Filesystem backend behaviour as seen by document delivery:
// concurrent readers and writers, nested keys, and lookup failures.

mod common;

use bytes::Bytes;
use common::seeded_bytes;
use sluice_storage::{FilesystemBackend, ObjectStore, StorageError};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_concurrent_overwrites_leave_a_complete_object() {
    let temp_dir = TempDir::new().unwrap();
    let backend = Arc::new(FilesystemBackend::new(temp_dir.path()).await.unwrap());

    let versions: Vec<Bytes> = (0..8).map(|seed| seeded_bytes(seed, 64 * 1024)).collect();

    let mut handles = Vec::new();
    for data in versions.clone() {
        let backend = backend.clone();
        handles.push(tokio::spawn(async move {
            backend.put("docs/large.bin", data).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Atomic renames mean the final object is exactly one of the writes
    let object = backend.get("docs/large.bin").await.unwrap();
    assert!(
        versions.contains(&object.data),
        "object should match one complete write"
    );

    // No temp files are left next to the object
    let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path().join("docs"))
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp."))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
}

#[tokio::test]
async fn test_concurrent_reads_see_same_bytes() {
    let temp_dir = TempDir::new().unwrap();
    let backend = Arc::new(FilesystemBackend::new(temp_dir.path()).await.unwrap());
    let data = seeded_bytes(42, 100_000);
    backend.put("cached_100k", data.clone()).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let backend = backend.clone();
        handles.push(tokio::spawn(
            async move { backend.get("cached_100k").await.unwrap() },
        ));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().data, data);
    }
}

#[tokio::test]
async fn test_nested_keys_and_default_documents() {
    let temp_dir = TempDir::new().unwrap();
    let backend = FilesystemBackend::new(temp_dir.path()).await.unwrap();

    backend
        .put("index.html", Bytes::from_static(b"root index"))
        .await
        .unwrap();
    backend
        .put("subdir/index.html", Bytes::from_static(b"subdir index"))
        .await
        .unwrap();

    assert_eq!(
        backend.get("subdir/index.html").await.unwrap().data,
        Bytes::from_static(b"subdir index")
    );

    // The directory itself is not a document
    for key in ["", "subdir", "subdir/"] {
        match backend.get(key).await {
            Err(StorageError::NotFound(_)) => {}
            other => panic!("expected not found for {key:?}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_lookup_failures_are_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    let backend = FilesystemBackend::new(temp_dir.path()).await.unwrap();

    for key in ["missing.txt", "../outside", "a/./b"] {
        let err = backend.get(key).await.unwrap_err();
        assert!(err.is_unavailable(), "{key:?} gave {err:?}");
    }
}

#[tokio::test]
async fn test_seeded_documents_are_binary_and_distinct() {
    let temp_dir = TempDir::new().unwrap();
    let backend = FilesystemBackend::new(temp_dir.path()).await.unwrap();

    let first = seeded_bytes(1, 1_000);
    let second = seeded_bytes(2, 1_000);
    assert_ne!(first, second);
    assert_eq!(first, seeded_bytes(1, 1_000));
    assert!(std::str::from_utf8(&first).is_err());

    backend.put("binary.bin", first.clone()).await.unwrap();
    assert_eq!(backend.get("binary.bin").await.unwrap().data, first);
}
