//! Integration tests for the storage manager over real local buckets
//!
//! Two local buckets backed by temp directories stand in for remote backends.

#![cfg(feature = "storage-local")]

use std::path::Path;
use std::sync::Arc;
use stowage_core::constants::SETTING_REDUNDANCY_COPIES;
use stowage_core::models::Bucket;
use stowage_db::test_helpers::{bucket, InMemoryRepository};
use stowage_storage::{
    ProviderRegistry, RetrieveOpts, StorageError, StorageManager, StoreOpts,
};
use tempfile::{tempdir, TempDir};

fn local_bucket(name: &str, priority: i32, root: &Path) -> Bucket {
    let mut b = bucket(name, "local", priority);
    b.local_root = Some(root.display().to_string());
    b
}

struct Fixture {
    repo: InMemoryRepository,
    manager: StorageManager,
    primary: Bucket,
    secondary: Bucket,
    primary_root: TempDir,
    _secondary_root: TempDir,
    scratch: TempDir,
}

fn fixture(copies: &str) -> Fixture {
    let primary_root = tempdir().unwrap();
    let secondary_root = tempdir().unwrap();
    let repo = InMemoryRepository::new();
    let primary = local_bucket("primary", 1, primary_root.path());
    let secondary = local_bucket("secondary", 2, secondary_root.path());
    repo.add_bucket(primary.clone());
    repo.add_bucket(secondary.clone());
    repo.set_setting(SETTING_REDUNDANCY_COPIES, copies);

    let manager = StorageManager::new(
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        ProviderRegistry::with_defaults("priv/uploads"),
    );

    Fixture {
        repo,
        manager,
        primary,
        secondary,
        primary_root,
        _secondary_root: secondary_root,
        scratch: tempdir().unwrap(),
    }
}

#[tokio::test]
async fn test_store_writes_every_copy() {
    let fx = fixture("2");
    let source = fx.scratch.path().join("report.pdf");
    std::fs::write(&source, vec![7u8; 4096]).unwrap();

    let outcome = fx
        .manager
        .store(
            &source,
            &StoreOpts {
                prefix: Some("docs".to_string()),
                content_type: Some("application/pdf".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.path, "docs/report.pdf");
    assert_eq!(outcome.bucket_ids, vec![fx.primary.id, fx.secondary.id]);
    assert!(outcome.is_complete());
    assert!(fx.primary_root.path().join("docs/report.pdf").exists());
    assert!(fx
        .manager
        .exists("docs/report.pdf", &RetrieveOpts::buckets(vec![fx.secondary.id]))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_retrieve_falls_back_to_second_copy() {
    let fx = fixture("2");
    let source = fx.scratch.path().join("a.txt");
    std::fs::write(&source, b"hello").unwrap();
    let outcome = fx
        .manager
        .store(&source, &StoreOpts::default())
        .await
        .unwrap();

    std::fs::remove_file(fx.primary_root.path().join(&outcome.path)).unwrap();

    let dest = fx.scratch.path().join("back.txt");
    let served_by = fx
        .manager
        .retrieve(&outcome.path, &dest, &RetrieveOpts::default())
        .await
        .unwrap();
    assert_eq!(served_by, fx.secondary.id);
    assert_eq!(std::fs::read(dest).unwrap(), b"hello");
}

#[tokio::test]
async fn test_delete_then_retrieve_is_exhausted() {
    let fx = fixture("2");
    let source = fx.scratch.path().join("gone.txt");
    std::fs::write(&source, b"bye").unwrap();
    let outcome = fx
        .manager
        .store(&source, &StoreOpts::default())
        .await
        .unwrap();

    let deleted = fx
        .manager
        .delete(&outcome.path, &RetrieveOpts::default())
        .await
        .unwrap();
    assert_eq!(deleted.succeeded, 2);

    let result = fx
        .manager
        .retrieve(
            &outcome.path,
            &fx.scratch.path().join("x"),
            &RetrieveOpts::default(),
        )
        .await;
    assert!(matches!(result, Err(StorageError::NotFoundInAnyBucket(_))));
}

#[tokio::test]
async fn test_local_buckets_have_no_public_url() {
    let fx = fixture("1");
    let source = fx.scratch.path().join("a.txt");
    std::fs::write(&source, b"x").unwrap();
    let outcome = fx
        .manager
        .store(&source, &StoreOpts::default())
        .await
        .unwrap();

    assert_eq!(
        fx.manager
            .public_url(&outcome.path, &RetrieveOpts::default())
            .await
            .unwrap(),
        None
    );
    assert_eq!(fx.repo.bucket_list_calls(), 2);
}

#[tokio::test]
async fn test_connections_on_local_buckets() {
    let fx = fixture("1");
    let checks = fx.manager.test_connections().await.unwrap();
    assert_eq!(checks.len(), 2);
    assert!(checks.iter().all(|c| c.result.is_ok()));
}

#[tokio::test]
async fn test_double_dots_in_a_file_name_are_stored() {
    let fx = fixture("2");
    let source = fx.scratch.path().join("my..photo.jpg");
    std::fs::write(&source, b"jpeg bytes").unwrap();

    let outcome = fx
        .manager
        .store(&source, &StoreOpts::default())
        .await
        .unwrap();

    assert!(outcome.path.starts_with("my..photo_"));
    assert_eq!(outcome.successful_storages, 2);
    assert!(fx.primary_root.path().join(&outcome.path).is_file());
}

#[tokio::test]
async fn test_traversal_path_is_refused_by_every_bucket() {
    let fx = fixture("2");
    let source = fx.scratch.path().join("b");
    std::fs::write(&source, b"x").unwrap();

    let result = fx
        .manager
        .store(
            &source,
            &StoreOpts {
                path: Some("a/../b".to_string()),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(StorageError::AllBucketsFailed { attempted: 2, .. })
    ));
}
