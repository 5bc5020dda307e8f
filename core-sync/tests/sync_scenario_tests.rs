//! Integration tests for inventory reading and metadata synchronization
//!
//! These tests cover:
//! - First sync into an empty store
//! - Re-runs with nothing changed
//! - Re-publishing under a different owner, repository, branch or folder
//! - Malformed filenames in the image folder
//! - Store failures during lookup and bulk write

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::time::Clock;
use chrono::{DateTime, TimeZone, Utc};
use core_library::db::create_test_pool;
use core_library::{
    BulkWriteResult, DocumentStore, ImageRecord, LibraryError, SqliteImageStore, UpsertOperation,
};
use core_runtime::config::SyncSettings;
use core_sync::{InventoryReader, MetadataSynchronizer, SyncError, SyncTarget};
use mockall::mock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Mutex as AsyncMutex;

// ============================================================================
// Test doubles
// ============================================================================

/// Clock that advances one second every time it is read
struct SteppingClock {
    millis: AtomicI64,
}

impl SteppingClock {
    fn new() -> Self {
        Self {
            millis: AtomicI64::new(1_700_000_000_000),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.fetch_add(1_000, Ordering::SeqCst);
        Utc.timestamp_millis_opt(millis).unwrap()
    }
}

/// In-memory store recording every bulk write it receives
#[derive(Default)]
struct InMemoryStore {
    records: AsyncMutex<HashMap<String, ImageRecord>>,
    bulk_calls: AsyncMutex<Vec<Vec<UpsertOperation>>>,
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find_by_code(&self, code: &str) -> core_library::Result<Option<ImageRecord>> {
        Ok(self.records.lock().await.get(code).cloned())
    }

    async fn bulk_upsert(
        &self,
        operations: &[UpsertOperation],
    ) -> core_library::Result<BulkWriteResult> {
        self.bulk_calls.lock().await.push(operations.to_vec());

        let mut records = self.records.lock().await;
        let mut result = BulkWriteResult::default();
        for op in operations {
            match records.get_mut(&op.filter_code) {
                Some(existing) => {
                    existing.url = op.url.clone();
                    existing.folder = op.folder.clone();
                    existing.updated_at = op.updated_at;
                    result.modified += 1;
                }
                None => {
                    records.insert(
                        op.filter_code.clone(),
                        ImageRecord {
                            code: op.code.clone(),
                            number: op.number as i64,
                            url: op.url.clone(),
                            folder: op.folder.clone(),
                            created_at: op.created_at.unwrap_or(op.updated_at),
                            updated_at: op.updated_at,
                        },
                    );
                    result.inserted += 1;
                }
            }
        }
        Ok(result)
    }

    async fn count(&self) -> core_library::Result<i64> {
        Ok(self.records.lock().await.len() as i64)
    }
}

mock! {
    pub Store {}

    #[async_trait]
    impl DocumentStore for Store {
        async fn find_by_code(&self, code: &str) -> core_library::Result<Option<ImageRecord>>;
        async fn bulk_upsert(&self, operations: &[UpsertOperation]) -> core_library::Result<BulkWriteResult>;
        async fn count(&self) -> core_library::Result<i64>;
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn settings(owner: &str, repo: &str, branch: &str) -> SyncSettings {
    SyncSettings::builder()
        .connection_string("sqlite::memory:")
        .repo_owner(owner)
        .repo_name(repo)
        .branch(branch)
        .build()
        .unwrap()
}

fn image_folder(files: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for file in files {
        std::fs::write(dir.path().join(file), b"\xFF\xD8\xFF\xD9").unwrap();
    }
    dir
}

async fn run_sync(
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    folder: &Path,
    target: &SyncTarget,
) -> core_sync::Result<core_sync::SyncReport> {
    let reader = InventoryReader::new(Arc::new(TokioFileSystem::new()));
    let inventory = reader.read(folder).await?;
    MetadataSynchronizer::new(store, clock)
        .sync(&inventory, target)
        .await
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_first_sync_then_rerun_is_idempotent() {
    let dir = image_folder(&["s100.jpg", "s102.jpg"]);
    let store = Arc::new(InMemoryStore::default());
    let clock: Arc<dyn Clock> = Arc::new(SteppingClock::new());
    let target = SyncTarget::from_settings(&settings("owner", "repo", "main"), "images").unwrap();

    let first = run_sync(store.clone(), clock.clone(), dir.path(), &target)
        .await
        .unwrap();
    assert_eq!(first.operations, 2);
    assert_eq!((first.inserted, first.modified), (2, 0));
    assert_eq!(
        first.summary(),
        "Processed 2 images: 2 inserted, 0 modified, 0 unchanged, 0 skipped"
    );

    let record = store.find_by_code("s102").await.unwrap().unwrap();
    assert_eq!(
        record.url,
        "https://raw.githubusercontent.com/owner/repo/main/images/s102.jpg"
    );
    assert_eq!(record.folder, "images");
    assert_eq!(record.number, 102);

    let second = run_sync(store.clone(), clock, dir.path(), &target)
        .await
        .unwrap();
    assert_eq!(second.operations, 0);
    assert_eq!((second.inserted, second.modified), (0, 0));
    assert_eq!(second.unchanged, 2);

    // The unchanged run never reached the store's write path
    assert_eq!(store.bulk_calls.lock().await.len(), 1);
}

#[tokio::test]
async fn test_repo_rename_rewrites_every_record() {
    let dir = image_folder(&["s100.jpg", "s102.jpg"]);
    let store = Arc::new(InMemoryStore::default());
    let clock: Arc<dyn Clock> = Arc::new(SteppingClock::new());

    let before = SyncTarget::from_settings(&settings("owner", "repo", "main"), "images").unwrap();
    run_sync(store.clone(), clock.clone(), dir.path(), &before)
        .await
        .unwrap();
    let created = store.find_by_code("s100").await.unwrap().unwrap();

    let after = SyncTarget::from_settings(&settings("owner", "renamed", "main"), "images").unwrap();
    let report = run_sync(store.clone(), clock, dir.path(), &after)
        .await
        .unwrap();

    assert_eq!(report.operations, 2);
    assert_eq!((report.inserted, report.modified), (0, 2));

    let updated = store.find_by_code("s100").await.unwrap().unwrap();
    assert!(updated.url.contains("/owner/renamed/main/"));
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);

    // Updates never carry a creation timestamp
    let calls = store.bulk_calls.lock().await;
    assert!(calls[1].iter().all(|op| op.created_at.is_none()));
    assert!(calls[0].iter().all(|op| op.created_at.is_some()));
}

#[tokio::test]
async fn test_owner_branch_and_folder_changes_each_resync_everything() {
    let dir = image_folder(&["s1.jpg", "s2.jpg", "s3.jpg"]);
    let store = Arc::new(InMemoryStore::default());
    let clock: Arc<dyn Clock> = Arc::new(SteppingClock::new());

    let targets = [
        SyncTarget::from_settings(&settings("a", "repo", "main"), "imgs").unwrap(),
        SyncTarget::from_settings(&settings("b", "repo", "main"), "imgs").unwrap(),
        SyncTarget::from_settings(&settings("b", "repo", "gh-pages"), "imgs").unwrap(),
        SyncTarget::from_settings(&settings("b", "repo", "gh-pages"), "imgs/v2").unwrap(),
    ];

    let first = run_sync(store.clone(), clock.clone(), dir.path(), &targets[0])
        .await
        .unwrap();
    assert_eq!(first.inserted, 3);

    for target in &targets[1..] {
        let report = run_sync(store.clone(), clock.clone(), dir.path(), target)
            .await
            .unwrap();
        assert_eq!(report.operations, 3);
        assert_eq!(report.modified, 3);
        assert_eq!(report.inserted, 0);
    }

    let record = store.find_by_code("s3").await.unwrap().unwrap();
    assert_eq!(record.folder, "imgs/v2");
    assert_eq!(store.count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_malformed_names_are_skipped() {
    let dir = image_folder(&["s100.jpg", "sabc.jpg", "s007.jpg", "readme.txt", "s101.png"]);
    std::fs::create_dir(dir.path().join("s5.jpg")).unwrap();

    let store = Arc::new(InMemoryStore::default());
    let target = SyncTarget::from_settings(&settings("o", "r", "main"), "f").unwrap();

    let report = run_sync(store.clone(), Arc::new(SteppingClock::new()), dir.path(), &target)
        .await
        .unwrap();

    assert_eq!(report.scanned, 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.inserted, 1);
    let mut skipped = report.skipped_files.clone();
    skipped.sort();
    assert_eq!(skipped, vec!["s007.jpg", "sabc.jpg"]);

    assert!(store.find_by_code("s100").await.unwrap().is_some());
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_inventory_is_sorted_by_number() {
    let dir = image_folder(&["s10.jpg", "s9.jpg", "s100.jpg", "s0.jpg"]);
    let reader = InventoryReader::new(Arc::new(TokioFileSystem::new()));

    let inventory = reader.read(dir.path()).await.unwrap();
    let numbers: Vec<u64> = inventory.codes().map(|c| c.number()).collect();

    assert_eq!(numbers, vec![0, 9, 10, 100]);
}

#[tokio::test]
async fn test_missing_folder_is_fatal() {
    let dir = TempDir::new().unwrap();
    let reader = InventoryReader::new(Arc::new(TokioFileSystem::new()));

    let result = reader.read(&dir.path().join("does-not-exist")).await;
    assert!(matches!(result, Err(SyncError::Bridge(_))));
}

#[tokio::test]
async fn test_lookup_failure_aborts_before_any_write() {
    let dir = image_folder(&["s1.jpg", "s2.jpg"]);

    let mut store = MockStore::new();
    store
        .expect_find_by_code()
        .returning(|_| Err(LibraryError::Connection("connection refused".to_string())));
    store.expect_bulk_upsert().times(0);

    let target = SyncTarget::from_settings(&settings("o", "r", "main"), "f").unwrap();
    let result = run_sync(Arc::new(store), Arc::new(SteppingClock::new()), dir.path(), &target).await;

    assert!(matches!(result, Err(SyncError::DocumentStoreConnection(_))));
}

#[tokio::test]
async fn test_partial_bulk_write_surfaces_counts() {
    let dir = image_folder(&["s1.jpg", "s2.jpg", "s3.jpg"]);

    let mut store = MockStore::new();
    store.expect_find_by_code().returning(|_| Ok(None));
    store
        .expect_bulk_upsert()
        .times(1)
        .withf(|ops| ops.len() == 3 && ops.iter().all(|op| op.created_at.is_some()))
        .returning(|_| {
            Err(LibraryError::BulkWrite {
                inserted: 1,
                modified: 0,
                message: "disk I/O error".to_string(),
            })
        });

    let target = SyncTarget::from_settings(&settings("o", "r", "main"), "f").unwrap();
    let result = run_sync(Arc::new(store), Arc::new(SteppingClock::new()), dir.path(), &target).await;

    match result {
        Err(SyncError::BulkWrite {
            inserted, modified, ..
        }) => {
            assert_eq!((inserted, modified), (1, 0));
        }
        other => panic!("expected BulkWrite, got {other:?}"),
    }
}

#[tokio::test]
async fn test_sync_against_sqlite_store() {
    let dir = image_folder(&["s100.jpg", "s102.jpg"]);
    let store: Arc<dyn DocumentStore> = Arc::new(SqliteImageStore::new(create_test_pool().await.unwrap()));
    let clock: Arc<dyn Clock> = Arc::new(SteppingClock::new());
    let target = SyncTarget::from_settings(&settings("owner", "repo", "main"), "images").unwrap();

    let first = run_sync(store.clone(), clock.clone(), dir.path(), &target)
        .await
        .unwrap();
    let second = run_sync(store.clone(), clock.clone(), dir.path(), &target)
        .await
        .unwrap();

    assert_eq!((first.inserted, first.modified), (2, 0));
    assert_eq!(second.operations, 0);
    assert!(first.inserted + first.modified <= first.operations as u64);

    // A new image joins an already synced folder
    std::fs::write(dir.path().join("s101.jpg"), b"x").unwrap();
    let third = run_sync(store.clone(), clock, dir.path(), &target)
        .await
        .unwrap();
    assert_eq!((third.inserted, third.modified, third.unchanged), (1, 0, 2));
    assert_eq!(store.count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_oversized_code_is_skipped_instead_of_failing_the_batch() {
    let dir = image_folder(&["s5.jpg", "s9223372036854775808.jpg", "s6.jpg"]);
    let store: Arc<dyn DocumentStore> = Arc::new(SqliteImageStore::new(create_test_pool().await.unwrap()));
    let target = SyncTarget::from_settings(&settings("owner", "repo", "main"), "images").unwrap();

    let report = run_sync(store.clone(), Arc::new(SteppingClock::new()), dir.path(), &target)
        .await
        .unwrap();

    assert_eq!(report.scanned, 2);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.skipped_files, vec!["s9223372036854775808.jpg"]);
    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_report_serializes_for_machine_output() {
    let dir = image_folder(&["s1.jpg"]);
    let target = SyncTarget::from_settings(&settings("o", "r", "main"), "f").unwrap();
    let report = run_sync(
        Arc::new(InMemoryStore::default()),
        Arc::new(SteppingClock::new()),
        dir.path(),
        &target,
    )
    .await
    .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["inserted"], 1);
    assert_eq!(json["scanned"], 1);
    assert_eq!(json["skipped_files"], serde_json::json!([]));
}
