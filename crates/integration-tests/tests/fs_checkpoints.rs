//! Orchestrator over the filesystem checkpoint adapter.
//!
//! Exercises the on-disk contract end to end: directory layout, the JSON
//! schema being readable by a second store instance, and resume working
//! across simulated process restarts.

use std::sync::Arc;

use harvest_core::application::monitor::Monitor;
use harvest_core::application::orchestrator::{JobOrchestrator, RunOutcome};
use harvest_core::config::EngineConfig;
use harvest_core::domain::{Category, CollectionJob, MasterIndex};
use harvest_core::port::id_provider::mocks::SequentialIdProvider;
use harvest_core::port::metadata_store::mocks::InMemoryMetadataStore;
use harvest_core::port::object_store::mocks::InMemoryObjectStore;
use harvest_core::port::session_driver::mocks::ScriptedDriver;
use harvest_core::port::time_provider::mocks::SteppingTimeProvider;
use harvest_core::port::CheckpointStore;
use harvest_infra_fs::FsCheckpointStore;

fn items(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{}-{}", prefix, i)).collect()
}

/// A fresh orchestrator over a new store instance rooted at `dir`, sharing
/// the driver and metadata store with previous instances.
fn orchestrator(
    dir: &std::path::Path,
    driver: Arc<ScriptedDriver>,
    metadata: Arc<InMemoryMetadataStore>,
) -> JobOrchestrator {
    let time_provider = Arc::new(SteppingTimeProvider::new(1_700_000_000_000, 25));
    JobOrchestrator::new(
        driver,
        metadata,
        Arc::new(InMemoryObjectStore::new()),
        Arc::new(FsCheckpointStore::new(dir, time_provider.clone())),
        Arc::new(Monitor::new(time_provider.clone())),
        time_provider,
        Arc::new(SequentialIdProvider::new()),
        EngineConfig::without_pacing(),
    )
}

#[tokio::test]
async fn test_run_writes_expected_checkpoint_layout() {
    let dir = tempfile::tempdir().unwrap();
    let driver = Arc::new(ScriptedDriver::new());
    driver.set_items(Category::Followers, items("fw", 25), 10);

    let mut job = CollectionJob::new_test("acct-1");
    job.batch_size = 10;

    let orchestrator = orchestrator(dir.path(), driver, Arc::new(InMemoryMetadataStore::new()));
    match orchestrator.run(job).await.unwrap() {
        RunOutcome::Completed(report) => assert_eq!(report.total_processed(), 25),
        other => panic!("expected completion, got {:?}", other),
    }

    assert!(dir.path().join("master_index/id-1.json").is_file());
    for n in 0..3 {
        let path = dir
            .path()
            .join(format!("batches/FOLLOWERS/batch_{:05}.json", n));
        assert!(path.is_file(), "missing {}", path.display());
    }

    // index must be plain JSON readable by an independent store
    let time_provider = Arc::new(SteppingTimeProvider::new(0, 1));
    let reader = FsCheckpointStore::new(dir.path(), time_provider);
    let index: MasterIndex = reader.load_master_index("id-1").await.unwrap().unwrap();
    assert!(index.is_category_complete(Category::Followers));
    assert_eq!(index.category(Category::Followers).total_items(), 25);

    let first_ref = &index.category(Category::Followers).batch_refs[0].reference;
    let batch = reader.load_batch_file(first_ref).await.unwrap();
    assert_eq!(batch.items, items("fw", 10));
}

#[tokio::test]
async fn test_orphan_batch_file_from_crash_window_is_recovered() {
    let dir = tempfile::tempdir().unwrap();

    // Simulate a crash between the batch write and the index write: the
    // batch file landed on disk but no master index references it.
    let time_provider = Arc::new(SteppingTimeProvider::new(0, 1));
    let stale = FsCheckpointStore::new(dir.path(), time_provider);
    stale
        .save_batch_file(Category::Followers, 0, &["stale-0".to_string()])
        .await
        .unwrap();
    assert!(dir
        .path()
        .join("batches/FOLLOWERS/batch_00000.json")
        .is_file());

    // A fresh run over the same root must re-collect and complete, not
    // stall on the leftover file.
    let driver = Arc::new(ScriptedDriver::new());
    driver.set_items(Category::Followers, items("fw", 25), 10);

    let mut job = CollectionJob::new_test("acct-1");
    job.batch_size = 10;

    let orchestrator = orchestrator(dir.path(), driver, Arc::new(InMemoryMetadataStore::new()));
    match orchestrator.run(job).await.unwrap() {
        RunOutcome::Completed(report) => assert_eq!(report.total_processed(), 25),
        other => panic!("expected completion, got {:?}", other),
    }

    // the orphan was replaced by the re-collected batch
    let time_provider = Arc::new(SteppingTimeProvider::new(0, 1));
    let reader = FsCheckpointStore::new(dir.path(), time_provider);
    let batch = reader
        .load_batch_file("batches/FOLLOWERS/batch_00000.json")
        .await
        .unwrap();
    assert_eq!(batch.items, items("fw", 10));
}

#[tokio::test]
async fn test_resume_across_store_instances() {
    let dir = tempfile::tempdir().unwrap();
    let driver = Arc::new(ScriptedDriver::new());
    driver.set_items(Category::Followers, items("fw", 25), 10);
    driver.fail_visit_once("fw-13", "rate limit exceeded");
    let metadata = Arc::new(InMemoryMetadataStore::new());

    let mut job = CollectionJob::new_test("acct-1");
    job.batch_size = 10;

    // first process: runs until the rate limit
    let first = orchestrator(dir.path(), driver.clone(), metadata.clone());
    let healed = match first.run(job).await.unwrap() {
        RunOutcome::Healing(healed) => healed,
        other => panic!("expected healing, got {:?}", other),
    };
    let payload = serde_json::to_string(&healed).unwrap();
    drop(first);

    // second process: fresh orchestrator and store over the same directory
    let restored: CollectionJob = serde_json::from_str(&payload).unwrap();
    let second = orchestrator(dir.path(), driver.clone(), metadata);
    let report = match second.run(restored).await.unwrap() {
        RunOutcome::Completed(report) => report,
        other => panic!("expected completion, got {:?}", other),
    };

    assert_eq!(report.total_processed(), 12);
    assert_eq!(driver.visited().len(), 25);
}
