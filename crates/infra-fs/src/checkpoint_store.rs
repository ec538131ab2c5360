// Filesystem CheckpointStore Implementation
//
// Layout under the configured root:
//   master_index/<reference>.json
//   batches/<CATEGORY>/batch_<nnnnn>.json
//
// Every write goes to a temp file in the destination directory, is synced,
// then renamed into place, so readers never observe a torn checkpoint.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use harvest_core::domain::{BatchFile, Category, ItemId, MasterIndex};
use harvest_core::error::{AppError, Result};
use harvest_core::port::{CheckpointStore, TimeProvider};
use std::sync::Arc;

fn fs_err(action: &str, path: &Path, err: std::io::Error) -> AppError {
    AppError::Checkpoint(format!("{} {}: {}", action, path.display(), err))
}

pub struct FsCheckpointStore {
    root: PathBuf,
    time_provider: Arc<dyn TimeProvider>,
}

impl FsCheckpointStore {
    pub fn new(root: impl Into<PathBuf>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            root: root.into(),
            time_provider,
        }
    }

    fn index_path(&self, reference: &str) -> Result<PathBuf> {
        validate_reference(reference)?;
        Ok(self
            .root
            .join("master_index")
            .join(format!("{}.json", reference)))
    }

    fn batch_path(&self, reference: &str) -> Result<PathBuf> {
        validate_reference(reference)?;
        Ok(self.root.join(reference))
    }

    /// Serialize and durably write a value, temp file then rename
    async fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| AppError::Checkpoint(format!("no parent dir: {}", path.display())))?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| fs_err("create dir", parent, e))?;

        let bytes = serde_json::to_vec_pretty(value)?;
        let tmp = path.with_extension("json.tmp");

        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| fs_err("create", &tmp, e))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| fs_err("write", &tmp, e))?;
        file.sync_all().await.map_err(|e| fs_err("sync", &tmp, e))?;
        drop(file);

        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| fs_err("rename", path, e))?;
        Ok(())
    }
}

/// References come back out of persisted job payloads; reject anything that
/// could escape the checkpoint root.
fn validate_reference(reference: &str) -> Result<()> {
    if reference.is_empty()
        || reference.split('/').any(|part| part == "..")
        || reference.starts_with('/')
    {
        return Err(AppError::Checkpoint(format!(
            "invalid checkpoint reference: {:?}",
            reference
        )));
    }
    Ok(())
}

#[async_trait]
impl CheckpointStore for FsCheckpointStore {
    async fn load_master_index(&self, reference: &str) -> Result<Option<MasterIndex>> {
        let path = self.index_path(reference)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(fs_err("read", &path, e)),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save_master_index(&self, reference: &str, index: &MasterIndex) -> Result<()> {
        let path = self.index_path(reference)?;
        self.write_json(&path, index).await?;
        debug!(index_ref = %reference, "Master index saved");
        Ok(())
    }

    async fn save_batch_file(
        &self,
        category: Category,
        batch_number: u32,
        items: &[ItemId],
    ) -> Result<String> {
        let reference = format!("batches/{}/batch_{:05}.json", category, batch_number);
        let path = self.batch_path(&reference)?;

        // Replace any existing file: a crash between a batch write and the
        // index write leaves an orphan the index never references, and
        // recovery re-collects and rewrites that same batch number.
        let batch = BatchFile {
            batch_number,
            category,
            items: items.to_vec(),
            captured_at: self.time_provider.now_millis(),
        };
        self.write_json(&path, &batch).await?;
        debug!(reference = %reference, items = %items.len(), "Batch file saved");
        Ok(reference)
    }

    async fn load_batch_file(&self, reference: &str) -> Result<BatchFile> {
        let path = self.batch_path(reference)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| fs_err("read", &path, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_core::port::time_provider::mocks::SteppingTimeProvider;

    fn store(dir: &tempfile::TempDir) -> FsCheckpointStore {
        FsCheckpointStore::new(
            dir.path(),
            Arc::new(SteppingTimeProvider::new(1_700_000_000_000, 1)),
        )
    }

    fn sample_index() -> MasterIndex {
        MasterIndex::new(1_700_000_000_000, 100, Default::default())
    }

    #[tokio::test]
    async fn test_master_index_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let mut index = sample_index();
        index.push_batch_ref(Category::Followers, 0, 100, "batches/FOLLOWERS/batch_00000.json".to_string());
        store.save_master_index("run-1", &index).await.unwrap();

        let loaded = store.load_master_index("run-1").await.unwrap().unwrap();
        assert_eq!(loaded.batch_size, 100);
        assert_eq!(loaded.category(Category::Followers).batch_refs.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_index_is_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        assert!(store.load_master_index("no-such").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_existing_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let mut index = sample_index();
        store.save_master_index("run-1", &index).await.unwrap();
        index.category_mut(Category::Followers).list_complete = true;
        store.save_master_index("run-1", &index).await.unwrap();

        let loaded = store.load_master_index("run-1").await.unwrap().unwrap();
        assert!(loaded.category(Category::Followers).list_complete);
    }

    #[tokio::test]
    async fn test_batch_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let items: Vec<ItemId> = (0..5).map(|i| format!("item-{}", i)).collect();
        let reference = store
            .save_batch_file(Category::Following, 3, &items)
            .await
            .unwrap();
        assert_eq!(reference, "batches/FOLLOWING/batch_00003.json");

        let batch = store.load_batch_file(&reference).await.unwrap();
        assert_eq!(batch.batch_number, 3);
        assert_eq!(batch.category, Category::Following);
        assert_eq!(batch.items, items);
        assert_eq!(batch.captured_at, 1_700_000_000_000);
    }

    #[tokio::test]
    async fn test_batch_file_rewrite_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        // first write is the crash orphan, second is the recovery rewrite
        store
            .save_batch_file(Category::Followers, 0, &["a".to_string()])
            .await
            .unwrap();
        let reference = store
            .save_batch_file(Category::Followers, 0, &["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        let batch = store.load_batch_file(&reference).await.unwrap();
        assert_eq!(batch.items, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        store
            .save_master_index("run-1", &sample_index())
            .await
            .unwrap();

        let mut entries = tokio::fs::read_dir(dir.path().join("master_index"))
            .await
            .unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["run-1.json"]);
    }

    #[tokio::test]
    async fn test_traversal_references_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        assert!(store.load_batch_file("../outside.json").await.is_err());
        assert!(store.load_master_index("").await.is_err());
    }
}
