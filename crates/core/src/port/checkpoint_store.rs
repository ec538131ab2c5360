// Checkpoint Store Port
// Durability for the master index and batch files. The engine defines the
// schema; implementations provide any durable key/blob store (the engine
// must not assume a local filesystem).

use async_trait::async_trait;

use crate::domain::{BatchFile, Category, ItemId, MasterIndex};
use crate::error::Result;

/// Checkpoint store trait.
///
/// Save calls must be durable before returning: a crash after a save
/// returns must be recoverable from what was written.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load a master index; Ok(None) when the reference is unknown
    async fn load_master_index(&self, reference: &str) -> Result<Option<MasterIndex>>;

    /// Persist (create or replace) a master index
    async fn save_master_index(&self, reference: &str, index: &MasterIndex) -> Result<()>;

    /// Persist a batch file and return its reference.
    ///
    /// Must replace an existing file for the same category and number:
    /// after a crash between a batch write and the index write, recovery
    /// re-collects and rewrites that batch.
    async fn save_batch_file(
        &self,
        category: Category,
        batch_number: u32,
        items: &[ItemId],
    ) -> Result<String>;

    /// Load a batch file by reference
    async fn load_batch_file(&self, reference: &str) -> Result<BatchFile>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory checkpoint store tracking save counts for flush assertions
    pub struct InMemoryCheckpointStore {
        indexes: Mutex<HashMap<String, MasterIndex>>,
        batches: Mutex<HashMap<String, BatchFile>>,
        index_saves: Mutex<u32>,
    }

    impl InMemoryCheckpointStore {
        pub fn new() -> Self {
            Self {
                indexes: Mutex::new(HashMap::new()),
                batches: Mutex::new(HashMap::new()),
                index_saves: Mutex::new(0),
            }
        }

        /// Number of master index saves seen so far
        pub fn index_save_count(&self) -> u32 {
            *self.index_saves.lock().unwrap()
        }

        /// Snapshot of a stored master index
        pub fn index(&self, reference: &str) -> Option<MasterIndex> {
            self.indexes.lock().unwrap().get(reference).cloned()
        }

        /// Number of batch files persisted
        pub fn batch_file_count(&self) -> usize {
            self.batches.lock().unwrap().len()
        }
    }

    impl Default for InMemoryCheckpointStore {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl CheckpointStore for InMemoryCheckpointStore {
        async fn load_master_index(&self, reference: &str) -> Result<Option<MasterIndex>> {
            Ok(self.indexes.lock().unwrap().get(reference).cloned())
        }

        async fn save_master_index(&self, reference: &str, index: &MasterIndex) -> Result<()> {
            *self.index_saves.lock().unwrap() += 1;
            self.indexes
                .lock()
                .unwrap()
                .insert(reference.to_string(), index.clone());
            Ok(())
        }

        async fn save_batch_file(
            &self,
            category: Category,
            batch_number: u32,
            items: &[ItemId],
        ) -> Result<String> {
            let reference = format!("{}:batch:{:05}", category, batch_number);
            let mut batches = self.batches.lock().unwrap();
            // replaces any existing file, matching the durable contract
            batches.insert(
                reference.clone(),
                BatchFile {
                    batch_number,
                    category,
                    items: items.to_vec(),
                    captured_at: 0,
                },
            );
            Ok(reference)
        }

        async fn load_batch_file(&self, reference: &str) -> Result<BatchFile> {
            self.batches
                .lock()
                .unwrap()
                .get(reference)
                .cloned()
                .ok_or_else(|| AppError::Checkpoint(format!("batch file not found: {}", reference)))
        }
    }
}
