// Metadata Store Port
// Remote record store used for idempotency checks and visit status upserts.

use async_trait::async_trait;

use crate::domain::ItemId;
use crate::error::Result;
use crate::port::session_driver::VisitStatus;

/// Metadata store trait.
///
/// `exists` is the idempotency check: an item with a record is never
/// visited again.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Does a record already exist for this item?
    async fn exists(&self, item: &ItemId) -> Result<bool>;

    /// Create or update the visit record for an item
    async fn upsert_status(
        &self,
        item: &ItemId,
        status: VisitStatus,
        extra: serde_json::Value,
    ) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// In-memory metadata store with failure injection
    pub struct InMemoryMetadataStore {
        records: Mutex<BTreeMap<ItemId, VisitStatus>>,
        fail_exists_once: Mutex<Option<String>>,
        fail_upsert_once: Mutex<Option<String>>,
    }

    impl InMemoryMetadataStore {
        pub fn new() -> Self {
            Self {
                records: Mutex::new(BTreeMap::new()),
                fail_exists_once: Mutex::new(None),
                fail_upsert_once: Mutex::new(None),
            }
        }

        /// Pre-seed items as already recorded (idempotency hits)
        pub fn seed(&self, items: impl IntoIterator<Item = ItemId>) {
            let mut records = self.records.lock().unwrap();
            for item in items {
                records.insert(item, VisitStatus::Visited);
            }
        }

        pub fn fail_next_exists(&self, message: impl Into<String>) {
            *self.fail_exists_once.lock().unwrap() = Some(message.into());
        }

        pub fn fail_next_upsert(&self, message: impl Into<String>) {
            *self.fail_upsert_once.lock().unwrap() = Some(message.into());
        }

        pub fn recorded(&self) -> Vec<ItemId> {
            self.records.lock().unwrap().keys().cloned().collect()
        }

        pub fn status_of(&self, item: &str) -> Option<VisitStatus> {
            self.records.lock().unwrap().get(item).copied()
        }
    }

    impl Default for InMemoryMetadataStore {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl MetadataStore for InMemoryMetadataStore {
        async fn exists(&self, item: &ItemId) -> Result<bool> {
            if let Some(message) = self.fail_exists_once.lock().unwrap().take() {
                return Err(AppError::Metadata(message));
            }
            Ok(self.records.lock().unwrap().contains_key(item))
        }

        async fn upsert_status(
            &self,
            item: &ItemId,
            status: VisitStatus,
            _extra: serde_json::Value,
        ) -> Result<()> {
            if let Some(message) = self.fail_upsert_once.lock().unwrap().take() {
                return Err(AppError::Metadata(message));
            }
            self.records.lock().unwrap().insert(item.clone(), status);
            Ok(())
        }
    }
}
