// Object Store Port
// Blob storage for visit evidence. Retry/backoff is internal to the
// implementation; a surfaced failure classifies as a storage error.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a blob under a key
    async fn upload(&self, key: &str, bytes: &[u8]) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// In-memory object store with failure injection
    pub struct InMemoryObjectStore {
        blobs: Mutex<BTreeMap<String, Vec<u8>>>,
        fail_once: Mutex<Option<String>>,
    }

    impl InMemoryObjectStore {
        pub fn new() -> Self {
            Self {
                blobs: Mutex::new(BTreeMap::new()),
                fail_once: Mutex::new(None),
            }
        }

        pub fn fail_next_upload(&self, message: impl Into<String>) {
            *self.fail_once.lock().unwrap() = Some(message.into());
        }

        pub fn uploaded_keys(&self) -> Vec<String> {
            self.blobs.lock().unwrap().keys().cloned().collect()
        }
    }

    impl Default for InMemoryObjectStore {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ObjectStore for InMemoryObjectStore {
        async fn upload(&self, key: &str, bytes: &[u8]) -> Result<()> {
            if let Some(message) = self.fail_once.lock().unwrap().take() {
                return Err(AppError::Storage(message));
            }
            self.blobs
                .lock()
                .unwrap()
                .insert(key.to_string(), bytes.to_vec());
            Ok(())
        }
    }
}
