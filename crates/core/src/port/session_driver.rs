// Session Driver Port
// Abstraction over the automated browser session: category listing and
// per-item visits. The engine never sees selectors or navigation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Category, ItemId};
use crate::error::Result;

/// One page of a category listing.
///
/// Paging is driven by the orchestrator so partial collection progress
/// stays checkpointable.
#[derive(Debug, Clone)]
pub struct CollectedPage {
    pub items: Vec<ItemId>,
    pub has_more: bool,
}

/// Outcome of visiting a single item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitStatus {
    Visited,
    Private,
    Unavailable,
}

impl VisitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::Visited => "VISITED",
            VisitStatus::Private => "PRIVATE",
            VisitStatus::Unavailable => "UNAVAILABLE",
        }
    }
}

impl std::fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Evidence captured during a visit (e.g. a screenshot), uploaded to the
/// object store by the orchestrator
#[derive(Debug, Clone)]
pub struct Evidence {
    pub key: String,
    pub bytes: Vec<u8>,
}

/// Result of a completed visit
#[derive(Debug, Clone)]
pub struct Visit {
    pub status: VisitStatus,
    pub evidence: Option<Evidence>,
}

/// Session driver trait.
///
/// Failures surface as `AppError::Driver` with the raw message preserved;
/// the orchestrator classifies the message to decide skip/heal/fatal.
#[async_trait]
pub trait SessionDriver: Send + Sync {
    /// Fetch one page of a category listing (pages are 0-based)
    async fn collect_page(&self, category: Category, page: u32) -> Result<CollectedPage>;

    /// Visit a single item, capturing evidence of the visit
    async fn visit_item(&self, item: &ItemId) -> Result<Visit>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted driver for tests: per-category page scripts plus one-shot
    /// failure injection for collection pages and item visits.
    pub struct ScriptedDriver {
        pages: Mutex<HashMap<Category, Vec<Vec<ItemId>>>>,
        collect_failures: Mutex<HashMap<(Category, u32), String>>,
        visit_failures: Mutex<HashMap<ItemId, String>>,
        visited: Mutex<Vec<ItemId>>,
        with_evidence: bool,
    }

    impl ScriptedDriver {
        pub fn new() -> Self {
            Self {
                pages: Mutex::new(HashMap::new()),
                collect_failures: Mutex::new(HashMap::new()),
                visit_failures: Mutex::new(HashMap::new()),
                visited: Mutex::new(Vec::new()),
                with_evidence: false,
            }
        }

        pub fn with_evidence() -> Self {
            Self {
                with_evidence: true,
                ..Self::new()
            }
        }

        /// Script a category's full item list, split into listing pages
        pub fn set_items(&self, category: Category, items: Vec<ItemId>, page_size: usize) {
            let pages = items
                .chunks(page_size.max(1))
                .map(|chunk| chunk.to_vec())
                .collect();
            self.pages.lock().unwrap().insert(category, pages);
        }

        /// Fail the next fetch of a specific listing page, once
        pub fn fail_collect_once(&self, category: Category, page: u32, message: impl Into<String>) {
            self.collect_failures
                .lock()
                .unwrap()
                .insert((category, page), message.into());
        }

        /// Fail the next visit of a specific item, once
        pub fn fail_visit_once(&self, item: impl Into<ItemId>, message: impl Into<String>) {
            self.visit_failures
                .lock()
                .unwrap()
                .insert(item.into(), message.into());
        }

        /// Items visited so far, in order
        pub fn visited(&self) -> Vec<ItemId> {
            self.visited.lock().unwrap().clone()
        }
    }

    impl Default for ScriptedDriver {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl SessionDriver for ScriptedDriver {
        async fn collect_page(&self, category: Category, page: u32) -> Result<CollectedPage> {
            if let Some(message) = self.collect_failures.lock().unwrap().remove(&(category, page))
            {
                return Err(AppError::Driver(message));
            }

            let pages = self.pages.lock().unwrap();
            let script = pages.get(&category);
            match script {
                Some(script) if (page as usize) < script.len() => Ok(CollectedPage {
                    items: script[page as usize].clone(),
                    has_more: (page as usize) + 1 < script.len(),
                }),
                _ => Ok(CollectedPage {
                    items: Vec::new(),
                    has_more: false,
                }),
            }
        }

        async fn visit_item(&self, item: &ItemId) -> Result<Visit> {
            if let Some(message) = self.visit_failures.lock().unwrap().remove(item) {
                return Err(AppError::Driver(message));
            }

            self.visited.lock().unwrap().push(item.clone());
            let evidence = self.with_evidence.then(|| Evidence {
                key: format!("evidence/{}.png", item),
                bytes: vec![0xCA, 0xFE],
            });
            Ok(Visit {
                status: VisitStatus::Visited,
                evidence,
            })
        }
    }
}
