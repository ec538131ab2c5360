// Collection Job Domain Model
// The serialized form of CollectionJob is the healing payload contract:
// field names must stay stable across versions for resumability to work.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::Category;

/// Job ID (UUID v4 in production, injected via IdProvider)
pub type JobId = String;

/// Identifier of a single work item on the external platform
pub type ItemId = String;

/// Credentials handle carried by a job.
///
/// Never inspected by the engine, only forwarded to the session driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialsRef {
    /// Opaque reference to externally-held credentials
    Reference { reference: String },
    /// Plaintext pair supplied directly by the caller
    Inline { username: String, password: String },
}

impl CredentialsRef {
    /// True when the handle carries no usable content
    pub fn is_empty(&self) -> bool {
        match self {
            CredentialsRef::Reference { reference } => reference.is_empty(),
            CredentialsRef::Inline { username, password } => {
                username.is_empty() || password.is_empty()
            }
        }
    }
}

/// Healing phase of a job.
///
/// A job is either not healing, healing at job scope, or healing inside
/// the list-creation sub-problem for one category. The tagged variant makes
/// partial phase/reason combinations unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealPhase {
    None,
    Job {
        phase: String,
        reason: String,
    },
    ListCreation {
        category: Category,
        expansion_attempt: u32,
        file_index: u32,
        reason: String,
    },
}

impl HealPhase {
    pub fn is_healing(&self) -> bool {
        !matches!(self, HealPhase::None)
    }

    /// Phase label, None when not healing
    pub fn phase(&self) -> Option<&str> {
        match self {
            HealPhase::None => None,
            HealPhase::Job { phase, .. } => Some(phase),
            HealPhase::ListCreation { .. } => Some("LIST_CREATION"),
        }
    }

    /// Reason text, None when not healing
    pub fn reason(&self) -> Option<&str> {
        match self {
            HealPhase::None => None,
            HealPhase::Job { reason, .. } => Some(reason),
            HealPhase::ListCreation { reason, .. } => Some(reason),
        }
    }
}

/// Collection Job - the unit of resumability.
///
/// Passed by value between calls, mutated only by the orchestrator as
/// processing advances, and handed back to the caller inside a healing
/// signal (or discarded on success).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionJob {
    pub id: JobId,

    /// Platform account this run works against (the job identity)
    pub account_id: String,

    /// Forwarded to the session driver, never processed here
    pub credentials: CredentialsRef,

    /// Incremented once per healing restart; caps runaway healing loops
    /// and weights monitoring statistics
    pub recursion_count: u32,

    pub heal: HealPhase,

    /// None means "not yet started a category"
    pub current_category: Option<Category>,

    /// Resume position within the current category's batch files
    pub current_batch: u32,

    /// Resume position within the current batch's item list
    pub current_index: u32,

    /// Batch numbers already fully processed for the current category
    pub completed_batches: BTreeSet<u32>,

    /// Reference to the persisted master index; None until first created
    pub master_index_ref: Option<String>,

    /// Fixed for the life of a run
    pub batch_size: u32,

    /// Expected per-category item counts; progress reporting only
    pub total_counts: BTreeMap<Category, u64>,

    pub created_at: i64, // epoch ms
}

impl CollectionJob {
    /// Create a fresh job with zeroed positional fields.
    ///
    /// ID and timestamp are injected, not generated, so callers can use
    /// deterministic providers in tests.
    pub fn new(
        id: impl Into<String>,
        created_at: i64,
        account_id: impl Into<String>,
        credentials: CredentialsRef,
        batch_size: u32,
    ) -> Self {
        Self {
            id: id.into(),
            account_id: account_id.into(),
            credentials,
            recursion_count: 0,
            heal: HealPhase::None,
            current_category: None,
            current_batch: 0,
            current_index: 0,
            completed_batches: BTreeSet::new(),
            master_index_ref: None,
            batch_size,
            total_counts: BTreeMap::new(),
            created_at,
        }
    }

    /// True iff the job carries an active healing phase
    pub fn is_healing(&self) -> bool {
        self.heal.is_healing()
    }

    /// True iff the job resumes prior progress rather than starting fresh
    pub fn is_resuming(&self) -> bool {
        self.master_index_ref.is_some()
            || self.current_batch > 0
            || self.current_index > 0
            || !self.completed_batches.is_empty()
    }
}

impl CollectionJob {
    /// Create a test job with deterministic ID and timestamp.
    ///
    /// Uses a simple counter for deterministic test IDs (test-1, test-2, ...).
    /// Timestamps start at 1000 and increment by 1000.
    ///
    /// **Note**: This method should only be used in tests. For production
    /// code, always inject ID and time via providers.
    pub fn new_test(account_id: impl Into<String>) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let id = format!("test-{}", counter);
        let created_at = (counter * 1000) as i64;

        Self::new(
            id,
            created_at,
            account_id,
            CredentialsRef::Reference {
                reference: "vault://test-credentials".to_string(),
            },
            crate::application::constants::DEFAULT_BATCH_SIZE,
        )
    }
}
