// State Manager - pure functions over CollectionJob values
// No I/O here; construction, mutation-by-copy, validation, and progress
// summaries only.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::error::{DomainError, Result};
use crate::domain::{Category, CollectionJob, CredentialsRef, HealPhase};
use crate::port::{IdProvider, TimeProvider};

/// Caller-supplied inputs for a fresh job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewJobInputs {
    pub account_id: String,

    /// Opaque reference to externally-held credentials
    pub credentials_ref: Option<String>,

    /// Plaintext pair, accepted when no reference is supplied
    pub username: Option<String>,
    pub password: Option<String>,

    pub batch_size: Option<u32>,
    pub total_counts: BTreeMap<Category, u64>,
}

/// Overrides applied when building a healing state.
/// Unset fields fall back to the previous state's values.
#[derive(Debug, Clone, Default)]
pub struct HealingParams {
    pub phase: Option<String>,
    pub reason: Option<String>,
    pub current_category: Option<Category>,
    pub current_batch: Option<u32>,
    pub current_index: Option<u32>,
    pub completed_batches: Option<BTreeSet<u32>>,
    pub master_index_ref: Option<String>,
}

/// Positional progress merged in after a batch completes
#[derive(Debug, Clone, Default)]
pub struct BatchProgress {
    pub current_category: Option<Category>,
    pub current_batch: Option<u32>,
    pub current_index: Option<u32>,
    /// Newly completed batch number, added to the completed set
    pub completed_batch: Option<u32>,
    pub master_index_ref: Option<String>,
}

/// Progress snapshot computed from a job state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub estimated_processed: u64,
    pub total_expected: u64,
    /// Percentage clamped to 100, rounded to 2 decimal places
    pub progress_percentage: f64,
    pub is_healing: bool,
    pub is_resuming: bool,
    pub recursion_count: u32,
}

/// Build a fresh job from caller inputs.
///
/// Fails with `InvalidInput` when no job identity is supplied, or when
/// neither an opaque credential reference nor a full plaintext pair is.
pub fn build_initial_state(
    inputs: NewJobInputs,
    id_provider: &dyn IdProvider,
    time_provider: &dyn TimeProvider,
) -> Result<CollectionJob> {
    if inputs.account_id.is_empty() {
        return Err(DomainError::InvalidInput(
            "missing account identity".to_string(),
        ));
    }

    let credentials = match (inputs.credentials_ref, inputs.username, inputs.password) {
        (Some(reference), _, _) if !reference.is_empty() => {
            CredentialsRef::Reference { reference }
        }
        (_, Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
            CredentialsRef::Inline { username, password }
        }
        _ => {
            return Err(DomainError::InvalidInput(
                "missing required credentials: supply a credential reference or a username/password pair".to_string(),
            ))
        }
    };

    let mut job = CollectionJob::new(
        id_provider.generate_id(),
        time_provider.now_millis(),
        inputs.account_id,
        credentials,
        inputs
            .batch_size
            .unwrap_or(crate::application::constants::DEFAULT_BATCH_SIZE),
    );
    job.total_counts = inputs.total_counts;

    validate_state(&job)?;
    Ok(job)
}

/// Build a job-scoped healing state from a previous state.
///
/// `previous` is never mutated. The result carries `recursion_count + 1`
/// and the exact resume position, with `params` overriding field by field.
pub fn build_healing_state(previous: &CollectionJob, params: HealingParams) -> CollectionJob {
    let phase = params
        .phase
        .or_else(|| previous.heal.phase().map(str::to_string))
        .unwrap_or_else(|| "JOB".to_string());
    let reason = params
        .reason
        .or_else(|| previous.heal.reason().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string());

    let mut healed = previous.clone();
    healed.recursion_count = previous.recursion_count + 1;
    healed.heal = HealPhase::Job { phase, reason };
    healed.current_category = params.current_category.or(previous.current_category);
    healed.current_batch = params.current_batch.unwrap_or(previous.current_batch);
    healed.current_index = params.current_index.unwrap_or(previous.current_index);
    healed.completed_batches = params
        .completed_batches
        .unwrap_or_else(|| previous.completed_batches.clone());
    healed.master_index_ref = params
        .master_index_ref
        .or_else(|| previous.master_index_ref.clone());
    healed
}

/// Finer-grained healing variant for the list-creation sub-problem:
/// tracks which collection page was in flight and how many expansion
/// attempts this category has already cost.
pub fn build_list_creation_healing_state(
    previous: &CollectionJob,
    category: Category,
    expansion_attempt: u32,
    file_index: u32,
    reason: impl Into<String>,
) -> CollectionJob {
    let mut healed = previous.clone();
    healed.recursion_count = previous.recursion_count + 1;
    healed.heal = HealPhase::ListCreation {
        category,
        expansion_attempt,
        file_index,
        reason: reason.into(),
    };
    healed.current_category = Some(category);
    healed
}

/// Merge positional progress into a new state
pub fn update_batch_progress(previous: &CollectionJob, progress: BatchProgress) -> CollectionJob {
    let mut updated = previous.clone();
    updated.current_category = progress.current_category.or(previous.current_category);
    updated.current_batch = progress.current_batch.unwrap_or(previous.current_batch);
    updated.current_index = progress.current_index.unwrap_or(previous.current_index);
    if let Some(completed) = progress.completed_batch {
        updated.completed_batches.insert(completed);
    }
    updated.master_index_ref = progress
        .master_index_ref
        .or_else(|| previous.master_index_ref.clone());
    updated
}

/// Validate a job state before running it.
///
/// Negative positional fields and categories outside the closed set are
/// unrepresentable by type; what remains is identity, credentials, and the
/// batch size.
pub fn validate_state(state: &CollectionJob) -> Result<()> {
    if state.account_id.is_empty() {
        return Err(DomainError::InvalidState(
            "missing account identity".to_string(),
        ));
    }
    if state.credentials.is_empty() {
        return Err(DomainError::InvalidState(
            "missing credential reference".to_string(),
        ));
    }
    if state.batch_size == 0 {
        return Err(DomainError::InvalidState(
            "batch_size must be positive".to_string(),
        ));
    }
    Ok(())
}

pub fn is_healing_state(state: &CollectionJob) -> bool {
    state.is_healing()
}

pub fn is_resuming_state(state: &CollectionJob) -> bool {
    state.is_resuming()
}

/// Compute the progress summary for a state.
///
/// `estimated_processed` counts completed batches at full batch size plus
/// the index inside the batch in flight; it is an estimate, not a
/// correctness input.
pub fn progress_summary(state: &CollectionJob) -> ProgressSummary {
    let estimated_processed =
        state.completed_batches.len() as u64 * state.batch_size as u64 + state.current_index as u64;
    let total_expected: u64 = state.total_counts.values().sum();

    let progress_percentage = if total_expected > 0 {
        let pct = (estimated_processed as f64 / total_expected as f64) * 100.0;
        (pct.min(100.0) * 100.0).round() / 100.0
    } else {
        0.0
    };

    ProgressSummary {
        estimated_processed,
        total_expected,
        progress_percentage,
        is_healing: state.is_healing(),
        is_resuming: state.is_resuming(),
        recursion_count: state.recursion_count,
    }
}
