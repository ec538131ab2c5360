// Monitor - per-process aggregator of job outcomes, item tallies, and
// error-pattern frequencies. Constructed once and injected by reference;
// never a module-level global, so tests get isolated instances.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::application::classifier::Classification;
use crate::application::constants::TOP_ERROR_PATTERNS;
use crate::application::orchestrator::RunReport;
use crate::domain::JobId;
use crate::port::TimeProvider;

/// Item-level outcome recorded per processed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemOutcome {
    Processed,
    Skipped,
    Error,
}

impl ItemOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemOutcome::Processed => "PROCESSED",
            ItemOutcome::Skipped => "SKIPPED",
            ItemOutcome::Error => "ERROR",
        }
    }
}

/// One (error_type, category) frequency entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorFrequency {
    pub error_type: String,
    pub category: String,
    pub count: u64,
}

/// Point-in-time view of everything the monitor has aggregated
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub active_jobs: usize,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub success_rate: f64,
    pub failure_rate: f64,
    pub avg_duration_ms: f64,
    pub healing_events: u64,
    pub avg_heal_recursion: f64,
    pub recoverable_failures: u64,
    pub unrecoverable_failures: u64,
    pub items_by_status: BTreeMap<String, u64>,
    /// Most frequent (error_type, category) pairs, highest first
    pub top_errors: Vec<ErrorFrequency>,
}

struct ActiveJob {
    started_at_ms: i64,
    #[allow(dead_code)]
    context: serde_json::Value,
}

#[derive(Default)]
struct MonitorState {
    active: HashMap<JobId, ActiveJob>,
    jobs_succeeded: u64,
    jobs_failed: u64,
    avg_duration_ms: f64,
    healing_events: u64,
    avg_heal_recursion: f64,
    recoverable_failures: u64,
    unrecoverable_failures: u64,
    items_by_status: BTreeMap<String, u64>,
    error_frequencies: BTreeMap<(String, String), u64>,
}

/// Stateful aggregator across concurrently in-flight jobs.
/// All methods take `&self`; interior state is guarded by a mutex.
pub struct Monitor {
    time_provider: Arc<dyn TimeProvider>,
    state: Mutex<MonitorState>,
}

impl Monitor {
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            time_provider,
            state: Mutex::new(MonitorState::default()),
        }
    }

    /// Register a job as in flight
    pub fn start_job(&self, job_id: &str, context: serde_json::Value) {
        let now = self.time_provider.now_millis();
        let mut state = self.state.lock().unwrap();
        state.active.insert(
            job_id.to_string(),
            ActiveJob {
                started_at_ms: now,
                context,
            },
        );
    }

    /// Record a successful run: updates the rolling duration average and
    /// removes the tracking record
    pub fn record_success(&self, job_id: &str, report: &RunReport) {
        let now = self.time_provider.now_millis();
        let mut state = self.state.lock().unwrap();

        let duration_ms = match state.active.remove(job_id) {
            Some(active) => (now - active.started_at_ms) as f64,
            None => {
                warn!(job_id = %job_id, "Success recorded for untracked job");
                0.0
            }
        };

        state.jobs_succeeded += 1;
        let n = state.jobs_succeeded as f64;
        state.avg_duration_ms = (state.avg_duration_ms * (n - 1.0) + duration_ms) / n;

        info!(
            job_id = %job_id,
            duration_ms = %duration_ms,
            processed = %report.total_processed(),
            skipped = %report.total_skipped(),
            errors = %report.total_errors(),
            "Job completed"
        );
    }

    /// Record a failed run with its classification
    pub fn record_failure(&self, job_id: &str, message: &str, classification: &Classification) {
        let mut state = self.state.lock().unwrap();
        state.active.remove(job_id);

        state.jobs_failed += 1;
        if classification.is_recoverable {
            state.recoverable_failures += 1;
        } else {
            state.unrecoverable_failures += 1;
        }
        *state
            .error_frequencies
            .entry((
                classification.error_type.to_string(),
                classification.category.as_str().to_string(),
            ))
            .or_insert(0) += 1;

        warn!(
            job_id = %job_id,
            error_type = %classification.error_type,
            category = %classification.category,
            recoverable = %classification.is_recoverable,
            message = %message,
            "Job failed"
        );
    }

    /// Record a healing restart; updates the rolling average recursion
    /// depth across all healing events
    pub fn record_healing(&self, job_id: &str, recursion_count: u32) {
        let mut state = self.state.lock().unwrap();
        state.active.remove(job_id);

        state.healing_events += 1;
        let n = state.healing_events as f64;
        state.avg_heal_recursion =
            (state.avg_heal_recursion * (n - 1.0) + recursion_count as f64) / n;

        info!(
            job_id = %job_id,
            recursion_count = %recursion_count,
            "Job healing requested"
        );
    }

    /// Tally one item outcome
    pub fn record_item(&self, _job_id: &str, _item_id: &str, outcome: ItemOutcome) {
        let mut state = self.state.lock().unwrap();
        *state
            .items_by_status
            .entry(outcome.as_str().to_string())
            .or_insert(0) += 1;
    }

    /// Snapshot the aggregated metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        let state = self.state.lock().unwrap();
        let finished = state.jobs_succeeded + state.jobs_failed;
        let (success_rate, failure_rate) = if finished > 0 {
            (
                state.jobs_succeeded as f64 / finished as f64,
                state.jobs_failed as f64 / finished as f64,
            )
        } else {
            (0.0, 0.0)
        };

        let mut top_errors: Vec<ErrorFrequency> = state
            .error_frequencies
            .iter()
            .map(|((error_type, category), count)| ErrorFrequency {
                error_type: error_type.clone(),
                category: category.clone(),
                count: *count,
            })
            .collect();
        // highest count first, name as tie-break for stable output
        top_errors.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.error_type.cmp(&b.error_type))
        });
        top_errors.truncate(TOP_ERROR_PATTERNS);

        MetricsSnapshot {
            active_jobs: state.active.len(),
            jobs_succeeded: state.jobs_succeeded,
            jobs_failed: state.jobs_failed,
            success_rate,
            failure_rate,
            avg_duration_ms: state.avg_duration_ms,
            healing_events: state.healing_events,
            avg_heal_recursion: state.avg_heal_recursion,
            recoverable_failures: state.recoverable_failures,
            unrecoverable_failures: state.unrecoverable_failures,
            items_by_status: state.items_by_status.clone(),
            top_errors,
        }
    }

    /// Emit one structured summary line.
    /// Scheduling is external: the embedding process calls this on a timer
    /// (see `MONITOR_SUMMARY_INTERVAL`).
    pub fn log_summary(&self) {
        let snapshot = self.metrics();
        info!(
            active_jobs = %snapshot.active_jobs,
            jobs_succeeded = %snapshot.jobs_succeeded,
            jobs_failed = %snapshot.jobs_failed,
            success_rate = %snapshot.success_rate,
            avg_duration_ms = %snapshot.avg_duration_ms,
            healing_events = %snapshot.healing_events,
            avg_heal_recursion = %snapshot.avg_heal_recursion,
            "Monitor summary"
        );
    }
}
