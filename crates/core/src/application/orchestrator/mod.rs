// Job Orchestrator - drives category-by-category, batch-by-batch,
// item-by-item processing with checkpointing and healing.
//
// One job runs strictly sequentially: the external platform enforces rate
// limits, so there is no parallel fan-out within a job. Control flow
// suspends only at I/O boundaries (collection, idempotency check, visit,
// checkpoint write, pacing delay).

mod report;

pub use report::{CategoryCounts, RunReport};

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::application::classifier::classify;
use crate::application::monitor::{ItemOutcome, Monitor};
use crate::application::state_manager::{self, BatchProgress, HealingParams};
use crate::config::EngineConfig;
use crate::domain::{
    split_into_batches, Category, CollectionJob, HealPhase, ItemId, MasterIndex, ProcessingState,
};
use crate::error::{AppError, FatalContext, Result};
use crate::port::{
    CheckpointStore, IdProvider, MetadataStore, ObjectStore, SessionDriver, TimeProvider,
};

/// Terminal outcome of a run.
///
/// Healing is an explicit return value, not an error: the caller persists
/// the carried state and triggers the actual restart.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunReport),
    Healing(CollectionJob),
}

/// Flow decision after one item
enum ItemFlow {
    Continue,
    Heal(String),
}

pub struct JobOrchestrator {
    driver: Arc<dyn SessionDriver>,
    metadata: Arc<dyn MetadataStore>,
    objects: Arc<dyn ObjectStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    monitor: Arc<Monitor>,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
    config: EngineConfig,
}

impl JobOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        driver: Arc<dyn SessionDriver>,
        metadata: Arc<dyn MetadataStore>,
        objects: Arc<dyn ObjectStore>,
        checkpoints: Arc<dyn CheckpointStore>,
        monitor: Arc<Monitor>,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            driver,
            metadata,
            objects,
            checkpoints,
            monitor,
            time_provider,
            id_provider,
            config,
        }
    }

    /// Run a job to its terminal state: a completed report, a healing
    /// signal carrying the exact resume position, or a fatal error with
    /// positional context.
    ///
    /// Validation failures are fatal immediately and never heal, so
    /// unfixable input cannot cause infinite healing loops.
    pub async fn run(&self, job: CollectionJob) -> Result<RunOutcome> {
        state_manager::validate_state(&job)?;

        if job.is_healing() && job.recursion_count > self.config.max_heal_recursion {
            return Err(AppError::Fatal {
                message: format!(
                    "healing recursion limit exceeded: {} > {}",
                    job.recursion_count, self.config.max_heal_recursion
                ),
                context: FatalContext {
                    category: job.current_category,
                    batch: job.current_batch,
                    index: job.current_index,
                    ..Default::default()
                },
            });
        }

        let job_id = job.id.clone();
        info!(
            job_id = %job_id,
            account_id = %job.account_id,
            resuming = %job.is_resuming(),
            healing = %job.is_healing(),
            recursion_count = %job.recursion_count,
            "Starting collection run"
        );
        self.monitor.start_job(
            &job_id,
            serde_json::json!({
                "account_id": job.account_id,
                "resuming": job.is_resuming(),
                "healing": job.is_healing(),
            }),
        );

        match self.run_categories(job).await {
            Ok(RunOutcome::Completed(report)) => {
                self.monitor.record_success(&job_id, &report);
                Ok(RunOutcome::Completed(report))
            }
            Ok(RunOutcome::Healing(healed)) => {
                self.monitor.record_healing(&job_id, healed.recursion_count);
                Ok(RunOutcome::Healing(healed))
            }
            Err(err) => {
                let classification = classify(&raw_message(&err));
                self.monitor
                    .record_failure(&job_id, &err.to_string(), &classification);
                Err(err)
            }
        }
    }

    async fn run_categories(&self, mut job: CollectionJob) -> Result<RunOutcome> {
        let (index_ref, mut index) = self.load_or_create_index(&mut job).await?;
        let mut report = RunReport::new(job.id.clone());

        // Resume lands on the category the run was interrupted in; earlier
        // categories were completed by previous runs.
        let resume_category = job.current_category;
        let start = resume_category.map(|c| c.order()).unwrap_or(0);

        for &category in &Category::ALL[start..] {
            let resuming_here = resume_category == Some(category);
            if !resuming_here {
                job.current_batch = 0;
                job.current_index = 0;
                job.completed_batches.clear();
            }
            job.current_category = Some(category);

            if index.is_category_complete(category) {
                debug!(category = %category, "Category already complete, skipping");
                continue;
            }

            if !index.category(category).list_complete {
                if let Some(healed) = self
                    .ensure_category_list(&job, &index_ref, &mut index, category)
                    .await?
                {
                    return Ok(RunOutcome::Healing(healed));
                }
                // refine the progress denominator with the actual count
                job.total_counts
                    .insert(category, index.category(category).total_items());
            }

            // durable completions take precedence over the carried payload
            let durable = index.category(category).completed_batches.clone();
            job.completed_batches.extend(durable);

            if let Some(healed) = self
                .process_category_batches(
                    &mut job,
                    &index_ref,
                    &mut index,
                    category,
                    resuming_here,
                    &mut report,
                )
                .await?
            {
                return Ok(RunOutcome::Healing(healed));
            }
        }

        index.processing = ProcessingState {
            current_category: job.current_category,
            current_batch: job.current_batch,
            current_index: job.current_index,
        };
        self.checkpoints
            .save_master_index(&index_ref, &index)
            .await?;

        info!(
            job_id = %job.id,
            processed = %report.total_processed(),
            skipped = %report.total_skipped(),
            errors = %report.total_errors(),
            "Collection run complete"
        );
        Ok(RunOutcome::Completed(report))
    }

    /// Load the master index named by the job, or create a fresh one with
    /// per-category placeholders seeded.
    async fn load_or_create_index(
        &self,
        job: &mut CollectionJob,
    ) -> Result<(String, MasterIndex)> {
        if let Some(reference) = job.master_index_ref.clone() {
            if let Some(index) = self.checkpoints.load_master_index(&reference).await? {
                info!(index_ref = %reference, "Resuming from existing master index");
                return Ok((reference, index));
            }
            warn!(index_ref = %reference, "Master index not found, creating fresh");
        }

        let reference = job
            .master_index_ref
            .clone()
            .unwrap_or_else(|| self.id_provider.generate_id());
        let index = MasterIndex::new(
            self.time_provider.now_millis(),
            job.batch_size,
            job.total_counts.clone(),
        );
        self.checkpoints
            .save_master_index(&reference, &index)
            .await?;
        job.master_index_ref = Some(reference.clone());
        info!(index_ref = %reference, batch_size = %job.batch_size, "Created master index");
        Ok((reference, index))
    }

    /// Collect a category's item list page by page, flushing full batch
    /// files as they fill.
    ///
    /// On a recoverable failure everything discovered so far is
    /// checkpointed before a list-creation healing state is returned, so a
    /// restart resumes collection at the failed page instead of starting
    /// over.
    async fn ensure_category_list(
        &self,
        job: &CollectionJob,
        index_ref: &str,
        index: &mut MasterIndex,
        category: Category,
    ) -> Result<Option<CollectionJob>> {
        let (mut page, expansion_attempt) = match &job.heal {
            HealPhase::ListCreation {
                category: healing_category,
                file_index,
                expansion_attempt,
                ..
            } if *healing_category == category => (*file_index, *expansion_attempt),
            _ => (0, 0),
        };

        info!(category = %category, start_page = %page, "Collecting category item list");

        let mut pending: Vec<ItemId> = Vec::new();
        loop {
            match self.driver.collect_page(category, page).await {
                Ok(collected) => {
                    let fetched = collected.items.len();
                    pending.extend(collected.items);

                    self.flush_pending(index, category, &mut pending, job.batch_size, false)
                        .await?;
                    self.checkpoints.save_master_index(index_ref, index).await?;

                    debug!(category = %category, page = %page, fetched = %fetched, "Collected listing page");

                    if !collected.has_more {
                        break;
                    }
                    page += 1;
                }
                Err(err) => {
                    let message = raw_message(&err);
                    let classification = classify(&message);
                    if !classification.is_recoverable {
                        return Err(AppError::Fatal {
                            message,
                            context: FatalContext {
                                category: Some(category),
                                ..Default::default()
                            },
                        });
                    }

                    self.flush_pending(index, category, &mut pending, job.batch_size, true)
                        .await?;
                    index.processing = ProcessingState {
                        current_category: Some(category),
                        current_batch: 0,
                        current_index: 0,
                    };
                    self.checkpoints.save_master_index(index_ref, index).await?;

                    warn!(
                        category = %category,
                        page = %page,
                        error = %message,
                        "List collection interrupted, requesting healing"
                    );
                    return Ok(Some(state_manager::build_list_creation_healing_state(
                        job,
                        category,
                        expansion_attempt + 1,
                        page,
                        message,
                    )));
                }
            }
        }

        self.flush_pending(index, category, &mut pending, job.batch_size, true)
            .await?;
        index.category_mut(category).list_complete = true;
        self.checkpoints.save_master_index(index_ref, index).await?;

        info!(
            category = %category,
            batches = %index.category(category).batch_refs.len(),
            items = %index.category(category).total_items(),
            "Category item list complete"
        );
        Ok(None)
    }

    /// Persist accumulated list items as batch files. With
    /// `include_partial` false only full batches are flushed; the remainder
    /// stays pending for the next page.
    async fn flush_pending(
        &self,
        index: &mut MasterIndex,
        category: Category,
        pending: &mut Vec<ItemId>,
        batch_size: u32,
        include_partial: bool,
    ) -> Result<()> {
        let take = if include_partial {
            pending.len()
        } else {
            (pending.len() / batch_size as usize) * batch_size as usize
        };
        if take == 0 {
            return Ok(());
        }
        let drained: Vec<ItemId> = pending.drain(..take).collect();
        for chunk in split_into_batches(&drained, batch_size) {
            self.persist_batch(index, category, &chunk).await?;
        }
        Ok(())
    }

    async fn persist_batch(
        &self,
        index: &mut MasterIndex,
        category: Category,
        items: &[ItemId],
    ) -> Result<()> {
        let batch_number = index.category(category).next_batch_number();
        let reference = self
            .checkpoints
            .save_batch_file(category, batch_number, items)
            .await?;
        index.push_batch_ref(category, batch_number, items.len() as u32, reference);
        Ok(())
    }

    /// Process a category's batches in ascending numeric order, items in
    /// list order, honoring completed batches and the resume position.
    async fn process_category_batches(
        &self,
        job: &mut CollectionJob,
        index_ref: &str,
        index: &mut MasterIndex,
        category: Category,
        resuming_here: bool,
        report: &mut RunReport,
    ) -> Result<Option<CollectionJob>> {
        let refs = index.category(category).batch_refs.clone();
        let total_batches = refs.len();
        let start_batch = if resuming_here { job.current_batch } else { 0 };
        let start_index = if resuming_here { job.current_index } else { 0 };

        for batch_ref in refs {
            let batch_number = batch_ref.batch_number;
            if job.completed_batches.contains(&batch_number) {
                continue;
            }
            // positions before the recorded resume point are already done
            if batch_number < start_batch {
                continue;
            }

            let batch = self.checkpoints.load_batch_file(&batch_ref.reference).await?;
            let first = if resuming_here && batch_number == start_batch {
                start_index as usize
            } else {
                0
            };

            info!(
                category = %category,
                batch = %batch_number,
                first_index = %first,
                items = %batch.items.len(),
                "Processing batch"
            );

            for (item_index, item) in batch.items.iter().enumerate().skip(first) {
                job.current_batch = batch_number;
                job.current_index = item_index as u32;

                match self.process_item(job, category, item, report).await? {
                    ItemFlow::Continue => {}
                    ItemFlow::Heal(message) => {
                        let healed = state_manager::build_healing_state(
                            job,
                            HealingParams {
                                phase: Some("BATCH_PROCESSING".to_string()),
                                reason: Some(message.clone()),
                                current_category: Some(category),
                                current_batch: Some(batch_number),
                                current_index: Some(item_index as u32),
                                completed_batches: Some(job.completed_batches.clone()),
                                master_index_ref: job.master_index_ref.clone(),
                            },
                        );
                        index.processing = ProcessingState {
                            current_category: Some(category),
                            current_batch: batch_number,
                            current_index: item_index as u32,
                        };
                        self.checkpoints.save_master_index(index_ref, index).await?;

                        warn!(
                            category = %category,
                            batch = %batch_number,
                            index = %item_index,
                            reason = %message,
                            "Job-scoped failure, requesting healing"
                        );
                        return Ok(Some(healed));
                    }
                }
            }

            // Batch done: the index write is a synchronization point, it
            // must land before pacing starts the next batch.
            index.mark_batch_completed(category, batch_number);
            index.processing = ProcessingState {
                current_category: Some(category),
                current_batch: batch_number + 1,
                current_index: 0,
            };
            *job = state_manager::update_batch_progress(
                job,
                BatchProgress {
                    current_category: Some(category),
                    current_batch: Some(batch_number + 1),
                    current_index: Some(0),
                    completed_batch: Some(batch_number),
                    master_index_ref: None,
                },
            );
            self.checkpoints.save_master_index(index_ref, index).await?;
            debug!(category = %category, batch = %batch_number, "Batch checkpointed");

            if index.category(category).completed_batches.len() < total_batches {
                self.pace().await;
            }
        }
        Ok(None)
    }

    /// Process one item: idempotency check, visit, evidence upload, status
    /// upsert. Item-scoped failures tally and continue; job-scoped
    /// recoverable failures bubble up as a heal request.
    async fn process_item(
        &self,
        job: &CollectionJob,
        category: Category,
        item: &ItemId,
        report: &mut RunReport,
    ) -> Result<ItemFlow> {
        match self.metadata.exists(item).await {
            Ok(true) => {
                report.counts_mut(category).skipped += 1;
                self.monitor.record_item(&job.id, item, ItemOutcome::Skipped);
                return Ok(ItemFlow::Continue);
            }
            Ok(false) => {}
            Err(err) => return self.route_job_scoped(job, category, err, report),
        }

        let visit = match self.driver.visit_item(item).await {
            Ok(visit) => visit,
            Err(err) => {
                let message = raw_message(&err);
                let classification = classify(&message);
                if classification.is_item_scoped {
                    report.counts_mut(category).errors += 1;
                    self.monitor.record_item(&job.id, item, ItemOutcome::Error);
                    debug!(item = %item, error = %message, "Item-scoped failure, skipping item");
                    return Ok(ItemFlow::Continue);
                }
                return self.route_job_scoped(job, category, err, report);
            }
        };

        if let Some(evidence) = &visit.evidence {
            if let Err(err) = self.objects.upload(&evidence.key, &evidence.bytes).await {
                return self.route_job_scoped(job, category, err, report);
            }
        }

        let extra = serde_json::json!({
            "account_id": job.account_id,
            "category": category.as_str(),
            "visited_at": self.time_provider.now_millis(),
        });
        if let Err(err) = self.metadata.upsert_status(item, visit.status, extra).await {
            return self.route_job_scoped(job, category, err, report);
        }

        report.counts_mut(category).processed += 1;
        self.monitor
            .record_item(&job.id, item, ItemOutcome::Processed);
        Ok(ItemFlow::Continue)
    }

    /// Route a job-scoped failure: recoverable becomes a heal request,
    /// anything else is fatal with full positional context.
    fn route_job_scoped(
        &self,
        job: &CollectionJob,
        category: Category,
        err: AppError,
        report: &RunReport,
    ) -> Result<ItemFlow> {
        let message = raw_message(&err);
        let classification = classify(&message);
        if classification.is_recoverable {
            Ok(ItemFlow::Heal(message))
        } else {
            Err(AppError::Fatal {
                message,
                context: FatalContext {
                    category: Some(category),
                    batch: job.current_batch,
                    index: job.current_index,
                    processed: report.total_processed(),
                    skipped: report.total_skipped(),
                    errors: report.total_errors(),
                },
            })
        }
    }

    /// Inter-batch pacing: a uniform random delay against the external
    /// system's abuse detection. Not a failure backoff.
    async fn pace(&self) {
        let (min, max) = (self.config.pacing_min_ms, self.config.pacing_max_ms);
        if max == 0 {
            return;
        }
        let delay_ms = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        };
        debug!(delay_ms = %delay_ms, "Pacing before next batch");
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}

/// Classification input: the raw collaborator message, without the error
/// enum's display prefix ("Driver error: ..." must not classify as an
/// automation failure when the underlying message says "rate limit").
fn raw_message(err: &AppError) -> String {
    match err {
        AppError::Driver(message)
        | AppError::Metadata(message)
        | AppError::Storage(message)
        | AppError::Checkpoint(message)
        | AppError::Internal(message) => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::monitor::Monitor;
    use crate::port::checkpoint_store::mocks::InMemoryCheckpointStore;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::metadata_store::mocks::InMemoryMetadataStore;
    use crate::port::object_store::mocks::InMemoryObjectStore;
    use crate::port::session_driver::mocks::ScriptedDriver;
    use crate::port::time_provider::mocks::SteppingTimeProvider;

    struct Harness {
        driver: Arc<ScriptedDriver>,
        metadata: Arc<InMemoryMetadataStore>,
        checkpoints: Arc<InMemoryCheckpointStore>,
        monitor: Arc<Monitor>,
        orchestrator: JobOrchestrator,
    }

    fn harness() -> Harness {
        let driver = Arc::new(ScriptedDriver::new());
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let checkpoints = Arc::new(InMemoryCheckpointStore::new());
        let time_provider = Arc::new(SteppingTimeProvider::new(1_000, 10));
        let monitor = Arc::new(Monitor::new(time_provider.clone()));

        let orchestrator = JobOrchestrator::new(
            driver.clone(),
            metadata.clone(),
            Arc::new(InMemoryObjectStore::new()),
            checkpoints.clone(),
            monitor.clone(),
            time_provider,
            Arc::new(SequentialIdProvider::new()),
            EngineConfig::without_pacing(),
        );

        Harness {
            driver,
            metadata,
            checkpoints,
            monitor,
            orchestrator,
        }
    }

    fn items(prefix: &str, n: usize) -> Vec<ItemId> {
        (0..n).map(|i| format!("{}-{}", prefix, i)).collect()
    }

    fn small_job() -> CollectionJob {
        let mut job = CollectionJob::new_test("acct-1");
        job.batch_size = 10;
        job
    }

    #[tokio::test]
    async fn test_fresh_run_processes_all_categories() {
        let h = harness();
        h.driver.set_items(Category::Followers, items("fw", 25), 10);
        h.driver.set_items(Category::Following, items("fg", 7), 10);

        let outcome = h.orchestrator.run(small_job()).await.unwrap();
        let report = match outcome {
            RunOutcome::Completed(report) => report,
            other => panic!("expected completion, got {:?}", other),
        };

        assert_eq!(report.total_processed(), 32);
        assert_eq!(report.total_skipped(), 0);
        assert_eq!(report.total_errors(), 0);
        assert_eq!(h.driver.visited().len(), 32);
        // 3 batches for followers (10/10/5), 1 for following, 0 suggested
        assert_eq!(h.checkpoints.batch_file_count(), 4);
    }

    #[tokio::test]
    async fn test_idempotent_items_are_skipped_not_visited() {
        let h = harness();
        h.driver.set_items(Category::Followers, items("fw", 5), 10);
        h.metadata.seed(["fw-1".to_string(), "fw-3".to_string()]);

        let outcome = h.orchestrator.run(small_job()).await.unwrap();
        let report = match outcome {
            RunOutcome::Completed(report) => report,
            other => panic!("expected completion, got {:?}", other),
        };

        assert_eq!(report.total_processed(), 3);
        assert_eq!(report.total_skipped(), 2);
        let visited = h.driver.visited();
        assert!(!visited.contains(&"fw-1".to_string()));
        assert!(!visited.contains(&"fw-3".to_string()));
    }

    #[tokio::test]
    async fn test_item_scoped_failure_skips_only_that_item() {
        let h = harness();
        h.driver.set_items(Category::Followers, items("fw", 5), 10);
        h.driver.fail_visit_once("fw-2", "profile not found");

        let outcome = h.orchestrator.run(small_job()).await.unwrap();
        let report = match outcome {
            RunOutcome::Completed(report) => report,
            other => panic!("expected completion, got {:?}", other),
        };

        assert_eq!(report.total_processed(), 4);
        assert_eq!(report.total_errors(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_returns_healing_with_exact_position() {
        let h = harness();
        h.driver.set_items(Category::Followers, items("fw", 25), 10);
        h.driver.fail_visit_once("fw-13", "rate limit exceeded");

        let outcome = h.orchestrator.run(small_job()).await.unwrap();
        let healed = match outcome {
            RunOutcome::Healing(healed) => healed,
            other => panic!("expected healing, got {:?}", other),
        };

        assert_eq!(healed.recursion_count, 1);
        assert_eq!(healed.current_category, Some(Category::Followers));
        assert_eq!(healed.current_batch, 1);
        assert_eq!(healed.current_index, 3); // fw-13 is item 3 of batch 1
        assert!(healed.completed_batches.contains(&0));
        assert_eq!(healed.heal.reason(), Some("rate limit exceeded"));

        // exact position also mirrored into the durable index
        let index_ref = healed.master_index_ref.clone().unwrap();
        let index = h.checkpoints.index(&index_ref).unwrap();
        assert_eq!(index.processing.current_batch, 1);
        assert_eq!(index.processing.current_index, 3);
    }

    #[tokio::test]
    async fn test_fatal_error_carries_positional_context() {
        let h = harness();
        h.driver.set_items(Category::Followers, items("fw", 5), 10);
        h.driver.fail_visit_once("fw-2", "permission denied");

        let err = h.orchestrator.run(small_job()).await.unwrap_err();
        let context = err.fatal_context().expect("fatal context");
        assert_eq!(context.category, Some(Category::Followers));
        assert_eq!(context.batch, 0);
        assert_eq!(context.index, 2);
        assert_eq!(context.processed, 2);
    }

    #[tokio::test]
    async fn test_invalid_state_never_heals() {
        let h = harness();
        let mut job = small_job();
        job.batch_size = 0;

        let err = h.orchestrator.run(job).await.unwrap_err();
        assert!(matches!(err, AppError::Domain(_)));
    }

    #[tokio::test]
    async fn test_healing_recursion_cap_is_fatal() {
        let h = harness();
        let mut job = small_job();
        job.recursion_count = 11;
        job.heal = HealPhase::Job {
            phase: "BATCH_PROCESSING".to_string(),
            reason: "timeout".to_string(),
        };

        let err = h.orchestrator.run(job).await.unwrap_err();
        assert!(matches!(err, AppError::Fatal { .. }));
    }

    #[tokio::test]
    async fn test_list_creation_failure_checkpoints_partial_progress() {
        let h = harness();
        // 3 listing pages of 10; page 2 fails on first attempt
        h.driver.set_items(Category::Followers, items("fw", 30), 10);
        h.driver
            .fail_collect_once(Category::Followers, 2, "connection reset");

        let outcome = h.orchestrator.run(small_job()).await.unwrap();
        let healed = match outcome {
            RunOutcome::Healing(healed) => healed,
            other => panic!("expected healing, got {:?}", other),
        };

        match &healed.heal {
            HealPhase::ListCreation {
                category,
                expansion_attempt,
                file_index,
                ..
            } => {
                assert_eq!(*category, Category::Followers);
                assert_eq!(*expansion_attempt, 1);
                assert_eq!(*file_index, 2);
            }
            other => panic!("expected list-creation heal, got {:?}", other),
        }

        // pages 0 and 1 were checkpointed as batch files before healing
        assert_eq!(h.checkpoints.batch_file_count(), 2);
        let index_ref = healed.master_index_ref.clone().unwrap();
        let index = h.checkpoints.index(&index_ref).unwrap();
        assert!(!index.category(Category::Followers).list_complete);
        assert_eq!(index.category(Category::Followers).batch_refs.len(), 2);
    }

    #[tokio::test]
    async fn test_evidence_uploaded_to_object_store() {
        let driver = Arc::new(ScriptedDriver::with_evidence());
        driver.set_items(Category::Followers, items("fw", 3), 10);
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let objects = Arc::new(InMemoryObjectStore::new());
        let checkpoints = Arc::new(InMemoryCheckpointStore::new());
        let time_provider = Arc::new(SteppingTimeProvider::new(1_000, 10));
        let monitor = Arc::new(Monitor::new(time_provider.clone()));
        let orchestrator = JobOrchestrator::new(
            driver.clone(),
            metadata,
            objects.clone(),
            checkpoints,
            monitor,
            time_provider,
            Arc::new(SequentialIdProvider::new()),
            EngineConfig::without_pacing(),
        );

        orchestrator.run(small_job()).await.unwrap();
        assert_eq!(objects.uploaded_keys().len(), 3);
    }

    #[tokio::test]
    async fn test_upsert_failure_routes_job_scoped_healing() {
        let h = harness();
        h.driver.set_items(Category::Followers, items("fw", 5), 10);
        h.metadata.fail_next_upsert("timeout writing record");

        let outcome = h.orchestrator.run(small_job()).await.unwrap();
        let healed = match outcome {
            RunOutcome::Healing(healed) => healed,
            other => panic!("expected healing, got {:?}", other),
        };

        assert_eq!(healed.current_batch, 0);
        assert_eq!(healed.current_index, 0);
        assert_eq!(healed.heal.reason(), Some("timeout writing record"));
        // nothing was recorded, so the resume retries the item
        assert!(h.metadata.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_evidence_upload_failure_is_fatal_storage() {
        let driver = Arc::new(ScriptedDriver::with_evidence());
        driver.set_items(Category::Followers, items("fw", 3), 10);
        let objects = Arc::new(InMemoryObjectStore::new());
        objects.fail_next_upload("upload failed: bucket unavailable");
        let time_provider = Arc::new(SteppingTimeProvider::new(1_000, 10));
        let monitor = Arc::new(Monitor::new(time_provider.clone()));
        let orchestrator = JobOrchestrator::new(
            driver,
            Arc::new(InMemoryMetadataStore::new()),
            objects,
            Arc::new(InMemoryCheckpointStore::new()),
            monitor.clone(),
            time_provider,
            Arc::new(SequentialIdProvider::new()),
            EngineConfig::without_pacing(),
        );

        let err = orchestrator.run(small_job()).await.unwrap_err();
        let context = err.fatal_context().expect("fatal context");
        assert_eq!(context.category, Some(Category::Followers));
        assert_eq!(context.index, 0);
        assert_eq!(monitor.metrics().unrecoverable_failures, 1);
    }

    #[tokio::test]
    async fn test_monitor_observes_run_outcomes() {
        let h = harness();
        h.driver.set_items(Category::Followers, items("fw", 5), 10);
        h.orchestrator.run(small_job()).await.unwrap();

        let snapshot = h.monitor.metrics();
        assert_eq!(snapshot.jobs_succeeded, 1);
        assert_eq!(snapshot.active_jobs, 0);
        assert_eq!(snapshot.items_by_status.get("PROCESSED"), Some(&5));
    }
}
