// Application layer: classification, state management, orchestration, and
// monitoring over the domain model and ports.

pub mod classifier;
pub mod constants;
pub mod monitor;
pub mod orchestrator;
pub mod state_manager;

pub use classifier::{classify, Classification, ErrorCategory, Severity};
pub use monitor::{ItemOutcome, MetricsSnapshot, Monitor};
pub use orchestrator::{CategoryCounts, JobOrchestrator, RunOutcome, RunReport};
pub use state_manager::{NewJobInputs, ProgressSummary};
