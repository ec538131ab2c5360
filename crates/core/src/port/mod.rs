// Port Layer - Interfaces for external collaborators

pub mod checkpoint_store;
pub mod id_provider; // For deterministic testing
pub mod metadata_store;
pub mod object_store;
pub mod session_driver;
pub mod time_provider;

// Re-exports
pub use checkpoint_store::CheckpointStore;
pub use id_provider::IdProvider;
pub use metadata_store::MetadataStore;
pub use object_store::ObjectStore;
pub use session_driver::{CollectedPage, Evidence, SessionDriver, Visit, VisitStatus};
pub use time_provider::TimeProvider;
