// Domain Layer - Job state, categories, checkpoint schema

pub mod category;
pub mod checkpoint;
pub mod error;
pub mod job;

// Re-exports
pub use category::Category;
pub use checkpoint::{
    split_into_batches, BatchFile, BatchRef, CategoryIndex, MasterIndex, ProcessingState,
};
pub use error::DomainError;
pub use job::{CollectionJob, CredentialsRef, HealPhase, ItemId, JobId};
