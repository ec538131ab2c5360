// Central Error Type for the Engine

use thiserror::Error;

use crate::domain::Category;

/// Positional context attached to fatal errors so the caller can log and
/// alert with the exact place the run died.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FatalContext {
    pub category: Option<Category>,
    pub batch: u32,
    pub index: u32,
    pub processed: u64,
    pub skipped: u64,
    pub errors: u64,
}

impl std::fmt::Display for FatalContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "category={} batch={} index={} processed={} skipped={} errors={}",
            self.category.map(|c| c.as_str()).unwrap_or("-"),
            self.batch,
            self.index,
            self.processed,
            self.skipped,
            self.errors
        )
    }
}

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Metadata store error: {0}")]
    Metadata(String),

    #[error("Object store error: {0}")]
    Storage(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fatal error: {message} ({context})")]
    Fatal {
        message: String,
        context: FatalContext,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Fatal context when present (diagnostics surface for callers)
    pub fn fatal_context(&self) -> Option<&FatalContext> {
        match self {
            AppError::Fatal { context, .. } => Some(context),
            _ => None,
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
