//! Error kinds surfaced by the catalog and the progress engine.

use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by catalog loading and progress engine operations.
///
/// Every variant is reported to the immediate caller; none of them is
/// transient, so nothing here is retried.
#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("step catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("step index {index} is out of range (valid: 0..={step_count})")]
    IndexOutOfRange { index: usize, step_count: usize },

    #[error("unknown checkpoint '{checkpoint_id}' in step '{step_id}'")]
    UnknownCheckpoint {
        step_id: String,
        checkpoint_id: String,
    },

    #[error("failed to persist progress: {0}")]
    Persistence(#[from] StoreError),
}

impl ProgressError {
    /// Build a `CatalogUnavailable` from anything displayable
    pub fn catalog_unavailable(reason: impl std::fmt::Display) -> Self {
        ProgressError::CatalogUnavailable(reason.to_string())
    }

    /// Returns true if this error must stop initialization
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProgressError::CatalogUnavailable(_))
    }
}
