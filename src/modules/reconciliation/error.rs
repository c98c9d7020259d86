use thiserror::Error;

use crate::domain::DomainError;

/// Fatal failures of a scan or a planning pass.
///
/// Individual write failures during execution are not errors at this level;
/// they are tallied in the run outcome.
#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    /// A bulk listing call failed. No partial scan is produced.
    #[error("Failed to read {collection}: {source}")]
    ReadFailure {
        collection: &'static str,
        #[source]
        source: DomainError,
    },

    /// The code allocator could not probe the store for a free code.
    #[error("Failed to probe book codes: {0}")]
    CodeProbe(#[source] DomainError),

    /// Every candidate code for this base, random ones included, is taken.
    #[error("No free book code for base '{0}'")]
    CodeSpaceExhausted(String),

    #[error("Book {0} not found")]
    BookNotFound(i32),

    /// The in-memory planning state contradicts itself.
    #[error("Invalid repair plan: {0}")]
    InvalidPlan(String),
}

impl ReconcileError {
    pub(crate) fn read(collection: &'static str) -> impl FnOnce(DomainError) -> Self {
        move |source| ReconcileError::ReadFailure { collection, source }
    }
}
