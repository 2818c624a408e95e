//! Error types for tracksync
//!
//! One taxonomy for the whole reconciliation pipeline. Per-item failures
//! (transient catalog errors, parse failures) are downgraded by the
//! resolvers; batch-fatal failures (rate limit, authorization, cancellation)
//! propagate unchanged so the orchestrator can halt cleanly.

use std::time::Duration;
use thiserror::Error;

/// Common result type for tracksync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Error types across the reconciliation pipeline
#[derive(Debug, Error)]
pub enum SyncError {
    /// Rate limit exhausted on an external catalog. Fatal for the batch;
    /// retry policy belongs to the caller.
    #[error("Rate limit exceeded")]
    RateLimited {
        /// Back-off hint from the catalog, when it sent one
        retry_after: Option<Duration>,
    },

    /// Credentials rejected by an external catalog. Fatal for the batch;
    /// the caller must refresh credentials before retrying.
    #[error("Unauthorized by catalog")]
    Unauthorized,

    /// Reconciliation was cancelled via its cancellation token
    #[error("Reconciliation cancelled")]
    Cancelled,

    /// Transient catalog failure (network error, 5xx response)
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Response could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Whether this error invalidates the rest of the batch.
    ///
    /// Fatal errors are re-raised unchanged by the resolvers; everything
    /// else is downgraded to a per-item outcome.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::RateLimited { .. } | SyncError::Unauthorized | SyncError::Cancelled
        )
    }
}
