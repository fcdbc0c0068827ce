//! Store error types.

use std::time::Duration;
use thiserror::Error;

/// Errors from the versioned store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored document didn't match the expected shape
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation timed out
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    /// Get a sanitized error message safe for clients.
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::Database(_) | Self::Serialization(_) => "A storage error occurred",
            Self::Timeout(_) => "The store took too long to answer",
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
