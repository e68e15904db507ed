//! Error types for driver operations.

use thiserror::Error;

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors that can occur in driver operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// No document matched the given identifier.
    ///
    /// This is a sentinel: callers may compare against it to distinguish
    /// an absent document from a failing store.
    #[error("document not found")]
    NotFound,

    /// The underlying store failed.
    #[error("driver backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}

impl DriverError {
    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Returns true if this is the not-found sentinel.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
