//! Error types for inventory store operations
//!
//! Store errors are categorized so callers can tell a transient failure
//! (worth re-running later) from a persistent one (needs a data fix).

use thiserror::Error;

/// Categories of store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Referenced record does not exist
    NotFound,
    /// Uniqueness or referential constraint violated
    Constraint,
    /// Store unreachable or timed out (transient)
    Connectivity,
    /// Transaction could not be started, committed or rolled back
    Transaction,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this category is typically transient and worth re-running
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connectivity | Self::Transaction)
    }
}

/// Errors raised by an inventory store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("connectivity failure: {0}")]
    Connectivity(String),

    #[error("transaction failure: {0}")]
    Transaction(String),

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::Constraint(_) => ErrorCategory::Constraint,
            Self::Connectivity(_) => ErrorCategory::Connectivity,
            Self::Transaction(_) => ErrorCategory::Transaction,
            Self::Other(_) => ErrorCategory::Other,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.category().is_transient()
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
