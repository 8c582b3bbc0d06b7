//! Error types for Cultivar
//!
//! Provides a unified error type and the validation failures surfaced by every
//! public operation.

use thiserror::Error;

/// Result type alias using CultivarError
pub type Result<T> = std::result::Result<T, CultivarError>;

/// Unified error type for Cultivar operations
#[derive(Debug, Error)]
pub enum CultivarError {
    // Input validation; raised before any state is touched
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // Exclusive store lock could not be acquired in time
    #[error("Concurrency conflict: lock on {resource} not acquired after {waited_ms}ms")]
    ConcurrencyConflict { resource: String, waited_ms: u64 },

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CultivarError {
    /// Whether the caller may retry the same operation unchanged.
    ///
    /// The core never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CultivarError::ConcurrencyConflict { .. })
    }
}

/// Input validation errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Agent name must not be empty")]
    EmptyAgent,

    #[error("Category name must not be empty")]
    EmptyCategory,

    #[error("Category not registered: {0}")]
    UnknownCategory(String),

    #[error("Impact must be within [0, 1], got {0}")]
    ImpactOutOfRange(f64),

    #[error("top_n must be at least 1, got {0}")]
    InvalidTopN(usize),

    #[error("Learning item {id} has a non-finite base score")]
    InvalidBaseScore { id: String },
}

// Implement From for common external error types
impl From<serde_json::Error> for CultivarError {
    fn from(err: serde_json::Error) -> Self {
        CultivarError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for CultivarError {
    fn from(err: std::io::Error) -> Self {
        CultivarError::Storage(err.to_string())
    }
}

impl From<anyhow::Error> for CultivarError {
    fn from(err: anyhow::Error) -> Self {
        CultivarError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CultivarError::Validation(ValidationError::ImpactOutOfRange(1.5));
        assert!(err.to_string().contains("1.5"));
    }

    #[test]
    fn test_only_conflicts_are_retryable() {
        let conflict = CultivarError::ConcurrencyConflict {
            resource: "investments.json.lock".to_string(),
            waited_ms: 5000,
        };
        assert!(conflict.is_retryable());
        assert!(conflict.to_string().contains("5000ms"));

        let invalid = CultivarError::from(ValidationError::EmptyAgent);
        assert!(!invalid.is_retryable());
        assert!(!CultivarError::Storage("disk full".into()).is_retryable());
    }
}
