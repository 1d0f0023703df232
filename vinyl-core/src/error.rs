//! Error types for core validation

use thiserror::Error;

/// Errors raised while building core values from untrusted input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Value for {field} must be between {min} and {max}, got {actual}")]
    OutOfRange {
        field: String,
        min: i64,
        max: i64,
        actual: i64,
    },
}

impl CoreError {
    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            CoreError::InvalidValue { field, .. } | CoreError::OutOfRange { field, .. } => field,
        }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
