//! Database capability trait and its error type.

use async_trait::async_trait;
use thiserror::Error;

use crate::sql::{SqlRow, SqlValue};

/// Raw failures reported by a [`Database`] implementation.
///
/// These carry driver detail for logging. They are mapped to the API error
/// taxonomy before anything reaches a client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DbError {
    /// The statement matched no rows where at least one was required.
    #[error("no rows in result set")]
    NoRows,

    #[error("constraint violation{}: {message}", constraint_suffix(.constraint))]
    Constraint {
        constraint: Option<String>,
        message: String,
    },

    /// The store could not be reached or the pool could not hand out a connection.
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),

    /// A returned column could not be converted to the requested type.
    #[error("failed to scan column {column}: {reason}")]
    Scan { column: usize, reason: String },
}

impl DbError {
    pub fn query(message: impl Into<String>) -> Self {
        DbError::Query(message.into())
    }

    pub fn connection(message: impl Into<String>) -> Self {
        DbError::Connection(message.into())
    }

    pub fn scan(column: usize, reason: impl Into<String>) -> Self {
        DbError::Scan {
            column,
            reason: reason.into(),
        }
    }
}

fn constraint_suffix(constraint: &Option<String>) -> String {
    constraint
        .as_deref()
        .map(|name| format!(" on {}", name))
        .unwrap_or_default()
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// A relational store that runs parameterized SQL.
///
/// Implementations must be safe to share across request tasks.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run a statement that returns rows.
    async fn query(&self, statement: &str, params: &[SqlValue]) -> DbResult<Vec<SqlRow>>;

    /// Run a statement that returns no rows, yielding the affected row count.
    async fn execute(&self, statement: &str, params: &[SqlValue]) -> DbResult<u64>;

    /// Round-trip to the store to verify connectivity.
    async fn ping(&self) -> DbResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_display_with_and_without_name() {
        let named = DbError::Constraint {
            constraint: Some("albums_pkey".to_string()),
            message: "duplicate key".to_string(),
        };
        assert_eq!(named.to_string(), "constraint violation on albums_pkey: duplicate key");

        let anonymous = DbError::Constraint {
            constraint: None,
            message: "duplicate key".to_string(),
        };
        assert_eq!(anonymous.to_string(), "constraint violation: duplicate key");
    }

    #[test]
    fn test_scan_display() {
        assert_eq!(
            DbError::scan(3, "expected float").to_string(),
            "failed to scan column 3: expected float"
        );
    }
}
