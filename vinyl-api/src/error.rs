//! Error Types for the Vinyl API
//!
//! This module defines error handling for the API layer, including:
//! - ErrorCode enum, the fixed taxonomy clients branch on
//! - ApiError struct carrying a code, a client-safe message and optional details
//! - Mappers from raw store failures into the taxonomy
//! - Response attachment consumed by the error responder middleware
//!
//! Handlers never render errors themselves. Returning an error attaches it to
//! the response and `middleware::error_responder` writes the JSON body.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use vinyl_core::CoreError;
use vinyl_storage::{CacheError, DbError};

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each code maps to one HTTP status and a default message. The serialized
/// form is the stable identifier clients match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Empty result set or cache miss
    NotFound,

    /// Any database failure without a more specific code
    DatabaseError,

    /// Any cache failure without a more specific code
    CacheError,

    /// Unique, foreign-key, not-null or check violation
    ConstraintViolation,

    /// Store unreachable or pool exhausted
    ConnectionError,

    /// Query parameters failed validation
    InvalidInput,

    /// The request exceeded the configured deadline
    Timeout,

    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorCode::ConstraintViolation => StatusCode::CONFLICT,
            ErrorCode::ConnectionError => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::DatabaseError | ErrorCode::CacheError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "resource not found",
            ErrorCode::DatabaseError => "data retrieval error",
            ErrorCode::CacheError => "cache retrieval error",
            ErrorCode::ConstraintViolation => "constraint violation",
            ErrorCode::ConnectionError => "connection error",
            ErrorCode::InvalidInput => "invalid input",
            ErrorCode::Timeout => "request timed out",
            ErrorCode::InternalError => "internal server error",
        }
    }

    /// The serialized identifier, e.g. `not_found`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "not_found",
            ErrorCode::DatabaseError => "database_error",
            ErrorCode::CacheError => "cache_error",
            ErrorCode::ConstraintViolation => "constraint_violation",
            ErrorCode::ConnectionError => "connection_error",
            ErrorCode::InvalidInput => "invalid_input",
            ErrorCode::Timeout => "timeout",
            ErrorCode::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error returned by every fallible API operation.
///
/// `message` is always safe to show a client. Driver text is logged where the
/// error is mapped and never stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (offending field, accepted range, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors
    // ========================================================================

    pub fn not_found() -> Self {
        Self::from_code(ErrorCode::NotFound)
    }

    pub fn database_error() -> Self {
        Self::from_code(ErrorCode::DatabaseError)
    }

    pub fn cache_error() -> Self {
        Self::from_code(ErrorCode::CacheError)
    }

    pub fn constraint_violation() -> Self {
        Self::from_code(ErrorCode::ConstraintViolation)
    }

    pub fn connection_error() -> Self {
        Self::from_code(ErrorCode::ConnectionError)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn timeout() -> Self {
        Self::from_code(ErrorCode::Timeout)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl StdError for ApiError {}

// ============================================================================
// STORE ERROR MAPPERS
// ============================================================================

/// Map a raw database failure into the taxonomy.
///
/// Total over [`DbError`]. The driver text only reaches the log.
pub fn map_db_error(err: &DbError) -> ApiError {
    match err {
        DbError::NoRows => ApiError::not_found(),
        DbError::Constraint { .. } => {
            tracing::warn!(error = %err, "Database constraint violation");
            ApiError::constraint_violation()
        }
        DbError::Connection(_) => {
            tracing::error!(error = %err, "Database connection failure");
            ApiError::connection_error()
        }
        DbError::Query(_) | DbError::Scan { .. } => {
            tracing::error!(error = %err, "Database operation failed");
            ApiError::database_error()
        }
    }
}

/// Map a raw cache failure into the taxonomy.
pub fn map_cache_error(err: &CacheError) -> ApiError {
    match err {
        CacheError::Miss { .. } => ApiError::not_found(),
        CacheError::Connection(_) => {
            tracing::warn!(error = %err, "Cache connection failure");
            ApiError::connection_error()
        }
        CacheError::Backend(_) => {
            tracing::warn!(error = %err, "Cache operation failed");
            ApiError::cache_error()
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        map_db_error(&err)
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        map_cache_error(&err)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let details = match &err {
            CoreError::OutOfRange { field, min, max, .. } => serde_json::json!({
                "field": field,
                "min": min,
                "max": max,
            }),
            CoreError::InvalidValue { field, .. } => serde_json::json!({ "field": field }),
        };
        ApiError::invalid_input(err.to_string()).with_details(details)
    }
}

// ============================================================================
// RESPONSE ATTACHMENT
// ============================================================================

/// An error attached to a response for the error responder to render.
///
/// Anything that is not an [`ApiError`] is rendered as a generic 500.
#[derive(Debug, Clone)]
pub struct AttachedError(pub Arc<dyn StdError + Send + Sync>);

impl AttachedError {
    /// The attached error if it belongs to the taxonomy.
    pub fn api_error(&self) -> Option<&ApiError> {
        self.0.downcast_ref::<ApiError>()
    }
}

/// Handler error that is outside the taxonomy.
///
/// Converts from any error type. The responder renders it as
/// `{"error":"Internal Server Error"}` and logs the source.
#[derive(Debug, Clone)]
pub struct Unhandled(pub Arc<dyn StdError + Send + Sync>);

impl<E> From<E> for Unhandled
where
    E: StdError + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Unhandled(Arc::new(err))
    }
}

impl Unhandled {
    pub fn from_boxed(err: Box<dyn StdError + Send + Sync>) -> Self {
        Unhandled(Arc::from(err))
    }
}

/// The status is set here so the response is meaningful even without the
/// responder; the body is left empty for the responder to fill.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = self.status_code().into_response();
        response
            .extensions_mut()
            .insert(AttachedError(Arc::new(self)));
        response
    }
}

impl IntoResponse for Unhandled {
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response.extensions_mut().insert(AttachedError(self.0));
        response
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
