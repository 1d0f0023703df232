//! Centralized error responder.
//!
//! Handlers and inner layers attach errors to the response (see
//! [`crate::error::AttachedError`]). This middleware renders them:
//! - a taxonomy [`ApiError`] becomes `{"error":{"code","message"[,"details"]}}`
//!   with its declared status
//! - anything else becomes 500 `{"error":"Internal Server Error"}`
//!
//! Responses without an attached error pass through unchanged.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    BoxError, Json,
};
use serde::Serialize;

use crate::error::{ApiError, AttachedError, Unhandled};

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a ApiError,
}

/// Render an attached error, if any.
pub fn render_attached(response: Response) -> Response {
    let Some(attached) = response.extensions().get::<AttachedError>().cloned() else {
        return response;
    };

    match attached.api_error() {
        Some(err) => {
            if err.status_code().is_server_error() {
                tracing::error!(code = %err.code, message = %err.message, "Request failed");
            } else {
                tracing::debug!(code = %err.code, message = %err.message, "Request rejected");
            }
            (err.status_code(), Json(ErrorBody { error: err })).into_response()
        }
        None => {
            tracing::error!(error = %attached.0, "Unhandled error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Internal Server Error" })),
            )
                .into_response()
        }
    }
}

pub async fn error_responder_middleware(request: Request, next: Next) -> Response {
    render_attached(next.run(request).await)
}

/// Error handler for fallible tower layers below the responder.
///
/// A timeout becomes the `timeout` code; any other layer error is unhandled.
pub async fn handle_middleware_error(err: BoxError) -> Response {
    if err.is::<tower::timeout::error::Elapsed>() {
        ApiError::timeout().into_response()
    } else {
        Unhandled::from_boxed(err).into_response()
    }
}
