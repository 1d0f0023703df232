//! Axum Middleware for HTTP Request Tracing
//!
//! Opens the server span for every request, parented on the caller's W3C
//! `traceparent` header when present. Everything further down the stack,
//! including the ledger and the store clients, runs inside this span.

use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use opentelemetry::{global, Context};
use opentelemetry_http::HeaderExtractor;
use tracing::{field, info_span, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Extract trace context from incoming request headers.
fn extract_trace_context(headers: &HeaderMap) -> Context {
    global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor(headers)))
}

/// Path with id-like segments (all digits, or a hyphenated UUID) replaced by
/// `{id}`, for low-cardinality span names.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| if is_id_segment(segment) { "{id}" } else { segment })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_id_segment(segment: &str) -> bool {
    let numeric = !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit());
    let uuid = segment.len() == 36
        && segment
            .bytes()
            .enumerate()
            .all(|(i, b)| match i {
                8 | 13 | 18 | 23 => b == b'-',
                _ => b.is_ascii_hexdigit(),
            });
    numeric || uuid
}

/// Tracing middleware for Axum.
pub async fn trace_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let span = info_span!(
        "http_request",
        otel.name = %format!("{} {}", method, normalize_path(&path)),
        otel.kind = "server",
        otel.status_code = field::Empty,
        http.method = %method,
        http.target = %path,
        http.status_code = field::Empty,
    );
    let _ = span.set_parent(extract_trace_context(request.headers()));

    let response = next.run(request).instrument(span.clone()).await;

    let status = response.status();
    span.record("http.status_code", status.as_u16());
    span.record(
        "otel.status_code",
        if status.is_server_error() { "ERROR" } else { "OK" },
    );

    response
}
