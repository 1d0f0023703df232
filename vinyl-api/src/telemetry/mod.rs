//! Vinyl Telemetry - Observability Infrastructure
//!
//! OpenTelemetry tracing wired into `tracing`, with W3C trace-context
//! propagation for inbound requests. Works without a collector: spans still
//! get real trace and span ids, they are just not exported.

pub mod middleware;
pub mod tracer;

use opentelemetry::trace::TraceContextExt;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub use middleware::trace_middleware;
pub use tracer::{init_telemetry, LogFormat, TelemetryConfig, TelemetryGuard};

/// Hex span id of `span` as seen by OpenTelemetry.
///
/// All zeros when no OpenTelemetry layer is installed.
pub fn span_id_of(span: &tracing::Span) -> String {
    span.context().span().span_context().span_id().to_string()
}

/// Hex trace id of `span` as seen by OpenTelemetry.
pub fn trace_id_of(span: &tracing::Span) -> String {
    span.context().span().span_context().trace_id().to_string()
}
