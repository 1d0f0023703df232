//! Request logger.
//!
//! Stamps the final status and latency into the request ledger and emits the
//! whole ledger as one structured event: `error` level for 5xx responses,
//! `info` otherwise.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

use crate::context::RequestLedger;

pub async fn json_logger_middleware(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let ledger = request.extensions().get::<RequestLedger>().cloned();

    let response = next.run(request).await;

    let Some(ledger) = ledger else {
        tracing::warn!("Request ledger missing, skipping request log");
        return response;
    };

    let status = response.status();
    ledger.complete(status.as_u16(), started.elapsed());
    let snapshot = ledger.snapshot();

    let client_context = match serde_json::to_string(&snapshot) {
        Ok(json) => json,
        Err(e) => format!("{{\"serialization_error\":\"{}\"}}", e),
    };

    if status.is_server_error() {
        tracing::error!(
            status = status.as_u16(),
            calls = snapshot.call_count(),
            client_context = %client_context,
            "Request logged"
        );
    } else {
        tracing::info!(
            status = status.as_u16(),
            calls = snapshot.call_count(),
            client_context = %client_context,
            "Request logged"
        );
    }

    response
}
