//! Client context middleware.
//!
//! Builds the [`ClientContext`] for the request from the current server span
//! and request metadata, and stores a [`RequestLedger`] handle in the request
//! extensions for handlers and later middleware.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use vinyl_core::{ClientContext, ClientInfo, RequestInfo};

use crate::context::RequestLedger;
use crate::telemetry::{span_id_of, trace_id_of};

#[derive(Debug, Clone)]
pub struct ClientContextState {
    pub service_name: Arc<str>,
}

impl ClientContextState {
    pub fn new(service_name: impl Into<Arc<str>>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }
}

/// Client address: the first `X-Forwarded-For` entry, else the peer address.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_default()
}

pub async fn client_context_middleware(
    State(state): State<ClientContextState>,
    mut request: Request,
    next: Next,
) -> Response {
    let span = tracing::Span::current();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let context = ClientContext {
        service_name: state.service_name.to_string(),
        trace_id: trace_id_of(&span),
        span_id: span_id_of(&span),
        started_at: Some(chrono::Utc::now()),
        client: ClientInfo {
            ip: client_ip(request.headers(), peer),
            user_agent: request
                .headers()
                .get(header::USER_AGENT)
                .and_then(|h| h.to_str().ok())
                .unwrap_or_default()
                .to_string(),
        },
        request: RequestInfo {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
        },
        ..ClientContext::default()
    };

    request.extensions_mut().insert(RequestLedger::new(context));
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip_prefers_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"),
        );
        let peer = "10.0.0.9:5000".parse().ok();
        assert_eq!(client_ip(&headers, peer), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let peer = "192.0.2.4:41000".parse().ok();
        assert_eq!(client_ip(&HeaderMap::new(), peer), "192.0.2.4");
    }

    #[test]
    fn test_client_ip_empty_when_unknown() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(""));
        assert_eq!(client_ip(&headers, None), "");
    }
}
