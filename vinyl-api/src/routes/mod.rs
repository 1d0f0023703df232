//! Route definitions and router assembly.

pub mod albums;
pub mod health;

use axum::{
    error_handling::HandleErrorLayer,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::middleware::{
    client_context_middleware, error_responder_middleware, handle_middleware_error,
    json_logger_middleware, ClientContextState,
};
use crate::state::AppState;
use crate::telemetry::trace_middleware;

fn build_cors_layer(config: &AppConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            HeaderName::from_static("traceparent"),
            HeaderName::from_static("tracestate"),
        ]);

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!("CORS: allowing origins: {:?}", config.cors_origins);
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

/// Build the full application router with its middleware stack.
///
/// Layers, outermost first: CORS, tracing, client context, request logger,
/// error responder, request timeout.
pub fn create_api_router(state: AppState, config: &AppConfig) -> Router {
    let api_routes = Router::new().nest("/albums", albums::create_router());

    let router = Router::new()
        .nest("/v1", api_routes)
        .nest("/health", health::create_router())
        .with_state(state);

    let middleware = ServiceBuilder::new()
        .layer(build_cors_layer(config))
        .layer(from_fn(trace_middleware))
        .layer(from_fn_with_state(
            ClientContextState::new(config.service_name.as_str()),
            client_context_middleware,
        ))
        .layer(from_fn(json_logger_middleware))
        .layer(from_fn(error_responder_middleware))
        .layer(HandleErrorLayer::new(handle_middleware_error))
        .timeout(config.request_timeout);

    router.layer(middleware)
}
