#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, response::Response, Router};
use http_body_util::BodyExt;
use tower::ServiceExt;
use vinyl_api::{create_api_router, AppConfig, AppState, CacheClient, DbClient};
use vinyl_test_utils::{RecordingCache, ScriptedDatabase};

pub const TEST_TTL: Duration = Duration::from_secs(600);

/// Router over the given doubles, with default configuration.
pub fn test_router(db: Arc<ScriptedDatabase>, cache: Arc<RecordingCache>) -> Router {
    test_router_with(db, cache, &[])
}

/// Router over the given doubles, with `vars` as the environment.
pub fn test_router_with(
    db: Arc<ScriptedDatabase>,
    cache: Arc<RecordingCache>,
    vars: &[(&str, &str)],
) -> Router {
    let env: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let config = AppConfig::from_lookup(&|key: &str| env.get(key).cloned()).expect("test config");
    let state = AppState::new(DbClient::new(db), CacheClient::new(cache), TEST_TTL);
    create_api_router(state, &config)
}

pub async fn send(router: Router, request: Request<Body>) -> Response {
    router.oneshot(request).await.expect("infallible router")
}

pub async fn get(router: Router, uri: &str) -> Response {
    send(router, Request::get(uri).body(Body::empty()).expect("request")).await
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}
