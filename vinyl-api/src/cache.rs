//! Cache configuration and the instrumented cache handle.
//!
//! Mirrors [`crate::db`]: [`CacheClient`] wraps a [`CacheBackend`] and appends
//! one [`vinyl_core::CacheCall`] per get or set to the request ledger. A miss is recorded
//! as `hit: false` with no error.

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;
use vinyl_core::{CacheAction, ServiceTransaction};
use vinyl_storage::{CacheBackend, CacheError, CacheResult, RedisCache};

use crate::config::env_or;
use crate::context::{InFlightCall, PendingCall, RequestLedger};
use crate::error::{map_cache_error, ApiResult};
use crate::telemetry::span_id_of;

/// Redis connection and entry expiry settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub url: String,
    pub max_size: usize,
    /// Expiry applied when a listing is written back to the cache
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
            max_size: 16,
            ttl: Duration::from_secs(600),
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            url: lookup("VINYL_REDIS_URL").unwrap_or(defaults.url),
            max_size: env_or(lookup, "VINYL_REDIS_POOL_SIZE", defaults.max_size),
            ttl: Duration::from_secs(env_or(lookup, "VINYL_CACHE_TTL_SECS", 600)),
        }
    }
}

/// Cache handle that records every call in the request ledger.
#[derive(Clone)]
pub struct CacheClient {
    inner: Arc<dyn CacheBackend>,
}

impl CacheClient {
    pub fn new(inner: Arc<dyn CacheBackend>) -> Self {
        Self { inner }
    }

    /// Create a Redis-backed client from configuration.
    pub fn from_config(config: &CacheConfig) -> ApiResult<Self> {
        let redis = RedisCache::from_url(&config.url, config.max_size)
            .map_err(|e| map_cache_error(&e))?;
        Ok(Self::new(Arc::new(redis)))
    }

    /// Fetch the payload under `key` on behalf of `component`.
    pub async fn get(
        &self,
        ledger: &RequestLedger,
        component: &str,
        key: &str,
    ) -> CacheResult<String> {
        let span = tracing::info_span!(
            "cache.get",
            otel.kind = "client",
            db.system = "redis",
            cache.key = key,
            component,
        );
        let call = start_call(ledger, component, &span, CacheAction::Get, key);
        let result = self.inner.get(key).instrument(span).await;
        call.finish(result.is_ok(), recorded_error(result.as_ref().err()));
        result
    }

    /// Store `value` under `key` for `ttl` on behalf of `component`.
    pub async fn set(
        &self,
        ledger: &RequestLedger,
        component: &str,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> CacheResult<()> {
        let span = tracing::info_span!(
            "cache.set",
            otel.kind = "client",
            db.system = "redis",
            cache.key = key,
            component,
        );
        let call = start_call(ledger, component, &span, CacheAction::Set, key);
        let result = self.inner.set(key, value, ttl).instrument(span).await;
        call.finish(false, recorded_error(result.as_ref().err()));
        result
    }

    /// Connectivity probe for readiness checks. Not recorded in any ledger.
    pub async fn health_check(&self) -> CacheResult<()> {
        self.inner.ping().await
    }
}

fn start_call<'a>(
    ledger: &'a RequestLedger,
    component: &str,
    span: &tracing::Span,
    action: CacheAction,
    key: &str,
) -> InFlightCall<'a> {
    InFlightCall::start(
        ledger,
        PendingCall::Cache {
            transaction: ServiceTransaction::new(component, span_id_of(span)),
            action,
            key: key.to_string(),
        },
    )
}

fn recorded_error(err: Option<&CacheError>) -> Option<String> {
    err.filter(|e| !e.is_miss()).map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vinyl_storage::InMemoryCache;

    #[test]
    fn test_cache_config_defaults() {
        assert_eq!(CacheConfig::from_lookup(&|_: &str| None), CacheConfig::default());
    }

    #[test]
    fn test_cache_config_ttl_override() {
        let config = CacheConfig::from_lookup(&|key: &str| {
            (key == "VINYL_CACHE_TTL_SECS").then(|| "60".to_string())
        });
        assert_eq!(config.ttl, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_get_records_miss_then_hit() -> CacheResult<()> {
        let client = CacheClient::new(Arc::new(InMemoryCache::new()));
        let ledger = RequestLedger::detached("vinyl-api");

        assert!(client.get(&ledger, "albumsCache", "k").await.unwrap_err().is_miss());
        client
            .set(&ledger, "albumsCache", "k", "v", Duration::from_secs(60))
            .await?;
        assert_eq!(client.get(&ledger, "albumsCache", "k").await?, "v");

        let calls = ledger.snapshot().cache;
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls.iter().map(|c| (c.action, c.hit)).collect::<Vec<_>>(),
            vec![
                (CacheAction::Get, false),
                (CacheAction::Set, false),
                (CacheAction::Get, true),
            ]
        );
        assert!(calls.iter().all(|c| c.error.is_none()));
        assert!(calls.iter().all(|c| c.transaction.service_name == "albumsCache"));
        Ok(())
    }
}
