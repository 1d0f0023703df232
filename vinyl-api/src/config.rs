//! API Configuration Module
//!
//! Settings are read from environment variables once, in `main`, and passed by
//! reference to whatever needs them. Numeric settings that fail to parse fall
//! back to their defaults; an unusable bind address is a startup error.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::db::DbConfig;
use crate::error::{ApiError, ApiResult};
use crate::telemetry::TelemetryConfig;

/// Parse `key` as `T`, falling back to `default` when unset or malformed.
pub(crate) fn env_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Ignoring unparseable setting");
                default
            }
        },
        None => default,
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Name recorded on every ledger and exported span
    pub service_name: String,

    pub bind_addr: SocketAddr,

    /// Deadline applied to every request
    pub request_timeout: Duration,

    /// Allowed CORS origins. Empty means allow all (development).
    pub cors_origins: Vec<String>,

    pub db: DbConfig,
    pub cache: CacheConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Create AppConfig from environment variables.
    ///
    /// Environment variables:
    /// - `VINYL_SERVICE_NAME` (default: vinyl-api)
    /// - `VINYL_API_BIND` (default: 0.0.0.0)
    /// - `PORT` or `VINYL_API_PORT` (default: 8080)
    /// - `VINYL_REQUEST_TIMEOUT_SECS` (default: 10)
    /// - `VINYL_CORS_ORIGINS`: comma-separated allowed origins (default: all)
    /// - `VINYL_DB_*`, `VINYL_REDIS_*`, `VINYL_CACHE_TTL_SECS`, `VINYL_OTLP_ENDPOINT`, ...
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: &F) -> ApiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let service_name = lookup("VINYL_SERVICE_NAME").unwrap_or_else(|| "vinyl-api".to_string());

        let cors_origins = lookup("VINYL_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_addr: resolve_bind_addr(lookup)?,
            request_timeout: Duration::from_secs(env_or(lookup, "VINYL_REQUEST_TIMEOUT_SECS", 10)),
            cors_origins,
            db: DbConfig::from_lookup(lookup),
            cache: CacheConfig::from_lookup(lookup),
            telemetry: TelemetryConfig::from_lookup(lookup, &service_name),
            service_name,
        })
    }
}

fn resolve_bind_addr<F>(lookup: &F) -> ApiResult<SocketAddr>
where
    F: Fn(&str) -> Option<String>,
{
    let host = lookup("VINYL_API_BIND").unwrap_or_else(|| "0.0.0.0".to_string());
    let port_str = lookup("PORT")
        .or_else(|| lookup("VINYL_API_PORT"))
        .unwrap_or_else(|| "8080".to_string());
    let port = port_str
        .trim()
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> ApiResult<AppConfig> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(&|key: &str| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() -> ApiResult<()> {
        let config = config_with(&[])?;
        assert_eq!(config.service_name, "vinyl-api");
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.cache.ttl, Duration::from_secs(600));
        assert_eq!(config.telemetry.service_name, "vinyl-api");
        Ok(())
    }

    #[test]
    fn test_port_prefers_platform_variable() -> ApiResult<()> {
        let config = config_with(&[("PORT", "9000"), ("VINYL_API_PORT", "9100")])?;
        assert_eq!(config.bind_addr.port(), 9000);
        Ok(())
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let err = config_with(&[("VINYL_API_PORT", "eighty")]).unwrap_err();
        assert!(err.message.contains("eighty"));
    }

    #[test]
    fn test_invalid_host_is_an_error() {
        assert!(config_with(&[("VINYL_API_BIND", "not a host")]).is_err());
    }

    #[test]
    fn test_bad_timeout_falls_back() -> ApiResult<()> {
        let config = config_with(&[("VINYL_REQUEST_TIMEOUT_SECS", "-3")])?;
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        Ok(())
    }

    #[test]
    fn test_cors_origins_split() -> ApiResult<()> {
        let config = config_with(&[("VINYL_CORS_ORIGINS", "https://a.example, ,https://b.example")])?;
        assert_eq!(config.cors_origins, vec!["https://a.example", "https://b.example"]);
        Ok(())
    }
}
