//! Database Connection Pool Module
//!
//! PostgreSQL pool configuration plus [`DbClient`], the instrumented handle the
//! repository talks to. Every statement sent through `DbClient` runs inside a
//! client span and appends exactly one [`vinyl_core::DatabaseCall`] to the
//! request ledger, whether it succeeds, fails or is cancelled.

use std::sync::Arc;
use std::time::Duration;

use deadpool_postgres::{Config, ManagerConfig, RecyclingMethod, Runtime, Timeouts};
use tokio_postgres::NoTls;
use tracing::Instrument;
use vinyl_core::ServiceTransaction;
use vinyl_storage::{Database, DbError, DbResult, PostgresDatabase, SqlRow, SqlValue};

use crate::config::env_or;
use crate::context::{InFlightCall, PendingCall, RequestLedger};
use crate::error::{ApiError, ApiResult};
use crate::telemetry::span_id_of;

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Wait/create timeout for pooled connections
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "vinyl".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a database configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            host: lookup("VINYL_DB_HOST").unwrap_or(defaults.host),
            port: env_or(lookup, "VINYL_DB_PORT", defaults.port),
            dbname: lookup("VINYL_DB_NAME").unwrap_or(defaults.dbname),
            user: lookup("VINYL_DB_USER").unwrap_or(defaults.user),
            password: lookup("VINYL_DB_PASSWORD").unwrap_or(defaults.password),
            max_size: env_or(lookup, "VINYL_DB_POOL_SIZE", defaults.max_size),
            timeout: Duration::from_secs(env_or(lookup, "VINYL_DB_TIMEOUT", 30)),
        }
    }

    /// Create a connection pool from this configuration.
    ///
    /// No connection is opened until the first query.
    pub fn create_pool(&self) -> ApiResult<deadpool_postgres::Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_config = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_config.timeouts = Timeouts {
            wait: Some(self.timeout),
            create: Some(self.timeout),
            recycle: Some(self.timeout),
        };
        cfg.pool = Some(pool_config);

        cfg.create_pool(Some(Runtime::Tokio1), NoTls).map_err(|e| {
            tracing::error!(error = %e, "Failed to create database pool");
            ApiError::connection_error()
        })
    }
}

// ============================================================================
// INSTRUMENTED CLIENT
// ============================================================================

/// Database handle that records every statement in the request ledger.
#[derive(Clone)]
pub struct DbClient {
    inner: Arc<dyn Database>,
}

impl DbClient {
    pub fn new(inner: Arc<dyn Database>) -> Self {
        Self { inner }
    }

    /// Create a PostgreSQL-backed client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(Arc::new(PostgresDatabase::new(pool))))
    }

    /// Run a row-returning statement on behalf of `component`.
    pub async fn query(
        &self,
        ledger: &RequestLedger,
        component: &str,
        statement: &str,
        params: &[SqlValue],
    ) -> DbResult<Vec<SqlRow>> {
        let span = tracing::info_span!(
            "db.query",
            otel.kind = "client",
            db.system = "postgresql",
            db.statement = statement,
            component,
        );
        let call = start_call(ledger, component, &span, statement);
        let result = self.inner.query(statement, params).instrument(span).await;
        finish_call(call, component, result.as_ref().err());
        result
    }

    /// Run a statement that returns no rows on behalf of `component`.
    pub async fn execute(
        &self,
        ledger: &RequestLedger,
        component: &str,
        statement: &str,
        params: &[SqlValue],
    ) -> DbResult<u64> {
        let span = tracing::info_span!(
            "db.execute",
            otel.kind = "client",
            db.system = "postgresql",
            db.statement = statement,
            component,
        );
        let call = start_call(ledger, component, &span, statement);
        let result = self.inner.execute(statement, params).instrument(span).await;
        finish_call(call, component, result.as_ref().err());
        result
    }

    /// Connectivity probe for readiness checks. Not recorded in any ledger.
    pub async fn health_check(&self) -> DbResult<()> {
        self.inner.ping().await
    }
}

fn start_call<'a>(
    ledger: &'a RequestLedger,
    component: &str,
    span: &tracing::Span,
    statement: &str,
) -> InFlightCall<'a> {
    InFlightCall::start(
        ledger,
        PendingCall::Database {
            transaction: ServiceTransaction::new(component, span_id_of(span)),
            query: statement.to_string(),
        },
    )
}

fn finish_call(call: InFlightCall<'_>, component: &str, error: Option<&DbError>) {
    if let Some(err) = error {
        tracing::debug!(component, error = %err, "Database call failed");
    }
    call.finish(false, error.map(ToString::to_string));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_db_config_defaults() {
        let config = DbConfig::from_lookup(&|_: &str| None);
        assert_eq!(config, DbConfig::default());
    }

    #[test]
    fn test_db_config_overrides_and_bad_numbers() {
        let env: HashMap<&str, &str> = [
            ("VINYL_DB_HOST", "db.internal"),
            ("VINYL_DB_PORT", "6543"),
            ("VINYL_DB_POOL_SIZE", "lots"),
            ("VINYL_DB_TIMEOUT", "5"),
        ]
        .into_iter()
        .collect();
        let config = DbConfig::from_lookup(&|key: &str| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 6543);
        assert_eq!(config.max_size, 16);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
