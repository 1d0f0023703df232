//! Request-scoped call ledger.
//!
//! The client context middleware creates one [`RequestLedger`] per inbound
//! request and stores it in the request extensions. Instrumented store
//! clients append to it; the JSON logger reads it once the response is built.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use axum::{extract::FromRequestParts, http::request::Parts};
use vinyl_core::{
    CacheAction, CacheCall, ClientContext, DatabaseCall, ResponseInfo, ServiceTransaction,
};

use crate::error::ApiError;

/// Error recorded for a store call whose future was dropped before it finished.
pub const CANCELLED: &str = "cancelled";

/// Shared handle to the [`ClientContext`] of one request.
///
/// Cloning the handle does not copy the ledger. The lock is never held
/// across an `.await`.
#[derive(Debug, Clone)]
pub struct RequestLedger {
    inner: Arc<Mutex<ClientContext>>,
}

impl RequestLedger {
    pub fn new(context: ClientContext) -> Self {
        Self {
            inner: Arc::new(Mutex::new(context)),
        }
    }

    /// A ledger for work that is not driven by an HTTP request, such as seeding.
    pub fn detached(service_name: impl Into<String>) -> Self {
        Self::new(ClientContext {
            service_name: service_name.into(),
            started_at: Some(chrono::Utc::now()),
            ..ClientContext::default()
        })
    }

    fn lock(&self) -> MutexGuard<'_, ClientContext> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_database(&self, call: DatabaseCall) {
        self.lock().database.push(call);
    }

    pub fn record_cache(&self, call: CacheCall) {
        self.lock().cache.push(call);
    }

    /// Record how the request was answered.
    pub fn complete(&self, status: u16, response_time: Duration) {
        let mut context = self.lock();
        context.response = ResponseInfo { status };
        context.response_time = response_time;
    }

    /// Copy of the ledger as it stands.
    pub fn snapshot(&self) -> ClientContext {
        self.lock().clone()
    }
}

/// What is known about a store call before it returns.
#[derive(Debug)]
pub(crate) enum PendingCall {
    Database {
        transaction: ServiceTransaction,
        query: String,
    },
    Cache {
        transaction: ServiceTransaction,
        action: CacheAction,
        key: String,
    },
}

/// A store call in flight.
///
/// Lands in the ledger exactly once: through [`InFlightCall::finish`], or as
/// a [`CANCELLED`] entry when dropped first (request timeout, client gone).
#[must_use]
pub(crate) struct InFlightCall<'a> {
    ledger: &'a RequestLedger,
    started: Instant,
    pending: Option<PendingCall>,
}

impl<'a> InFlightCall<'a> {
    pub(crate) fn start(ledger: &'a RequestLedger, pending: PendingCall) -> Self {
        Self {
            ledger,
            started: Instant::now(),
            pending: Some(pending),
        }
    }

    /// `hit` only applies to cache calls.
    pub(crate) fn finish(mut self, hit: bool, error: Option<String>) {
        self.record(hit, error);
    }

    fn record(&mut self, hit: bool, error: Option<String>) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let response_time = self.started.elapsed();
        match pending {
            PendingCall::Database { transaction, query } => {
                self.ledger.record_database(DatabaseCall {
                    transaction,
                    query,
                    response_time,
                    error,
                });
            }
            PendingCall::Cache {
                transaction,
                action,
                key,
            } => {
                self.ledger.record_cache(CacheCall {
                    transaction,
                    action,
                    key,
                    hit,
                    response_time,
                    error,
                });
            }
        }
    }
}

impl Drop for InFlightCall<'_> {
    fn drop(&mut self) {
        if let Some(pending) = &self.pending {
            tracing::warn!(call = ?pending, "Store call dropped before completion");
            self.record(false, Some(CANCELLED.to_string()));
        }
    }
}

/// Extractor for the current request's ledger.
///
/// Fails closed with `internal_error` when the client context middleware is
/// not applied to the route.
#[derive(Debug, Clone)]
pub struct Ledger(pub RequestLedger);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Ledger
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestLedger>()
            .cloned()
            .map(Ledger)
            .ok_or_else(|| {
                tracing::error!("RequestLedger missing from request extensions");
                ApiError::internal_error("request context unavailable")
            })
    }
}

impl std::ops::Deref for Ledger {
    type Target = RequestLedger;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    use crate::error::ErrorCode;

    #[test]
    fn test_clones_share_one_ledger() {
        let ledger = RequestLedger::detached("vinyl-api");
        let clone = ledger.clone();

        clone.record_cache(CacheCall {
            transaction: ServiceTransaction::new("albumsCache", "0000000000000001"),
            action: CacheAction::Get,
            key: "k".to_string(),
            hit: false,
            response_time: Duration::from_millis(2),
            error: None,
        });
        ledger.complete(200, Duration::from_millis(5));

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.cache.len(), 1);
        assert_eq!(snapshot.response.status, 200);
        assert_eq!(snapshot.service_name, "vinyl-api");
        assert!(snapshot.started_at.is_some());
    }

    #[tokio::test]
    async fn test_extractor_fails_closed_without_middleware() {
        let (mut parts, _) = Request::new(()).into_parts();
        let err = Ledger::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalError);
    }

    #[tokio::test]
    async fn test_extractor_reads_extension() {
        let ledger = RequestLedger::detached("vinyl-api");
        let (mut parts, _) = Request::new(()).into_parts();
        parts.extensions.insert(ledger.clone());

        let Ledger(extracted) = Ledger::from_request_parts(&mut parts, &()).await.unwrap();
        extracted.complete(404, Duration::ZERO);
        assert_eq!(ledger.snapshot().response.status, 404);
    }

    fn pending_get(key: &str) -> PendingCall {
        PendingCall::Cache {
            transaction: ServiceTransaction::new("albumsCache", "0000000000000000"),
            action: CacheAction::Get,
            key: key.to_string(),
        }
    }

    #[test]
    fn test_finished_call_recorded_once() {
        let ledger = RequestLedger::detached("vinyl-api");
        InFlightCall::start(&ledger, pending_get("k")).finish(true, None);

        let cache = ledger.snapshot().cache;
        assert_eq!(cache.len(), 1);
        assert!(cache[0].hit);
        assert_eq!(cache[0].error, None);
    }

    #[test]
    fn test_dropped_call_recorded_as_cancelled() {
        let ledger = RequestLedger::detached("vinyl-api");
        let call = InFlightCall::start(
            &ledger,
            PendingCall::Database {
                transaction: ServiceTransaction::new("albumsRepository", "0000000000000000"),
                query: "SELECT 1".to_string(),
            },
        );
        drop(call);

        let database = ledger.snapshot().database;
        assert_eq!(database.len(), 1);
        assert_eq!(database[0].query, "SELECT 1");
        assert_eq!(database[0].error.as_deref(), Some(CANCELLED));
    }
}
