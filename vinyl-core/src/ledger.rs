//! Call ledger records.
//!
//! A [`ClientContext`] describes one inbound request: who made it, what was
//! asked, how it was answered, and every outbound cache/database/downstream
//! call made while serving it. Entries are only ever appended. The record is
//! serialized once, by the request logger, when the request completes.

use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::Timestamp;

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}

/// Identifies the component that made a call and the span it ran under.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceTransaction {
    pub service_name: String,
    pub span_id: String,
}

impl ServiceTransaction {
    pub fn new(service_name: impl Into<String>, span_id: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            span_id: span_id.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestInfo {
    pub method: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponseInfo {
    pub status: u16,
}

/// An outbound HTTP call to another service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownstreamCall {
    #[serde(flatten)]
    pub transaction: ServiceTransaction,
    #[serde(rename = "response_time_ms", serialize_with = "as_millis")]
    pub response_time: Duration,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_id: Option<String>,
}

/// A single SQL statement sent to the database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseCall {
    #[serde(flatten)]
    pub transaction: ServiceTransaction,
    pub query: String,
    #[serde(rename = "response_time_ms", serialize_with = "as_millis")]
    pub response_time: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DatabaseCall {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheAction {
    Get,
    Set,
}

/// A single cache lookup or store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheCall {
    #[serde(flatten)]
    pub transaction: ServiceTransaction,
    pub action: CacheAction,
    pub key: String,
    pub hit: bool,
    #[serde(rename = "response_time_ms", serialize_with = "as_millis")]
    pub response_time: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CacheCall {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Everything known about one inbound request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientContext {
    pub service_name: String,
    pub trace_id: String,
    pub span_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    pub client: ClientInfo,
    pub request: RequestInfo,
    pub response: ResponseInfo,
    #[serde(rename = "response_time_ms", serialize_with = "as_millis")]
    pub response_time: Duration,
    pub downstreams: Vec<DownstreamCall>,
    pub database: Vec<DatabaseCall>,
    pub cache: Vec<CacheCall>,
}

impl ClientContext {
    /// Total number of outbound calls recorded so far.
    pub fn call_count(&self) -> usize {
        self.downstreams.len() + self.database.len() + self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_call_serializes_flat_with_millis() -> Result<(), serde_json::Error> {
        let call = CacheCall {
            transaction: ServiceTransaction::new("albums-cache", "00f067aa0ba902b7"),
            action: CacheAction::Get,
            key: "_albumsArtistFilter::10:1".to_string(),
            hit: false,
            response_time: Duration::from_micros(1500),
            error: None,
        };

        let json = serde_json::to_value(&call)?;
        assert_eq!(json["service_name"], "albums-cache");
        assert_eq!(json["span_id"], "00f067aa0ba902b7");
        assert_eq!(json["action"], "get");
        assert_eq!(json["response_time_ms"], 1.5);
        assert!(json.get("error").is_none());
        Ok(())
    }

    #[test]
    fn test_call_count_sums_every_kind() {
        let mut context = ClientContext::default();
        context.database.push(DatabaseCall {
            transaction: ServiceTransaction::default(),
            query: "SELECT 1".to_string(),
            response_time: Duration::ZERO,
            error: Some("boom".to_string()),
        });
        context.cache.push(CacheCall {
            transaction: ServiceTransaction::default(),
            action: CacheAction::Set,
            key: "k".to_string(),
            hit: false,
            response_time: Duration::ZERO,
            error: None,
        });

        assert_eq!(context.call_count(), 2);
        assert!(context.database[0].is_error());
        assert!(!context.cache[0].is_error());
    }
}
