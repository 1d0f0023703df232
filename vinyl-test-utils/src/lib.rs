//! Vinyl Test Utilities
//!
//! Centralized test infrastructure for the Vinyl workspace:
//! - Scripted store doubles that record every call
//! - Proptest generators for albums and queries
//! - Fixtures for common rows and payloads

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

// Re-export core and storage types for convenience
pub use vinyl_core::{Album, AlbumQuery, ClientContext, Paginated};
pub use vinyl_storage::{
    CacheBackend, CacheError, CacheResult, Database, DbError, DbResult, SqlRow, SqlValue,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// SCRIPTED DATABASE
// ============================================================================

/// One statement as the double received it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub statement: String,
    pub params: Vec<SqlValue>,
}

#[derive(Debug, Clone)]
enum Scripted {
    Rows(Vec<SqlRow>),
    Affected(u64),
    Error(DbError),
    Stall,
}

/// [`Database`] double that replays scripted outcomes in order.
///
/// Every `query` and `execute` consumes the next scripted outcome. Running
/// out of script is reported as a query error so that unexpected statements
/// fail loudly.
#[derive(Debug, Default)]
pub struct ScriptedDatabase {
    script: Mutex<VecDeque<Scripted>>,
    statements: Mutex<Vec<RecordedStatement>>,
    unhealthy: AtomicBool,
}

impl ScriptedDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next statement returns `rows`.
    pub fn then_rows(self, rows: Vec<SqlRow>) -> Self {
        lock(&self.script).push_back(Scripted::Rows(rows));
        self
    }

    /// Next statement reports `affected` rows changed.
    pub fn then_affected(self, affected: u64) -> Self {
        lock(&self.script).push_back(Scripted::Affected(affected));
        self
    }

    /// Next statement fails with `err`.
    pub fn then_error(self, err: DbError) -> Self {
        lock(&self.script).push_back(Scripted::Error(err));
        self
    }

    /// Next statement never completes. Pair with a timeout.
    pub fn then_stall(self) -> Self {
        lock(&self.script).push_back(Scripted::Stall);
        self
    }

    /// Make `ping` fail.
    pub fn unhealthy(self) -> Self {
        self.unhealthy.store(true, Ordering::SeqCst);
        self
    }

    /// Statements received so far, in order.
    pub fn statements(&self) -> Vec<RecordedStatement> {
        lock(&self.statements).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.statements).len()
    }

    /// Scripted outcomes not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }

    fn next(&self, statement: &str, params: &[SqlValue]) -> Option<Scripted> {
        lock(&self.statements).push(RecordedStatement {
            statement: statement.to_string(),
            params: params.to_vec(),
        });
        lock(&self.script).pop_front()
    }
}

#[async_trait]
impl Database for ScriptedDatabase {
    async fn query(&self, statement: &str, params: &[SqlValue]) -> DbResult<Vec<SqlRow>> {
        match self.next(statement, params) {
            Some(Scripted::Rows(rows)) => Ok(rows),
            Some(Scripted::Error(err)) => Err(err),
            Some(Scripted::Affected(_)) => Err(DbError::query("scripted execute result for query")),
            Some(Scripted::Stall) => std::future::pending().await,
            None => Err(DbError::query(format!("unscripted query: {}", statement))),
        }
    }

    async fn execute(&self, statement: &str, params: &[SqlValue]) -> DbResult<u64> {
        match self.next(statement, params) {
            Some(Scripted::Affected(n)) => Ok(n),
            Some(Scripted::Error(err)) => Err(err),
            Some(Scripted::Rows(_)) => Err(DbError::query("scripted rows for execute")),
            Some(Scripted::Stall) => std::future::pending().await,
            None => Err(DbError::query(format!("unscripted execute: {}", statement))),
        }
    }

    async fn ping(&self) -> DbResult<()> {
        if self.unhealthy.load(Ordering::SeqCst) {
            Err(DbError::connection("scripted outage"))
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// RECORDING CACHE
// ============================================================================

/// [`CacheBackend`] double with injectable failures and call counters.
///
/// Entries never expire; the TTL of each `set` is recorded instead.
#[derive(Debug, Default)]
pub struct RecordingCache {
    entries: Mutex<HashMap<String, String>>,
    get_failure: Mutex<Option<CacheError>>,
    set_failure: Mutex<Option<CacheError>>,
    sets: Mutex<Vec<(String, String, Duration)>>,
    gets: AtomicUsize,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate `key` with `value`.
    pub fn with_entry(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        lock(&self.entries).insert(key.into(), value.into());
        self
    }

    /// Every `get` fails with `err`.
    pub fn failing_gets(self, err: CacheError) -> Self {
        *lock(&self.get_failure) = Some(err);
        self
    }

    /// Every `set` fails with `err`.
    pub fn failing_sets(self, err: CacheError) -> Self {
        *lock(&self.set_failure) = Some(err);
        self
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// `(key, value, ttl)` of every `set` call, including failed ones.
    pub fn sets(&self) -> Vec<(String, String, Duration)> {
        lock(&self.sets).clone()
    }

    pub fn entry(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }
}

#[async_trait]
impl CacheBackend for RecordingCache {
    async fn get(&self, key: &str) -> CacheResult<String> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = lock(&self.get_failure).clone() {
            return Err(err);
        }
        lock(&self.entries)
            .get(key)
            .cloned()
            .ok_or_else(|| CacheError::miss(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        lock(&self.sets).push((key.to_string(), value.to_string(), ttl));
        if let Some(err) = lock(&self.set_failure).clone() {
            return Err(err);
        }
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        match lock(&self.get_failure).clone() {
            Some(err) if !err.is_miss() => Err(err),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;

    pub fn arb_artist() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 .'-]{0,30}"
    }

    /// Prices in whole cents, as stored in `NUMERIC(10, 2)`.
    pub fn arb_price() -> impl Strategy<Value = f64> {
        (0u32..100_000).prop_map(|cents| f64::from(cents) / 100.0)
    }

    pub fn arb_album() -> impl Strategy<Value = Album> {
        ("[1-9][0-9]{0,5}", "[A-Za-z0-9 ]{1,40}", arb_artist(), arb_price())
            .prop_map(|(id, title, artist, price)| Album::new(id, title, artist, price))
    }

    pub fn arb_albums(max: usize) -> impl Strategy<Value = Vec<Album>> {
        prop::collection::vec(arb_album(), 0..=max)
    }

    /// Valid queries, filtered or not.
    pub fn arb_album_query() -> impl Strategy<Value = AlbumQuery> {
        (
            prop_oneof![Just(String::new()), arb_artist()],
            1u32..=1_000,
            1u32..=vinyl_core::MAX_LIMIT,
        )
            .prop_filter_map("valid query", |(artist, page, limit)| {
                AlbumQuery::new(artist, page, limit).ok()
            })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    use super::*;

    pub fn blue_train() -> Album {
        Album::new("1", "Blue Train", "John Coltrane", 56.99)
    }

    pub fn a_love_supreme() -> Album {
        Album::new("9", "A Love Supreme", "John Coltrane", 49.99)
    }

    /// Row shaped like the listing select: id, title, artist, price.
    pub fn album_row(album: &Album) -> SqlRow {
        SqlRow::new(vec![
            SqlValue::from(album.id.as_str()),
            SqlValue::from(album.title.as_str()),
            SqlValue::from(album.artist.as_str()),
            SqlValue::Float(album.price),
        ])
    }

    pub fn album_rows(albums: &[Album]) -> Vec<SqlRow> {
        albums.iter().map(album_row).collect()
    }

    /// Single-row result of a `COUNT(*)`.
    pub fn count_rows(total: i64) -> Vec<SqlRow> {
        vec![SqlRow::new(vec![SqlValue::Int(total)])]
    }

    /// Cache payload for a listing, as the service writes it.
    pub fn cached_payload(albums: &[Album], total: i64) -> String {
        serde_json::to_string(&Paginated::new(albums.to_vec(), total))
            .unwrap_or_else(|e| panic!("fixture payload must serialize: {}", e))
    }

    /// A database that answers one listing: the page rows then the count.
    pub fn listing_database(albums: &[Album], total: i64) -> ScriptedDatabase {
        ScriptedDatabase::new()
            .then_rows(album_rows(albums))
            .then_rows(count_rows(total))
    }
}
