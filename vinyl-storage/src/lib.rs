//! Vinyl Storage - Capability Traits and Backends
//!
//! Defines the two store capabilities the service depends on:
//! - [`Database`]: parameterized SQL with rows returned as [`SqlRow`]
//! - [`CacheBackend`]: string key to string payload with expiry
//!
//! Each capability has a production backend (PostgreSQL via deadpool-postgres,
//! Redis via deadpool-redis) and an in-memory variant for tests and local runs.

pub mod cache;
pub mod database;
pub mod memory;
pub mod postgres;
pub mod redis_cache;
pub mod sql;

pub use cache::{CacheBackend, CacheError, CacheResult};
pub use database::{Database, DbError, DbResult};
pub use memory::InMemoryCache;
pub use postgres::PostgresDatabase;
pub use redis_cache::RedisCache;
pub use sql::{FromSqlValue, SqlRow, SqlValue};
