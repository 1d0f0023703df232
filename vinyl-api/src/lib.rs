//! Vinyl API - REST Layer
//!
//! Axum service exposing a paginated album listing. Reads go through a
//! cache-aside service in front of PostgreSQL; every cache and database call
//! made while serving a request is recorded in a per-request call ledger that
//! the request logger emits when the response is complete.

pub mod cache;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod middleware;
pub mod repository;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use cache::{CacheClient, CacheConfig};
pub use config::AppConfig;
pub use context::{Ledger, RequestLedger};
pub use db::{DbClient, DbConfig};
pub use error::{map_cache_error, map_db_error, ApiError, ApiResult, ErrorCode};
pub use repository::AlbumRepository;
pub use routes::create_api_router;
pub use services::{albums_cache_key, AlbumService};
pub use state::AppState;
