//! Vinyl Core - Domain Types
//!
//! Plain data structures shared by every other crate in the workspace:
//! album records, paginated results, the validated list query, and the
//! per-request call ledger records. No I/O lives here.

pub mod album;
pub mod error;
pub mod ledger;

pub use album::{Album, AlbumQuery, Paginated, DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT};
pub use error::{CoreError, CoreResult};
pub use ledger::{
    CacheAction, CacheCall, ClientContext, ClientInfo, DatabaseCall, DownstreamCall, RequestInfo,
    ResponseInfo, ServiceTransaction,
};

/// Timestamp type using UTC timezone.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
