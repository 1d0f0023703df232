//! Album Service
//!
//! Cache-aside listing: look the query up in the cache, fall through to the
//! repository on a miss or any cache failure, then write the fresh result back.

use std::time::Duration;

use vinyl_core::{Album, AlbumQuery, Paginated};

use crate::cache::CacheClient;
use crate::context::RequestLedger;
use crate::error::ApiResult;
use crate::repository::AlbumRepository;

/// Ledger component name for cache calls made by this service.
pub const CACHE_COMPONENT: &str = "albumsCache";

/// Prefix shared by every album listing cache key.
pub const ALBUMS_CACHE_KEY_PREFIX: &str = "_albumsArtistFilter";

/// Cache key for one listing: `_albumsArtistFilter:{artist}:{limit}:{page}`.
pub fn albums_cache_key(query: &AlbumQuery) -> String {
    format!(
        "{}:{}:{}:{}",
        ALBUMS_CACHE_KEY_PREFIX,
        query.artist(),
        query.limit(),
        query.page()
    )
}

#[derive(Clone)]
pub struct AlbumService {
    cache: CacheClient,
    repository: AlbumRepository,
    ttl: Duration,
}

impl AlbumService {
    pub fn new(cache: CacheClient, repository: AlbumRepository, ttl: Duration) -> Self {
        Self {
            cache,
            repository,
            ttl,
        }
    }

    /// List albums for `query`, serving from cache when possible.
    ///
    /// Repository results and errors are returned unchanged. Cache failures
    /// never fail the request.
    pub async fn get_albums(
        &self,
        ledger: &RequestLedger,
        query: &AlbumQuery,
    ) -> ApiResult<Paginated<Album>> {
        let key = albums_cache_key(query);

        if let Some(cached) = self.cached(ledger, &key).await {
            return Ok(cached);
        }

        let albums = self.repository.list_albums(ledger, query).await?;
        self.write_back(ledger, &key, &albums).await;
        Ok(albums)
    }

    async fn cached(&self, ledger: &RequestLedger, key: &str) -> Option<Paginated<Album>> {
        let payload = match self.cache.get(ledger, CACHE_COMPONENT, key).await {
            Ok(payload) if !payload.is_empty() => payload,
            Ok(_) => return None,
            Err(e) if e.is_miss() => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache lookup failed, reading from database");
                return None;
            }
        };

        match serde_json::from_str(&payload) {
            Ok(albums) => Some(albums),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding malformed cache entry");
                None
            }
        }
    }

    async fn write_back(&self, ledger: &RequestLedger, key: &str, albums: &Paginated<Album>) {
        let payload = match serde_json::to_string(albums) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to serialize listing for cache");
                return;
            }
        };

        if let Err(e) = self
            .cache
            .set(ledger, CACHE_COMPONENT, key, &payload, self.ttl)
            .await
        {
            tracing::warn!(key, error = %e, "Cache write-back failed");
        }
    }
}
