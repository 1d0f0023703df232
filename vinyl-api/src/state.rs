//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::FromRef;

use crate::cache::CacheClient;
use crate::db::DbClient;
use crate::repository::AlbumRepository;
use crate::services::AlbumService;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Instrumented database handle, also used by readiness probes.
    pub db: DbClient,
    pub cache: CacheClient,
    pub albums: Arc<AlbumService>,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the album service over the given store handles.
    ///
    /// `cache_ttl` is the expiry for listings written back to the cache.
    pub fn new(db: DbClient, cache: CacheClient, cache_ttl: Duration) -> Self {
        let repository = AlbumRepository::new(db.clone());
        let albums = Arc::new(AlbumService::new(cache.clone(), repository, cache_ttl));
        Self {
            db,
            cache,
            albums,
            start_time: Instant::now(),
        }
    }
}

macro_rules! state_part {
    ($($part:ty => $field:ident),+ $(,)?) => {
        $(
            impl FromRef<AppState> for $part {
                fn from_ref(state: &AppState) -> Self {
                    state.$field.clone()
                }
            }
        )+
    };
}

state_part! {
    DbClient => db,
    CacheClient => cache,
    Arc<AlbumService> => albums,
    Instant => start_time,
}
