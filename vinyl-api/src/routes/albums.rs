//! Album REST routes.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use vinyl_core::{Album, AlbumQuery, Paginated};

use crate::context::Ledger;
use crate::error::{ApiError, ApiResult};
use crate::services::AlbumService;
use crate::state::AppState;

/// Raw query string of `GET /v1/albums`.
///
/// Numbers stay strings here so that bad values surface as `invalid_input`
/// rather than a framework rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ListAlbumsParams {
    pub artist: Option<String>,
    pub limit: Option<String>,
    pub page: Option<String>,
}

impl ListAlbumsParams {
    pub fn to_query(&self) -> ApiResult<AlbumQuery> {
        Ok(AlbumQuery::from_raw(
            self.artist.as_deref(),
            self.page.as_deref(),
            self.limit.as_deref(),
        )?)
    }
}

/// GET /v1/albums - List albums, optionally filtered by artist
pub async fn list_albums(
    State(service): State<Arc<AlbumService>>,
    Ledger(ledger): Ledger,
    params: Result<Query<ListAlbumsParams>, QueryRejection>,
) -> ApiResult<Json<Paginated<Album>>> {
    let Query(params) = params.map_err(|e| ApiError::invalid_input(e.body_text()))?;
    let query = params.to_query()?;
    let albums = service.get_albums(&ledger, &query).await?;
    Ok(Json(albums))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/", get(list_albums))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn params(artist: Option<&str>, limit: Option<&str>, page: Option<&str>) -> ListAlbumsParams {
        ListAlbumsParams {
            artist: artist.map(str::to_string),
            limit: limit.map(str::to_string),
            page: page.map(str::to_string),
        }
    }

    #[test]
    fn test_defaults_apply() -> ApiResult<()> {
        let query = params(None, None, None).to_query()?;
        assert_eq!(query, AlbumQuery::default());
        Ok(())
    }

    #[test]
    fn test_explicit_values() -> ApiResult<()> {
        let query = params(Some("Miles Davis"), Some("5"), Some("3")).to_query()?;
        assert_eq!(query.artist(), "Miles Davis");
        assert_eq!(query.limit(), 5);
        assert_eq!(query.page(), 3);
        Ok(())
    }

    #[test]
    fn test_bad_numbers_are_invalid_input() {
        for (limit, page) in [(Some("ten"), None), (Some("0"), None), (Some("101"), None), (None, Some("0"))] {
            let err = params(None, limit, page).to_query().unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidInput, "limit={:?} page={:?}", limit, page);
        }
    }
}
