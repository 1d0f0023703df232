//! Album records, paginated results and the list query.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Page size used when the request does not supply one.
pub const DEFAULT_LIMIT: u32 = 10;

/// Largest page size a client may ask for.
pub const MAX_LIMIT: u32 = 100;

/// First page; pages are 1-based.
pub const DEFAULT_PAGE: u32 = 1;

/// Upper bound on the page number so the computed offset stays well inside `i64`.
pub const MAX_PAGE: u32 = 1_000_000;

/// A single album row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub price: f64,
}

impl Album {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            price,
        }
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64) -> Self {
        Self { items, total }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Validated filter/page request for the album listing.
///
/// An empty `artist` means "no filter".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlbumQuery {
    artist: String,
    page: u32,
    limit: u32,
}

impl Default for AlbumQuery {
    fn default() -> Self {
        Self {
            artist: String::new(),
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl AlbumQuery {
    /// Build a query from already-typed values.
    pub fn new(artist: impl Into<String>, page: u32, limit: u32) -> CoreResult<Self> {
        check_range("page", i64::from(page), 1, i64::from(MAX_PAGE))?;
        check_range("limit", i64::from(limit), 1, i64::from(MAX_LIMIT))?;
        Ok(Self {
            artist: artist.into().trim().to_string(),
            page,
            limit,
        })
    }

    /// Build a query from raw query-string values, applying defaults for
    /// missing or blank numbers.
    pub fn from_raw(artist: Option<&str>, page: Option<&str>, limit: Option<&str>) -> CoreResult<Self> {
        let page = parse_number("page", page, DEFAULT_PAGE)?;
        let limit = parse_number("limit", limit, DEFAULT_LIMIT)?;
        Self::new(artist.unwrap_or_default(), page, limit)
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Whether the artist filter applies.
    pub fn is_filtered(&self) -> bool {
        !self.artist.is_empty()
    }

    /// Row offset for this page: `(page - 1) * limit`.
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }
}

fn parse_number(field: &str, raw: Option<&str>, default: u32) -> CoreResult<u32> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(default);
    };
    let value: i64 = raw.parse().map_err(|_| CoreError::InvalidValue {
        field: field.to_string(),
        reason: format!("'{}' is not an integer", raw),
    })?;
    let max = if field == "limit" { MAX_LIMIT } else { MAX_PAGE };
    check_range(field, value, 1, i64::from(max))?;
    u32::try_from(value).map_err(|_| CoreError::InvalidValue {
        field: field.to_string(),
        reason: format!("'{}' does not fit", raw),
    })
}

fn check_range(field: &str, value: i64, min: i64, max: i64) -> CoreResult<()> {
    if value < min || value > max {
        return Err(CoreError::OutOfRange {
            field: field.to_string(),
            min,
            max,
            actual: value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_album_json_shape() -> Result<(), serde_json::Error> {
        let album = Album::new("1", "Blue Train", "John Coltrane", 56.99);
        let json = serde_json::to_value(&album)?;
        assert_eq!(
            json,
            serde_json::json!({"id":"1","title":"Blue Train","artist":"John Coltrane","price":56.99})
        );

        let back: Album = serde_json::from_value(json)?;
        assert_eq!(back, album);
        Ok(())
    }

    #[test]
    fn test_paginated_json_shape() -> Result<(), serde_json::Error> {
        let page = Paginated::new(vec![Album::new("1", "Blue Train", "John Coltrane", 56.99)], 1);
        let json = serde_json::to_string(&page)?;
        assert_eq!(
            json,
            r#"{"items":[{"id":"1","title":"Blue Train","artist":"John Coltrane","price":56.99}],"total":1}"#
        );
        Ok(())
    }

    #[test]
    fn test_defaults_when_missing() {
        let query = AlbumQuery::from_raw(None, None, None).expect("defaults are valid");
        assert_eq!(query.page(), DEFAULT_PAGE);
        assert_eq!(query.limit(), DEFAULT_LIMIT);
        assert!(!query.is_filtered());
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn test_blank_numbers_fall_back_to_defaults() {
        let query = AlbumQuery::from_raw(Some("Miles Davis"), Some(" "), Some(""))
            .expect("blank values use defaults");
        assert_eq!(query.page(), DEFAULT_PAGE);
        assert_eq!(query.limit(), DEFAULT_LIMIT);
        assert_eq!(query.artist(), "Miles Davis");
    }

    #[test]
    fn test_artist_is_trimmed() {
        let query = AlbumQuery::from_raw(Some("   "), None, None).expect("valid");
        assert!(!query.is_filtered());
    }

    #[test]
    fn test_rejects_non_numeric_limit() {
        let err = AlbumQuery::from_raw(None, None, Some("ten")).unwrap_err();
        assert_eq!(err.field(), "limit");
        assert!(matches!(err, CoreError::InvalidValue { .. }));
    }

    #[test]
    fn test_rejects_zero_page_and_large_limit() {
        let err = AlbumQuery::from_raw(None, Some("0"), None).unwrap_err();
        assert_eq!(err.field(), "page");

        let err = AlbumQuery::from_raw(None, None, Some("101")).unwrap_err();
        assert!(matches!(err, CoreError::OutOfRange { max: 100, .. }));
    }

    #[test]
    fn test_offset_for_third_page() {
        let query = AlbumQuery::new("", 3, 20).expect("valid");
        assert_eq!(query.offset(), 40);
    }

    proptest! {
        #[test]
        fn prop_offset_is_page_minus_one_times_limit(page in 1u32..=MAX_PAGE, limit in 1u32..=MAX_LIMIT) {
            let query = AlbumQuery::new("x", page, limit).expect("in range");
            prop_assert_eq!(query.offset(), (i64::from(page) - 1) * i64::from(limit));
            prop_assert!(query.offset() >= 0);
        }

        #[test]
        fn prop_filtered_iff_artist_has_content(artist in ".{0,20}") {
            let query = AlbumQuery::new(artist.clone(), 1, 10).expect("in range");
            prop_assert_eq!(query.is_filtered(), !artist.trim().is_empty());
        }
    }
}
