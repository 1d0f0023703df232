//! Album repository.
//!
//! All SQL for the `albums` table lives here. Store failures are mapped into
//! the API taxonomy as soon as they are detected.

use vinyl_core::{Album, AlbumQuery, Paginated};
use vinyl_storage::{DbError, SqlRow, SqlValue};

use crate::context::RequestLedger;
use crate::db::DbClient;
use crate::error::{map_db_error, ApiError, ApiResult};

/// Ledger component name for repository calls.
pub const REPOSITORY_COMPONENT: &str = "albumsRepository";

pub const LIST_FILTERED_SQL: &str = "SELECT id, title, artist, price::float8 FROM albums \
     WHERE artist ILIKE $1 ORDER BY id LIMIT $2 OFFSET $3";
pub const COUNT_FILTERED_SQL: &str = "SELECT COUNT(*) FROM albums WHERE artist ILIKE $1";
pub const LIST_ALL_SQL: &str =
    "SELECT id, title, artist, price::float8 FROM albums ORDER BY id LIMIT $1 OFFSET $2";
pub const COUNT_ALL_SQL: &str = "SELECT COUNT(*) FROM albums";

pub const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS albums (\
     id TEXT PRIMARY KEY, \
     title TEXT NOT NULL, \
     artist TEXT NOT NULL, \
     price NUMERIC(10, 2))";
pub const TRUNCATE_SQL: &str = "TRUNCATE TABLE albums";

const UPSERT_PREFIX: &str = "INSERT INTO albums (id, title, artist, price) VALUES ";
const UPSERT_SUFFIX: &str = " ON CONFLICT (id) DO UPDATE SET title = EXCLUDED.title, \
     artist = EXCLUDED.artist, price = EXCLUDED.price";

/// ILIKE pattern matching `artist` anywhere, with LIKE metacharacters escaped.
pub fn artist_pattern(artist: &str) -> String {
    let mut pattern = String::with_capacity(artist.len() + 2);
    pattern.push('%');
    for c in artist.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Multi-row upsert statement for `rows` albums.
fn upsert_sql(rows: usize) -> String {
    let values = (0..rows)
        .map(|i| {
            let n = i * 4;
            format!("(${}, ${}, ${}, ${}::float8)", n + 1, n + 2, n + 3, n + 4)
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}{}{}", UPSERT_PREFIX, values, UPSERT_SUFFIX)
}

fn album_params(album: &Album) -> [SqlValue; 4] {
    [
        SqlValue::from(album.id.as_str()),
        SqlValue::from(album.title.as_str()),
        SqlValue::from(album.artist.as_str()),
        SqlValue::from(album.price),
    ]
}

fn scan_album(row: &SqlRow) -> Result<Album, DbError> {
    Ok(Album {
        id: row.get(0)?,
        title: row.get(1)?,
        artist: row.get(2)?,
        price: row.get::<Option<f64>>(3)?.unwrap_or_default(),
    })
}

fn scan_count(rows: &[SqlRow]) -> Result<i64, DbError> {
    rows.first().ok_or(DbError::NoRows)?.get(0)
}

/// Reads and writes album rows through an instrumented [`DbClient`].
#[derive(Clone)]
pub struct AlbumRepository {
    db: DbClient,
}

impl AlbumRepository {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }

    /// One page of albums plus the total number of matches.
    ///
    /// An empty page is `not_found`. A failing count discards the page.
    pub async fn list_albums(
        &self,
        ledger: &RequestLedger,
        query: &AlbumQuery,
    ) -> ApiResult<Paginated<Album>> {
        let limit = SqlValue::from(query.limit());
        let offset = SqlValue::Int(query.offset());

        let (list_sql, count_sql, list_params, count_params) = if query.is_filtered() {
            let pattern = SqlValue::from(artist_pattern(query.artist()));
            (
                LIST_FILTERED_SQL,
                COUNT_FILTERED_SQL,
                vec![pattern.clone(), limit, offset],
                vec![pattern],
            )
        } else {
            (LIST_ALL_SQL, COUNT_ALL_SQL, vec![limit, offset], Vec::new())
        };

        let rows = self
            .db
            .query(ledger, REPOSITORY_COMPONENT, list_sql, &list_params)
            .await
            .map_err(|e| map_db_error(&e))?;

        let items = rows
            .iter()
            .map(scan_album)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_db_error(&e))?;

        if items.is_empty() {
            return Err(map_db_error(&DbError::NoRows));
        }

        let count_rows = self
            .db
            .query(ledger, REPOSITORY_COMPONENT, count_sql, &count_params)
            .await
            .map_err(|e| map_db_error(&e))?;
        // A count that returns nothing is a broken store, not an empty listing.
        let total = scan_count(&count_rows).map_err(|e| match e {
            DbError::NoRows => ApiError::database_error(),
            other => map_db_error(&other),
        })?;

        Ok(Paginated::new(items, total))
    }

    /// Insert one album, updating it in place if the id exists.
    pub async fn insert(&self, ledger: &RequestLedger, album: &Album) -> ApiResult<()> {
        self.insert_batch(ledger, std::slice::from_ref(album)).await
    }

    /// Upsert all `albums` in a single statement. An empty batch is a no-op.
    pub async fn insert_batch(&self, ledger: &RequestLedger, albums: &[Album]) -> ApiResult<()> {
        if albums.is_empty() {
            return Ok(());
        }

        let params: Vec<SqlValue> = albums.iter().flat_map(album_params).collect();
        self.db
            .execute(ledger, REPOSITORY_COMPONENT, &upsert_sql(albums.len()), &params)
            .await
            .map_err(|e| map_db_error(&e))?;
        Ok(())
    }

    pub async fn create_table(&self, ledger: &RequestLedger) -> ApiResult<()> {
        self.db
            .execute(ledger, REPOSITORY_COMPONENT, CREATE_TABLE_SQL, &[])
            .await
            .map_err(|e| map_db_error(&e))?;
        Ok(())
    }

    pub async fn truncate(&self, ledger: &RequestLedger) -> ApiResult<()> {
        self.db
            .execute(ledger, REPOSITORY_COMPONENT, TRUNCATE_SQL, &[])
            .await
            .map_err(|e| map_db_error(&e))?;
        Ok(())
    }
}
