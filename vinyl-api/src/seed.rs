//! Catalogue seeding.
//!
//! Recreates the `albums` table contents from a fixed catalogue. Used by the
//! `seed` binary and by database-backed tests.

use vinyl_core::Album;

use crate::context::RequestLedger;
use crate::error::ApiResult;
use crate::repository::AlbumRepository;

const CATALOGUE: [(&str, &str, &str, f64); 20] = [
    ("1", "Blue Train", "John Coltrane", 56.99),
    ("2", "Jeru", "Gerry Mulligan", 17.99),
    ("3", "Sarah Vaughan and Clifford Brown", "Sarah Vaughan", 39.99),
    ("4", "Kind of Blue", "Miles Davis", 56.99),
    ("5", "Everlong", "Blink-182", 19.99),
    ("6", "The Wall", "Blink-182", 19.99),
    ("7", "Going to California", "Blink-182", 19.99),
    ("8", "The One And Only", "Blink-182", 19.99),
    ("9", "A Love Supreme", "John Coltrane", 49.99),
    ("10", "Bitches Brew", "Miles Davis", 39.99),
    ("11", "Take Five", "Dave Brubeck", 24.99),
    ("12", "Giant Steps", "John Coltrane", 29.99),
    ("13", "Ella and Louis", "Ella Fitzgerald", 34.99),
    ("14", "What's Going On", "Marvin Gaye", 28.99),
    ("15", "All the Things You Are", "Ella Fitzgerald", 32.99),
    ("16", "In a Silent Way", "Miles Davis", 36.99),
    ("17", "Untitled", "Blink-182", 21.99),
    ("18", "Mingus Ah Um", "Charles Mingus", 27.99),
    ("19", "Sketches of Spain", "Miles Davis", 42.99),
    ("20", "Dookie", "Green Day", 18.99),
];

/// The seed catalogue.
pub fn seed_albums() -> Vec<Album> {
    CATALOGUE
        .iter()
        .map(|&(id, title, artist, price)| Album::new(id, title, artist, price))
        .collect()
}

/// Create the table if needed, empty it and load the seed catalogue.
///
/// Returns the number of albums written.
pub async fn seed_catalogue(repository: &AlbumRepository, ledger: &RequestLedger) -> ApiResult<usize> {
    let albums = seed_albums();
    repository.create_table(ledger).await?;
    repository.truncate(ledger).await?;
    repository.insert_batch(ledger, &albums).await?;
    tracing::info!(count = albums.len(), "Album catalogue seeded");
    Ok(albums.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_seed_ids_are_unique() {
        let albums = seed_albums();
        let ids: HashSet<_> = albums.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids.len(), albums.len());
    }

    #[test]
    fn test_seed_contains_blue_train() {
        assert!(seed_albums().contains(&Album::new("1", "Blue Train", "John Coltrane", 56.99)));
    }
}
