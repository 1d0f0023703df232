//! SQL issued by the album repository and how its failures are classified.

use std::sync::Arc;

use vinyl_api::repository::{
    COUNT_ALL_SQL, COUNT_FILTERED_SQL, CREATE_TABLE_SQL, LIST_ALL_SQL, LIST_FILTERED_SQL,
    TRUNCATE_SQL,
};
use vinyl_api::{AlbumRepository, DbClient, ErrorCode, RequestLedger};
use vinyl_core::AlbumQuery;
use vinyl_storage::{DbError, SqlValue};
use vinyl_test_utils::fixtures::*;
use vinyl_test_utils::ScriptedDatabase;

fn repository(db: &Arc<ScriptedDatabase>) -> AlbumRepository {
    AlbumRepository::new(DbClient::new(db.clone()))
}

#[tokio::test]
async fn test_filtered_listing_uses_pattern_and_offset() {
    let db = Arc::new(listing_database(&[blue_train()], 11));
    let ledger = RequestLedger::detached("vinyl-api");
    let query = AlbumQuery::new("coltrane", 2, 5).expect("valid query");

    let page = repository(&db).list_albums(&ledger, &query).await.expect("page");
    assert_eq!(page.total, 11);

    let statements = db.statements();
    assert_eq!(statements[0].statement, LIST_FILTERED_SQL);
    assert_eq!(
        statements[0].params,
        vec![
            SqlValue::from("%coltrane%"),
            SqlValue::from(5u32),
            SqlValue::Int(5),
        ]
    );
    assert_eq!(statements[1].statement, COUNT_FILTERED_SQL);
    assert_eq!(statements[1].params, vec![SqlValue::from("%coltrane%")]);
}

#[tokio::test]
async fn test_unfiltered_listing() {
    let db = Arc::new(listing_database(&[blue_train(), a_love_supreme()], 2));
    let ledger = RequestLedger::detached("vinyl-api");

    let page = repository(&db)
        .list_albums(&ledger, &AlbumQuery::default())
        .await
        .expect("page");
    assert_eq!(page.items.len(), 2);

    let statements = db.statements();
    assert_eq!(statements[0].statement, LIST_ALL_SQL);
    assert_eq!(statements[0].params, vec![SqlValue::from(10u32), SqlValue::Int(0)]);
    assert_eq!(statements[1].statement, COUNT_ALL_SQL);
    assert!(statements[1].params.is_empty());
}

#[tokio::test]
async fn test_empty_page_is_not_found_without_count() {
    let db = Arc::new(ScriptedDatabase::new().then_rows(Vec::new()));
    let ledger = RequestLedger::detached("vinyl-api");

    let err = repository(&db)
        .list_albums(&ledger, &AlbumQuery::default())
        .await
        .expect_err("empty page");

    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(db.call_count(), 1);
}

#[tokio::test]
async fn test_count_failure_discards_page() {
    let db = Arc::new(
        ScriptedDatabase::new()
            .then_rows(album_rows(&[blue_train()]))
            .then_error(DbError::query("statement timeout")),
    );
    let ledger = RequestLedger::detached("vinyl-api");

    let err = repository(&db)
        .list_albums(&ledger, &AlbumQuery::default())
        .await
        .expect_err("count failed");
    assert_eq!(err.code, ErrorCode::DatabaseError);

    let context = ledger.snapshot();
    assert_eq!(context.database.len(), 2);
    assert!(!context.database[0].is_error());
    assert!(context.database[1].is_error());
}

#[tokio::test]
async fn test_count_without_rows_is_database_error() {
    let db = Arc::new(
        ScriptedDatabase::new()
            .then_rows(album_rows(&[blue_train()]))
            .then_rows(Vec::new()),
    );
    let ledger = RequestLedger::detached("vinyl-api");

    let err = repository(&db)
        .list_albums(&ledger, &AlbumQuery::default())
        .await
        .expect_err("count returned nothing");
    assert_eq!(err.code, ErrorCode::DatabaseError);
}

#[tokio::test]
async fn test_malformed_row_is_database_error() {
    let db = Arc::new(ScriptedDatabase::new().then_rows(count_rows(1)));
    let ledger = RequestLedger::detached("vinyl-api");

    let err = repository(&db)
        .list_albums(&ledger, &AlbumQuery::default())
        .await
        .expect_err("wrong row shape");
    assert_eq!(err.code, ErrorCode::DatabaseError);
}

#[tokio::test]
async fn test_insert_batch_single_statement() {
    let db = Arc::new(ScriptedDatabase::new().then_affected(2));
    let ledger = RequestLedger::detached("vinyl-api");

    repository(&db)
        .insert_batch(&ledger, &[blue_train(), a_love_supreme()])
        .await
        .expect("insert");

    let statements = db.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].statement.starts_with("INSERT INTO albums"));
    assert_eq!(statements[0].params.len(), 8);
    assert_eq!(statements[0].params[3], SqlValue::Float(56.99));
}

#[tokio::test]
async fn test_insert_batch_empty_is_noop() {
    let db = Arc::new(ScriptedDatabase::new());
    let ledger = RequestLedger::detached("vinyl-api");

    repository(&db).insert_batch(&ledger, &[]).await.expect("no-op");

    assert_eq!(db.call_count(), 0);
    assert_eq!(ledger.snapshot().call_count(), 0);
}

#[tokio::test]
async fn test_constraint_violation_on_insert() {
    let db = Arc::new(ScriptedDatabase::new().then_error(DbError::Constraint {
        constraint: Some("albums_pkey".to_string()),
        message: "duplicate key".to_string(),
    }));
    let ledger = RequestLedger::detached("vinyl-api");

    let err = repository(&db).insert(&ledger, &blue_train()).await.expect_err("conflict");
    assert_eq!(err.code, ErrorCode::ConstraintViolation);
}

#[tokio::test]
async fn test_schema_statements() {
    let db = Arc::new(ScriptedDatabase::new().then_affected(0).then_affected(0));
    let ledger = RequestLedger::detached("vinyl-api");
    let repo = repository(&db);

    repo.create_table(&ledger).await.expect("create");
    repo.truncate(&ledger).await.expect("truncate");

    let statements: Vec<_> = db.statements().into_iter().map(|s| s.statement).collect();
    assert_eq!(statements, vec![CREATE_TABLE_SQL, TRUNCATE_SQL]);
}
