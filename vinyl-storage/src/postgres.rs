//! PostgreSQL backend using deadpool-postgres.

use async_trait::async_trait;
use deadpool_postgres::{Pool, PoolError};
use postgres_types::{ToSql, Type};
use tokio_postgres::error::SqlState;
use tokio_postgres::Row;

use crate::database::{Database, DbError, DbResult};
use crate::sql::{SqlRow, SqlValue};

/// [`Database`] backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PostgresDatabase {
    pool: Pool,
}

impl PostgresDatabase {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn get_conn(&self) -> DbResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(map_pool_error)
    }
}

fn bind(params: &[SqlValue]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

#[async_trait]
impl Database for PostgresDatabase {
    async fn query(&self, statement: &str, params: &[SqlValue]) -> DbResult<Vec<SqlRow>> {
        let conn = self.get_conn().await?;
        let rows = conn
            .query(statement, &bind(params))
            .await
            .map_err(map_pg_error)?;
        rows.iter().map(convert_row).collect()
    }

    async fn execute(&self, statement: &str, params: &[SqlValue]) -> DbResult<u64> {
        let conn = self.get_conn().await?;
        conn.execute(statement, &bind(params))
            .await
            .map_err(map_pg_error)
    }

    async fn ping(&self) -> DbResult<()> {
        let conn = self.get_conn().await?;
        conn.simple_query("SELECT 1").await.map_err(map_pg_error)?;
        Ok(())
    }
}

fn convert_row(row: &Row) -> DbResult<SqlRow> {
    let mut values = Vec::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let ty = column.type_();
        let value = match *ty {
            Type::BOOL => row.try_get::<_, Option<bool>>(idx).map(|v| v.map(SqlValue::Bool)),
            Type::INT2 => row
                .try_get::<_, Option<i16>>(idx)
                .map(|v| v.map(|n| SqlValue::Int(i64::from(n)))),
            Type::INT4 => row
                .try_get::<_, Option<i32>>(idx)
                .map(|v| v.map(|n| SqlValue::Int(i64::from(n)))),
            Type::INT8 => row.try_get::<_, Option<i64>>(idx).map(|v| v.map(SqlValue::Int)),
            Type::FLOAT4 => row
                .try_get::<_, Option<f32>>(idx)
                .map(|v| v.map(|n| SqlValue::Float(f64::from(n)))),
            Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx).map(|v| v.map(SqlValue::Float)),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => row
                .try_get::<_, Option<String>>(idx)
                .map(|v| v.map(SqlValue::Text)),
            _ => {
                return Err(DbError::scan(
                    idx,
                    format!("unsupported column type {} for {}", ty, column.name()),
                ))
            }
        };
        let value = value.map_err(|e| DbError::scan(idx, e.to_string()))?;
        values.push(value.unwrap_or(SqlValue::Null));
    }
    Ok(SqlRow::new(values))
}

/// Classify a driver error. Driver text is kept for logs only.
fn map_pg_error(err: tokio_postgres::Error) -> DbError {
    if err.is_closed() {
        return DbError::connection(err.to_string());
    }

    let Some(db_error) = err.as_db_error() else {
        return DbError::query(err.to_string());
    };

    let code = db_error.code();
    if *code == SqlState::UNIQUE_VIOLATION
        || *code == SqlState::FOREIGN_KEY_VIOLATION
        || *code == SqlState::NOT_NULL_VIOLATION
        || *code == SqlState::CHECK_VIOLATION
    {
        DbError::Constraint {
            constraint: db_error.constraint().map(str::to_string),
            message: db_error.message().to_string(),
        }
    } else if *code == SqlState::CONNECTION_EXCEPTION
        || *code == SqlState::CONNECTION_FAILURE
        || *code == SqlState::ADMIN_SHUTDOWN
        || *code == SqlState::TOO_MANY_CONNECTIONS
    {
        DbError::connection(db_error.message())
    } else {
        DbError::query(db_error.message())
    }
}

fn map_pool_error(err: PoolError) -> DbError {
    match err {
        PoolError::Backend(e) => map_pg_error(e),
        other => DbError::connection(other.to_string()),
    }
}
