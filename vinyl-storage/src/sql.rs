//! Driver-neutral SQL parameters and rows.
//!
//! The repository speaks in [`SqlValue`]s so that the same statements can run
//! against PostgreSQL or a scripted test double. Only the column types the
//! service actually reads are represented.

use std::error::Error;

use bytes::BytesMut;
use postgres_types::{to_sql_checked, IsNull, ToSql, Type};

use crate::database::{DbError, DbResult};

/// A single bound parameter or returned column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::Int(_) => "integer",
            SqlValue::Float(_) => "float",
            SqlValue::Text(_) => "text",
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<u32> for SqlValue {
    fn from(value: u32) -> Self {
        SqlValue::Int(i64::from(value))
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match (self, ty) {
            (SqlValue::Null, _) => Ok(IsNull::Yes),
            (SqlValue::Bool(v), &Type::BOOL) => v.to_sql(ty, out),
            (SqlValue::Int(v), &Type::INT2) => i16::try_from(*v)?.to_sql(ty, out),
            (SqlValue::Int(v), &Type::INT4) => i32::try_from(*v)?.to_sql(ty, out),
            (SqlValue::Int(v), &Type::INT8) => v.to_sql(ty, out),
            (SqlValue::Float(v), &Type::FLOAT4) => (*v as f32).to_sql(ty, out),
            (SqlValue::Float(v), &Type::FLOAT8) => v.to_sql(ty, out),
            (SqlValue::Text(v), _) if <&str as ToSql>::accepts(ty) => v.as_str().to_sql(ty, out),
            (value, ty) => Err(format!("cannot bind {} parameter as {}", value.type_name(), ty).into()),
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::BOOL | Type::INT2 | Type::INT4 | Type::INT8 | Type::FLOAT4 | Type::FLOAT8
        ) || <&str as ToSql>::accepts(ty)
    }

    to_sql_checked!();
}

/// Conversion from a returned column into a Rust value.
pub trait FromSqlValue: Sized {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String>;
}

impl FromSqlValue for String {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Text(v) => Ok(v.clone()),
            other => Err(format!("expected text, found {}", other.type_name())),
        }
    }
}

impl FromSqlValue for i64 {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Int(v) => Ok(*v),
            other => Err(format!("expected integer, found {}", other.type_name())),
        }
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Float(v) => Ok(*v),
            // COUNT and integer columns read as float are widened.
            SqlValue::Int(v) => Ok(*v as f64),
            other => Err(format!("expected float, found {}", other.type_name())),
        }
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Bool(v) => Ok(*v),
            other => Err(format!("expected bool, found {}", other.type_name())),
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}

/// One returned row, columns in select-list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlRow {
    values: Vec<SqlValue>,
}

impl SqlRow {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Read column `idx` as `T`, failing with [`DbError::Scan`].
    pub fn get<T: FromSqlValue>(&self, idx: usize) -> DbResult<T> {
        let value = self
            .values
            .get(idx)
            .ok_or_else(|| DbError::scan(idx, format!("row has only {} columns", self.values.len())))?;
        T::from_sql_value(value).map_err(|reason| DbError::scan(idx, reason))
    }
}

impl From<Vec<SqlValue>> for SqlRow {
    fn from(values: Vec<SqlValue>) -> Self {
        Self::new(values)
    }
}
