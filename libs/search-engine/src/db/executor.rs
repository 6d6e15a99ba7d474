//! SQL execution seam
//!
//! The translators only build [`SelectQuery`] values; running them is the job of a
//! [`SqlExecutor`]. [`PgExecutor`] is the PostgreSQL implementation over a `sqlx`
//! pool. Tests substitute in-memory executors.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row as _, TypeInfo};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::search::query_builder::{BindValue, SelectQuery};
use crate::{Error, Result};

/// A decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Numeric(Decimal),
    Text(String),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Json(JsonValue),
}

/// One result row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: BTreeMap<String, SqlValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: SqlValue) -> Self {
        self.columns.insert(column.into(), value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: SqlValue) {
        self.columns.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.get(column)
    }

    pub fn take(&mut self, column: &str) -> Option<SqlValue> {
        self.columns.remove(column)
    }

    pub fn get_i64(&self, column: &str) -> Result<i64> {
        match self.required(column)? {
            SqlValue::Int(v) => Ok(*v),
            SqlValue::Numeric(v) => v
                .to_i64()
                .ok_or_else(|| mistyped(column, "an integer", &SqlValue::Numeric(*v))),
            other => Err(mistyped(column, "an integer", other)),
        }
    }

    pub fn get_f64(&self, column: &str) -> Result<f64> {
        match self.required(column)? {
            SqlValue::Float(v) => Ok(*v),
            SqlValue::Int(v) => Ok(*v as f64),
            SqlValue::Numeric(v) => v
                .to_f64()
                .ok_or_else(|| mistyped(column, "a number", &SqlValue::Numeric(*v))),
            other => Err(mistyped(column, "a number", other)),
        }
    }

    pub fn get_bool(&self, column: &str) -> Result<bool> {
        match self.required(column)? {
            SqlValue::Bool(v) => Ok(*v),
            other => Err(mistyped(column, "a boolean", other)),
        }
    }

    pub fn get_str(&self, column: &str) -> Result<&str> {
        self.get_opt_str(column)?
            .ok_or_else(|| Error::Executor(format!("column '{}' is NULL", column)))
    }

    /// Text value of `column`; a missing column and SQL NULL both read as `None`.
    pub fn get_opt_str(&self, column: &str) -> Result<Option<&str>> {
        match self.columns.get(column) {
            None | Some(SqlValue::Null) => Ok(None),
            Some(SqlValue::Text(v)) => Ok(Some(v.as_str())),
            Some(other) => Err(mistyped(column, "text", other)),
        }
    }

    fn required(&self, column: &str) -> Result<&SqlValue> {
        match self.columns.get(column) {
            Some(SqlValue::Null) => Err(Error::Executor(format!("column '{}' is NULL", column))),
            Some(v) => Ok(v),
            None => Err(Error::Executor(format!("column '{}' missing from row", column))),
        }
    }
}

fn mistyped(column: &str, expected: &str, found: &SqlValue) -> Error {
    Error::Executor(format!(
        "column '{}' is not {}: {:?}",
        column, expected, found
    ))
}

/// Runs built queries. Implementations own connection handling and retries.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Execute `query` and return all rows in result order.
    async fn execute(&self, query: &SelectQuery) -> Result<Vec<Row>>;
}

/// PostgreSQL executor over a `sqlx` connection pool.
#[derive(Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_max_size)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SqlExecutor for PgExecutor {
    async fn execute(&self, query: &SelectQuery) -> Result<Vec<Row>> {
        let mut q = sqlx::query(query.sql());
        for value in query.args() {
            q = match value {
                BindValue::Text(v) => q.bind(v.clone()),
                BindValue::BigInt(v) => q.bind(*v),
                BindValue::BigIntArray(vs) => q.bind(vs.clone()),
                BindValue::Numeric(v) => q.bind(*v),
                BindValue::Float(v) => q.bind(*v),
                BindValue::Timestamp(v) => q.bind(*v),
                BindValue::Date(v) => q.bind(*v),
                BindValue::Boolean(v) => q.bind(*v),
            };
        }

        let rows = q.fetch_all(&self.pool).await.map_err(Error::Database)?;
        rows.iter().map(decode_row).collect()
    }
}

fn decode_row(row: &PgRow) -> Result<Row> {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx, column.type_info().name())?;
        out.insert(column.name(), value);
    }
    Ok(out)
}

fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> Result<SqlValue> {
    let value = match type_name {
        "BOOL" => row.try_get::<Option<bool>, _>(idx)?.map(SqlValue::Bool),
        "INT2" => row
            .try_get::<Option<i16>, _>(idx)?
            .map(|v| SqlValue::Int(v.into())),
        "INT4" => row
            .try_get::<Option<i32>, _>(idx)?
            .map(|v| SqlValue::Int(v.into())),
        "INT8" => row.try_get::<Option<i64>, _>(idx)?.map(SqlValue::Int),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)?
            .map(|v| SqlValue::Float(v.into())),
        "FLOAT8" => row.try_get::<Option<f64>, _>(idx)?.map(SqlValue::Float),
        "NUMERIC" => row.try_get::<Option<Decimal>, _>(idx)?.map(SqlValue::Numeric),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
            row.try_get::<Option<String>, _>(idx)?.map(SqlValue::Text)
        }
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)?
            .map(SqlValue::Timestamp),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(idx)?
            .map(|v| SqlValue::Timestamp(v.and_utc())),
        "DATE" => row.try_get::<Option<NaiveDate>, _>(idx)?.map(SqlValue::Date),
        "JSON" | "JSONB" => row.try_get::<Option<JsonValue>, _>(idx)?.map(SqlValue::Json),
        other => {
            return Err(Error::Executor(format!(
                "unsupported column type {} at index {}",
                other, idx
            )))
        }
    };
    Ok(value.unwrap_or(SqlValue::Null))
}
