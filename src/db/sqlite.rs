//! SQLite database client implementation.
//!
//! Provides the `SqliteClient` struct that implements the `DatabaseClient` trait
//! for SQLite databases using sqlx.

use crate::db::{ColumnInfo, DatabaseClient, QueryResult, Row, Value};
use crate::error::{Result, SqlTableError};
use crate::query::{bind_named, PlaceholderStyle, QueryParameter};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{
    Column as SqlxColumn, ConnectOptions, Connection, Executor, Row as SqlxRow, Statement,
    TypeInfo, ValueRef,
};
use std::str::FromStr;
use std::time::Instant;
use tracing::debug;

/// SQLite database client holding a single connection.
#[derive(Debug)]
pub struct SqliteClient {
    conn: Option<SqliteConnection>,
}

impl SqliteClient {
    /// Opens a connection for a `sqlite:` connection string.
    ///
    /// The database file must already exist unless the string carries `?mode=rwc`.
    pub async fn connect(conn_str: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(conn_str)
            .map_err(|e| SqlTableError::connection(format!("Invalid connection string: {e}")))?;

        let conn = options.connect().await.map_err(|e| {
            SqlTableError::connection(format!("Cannot open SQLite database: {e}"))
        })?;

        debug!("Connected to SQLite");
        Ok(Self { conn: Some(conn) })
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn execute_query(
        &mut self,
        sql: &str,
        params: &[QueryParameter],
    ) -> Result<QueryResult> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| SqlTableError::connection("Connection is closed"))?;

        let bound = bind_named(sql, params, PlaceholderStyle::NumberedQuestion)?;
        let start = Instant::now();

        let statement = (&mut *conn)
            .prepare(&bound.sql)
            .await
            .map_err(|e| SqlTableError::query(e.to_string()))?;

        let columns: Vec<ColumnInfo> = statement
            .columns()
            .iter()
            .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
            .collect();

        let mut query = statement.query();
        for value in &bound.values {
            query = query.bind(value.as_str());
        }

        let rows = query
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| SqlTableError::query(e.to_string()))?;

        let rows: Vec<Row> = rows.iter().map(convert_row).collect();

        Ok(QueryResult::with_data(columns, rows).with_execution_time(start.elapsed()))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().await.map_err(|e| {
                SqlTableError::connection(format!("Failed to close connection: {e}"))
            })?;
        }
        Ok(())
    }
}

fn convert_row(row: &SqliteRow) -> Row {
    (0..row.columns().len())
        .map(|i| convert_value(row, i))
        .collect()
}

/// Converts one cell using the storage class of the value itself.
///
/// SQLite types values, not columns, so the declared column type is not used.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if !raw.is_null() => raw.type_info().name().to_uppercase(),
        _ => return Value::Null,
    };

    match type_name.as_str() {
        "INTEGER" => row
            .try_get::<i64, _>(index)
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" => row
            .try_get::<f64, _>(index)
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BOOLEAN" => row
            .try_get::<bool, _>(index)
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        _ => row
            .try_get::<String, _>(index)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
