//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient` trait
//! for PostgreSQL databases using sqlx.

use crate::db::{ColumnInfo, DatabaseClient, QueryResult, Row, Value};
use crate::error::{Result, SqlTableError};
use crate::query::{bind_named, PlaceholderStyle, QueryParameter};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow, Postgres};
use sqlx::{
    Column as SqlxColumn, ConnectOptions, Connection, Executor, Row as SqlxRow, Statement,
    TypeInfo,
};
use std::str::FromStr;
use std::time::Instant;
use tracing::debug;
use url::Url;

/// PostgreSQL database client holding a single connection.
#[derive(Debug)]
pub struct PostgresClient {
    conn: Option<PgConnection>,
}

impl PostgresClient {
    /// Opens a connection for a `postgres://` connection string.
    pub async fn connect(conn_str: &str) -> Result<Self> {
        let options = PgConnectOptions::from_str(conn_str)
            .map_err(|e| SqlTableError::connection(format!("Invalid connection string: {e}")))?;

        let conn = options
            .connect()
            .await
            .map_err(|e| map_connection_error(e, conn_str))?;

        debug!("Connected to PostgreSQL");
        Ok(Self { conn: Some(conn) })
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    /// Runs `sql` with its named parameters bound as `text`.
    ///
    /// Comparisons against non-text columns need an explicit cast in the
    /// query, e.g. `WHERE id = @id::int`; otherwise the server rejects the
    /// operator.
    async fn execute_query(
        &mut self,
        sql: &str,
        params: &[QueryParameter],
    ) -> Result<QueryResult> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| SqlTableError::connection("Connection is closed"))?;

        let bound = bind_named(sql, params, PlaceholderStyle::Dollar)?;
        let start = Instant::now();

        // Every parameter is declared as text so the server coerces through explicit casts.
        // Preparing first gives column metadata even when no rows come back.
        let text_type = <&str as sqlx::Type<Postgres>>::type_info();
        let param_types = vec![text_type; bound.values.len()];
        let statement = (&mut *conn)
            .prepare_with(&bound.sql, &param_types)
            .await
            .map_err(|e| SqlTableError::query(format_query_error(e)))?;

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
            .map_err(|e| SqlTableError::query(format_query_error(e)))?;

        let rows: Vec<Row> = rows.iter().map(convert_row).collect();

        Ok(QueryResult::with_data(columns, rows).with_execution_time(start.elapsed()))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .await
                .map_err(|e| SqlTableError::connection(format!("Failed to close connection: {e}")))?;
        }
        Ok(())
    }
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),

        "FLOAT8" | "DOUBLE PRECISION" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        // For all other types, try to get as string
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, conn_str: &str) -> SqlTableError {
    let url = Url::parse(conn_str).ok();
    let host = url
        .as_ref()
        .and_then(|u| u.host_str().map(String::from))
        .unwrap_or_else(|| "localhost".to_string());
    let port = url.as_ref().and_then(Url::port).unwrap_or(5432);
    let user = url
        .as_ref()
        .map(|u| u.username().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    let database = url
        .as_ref()
        .and_then(|u| u.path().strip_prefix('/').map(String::from))
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        SqlTableError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        SqlTableError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        SqlTableError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("ssl") || error_str.contains("tls") {
        SqlTableError::connection(
            "Server requires SSL. Add '?sslmode=require' to connection string.".to_string(),
        )
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        SqlTableError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        SqlTableError::connection(error.to_string())
    }
}

/// Formats a query error with PostgreSQL detail and hint if available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }

        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }

        if let Some(table) = pg_error.table() {
            result.push_str("\n  TABLE: ");
            result.push_str(table);
        }

        if let Some(column) = pg_error.column() {
            result.push_str("\n  COLUMN: ");
            result.push_str(column);
        }
    }

    result
}
