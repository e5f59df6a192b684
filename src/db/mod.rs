//! Database abstraction layer for sqltable.
//!
//! Provides a trait-based interface for database operations, allowing
//! different database backends to be used interchangeably.

mod mock;
mod postgres;
mod sqlite;
mod table;
mod types;

pub use mock::{MockDatabaseClient, MockDatabaseDriver, RecordedExecution};
pub use postgres::PostgresClient;
pub use sqlite::SqliteClient;
pub use table::DataTable;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::error::{Result, SqlTableError};
use crate::query::QueryParameter;
use async_trait::async_trait;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Postgres,
    Sqlite,
}

impl DatabaseBackend {
    /// Returns the backend as a string for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Picks the backend from the scheme of a connection string.
    pub fn from_connection_string(conn_str: &str) -> Result<Self> {
        let scheme = conn_str
            .split_once(':')
            .map(|(scheme, _)| scheme.to_lowercase())
            .ok_or_else(|| {
                SqlTableError::connection(
                    "Connection string has no scheme. Expected postgres://... or sqlite:...",
                )
            })?;

        match scheme.as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(SqlTableError::connection(format!(
                "Unsupported scheme '{other}'. Expected 'postgres', 'postgresql' or 'sqlite'"
            ))),
        }
    }
}

/// Opens connections. The executor talks to the database only through this seam.
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Opens one connection for the given connection string.
    async fn connect(&self, conn_str: &str) -> Result<Box<dyn DatabaseClient>>;
}

/// An open connection.
///
/// All database operations are async and return Results with SqlTableError.
#[async_trait]
pub trait DatabaseClient: Send {
    /// Executes a SQL query with named parameters and returns the materialized result.
    async fn execute_query(&mut self, sql: &str, params: &[QueryParameter])
        -> Result<QueryResult>;

    /// Closes the connection. Closing twice is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Driver backed by sqlx, choosing PostgreSQL or SQLite from the connection string.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxDriver;

#[async_trait]
impl DatabaseDriver for SqlxDriver {
    async fn connect(&self, conn_str: &str) -> Result<Box<dyn DatabaseClient>> {
        match DatabaseBackend::from_connection_string(conn_str)? {
            DatabaseBackend::Postgres => Ok(Box::new(PostgresClient::connect(conn_str).await?)),
            DatabaseBackend::Sqlite => Ok(Box::new(SqliteClient::connect(conn_str).await?)),
        }
    }
}

/// Returns a display-safe form of a connection string with any password masked.
pub fn redact_connection_string(conn_str: &str) -> String {
    match url::Url::parse(conn_str) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("****"));
            url.to_string()
        }
        _ => conn_str.to_string(),
    }
}
