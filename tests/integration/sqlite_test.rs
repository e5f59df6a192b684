//! Executor integration tests against a real SQLite database.
//!
//! Each test gets its own database file in a temporary directory.

use std::path::Path;

use pretty_assertions::assert_eq;
use sqltable::query::QueryExecutor;
use sqltable::{QueryParameter, SqlTableError};
use tempfile::TempDir;

fn connection_string(dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", dir.join("test.db").display())
}

/// Creates a users table with three rows and returns the connection string.
async fn seeded_database(dir: &TempDir) -> String {
    let conn = connection_string(dir.path());
    let mut executor = QueryExecutor::with_sqlx();

    executor
        .execute_with(
            conn.clone(),
            "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL, name TEXT)",
            vec![],
        )
        .await
        .unwrap();

    for (id, email, name) in [
        ("1", "alice@example.com", Some("Alice")),
        ("2", "bob@example.com", Some("Bob")),
        ("3", "carol@example.com", None),
    ] {
        let query = match name {
            Some(_) => "INSERT INTO users (id, email, name) VALUES (@id, @email, @name)",
            None => "INSERT INTO users (id, email) VALUES (@id, @email)",
        };
        let mut params = vec![
            QueryParameter::new("@id", id),
            QueryParameter::new("@email", email),
        ];
        if let Some(name) = name {
            params.push(QueryParameter::new("@name", name));
        }
        executor
            .execute_with(conn.clone(), query, params)
            .await
            .unwrap();
    }

    conn
}

#[tokio::test]
async fn test_select_with_parameter() {
    let dir = TempDir::new().unwrap();
    let conn = seeded_database(&dir).await;

    let mut executor = QueryExecutor::with_sqlx();
    executor.set_connection(conn);
    executor.set_query("SELECT id, email, name FROM users WHERE id >= @min ORDER BY id");
    executor.add_parameter("@min", "2");

    executor.execute().await.unwrap();

    assert!(executor.is_executed());
    assert_eq!(executor.row_count(), 2);
    assert_eq!(executor.column_count(), 3);
    assert_eq!(executor.get_cell(0, 0).as_deref(), Some("2"));
    assert_eq!(executor.get_cell(0, 1).as_deref(), Some("bob@example.com"));
    assert_eq!(executor.get_cell(1, 2).as_deref(), Some(""));
    assert_eq!(executor.get_cell(2, 0), None);
}

#[tokio::test]
async fn test_zero_rows_keeps_columns() {
    let dir = TempDir::new().unwrap();
    let conn = seeded_database(&dir).await;

    let mut executor = QueryExecutor::with_sqlx();
    executor
        .execute_with(
            conn,
            "SELECT id, email FROM users WHERE email = @email",
            vec![QueryParameter::new("@email", "nobody@example.com")],
        )
        .await
        .unwrap();

    assert!(!executor.has_data());
    assert_eq!(executor.row_count(), 0);
    let names: Vec<&str> = executor
        .table()
        .columns()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["id", "email"]);
}

#[tokio::test]
async fn test_repeated_execute_does_not_accumulate() {
    let dir = TempDir::new().unwrap();
    let conn = seeded_database(&dir).await;

    let mut executor = QueryExecutor::with_sqlx();
    executor.set_connection(conn);
    executor.set_query("SELECT id FROM users");

    executor.execute().await.unwrap();
    executor.execute().await.unwrap();

    assert_eq!(executor.row_count(), 3);
}

#[tokio::test]
async fn test_injection_attempt_is_bound_as_text() {
    let dir = TempDir::new().unwrap();
    let conn = seeded_database(&dir).await;

    let mut executor = QueryExecutor::with_sqlx();
    executor
        .execute_with(
            conn.clone(),
            "SELECT id FROM users WHERE email = @email",
            vec![QueryParameter::new("@email", "x' OR '1'='1")],
        )
        .await
        .unwrap();
    assert_eq!(executor.row_count(), 0);

    executor
        .execute_with(conn, "SELECT COUNT(*) FROM users", vec![])
        .await
        .unwrap();
    assert_eq!(executor.get_cell(0, 0).as_deref(), Some("3"));
}

#[tokio::test]
async fn test_bad_sql_fails_after_retries() {
    let dir = TempDir::new().unwrap();
    let conn = seeded_database(&dir).await;

    let mut executor = QueryExecutor::with_sqlx();
    let err = executor
        .execute_with(conn, "SELECT * FROM no_such_table", vec![])
        .await
        .unwrap_err();

    assert!(matches!(err, SqlTableError::ExecutionFailed { attempts: 4, .. }));
    assert!(err.to_string().contains("no_such_table"));
    assert!(!executor.is_executed());
}

#[tokio::test]
async fn test_missing_parameter_surfaces_as_execution_failed() {
    let dir = TempDir::new().unwrap();
    let conn = seeded_database(&dir).await;

    let mut executor = QueryExecutor::with_sqlx();
    let err = executor
        .execute_with(conn, "SELECT * FROM users WHERE id = @id", vec![])
        .await
        .unwrap_err();

    assert!(matches!(err, SqlTableError::ExecutionFailed { .. }));
    assert!(matches!(err.root_cause(), SqlTableError::Query(_)));
}

#[tokio::test]
async fn test_missing_database_is_connection_error() {
    let dir = TempDir::new().unwrap();
    let conn = format!("sqlite://{}", dir.path().join("missing.db").display());

    let mut executor = QueryExecutor::with_sqlx();
    let err = executor
        .execute_with(conn, "SELECT 1", vec![])
        .await
        .unwrap_err();

    assert!(matches!(err, SqlTableError::Connection(_)));
}

#[tokio::test]
async fn test_unsupported_scheme_is_connection_error() {
    let mut executor = QueryExecutor::with_sqlx();
    let err = executor
        .execute_with("mssql://localhost/app", "SELECT 1", vec![])
        .await
        .unwrap_err();

    assert!(matches!(err, SqlTableError::Connection(_)));
}
