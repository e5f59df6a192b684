//! Executor integration tests against the mock driver.
//!
//! Covers argument checks, parameter ordering, retry bounds and the table
//! lifecycle without a real database.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use sqltable::db::{ColumnInfo, DataTable, MockDatabaseDriver, QueryResult, Value};
use sqltable::query::{execute_descriptor, QueryDescriptor, QueryExecutor, RetryPolicy};
use sqltable::{QueryParameter, SqlTableError};

const CONN: &str = "mock://test";

fn users_result() -> QueryResult {
    QueryResult::with_data(
        vec![
            ColumnInfo::new("id", "INT4"),
            ColumnInfo::new("email", "TEXT"),
        ],
        vec![
            vec![Value::Int(1), Value::from("alice@example.com")],
            vec![Value::Int(2), Value::from("bob@example.com")],
            vec![Value::Int(3), Value::Null],
        ],
    )
}

fn executor_for(driver: &MockDatabaseDriver) -> QueryExecutor {
    QueryExecutor::new(Arc::new(driver.clone()))
}

#[tokio::test]
async fn test_new_executor_has_empty_table() {
    let executor = executor_for(&MockDatabaseDriver::new());

    assert!(!executor.is_executed());
    assert!(!executor.has_data());
    assert_eq!(executor.row_count(), 0);
    assert_eq!(executor.get_cell(0, 0), None);
    assert_eq!(executor.table(), &DataTable::new());
}

#[tokio::test]
async fn test_empty_connection_string_fails_before_connecting() {
    let driver = MockDatabaseDriver::new();
    let mut executor = executor_for(&driver);
    executor.set_query("SELECT 1");

    let err = executor.execute().await.unwrap_err();

    assert!(matches!(err, SqlTableError::InvalidArgument(_)));
    assert_eq!(driver.connect_count(), 0);
    assert!(!executor.is_executed());
}

#[tokio::test]
async fn test_empty_query_fails_before_connecting() {
    let driver = MockDatabaseDriver::new();
    let mut executor = executor_for(&driver);

    let err = executor
        .execute_with(CONN, "", vec![QueryParameter::new("@a", "1")])
        .await
        .unwrap_err();

    assert!(matches!(err, SqlTableError::InvalidArgument(_)));
    assert_eq!(driver.connect_count(), 0);
}

#[tokio::test]
async fn test_zero_row_result() {
    let driver = MockDatabaseDriver::with_result(QueryResult::with_data(
        vec![ColumnInfo::new("id", "INT4")],
        vec![],
    ));
    let mut executor = executor_for(&driver);

    executor
        .execute_with(CONN, "SELECT id FROM users WHERE false", vec![])
        .await
        .unwrap();

    assert!(executor.is_executed());
    assert!(!executor.has_data());
    assert_eq!(executor.row_count(), 0);
    assert_eq!(executor.column_count(), 1);
}

#[tokio::test]
async fn test_parameters_passed_in_order_added() {
    let driver = MockDatabaseDriver::with_result(users_result());
    let mut executor = executor_for(&driver);
    executor.set_connection(CONN);
    executor.set_query("SELECT * FROM users WHERE id > @min AND email LIKE @pattern AND id < @max");
    executor.add_parameter("@pattern", "%@example.com");
    executor.add_parameter("@min", "0");
    executor.add_parameter("@max", "10");

    executor.execute().await.unwrap();

    let executions = driver.executions();
    assert_eq!(executions.len(), 1);
    assert_eq!(
        executions[0].params,
        vec![
            QueryParameter::new("@pattern", "%@example.com"),
            QueryParameter::new("@min", "0"),
            QueryParameter::new("@max", "10"),
        ]
    );
}

#[tokio::test]
async fn test_get_cell_soft_fails_out_of_range() {
    let driver = MockDatabaseDriver::with_result(users_result());
    let mut executor = executor_for(&driver);
    executor
        .execute_with(CONN, "SELECT id, email FROM users", vec![])
        .await
        .unwrap();

    assert_eq!(executor.get_cell(0, 1).as_deref(), Some("alice@example.com"));
    assert_eq!(executor.get_cell(2, 0).as_deref(), Some("3"));
    assert_eq!(executor.get_cell(2, 1).as_deref(), Some(""));

    let rows = executor.row_count();
    let cols = executor.column_count();
    assert_eq!(executor.get_cell(rows, 0), None);
    assert_eq!(executor.get_cell(0, cols), None);
    assert_eq!(executor.get_cell(rows + 100, cols + 100), None);
}

#[tokio::test]
async fn test_reset_returns_to_initial_state() {
    let driver = MockDatabaseDriver::with_result(users_result());
    let mut executor = executor_for(&driver);
    executor
        .execute_with(
            CONN,
            "SELECT * FROM users WHERE id = @id",
            vec![QueryParameter::new("@id", "1")],
        )
        .await
        .unwrap();
    assert!(executor.has_data());

    executor.reset();

    assert_eq!(executor.connection_string(), "");
    assert_eq!(executor.query(), "");
    assert!(executor.parameters().is_empty());
    assert!(!executor.is_executed());
    assert_eq!(executor.row_count(), 0);
    assert!(!executor.has_data());
}

#[tokio::test]
async fn test_succeeds_on_third_attempt() {
    let driver = MockDatabaseDriver::with_result(users_result()).failing_first(2);
    let mut executor = executor_for(&driver);

    let table = executor
        .execute_with(CONN, "SELECT * FROM users", vec![])
        .await
        .unwrap();

    assert_eq!(table.row_count(), 3);
    assert_eq!(driver.execution_count(), 3);
    assert_eq!(driver.connect_count(), 1);
    assert_eq!(driver.close_count(), 1);
    assert!(executor.is_executed());
}

#[tokio::test]
async fn test_fails_after_four_attempts_and_keeps_table() {
    let driver = MockDatabaseDriver::with_result(users_result()).failing_first(4);
    let mut executor = executor_for(&driver);

    let previous = DataTable::with_data(
        vec![ColumnInfo::new("kept", "TEXT")],
        vec![vec![Value::from("before")]],
    );
    executor.assign_table(previous.clone());

    let err = executor
        .execute_with(CONN, "SELECT * FROM users", vec![])
        .await
        .unwrap_err();

    match &err {
        SqlTableError::ExecutionFailed { attempts, source } => {
            assert_eq!(*attempts, 4);
            assert!(matches!(**source, SqlTableError::Query(_)));
            assert!(source.to_string().contains("execution 4"));
        }
        other => panic!("Expected ExecutionFailed, got {other:?}"),
    }

    assert_eq!(driver.execution_count(), 4);
    assert_eq!(driver.close_count(), 1);
    assert_eq!(executor.table(), &previous);
}

#[tokio::test]
async fn test_assign_table_bypasses_driver() {
    let driver = MockDatabaseDriver::new();
    let mut executor = executor_for(&driver);

    executor.assign_table(DataTable::from(users_result()));

    assert!(executor.is_executed());
    assert!(executor.has_data());
    assert_eq!(executor.row_count(), 3);
    assert_eq!(driver.connect_count(), 0);
}

#[tokio::test]
async fn test_assign_empty_table_marks_executed() {
    let mut executor = executor_for(&MockDatabaseDriver::new());
    executor.assign_table(DataTable::new());

    assert!(executor.is_executed());
    assert!(!executor.has_data());
}

#[tokio::test]
async fn test_execute_descriptor_returns_fresh_table() {
    let driver = MockDatabaseDriver::with_result(users_result());
    let descriptor = QueryDescriptor::new(CONN, "SELECT * FROM users", vec![]);

    let first = execute_descriptor(&driver, &descriptor, &RetryPolicy::default())
        .await
        .unwrap();
    let second = execute_descriptor(&driver, &descriptor, &RetryPolicy::default())
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(second.row_count(), 3);
}

#[tokio::test]
async fn test_into_table_keeps_result() {
    let driver = MockDatabaseDriver::with_result(users_result());
    let mut executor = executor_for(&driver);
    executor
        .execute_with(CONN, "SELECT * FROM users", vec![])
        .await
        .unwrap();

    let table = executor.into_table();
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.column_index("email"), Some(1));
}

#[tokio::test]
async fn test_with_descriptor_executes_prefilled_query() {
    let driver = MockDatabaseDriver::with_result(users_result());
    let descriptor = QueryDescriptor::new(
        CONN,
        "SELECT * FROM users WHERE id = @id",
        vec![QueryParameter::new("@id", "2")],
    );
    let mut executor = QueryExecutor::with_descriptor(Arc::new(driver.clone()), descriptor);

    assert_eq!(executor.connection_string(), CONN);
    assert_eq!(executor.parameters().len(), 1);

    executor.execute().await.unwrap();

    let executions = driver.executions();
    assert_eq!(executions[0].sql, "SELECT * FROM users WHERE id = @id");
    assert_eq!(executions[0].params, vec![QueryParameter::new("@id", "2")]);
    assert_eq!(executor.row_count(), 3);
}
