//! Query execution with bounded retry.
//!
//! [`execute_descriptor`] runs one descriptor against a driver and returns a
//! fresh table. [`QueryExecutor`] wraps it with a mutable descriptor, the last
//! result and an executed flag.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::db::{DataTable, DatabaseClient, DatabaseDriver, QueryResult, SqlxDriver};
use crate::error::{Result, SqlTableError};
use crate::query::QueryParameter;

/// How many times a failing execution is attempted before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// Pause between attempts.
    pub delay: Duration,

    /// Only retry errors that look transient (timeouts, resets, deadlocks).
    pub transient_only: bool,
}

impl RetryPolicy {
    /// First attempt plus three retries.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

    /// Creates a policy with the given attempt bound, no delay and no classification.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: Duration::ZERO,
            transient_only: false,
        }
    }

    /// Sets the pause between attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Restricts retries to errors classified as transient.
    pub fn with_transient_only(mut self, transient_only: bool) -> Self {
        self.transient_only = transient_only;
        self
    }

    /// Returns true if `error`, raised by attempt number `attempt` (1-based), should be retried.
    pub fn should_retry(&self, attempt: u32, error: &SqlTableError) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }
        !self.transient_only || is_transient_error(error)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS)
    }
}

/// Determines if an error is transient and worth retrying.
fn is_transient_error(error: &SqlTableError) -> bool {
    if !matches!(
        error,
        SqlTableError::Connection(_) | SqlTableError::Query(_)
    ) {
        return false;
    }

    let error_str = error.to_string().to_lowercase();
    error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("timeout")
        || error_str.contains("temporarily unavailable")
        || error_str.contains("connection reset")
        || error_str.contains("broken pipe")
        || error_str.contains("deadlock")
        || error_str.contains("database is locked")
        || error_str.contains("could not serialize access")
}

/// Connection string, query text and parameters for one execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub connection_string: String,
    pub query: String,
    pub parameters: Vec<QueryParameter>,
}

impl QueryDescriptor {
    /// Creates a descriptor.
    pub fn new(
        connection_string: impl Into<String>,
        query: impl Into<String>,
        parameters: Vec<QueryParameter>,
    ) -> Self {
        Self {
            connection_string: connection_string.into(),
            query: query.into(),
            parameters,
        }
    }

    /// Checks that the connection string and query text are both present.
    ///
    /// Parameter names and values are not validated here.
    pub fn validate(&self) -> Result<()> {
        if self.connection_string.is_empty() {
            return Err(SqlTableError::invalid_argument("connection string is empty"));
        }
        if self.query.is_empty() {
            return Err(SqlTableError::invalid_argument("query text is empty"));
        }
        Ok(())
    }
}

/// Executes `descriptor` once, retrying per `policy`, and returns a new table.
///
/// A single connection is opened and reused by every attempt; it is closed
/// before returning on both success and failure. Connection failures are
/// returned as they are; execution failures that outlast the policy come back
/// as `ExecutionFailed` wrapping the last driver error.
pub async fn execute_descriptor(
    driver: &dyn DatabaseDriver,
    descriptor: &QueryDescriptor,
    policy: &RetryPolicy,
) -> Result<DataTable> {
    descriptor.validate()?;

    let mut client = driver.connect(&descriptor.connection_string).await?;
    let outcome = execute_with_retry(client.as_mut(), descriptor, policy).await;

    if let Err(e) = client.close().await {
        warn!("Failed to close connection: {}", e);
    }

    let result = outcome?;
    info!(
        "Query returned {} row(s) in {:?}",
        result.row_count(),
        result.execution_time
    );
    let mut table = DataTable::new();
    table.fill(result);
    Ok(table)
}

async fn execute_with_retry(
    client: &mut dyn DatabaseClient,
    descriptor: &QueryDescriptor,
    policy: &RetryPolicy,
) -> Result<QueryResult> {
    let mut attempt = 1;

    loop {
        debug!("Execution attempt {} of {}", attempt, policy.max_attempts);

        match client
            .execute_query(&descriptor.query, &descriptor.parameters)
            .await
        {
            Ok(result) => return Ok(result),
            Err(e) if policy.should_retry(attempt, &e) => {
                warn!(
                    "Execution attempt {} of {} failed, retrying: {}",
                    attempt, policy.max_attempts, e
                );
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
                attempt += 1;
            }
            Err(e) => return Err(SqlTableError::execution_failed(attempt, e)),
        }
    }
}

/// Holds a query descriptor and the table produced by its last execution.
///
/// The table is never absent: it starts empty and is replaced wholesale by
/// each successful [`execute`](Self::execute). A failed execution leaves the
/// previous table in place.
pub struct QueryExecutor {
    driver: Arc<dyn DatabaseDriver>,
    descriptor: QueryDescriptor,
    table: DataTable,
    executed: bool,
    retry_policy: RetryPolicy,
}

impl QueryExecutor {
    /// Creates an executor with an empty descriptor.
    pub fn new(driver: Arc<dyn DatabaseDriver>) -> Self {
        Self {
            driver,
            descriptor: QueryDescriptor::default(),
            table: DataTable::new(),
            executed: false,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Creates an executor backed by sqlx.
    pub fn with_sqlx() -> Self {
        Self::new(Arc::new(SqlxDriver))
    }

    /// Creates an executor with a pre-filled descriptor.
    pub fn with_descriptor(driver: Arc<dyn DatabaseDriver>, descriptor: QueryDescriptor) -> Self {
        Self {
            descriptor,
            ..Self::new(driver)
        }
    }

    /// Replaces the retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub fn connection_string(&self) -> &str {
        &self.descriptor.connection_string
    }

    pub fn query(&self) -> &str {
        &self.descriptor.query
    }

    pub fn parameters(&self) -> &[QueryParameter] {
        &self.descriptor.parameters
    }

    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    pub fn set_connection(&mut self, connection_string: impl Into<String>) {
        self.descriptor.connection_string = connection_string.into();
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.descriptor.query = query.into();
    }

    pub fn set_parameters(&mut self, parameters: Vec<QueryParameter>) {
        self.descriptor.parameters = parameters;
    }

    /// Appends one parameter after the existing ones.
    pub fn add_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.descriptor
            .parameters
            .push(QueryParameter::new(name, value));
    }

    /// Removes all parameters; connection, query and table are untouched.
    pub fn clear_parameters(&mut self) {
        self.descriptor.parameters.clear();
    }

    /// The current result table.
    pub fn table(&self) -> &DataTable {
        &self.table
    }

    /// True once an execution or [`assign_table`](Self::assign_table) has completed.
    ///
    /// This says nothing about whether the table has rows.
    pub fn is_executed(&self) -> bool {
        self.executed
    }

    pub fn has_data(&self) -> bool {
        self.table.has_data()
    }

    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    pub fn column_count(&self) -> usize {
        self.table.column_count()
    }

    /// Returns the cell as text, or `None` when either index is out of range.
    pub fn get_cell(&self, row: usize, column: usize) -> Option<String> {
        self.table.get_cell(row, column)
    }

    /// Runs the stored descriptor and replaces the table with the result.
    pub async fn execute(&mut self) -> Result<&DataTable> {
        let table =
            execute_descriptor(self.driver.as_ref(), &self.descriptor, &self.retry_policy).await?;

        self.table = table;
        self.executed = true;
        Ok(&self.table)
    }

    /// Stores the given descriptor fields, then behaves as [`execute`](Self::execute).
    pub async fn execute_with(
        &mut self,
        connection_string: impl Into<String>,
        query: impl Into<String>,
        parameters: Vec<QueryParameter>,
    ) -> Result<&DataTable> {
        self.descriptor = QueryDescriptor::new(connection_string, query, parameters);
        self.execute().await
    }

    /// Replaces the table without touching the driver and marks the executor as executed.
    pub fn assign_table(&mut self, table: DataTable) {
        self.table = table;
        self.executed = true;
    }

    /// Clears the descriptor, the table and the executed flag.
    pub fn reset(&mut self) {
        self.descriptor = QueryDescriptor::default();
        self.table.clear();
        self.executed = false;
    }

    /// Consumes the executor, keeping only its table.
    pub fn into_table(self) -> DataTable {
        self.table
    }
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field(
                "connection_string",
                &crate::db::redact_connection_string(&self.descriptor.connection_string),
            )
            .field("query", &self.descriptor.query)
            .field("parameters", &self.descriptor.parameters.len())
            .field("rows", &self.table.row_count())
            .field("executed", &self.executed)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}
