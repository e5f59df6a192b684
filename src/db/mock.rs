//! Mock database driver for testing.
//!
//! Returns scripted results, can inject failures, and records every
//! connection and bound parameter list so tests can assert on them.

use super::{ColumnInfo, DatabaseClient, DatabaseDriver, QueryResult, Value};
use crate::error::{Result, SqlTableError};
use crate::query::QueryParameter;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// One recorded call to `execute_query`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedExecution {
    pub sql: String,
    pub params: Vec<QueryParameter>,
}

#[derive(Debug, Default)]
struct MockState {
    connects: usize,
    closes: usize,
    executions: Vec<RecordedExecution>,
    failures_remaining: usize,
    connect_error: Option<String>,
}

/// A mock driver whose connections return predefined results.
#[derive(Debug, Clone, Default)]
pub struct MockDatabaseDriver {
    result: Option<QueryResult>,
    state: Arc<Mutex<MockState>>,
}

impl MockDatabaseDriver {
    /// Creates a driver that echoes SELECT queries as a single-row result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a driver whose every execution returns `result`.
    pub fn with_result(result: QueryResult) -> Self {
        Self {
            result: Some(result),
            ..Self::default()
        }
    }

    /// Makes the first `count` executions fail with a query error.
    pub fn failing_first(self, count: usize) -> Self {
        self.lock().failures_remaining = count;
        self
    }

    /// Makes every connection attempt fail.
    pub fn failing_connect(self, message: impl Into<String>) -> Self {
        self.lock().connect_error = Some(message.into());
        self
    }

    pub fn connect_count(&self) -> usize {
        self.lock().connects
    }

    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    pub fn execution_count(&self) -> usize {
        self.lock().executions.len()
    }

    /// Every execution seen so far, in call order.
    pub fn executions(&self) -> Vec<RecordedExecution> {
        self.lock().executions.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DatabaseDriver for MockDatabaseDriver {
    async fn connect(&self, _conn_str: &str) -> Result<Box<dyn DatabaseClient>> {
        let mut state = self.lock();
        if let Some(message) = &state.connect_error {
            return Err(SqlTableError::connection(message.clone()));
        }
        state.connects += 1;

        Ok(Box::new(MockDatabaseClient {
            result: self.result.clone(),
            state: Arc::clone(&self.state),
            closed: false,
        }))
    }
}

/// A connection handed out by [`MockDatabaseDriver`].
#[derive(Debug)]
pub struct MockDatabaseClient {
    result: Option<QueryResult>,
    state: Arc<Mutex<MockState>>,
    closed: bool,
}

impl MockDatabaseClient {
    fn echo(sql: &str) -> QueryResult {
        // Parse simple SELECT queries and return mock results
        if sql.trim_start().to_uppercase().starts_with("SELECT") {
            QueryResult::with_data(
                vec![ColumnInfo::new("result", "text")],
                vec![vec![Value::String(format!("Mock result for: {sql}"))]],
            )
        } else {
            QueryResult::new()
        }
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute_query(
        &mut self,
        sql: &str,
        params: &[QueryParameter],
    ) -> Result<QueryResult> {
        if self.closed {
            return Err(SqlTableError::connection("Connection is closed"));
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.executions.push(RecordedExecution {
            sql: sql.to_string(),
            params: params.to_vec(),
        });

        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(SqlTableError::query(format!(
                "Mock failure on execution {}",
                state.executions.len()
            )));
        }

        let result = match &self.result {
            Some(result) => result.clone(),
            None => Self::echo(sql),
        };
        Ok(result.with_execution_time(Duration::from_millis(1)))
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .closes += 1;
        }
        Ok(())
    }
}
