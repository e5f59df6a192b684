//! sqltable - run a parameterized SQL query and materialize the result as a table.
//!
//! This library exposes the core modules for use by the CLI and integration tests.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod query;

pub use db::{DataTable, Value};
pub use error::{Result, SqlTableError};
pub use query::{QueryExecutor, QueryParameter, RetryPolicy};
