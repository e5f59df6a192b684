//! Error types for sqltable.
//!
//! Defines the main error enum used throughout the crate.

use thiserror::Error;

/// Main error type for sqltable operations.
#[derive(Error, Debug)]
pub enum SqlTableError {
    /// Connection string or query text missing at execution time.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The driver kept failing until the retry policy gave up.
    #[error("Execution failed after {attempts} attempt(s): {source}")]
    ExecutionFailed {
        attempts: u32,
        #[source]
        source: Box<SqlTableError>,
    },

    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (syntax errors, unbound parameters, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// Configuration errors (invalid config file, missing connection, etc.)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SqlTableError {
    /// Creates an invalid argument error with the given message.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Wraps the last driver error once retries are exhausted.
    pub fn execution_failed(attempts: u32, source: SqlTableError) -> Self {
        Self::ExecutionFailed {
            attempts,
            source: Box::new(source),
        }
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "Invalid Argument",
            Self::ExecutionFailed { .. } => "Execution Failed",
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Config(_) => "Configuration Error",
        }
    }

    /// Returns the innermost driver error for an `ExecutionFailed`, or self.
    pub fn root_cause(&self) -> &SqlTableError {
        match self {
            Self::ExecutionFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type alias using SqlTableError.
pub type Result<T> = std::result::Result<T, SqlTableError>;
