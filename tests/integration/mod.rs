//! Integration tests for sqltable.

pub mod executor_test;
pub mod postgres_test;
pub mod sqlite_test;
