//! Query execution for sqltable.
//!
//! This module holds the query descriptor, named parameter binding and the
//! retrying executor that turns a descriptor into a [`DataTable`](crate::db::DataTable).

pub mod executor;
pub mod params;

pub use executor::{execute_descriptor, QueryDescriptor, QueryExecutor, RetryPolicy};
pub use params::{bind_named, BoundQuery, PlaceholderStyle, QueryParameter};
