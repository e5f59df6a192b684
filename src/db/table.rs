//! In-memory result table.
//!
//! `DataTable` is what an executor hands back to callers: named columns and
//! rows of dynamically typed cells, with a soft-failing textual cell lookup.

use super::{ColumnInfo, QueryResult, Row, Value};
use serde::{Deserialize, Serialize};

/// Tabular result of a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    columns: Vec<ColumnInfo>,
    rows: Vec<Row>,
}

impl DataTable {
    /// Creates an empty table with no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table from columns and rows.
    ///
    /// Rows shorter than the column list read as absent cells past their end.
    pub fn with_data(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Column metadata, in result order.
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// Rows, in result order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the table holds at least one row.
    pub fn has_data(&self) -> bool {
        !self.rows.is_empty()
    }

    /// Returns the position of the column with the given name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Returns the raw cell, or `None` when either index is out of range.
    pub fn value(&self, row: usize, column: usize) -> Option<&Value> {
        if column >= self.columns.len() {
            return None;
        }
        self.rows.get(row)?.get(column)
    }

    /// Returns the cell as text, or `None` when either index is out of range.
    pub fn get_cell(&self, row: usize, column: usize) -> Option<String> {
        self.value(row, column).map(Value::as_text)
    }

    /// Replaces the table contents with a driver result.
    pub fn fill(&mut self, result: QueryResult) {
        self.columns = result.columns;
        self.rows = result.rows;
    }

    /// Removes all rows and columns.
    pub fn clear(&mut self) {
        self.columns.clear();
        self.rows.clear();
    }
}

impl From<QueryResult> for DataTable {
    fn from(result: QueryResult) -> Self {
        Self::with_data(result.columns, result.rows)
    }
}
