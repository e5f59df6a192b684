//! Rendering of result tables for the command line.

use serde_json::{json, Value as JsonValue};
use sqltable::db::{DataTable, Value};

/// Renders the table as aligned text with a row count footer.
pub fn render_text(table: &DataTable) -> String {
    let headers: Vec<String> = table.columns().iter().map(|c| c.name.clone()).collect();
    let rows: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| row.iter().map(Value::to_display_string).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let mut out = String::new();
    if !headers.is_empty() {
        out.push_str(&format_line(&headers, &widths));
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&format_line(&rule, &widths));
        for row in &rows {
            out.push_str(&format_line(row, &widths));
        }
    }

    let count = table.row_count();
    out.push_str(&format!("({} row{})\n", count, if count == 1 { "" } else { "s" }));
    out
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    format!("{}\n", line.join(" | ").trim_end())
}

/// Renders the table as JSON: column names plus rows of cell text, NULL as null.
pub fn render_json(table: &DataTable) -> String {
    let columns: Vec<JsonValue> = table
        .columns()
        .iter()
        .map(|c| json!({ "name": c.name, "type": c.data_type }))
        .collect();

    let rows: Vec<JsonValue> = table
        .rows()
        .iter()
        .map(|row| {
            JsonValue::Array(
                row.iter()
                    .map(|v| match v {
                        Value::Null => JsonValue::Null,
                        other => JsonValue::String(other.as_text()),
                    })
                    .collect(),
            )
        })
        .collect();

    json!({ "columns": columns, "rows": rows }).to_string()
}
