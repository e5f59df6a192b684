//! Named query parameters.
//!
//! Callers name parameters the way they appear in the SQL (`@id`, `:id`);
//! sqlx binds by position, so drivers rewrite the query text through
//! [`bind_named`] before binding.

use crate::error::{Result, SqlTableError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Prefixes accepted in front of a parameter name.
const NAME_PREFIXES: [char; 2] = ['@', ':'];

/// One `(name, value)` pair. Values are always text at the binding boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParameter {
    pub name: String,
    pub value: String,
}

impl QueryParameter {
    /// Creates a new parameter.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parses `name=value`, splitting on the first `=`.
    pub fn parse(s: &str) -> Result<Self> {
        let (name, value) = s.split_once('=').ok_or_else(|| {
            SqlTableError::invalid_argument(format!(
                "Invalid parameter '{s}'. Expected NAME=VALUE"
            ))
        })?;

        let name = name.trim();
        let bare = name.trim_start_matches(NAME_PREFIXES).as_bytes();
        if bare.is_empty() {
            return Err(SqlTableError::invalid_argument(format!(
                "Invalid parameter '{s}'. Name must not be empty"
            )));
        }
        if !is_ident_start(bare[0]) || !bare.iter().all(|b| is_ident_char(*b)) {
            return Err(SqlTableError::invalid_argument(format!(
                "Invalid parameter '{s}'. Name must be '@' or ':' followed by letters, digits or '_'"
            )));
        }

        Ok(Self::new(name, value))
    }

    /// The name without its `@`/`:` prefix.
    pub fn bare_name(&self) -> &str {
        self.name.trim_start_matches(NAME_PREFIXES)
    }
}

impl<N: Into<String>, V: Into<String>> From<(N, V)> for QueryParameter {
    fn from((name, value): (N, V)) -> Self {
        Self::new(name, value)
    }
}

/// How a backend spells positional placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ... (PostgreSQL)
    Dollar,
    /// `?1`, `?2`, ... (SQLite)
    NumberedQuestion,
}

impl PlaceholderStyle {
    fn render(self, position: usize) -> String {
        match self {
            Self::Dollar => format!("${position}"),
            Self::NumberedQuestion => format!("?{position}"),
        }
    }
}

/// Query text rewritten to positional placeholders, with values in bind order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundQuery {
    pub sql: String,
    pub values: Vec<String>,
}

/// Rewrites `@name` / `:name` placeholders to positional ones.
///
/// Placeholders are matched to parameters by name, ignoring the prefix and
/// ASCII case. A name used more than once keeps a single position. Text inside
/// string literals (including `E'...'` escapes), quoted identifiers,
/// dollar-quoted bodies and comments is copied untouched, as are `@@name`,
/// `::type` and `:` inside array subscripts such as `arr[1:n]`.
///
/// Fails with a `Query` error when a placeholder has no matching parameter.
pub fn bind_named(
    sql: &str,
    params: &[QueryParameter],
    style: PlaceholderStyle,
) -> Result<BoundQuery> {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut values = Vec::new();
    // (param index, position) in order of first use
    let mut assigned: Vec<(usize, usize)> = Vec::new();
    let mut copied = 0;
    let mut brackets = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'E' | b'e'
                if bytes.get(i + 1) == Some(&b'\'')
                    && (i == 0 || !is_ident_char(bytes[i - 1])) =>
            {
                i = skip_escape_string(bytes, i + 1)
            }
            b'\'' | b'"' => i = skip_quoted(bytes, i),
            b'[' => {
                brackets += 1;
                i += 1;
            }
            b']' => {
                brackets = brackets.saturating_sub(1);
                i += 1;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => i = skip_line_comment(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
            b'$' => i = skip_dollar_quoted(bytes, i),
            b'@' if bytes.get(i + 1) == Some(&b'@') => i = scan_identifier(bytes, i + 2),
            b':' if bytes.get(i + 1) == Some(&b':') => i += 2,
            // array slice bound
            b':' if brackets > 0 => i += 1,
            b'@' | b':' if bytes.get(i + 1).is_some_and(|b| is_ident_start(*b)) => {
                let end = scan_identifier(bytes, i + 1);
                let name = &sql[i + 1..end];

                let index = params
                    .iter()
                    .position(|p| p.bare_name().eq_ignore_ascii_case(name))
                    .ok_or_else(|| {
                        SqlTableError::query(format!(
                            "No value supplied for parameter '{}'",
                            &sql[i..end]
                        ))
                    })?;

                let position = match assigned.iter().find(|(idx, _)| *idx == index) {
                    Some((_, position)) => *position,
                    None => {
                        values.push(params[index].value.clone());
                        assigned.push((index, values.len()));
                        values.len()
                    }
                };

                out.push_str(&sql[copied..i]);
                out.push_str(&style.render(position));
                copied = end;
                i = end;
            }
            _ => i += 1,
        }
    }
    out.push_str(&sql[copied..]);

    for (index, param) in params.iter().enumerate() {
        if !assigned.iter().any(|(idx, _)| *idx == index) {
            debug!("Parameter '{}' is not referenced by the query", param.name);
        }
    }

    Ok(BoundQuery { sql: out, values })
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn scan_identifier(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && is_ident_char(bytes[i]) {
        i += 1;
    }
    i
}

/// Skips a `'...'` or `"..."` run. Doubled quotes fall out naturally as two runs.
fn skip_quoted(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() && bytes[i] != quote {
        i += 1;
    }
    (i + 1).min(bytes.len())
}

/// Skips the body of an `E'...'` string, where a backslash escapes the next byte.
fn skip_escape_string(bytes: &[u8], quote: usize) -> usize {
    let mut i = quote + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\'' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_line_comment(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i < bytes.len() && bytes[i] != b'\n' {
        i += 1;
    }
    i
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return i + 2;
        }
        i += 1;
    }
    bytes.len()
}

/// Skips a PostgreSQL `$tag$ ... $tag$` body. A lone `$` or `$1` is left alone.
fn skip_dollar_quoted(bytes: &[u8], start: usize) -> usize {
    let tag_end = match bytes.get(start + 1) {
        Some(&b) if is_ident_start(b) => scan_identifier(bytes, start + 2),
        _ => start + 1,
    };
    if bytes.get(tag_end) != Some(&b'$') {
        return start + 1;
    }

    let tag = &bytes[start..=tag_end];
    let body = tag_end + 1;
    bytes[body..]
        .windows(tag.len())
        .position(|w| w == tag)
        .map(|offset| body + offset + tag.len())
        .unwrap_or(bytes.len())
}
