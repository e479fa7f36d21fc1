//! Two-column tag file codec: `<value>\t<path>\n` per row.
//!
//! Used for the four index files and both manifests.

use std::collections::HashMap;
use std::fmt;

/// A skipped tag-file line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexWarning {
    /// Bag-relative path of the tag file.
    pub file: String,
    /// 1-based line number.
    pub line: usize,
    pub reason: String,
}

impl fmt::Display for IndexWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.reason)
    }
}

/// Append-only builder for a tag file. Row order is insertion order.
#[derive(Debug, Default, Clone)]
pub struct TagFileBuilder {
    buf: String,
}

impl TagFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: impl fmt::Display, path: &str) {
        use fmt::Write;
        // Writing into a String cannot fail.
        let _ = writeln!(self.buf, "{value}\t{path}");
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.into_bytes()
    }
}

/// One parsed row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRow {
    pub line: usize,
    pub value: String,
    pub path: String,
}

/// Split a row into `(value, path)` on the first tab. The path is kept
/// verbatim since member names may carry spaces; both halves must be
/// non-empty.
fn split_row(line: &str) -> Option<(&str, &str)> {
    let (value, path) = line.split_once('\t')?;
    let value = value.trim();
    if value.is_empty() || path.is_empty() {
        return None;
    }
    Some((value, path))
}

/// Parse a tag file, skipping blank and malformed lines.
///
/// Lines longer than `max_line_bytes` are skipped as malformed.
pub fn parse_rows(
    file: &str,
    content: &[u8],
    max_line_bytes: usize,
    warnings: &mut Vec<IndexWarning>,
) -> Vec<TagRow> {
    let text = String::from_utf8_lossy(content);
    let mut rows = Vec::new();

    for (idx, raw) in text.split('\n').enumerate() {
        let line_no = idx + 1;
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.trim().is_empty() {
            continue;
        }
        if line.len() > max_line_bytes {
            warnings.push(IndexWarning {
                file: file.to_string(),
                line: line_no,
                reason: format!("line exceeds {max_line_bytes} bytes"),
            });
            continue;
        }
        match split_row(line) {
            Some((value, path)) => rows.push(TagRow {
                line: line_no,
                value: value.to_string(),
                path: path.to_string(),
            }),
            None => warnings.push(IndexWarning {
                file: file.to_string(),
                line: line_no,
                reason: "expected <value>\\t<path>".to_string(),
            }),
        }
    }

    rows
}

/// Parse a tag file into `path -> value`, converting each value with
/// `convert`. Rows whose value fails to convert are skipped with a warning.
/// A later row for the same path replaces an earlier one.
pub fn parse_table<T>(
    file: &str,
    content: &[u8],
    max_line_bytes: usize,
    warnings: &mut Vec<IndexWarning>,
    convert: impl Fn(&str) -> Result<T, String>,
) -> HashMap<String, T> {
    let mut table = HashMap::new();
    for row in parse_rows(file, content, max_line_bytes, warnings) {
        match convert(&row.value) {
            Ok(value) => {
                table.insert(row.path, value);
            }
            Err(reason) => warnings.push(IndexWarning {
                file: file.to_string(),
                line: row.line,
                reason,
            }),
        }
    }
    table
}
