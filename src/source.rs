//! Work items and where they come from.
//!
//! A [`WorkItem`] is one reference identifier. A [`WorkItemSource`] yields
//! the current ordered list on demand; [`FileSource`] reads it from a data
//! file every time it is asked, so edits show up on the next `refresh`.
//!
//! # File Formats
//!
//! | Extension | Layout |
//! |-----------|--------|
//! | `.csv` | Header row; the first non-empty candidate column per row |
//! | `.json` | Array of strings, numbers or objects keyed by a candidate column |
//! | other | One identifier per line |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Header names accepted for the identifier column, in priority order.
pub const DEFAULT_COLUMNS: [&str; 5] = ["Reference No", "Reference", "Ref", "reference no", "RefNo"];

// ============================================================================
// WorkItem
// ============================================================================

/// One reference identifier to submit.
///
/// Compared by value. Duplicates are allowed; they only affect artifact
/// naming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItem(String);

impl WorkItem {
    /// Wraps an identifier.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkItem {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// WorkItemSource
// ============================================================================

/// Supplies the current ordered list of work items.
#[async_trait]
pub trait WorkItemSource: Send + Sync {
    /// Returns the items in their current order.
    ///
    /// The list may grow or shrink between calls.
    async fn current_items(&self) -> Result<Vec<WorkItem>>;
}

// ============================================================================
// FileSource
// ============================================================================

/// Layout of a source file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceFormat {
    Csv,
    Json,
    Lines,
}

impl SourceFormat {
    fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("csv") => Self::Csv,
            Some("json") => Self::Json,
            _ => Self::Lines,
        }
    }
}

/// Reads work items from a data file on every call.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    columns: Vec<String>,
}

impl FileSource {
    /// Creates a source for `path` using [`DEFAULT_COLUMNS`].
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            columns: DEFAULT_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    /// Replaces the candidate column names.
    #[must_use]
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    /// Returns the file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl WorkItemSource for FileSource {
    async fn current_items(&self) -> Result<Vec<WorkItem>> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::source(&self.path, e.to_string()))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

        let format = SourceFormat::from_path(&self.path);
        let items = match format {
            SourceFormat::Csv => parse_csv(text, &self.columns),
            SourceFormat::Json => parse_json(text, &self.columns),
            SourceFormat::Lines => Ok(parse_lines(text)),
        }
        .map_err(|message| Error::source(&self.path, message))?;

        debug!(
            path = %self.path.display(),
            ?format,
            count = items.len(),
            "Read work items"
        );
        Ok(items)
    }
}

// ============================================================================
// Parsers
// ============================================================================

/// Trims `raw` and wraps it unless it is empty.
fn item(raw: &str) -> Option<WorkItem> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| WorkItem::new(trimmed))
}

/// One identifier per line.
fn parse_lines(text: &str) -> Vec<WorkItem> {
    text.lines().filter_map(item).collect()
}

/// Header row plus data rows.
fn parse_csv(text: &str, columns: &[String]) -> std::result::Result<Vec<WorkItem>, String> {
    let mut records = csv_records(text)
        .into_iter()
        .filter(|record| record.iter().any(|f| !f.trim().is_empty()));

    let Some(header) = records.next() else {
        return Ok(Vec::new());
    };
    let header: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();

    let indices: Vec<usize> = columns
        .iter()
        .filter_map(|c| header.iter().position(|h| h == c))
        .collect();
    if indices.is_empty() {
        return Err(format!(
            "no identifier column in header (expected one of: {})",
            columns.join(", ")
        ));
    }

    Ok(records
        .filter_map(|fields| {
            indices
                .iter()
                .find_map(|&i| fields.get(i).and_then(|f| item(f)))
        })
        .collect())
}

/// Splits CSV text into records, honoring double quotes, `""` escapes and
/// line breaks inside quoted fields.
fn csv_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => record.push(std::mem::take(&mut field)),
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(ch),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}

/// Array of scalars or of objects keyed by a candidate column.
fn parse_json(text: &str, columns: &[String]) -> std::result::Result<Vec<WorkItem>, String> {
    let value: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
    let Value::Array(entries) = value else {
        return Err("expected a JSON array".to_string());
    };

    Ok(entries
        .iter()
        .filter_map(|entry| match entry {
            Value::Object(map) => columns
                .iter()
                .find_map(|c| map.get(c).and_then(scalar_item)),
            other => scalar_item(other),
        })
        .collect())
}

fn scalar_item(value: &Value) -> Option<WorkItem> {
    match value {
        Value::String(s) => item(s),
        Value::Number(n) => item(&n.to_string()),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
