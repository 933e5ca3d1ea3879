//! In-memory tabular document model.
//!
//! A [`Document`] is an ordered list of named [`Column`]s whose rows are
//! aligned by position. Every column carries an explicit [`ColumnData`]
//! variant, so operations dispatch on the column kind instead of guessing
//! it from the values each time.
//!
//! - [`Cell`] - A single value, used at the load/export/literal boundaries
//! - [`ColumnKind`] - Kind tag (numeric, text, datetime, categorical, raw)
//! - [`ColumnData`] - Typed column storage, `None` meaning missing
//! - [`Column`] - Named column
//! - [`Document`] - Equal-length columns with unique names

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::DocumentError;

// =============================================================================
// Scalar helpers
// =============================================================================

/// Datetime layouts accepted when parsing text, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
];

/// Date-only layouts; the time is set to midnight. Month-first wins over
/// day-first for slashed dates.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%d.%m.%Y", "%d-%b-%Y", "%B %d, %Y"];

/// Parse a number, ignoring surrounding whitespace. NaN counts as unparseable.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Parse a datetime from any of the supported layouts (RFC 3339 included).
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Render a number the way exports and the preview show it: whole values
/// without a fractional part, everything else in shortest round-trip form.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Render a datetime as `YYYY-MM-DD HH:MM:SS`, keeping sub-seconds when present.
pub fn format_datetime(value: &NaiveDateTime) -> String {
    if value.nanosecond() == 0 {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S%.f").to_string()
    }
}

/// Nanoseconds since the Unix epoch, as used by numeric/datetime conversion.
pub fn datetime_to_nanos(value: &NaiveDateTime) -> Option<f64> {
    value.and_utc().timestamp_nanos_opt().map(|n| n as f64)
}

/// Inverse of [`datetime_to_nanos`]. Out-of-range values yield `None`.
pub fn nanos_to_datetime(nanos: f64) -> Option<NaiveDateTime> {
    if !nanos.is_finite() || nanos.abs() > i64::MAX as f64 {
        return None;
    }
    let nanos = nanos as i64;
    let secs = nanos.div_euclid(1_000_000_000);
    let subsec = nanos.rem_euclid(1_000_000_000) as u32;
    DateTime::from_timestamp(secs, subsec).map(|dt| dt.naive_utc())
}

// =============================================================================
// Cell
// =============================================================================

/// A single value crossing the model boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Number(f64),
    Text(String),
    Datetime(NaiveDateTime),
    /// Opaque content (nested JSON, whole-file text).
    Raw(String),
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Text form of the value, `None` for missing.
    pub fn render(&self) -> Option<String> {
        match self {
            Cell::Missing => None,
            Cell::Number(n) => Some(format_number(*n)),
            Cell::Text(s) | Cell::Raw(s) => Some(s.clone()),
            Cell::Datetime(dt) => Some(format_datetime(dt)),
        }
    }

    /// JSON form used by the preview and the JSON exporter.
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Missing => Value::Null,
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(Value::Number)
                        .unwrap_or(Value::Null)
                }
            }
            Cell::Text(s) | Cell::Raw(s) => Value::String(s.clone()),
            Cell::Datetime(dt) => Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Some(s) => f.write_str(&s),
            None => Ok(()),
        }
    }
}

// =============================================================================
// Column kind
// =============================================================================

/// The representation a column's values are stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
    Datetime,
    Categorical,
    Raw,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Text => "text",
            ColumnKind::Datetime => "datetime",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Raw => "raw",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Column data
// =============================================================================

/// Typed storage for one column. `None` is a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Datetime(Vec<Option<NaiveDateTime>>),
    /// Codes index into `categories`; categories are kept in their sort order.
    Categorical {
        categories: Vec<String>,
        codes: Vec<Option<usize>>,
    },
    Raw(Vec<Option<String>>),
}

impl ColumnData {
    /// Build a numeric column, storing NaN as missing.
    pub fn numeric(values: impl IntoIterator<Item = Option<f64>>) -> Self {
        ColumnData::Numeric(
            values
                .into_iter()
                .map(|v| v.filter(|n| !n.is_nan()))
                .collect(),
        )
    }

    /// Build a categorical column from labels. `categories` must list every label.
    pub fn categorical(categories: Vec<String>, labels: &[Option<String>]) -> Self {
        let lookup: HashMap<&str, usize> = categories
            .iter()
            .enumerate()
            .map(|(code, label)| (label.as_str(), code))
            .collect();
        let codes = labels
            .iter()
            .map(|label| label.as_deref().and_then(|l| lookup.get(l).copied()))
            .collect();
        ColumnData::Categorical { categories, codes }
    }

    /// Infer the column kind from loaded cells.
    ///
    /// All non-missing values numeric (or numeric text) gives a numeric
    /// column, all datetimes a datetime column, all raw a raw column and an
    /// entirely missing column is numeric. Anything else becomes text.
    pub fn infer(cells: Vec<Cell>) -> Self {
        let mut numeric = true;
        let mut datetime = true;
        let mut raw = true;
        let mut seen = false;

        for cell in &cells {
            match cell {
                Cell::Missing => continue,
                Cell::Number(_) => {
                    datetime = false;
                    raw = false;
                }
                Cell::Text(s) => {
                    if parse_number(s).is_none() {
                        numeric = false;
                    }
                    datetime = false;
                    raw = false;
                }
                Cell::Datetime(_) => {
                    numeric = false;
                    raw = false;
                }
                Cell::Raw(_) => {
                    numeric = false;
                    datetime = false;
                }
            }
            seen = true;
        }

        if !seen || numeric {
            return ColumnData::numeric(cells.iter().map(|c| match c {
                Cell::Number(n) => Some(*n),
                Cell::Text(s) => parse_number(s),
                _ => None,
            }));
        }
        if datetime {
            return ColumnData::Datetime(
                cells
                    .into_iter()
                    .map(|c| match c {
                        Cell::Datetime(dt) => Some(dt),
                        _ => None,
                    })
                    .collect(),
            );
        }
        if raw {
            return ColumnData::Raw(cells.into_iter().map(|c| c.render()).collect());
        }
        ColumnData::Text(cells.into_iter().map(|c| c.render()).collect())
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Text(_) => ColumnKind::Text,
            ColumnData::Datetime(_) => ColumnKind::Datetime,
            ColumnData::Categorical { .. } => ColumnKind::Categorical,
            ColumnData::Raw(_) => ColumnKind::Raw,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) | ColumnData::Raw(v) => v.len(),
            ColumnData::Datetime(v) => v.len(),
            ColumnData::Categorical { codes, .. } => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnData::Numeric(v) => v.get(row).is_some_and(Option::is_none),
            ColumnData::Text(v) | ColumnData::Raw(v) => v.get(row).is_some_and(Option::is_none),
            ColumnData::Datetime(v) => v.get(row).is_some_and(Option::is_none),
            ColumnData::Categorical { codes, .. } => codes.get(row).is_some_and(Option::is_none),
        }
    }

    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_missing(i)).count()
    }

    /// Value at `row` as a [`Cell`]; categoricals come back as their label.
    pub fn cell(&self, row: usize) -> Cell {
        match self {
            ColumnData::Numeric(v) => v.get(row).copied().flatten().map_or(Cell::Missing, Cell::Number),
            ColumnData::Text(v) => v.get(row).cloned().flatten().map_or(Cell::Missing, Cell::Text),
            ColumnData::Raw(v) => v.get(row).cloned().flatten().map_or(Cell::Missing, Cell::Raw),
            ColumnData::Datetime(v) => v.get(row).copied().flatten().map_or(Cell::Missing, Cell::Datetime),
            ColumnData::Categorical { categories, codes } => codes
                .get(row)
                .copied()
                .flatten()
                .and_then(|c| categories.get(c))
                .map_or(Cell::Missing, |l| Cell::Text(l.clone())),
        }
    }

    /// Text form of the value at `row`, `None` when missing.
    pub fn render(&self, row: usize) -> Option<String> {
        self.cell(row).render()
    }

    /// Every value rendered as text, preserving missing cells.
    pub fn rendered(&self) -> Vec<Option<String>> {
        (0..self.len()).map(|i| self.render(i)).collect()
    }

    /// New column holding the rows at `indices`, in that order.
    pub fn take(&self, indices: &[usize]) -> Self {
        fn pick<T: Clone>(values: &[Option<T>], indices: &[usize]) -> Vec<Option<T>> {
            indices.iter().map(|&i| values.get(i).cloned().flatten()).collect()
        }
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(pick(v, indices)),
            ColumnData::Text(v) => ColumnData::Text(pick(v, indices)),
            ColumnData::Raw(v) => ColumnData::Raw(pick(v, indices)),
            ColumnData::Datetime(v) => ColumnData::Datetime(pick(v, indices)),
            ColumnData::Categorical { categories, codes } => ColumnData::Categorical {
                categories: categories.clone(),
                codes: pick(codes, indices),
            },
        }
    }

    /// Parse a user literal under this column's rules.
    ///
    /// Numeric and datetime columns need a parseable literal, categorical
    /// columns an existing category. Text and raw accept anything.
    pub fn coerce_literal(&self, literal: &str) -> Option<Cell> {
        match self {
            ColumnData::Numeric(_) => parse_number(literal).map(Cell::Number),
            ColumnData::Datetime(_) => parse_datetime(literal).map(Cell::Datetime),
            ColumnData::Categorical { categories, .. } => categories
                .iter()
                .find(|c| c.as_str() == literal)
                .map(|c| Cell::Text(c.clone())),
            ColumnData::Text(_) => Some(Cell::Text(literal.to_string())),
            ColumnData::Raw(_) => Some(Cell::Raw(literal.to_string())),
        }
    }

    /// Store `value` at `row`. Returns false when the value does not fit the
    /// column kind or the row does not exist; the column is left as it was.
    pub fn set(&mut self, row: usize, value: &Cell) -> bool {
        if row >= self.len() {
            return false;
        }
        match (self, value) {
            (ColumnData::Numeric(v), Cell::Number(n)) => v[row] = Some(*n).filter(|n| !n.is_nan()),
            (ColumnData::Datetime(v), Cell::Datetime(dt)) => v[row] = Some(*dt),
            (ColumnData::Text(v), Cell::Text(s)) | (ColumnData::Raw(v), Cell::Raw(s)) => {
                v[row] = Some(s.clone())
            }
            (ColumnData::Categorical { categories, codes }, Cell::Text(label)) => {
                match categories.iter().position(|c| c == label) {
                    Some(code) => codes[row] = Some(code),
                    None => return false,
                }
            }
            (ColumnData::Numeric(v), Cell::Missing) => v[row] = None,
            (ColumnData::Datetime(v), Cell::Missing) => v[row] = None,
            (ColumnData::Text(v), Cell::Missing) | (ColumnData::Raw(v), Cell::Missing) => v[row] = None,
            (ColumnData::Categorical { codes, .. }, Cell::Missing) => codes[row] = None,
            _ => return false,
        }
        true
    }

    /// Compare two non-missing rows in the column's natural order (numeric,
    /// chronological, category order, lexicographic).
    pub fn compare_rows(&self, a: usize, b: usize) -> Ordering {
        match self {
            ColumnData::Numeric(v) => v[a].partial_cmp(&v[b]).unwrap_or(Ordering::Equal),
            ColumnData::Text(v) | ColumnData::Raw(v) => v[a].cmp(&v[b]),
            ColumnData::Datetime(v) => v[a].cmp(&v[b]),
            ColumnData::Categorical { codes, .. } => codes[a].cmp(&codes[b]),
        }
    }

    /// Non-missing numeric values, or `None` for non-numeric columns.
    pub fn numeric_values(&self) -> Option<Vec<f64>> {
        match self {
            ColumnData::Numeric(v) => Some(v.iter().flatten().copied().collect()),
            _ => None,
        }
    }
}

// =============================================================================
// Column
// =============================================================================

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn kind(&self) -> ColumnKind {
        self.data.kind()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// =============================================================================
// Document
// =============================================================================

/// Ordered, equal-length columns with unique names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    columns: Vec<Column>,
}

impl Document {
    /// Build a document, checking that lengths match and names are unique.
    pub fn new(columns: Vec<Column>) -> Result<Self, DocumentError> {
        let mut names = HashSet::new();
        for column in &columns {
            if !names.insert(column.name.as_str()) {
                return Err(DocumentError::DuplicateColumn(column.name.clone()));
            }
        }
        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != expected) {
                return Err(DocumentError::LengthMismatch {
                    column: bad.name.clone(),
                    expected,
                    found: bad.len(),
                });
            }
        }
        Ok(Self { columns })
    }

    /// Build a document from header names and row-major cells, inferring
    /// each column's kind. Short rows are padded with missing cells.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, DocumentError> {
        let mut buckets: Vec<Vec<Cell>> = headers.iter().map(|_| Vec::with_capacity(rows.len())).collect();
        for row in rows {
            let mut cells = row.into_iter();
            for bucket in buckets.iter_mut() {
                bucket.push(cells.next().unwrap_or(Cell::Missing));
            }
        }
        let columns = headers
            .into_iter()
            .zip(buckets)
            .map(|(name, cells)| Column::new(name, ColumnData::infer(cells)))
            .collect();
        Self::new(columns)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Total number of missing cells across all columns.
    pub fn missing_count(&self) -> usize {
        self.columns.iter().map(|c| c.data.missing_count()).sum()
    }

    /// All cells of one row, in column order.
    pub fn row(&self, index: usize) -> Vec<Cell> {
        self.columns.iter().map(|c| c.data.cell(index)).collect()
    }

    /// New document keeping only the rows at `indices`, in that order.
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.take(indices)))
                .collect(),
        }
    }

    /// New document keeping the rows for which `keep` returns true.
    pub fn retain_rows(&self, keep: impl Fn(usize) -> bool) -> Self {
        let indices: Vec<usize> = (0..self.row_count()).filter(|&i| keep(i)).collect();
        self.take_rows(&indices)
    }

    /// Copy with the column at `index` replaced. The replacement must keep
    /// the row count; callers derive it from the existing column.
    pub(crate) fn with_column(&self, index: usize, column: Column) -> Self {
        let mut columns = self.columns.clone();
        columns[index] = column;
        Self { columns }
    }
}
