//! Dataset reporting: overview metrics, preview rows, column profiles and
//! data-quality issues.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::error::{OperationError, OperationResult};
use crate::models::{parse_number, Column, ColumnData, ColumnKind, Document};

/// Share of missing cells at which a column is flagged.
const HIGH_MISSING_RATIO: f64 = 0.5;

/// Headline numbers for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub rows: usize,
    pub columns: usize,
    pub missing: usize,
}

impl Overview {
    pub fn of(doc: &Document) -> Self {
        Self {
            rows: doc.row_count(),
            columns: doc.column_count(),
            missing: doc.missing_count(),
        }
    }
}

/// First `n` rows as JSON records.
pub fn preview(doc: &Document, n: usize) -> Vec<Value> {
    (0..doc.row_count().min(n))
        .map(|row| {
            let record: Map<String, Value> = doc
                .columns()
                .iter()
                .map(|c| (c.name.clone(), c.data.cell(row).to_json()))
                .collect();
            Value::Object(record)
        })
        .collect()
}

/// Per-column summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    pub missing: usize,
    /// Distinct non-missing values
    pub unique: usize,
}

impl ColumnProfile {
    pub fn of(column: &Column) -> Self {
        Self {
            name: column.name.clone(),
            kind: column.kind(),
            missing: column.data.missing_count(),
            unique: distinct(&column.data).len(),
        }
    }
}

pub fn profile(doc: &Document) -> Vec<ColumnProfile> {
    doc.columns().iter().map(ColumnProfile::of).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingValues,
    HighMissingShare,
    ConstantColumn,
    IdentifierLike,
    NumericAsText,
}

/// A data-quality observation about one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityIssue {
    pub column: String,
    pub kind: IssueKind,
    pub detail: String,
}

/// Scan every column for common cleaning opportunities.
pub fn quality_issues(doc: &Document) -> Vec<QualityIssue> {
    let rows = doc.row_count();
    let mut issues = Vec::new();
    if rows == 0 {
        return issues;
    }

    for column in doc.columns() {
        let mut push = |kind, detail: String| {
            issues.push(QualityIssue {
                column: column.name.clone(),
                kind,
                detail,
            })
        };

        let missing = column.data.missing_count();
        if missing > 0 {
            let share = missing as f64 / rows as f64;
            if share >= HIGH_MISSING_RATIO {
                push(
                    IssueKind::HighMissingShare,
                    format!("{:.0}% of values are missing; consider dropping the column", share * 100.0),
                );
            } else {
                push(
                    IssueKind::MissingValues,
                    format!("{} missing values; fill or drop them", missing),
                );
            }
        }

        let values = distinct(&column.data);
        let present = rows - missing;
        if present > 1 && values.len() == 1 {
            push(
                IssueKind::ConstantColumn,
                "every value is the same; the column carries no information".to_string(),
            );
        }
        if column.kind() == ColumnKind::Text && present > 1 && values.len() == present {
            push(
                IssueKind::IdentifierLike,
                "every value is unique; likely an identifier".to_string(),
            );
        }
        if column.kind() == ColumnKind::Text && present > 0 {
            let numeric = values
                .iter()
                .filter(|v| parse_number(v).is_some())
                .count();
            if numeric * 2 > values.len() {
                push(
                    IssueKind::NumericAsText,
                    "mostly numeric values stored as text; convert to numeric".to_string(),
                );
            }
        }
    }

    issues
}

/// Distinct rendered non-missing values of `column`, in first-seen order.
pub fn unique_values(doc: &Document, column: &str) -> OperationResult<Vec<String>> {
    let target = doc
        .column(column)
        .ok_or_else(|| OperationError::ColumnNotFound(column.to_string()))?;
    Ok(distinct(&target.data))
}

/// Smallest and largest value of a numeric column; `None` when all missing.
pub fn numeric_range(doc: &Document, column: &str) -> OperationResult<Option<(f64, f64)>> {
    let target = doc
        .column(column)
        .ok_or_else(|| OperationError::ColumnNotFound(column.to_string()))?;
    let values = target
        .data
        .numeric_values()
        .ok_or_else(|| OperationError::TypeMismatch {
            column: column.to_string(),
            expected: ColumnKind::Numeric,
            found: target.kind(),
        })?;
    Ok(values.iter().fold(None, |range, &v| match range {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    }))
}

fn distinct(data: &ColumnData) -> Vec<String> {
    let mut seen = HashSet::new();
    data.rendered()
        .into_iter()
        .flatten()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::new(vec![
            Column::new("id", ColumnData::Text(vec![Some("a1".into()), Some("b2".into()), Some("c3".into()), Some("d4".into())])),
            Column::new("zip", ColumnData::Text(vec![Some("75001".into()), Some("69002".into()), Some("75001".into()), None])),
            Column::new("country", ColumnData::Text(vec![Some("FR".into()), Some("FR".into()), Some("FR".into()), Some("FR".into())])),
            Column::new("score", ColumnData::numeric(vec![Some(4.0), None, None, Some(-1.5)])),
        ])
        .unwrap()
    }

    fn kinds_for(issues: &[QualityIssue], column: &str) -> Vec<IssueKind> {
        issues.iter().filter(|i| i.column == column).map(|i| i.kind).collect()
    }

    #[test]
    fn test_overview() {
        assert_eq!(
            Overview::of(&doc()),
            Overview {
                rows: 4,
                columns: 4,
                missing: 3
            }
        );
    }

    #[test]
    fn test_preview_limits_rows() {
        let rows = preview(&doc(), 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["score"], 4);
        assert!(rows[1]["score"].is_null());
        assert_eq!(preview(&doc(), 50).len(), 4);
    }

    #[test]
    fn test_profile() {
        let profiles = profile(&doc());
        assert_eq!(profiles[1].unique, 2);
        assert_eq!(profiles[1].missing, 1);
        assert_eq!(profiles[3].kind, ColumnKind::Numeric);
    }

    #[test]
    fn test_quality_issues() {
        let issues = quality_issues(&doc());
        assert_eq!(kinds_for(&issues, "id"), vec![IssueKind::IdentifierLike]);
        assert_eq!(kinds_for(&issues, "zip"), vec![IssueKind::MissingValues, IssueKind::NumericAsText]);
        assert_eq!(kinds_for(&issues, "country"), vec![IssueKind::ConstantColumn]);
        assert_eq!(kinds_for(&issues, "score"), vec![IssueKind::HighMissingShare]);
    }

    #[test]
    fn test_unique_values_first_seen_order() {
        assert_eq!(unique_values(&doc(), "zip").unwrap(), vec!["75001", "69002"]);
        assert!(unique_values(&doc(), "nope").is_err());
    }

    #[test]
    fn test_numeric_range() {
        assert_eq!(numeric_range(&doc(), "score").unwrap(), Some((-1.5, 4.0)));
        assert!(matches!(
            numeric_range(&doc(), "id"),
            Err(OperationError::TypeMismatch { .. })
        ));
    }
}
