//! Missing-value handling: literal fill, statistic fill, row dropping.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::locate;
use crate::error::{OperationError, OperationResult};
use crate::models::{Cell, Column, ColumnKind, Document};

/// Statistic used to impute missing cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    Mean,
    Median,
    Mode,
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Statistic::Mean => "mean",
            Statistic::Median => "median",
            Statistic::Mode => "mode",
        })
    }
}

/// Replace every missing cell of `column` with `literal`, coerced under the
/// column's kind.
pub fn fill_missing_literal(doc: &Document, column: &str, literal: &str) -> OperationResult<Document> {
    let (index, target) = locate(doc, column)?;
    let value = target
        .data
        .coerce_literal(literal)
        .ok_or_else(|| OperationError::InvalidValue {
            column: column.to_string(),
            value: literal.to_string(),
            kind: target.kind(),
        })?;
    fill_with(doc, index, &value)
}

/// Replace every missing cell of `column` with a statistic of its values.
pub fn fill_missing_statistic(
    doc: &Document,
    column: &str,
    statistic: Statistic,
) -> OperationResult<Document> {
    let (index, target) = locate(doc, column)?;
    let value = compute_statistic(target, statistic)?;
    fill_with(doc, index, &value)
}

/// Remove every row where `column` is missing.
pub fn drop_missing(doc: &Document, column: &str) -> OperationResult<Document> {
    let (_, target) = locate(doc, column)?;
    Ok(doc.retain_rows(|row| !target.data.is_missing(row)))
}

/// Compute `statistic` over the non-missing values of `column`.
///
/// Mean and median need a numeric column. Mode works on any kind; ties go
/// to the lowest value in the column's natural order.
pub fn compute_statistic(column: &Column, statistic: Statistic) -> OperationResult<Cell> {
    let no_values = || OperationError::NoValues {
        column: column.name.clone(),
        statistic: statistic.to_string(),
    };

    match statistic {
        Statistic::Mean | Statistic::Median => {
            let mut values = column
                .data
                .numeric_values()
                .ok_or_else(|| OperationError::TypeMismatch {
                    column: column.name.clone(),
                    expected: ColumnKind::Numeric,
                    found: column.kind(),
                })?;
            if values.is_empty() {
                return Err(no_values());
            }
            let n = values.len();
            let value = if statistic == Statistic::Mean {
                values.iter().sum::<f64>() / n as f64
            } else {
                values.sort_by(f64::total_cmp);
                if n % 2 == 1 {
                    values[n / 2]
                } else {
                    (values[n / 2 - 1] + values[n / 2]) / 2.0
                }
            };
            Ok(Cell::Number(value))
        }
        Statistic::Mode => {
            let data = &column.data;
            let mut rows: Vec<usize> = (0..data.len()).filter(|&r| !data.is_missing(r)).collect();
            if rows.is_empty() {
                return Err(no_values());
            }
            rows.sort_by(|&a, &b| data.compare_rows(a, b));

            // Runs of equal values are adjacent after sorting; the first
            // longest run is the lowest modal value.
            let mut best = (rows[0], 0usize);
            let mut start = 0;
            for i in 1..=rows.len() {
                let run_ends = i == rows.len()
                    || data.compare_rows(rows[start], rows[i]) != Ordering::Equal;
                if run_ends {
                    if i - start > best.1 {
                        best = (rows[start], i - start);
                    }
                    start = i;
                }
            }
            Ok(data.cell(best.0))
        }
    }
}

fn fill_with(doc: &Document, index: usize, value: &Cell) -> OperationResult<Document> {
    let target = &doc.columns()[index];
    let mut data = target.data.clone();
    for row in 0..data.len() {
        if data.is_missing(row) && !data.set(row, value) {
            return Err(OperationError::InvalidValue {
                column: target.name.clone(),
                value: value.render().unwrap_or_default(),
                kind: target.kind(),
            });
        }
    }
    Ok(doc.with_column(index, Column::new(target.name.clone(), data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnData;

    fn numbers(values: &[Option<f64>]) -> Document {
        Document::new(vec![
            Column::new("x", ColumnData::numeric(values.to_vec())),
            Column::new("id", ColumnData::numeric((0..values.len()).map(|i| Some(i as f64)))),
        ])
        .unwrap()
    }

    fn texts(values: &[Option<&str>]) -> Document {
        Document::new(vec![Column::new(
            "t",
            ColumnData::Text(values.iter().map(|v| v.map(str::to_string)).collect()),
        )])
        .unwrap()
    }

    #[test]
    fn test_fill_mean() {
        let doc = numbers(&[Some(1.0), Some(f64::NAN), Some(3.0)]);
        let out = fill_missing_statistic(&doc, "x", Statistic::Mean).unwrap();
        assert_eq!(out.row_count(), 3);
        assert_eq!(out.column("x").unwrap().data, ColumnData::Numeric(vec![Some(1.0), Some(2.0), Some(3.0)]));
    }

    #[test]
    fn test_fill_median_even_count() {
        let doc = numbers(&[Some(4.0), None, Some(1.0), Some(10.0), Some(2.0)]);
        let out = fill_missing_statistic(&doc, "x", Statistic::Median).unwrap();
        assert_eq!(out.column("x").unwrap().data.render(1).as_deref(), Some("3"));
    }

    #[test]
    fn test_mean_requires_numeric() {
        let doc = texts(&[Some("a"), None]);
        assert!(matches!(
            fill_missing_statistic(&doc, "t", Statistic::Mean),
            Err(OperationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_mode_tie_takes_lowest() {
        let doc = texts(&[Some("pear"), Some("apple"), None, Some("pear"), Some("apple")]);
        let out = fill_missing_statistic(&doc, "t", Statistic::Mode).unwrap();
        assert_eq!(out.column("t").unwrap().data.render(2).as_deref(), Some("apple"));

        let doc = numbers(&[Some(5.0), Some(5.0), Some(2.0), None, Some(9.0), Some(9.0)]);
        let out = fill_missing_statistic(&doc, "x", Statistic::Mode).unwrap();
        assert_eq!(out.column("x").unwrap().data.render(3).as_deref(), Some("5"));
    }

    #[test]
    fn test_mode_most_frequent_wins() {
        let doc = numbers(&[Some(1.0), Some(7.0), Some(7.0), None]);
        let out = fill_missing_statistic(&doc, "x", Statistic::Mode).unwrap();
        assert_eq!(out.column("x").unwrap().data.render(3).as_deref(), Some("7"));
    }

    #[test]
    fn test_statistic_without_values() {
        let doc = numbers(&[None, None]);
        assert!(matches!(
            fill_missing_statistic(&doc, "x", Statistic::Mode),
            Err(OperationError::NoValues { .. })
        ));
    }

    #[test]
    fn test_fill_literal_numeric() {
        let doc = numbers(&[None, Some(2.0)]);
        let out = fill_missing_literal(&doc, "x", "0").unwrap();
        assert_eq!(out.column("x").unwrap().data.missing_count(), 0);

        let err = fill_missing_literal(&doc, "x", "zero").unwrap_err();
        assert!(matches!(err, OperationError::InvalidValue { .. }));
    }

    #[test]
    fn test_fill_literal_text() {
        let doc = texts(&[None, Some("b")]);
        let out = fill_missing_literal(&doc, "t", "unknown").unwrap();
        assert_eq!(out.column("t").unwrap().data.render(0).as_deref(), Some("unknown"));
    }

    #[test]
    fn test_drop_missing() {
        let doc = numbers(&[Some(1.0), None, Some(3.0), None, Some(5.0)]);
        let out = drop_missing(&doc, "x").unwrap();
        assert_eq!(out.row_count(), 3);
        assert_eq!(out.column("x").unwrap().data.missing_count(), 0);
        assert_eq!(out.column("id").unwrap().data.rendered(), vec![Some("0".into()), Some("2".into()), Some("4".into())]);
    }

    #[test]
    fn test_input_untouched_on_error() {
        let doc = numbers(&[None]);
        let before = doc.clone();
        let _ = fill_missing_literal(&doc, "x", "nope");
        assert_eq!(doc, before);
    }
}
