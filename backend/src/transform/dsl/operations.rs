//! DSL Operations for dataset preparation
//!
//! Every user-facing transformation as one serializable value.

use serde::{Deserialize, Serialize};

use crate::error::{OperationError, OperationResult};
use crate::models::Document;
use crate::transform::{
    convert_type, drop_missing, edit_cell, fill_missing_literal, fill_missing_statistic,
    filter_membership, filter_range, rename_column, select_columns, Statistic, TargetType,
};

/// All available operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Keep only the listed columns, in listed order
    SelectColumns { columns: Vec<String> },

    /// Rename one column in place
    RenameColumn { column: String, new_name: String },

    /// Replace missing cells with a literal
    FillMissing { column: String, value: String },

    /// Replace missing cells with the column's mean, median or mode
    FillMissingStatistic { column: String, statistic: Statistic },

    /// Drop rows where the column is missing
    DropMissing { column: String },

    /// Re-interpret a column as string, numeric, datetime or category
    ConvertType { column: String, target: TargetType },

    /// Replace a single cell
    EditCell {
        column: String,
        row: usize,
        value: String,
    },

    /// Keep rows whose numeric value lies in `[min, max]`
    FilterRange { column: String, min: f64, max: f64 },

    /// Keep rows whose value is one of `values` (null keeps missing cells)
    FilterValues {
        column: String,
        values: Vec<Option<String>>,
    },

    /// Go back to the document as it was loaded
    Reset,
}

impl Operation {
    /// Tag used in the JSON form.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::SelectColumns { .. } => "select_columns",
            Operation::RenameColumn { .. } => "rename_column",
            Operation::FillMissing { .. } => "fill_missing",
            Operation::FillMissingStatistic { .. } => "fill_missing_statistic",
            Operation::DropMissing { .. } => "drop_missing",
            Operation::ConvertType { .. } => "convert_type",
            Operation::EditCell { .. } => "edit_cell",
            Operation::FilterRange { .. } => "filter_range",
            Operation::FilterValues { .. } => "filter_values",
            Operation::Reset => "reset",
        }
    }

    /// One-line description for logs and reports.
    pub fn describe(&self) -> String {
        match self {
            Operation::SelectColumns { columns } => format!("Select columns [{}]", columns.join(", ")),
            Operation::RenameColumn { column, new_name } => {
                format!("Rename '{}' to '{}'", column, new_name)
            }
            Operation::FillMissing { column, value } => {
                format!("Fill missing in '{}' with '{}'", column, value)
            }
            Operation::FillMissingStatistic { column, statistic } => {
                format!("Fill missing in '{}' with {}", column, statistic)
            }
            Operation::DropMissing { column } => format!("Drop rows with missing '{}'", column),
            Operation::ConvertType { column, target } => {
                format!("Convert '{}' to {}", column, target)
            }
            Operation::EditCell { column, row, value } => {
                format!("Set '{}' row {} to '{}'", column, row, value)
            }
            Operation::FilterRange { column, min, max } => {
                format!("Keep '{}' between {} and {}", column, min, max)
            }
            Operation::FilterValues { column, values } => format!(
                "Keep '{}' in [{}]",
                column,
                values
                    .iter()
                    .map(|v| v.as_deref().unwrap_or("<missing>"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Operation::Reset => "Reset to original".to_string(),
        }
    }

    pub fn is_reset(&self) -> bool {
        matches!(self, Operation::Reset)
    }

    /// Apply to `doc`. `Reset` needs the originally loaded document, which
    /// only a session or the executor holds; here it is rejected.
    pub fn apply(&self, doc: &Document) -> OperationResult<Document> {
        match self {
            Operation::SelectColumns { columns } => select_columns(doc, columns),
            Operation::RenameColumn { column, new_name } => rename_column(doc, column, new_name),
            Operation::FillMissing { column, value } => fill_missing_literal(doc, column, value),
            Operation::FillMissingStatistic { column, statistic } => {
                fill_missing_statistic(doc, column, *statistic)
            }
            Operation::DropMissing { column } => drop_missing(doc, column),
            Operation::ConvertType { column, target } => convert_type(doc, column, *target),
            Operation::EditCell { column, row, value } => edit_cell(doc, column, *row, value),
            Operation::FilterRange { column, min, max } => filter_range(doc, column, *min, *max),
            Operation::FilterValues { column, values } => filter_membership(doc, column, values),
            Operation::Reset => Err(OperationError::InvalidParameter(
                "reset needs the original document".to_string(),
            )),
        }
    }
}

/// Get operations description for help output
pub fn operations_description() -> String {
    r#"Available operations:

| Operation | Description | Parameters |
|-----------|-------------|------------|
| select_columns | Keep listed columns, in order | columns: [names] |
| rename_column | Rename a column in place | column, new_name |
| fill_missing | Fill missing cells with a literal | column, value |
| fill_missing_statistic | Fill missing cells with a statistic | column, statistic: mean, median or mode |
| drop_missing | Drop rows where the column is missing | column |
| convert_type | Change the column representation | column, target: string, numeric, datetime or category |
| edit_cell | Replace one cell | column, row (0-based), value |
| filter_range | Keep rows with min <= value <= max | column, min, max |
| filter_values | Keep rows whose value is listed | column, values: [strings or null] |
| reset | Go back to the loaded document | - |

Mode ties resolve to the lowest value. Convert never fails: values that
cannot be converted become missing.

Example operations in JSON:
[
  {"type": "rename_column", "column": "Prix", "new_name": "price"},
  {"type": "convert_type", "column": "price", "target": "numeric"},
  {"type": "fill_missing_statistic", "column": "price", "statistic": "median"},
  {"type": "filter_range", "column": "price", "min": 0, "max": 500},
  {"type": "filter_values", "column": "city", "values": ["Paris", "Lyon", null]}
]"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Column, ColumnData};

    fn doc() -> Document {
        Document::new(vec![
            Column::new("price", ColumnData::numeric(vec![Some(1.0), None, Some(3.0)])),
            Column::new("city", ColumnData::Text(vec![Some("Lyon".into()), Some("Nice".into()), None])),
        ])
        .unwrap()
    }

    #[test]
    fn test_deserialize_tagged() {
        let op: Operation = serde_json::from_str(
            r#"{"type": "fill_missing_statistic", "column": "price", "statistic": "mean"}"#,
        )
        .unwrap();
        assert_eq!(
            op,
            Operation::FillMissingStatistic {
                column: "price".into(),
                statistic: Statistic::Mean
            }
        );

        let op: Operation = serde_json::from_str(r#"{"type": "reset"}"#).unwrap();
        assert!(op.is_reset());

        let op: Operation =
            serde_json::from_str(r#"{"type": "filter_values", "column": "city", "values": ["Lyon", null]}"#).unwrap();
        assert_eq!(op.name(), "filter_values");
    }

    #[test]
    fn test_unknown_operation_rejected() {
        assert!(serde_json::from_str::<Operation>(r#"{"type": "pivot"}"#).is_err());
        assert!(serde_json::from_str::<Operation>(r#"{"type": "convert_type", "column": "a", "target": "int"}"#).is_err());
    }

    #[test]
    fn test_apply_dispatch() {
        let op = Operation::FillMissingStatistic {
            column: "price".into(),
            statistic: Statistic::Mean,
        };
        let out = op.apply(&doc()).unwrap();
        assert_eq!(out.column("price").unwrap().data.render(1).as_deref(), Some("2"));

        let op = Operation::FilterValues {
            column: "city".into(),
            values: vec![Some("Nice".into())],
        };
        assert_eq!(op.apply(&doc()).unwrap().row_count(), 1);
    }

    #[test]
    fn test_apply_reset_rejected_without_original() {
        assert!(Operation::Reset.apply(&doc()).is_err());
    }

    #[test]
    fn test_describe() {
        let op = Operation::EditCell {
            column: "city".into(),
            row: 2,
            value: "Metz".into(),
        };
        assert_eq!(op.describe(), "Set 'city' row 2 to 'Metz'");
        assert!(operations_description().contains("fill_missing_statistic"));
    }
}
