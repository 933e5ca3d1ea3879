//! Column type conversion.
//!
//! Conversion never fails on a single value: anything the target kind
//! cannot represent becomes missing. Missing cells stay missing.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::locate;
use crate::error::OperationResult;
use crate::models::{
    datetime_to_nanos, nanos_to_datetime, parse_datetime, parse_number, Column, ColumnData,
    Document,
};

/// Representation a column can be converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    String,
    Numeric,
    Datetime,
    Category,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetType::String => "string",
            TargetType::Numeric => "numeric",
            TargetType::Datetime => "datetime",
            TargetType::Category => "category",
        })
    }
}

/// Convert `column` of `doc` to `target`, keeping its name and position.
pub fn convert_type(doc: &Document, column: &str, target: TargetType) -> OperationResult<Document> {
    let (index, existing) = locate(doc, column)?;
    let data = convert_column(&existing.data, target);
    Ok(doc.with_column(index, Column::new(existing.name.clone(), data)))
}

/// Re-interpret every value of `data` under `target`.
pub fn convert_column(data: &ColumnData, target: TargetType) -> ColumnData {
    match (data, target) {
        (ColumnData::Text(_), TargetType::String) => data.clone(),
        (ColumnData::Numeric(_), TargetType::Numeric) => data.clone(),
        (ColumnData::Datetime(_), TargetType::Datetime) => data.clone(),
        (ColumnData::Categorical { .. }, TargetType::Category) => data.clone(),

        (_, TargetType::String) => ColumnData::Text(data.rendered()),

        (ColumnData::Datetime(values), TargetType::Numeric) => ColumnData::numeric(
            values.iter().map(|v| v.as_ref().and_then(datetime_to_nanos)),
        ),
        (_, TargetType::Numeric) => ColumnData::numeric(
            data.rendered().iter().map(|v| v.as_deref().and_then(parse_number)),
        ),

        (ColumnData::Numeric(values), TargetType::Datetime) => ColumnData::Datetime(
            values.iter().map(|v| v.and_then(nanos_to_datetime)).collect(),
        ),
        (_, TargetType::Datetime) => ColumnData::Datetime(
            data.rendered()
                .iter()
                .map(|v| v.as_deref().and_then(parse_datetime))
                .collect(),
        ),

        (_, TargetType::Category) => {
            let labels = data.rendered();
            ColumnData::categorical(sorted_categories(data), &labels)
        }
    }
}

/// Distinct rendered values of `data`, ordered by the column's natural order.
fn sorted_categories(data: &ColumnData) -> Vec<String> {
    let mut rows: Vec<usize> = (0..data.len()).filter(|&r| !data.is_missing(r)).collect();
    rows.sort_by(|&a, &b| data.compare_rows(a, b));
    rows.dedup_by(|a, b| data.compare_rows(*a, *b) == Ordering::Equal);

    let mut categories: Vec<String> = rows.into_iter().filter_map(|r| data.render(r)).collect();
    // Labels must stay unique for the code lookup.
    categories.dedup();
    categories
}
