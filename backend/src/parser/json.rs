//! JSON parsing: an array of row records, or an object of columns.

use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

use crate::error::{LoadError, LoadResult};
use crate::models::{Cell, Column, ColumnData, Document};

/// Parse JSON text into a document.
///
/// Accepted shapes:
/// - `[{"a": 1, "b": "x"}, ...]` - records; columns in first-seen key order
/// - `{"a": [1, 2], "b": ["x", "y"]}` - columns as arrays
/// - `{"a": {"0": 1, "1": 2}, ...}` - columns keyed by row label
pub fn parse_json(text: &str) -> LoadResult<Document> {
    let value: Value = serde_json::from_str(text)?;
    match value {
        Value::Array(items) => from_records(items),
        Value::Object(map) => from_columns(map),
        _ => Err(LoadError::Malformed {
            line: 1,
            message: "expected an array of records or an object of columns".to_string(),
        }),
    }
}

fn from_records(items: Vec<Value>) -> LoadResult<Document> {
    let mut headers: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<Vec<Cell>> = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(record) = item else {
            return Err(LoadError::Malformed {
                line: index + 1,
                message: format!("record {} is not an object", index),
            });
        };
        let mut row = vec![Cell::Missing; headers.len()];
        for (key, value) in record {
            let pos = *positions.entry(key.clone()).or_insert_with(|| {
                headers.push(key);
                headers.len() - 1
            });
            if pos >= row.len() {
                row.resize(pos + 1, Cell::Missing);
            }
            row[pos] = to_cell(value);
        }
        rows.push(row);
    }

    Ok(Document::from_rows(headers, rows)?)
}

fn from_columns(map: Map<String, Value>) -> LoadResult<Document> {
    let labels = row_labels(&map);
    let mut columns = Vec::with_capacity(map.len());
    for (name, value) in map {
        let cells: Vec<Cell> = match value {
            Value::Array(values) => values.into_iter().map(to_cell).collect(),
            Value::Object(mut by_label) => labels
                .iter()
                .map(|label| by_label.remove(label).map_or(Cell::Missing, to_cell))
                .collect(),
            _ => {
                return Err(LoadError::Malformed {
                    line: 1,
                    message: format!("column '{}' is not an array or object", name),
                })
            }
        };
        columns.push(Column::new(name, ColumnData::infer(cells)));
    }
    Ok(Document::new(columns)?)
}

/// Union of the row labels of object-shaped columns. Integer labels sort
/// numerically, anything else keeps first-seen order. A column without a
/// given label is missing there.
fn row_labels(map: &Map<String, Value>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut labels: Vec<String> = Vec::new();
    for by_label in map.values().filter_map(Value::as_object) {
        for label in by_label.keys() {
            if seen.insert(label.as_str()) {
                labels.push(label.clone());
            }
        }
    }
    if labels.iter().all(|l| l.parse::<i64>().is_ok()) {
        labels.sort_by_key(|l| l.parse::<i64>().unwrap_or_default());
    }
    labels
}

fn to_cell(value: Value) -> Cell {
    match value {
        Value::Null => Cell::Missing,
        Value::Bool(b) => Cell::Text(b.to_string()),
        Value::Number(n) => n.as_f64().map_or(Cell::Missing, Cell::Number),
        Value::String(s) => Cell::Text(s),
        nested @ (Value::Array(_) | Value::Object(_)) => Cell::Raw(nested.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnKind;

    #[test]
    fn test_records() {
        let doc = parse_json(r#"[{"name":"Alice","age":30},{"name":"Bob","age":null}]"#).unwrap();

        assert_eq!(doc.column_names(), vec!["name", "age"]);
        assert_eq!(doc.row_count(), 2);
        assert_eq!(doc.column("age").unwrap().kind(), ColumnKind::Numeric);
        assert!(doc.column("age").unwrap().data.is_missing(1));
    }

    #[test]
    fn test_records_with_uneven_keys() {
        let doc = parse_json(r#"[{"a":1},{"b":"x"},{"a":3,"b":"y"}]"#).unwrap();

        assert_eq!(doc.column_names(), vec!["a", "b"]);
        assert!(doc.column("b").unwrap().data.is_missing(0));
        assert!(doc.column("a").unwrap().data.is_missing(1));
        assert_eq!(doc.column("b").unwrap().data.render(2).as_deref(), Some("y"));
    }

    #[test]
    fn test_nested_values_are_raw() {
        let doc = parse_json(r#"[{"tags":["a","b"]},{"tags":{"k":1}}]"#).unwrap();
        let tags = &doc.column("tags").unwrap().data;
        assert_eq!(tags.kind(), ColumnKind::Raw);
        assert_eq!(tags.render(0).as_deref(), Some(r#"["a","b"]"#));
    }

    #[test]
    fn test_columns_shape() {
        let doc = parse_json(r#"{"x":[1,2,3],"y":{"0":"a","1":"b","2":"c"}}"#).unwrap();
        assert_eq!(doc.column_names(), vec!["x", "y"]);
        assert_eq!(doc.row_count(), 3);
        assert_eq!(doc.column("y").unwrap().kind(), ColumnKind::Text);
    }

    #[test]
    fn test_columns_aligned_by_row_label() {
        let doc = parse_json(r#"{"x":{"1":"b","0":"a","10":"k","2":"c"},"y":{"0":1,"2":3}}"#).unwrap();
        let x = &doc.column("x").unwrap().data;
        let y = &doc.column("y").unwrap().data;

        assert_eq!(doc.row_count(), 4);
        assert_eq!(x.render(0).as_deref(), Some("a"));
        assert_eq!(x.render(2).as_deref(), Some("c"));
        assert_eq!(x.render(3).as_deref(), Some("k"));
        assert!(y.is_missing(1));
        assert_eq!(y.render(2).as_deref(), Some("3"));
    }

    #[test]
    fn test_text_labels_keep_first_seen_order() {
        let doc = parse_json(r#"{"x":{"b":2,"a":1}}"#).unwrap();
        assert_eq!(doc.column("x").unwrap().data.render(0).as_deref(), Some("2"));
    }

    #[test]
    fn test_uneven_columns_rejected() {
        let err = parse_json(r#"{"x":[1,2],"y":[1]}"#).unwrap_err();
        assert!(matches!(err, LoadError::Document(_)));
    }

    #[test]
    fn test_scalar_rejected() {
        assert!(matches!(parse_json("42"), Err(LoadError::Malformed { .. })));
        assert!(matches!(parse_json("[1,2]"), Err(LoadError::Malformed { .. })));
        assert!(matches!(parse_json("{not json"), Err(LoadError::Json(_))));
    }
}
