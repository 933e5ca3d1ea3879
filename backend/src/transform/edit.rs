use super::locate;
use crate::error::{OperationError, OperationResult};
use crate::models::{Column, Document};

/// Replace the single cell at (`row`, `column`) with `literal`.
pub fn edit_cell(doc: &Document, column: &str, row: usize, literal: &str) -> OperationResult<Document> {
    let (index, target) = locate(doc, column)?;
    let row_count = doc.row_count();
    if row >= row_count {
        return Err(OperationError::RowOutOfRange { row, row_count });
    }

    let invalid = || OperationError::InvalidValue {
        column: column.to_string(),
        value: literal.to_string(),
        kind: target.kind(),
    };
    let value = target.data.coerce_literal(literal).ok_or_else(invalid)?;

    let mut data = target.data.clone();
    if !data.set(row, &value) {
        return Err(invalid());
    }
    Ok(doc.with_column(index, Column::new(target.name.clone(), data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnData;

    fn doc() -> Document {
        Document::new(vec![
            Column::new("n", ColumnData::numeric(vec![Some(1.0), Some(2.0), Some(3.0)])),
            Column::new("t", ColumnData::Text(vec![Some("a".into()), None, Some("c".into())])),
        ])
        .unwrap()
    }

    #[test]
    fn test_edit_changes_one_cell() {
        let before = doc();
        let after = edit_cell(&before, "t", 1, "b").unwrap();

        assert_eq!(after.row(1)[1].render().as_deref(), Some("b"));
        for row in [0, 2] {
            assert_eq!(after.row(row), before.row(row));
        }
        assert_eq!(after.column("n"), before.column("n"));
    }

    #[test]
    fn test_edit_numeric_parses_literal() {
        let after = edit_cell(&doc(), "n", 0, " 41.5 ").unwrap();
        assert_eq!(after.column("n").unwrap().data.render(0).as_deref(), Some("41.5"));

        let err = edit_cell(&doc(), "n", 0, "forty").unwrap_err();
        assert!(matches!(err, OperationError::InvalidValue { .. }));
    }

    #[test]
    fn test_edit_row_out_of_range() {
        assert_eq!(
            edit_cell(&doc(), "n", 3, "1").unwrap_err(),
            OperationError::RowOutOfRange { row: 3, row_count: 3 }
        );
    }

    #[test]
    fn test_edit_categorical_needs_known_label() {
        let doc = Document::new(vec![Column::new(
            "grade",
            ColumnData::categorical(vec!["A".into(), "B".into()], &[Some("A".into()), Some("B".into())]),
        )])
        .unwrap();

        let after = edit_cell(&doc, "grade", 0, "B").unwrap();
        assert_eq!(after.column("grade").unwrap().data.render(0).as_deref(), Some("B"));
        assert!(edit_cell(&doc, "grade", 0, "C").is_err());
    }
}
