//! Column selection and renaming.

use std::collections::HashSet;

use super::locate;
use crate::error::{OperationError, OperationResult};
use crate::models::{Column, Document};

/// Keep only `names`, in that order. Every row is preserved.
pub fn select_columns(doc: &Document, names: &[String]) -> OperationResult<Document> {
    if names.is_empty() {
        return Err(OperationError::InvalidParameter(
            "select at least one column".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(OperationError::InvalidParameter(format!(
                "column '{}' selected more than once",
                name
            )));
        }
        let (_, column) = locate(doc, name)?;
        columns.push(column.clone());
    }

    Ok(Document::new(columns)?)
}

/// Rename `column` to `new_name`, keeping its position.
pub fn rename_column(doc: &Document, column: &str, new_name: &str) -> OperationResult<Document> {
    if new_name.trim().is_empty() {
        return Err(OperationError::EmptyColumnName);
    }
    let (index, existing) = locate(doc, column)?;
    if new_name == column {
        return Ok(doc.clone());
    }
    if doc.column(new_name).is_some() {
        return Err(OperationError::DuplicateColumn(new_name.to_string()));
    }

    Ok(doc.with_column(index, Column::new(new_name, existing.data.clone())))
}
