//! Row filters: inclusive numeric range and value membership.

use std::collections::HashSet;

use super::locate;
use crate::error::{OperationError, OperationResult};
use crate::models::{ColumnData, ColumnKind, Document};

/// Keep rows whose value in `column` lies in `[min, max]`. Missing cells
/// never match.
pub fn filter_range(doc: &Document, column: &str, min: f64, max: f64) -> OperationResult<Document> {
    if min.is_nan() || max.is_nan() {
        return Err(OperationError::InvalidParameter(
            "range bounds must be numbers".to_string(),
        ));
    }
    if min > max {
        return Err(OperationError::InvalidParameter(format!(
            "range minimum {} is greater than maximum {}",
            min, max
        )));
    }

    let (_, target) = locate(doc, column)?;
    let ColumnData::Numeric(values) = &target.data else {
        return Err(OperationError::TypeMismatch {
            column: column.to_string(),
            expected: ColumnKind::Numeric,
            found: target.kind(),
        });
    };

    Ok(doc.retain_rows(|row| values[row].is_some_and(|v| v >= min && v <= max)))
}

/// Keep rows whose rendered value in `column` is one of `allowed`. A `None`
/// entry keeps missing cells.
pub fn filter_membership(
    doc: &Document,
    column: &str,
    allowed: &[Option<String>],
) -> OperationResult<Document> {
    let (_, target) = locate(doc, column)?;
    let allowed: HashSet<Option<&str>> = allowed.iter().map(Option::as_deref).collect();
    Ok(doc.retain_rows(|row| allowed.contains(&target.data.render(row).as_deref())))
}
