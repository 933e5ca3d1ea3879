//! Transformation module.
//!
//! Every operation borrows the current document and returns a new one, so
//! a rejected operation leaves its input exactly as it was:
//! - Columns: select and rename
//! - Missing: literal fill, statistic fill, drop rows
//! - Convert: change a column's representation
//! - Edit: replace a single cell
//! - Filter: numeric range and value membership
//! - DSL: serde-tagged [`Operation`] values and the batch executor

pub mod columns;
pub mod convert;
pub mod dsl;
pub mod edit;
pub mod filter;
pub mod missing;

pub use columns::{rename_column, select_columns};
pub use convert::{convert_column, convert_type, TargetType};
pub use dsl::*;
pub use edit::edit_cell;
pub use filter::{filter_membership, filter_range};
pub use missing::{compute_statistic, drop_missing, fill_missing_literal, fill_missing_statistic, Statistic};

use crate::error::{OperationError, OperationResult};
use crate::models::{Column, Document};

/// Position and contents of `name`, or `ColumnNotFound`.
pub(crate) fn locate<'a>(doc: &'a Document, name: &str) -> OperationResult<(usize, &'a Column)> {
    doc.column_index(name)
        .map(|index| (index, &doc.columns()[index]))
        .ok_or_else(|| OperationError::ColumnNotFound(name.to_string()))
}
