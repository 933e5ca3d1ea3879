//! Error types for the dataset processing pipeline.
//!
//! Every error is caught at the boundary where it originates and turned
//! into a user-visible message:
//!
//! - [`DocumentError`] - Broken document invariants (lengths, names)
//! - [`LoadError`] - Ingestion failures (format, decoding, content)
//! - [`OperationError`] - Rejected transformations (parameters, types, ranges)
//! - [`ExportError`] - Serialization failures
//! - [`SessionError`] - Session-level failures (no dataset loaded)
//! - [`ServerError`] - HTTP layer errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

use crate::models::ColumnKind;

// =============================================================================
// Document Errors
// =============================================================================

/// A set of columns that cannot form a document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DocumentError {
    /// Columns must all have the same number of rows.
    #[error("Column '{column}' has {found} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    /// Column names must be unique.
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),
}

// =============================================================================
// Load Errors
// =============================================================================

/// Errors while turning an uploaded file into a document.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Extension not handled and content not UTF-8 text.
    #[error("Unsupported file format: .{extension}")]
    UnsupportedFormat { extension: String },

    /// Bytes could not be decoded, even with the fallback encoding.
    #[error("Failed to decode file: {0}")]
    Decode(String),

    /// Content does not have a tabular shape.
    #[error("Malformed content at line {line}: {message}")]
    Malformed { line: usize, message: String },

    /// No header row.
    #[error("No columns to parse from file")]
    Empty,

    /// Workbook could not be opened or read.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// Invalid JSON or unexpected JSON shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to read input.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Parsed content breaks document invariants.
    #[error("Invalid table: {0}")]
    Document(#[from] DocumentError),
}

// =============================================================================
// Operation Errors
// =============================================================================

/// Errors that reject an operation. The input document is left untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OperationError {
    /// Referenced column does not exist.
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Target name already used by another column.
    #[error("Column already exists: {0}")]
    DuplicateColumn(String),

    /// New column name is blank.
    #[error("New column name must not be empty")]
    EmptyColumnName,

    /// Parameter outside its accepted domain.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Column kind not supported by the operation.
    #[error("Column '{column}' is {found}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: ColumnKind,
        found: ColumnKind,
    },

    /// Literal cannot be stored in the column.
    #[error("Value '{value}' is not valid for {kind} column '{column}'")]
    InvalidValue {
        column: String,
        value: String,
        kind: ColumnKind,
    },

    /// Row index outside `[0, row_count)`.
    #[error("Row index {row} out of range (document has {row_count} rows)")]
    RowOutOfRange { row: usize, row_count: usize },

    /// Statistic undefined because the column has no values.
    #[error("Cannot compute {statistic} of column '{column}': no non-missing values")]
    NoValues { column: String, statistic: String },
}

impl From<DocumentError> for OperationError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::DuplicateColumn(name) => OperationError::DuplicateColumn(name),
            other => OperationError::InvalidParameter(other.to_string()),
        }
    }
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while serializing a document. The session is not affected.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV writer failure.
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    /// Workbook writer failure.
    #[error("Excel export failed: {0}")]
    Excel(#[from] rust_xlsxwriter::XlsxError),

    /// JSON writer failure.
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Document exceeds the target format limits.
    #[error("Document too large for {format}: {message}")]
    TooLarge { format: String, message: String },

    /// Unknown export format tag.
    #[error("Unknown export format: {0} (expected csv, excel or json)")]
    UnknownFormat(String),
}

// =============================================================================
// Session Errors
// =============================================================================

/// Errors from a session handle.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No dataset has been uploaded yet.
    #[error("No dataset loaded")]
    NoDataset,

    /// Upload failed.
    #[error("Error loading file: {0}")]
    Load(#[from] LoadError),

    /// Operation rejected.
    #[error("{0}")]
    Operation(#[from] OperationError),

    /// Export failed.
    #[error("{0}")]
    Export(#[from] ExportError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Session error.
    #[error("{0}")]
    Session(#[from] SessionError),

    /// Unknown session id.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for loading.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for document operations.
pub type OperationResult<T> = Result<T, OperationError>;

/// Result type for exports.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for session calls.
pub type SessionResult<T> = Result<T, SessionError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
