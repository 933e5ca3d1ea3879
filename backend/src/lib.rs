//! # Dataprep - Interactive dataset preparation
//!
//! Dataprep loads tabular files (CSV/TXT, Excel, JSON or raw text), applies
//! cleaning operations to an in-memory copy and exports the result, with
//! the loaded original always one reset away.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │    File     │────▶│   Parser    │────▶│   Session   │────▶│   Export    │
//! │ csv/xlsx/.. │     │  (auto-enc) │     │ (operations)│     │ csv/xlsx/js │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dataprep::{ExportFormat, Operation, Session, Statistic};
//!
//! let mut session = Session::new();
//! session.load("sales.csv", &std::fs::read("sales.csv")?)?;
//! session.apply(&Operation::FillMissingStatistic {
//!     column: "price".into(),
//!     statistic: Statistic::Median,
//! })?;
//! let file = session.export(ExportFormat::Excel)?;
//! std::fs::write(&file.file_name, &file.data)?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Document model (Document, Column, ColumnData, Cell)
//! - [`parser`] - Loading with encoding and delimiter detection
//! - [`export`] - CSV, Excel and JSON writers
//! - [`transform`] - Operations and the operation DSL
//! - [`session`] - Per-user state and the session store
//! - [`report`] - Overview, preview, column profiles, quality issues
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Loading and export
pub mod export;
pub mod parser;

// Transformation
pub mod transform;

// State and reporting
pub mod report;
pub mod session;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    DocumentError, ExportError, LoadError, OperationError, ServerError, SessionError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Cell, Column, ColumnData, ColumnKind, Document};

// =============================================================================
// Re-exports - Loading
// =============================================================================

pub use parser::{
    detect_delimiter,
    detect_encoding,
    load_bytes,
    load_bytes_scoped,
    load_path,
    load_reader,
    LoadedDataset,
    SourceFormat,
    SourceInfo,
};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{export, export_scoped, ExportFormat, ExportedFile};

// =============================================================================
// Re-exports - Operations
// =============================================================================

pub use transform::{
    execute,
    operations_description,
    parse_operations,
    ExecutionReport,
    Operation,
    Statistic,
    TargetType,
};

// =============================================================================
// Re-exports - Session & Reporting
// =============================================================================

pub use report::{preview, profile, quality_issues, ColumnProfile, Overview, QualityIssue};
pub use session::{Session, SessionStore};

pub use config::Config;

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
