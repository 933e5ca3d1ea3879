//! Operation DSL for scripted dataset preparation.
//!
//! This module provides:
//! - `operations`: The serde-tagged [`Operation`] enum and its dispatch
//! - `executor`: Run an operation list against a document
//!
//! ## Usage Flow
//!
//! ```text
//! ops.json → parse_operations → execute(original, ops) → ExecutionReport
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use dataprep::parser::load_path;
//! use dataprep::transform::{execute, parse_operations};
//!
//! let loaded = load_path("sales.csv")?;
//! let ops = parse_operations(r#"[
//!     {"type": "fill_missing_statistic", "column": "price", "statistic": "median"},
//!     {"type": "filter_range", "column": "price", "min": 0, "max": 100}
//! ]"#)?;
//!
//! let report = execute(&loaded.document, &ops);
//! println!("{}", report.summary());
//! ```

pub mod executor;
pub mod operations;

pub use executor::{execute, parse_operations, ExecutionReport, StepOutcome};
pub use operations::{operations_description, Operation};
