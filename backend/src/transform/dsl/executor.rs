//! DSL Executor
//!
//! Runs an operation list against a loaded document. A failing step is
//! recorded and skipped; later steps see the document as it was before it.

use serde::{Deserialize, Serialize};

use super::operations::Operation;
use crate::api::logs::{log_info, log_info_indent, log_warning_indent};
use crate::models::Document;

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub index: usize,
    pub operation: String,
    pub description: String,
    /// Row count after the step (unchanged when it failed)
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of executing an operation list
#[derive(Debug)]
pub struct ExecutionReport {
    pub document: Document,
    pub steps: Vec<StepOutcome>,
}

impl ExecutionReport {
    /// Check if every step succeeded
    pub fn is_ok(&self) -> bool {
        self.steps.iter().all(|s| s.error.is_none())
    }

    pub fn failed(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| s.error.is_some())
    }

    /// Get summary statistics
    pub fn summary(&self) -> String {
        let failed = self.failed().count();
        format!(
            "Applied: {} operations, {} failed, {} rows x {} columns",
            self.steps.len() - failed,
            failed,
            self.document.row_count(),
            self.document.column_count()
        )
    }
}

/// Apply `operations` in order, starting from a copy of `original`.
pub fn execute(original: &Document, operations: &[Operation]) -> ExecutionReport {
    let mut document = original.clone();
    let mut steps = Vec::with_capacity(operations.len());

    log_info(format!("Executing {} operations", operations.len()));

    for (index, op) in operations.iter().enumerate() {
        let result = if op.is_reset() {
            Ok(original.clone())
        } else {
            op.apply(&document)
        };

        let error = match result {
            Ok(next) => {
                document = next;
                log_info_indent(format!("{} ({} rows)", op.describe(), document.row_count()), 1);
                None
            }
            Err(e) => {
                log_warning_indent(format!("{} failed: {}", op.describe(), e), 1);
                Some(e.to_string())
            }
        };

        steps.push(StepOutcome {
            index,
            operation: op.name().to_string(),
            description: op.describe(),
            rows: document.row_count(),
            error,
        });
    }

    ExecutionReport { document, steps }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Operation>),
    One(Operation),
}

/// Parse an operation list. A single operation object is accepted too.
pub fn parse_operations(json: &str) -> Result<Vec<Operation>, serde_json::Error> {
    Ok(match serde_json::from_str::<OneOrMany>(json)? {
        OneOrMany::Many(ops) => ops,
        OneOrMany::One(op) => vec![op],
    })
}
