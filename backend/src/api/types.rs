//! REST API types for the dataset preparation shell.
//!
//! Every session response carries the full view a client needs to redraw:
//! overview metrics, column profiles, the preview rows and quality issues.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::ColumnKind;
use crate::parser::SourceInfo;
use crate::report::{preview, profile, quality_issues, ColumnProfile, Overview, QualityIssue};
use crate::session::Session;

/// Response to `POST /api/sessions`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreated {
    pub session_id: String,
}

/// Current state of a session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: String,

    /// Whether a dataset has been uploaded
    pub loaded: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<Overview>,

    pub columns: Vec<ColumnProfile>,

    /// First rows of the current document, as records
    pub preview: Vec<Value>,

    pub issues: Vec<QualityIssue>,

    /// Operations applied since the last upload or reset
    pub operations_applied: usize,
}

impl SessionView {
    pub fn of(session: &Session, preview_rows: usize) -> Self {
        let current = session.current();
        Self {
            session_id: session.id().to_string(),
            loaded: session.is_loaded(),
            source: session.source().cloned(),
            overview: current.map(Overview::of),
            columns: current.map(profile).unwrap_or_default(),
            preview: current.map(|d| preview(d, preview_rows)).unwrap_or_default(),
            issues: current.map(quality_issues).unwrap_or_default(),
            operations_applied: session.operation_count(),
        }
    }
}

/// Filter helpers for one column
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnValues {
    pub column: String,
    pub kind: ColumnKind,
    /// Distinct values, first-seen order (membership filter choices)
    pub unique: Vec<String>,
    /// `[min, max]` for numeric columns (range filter defaults)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<[f64; 2]>,
}

/// Query of `GET /api/sessions/{id}/download`
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadQuery {
    #[serde(default = "default_download_format")]
    pub format: String,
}

fn default_download_format() -> String {
    "csv".to_string()
}

/// Query of `GET /api/logs`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogsQuery {
    pub session: Option<String>,
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_session_view() {
        let session = Session::new();
        let view = serde_json::to_value(SessionView::of(&session, 5)).unwrap();

        assert_eq!(view["loaded"], false);
        assert_eq!(view["operationsApplied"], 0);
        assert!(view.get("overview").is_none());
        assert_eq!(view["preview"], json!([]));
    }

    #[test]
    fn test_loaded_session_view() {
        let mut session = Session::new();
        session.load("t.csv", b"a,b\n1,x\n2,\n3,z\n").unwrap();
        let view = serde_json::to_value(SessionView::of(&session, 2)).unwrap();

        assert_eq!(view["overview"], json!({"rows": 3, "columns": 2, "missing": 1}));
        assert_eq!(view["preview"].as_array().unwrap().len(), 2);
        assert_eq!(view["columns"][0]["kind"], "numeric");
        assert_eq!(view["source"]["fileName"], "t.csv");
    }

    #[test]
    fn test_error_response_shape() {
        let body = error_response("Column not found: x");
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "Column not found: x");
    }
}
