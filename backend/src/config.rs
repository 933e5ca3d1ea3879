//! Runtime configuration.
//!
//! Values come from the environment (a `.env` file is loaded first by the
//! binary through `dotenvy`). CLI flags override them.

use crate::api::logs::log_warning;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default upload limit in megabytes.
pub const DEFAULT_MAX_UPLOAD_MB: usize = 50;

/// Rows shown in a preview, like a dataframe `head()`.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Server and preview settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub max_upload_bytes: usize,
    pub preview_rows: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

impl Config {
    /// Read `DATAPREP_PORT`, `DATAPREP_MAX_UPLOAD_MB` and `DATAPREP_PREVIEW_ROWS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            port: read("DATAPREP_PORT", &lookup).unwrap_or(defaults.port),
            max_upload_bytes: read::<usize>("DATAPREP_MAX_UPLOAD_MB", &lookup)
                .map(|mb| mb.saturating_mul(1024 * 1024))
                .unwrap_or(defaults.max_upload_bytes),
            preview_rows: read("DATAPREP_PREVIEW_ROWS", &lookup).unwrap_or(defaults.preview_rows),
        }
    }

    pub fn with_port(mut self, port: Option<u16>) -> Self {
        if let Some(port) = port {
            self.port = port;
        }
        self
    }
}

fn read<T: std::str::FromStr>(key: &str, lookup: &impl Fn(&str) -> Option<String>) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log_warning(format!("Ignoring {}={:?}: not a valid value", key, raw));
            None
        }
    }
}
