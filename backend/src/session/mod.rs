//! Per-user working state.
//!
//! A [`Session`] owns the document as loaded (`original`) and the document
//! after the operations applied since (`current`). A [`SessionStore`] keeps
//! many sessions apart, keyed by id, for the HTTP shell.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};
use uuid::Uuid;

use crate::api::logs::{log_session, LogLevel, LogScope};
use crate::error::{SessionError, SessionResult};
use crate::export::{export_scoped, ExportFormat, ExportedFile};
use crate::models::Document;
use crate::parser::{load_bytes_scoped, LoadedDataset, SourceInfo};
use crate::transform::Operation;

struct Loaded {
    original: Document,
    current: Document,
    source: SourceInfo,
    operations: usize,
}

/// One user's dataset and its edits.
pub struct Session {
    id: Uuid,
    loaded: Option<Loaded>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        Self { id, loaded: None }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Log target for work done on behalf of this session.
    pub fn scope(&self) -> LogScope {
        LogScope::session(self.id.to_string())
    }

    /// Parse `bytes` and make the result both the original and the current
    /// document. On failure the previous state is kept.
    pub fn load(&mut self, file_name: &str, bytes: &[u8]) -> SessionResult<&Document> {
        match load_bytes_scoped(file_name, bytes, &self.scope()) {
            Ok(dataset) => Ok(self.load_dataset(dataset)),
            Err(e) => {
                self.log(LogLevel::Error, format!("Error loading file: {}", e));
                Err(e.into())
            }
        }
    }

    /// Install an already parsed dataset.
    pub fn load_dataset(&mut self, dataset: LoadedDataset) -> &Document {
        self.log(
            LogLevel::Success,
            format!(
                "Loaded {} ({} rows x {} columns)",
                dataset.source.file_name,
                dataset.document.row_count(),
                dataset.document.column_count()
            ),
        );
        let loaded = self.loaded.insert(Loaded {
            current: dataset.document.clone(),
            original: dataset.document,
            source: dataset.source,
            operations: 0,
        });
        &loaded.current
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn current(&self) -> Option<&Document> {
        self.loaded.as_ref().map(|l| &l.current)
    }

    pub fn original(&self) -> Option<&Document> {
        self.loaded.as_ref().map(|l| &l.original)
    }

    pub fn source(&self) -> Option<&SourceInfo> {
        self.loaded.as_ref().map(|l| &l.source)
    }

    /// Operations applied since the last load or reset.
    pub fn operation_count(&self) -> usize {
        self.loaded.as_ref().map_or(0, |l| l.operations)
    }

    /// Apply one operation to the current document. A rejected operation
    /// leaves the session unchanged.
    pub fn apply(&mut self, op: &Operation) -> SessionResult<&Document> {
        if op.is_reset() {
            return self.reset();
        }
        let id = self.id;
        let loaded = self.loaded.as_mut().ok_or(SessionError::NoDataset)?;

        match op.apply(&loaded.current) {
            Ok(next) => {
                log_session(
                    &id.to_string(),
                    LogLevel::Success,
                    format!("{} ({} rows x {} columns)", op.describe(), next.row_count(), next.column_count()),
                );
                loaded.current = next;
                loaded.operations += 1;
                Ok(&loaded.current)
            }
            Err(e) => {
                log_session(
                    &id.to_string(),
                    LogLevel::Error,
                    format!("{} failed: {}", op.describe(), e),
                );
                Err(e.into())
            }
        }
    }

    /// Replace the current document with a copy of the original.
    pub fn reset(&mut self) -> SessionResult<&Document> {
        let id = self.id;
        let loaded = self.loaded.as_mut().ok_or(SessionError::NoDataset)?;
        loaded.current = loaded.original.clone();
        loaded.operations = 0;
        log_session(&id.to_string(), LogLevel::Info, "Reset to original data");
        Ok(&loaded.current)
    }

    /// Serialize the current document.
    pub fn export(&self, format: ExportFormat) -> SessionResult<ExportedFile> {
        let current = self.current().ok_or(SessionError::NoDataset)?;
        export_scoped(current, format, &self.scope()).map_err(|e| {
            self.log(LogLevel::Error, format!("Export to {} failed: {}", format, e));
            e.into()
        })
    }

    fn log(&self, level: LogLevel, msg: String) {
        self.scope().log(level, msg, 0);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Sessions keyed by id. Each session sits behind its own lock, so work on
/// one never waits for another.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Mutex<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh, empty session and return its id.
    pub fn create(&self) -> Uuid {
        let session = Session::new();
        let id = session.id();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Mutex::new(session));
        log_session(&id.to_string(), LogLevel::Info, "Session created");
        id
    }

    /// Run `f` with exclusive access to session `id`. `None` if unknown.
    pub fn with_session<T>(&self, id: &Uuid, f: impl FnOnce(&mut Session) -> T) -> Option<T> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        let slot = sessions.get(id)?;
        let mut session = slot.lock().unwrap_or_else(PoisonError::into_inner);
        Some(f(&mut session))
    }

    /// Drop session `id`. Returns whether it existed.
    pub fn remove(&self, id: &Uuid) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some();
        if removed {
            log_session(&id.to_string(), LogLevel::Info, "Session closed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
