//! Pipeline log broadcasting.
//!
//! Loader, session and exporter report progress through the helpers below.
//! Each entry is echoed to stderr and fanned out over a broadcast channel
//! that `GET /api/logs` streams to clients as Server-Sent Events. Stdout is
//! left to command output.
//!
//! Work done on behalf of a session logs through a [`LogScope`] so its
//! entries only reach that session's subscribers.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Entries kept for slow SSE subscribers before they start lagging.
const CHANNEL_CAPACITY: usize = 256;

/// Log level for client display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth (sub-steps of a load or operation)
    #[serde(default)]
    pub indent: u8,
    /// Session the entry belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            indent: 0,
            session: None,
        }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    /// Whether an SSE subscriber filtering on `session` should receive this entry.
    /// Entries without a session are global and always delivered.
    pub fn visible_to(&self, session: Option<&str>) -> bool {
        match (session, self.session.as_deref()) {
            (Some(wanted), Some(own)) => wanted == own,
            _ => true,
        }
    }
}

/// Global log broadcaster
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

/// Broadcasts log entries to all connected SSE clients
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Echo an entry to stderr and send it to all subscribers
    pub fn log(&self, entry: LogEntry) {
        let prefix = match entry.level {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        };
        let indent = "   ".repeat(entry.indent as usize);
        match entry.session {
            Some(ref id) => eprintln!("{}{} [{}] {}", indent, prefix, short_id(id), entry.message),
            None => eprintln!("{}{} {}", indent, prefix, entry.message),
        }

        // No receivers is fine
        let _ = self.sender.send(entry);
    }

    /// Get a receiver for SSE streaming
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub fn log_info(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Success, msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Warning, msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Error, msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg).with_indent(indent));
}

pub fn log_warning_indent(msg: impl Into<String>, indent: u8) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Warning, msg).with_indent(indent));
}

/// Log on behalf of a session.
pub fn log_session(session: &str, level: LogLevel, msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(level, msg).with_session(session));
}

/// Target of the entries a piece of work emits: global, or one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogScope {
    session: Option<String>,
}

impl LogScope {
    pub fn global() -> Self {
        Self::default()
    }

    pub fn session(id: impl Into<String>) -> Self {
        Self {
            session: Some(id.into()),
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_deref()
    }

    pub fn log(&self, level: LogLevel, msg: impl Into<String>, indent: u8) {
        let mut entry = LogEntry::new(level, msg).with_indent(indent);
        entry.session = self.session.clone();
        LOG_BROADCASTER.log(entry);
    }

    pub fn info(&self, msg: impl Into<String>) {
        self.log(LogLevel::Info, msg, 0);
    }

    pub fn success(&self, msg: impl Into<String>) {
        self.log(LogLevel::Success, msg, 0);
    }

    pub fn warning(&self, msg: impl Into<String>) {
        self.log(LogLevel::Warning, msg, 0);
    }

    pub fn error(&self, msg: impl Into<String>) {
        self.log(LogLevel::Error, msg, 0);
    }

    pub fn info_indent(&self, msg: impl Into<String>, indent: u8) {
        self.log(LogLevel::Info, msg, indent);
    }

    pub fn warning_indent(&self, msg: impl Into<String>, indent: u8) {
        self.log(LogLevel::Warning, msg, indent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_serializes_camel_case() {
        let entry = LogEntry::new(LogLevel::Warning, "fallback to windows-1252")
            .with_indent(1)
            .with_session("abc");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["level"], "warning");
        assert_eq!(json["indent"], 1);
        assert_eq!(json["session"], "abc");
    }

    #[test]
    fn test_session_filter() {
        let global = LogEntry::new(LogLevel::Info, "server started");
        let scoped = LogEntry::new(LogLevel::Info, "reset").with_session("s1");
        assert!(global.visible_to(Some("s2")));
        assert!(scoped.visible_to(Some("s1")));
        assert!(!scoped.visible_to(Some("s2")));
        assert!(scoped.visible_to(None));
    }

    #[test]
    fn test_subscribers_receive_entries() {
        let broadcaster = LogBroadcaster::new();
        let mut rx = broadcaster.subscribe();
        broadcaster.log(LogEntry::new(LogLevel::Success, "loaded"));
        let entry = rx.try_recv().unwrap();
        assert_eq!(entry.message, "loaded");
        assert_eq!(entry.level, LogLevel::Success);
    }

    #[test]
    fn test_scoped_entries_carry_session() {
        let mut rx = LOG_BROADCASTER.subscribe();
        LogScope::session("scope-a").info_indent("scoped sub-step for scope-a", 2);

        let entry = std::iter::from_fn(|| match rx.try_recv() {
            Ok(entry) => Some(Some(entry)),
            Err(broadcast::error::TryRecvError::Lagged(_)) => Some(None),
            Err(_) => None,
        })
        .flatten()
        .find(|e| e.message == "scoped sub-step for scope-a")
        .unwrap();

        assert_eq!(entry.session.as_deref(), Some("scope-a"));
        assert_eq!(entry.indent, 2);
        assert!(!entry.visible_to(Some("scope-b")));
        assert_eq!(LogScope::global().session_id(), None);
    }
}
