//! Import log with live streaming via Server-Sent Events (SSE).
//!
//! [`ImportLog`] is a cheap, cloneable handle handed to each component that
//! reports progress. Every entry is emitted as a `tracing` event and fanned
//! out to whoever subscribed (the `/api/logs` stream).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Entries buffered per subscriber before the slowest one starts lagging.
const CHANNEL_CAPACITY: usize = 100;

/// Log level for frontend display
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
    /// File the entry relates to, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into(), filename: None }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Handle used by the importer, the gateway and the job workers.
#[derive(Debug, Clone)]
pub struct ImportLog {
    sender: broadcast::Sender<LogEntry>,
}

impl ImportLog {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Record an entry.
    pub fn log(&self, entry: LogEntry) {
        let file = entry.filename.as_deref().unwrap_or("-");
        match entry.level {
            LogLevel::Info => tracing::info!(filename = file, "{}", entry.message),
            LogLevel::Success => tracing::info!(filename = file, outcome = "success", "{}", entry.message),
            LogLevel::Warning => tracing::warn!(filename = file, "{}", entry.message),
            LogLevel::Error => tracing::error!(filename = file, "{}", entry.message),
        }

        // No subscribers is fine.
        let _ = self.sender.send(entry);
    }

    pub fn info(&self, msg: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Info, msg));
    }

    pub fn success(&self, msg: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Success, msg));
    }

    pub fn warning(&self, msg: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Warning, msg));
    }

    pub fn error(&self, msg: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Error, msg));
    }

    /// Get a receiver for SSE streaming
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for ImportLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_entries() {
        let log = ImportLog::new();
        let mut rx = log.subscribe();

        log.warning("2 rows rejected");
        log.log(LogEntry::new(LogLevel::Error, "missing columns").with_filename("a.csv"));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.level, LogLevel::Warning);
        assert_eq!(first.message, "2 rows rejected");

        let second = rx.recv().await.unwrap();
        assert_eq!(second.filename.as_deref(), Some("a.csv"));
    }

    #[test]
    fn test_logging_without_subscribers_is_silent() {
        let log = ImportLog::default();
        log.info("nobody listening");
    }

    #[test]
    fn test_entry_serialization() {
        let entry = LogEntry::new(LogLevel::Success, "done");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["level"], "success");
        assert!(json.get("filename").is_none());
    }
}
