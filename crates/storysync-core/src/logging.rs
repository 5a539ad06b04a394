use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            message: message.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Final shape handed back to callers of a sync run. `success` is computed
/// strictly from the collected log, never inferred from exceptions.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub success: bool,
    pub created: usize,
    pub skipped: usize,
    pub errors: Vec<LogEntry>,
}

/// In-memory log collector for one top-level operation. Every entry is also
/// mirrored through `tracing` so the caller-facing log and the process log
/// stay in agreement.
#[derive(Debug)]
pub struct RunLog {
    pub run_id: Uuid,
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        let run_id = Uuid::new_v4();
        tracing::debug!(%run_id, "starting sync run");
        Self {
            run_id,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        match entry.level {
            LogLevel::Debug => tracing::debug!(message = %entry.message),
            LogLevel::Info => tracing::info!(message = %entry.message),
            LogLevel::Warn => tracing::warn!(message = %entry.message),
            LogLevel::Error => tracing::error!(message = %entry.message),
        }
        self.entries.push(entry);
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.push(LogEntry::new(LogLevel::Debug, message));
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogEntry::new(LogLevel::Info, message));
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(LogEntry::new(LogLevel::Warn, message));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(LogEntry::new(LogLevel::Error, message));
    }

    pub fn warn_with(&mut self, message: impl Into<String>, payload: serde_json::Value) {
        self.push(LogEntry::new(LogLevel::Warn, message).with_payload(payload));
    }

    pub fn error_with(&mut self, message: impl Into<String>, payload: serde_json::Value) {
        self.push(LogEntry::new(LogLevel::Error, message).with_payload(payload));
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = LogEntry>) {
        for entry in entries {
            self.entries.push(entry);
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn errors(&self) -> Vec<LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.level == LogLevel::Error)
            .cloned()
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|e| e.level == LogLevel::Error)
    }

    pub fn outcome(&self, created: usize, skipped: usize) -> SyncOutcome {
        let errors = self.errors();
        SyncOutcome {
            success: errors.is_empty(),
            created,
            skipped,
            errors,
        }
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}
