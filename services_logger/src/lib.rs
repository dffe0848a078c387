//! # Logger Service
//!
//! This crate implements structured logging for the navigator.
//!
//! ## Philosophy
//!
//! Logging is explicit and structured, not text-based or printf-style.
//! Components receive a [`LogSink`] and emit [`LogEntry`] values; where the
//! entries end up is the caller's decision.

use std::cell::RefCell;
use std::fmt;

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational messages
    Info,
    /// Warnings
    Warn,
    /// Errors
    Error,
}

impl LogLevel {
    fn as_log_level(self) -> log::Level {
        match self {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// A structured log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Emitting component
    pub component: &'static str,
    /// Log message
    pub message: String,
    /// Structured fields
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    /// Creates a new log entry
    pub fn new(level: LogLevel, component: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            component,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn debug(component: &'static str, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, component, message)
    }

    pub fn info(component: &'static str, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, component, message)
    }

    pub fn warn(component: &'static str, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, component, message)
    }

    pub fn error(component: &'static str, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, component, message)
    }

    /// Adds a field to the log entry
    pub fn with_field(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.fields.push((key.into(), value.to_string()));
        self
    }

    /// Returns the value of the first field named `key`
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for (key, value) in &self.fields {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

/// Destination for log entries
pub trait LogSink {
    fn log(&self, entry: LogEntry);
}

/// Discards every entry
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _entry: LogEntry) {}
}

/// Keeps entries in memory for inspection
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: RefCell<Vec<LogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded entries
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.borrow().clone()
    }

    /// Returns the recorded entries at `level` or above
    pub fn at_least(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.level >= level)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl LogSink for MemorySink {
    fn log(&self, entry: LogEntry) {
        self.entries.borrow_mut().push(entry);
    }
}

/// Forwards entries to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct FacadeSink;

impl LogSink for FacadeSink {
    fn log(&self, entry: LogEntry) {
        log::log!(target: entry.component, entry.level.as_log_level(), "{}", entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_log_entry_creation() {
        let entry = LogEntry::info("reader", "test message");
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.component, "reader");
        assert_eq!(entry.message, "test message");
        assert!(entry.fields.is_empty());
    }

    #[test]
    fn test_log_entry_with_fields() {
        let entry = LogEntry::warn("volumes", "skipped")
            .with_field("volume", "Handle(0x1000)")
            .with_field("count", 2);

        assert_eq!(entry.fields.len(), 2);
        assert_eq!(entry.field("volume"), Some("Handle(0x1000)"));
        assert_eq!(entry.field("count"), Some("2"));
        assert_eq!(entry.field("missing"), None);
    }

    #[test]
    fn test_display_appends_fields() {
        let entry = LogEntry::error("reader", "not a directory").with_field("path", "\\EFI");
        assert_eq!(entry.to_string(), "not a directory path=\\EFI");
    }

    #[test]
    fn test_memory_sink_filters_by_level() {
        let sink = MemorySink::new();
        sink.log(LogEntry::debug("a", "one"));
        sink.log(LogEntry::warn("a", "two"));
        sink.log(LogEntry::error("a", "three"));

        assert_eq!(sink.len(), 3);
        let important = sink.at_least(LogLevel::Warn);
        assert_eq!(important.len(), 2);
        assert_eq!(important[0].message, "two");
    }

    #[test]
    fn test_null_and_facade_sinks_accept_entries() {
        NullSink.log(LogEntry::info("a", "dropped"));
        FacadeSink.log(LogEntry::info("a", "forwarded"));
    }
}
