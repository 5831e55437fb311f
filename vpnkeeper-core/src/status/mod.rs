//! Status reporting
//!
//! Defines the [`StatusSink`] interface the supervisor reports through, the
//! event types flowing over it, and [`StatusLog`], the buffered in-memory
//! implementation used by the CLI.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod log;

pub use log::StatusLog;

/// Severity of a status event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Verbose,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warning => write!(f, "warning"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Verbose => write!(f, "verbose"),
        }
    }
}

/// Coarse connection level attached to state updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionLevel {
    Connected,
    VpnConnecting,
    ConnectingServerReplied,
    ConnectingNoServerReply,
    NoNetwork,
    NotConnected,
    Start,
    AuthFailed,
    WaitingForUserInput,
    Unknown,
}

/// A named state transition reported to the sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    /// Machine-readable state code, e.g. `NOPROCESS`
    pub code: String,
    /// Human-readable description
    pub message: String,
    /// Key of the localized string describing this state
    pub resource_key: String,
    pub level: ConnectionLevel,
}

impl StateUpdate {
    pub fn new(code: &str, message: &str, resource_key: &str, level: ConnectionLevel) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            resource_key: resource_key.to_string(),
            level,
        }
    }

    /// Terminal update emitted once the engine process is gone
    pub fn no_process() -> Self {
        Self::new(
            "NOPROCESS",
            "No process running.",
            "state_noprocess",
            ConnectionLevel::NotConnected,
        )
    }
}

/// One buffered entry of the status history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogItem {
    timestamp: DateTime<Local>,
    level: LogLevel,
    verbosity: u8,
    message: String,
}

impl LogItem {
    /// Create an item stamped with the current local time
    pub fn new(level: LogLevel, verbosity: u8, message: impl Into<String>) -> Self {
        Self::at(Local::now(), level, verbosity, message)
    }

    /// Create an item with an explicit timestamp
    pub fn at(
        timestamp: DateTime<Local>,
        level: LogLevel,
        verbosity: u8,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            level,
            verbosity,
            message: message.into(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    /// Message text as it should appear in a rendered log
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Receiver of everything the supervisor has to say
///
/// Implementations must be safe to call from the supervisor task while other
/// threads read or append to the same sink.
pub trait StatusSink: Send + Sync {
    /// Record a leveled message decoded from the engine
    fn log_message(&self, level: LogLevel, verbosity: u8, message: &str);

    fn log_error(&self, message: &str) {
        self.log_message(LogLevel::Error, 0, message);
    }

    fn log_info(&self, message: &str) {
        self.log_message(LogLevel::Info, 0, message);
    }

    /// Record a failure together with what was being attempted
    fn log_exception(&self, context: &str, error: &dyn std::error::Error) {
        self.log_error(&format!("{}: {}", context, error));
    }

    /// Publish a connection state change
    fn update_state(&self, update: StateUpdate);

    /// Inspect a decoded engine message for conditions worth surfacing
    fn add_extra_hints(&self, _message: &str) {}

    /// Buffered history in chronological order, used for crash dumps
    fn history(&self) -> Vec<LogItem>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_process_update() {
        let update = StateUpdate::no_process();
        assert_eq!(update.code, "NOPROCESS");
        assert_eq!(update.message, "No process running.");
        assert_eq!(update.level, ConnectionLevel::NotConnected);
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Error.to_string(), "error");
        assert_eq!(LogLevel::Verbose.to_string(), "verbose");
    }
}
