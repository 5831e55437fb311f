//! Error types for the vpnkeeper supervisor
//!
//! This module defines all error types used throughout the application,
//! providing consistent error handling and user-friendly error messages.

use thiserror::Error;

/// Main error type for the vpnkeeper application
#[derive(Error, Debug)]
pub enum KeeperError {
    /// Errors related to configuration loading/parsing
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors raised while starting the engine process
    #[error("Supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {path}")]
    LoadFailed { path: String },

    #[error("Failed to save configuration file: {path}")]
    SaveFailed { path: String },

    #[error("Configuration validation error: {message}")]
    ValidationError { message: String },

    #[error("I/O error: {message}")]
    IoError { message: String },
}

/// Engine supervision errors
///
/// Only failures to get the child running surface here. Anything that goes
/// wrong once the child is up is reported through the status sink instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("Engine command line is empty")]
    EmptyCommandLine,

    #[error("Failed to spawn engine process {program}: {reason}")]
    ProcessSpawnError { program: String, reason: String },

    #[error("Failed to capture engine output stream: {reason}")]
    OutputCaptureFailed { reason: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, KeeperError>;
