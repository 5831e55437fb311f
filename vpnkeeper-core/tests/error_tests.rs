//! Unit tests for error types and conversions

use vpnkeeper_core::error::{ConfigError, KeeperError, SupervisorError};

#[test]
fn test_config_error_display() {
    let error = ConfigError::LoadFailed {
        path: "/etc/vpnkeeper/config.toml".to_string(),
    };
    assert_eq!(
        error.to_string(),
        "Failed to load configuration file: /etc/vpnkeeper/config.toml"
    );
}

#[test]
fn test_supervisor_error_display() {
    let error = SupervisorError::ProcessSpawnError {
        program: "openvpn".to_string(),
        reason: "No such file or directory".to_string(),
    };
    assert_eq!(
        error.to_string(),
        "Failed to spawn engine process openvpn: No such file or directory"
    );
    assert_eq!(
        SupervisorError::EmptyCommandLine.to_string(),
        "Engine command line is empty"
    );
}

#[test]
fn test_keeper_error_from_config() {
    let config_error = ConfigError::ValidationError {
        message: "bad".to_string(),
    };
    let keeper_error: KeeperError = config_error.into();
    assert!(matches!(keeper_error, KeeperError::Config(_)));
}

#[test]
fn test_keeper_error_from_supervisor() {
    let keeper_error: KeeperError = SupervisorError::OutputCaptureFailed {
        reason: "Too many open files".to_string(),
    }
    .into();
    assert!(matches!(keeper_error, KeeperError::Supervisor(_)));
    assert_eq!(
        keeper_error.to_string(),
        "Supervisor error: Failed to capture engine output stream: Too many open files"
    );
}

#[test]
fn test_keeper_error_from_io() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let keeper_error: KeeperError = io_error.into();
    assert!(matches!(keeper_error, KeeperError::Io(_)));
}

#[test]
fn test_keeper_error_from_toml() {
    let toml_error: toml::de::Error =
        toml::from_str::<serde_json::Value>("invalid toml").unwrap_err();
    let keeper_error: KeeperError = toml_error.into();
    assert!(matches!(keeper_error, KeeperError::Toml(_)));
}
