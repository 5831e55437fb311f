//! TOML configuration file I/O
//!
//! Handles loading and saving supervisor configuration to/from TOML files
//! in the user's configuration directory.

use crate::config::KeeperConfig;
use crate::error::{ConfigError, KeeperError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default configuration file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_VAR: &str = "VPNKEEPER_CONFIG_DIR";

/// Get the default configuration directory
///
/// Returns ~/.config/vpnkeeper, or `VPNKEEPER_CONFIG_DIR` if set.
pub fn get_config_dir() -> Result<PathBuf, KeeperError> {
    // Allow tests to override config directory via environment variable
    if let Ok(config_dir) = std::env::var(CONFIG_DIR_VAR) {
        return Ok(PathBuf::from(config_dir));
    }

    let home = std::env::var("HOME").map_err(|_| {
        KeeperError::Config(ConfigError::IoError {
            message: "HOME environment variable not set".to_string(),
        })
    })?;

    Ok(PathBuf::from(home).join(".config").join("vpnkeeper"))
}

/// Get the default configuration file path
pub fn get_config_path() -> Result<PathBuf, KeeperError> {
    let config_dir = get_config_dir()?;
    Ok(config_dir.join(CONFIG_FILE_NAME))
}

/// Load configuration from the default TOML file
pub fn load_config() -> Result<KeeperConfig, KeeperError> {
    let config_path = get_config_path()?;
    load_config_from_path(&config_path)
}

/// Load configuration from a specific TOML file
pub fn load_config_from_path<P: AsRef<Path>>(path: P) -> Result<KeeperConfig, KeeperError> {
    let contents = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => KeeperError::Config(ConfigError::LoadFailed {
            path: path.as_ref().to_string_lossy().to_string(),
        }),
        _ => KeeperError::Config(ConfigError::IoError {
            message: format!("Failed to read config file: {}", e),
        }),
    })?;

    let config: KeeperConfig = toml::from_str(&contents)?;

    config
        .validate()
        .map_err(|e| KeeperError::Config(ConfigError::ValidationError { message: e }))?;

    debug!(
        "Loaded configuration: engine={}, shutdown_mode={:?}, history_capacity={}",
        config.engine.binary, config.supervisor.shutdown_mode, config.status.history_capacity
    );

    Ok(config)
}

/// Save configuration to a specific TOML file
pub fn save_config_to_path<P: AsRef<Path>>(
    config: &KeeperConfig,
    path: P,
) -> Result<(), KeeperError> {
    // Validate configuration before saving
    config
        .validate()
        .map_err(|e| KeeperError::Config(ConfigError::ValidationError { message: e }))?;

    // Ensure config directory exists
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            KeeperError::Config(ConfigError::IoError {
                message: format!("Failed to create config directory: {}", e),
            })
        })?;
    }

    let toml_string = toml::to_string_pretty(config)?;

    std::fs::write(&path, toml_string).map_err(|_e| {
        KeeperError::Config(ConfigError::SaveFailed {
            path: path.as_ref().to_string_lossy().to_string(),
        })
    })?;

    info!("Saved configuration to {:?}", path.as_ref());
    Ok(())
}

/// Check if a configuration file exists
pub fn config_exists() -> Result<bool, KeeperError> {
    let config_path = get_config_path()?;
    Ok(config_path.exists())
}
