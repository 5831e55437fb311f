//! Configuration commands
//!
//! Shows the active configuration or writes a default one.

use colored::Colorize;
use vpnkeeper_core::config::toml_config::{
    config_exists, get_config_path, load_config, save_config_to_path,
};
use vpnkeeper_core::config::KeeperConfig;
use vpnkeeper_core::error::{ConfigError, KeeperError};

/// Print the loaded configuration as TOML
pub fn run_config_show() -> Result<(), KeeperError> {
    let config = load_config()?;
    println!("# {}", get_config_path()?.display());
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

/// Write the default configuration unless one already exists
pub fn run_config_init(force: bool) -> Result<(), KeeperError> {
    let path = get_config_path()?;

    if config_exists()? && !force {
        return Err(KeeperError::Config(ConfigError::ValidationError {
            message: format!(
                "Configuration already exists at {} (use --force to overwrite)",
                path.display()
            ),
        }));
    }

    save_config_to_path(&KeeperConfig::default(), &path)?;
    println!("{} Wrote default configuration to {}", "✓".green(), path.display());
    Ok(())
}
