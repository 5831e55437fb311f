//! Configuration module
//!
//! Handles loading and saving supervisor configuration from TOML files.

use crate::status::log::DEFAULT_HISTORY_CAPACITY;
use crate::vpn::log_decoder::DEFAULT_MANAGEMENT_CMD_VERBOSITY;
use crate::vpn::supervisor::{EngineCommand, ShutdownMode, DEFAULT_TERMINATION_GRACE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod toml_config;

/// Complete supervisor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct KeeperConfig {
    /// How to launch the engine
    pub engine: EngineConfig,

    /// Shutdown and decoding policy
    #[serde(default)]
    pub supervisor: SupervisorConfig,

    /// Status history settings
    #[serde(default)]
    pub status: StatusConfig,
}

/// Engine process settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine executable, either a path or a name looked up in `PATH`
    pub binary: String,

    /// Arguments passed before any given on the command line
    #[serde(default)]
    pub args: Vec<String>,

    /// Directory holding the engine's native libraries
    pub native_lib_dir: PathBuf,

    /// Scratch directory exported to the engine as `TMPDIR`
    pub tmp_dir: PathBuf,
}

impl EngineConfig {
    /// Build the engine command line for `binary` plus configured and extra args
    pub fn command(&self, binary: &Path, extra_args: &[String]) -> EngineCommand {
        let argv = std::iter::once(binary.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .chain(extra_args.iter().cloned())
            .collect();

        EngineCommand::new(
            argv,
            self.native_lib_dir.to_string_lossy(),
            self.tmp_dir.to_string_lossy(),
        )
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: "openvpn".to_string(),
            args: Vec::new(),
            native_lib_dir: PathBuf::from("/usr/lib/openvpn"),
            tmp_dir: std::env::temp_dir(),
        }
    }
}

/// Supervisor policy settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Whether the end of a run is announced
    pub shutdown_mode: ShutdownMode,

    /// Seconds between SIGTERM and SIGKILL when stopping the engine
    pub termination_grace_secs: u64,

    /// Minimum verbosity for echoed `MANAGEMENT: CMD` lines (0-15)
    pub management_cmd_verbosity: u8,
}

impl SupervisorConfig {
    pub fn termination_grace(&self) -> Duration {
        Duration::from_secs(self.termination_grace_secs)
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            shutdown_mode: ShutdownMode::default(),
            termination_grace_secs: DEFAULT_TERMINATION_GRACE.as_secs(),
            management_cmd_verbosity: DEFAULT_MANAGEMENT_CMD_VERBOSITY,
        }
    }
}

/// Status history settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Number of log items kept for crash dumps
    pub history_capacity: usize,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl KeeperConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.engine.binary.trim().is_empty() {
            return Err("Engine binary cannot be empty".to_string());
        }

        if !self.engine.native_lib_dir.is_absolute() {
            return Err("Native library directory must be an absolute path".to_string());
        }

        if !self.engine.tmp_dir.is_absolute() {
            return Err("Temporary directory must be an absolute path".to_string());
        }

        if self.supervisor.management_cmd_verbosity > 0x0f {
            return Err("Management command verbosity must be between 0 and 15".to_string());
        }

        if self.status.history_capacity == 0 {
            return Err("History capacity cannot be zero".to_string());
        }

        Ok(())
    }
}
