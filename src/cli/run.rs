//! Engine supervision command
//!
//! Loads the configuration, launches the engine and prints its status
//! events until it exits or Ctrl+C is pressed.

use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use vpnkeeper_core::config::toml_config::{load_config, load_config_from_path};
use vpnkeeper_core::error::{KeeperError, SupervisorError};
use vpnkeeper_core::status::{LogItem, LogLevel, StateUpdate, StatusLog, StatusSink};
use vpnkeeper_core::vpn::{LogLineDecoder, ProcessLifecycle, ShutdownMode, Supervisor};

/// Status sink printing every event to the terminal
struct ConsoleSink {
    log: StatusLog,
}

impl StatusSink for ConsoleSink {
    fn log_message(&self, level: LogLevel, verbosity: u8, message: &str) {
        let tag = match level {
            LogLevel::Error => "E".red().bold(),
            LogLevel::Warning => "W".yellow().bold(),
            LogLevel::Info => "I".normal(),
            LogLevel::Verbose => "V".dimmed(),
        };
        println!("{} {:>2} {}", tag, verbosity, message);
        self.log.log_message(level, verbosity, message);
    }

    fn update_state(&self, update: StateUpdate) {
        println!("{} {}", format!("[{}]", update.code).cyan(), update.message);
        self.log.update_state(update);
    }

    fn add_extra_hints(&self, message: &str) {
        self.log.add_extra_hints(message);
    }

    fn history(&self) -> Vec<LogItem> {
        self.log.history()
    }
}

/// Run the engine under supervision
///
/// Returns the process exit code: 0 if the engine exited cleanly, 1 otherwise.
pub async fn run_engine(
    config_path: Option<PathBuf>,
    silent: bool,
    engine_args: Vec<String>,
) -> Result<i32, KeeperError> {
    let config = match config_path {
        Some(path) => load_config_from_path(path)?,
        None => load_config()?,
    };

    let binary = which::which(&config.engine.binary).map_err(|e| {
        SupervisorError::ProcessSpawnError {
            program: config.engine.binary.clone(),
            reason: e.to_string(),
        }
    })?;
    info!("Using engine binary {}", binary.display());

    let shutdown_mode = if silent {
        ShutdownMode::Silent
    } else {
        config.supervisor.shutdown_mode
    };

    let sink = Arc::new(ConsoleSink {
        log: StatusLog::new(config.status.history_capacity),
    });
    let lifecycle: Arc<dyn ProcessLifecycle> =
        Arc::new(|| println!("{}", "Engine process stopped".bold()));

    let supervisor = Supervisor::new(config.engine.command(&binary, &engine_args), sink)
        .with_shutdown_mode(shutdown_mode)
        .with_decoder(LogLineDecoder::with_management_cmd_verbosity(
            config.supervisor.management_cmd_verbosity,
        ))
        .with_termination_grace(config.supervisor.termination_grace())
        .with_lifecycle(lifecycle);

    let handle = supervisor.handle();
    let ctrl_c = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                println!("{}", "Stopping engine...".yellow());
                handle.stop();
            }
            Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    let report = supervisor.run().await;
    ctrl_c.abort();
    let report = report?;

    if let Some(dump_log) = &report.dump_log {
        println!("Crash log written to {}", dump_log.display());
    }

    if report.exit_code == 0 {
        println!("{}", "✓ Engine exited cleanly".green());
        Ok(0)
    } else {
        println!(
            "{}",
            format!("✗ Engine exited with exit value {}", report.exit_code).red()
        );
        Ok(1)
    }
}
