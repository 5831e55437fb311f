//! vpnkeeper - VPN engine supervisor
//!
//! Launches an external OpenVPN engine, decodes its management log into
//! status events and takes care of clean and crash-path shutdown.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use vpnkeeper_core::error::KeeperError;
use vpnkeeper_core::init_logging;

mod cli;

#[derive(Parser)]
#[command(name = "vpnkeeper")]
#[command(about = "Supervise an OpenVPN engine process and decode its log stream")]
struct Cli {
    /// Increase diagnostic output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the engine and supervise it until it exits
    Run {
        /// Configuration file to use instead of the default location
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Do not announce the end of the run
        #[arg(long)]
        silent: bool,

        /// Extra arguments passed to the engine
        #[arg(last = true)]
        engine_args: Vec<String>,
    },
    /// Decode a captured engine log
    Decode {
        /// Log file to decode (stdin if omitted)
        file: Option<PathBuf>,

        /// Print one JSON object per line
        #[arg(long)]
        json: bool,
    },
    /// Print the library search path the engine would get
    Libpath {
        /// Path of the engine executable
        #[arg(long)]
        exe: String,

        /// Configured native library directory
        #[arg(long)]
        native_dir: String,
    },
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the loaded configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
}

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Exit code for a failed command
///
/// Configuration problems exit with 2, everything else with 1.
fn exit_code_for(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<KeeperError>() {
        Some(KeeperError::Config(_)) | Some(KeeperError::Toml(_)) | Some(KeeperError::TomlSerialize(_)) => 2,
        Some(KeeperError::Supervisor(_)) | Some(KeeperError::Io(_)) | None => 1,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    if let Err(e) = init_logging(log_level(cli.verbose)) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    let result = match cli.command {
        Commands::Run {
            config,
            silent,
            engine_args,
        } => cli::run::run_engine(config, silent, engine_args)
            .await
            .map_err(anyhow::Error::from),
        Commands::Decode { file, json } => cli::decode::run_decode(file, json).map(|()| 0),
        Commands::Libpath { exe, native_dir } => {
            cli::libpath::run_libpath(&exe, &native_dir);
            Ok(0)
        }
        Commands::Config { action } => match action {
            ConfigCommands::Show => cli::config::run_config_show(),
            ConfigCommands::Init { force } => cli::config::run_config_init(force),
        }
        .map(|()| 0)
        .map_err(anyhow::Error::from),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(exit_code_for(&e));
        }
    }
}
