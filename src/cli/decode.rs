//! Log decoding command
//!
//! Decodes a captured engine log offline, printing one event per line.

use anyhow::Context;
use colored::Colorize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use vpnkeeper_core::status::LogLevel;
use vpnkeeper_core::vpn::{LogLineDecoder, ParsedEvent};

fn render(event: &ParsedEvent) -> String {
    match event {
        ParsedEvent::Status {
            level,
            verbosity,
            message,
        } => {
            let label = format!("{:<7}", level.to_string());
            let label = match level {
                LogLevel::Error => label.red(),
                LogLevel::Warning => label.yellow(),
                LogLevel::Info => label.normal(),
                LogLevel::Verbose => label.dimmed(),
            };
            format!("{} {:>2} {}", label, verbosity, message)
        }
        ParsedEvent::DumpPath { path } => format!("{} {}", "dump   ".magenta(), path),
        ParsedEvent::Raw { text } => ParsedEvent::passthrough_text(text).dimmed().to_string(),
    }
}

/// Decode an engine log from `file`, or stdin when no file is given
pub fn run_decode(file: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let input: Box<dyn BufRead> = match &file {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let decoder = LogLineDecoder::new();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for raw in input.split(b'\n') {
        let raw = raw.context("Failed to read log input")?;
        let line = String::from_utf8_lossy(&raw);
        let line = line.strip_suffix('\r').unwrap_or(&*line);

        let event = decoder.decode(line);
        if json {
            writeln!(out, "{}", serde_json::to_string(&event)?)?;
        } else {
            writeln!(out, "{}", render(&event))?;
        }
    }

    Ok(())
}
