//! Crash dump log materialization
//!
//! When the engine announces a dump path before dying, the buffered status
//! history is written next to the dump so both can be inspected together.

use crate::status::{LogItem, StatusSink};
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Timestamp layout used for every dumped line
pub const DUMP_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DUMP_LOG_EXTENSION: &str = ".log";

/// Message reported once the dump log has been written
pub const MINIDUMP_GENERATED: &str =
    "The VPN engine crashed unexpectedly. A minidump and its log have been written";

/// Location of the log file accompanying a dump at `dump_path`
///
/// The extension is appended, never substituted: `/x/y.dmp` becomes
/// `/x/y.dmp.log`.
pub fn dump_log_path(dump_path: &Path) -> PathBuf {
    let mut path = OsString::from(dump_path.as_os_str());
    path.push(DUMP_LOG_EXTENSION);
    PathBuf::from(path)
}

/// Render a history item the way it appears in the dump log
pub fn render_item(item: &LogItem) -> String {
    format!("{} {}", item.timestamp().format(DUMP_TIME_FORMAT), item.message())
}

/// Write `history` to the log file for `dump_path`
///
/// Items are written in the order given, one per line.
pub fn write_dump_log(dump_path: &Path, history: &[LogItem]) -> io::Result<PathBuf> {
    let log_path = dump_log_path(dump_path);
    let mut out = BufWriter::new(File::create(&log_path)?);
    for item in history {
        writeln!(out, "{}", render_item(item))?;
    }
    out.flush()?;
    Ok(log_path)
}

/// Write the dump log for `dump_path` from the sink's history
///
/// Failures are reported to the sink and never propagated, so a broken dump
/// location cannot hold up shutdown.
pub fn materialize(sink: &dyn StatusSink, dump_path: &Path) -> Option<PathBuf> {
    let history = sink.history();
    match write_dump_log(dump_path, &history) {
        Ok(log_path) => {
            info!("Wrote {} log items to {}", history.len(), log_path.display());
            sink.log_info(MINIDUMP_GENERATED);
            Some(log_path)
        }
        Err(e) => {
            warn!("Failed to write minidump log for {}: {}", dump_path.display(), e);
            sink.log_error(&format!("Writing minidump log: {}", e));
            None
        }
    }
}
