//! Decoder for the engine's management log protocol
//!
//! Every line the engine writes is either a control line announcing the
//! crash dump location, a management protocol line of the form
//! `<secs>.<usecs> <hex-flags> <message>`, or free-form chatter.

use crate::status::LogLevel;
use regex::Regex;
use serde::Serialize;

/// Prefix of the control line announcing where a crash dump will be written
pub const DUMP_PATH_PREFIX: &str = "Dump path: ";

/// Marker prepended to lines that did not match the log protocol
pub const PASSTHROUGH_PREFIX: &str = "P:";

/// Minimum verbosity applied to echoed management commands
pub const DEFAULT_MANAGEMENT_CMD_VERBOSITY: u8 = 4;

const MANAGEMENT_CMD_PREFIX: &str = "MANAGEMENT: CMD";

/// Flags byte carried by every management protocol line
///
/// The low nibble is the verbosity level, the high nibble holds the
/// category bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagementFlags(u8);

impl ManagementFlags {
    pub const FATAL: u8 = 1 << 4;
    pub const NONFATAL: u8 = 1 << 5;
    pub const WARN: u8 = 1 << 6;
    pub const DEBUG: u8 = 1 << 7;

    pub fn new(bits: u8) -> Self {
        Self(bits)
    }

    /// Parse the flags from a token of lowercase hex digits
    ///
    /// Only the low byte is significant, so longer tokens are truncated to
    /// their last two digits. Returns `None` if the token is empty or holds
    /// anything but `0-9a-f`.
    pub fn from_hex_token(token: &str) -> Option<Self> {
        if token.is_empty() || !token.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return None;
        }
        let low_byte = &token[token.len().saturating_sub(2)..];
        u8::from_str_radix(low_byte, 16).ok().map(Self)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn verbosity(&self) -> u8 {
        self.0 & 0x0f
    }

    /// Level selected by the category bits, FATAL taking precedence
    pub fn level(&self) -> LogLevel {
        if self.0 & Self::FATAL != 0 {
            LogLevel::Error
        } else if self.0 & (Self::NONFATAL | Self::WARN) != 0 {
            LogLevel::Warning
        } else if self.0 & Self::DEBUG != 0 {
            LogLevel::Verbose
        } else {
            LogLevel::Info
        }
    }
}

/// Result of decoding one line of engine output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedEvent {
    /// Management protocol line
    Status {
        level: LogLevel,
        verbosity: u8,
        message: String,
    },

    /// Crash dump location announced by the engine
    DumpPath { path: String },

    /// Anything else, kept verbatim
    Raw { text: String },
}

impl ParsedEvent {
    /// Text to forward for a raw line, carrying the passthrough marker
    pub fn passthrough_text(text: &str) -> String {
        format!("{}{}", PASSTHROUGH_PREFIX, text)
    }
}

/// Decoder for engine output lines
#[derive(Debug, Clone)]
pub struct LogLineDecoder {
    /// `<secs>.<usecs> <hex-flags> <message>`
    log_pattern: Regex,
    management_cmd_verbosity: u8,
}

impl LogLineDecoder {
    /// Create a decoder with the default management command verbosity
    pub fn new() -> Self {
        Self::with_management_cmd_verbosity(DEFAULT_MANAGEMENT_CMD_VERBOSITY)
    }

    /// Create a decoder raising `MANAGEMENT: CMD` lines to at least `verbosity`
    pub fn with_management_cmd_verbosity(verbosity: u8) -> Self {
        Self {
            log_pattern: Regex::new(r"^([0-9]+)\.([0-9]+) ([0-9a-f]+) (.*)$")
                .expect("Failed to compile log line pattern"),
            management_cmd_verbosity: verbosity.min(0x0f),
        }
    }

    /// Decode a single line of engine output
    ///
    /// Never fails: lines outside the protocol come back as [`ParsedEvent::Raw`].
    pub fn decode(&self, line: &str) -> ParsedEvent {
        if let Some(path) = line.strip_prefix(DUMP_PATH_PREFIX) {
            return ParsedEvent::DumpPath {
                path: path.to_string(),
            };
        }

        let Some(captures) = self.log_pattern.captures(line) else {
            return ParsedEvent::Raw {
                text: line.to_string(),
            };
        };

        // The pattern guarantees all four groups and a well-formed hex token
        let (Some(flags), Some(message)) = (
            captures.get(3).and_then(|m| ManagementFlags::from_hex_token(m.as_str())),
            captures.get(4),
        ) else {
            return ParsedEvent::Raw {
                text: line.to_string(),
            };
        };

        let message = message.as_str();
        let mut verbosity = flags.verbosity();
        if message.starts_with(MANAGEMENT_CMD_PREFIX) {
            verbosity = verbosity.max(self.management_cmd_verbosity);
        }

        ParsedEvent::Status {
            level: flags.level(),
            verbosity,
            message: message.to_string(),
        }
    }
}

impl Default for LogLineDecoder {
    fn default() -> Self {
        Self::new()
    }
}
