//! Buffered status log
//!
//! Keeps a bounded history of status events for crash dumps and mirrors
//! every event into `tracing`.

use crate::status::{LogItem, LogLevel, StateUpdate, StatusSink};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

/// Default number of log items kept in memory
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

const PROXY_HINT_PREFIX: &str = "Send to HTTP proxy:";
const WEAK_DIGEST_HINT: &str =
    "The server certificate is signed with a message digest considered too weak (md too weak)";

#[derive(Debug, Default)]
struct Inner {
    items: VecDeque<LogItem>,
    last_state: Option<StateUpdate>,
    proxy_hint: Option<String>,
}

/// Thread-safe ring buffer implementing [`StatusSink`]
#[derive(Debug)]
pub struct StatusLog {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl StatusLog {
    /// Create a status log keeping at most `capacity` items
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, item: LogItem) {
        let mut inner = self.lock();
        if inner.items.len() >= self.capacity {
            inner.items.pop_front();
        }
        inner.items.push_back(item);
    }

    /// Number of buffered items
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Most recent state update, if any
    pub fn last_state(&self) -> Option<StateUpdate> {
        self.lock().last_state.clone()
    }

    /// Most recent proxy negotiation line seen in the engine output
    pub fn proxy_hint(&self) -> Option<String> {
        self.lock().proxy_hint.clone()
    }
}

impl Default for StatusLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl StatusSink for StatusLog {
    fn log_message(&self, level: LogLevel, verbosity: u8, message: &str) {
        match level {
            LogLevel::Error => error!(target: "engine", verbosity, "{}", message),
            LogLevel::Warning => warn!(target: "engine", verbosity, "{}", message),
            LogLevel::Info => info!(target: "engine", verbosity, "{}", message),
            LogLevel::Verbose => debug!(target: "engine", verbosity, "{}", message),
        }
        self.push(LogItem::new(level, verbosity, message));
    }

    fn update_state(&self, update: StateUpdate) {
        info!(code = %update.code, level = ?update.level, "{}", update.message);
        self.lock().last_state = Some(update);
    }

    fn add_extra_hints(&self, message: &str) {
        if message.starts_with(PROXY_HINT_PREFIX) {
            self.lock().proxy_hint = Some(message.to_string());
            return;
        }

        let weak_digest = (message.starts_with("OpenSSL: error") && message.ends_with("md too weak"))
            || message.contains("error:140AB18E");
        if weak_digest {
            self.log_error(WEAK_DIGEST_HINT);
        }
    }

    fn history(&self) -> Vec<LogItem> {
        self.lock().items.iter().cloned().collect()
    }
}
