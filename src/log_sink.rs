//! Bounded, observable event log.
//!
//! Every notable transition in the bridge is appended here as a [`LogRow`].
//! The sink keeps the most recent [`LOG_CAPACITY`] rows for observers that
//! poll (a status UI fetching the whole buffer) and broadcasts each new row
//! to observers that subscribe.
//!
//! Rows are also mirrored into `tracing` at the matching level, so a host
//! process with a subscriber installed sees the same stream.
//!
//! # Example
//!
//! ```ignore
//! let sink = LogSink::new();
//! let mut rows = sink.subscribe();
//!
//! sink.info("Settings loaded");
//! assert_eq!(rows.recv().await?.message, "Settings loaded");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of rows retained by the sink.
pub const LOG_CAPACITY: usize = 200;

/// Capacity of the live broadcast channel.
///
/// Lagging subscribers skip rows; the buffer itself is unaffected.
const BROADCAST_CAPACITY: usize = 256;

// ============================================================================
// LogLevel
// ============================================================================

/// Severity of a [`LogRow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose diagnostics.
    Debug,
    /// Normal lifecycle events.
    Info,
    /// Recoverable problems.
    Warn,
    /// Failures.
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

// ============================================================================
// LogRow
// ============================================================================

/// One observable event.
///
/// Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRow {
    /// Wall-clock time, truncated to whole seconds.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
}

impl LogRow {
    /// Creates a row stamped with the current time.
    #[must_use]
    pub fn now(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().trunc_subsecs(0),
            level,
            message: message.into(),
        }
    }

    /// Returns the `HH:MM:SS` form used by status displays.
    #[inline]
    #[must_use]
    pub fn clock(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

// ============================================================================
// LogSink
// ============================================================================

/// Shared handle to the bounded log buffer.
///
/// Cloning is cheap; all clones append to the same buffer.
#[derive(Clone)]
pub struct LogSink {
    inner: Arc<LogSinkInner>,
}

struct LogSinkInner {
    rows: Mutex<VecDeque<LogRow>>,
    live: broadcast::Sender<LogRow>,
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSink")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl LogSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        let (live, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            inner: Arc::new(LogSinkInner {
                rows: Mutex::new(VecDeque::with_capacity(LOG_CAPACITY)),
                live,
            }),
        }
    }

    /// Appends a row, evicting the oldest one when full.
    ///
    /// Publishing to subscribers is best-effort: having none is fine.
    pub fn push(&self, row: LogRow) {
        mirror(&row);

        {
            let mut rows = self.inner.rows.lock();
            if rows.len() == LOG_CAPACITY {
                rows.pop_front();
            }
            rows.push_back(row.clone());
        }

        let _ = self.inner.live.send(row);
    }

    /// Appends a row at `level` stamped with the current time.
    #[inline]
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.push(LogRow::now(level, message));
    }

    /// Appends a debug row.
    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    /// Appends an info row.
    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    /// Appends a warn row.
    #[inline]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    /// Appends an error row.
    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Returns a copy of the buffered rows, oldest first.
    #[must_use]
    pub fn rows(&self) -> Vec<LogRow> {
        self.inner.rows.lock().iter().cloned().collect()
    }

    /// Returns the number of buffered rows.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.rows.lock().len()
    }

    /// Returns `true` if nothing has been logged yet.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribes to rows appended from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LogRow> {
        self.inner.live.subscribe()
    }
}

/// Forwards a row to `tracing`.
fn mirror(row: &LogRow) {
    match row.level {
        LogLevel::Debug => debug!(target: "comfyui_bridge::log", "{}", row.message),
        LogLevel::Info => info!(target: "comfyui_bridge::log", "{}", row.message),
        LogLevel::Warn => warn!(target: "comfyui_bridge::log", "{}", row.message),
        LogLevel::Error => error!(target: "comfyui_bridge::log", "{}", row.message),
    }
}

// ============================================================================
// Tests
// ============================================================================
