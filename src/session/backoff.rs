//! Reconnect timing.

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Consecutive failed attempts after which automatic reconnection stops.
pub const MAX_ATTEMPTS: u32 = 5;

/// Linear backoff step per failed attempt.
pub const RETRY_STEP: Duration = Duration::from_millis(5000);

/// Upper bound on the close-driven backoff.
pub const RETRY_CAP: Duration = Duration::from_millis(30_000);

/// Flat retry delay after a connection could not even be constructed.
pub const CONSTRUCTION_RETRY: Duration = Duration::from_millis(5000);

/// Interval between keepalive pings on an open channel.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Delay before the first automatic connect after start.
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_secs(3);

// ============================================================================
// Backoff
// ============================================================================

/// Delay before reconnecting after a close, given the attempt counter.
///
/// `min(5000 * attempts, 30000)` ms. The counter is zero after a successful
/// open, so a channel that drops after opening reconnects immediately.
#[inline]
#[must_use]
pub fn backoff_delay(attempts: u32) -> Duration {
    RETRY_STEP.saturating_mul(attempts).min(RETRY_CAP)
}

// ============================================================================
// Tests
// ============================================================================
