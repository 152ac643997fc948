//! Observable session state.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::transport::CloseInfo;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle of the controller channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No channel and no handshake in flight.
    #[default]
    Idle,
    /// Handshake in flight.
    Connecting,
    /// Channel open.
    Open,
    /// Channel closed by either side.
    Closed,
}

impl ConnectionState {
    /// Returns `true` for `Connecting` and `Open`.
    #[inline]
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

// ============================================================================
// SessionSnapshot
// ============================================================================

/// Point-in-time view of the connection manager, published after every
/// transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Current state.
    pub state: ConnectionState,
    /// Consecutive connect attempts since the last successful open.
    pub attempts: u32,
    /// Delay of the pending automatic connect, if one is scheduled.
    pub retry_delay: Option<Duration>,
    /// How the most recent channel ended.
    pub last_close: Option<CloseInfo>,
}

// ============================================================================
// Status
// ============================================================================

/// Connection status as reported to the local UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// A channel is open.
    pub connected: bool,
    /// A handshake is in flight.
    pub connecting: bool,
    /// Control is enabled in the configuration.
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&ConnectionState::Connecting).expect("json");
        assert_eq!(json, r#""connecting""#);
        assert_eq!(ConnectionState::Open.to_string(), "open");
    }

    #[test]
    fn test_is_active() {
        assert!(ConnectionState::Connecting.is_active());
        assert!(ConnectionState::Open.is_active());
        assert!(!ConnectionState::Idle.is_active());
        assert!(!ConnectionState::Closed.is_active());
    }

    #[test]
    fn test_status_shape() {
        let status = Status {
            connected: true,
            connecting: false,
            enabled: true,
        };
        assert_eq!(
            serde_json::to_value(status).expect("json"),
            serde_json::json!({"connected": true, "connecting": false, "enabled": true})
        );
    }
}
