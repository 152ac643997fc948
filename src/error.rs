//! Error types for the ComfyUI bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```no_run
//! use comfyui_bridge::{InboundCommand, Result, Session};
//!
//! async fn example(session: &Session) -> Result<()> {
//!     let workflow = session.execute(&InboundCommand::new("get_workflow")).await?;
//!     println!("{workflow}");
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidEndpoint`], [`Error::Storage`] |
//! | Connection | [`Error::Handshake`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`], [`Error::AuthRejected`], [`Error::SessionStopped`] |
//! | Protocol | [`Error::Protocol`], [`Error::UnknownAction`], [`Error::InvalidArgument`] |
//! | Execution | [`Error::NoControlledTab`], [`Error::NoResult`], [`Error::NotReady`], [`Error::PageAction`] |
//! | External | [`Error::Io`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when session configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Endpoint URL cannot be turned into a channel.
    ///
    /// Returned when the configured server URL is malformed or uses a
    /// scheme other than `ws`/`wss`.
    #[error("Invalid endpoint {url}: {message}")]
    InvalidEndpoint {
        /// The offending URL, without credentials.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    /// Settings persistence failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket handshake failed.
    ///
    /// Network failures and HTTP rejections during the upgrade land here.
    #[error("Handshake failed: {message}")]
    Handshake {
        /// Description of the handshake error.
        message: String,
    },

    /// Handshake did not complete in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Channel closed or not open.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Controller rejected the credentials (close code 1008).
    #[error("Authentication rejected: {reason}")]
    AuthRejected {
        /// Close reason sent by the controller.
        reason: String,
    },

    /// The session task is no longer running.
    #[error("Session stopped")]
    SessionStopped,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Malformed frame or unexpected message shape.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Action name not recognized.
    #[error("Unknown action: {action}")]
    UnknownAction {
        /// The unrecognized action name.
        action: String,
    },

    /// Action parameters are missing or have the wrong type.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// No tab matches the controlled-tab URL patterns.
    #[error("No controlled tab found (port {port})")]
    NoControlledTab {
        /// Application port the patterns were built for.
        port: u16,
    },

    /// Page execution returned nothing.
    #[error("No result from page execution")]
    NoResult,

    /// The hosted application did not become ready in time.
    #[error("Application not ready after {timeout_ms}ms")]
    NotReady {
        /// Milliseconds the page waited.
        timeout_ms: u64,
    },

    /// Structured error reported by the page.
    #[error("{}", page_action_text(.kind, .message.as_deref()))]
    PageAction {
        /// Error kind reported by the page (e.g. `serialize_failed`).
        kind: String,
        /// Optional detail.
        message: Option<String>,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn page_action_text(kind: &str, message: Option<&str>) -> String {
    match message {
        Some(message) => format!("{kind}: {message}"),
        None => kind.to_string(),
    }
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid endpoint error.
    #[inline]
    pub fn invalid_endpoint(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a storage error.
    #[inline]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a handshake error.
    #[inline]
    pub fn handshake(message: impl Into<String>) -> Self {
        Self::Handshake {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates an authentication rejection error.
    #[inline]
    pub fn auth_rejected(reason: impl Into<String>) -> Self {
        Self::AuthRejected {
            reason: reason.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an unknown action error.
    #[inline]
    pub fn unknown_action(action: impl Into<String>) -> Self {
        Self::UnknownAction {
            action: action.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a no controlled tab error.
    #[inline]
    pub fn no_controlled_tab(port: u16) -> Self {
        Self::NoControlledTab { port }
    }

    /// Creates a not ready error.
    #[inline]
    pub fn not_ready(timeout_ms: u64) -> Self {
        Self::NotReady { timeout_ms }
    }

    /// Creates a page action error.
    #[inline]
    pub fn page_action(kind: impl Into<String>, message: Option<String>) -> Self {
        Self::PageAction {
            kind: kind.into(),
            message,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Handshake { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::AuthRejected { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::handshake("connection refused");
        assert_eq!(err.to_string(), "Handshake failed: connection refused");
    }

    #[test]
    fn test_page_action_display() {
        let with_detail = Error::page_action("serialize_failed", Some("cyclic graph".into()));
        assert_eq!(with_detail.to_string(), "serialize_failed: cyclic graph");

        let bare = Error::page_action("boom", None);
        assert_eq!(bare.to_string(), "boom");
    }

    #[test]
    fn test_unknown_action_display() {
        let err = Error::unknown_action("teleport");
        assert_eq!(err.to_string(), "Unknown action: teleport");
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::handshake("x").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::auth_rejected("bad token").is_connection_error());
        assert!(!Error::NoResult.is_connection_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
