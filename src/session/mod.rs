//! Connection lifecycle.
//!
//! Keeps at most one channel to the controller open, reconnects with a
//! bounded linear backoff, and exposes the local control surface.
//!
//! # States
//!
//! | From | Event | To |
//! |------|-------|----|
//! | `Idle`, `Closed` | connect allowed | `Connecting` |
//! | `Connecting` | handshake ok | `Open` |
//! | `Connecting` | handshake failed | `Idle`, then close policy (1006) |
//! | `Open` | close | `Closed`, then close policy |
//! | any | disconnect | `Idle` |
//!
//! # Close Policy
//!
//! | Close | Effect |
//! |-------|--------|
//! | 1008 | counter pinned at [`MAX_ATTEMPTS`], no retry |
//! | other, counter below max | retry after [`backoff_delay`] |
//! | other, counter at max | no retry |
//!
//! A connection that cannot even be constructed retries after a flat
//! [`CONSTRUCTION_RETRY`].

// ============================================================================
// Submodules
// ============================================================================

/// The state machine task.
mod actor;

/// Reconnect timing constants.
pub mod backoff;

/// Fluent builder.
pub mod builder;

/// Local UI requests and responses.
pub mod control;

/// Session handle.
pub mod core;

/// Observable state.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use backoff::{
    CONSTRUCTION_RETRY, DEFAULT_STARTUP_DELAY, KEEPALIVE_INTERVAL, MAX_ATTEMPTS, backoff_delay,
};
pub use builder::SessionBuilder;
pub use control::{ControlRequest, ControlResponse};
pub use core::Session;
pub use state::{ConnectionState, SessionSnapshot, Status};
