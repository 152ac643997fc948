//! Channel transport layer.
//!
//! This module handles the connection between the bridge and the remote
//! controller.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Session        │                              │  Controller     │
//! │                 │         WebSocket            │                 │
//! │  Connector      │─────────────────────────────►│  ws://host/ws   │
//! │  → Channel      │◄────────────────────────────►│  ?token=...     │
//! │  → ChannelLink  │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `endpoint::authenticated_url` - Append the token to the endpoint
//! 2. `Connector::connect` - Handshake, yields a `Channel`
//! 3. `ChannelLink::attach` - Make the channel the live one
//! 4. `ChannelEvent`s flow to the session, frames flow out via the link
//! 5. `ChannelEvent::Closed` or `Outgoing::Close` ends the channel
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | Transport-neutral channel pair |
//! | `connection` | Connector trait and WebSocket event loop |
//! | `endpoint` | Token-bearing URL construction |
//! | `link` | Shared writer slot for the live channel |

// ============================================================================
// Submodules
// ============================================================================

/// Transport-neutral channel pair.
pub mod channel;

/// Connector trait and WebSocket implementation.
pub mod connection;

/// Endpoint URL construction.
pub mod endpoint;

/// Writer slot for the live channel.
pub mod link;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{
    CLOSE_ABNORMAL, CLOSE_AUTH_REJECTED, Channel, ChannelEvent, ChannelPeer, CloseInfo, Outgoing,
};
pub use connection::{Connector, WebSocketConnector};
pub use endpoint::authenticated_url;
pub use link::ChannelLink;
