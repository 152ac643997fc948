//! Channel protocol message types.
//!
//! This module defines the JSON frames exchanged with the remote controller
//! and the typed actions they carry.
//!
//! # Protocol Overview
//!
//! | Frame | Direction | Purpose |
//! |-------|-----------|---------|
//! | `{"type":"ping"}` | Bridge → Controller | Keepalive, every 30s |
//! | `{"type":"pong"}` | Controller → Bridge | Keepalive ack (swallowed) |
//! | `{"action":...}` | Controller → Bridge | Command |
//! | `{"type":<response>,"data":...}` | Bridge → Controller | Read-action result |
//! | `{"type":"error","message":...}` | Bridge → Controller | Execution failure |
//! | `{"error":...,"message"?:...}` | Controller → Bridge | Server-side error (logged) |
//!
//! Authentication travels as the `token` query parameter of the endpoint
//! URL. Close code `1008` means the token was rejected.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Inbound commands and typed actions |
//! | `frame` | Inbound classification and outbound frames |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound commands and typed actions.
pub mod command;

/// Frame classification and encoding.
pub mod frame;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Action, DEFAULT_DUMP_MAX_ITEMS, InboundCommand};
pub use frame::{InboundFrame, OutboundFrame, ResponseType};
