//! ComfyUI bridge - remote control of a node-graph web application.
//!
//! This library keeps an authenticated WebSocket channel open to a remote
//! controller and executes the controller's commands against the browser tab
//! running the application on the local machine.
//!
//! # Architecture
//!
//! The bridge follows an actor model:
//!
//! - **Session**: one task owns the connection state; everything else posts to it
//! - **Transport**: each channel is a socket task bridged to mpsc queues
//! - **Dispatcher**: commands run in arrival order on their own worker
//! - **Page**: actions execute inside the controlled tab through [`page::PageHost`]
//!
//! Key design principles:
//!
//! - At most one channel at a time, never attempted without a token
//! - Bounded linear backoff, stopped outright by an authentication rejection
//! - Execution errors go back to the caller and never close the channel
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use comfyui_bridge::config::JsonFileStorage;
//! use comfyui_bridge::page::PageExecutor;
//! use comfyui_bridge::{Result, Session};
//!
//! async fn run(executor: Arc<dyn PageExecutor>) -> Result<()> {
//!     let session = Session::builder()
//!         .storage(JsonFileStorage::new("bridge-settings.json"))
//!         .executor(executor)
//!         .build()?;
//!
//!     // Loads settings and auto-connects after the startup delay
//!     session.start().await?;
//!
//!     let mut logs = session.subscribe_logs();
//!     while let Ok(row) = logs.recv().await {
//!         println!("[{}] {:?} {}", row.clock(), row.level, row.message);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Settings, persistence and the [`ConfigStore`] |
//! | [`dispatch`] | Command routing: [`Dispatcher`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`log_sink`] | Bounded user-visible log: [`LogSink`] |
//! | [`page`] | Controlled-tab lookup and page actions |
//! | [`protocol`] | Channel frames and typed actions |
//! | [`session`] | Connection lifecycle: [`Session`] |
//! | [`transport`] | WebSocket channels |

// ============================================================================
// Modules
// ============================================================================

/// Settings and their persistence.
pub mod config;

/// Command dispatch to the page executor.
pub mod dispatch;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Bounded in-memory log mirrored to `tracing`.
pub mod log_sink;

/// Page action execution.
pub mod page;

/// Channel message types.
pub mod protocol;

/// Connection lifecycle and the local control surface.
pub mod session;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration
pub use config::{ConfigStore, Settings, SettingsPatch};

// Dispatch
pub use dispatch::Dispatcher;

// Error types
pub use error::{Error, Result};

// Log
pub use log_sink::{LogLevel, LogRow, LogSink};

// Protocol types
pub use protocol::{Action, InboundCommand, OutboundFrame};

// Session types
pub use session::{
    ConnectionState, ControlRequest, ControlResponse, Session, SessionBuilder, SessionSnapshot,
    Status,
};
