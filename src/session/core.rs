//! Session handle.
//!
//! The [`Session`] is the one owned object behind the bridge: configuration,
//! connection manager, dispatcher and log, with explicit lifecycle methods.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use comfyui_bridge::config::JsonFileStorage;
//! use comfyui_bridge::page::PageExecutor;
//! use comfyui_bridge::Session;
//!
//! # async fn example(executor: Arc<dyn PageExecutor>) -> comfyui_bridge::Result<()> {
//! let session = Session::builder()
//!     .storage(JsonFileStorage::new("settings.json"))
//!     .executor(executor)
//!     .build()?;
//!
//! session.start().await?;
//! println!("{:?}", session.status());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info};

use crate::config::{ConfigStore, Settings, SettingsPatch, SettingsStorage};
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::log_sink::{LogRow, LogSink};
use crate::page::PageExecutor;
use crate::protocol::InboundCommand;
use crate::transport::{ChannelLink, Connector};

use super::actor::{Command, Input, SessionActor};
use super::builder::SessionBuilder;
use super::control::{ControlRequest, ControlResponse};
use super::state::{ConnectionState, SessionSnapshot, Status};

// ============================================================================
// Types
// ============================================================================

/// Shared state behind every [`Session`] clone.
struct SessionInner {
    config: Arc<ConfigStore>,
    dispatcher: Dispatcher,
    link: ChannelLink,
    log: LogSink,
    inputs: mpsc::UnboundedSender<Input>,
    snapshot: watch::Receiver<SessionSnapshot>,
    startup_delay: Duration,
}

// ============================================================================
// Session
// ============================================================================

/// Handle to a running bridge.
///
/// Cheap to clone. The connection task runs until [`stop`](Self::stop) or
/// until the last clone is dropped.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("snapshot", &self.snapshot())
            .field("link", &self.inner.link)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Wires the components and spawns the connection and dispatch tasks.
    pub(crate) fn spawn(
        storage: Arc<dyn SettingsStorage>,
        connector: Arc<dyn Connector>,
        executor: Arc<dyn PageExecutor>,
        log: LogSink,
        startup_delay: Duration,
    ) -> Self {
        let config = Arc::new(ConfigStore::new(storage, log.clone()));
        let link = ChannelLink::new();
        let dispatcher = Dispatcher::new(executor, log.clone(), link.clone());

        let (commands_tx, mut commands) = mpsc::unbounded_channel::<InboundCommand>();
        let worker = dispatcher.clone();
        tokio::spawn(async move {
            while let Some(command) = commands.recv().await {
                // Failures are already logged and reported on the channel.
                let _ = worker.dispatch(&command).await;
            }
            debug!("Dispatch worker finished");
        });

        let (inputs, snapshot) = SessionActor::spawn(
            Arc::clone(&config),
            connector,
            link.clone(),
            log.clone(),
            commands_tx,
        );

        Self {
            inner: Arc::new(SessionInner {
                config,
                dispatcher,
                link,
                log,
                inputs,
                snapshot,
                startup_delay,
            }),
        }
    }

    /// Sends `command` to the connection task and waits until it is applied.
    async fn request(&self, command: Command) -> Result<()> {
        let (done, applied) = oneshot::channel();
        self.inner
            .inputs
            .send(Input::Command { command, done })
            .map_err(|_| Error::SessionStopped)?;
        applied.await.map_err(|_| Error::SessionStopped)
    }
}

// ============================================================================
// Session - Lifecycle
// ============================================================================

impl Session {
    /// Loads the configuration and, if control is enabled, schedules the
    /// first connect after the startup delay.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionStopped`] after [`stop`](Self::stop).
    pub async fn start(&self) -> Result<Settings> {
        let settings = self.inner.config.load().await;

        if settings.control_enabled {
            let delay = self.inner.startup_delay;
            self.inner
                .log
                .info(format!("Auto-connect in {}s", delay.as_secs_f64()));
            self.request(Command::ConnectAfter(delay)).await?;
        } else {
            self.inner.log.info("Browser control disabled");
        }

        Ok(settings)
    }

    /// Disconnects and ends the connection task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionStopped`] if already stopped.
    pub async fn stop(&self) -> Result<()> {
        self.request(Command::Stop).await?;
        info!("Session stopped");
        Ok(())
    }

    /// Requests a connection.
    ///
    /// Waits for the configuration to load first. Does nothing if control is
    /// disabled, no token is set, or a connection is already in progress.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionStopped`] after [`stop`](Self::stop).
    pub async fn connect(&self) -> Result<()> {
        self.inner.config.wait_ready().await;
        self.request(Command::Connect { reset: false }).await
    }

    /// Cancels any pending reconnect, aborts a handshake and closes the
    /// channel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionStopped`] after [`stop`](Self::stop).
    pub async fn disconnect(&self) -> Result<()> {
        self.request(Command::Disconnect).await
    }

    /// Disconnects, resets the attempt counter and connects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionStopped`] after [`stop`](Self::stop).
    pub async fn reconnect(&self) -> Result<()> {
        self.inner.config.wait_ready().await;
        self.request(Command::Reconnect).await
    }

    /// Persists the enabled flag, then connects or disconnects.
    ///
    /// # Errors
    ///
    /// - [`Error::Storage`] if persisting fails; nothing changes
    /// - [`Error::SessionStopped`] after [`stop`](Self::stop)
    pub async fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.inner.config.wait_ready().await;
        self.inner.config.set_enabled(enabled).await?;
        self.inner.log.info(if enabled {
            "Control enabled"
        } else {
            "Control disabled"
        });

        let command = if enabled {
            Command::Connect { reset: true }
        } else {
            Command::Disconnect
        };
        self.request(command).await
    }

    /// Persists `patch`, then restarts the connection under the new settings.
    ///
    /// # Errors
    ///
    /// - [`Error::Storage`] if persisting fails; nothing changes
    /// - [`Error::SessionStopped`] after [`stop`](Self::stop)
    pub async fn reconfigure(&self, patch: &SettingsPatch) -> Result<Settings> {
        self.inner.config.wait_ready().await;
        let settings = self.inner.config.update(patch).await?;

        let command = if settings.control_enabled {
            Command::Reconnect
        } else {
            Command::Disconnect
        };
        self.request(command).await?;

        Ok(settings)
    }
}

// ============================================================================
// Session - Queries
// ============================================================================

impl Session {
    /// Returns the connection status.
    #[must_use]
    pub fn status(&self) -> Status {
        let state = self.inner.snapshot.borrow().state;
        Status {
            connected: state == ConnectionState::Open && self.inner.link.is_open(),
            connecting: state == ConnectionState::Connecting,
            enabled: self.inner.config.is_enabled(),
        }
    }

    /// Returns the connection manager's current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Returns a receiver that observes every state transition.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshot.clone()
    }

    /// Returns the buffered log rows, oldest first.
    #[must_use]
    pub fn logs(&self) -> Vec<LogRow> {
        self.inner.log.rows()
    }

    /// Subscribes to new log rows.
    #[must_use]
    pub fn subscribe_logs(&self) -> broadcast::Receiver<LogRow> {
        self.inner.log.subscribe()
    }

    /// Returns the log sink.
    #[inline]
    #[must_use]
    pub fn log(&self) -> &LogSink {
        &self.inner.log
    }

    /// Returns the configuration store.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ConfigStore {
        &self.inner.config
    }
}

// ============================================================================
// Session - Local Control
// ============================================================================

impl Session {
    /// Runs `command` and returns its result without transmitting anything.
    ///
    /// # Errors
    ///
    /// Returns the execution error.
    pub async fn execute(&self, command: &InboundCommand) -> Result<Value> {
        self.inner.dispatcher.dispatch_and_return(command).await
    }

    /// Handles a request from the local UI.
    pub async fn handle_control(&self, request: ControlRequest) -> ControlResponse {
        match &request {
            ControlRequest::UpdateConfig { .. } => {
                let patch = request.settings_patch().unwrap_or_default();
                ControlResponse::ack(self.reconfigure(&patch).await.map(|_| ()))
            }
            ControlRequest::SetControlEnabled { enabled } => {
                ControlResponse::ack(self.set_enabled(*enabled).await)
            }
            ControlRequest::Reconnect => ControlResponse::ack(self.reconnect().await),
            ControlRequest::Status => ControlResponse::Status(self.status()),
            ControlRequest::Logs => ControlResponse::Logs { rows: self.logs() },
            ControlRequest::Execute { cmd } => ControlResponse::executed(self.execute(cmd).await),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
