//! Builder pattern for session configuration.
//!
//! Provides a fluent API for wiring and starting a [`Session`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use comfyui_bridge::config::MemoryStorage;
//! use comfyui_bridge::page::PageExecutor;
//! use comfyui_bridge::Session;
//!
//! # fn example(executor: Arc<dyn PageExecutor>) -> comfyui_bridge::Result<()> {
//! let session = Session::builder()
//!     .storage(MemoryStorage::new())
//!     .executor(executor)
//!     .startup_delay(Duration::from_secs(1))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::config::{MemoryStorage, SettingsStorage};
use crate::error::{Error, Result};
use crate::log_sink::LogSink;
use crate::page::PageExecutor;
use crate::transport::{Connector, WebSocketConnector};

use super::backoff::DEFAULT_STARTUP_DELAY;
use super::core::Session;

// ============================================================================
// SessionBuilder
// ============================================================================

/// Builder for configuring a [`Session`].
///
/// Use [`Session::builder()`] to create a new builder.
#[derive(Clone)]
pub struct SessionBuilder {
    /// Settings persistence. Defaults to in-memory.
    storage: Option<Arc<dyn SettingsStorage>>,
    /// Channel factory. Defaults to [`WebSocketConnector`].
    connector: Option<Arc<dyn Connector>>,
    /// Page action backend. Required.
    executor: Option<Arc<dyn PageExecutor>>,
    /// Shared log. Defaults to a fresh sink.
    log: Option<LogSink>,
    /// Delay before the first automatic connect.
    startup_delay: Duration,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            storage: None,
            connector: None,
            executor: None,
            log: None,
            startup_delay: DEFAULT_STARTUP_DELAY,
        }
    }
}

impl fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("storage", &self.storage.is_some())
            .field("connector", &self.connector.is_some())
            .field("executor", &self.executor.is_some())
            .field("startup_delay", &self.startup_delay)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SessionBuilder Implementation
// ============================================================================

impl SessionBuilder {
    /// Creates a builder with default settings and no executor.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets where settings are persisted.
    #[inline]
    #[must_use]
    pub fn storage(mut self, storage: impl SettingsStorage) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    /// Sets how channels are opened.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Sets a connector shared with the caller.
    #[inline]
    #[must_use]
    pub fn shared_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Sets the page action backend.
    #[inline]
    #[must_use]
    pub fn executor(mut self, executor: Arc<dyn PageExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Sets the log sink, e.g. one already subscribed to by a UI.
    #[inline]
    #[must_use]
    pub fn log(mut self, log: LogSink) -> Self {
        self.log = Some(log);
        self
    }

    /// Sets the delay between [`Session::start`] and the first connect.
    #[inline]
    #[must_use]
    pub fn startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    /// Builds the session and spawns its tasks.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no executor is set
    /// - [`Error::Config`] if called outside a tokio runtime
    pub fn build(self) -> Result<Session> {
        let executor = self.validate_executor()?;
        Self::validate_runtime()?;

        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WebSocketConnector::new()));
        let log = self.log.unwrap_or_default();

        Ok(Session::spawn(
            storage,
            connector,
            executor,
            log,
            self.startup_delay,
        ))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl SessionBuilder {
    /// Validates the executor configuration.
    fn validate_executor(&self) -> Result<Arc<dyn PageExecutor>> {
        self.executor.clone().ok_or_else(|| {
            Error::config(
                "Page executor is required. Use .executor() to set it.\n\
                 Example: Session::builder().executor(Arc::new(PageActionExecutor::new(host)))",
            )
        })
    }

    /// Validates that tasks can be spawned.
    fn validate_runtime() -> Result<()> {
        Handle::try_current()
            .map(|_| ())
            .map_err(|_| Error::config("Session must be built inside a tokio runtime"))
    }
}

// ============================================================================
// Tests
// ============================================================================
