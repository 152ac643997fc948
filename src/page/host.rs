//! Browser primitives consumed by the executor.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::protocol::Action;

// ============================================================================
// TabId
// ============================================================================

/// Browser-assigned tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(u32);

impl TabId {
    /// Wraps a raw tab id.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// TabInfo
// ============================================================================

/// An open browser tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    /// Tab id.
    pub id: TabId,
    /// Current URL.
    pub url: String,
}

impl TabInfo {
    /// Creates a tab description.
    #[inline]
    #[must_use]
    pub fn new(id: u32, url: impl Into<String>) -> Self {
        Self {
            id: TabId::new(id),
            url: url.into(),
        }
    }
}

// ============================================================================
// PageHost
// ============================================================================

/// Tab lookup and page-context execution, provided by the browser.
///
/// Implementations inject the page-side action logic into the tab's main
/// world and hand it the serialized [`Action`].
#[async_trait]
pub trait PageHost: Send + Sync + 'static {
    /// Lists open tabs.
    async fn tabs(&self) -> Result<Vec<TabInfo>>;

    /// Runs `action` in `tab` and returns what the page returned.
    ///
    /// `ready_timeout` bounds how long graph actions wait for the hosted
    /// application; on expiry the page answers `{"error":"graph_not_ready"}`.
    /// `Ok(None)` means the injection produced no result at all.
    async fn run_action(
        &self,
        tab: &TabInfo,
        action: &Action,
        ready_timeout: Duration,
    ) -> Result<Option<Value>>;
}
