//! Page action execution against the controlled tab.
//!
//! The DOM scraping and graph serialization run inside the page and are not
//! part of this crate. This module owns the contract around them: find the
//! one tab running the application, hand it a typed [`Action`], and turn the
//! page's answer into a payload or an [`Error`].
//!
//! # Page Answers
//!
//! | Action | Success payload |
//! |--------|-----------------|
//! | `click`, `fill` | `{"ok": true}` |
//! | `dump_dom` | `{"url", "count", "items": [{tag, id, classes, selector, text}]}` |
//! | `get_nodes_map` | `{"url", "count", "nodes": [{id, type, title, pos}]}` |
//! | `get_workflow` | `{"url", "node_count", "workflow": {...}}` |
//!
//! Failures come back as `{"error": <kind>, "message"?: <detail>}`.
//!
//! [`Action`]: crate::protocol::Action
//! [`Error`]: crate::error::Error

// ============================================================================
// Submodules
// ============================================================================

/// Executor trait and the host-backed implementation.
pub mod executor;

/// Browser primitives.
pub mod host;

/// Controlled-tab URL patterns.
pub mod pattern;

// ============================================================================
// Re-exports
// ============================================================================

pub use executor::{DEFAULT_APP_PORT, DEFAULT_READY_TIMEOUT, PageActionExecutor, PageExecutor};
pub use host::{PageHost, TabId, TabInfo};
pub use pattern::TabPattern;
