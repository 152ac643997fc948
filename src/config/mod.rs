//! Bridge configuration.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Settings`] | Endpoint URL, token, enabled flag |
//! | [`SettingsPatch`] | Partial update, also the persisted shape |
//! | [`SettingsStorage`] | External persistence seam |
//! | [`ConfigStore`] | Loaded-once, runtime-mutable cache |
//!
//! # Persisted Keys
//!
//! | Key | Type | Default |
//! |-----|------|---------|
//! | `mcpServerUrl` | string | `ws://127.0.0.1:8000/ws` |
//! | `mcpWebSocketToken` | string | empty (absent) |
//! | `mcpBrowserControlEnabled` | bool | `true` |

// ============================================================================
// Submodules
// ============================================================================

/// Settings values and partial updates.
pub mod settings;

/// Persistence backends.
pub mod storage;

/// Runtime settings cache.
pub mod store;

// ============================================================================
// Re-exports
// ============================================================================

pub use settings::{DEFAULT_SERVER_URL, Settings, SettingsPatch};
pub use storage::{JsonFileStorage, MemoryStorage, SettingsStorage};
pub use store::ConfigStore;
