//! Bridge settings and partial updates.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Controller endpoint used when nothing is stored.
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8000/ws";

// ============================================================================
// Settings
// ============================================================================

/// Process-wide bridge settings.
///
/// An empty token means "no token configured".
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    /// Controller WebSocket endpoint.
    pub server_url: String,
    /// Authentication token sent as the `token` query parameter.
    pub token: String,
    /// Whether the bridge may connect at all.
    pub control_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            token: String::new(),
            control_enabled: true,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("server_url", &self.server_url)
            .field("token", &if self.token.is_empty() { "<none>" } else { "<set>" })
            .field("control_enabled", &self.control_enabled)
            .finish()
    }
}

impl Settings {
    /// Returns the token, or `None` if absent.
    #[inline]
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        (!self.token.is_empty()).then_some(self.token.as_str())
    }

    /// Applies the fields present in `patch`.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(url) = &patch.server_url {
            self.server_url.clone_from(url);
        }
        if let Some(token) = &patch.token {
            self.token.clone_from(token);
        }
        if let Some(enabled) = patch.control_enabled {
            self.control_enabled = enabled;
        }
    }

    /// Applies persisted values at load time.
    ///
    /// Empty stored strings are ignored, so a blank URL keeps the default.
    pub fn apply_stored(&mut self, stored: &SettingsPatch) {
        let stored = SettingsPatch {
            server_url: stored.server_url.clone().filter(|url| !url.trim().is_empty()),
            token: stored.token.clone().filter(|token| !token.is_empty()),
            control_enabled: stored.control_enabled,
        };
        self.apply(&stored);
    }
}

// ============================================================================
// SettingsPatch
// ============================================================================

/// A partial settings update; `None` fields are left unchanged.
///
/// This is also the persisted shape: storage holds whichever fields have
/// been written so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    /// New endpoint URL.
    #[serde(rename = "mcpServerUrl", default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    /// New token. An empty string clears it.
    #[serde(rename = "mcpWebSocketToken", default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// New enabled flag.
    #[serde(
        rename = "mcpBrowserControlEnabled",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub control_enabled: Option<bool>,
}

impl SettingsPatch {
    /// Creates an empty patch.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the endpoint URL.
    #[inline]
    #[must_use]
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Sets the token.
    #[inline]
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the enabled flag.
    #[inline]
    #[must_use]
    pub fn with_control_enabled(mut self, enabled: bool) -> Self {
        self.control_enabled = Some(enabled);
        self
    }

    /// Returns `true` if no field is set.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.server_url.is_none() && self.token.is_none() && self.control_enabled.is_none()
    }

    /// Overlays `other` on top of `self`.
    pub fn merge(&mut self, other: &SettingsPatch) {
        if other.server_url.is_some() {
            self.server_url.clone_from(&other.server_url);
        }
        if other.token.is_some() {
            self.token.clone_from(&other.token);
        }
        if other.control_enabled.is_some() {
            self.control_enabled = other.control_enabled;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server_url, DEFAULT_SERVER_URL);
        assert_eq!(settings.token(), None);
        assert!(settings.control_enabled);
    }

    #[test]
    fn test_apply_leaves_missing_fields() {
        let mut settings = Settings::default();
        settings.apply(&SettingsPatch::new().with_token("abc"));

        assert_eq!(settings.token(), Some("abc"));
        assert_eq!(settings.server_url, DEFAULT_SERVER_URL);
        assert!(settings.control_enabled);
    }

    #[test]
    fn test_empty_token_clears() {
        let mut settings = Settings::default();
        settings.apply(&SettingsPatch::new().with_token("abc"));
        settings.apply(&SettingsPatch::new().with_token(""));
        assert_eq!(settings.token(), None);
    }

    #[test]
    fn test_debug_hides_token() {
        let mut settings = Settings::default();
        settings.token = "secret".into();
        let debug = format!("{settings:?}");
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_patch_serialization_skips_none() {
        let patch = SettingsPatch::new().with_control_enabled(false);
        let json = serde_json::to_string(&patch).expect("serialize");
        assert_eq!(json, r#"{"mcpBrowserControlEnabled":false}"#);
    }

    #[test]
    fn test_persisted_key_names() {
        let stored: SettingsPatch = serde_json::from_str(
            r#"{"mcpServerUrl":"ws://a/ws","mcpWebSocketToken":"t","mcpBrowserControlEnabled":false}"#,
        )
        .expect("deserialize");

        assert_eq!(stored.server_url.as_deref(), Some("ws://a/ws"));
        assert_eq!(stored.token.as_deref(), Some("t"));
        assert_eq!(stored.control_enabled, Some(false));
    }

    #[test]
    fn test_blank_stored_url_keeps_default() {
        let mut settings = Settings::default();
        settings.apply_stored(
            &SettingsPatch::new()
                .with_server_url("  ")
                .with_token("abc")
                .with_control_enabled(false),
        );

        assert_eq!(settings.server_url, DEFAULT_SERVER_URL);
        assert_eq!(settings.token(), Some("abc"));
        assert!(!settings.control_enabled);
    }

    #[test]
    fn test_patch_merge() {
        let mut stored = SettingsPatch::new()
            .with_server_url("ws://a/ws")
            .with_token("t1");
        stored.merge(&SettingsPatch::new().with_token("t2").with_control_enabled(true));

        assert_eq!(stored.server_url.as_deref(), Some("ws://a/ws"));
        assert_eq!(stored.token.as_deref(), Some("t2"));
        assert_eq!(stored.control_enabled, Some(true));
    }
}
