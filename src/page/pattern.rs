//! URL match patterns for locating the controlled tab.
//!
//! Patterns use `*` as a wildcard for any run of characters, e.g.
//! `http://127.0.0.1:8188/*`. Everything else matches literally.

use regex::Regex;

use crate::error::{Error, Result};

/// Hosts the hosted application is reachable on.
const LOCAL_HOSTS: [&str; 2] = ["127.0.0.1", "localhost"];

// ============================================================================
// TabPattern
// ============================================================================

/// A compiled URL match pattern.
#[derive(Debug, Clone)]
pub struct TabPattern {
    source: String,
    regex: Regex,
}

impl TabPattern {
    /// Compiles `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the pattern is empty.
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let source = pattern.into();
        if source.is_empty() {
            return Err(Error::config("tab pattern must not be empty"));
        }

        let body = source
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{body}$"))
            .map_err(|e| Error::config(format!("invalid tab pattern '{source}': {e}")))?;

        Ok(Self { source, regex })
    }

    /// Returns the pattern as written.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns `true` if `url` matches.
    #[inline]
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }

    /// Patterns for the application served on `port` of the local host.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in hosts; the `Result` mirrors [`new`](Self::new).
    pub fn local_app(port: u16) -> Result<Vec<Self>> {
        LOCAL_HOSTS
            .iter()
            .map(|host| Self::new(format!("http://{host}:{port}/*")))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
