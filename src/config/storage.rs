//! External settings persistence.
//!
//! The bridge never owns its settings file format outright: the hosting
//! environment decides where settings live. [`SettingsStorage`] is the seam,
//! with an in-memory backend for embedding and tests and a JSON file backend
//! for standalone hosts.

// ============================================================================
// Imports
// ============================================================================

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{Error, Result};

use super::SettingsPatch;

// ============================================================================
// SettingsStorage
// ============================================================================

/// Key-value persistence for the three bridge settings.
#[async_trait]
pub trait SettingsStorage: Send + Sync + 'static {
    /// Reads whatever fields are stored.
    ///
    /// Fields never written come back as `None`.
    async fn read(&self) -> Result<SettingsPatch>;

    /// Persists the fields present in `patch`, keeping the others.
    async fn write(&self, patch: &SettingsPatch) -> Result<()>;
}

// ============================================================================
// MemoryStorage
// ============================================================================

/// Process-local storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    stored: Mutex<SettingsPatch>,
}

impl MemoryStorage {
    /// Creates empty storage.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage pre-populated with `stored`.
    #[inline]
    #[must_use]
    pub fn with_stored(stored: SettingsPatch) -> Self {
        Self {
            stored: Mutex::new(stored),
        }
    }

    /// Returns a copy of what is currently stored.
    #[must_use]
    pub fn stored(&self) -> SettingsPatch {
        self.stored.lock().clone()
    }
}

#[async_trait]
impl SettingsStorage for MemoryStorage {
    async fn read(&self) -> Result<SettingsPatch> {
        Ok(self.stored.lock().clone())
    }

    async fn write(&self, patch: &SettingsPatch) -> Result<()> {
        self.stored.lock().merge(patch);
        Ok(())
    }
}

// ============================================================================
// JsonFileStorage
// ============================================================================

/// Settings stored as a JSON object on disk.
///
/// A missing file reads as "nothing stored". Writes merge into the existing
/// object so fields not in the patch survive.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Creates storage backed by `path`.
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsStorage for JsonFileStorage {
    async fn read(&self) -> Result<SettingsPatch> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No settings file yet");
                return Ok(SettingsPatch::default());
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            Error::storage(format!("{} is not a settings object: {e}", self.path.display()))
        })
    }

    async fn write(&self, patch: &SettingsPatch) -> Result<()> {
        let mut stored = self.read().await?;
        stored.merge(patch);

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(&stored)?;
        tokio::fs::write(&self.path, json).await?;

        trace!(path = %self.path.display(), "Settings written");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_merges() {
        let storage = MemoryStorage::with_stored(SettingsPatch::new().with_token("abc"));
        storage
            .write(&SettingsPatch::new().with_control_enabled(false))
            .await
            .expect("write");

        let stored = storage.read().await.expect("read");
        assert_eq!(stored.token.as_deref(), Some("abc"));
        assert_eq!(stored.control_enabled, Some(false));
    }

    #[tokio::test]
    async fn test_json_file_missing_reads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = JsonFileStorage::new(dir.path().join("settings.json"));

        let stored = storage.read().await.expect("read");
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn test_json_file_round_trip_keeps_other_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = JsonFileStorage::new(dir.path().join("nested/settings.json"));

        storage
            .write(&SettingsPatch::new().with_server_url("ws://10.0.0.2:9000/ws"))
            .await
            .expect("first write");
        storage
            .write(&SettingsPatch::new().with_token("tok"))
            .await
            .expect("second write");

        let stored = storage.read().await.expect("read");
        assert_eq!(stored.server_url.as_deref(), Some("ws://10.0.0.2:9000/ws"));
        assert_eq!(stored.token.as_deref(), Some("tok"));
        assert_eq!(stored.control_enabled, None);
    }

    #[tokio::test]
    async fn test_json_file_rejects_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, b"[1, 2, 3]").await.expect("seed");

        let err = JsonFileStorage::new(&path).read().await.unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
    }
}
