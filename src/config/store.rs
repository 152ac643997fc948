//! In-memory settings cache with one-shot asynchronous load.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{Mutex as AsyncMutex, watch};
use tracing::debug;

use crate::error::Result;
use crate::log_sink::LogSink;

use super::{Settings, SettingsPatch, SettingsStorage};

// ============================================================================
// ConfigStore
// ============================================================================

/// Process-wide settings, loaded once and mutable at runtime.
///
/// Until [`load`](Self::load) completes, [`wait_ready`](Self::wait_ready)
/// suspends; the session uses it so no connection attempt races ahead of the
/// stored settings.
pub struct ConfigStore {
    storage: Arc<dyn SettingsStorage>,
    settings: RwLock<Settings>,
    ready: watch::Sender<bool>,
    /// Serializes `load` and `update` against each other.
    write_lock: AsyncMutex<()>,
    log: LogSink,
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStore")
            .field("settings", &*self.settings.read())
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

impl ConfigStore {
    /// Creates a store over `storage` that has not loaded yet.
    #[must_use]
    pub fn new(storage: Arc<dyn SettingsStorage>, log: LogSink) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            storage,
            settings: RwLock::new(Settings::default()),
            ready,
            write_lock: AsyncMutex::new(()),
            log,
        }
    }

    /// Loads persisted settings over the defaults.
    ///
    /// Resolves exactly once: later calls return the cached settings. A
    /// storage failure is logged and the defaults are kept.
    pub async fn load(&self) -> Settings {
        let _guard = self.write_lock.lock().await;
        if self.is_ready() {
            return self.snapshot();
        }

        match self.storage.read().await {
            Ok(stored) => {
                self.settings.write().apply_stored(&stored);
                self.log.info("Settings loaded");
            }
            Err(e) => {
                self.log
                    .warn(format!("Settings unavailable, using defaults: {e}"));
            }
        }

        let settings = self.snapshot();
        debug!(?settings, "Configuration ready");
        self.ready.send_replace(true);
        settings
    }

    /// Persists `patch`, then applies it.
    ///
    /// Nothing changes in memory if persisting fails.
    ///
    /// # Errors
    ///
    /// Returns the storage error unchanged.
    pub async fn update(&self, patch: &SettingsPatch) -> Result<Settings> {
        let _guard = self.write_lock.lock().await;

        self.storage.write(patch).await?;
        self.settings.write().apply(patch);
        self.log.info("Settings updated");

        Ok(self.snapshot())
    }

    /// Sets the enabled flag.
    ///
    /// # Errors
    ///
    /// Returns the storage error unchanged.
    #[inline]
    pub async fn set_enabled(&self, enabled: bool) -> Result<Settings> {
        self.update(&SettingsPatch::new().with_control_enabled(enabled))
            .await
    }

    /// Returns a copy of the current settings.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> Settings {
        self.settings.read().clone()
    }

    /// Returns the enabled flag.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.settings.read().control_enabled
    }

    /// Returns `true` once [`load`](Self::load) has completed.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Waits until [`load`](Self::load) has completed.
    pub async fn wait_ready(&self) {
        let mut ready = self.ready.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = ready.wait_for(|loaded| *loaded).await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::config::MemoryStorage;
    use crate::error::Error;
    use crate::log_sink::LogLevel;

    struct BrokenStorage;

    #[async_trait]
    impl SettingsStorage for BrokenStorage {
        async fn read(&self) -> Result<SettingsPatch> {
            Err(Error::storage("disk on fire"))
        }

        async fn write(&self, _patch: &SettingsPatch) -> Result<()> {
            Err(Error::storage("read-only"))
        }
    }

    fn store_with(stored: SettingsPatch) -> (ConfigStore, LogSink) {
        let log = LogSink::new();
        let storage = Arc::new(MemoryStorage::with_stored(stored));
        (ConfigStore::new(storage, log.clone()), log)
    }

    #[tokio::test]
    async fn test_load_applies_stored_fields() {
        let (store, log) = store_with(
            SettingsPatch::new()
                .with_token("abc")
                .with_control_enabled(false),
        );

        assert!(!store.is_ready());
        let settings = store.load().await;

        assert!(store.is_ready());
        assert_eq!(settings.token(), Some("abc"));
        assert!(!settings.control_enabled);
        assert!(log.rows().iter().any(|r| r.message == "Settings loaded"));
    }

    #[tokio::test]
    async fn test_load_ignores_blank_stored_url() {
        let (store, _log) = store_with(SettingsPatch::new().with_server_url(""));

        let settings = store.load().await;
        assert_eq!(settings.server_url, crate::config::DEFAULT_SERVER_URL);
    }

    #[tokio::test]
    async fn test_load_resolves_once() {
        let storage = Arc::new(MemoryStorage::with_stored(
            SettingsPatch::new().with_token("first"),
        ));
        let store = ConfigStore::new(storage.clone(), LogSink::new());

        store.load().await;
        storage
            .write(&SettingsPatch::new().with_token("second"))
            .await
            .expect("write");

        let again = store.load().await;
        assert_eq!(again.token(), Some("first"));
    }

    #[tokio::test]
    async fn test_load_failure_keeps_defaults() {
        let log = LogSink::new();
        let store = ConfigStore::new(Arc::new(BrokenStorage), log.clone());

        let settings = store.load().await;

        assert!(store.is_ready());
        assert_eq!(settings, Settings::default());
        assert!(log.rows().iter().any(|r| r.level == LogLevel::Warn));
    }

    #[tokio::test]
    async fn test_update_failure_changes_nothing() {
        let store = ConfigStore::new(Arc::new(BrokenStorage), LogSink::new());
        store.load().await;

        let result = store.update(&SettingsPatch::new().with_token("abc")).await;

        assert!(matches!(result, Err(Error::Storage { .. })));
        assert_eq!(store.snapshot().token(), None);
    }

    #[tokio::test]
    async fn test_update_persists_and_applies() {
        let storage = Arc::new(MemoryStorage::new());
        let store = ConfigStore::new(storage.clone(), LogSink::new());
        store.load().await;

        store
            .update(&SettingsPatch::new().with_server_url("ws://example:1/ws"))
            .await
            .expect("update");
        store.set_enabled(false).await.expect("disable");

        assert_eq!(store.snapshot().server_url, "ws://example:1/ws");
        assert!(!store.is_enabled());
        assert_eq!(storage.stored().control_enabled, Some(false));
    }

    #[tokio::test]
    async fn test_wait_ready_blocks_until_load() {
        let (store, _) = store_with(SettingsPatch::new());

        let mut waiter = tokio_test::task::spawn(store.wait_ready());
        tokio_test::assert_pending!(waiter.poll());

        store.load().await;

        assert!(waiter.is_woken());
        tokio_test::assert_ready!(waiter.poll());
    }
}
