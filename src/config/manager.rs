use futures::future::{join, join_all, BoxFuture, FutureExt};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::persistence::SettingsPersistence;
use crate::config::registry::{CallbackId, CallbackRegistry};
use crate::config::settings::{PocketSettings, SettingKey, SettingValue};
use crate::utils::error_handling::{PluginError, PluginResult};

/// Future returned by a settings change listener
pub type SettingsChangeFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Listener invoked (and awaited) after a setting is updated
pub type OnSettingsChange = Arc<dyn Fn() -> SettingsChangeFuture + Send + Sync>;

/// Single source of truth for the plugin settings.
///
/// Reads resolve through the default table. All writes go through one async
/// writer lock, so concurrent updates of different keys never lose each other.
pub struct SettingsManager {
    settings: RwLock<PocketSettings>,
    persistence: Arc<dyn SettingsPersistence>,
    listeners: Mutex<HashMap<SettingKey, CallbackRegistry<OnSettingsChange>>>,
    write_lock: tokio::sync::Mutex<()>,
}

impl SettingsManager {
    /// Create a manager with an empty snapshot. Call [`SettingsManager::load`]
    /// before relying on stored values; until then every read is a default.
    pub fn new(persistence: Arc<dyn SettingsPersistence>) -> Self {
        Self {
            settings: RwLock::new(PocketSettings::default()),
            persistence,
            listeners: Mutex::new(HashMap::new()),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Replace the snapshot with the persisted one
    pub async fn load(&self) -> PluginResult<()> {
        let _guard = self.write_lock.lock().await;
        let loaded = self.persistence.load_settings().await?;
        *self.write_settings() = loaded;
        info!("Settings loaded");
        Ok(())
    }

    /// Persist a whole snapshot and make it current.
    /// On failure the previous snapshot stays in place.
    pub async fn save(&self, settings: PocketSettings) -> PluginResult<()> {
        let _guard = self.write_lock.lock().await;
        self.persistence.save_settings(&settings).await?;
        *self.write_settings() = settings;
        info!("Settings saved");
        Ok(())
    }

    /// Current value of `key`, or its default when unset
    pub fn get_setting(&self, key: SettingKey) -> SettingValue {
        self.read_settings().resolve(key)
    }

    /// Copy of the current snapshot, without defaults applied
    pub fn snapshot(&self) -> PocketSettings {
        self.read_settings().clone()
    }

    /// Set one value, persist the snapshot and notify the key's listeners.
    ///
    /// The snapshot is swapped before listeners run, so they read the new
    /// value. Persistence and notification run together and both are awaited.
    /// A persistence failure restores the previous snapshot and is reported
    /// ahead of any listener failure.
    pub async fn update_setting(&self, value: SettingValue) -> PluginResult<()> {
        self.update_setting_with(move |_| Ok(value)).await
    }

    /// Like [`SettingsManager::update_setting`], with the new value derived
    /// from the current snapshot while the writer lock is held.
    ///
    /// An error from `updater` aborts the update before anything changes.
    pub async fn update_setting_with<F>(&self, updater: F) -> PluginResult<()>
    where
        F: FnOnce(&PocketSettings) -> PluginResult<SettingValue> + Send,
    {
        let guard = self.write_lock.lock().await;

        let (key, previous, updated) = {
            let mut settings = self.write_settings();
            let value = updater(&settings)?;
            let previous = settings.clone();
            let key = value.key();
            settings.set(value);
            (key, previous, settings.clone())
        };
        debug!("Updating setting '{}'", key);

        let persist = async move {
            let result = self.persistence.save_settings(&updated).await;
            if let Err(e) = &result {
                warn!("Failed to persist '{}', keeping previous settings: {}", key, e);
                *self.write_settings() = previous;
            }
            // Listeners may write settings themselves; release as soon as the
            // snapshot is on disk.
            drop(guard);
            result
        };

        let (persisted, notified) = join(persist, self.notify_listeners(key)).await;
        persisted?;
        notified
    }

    /// Register `callback` to run on every update of `key`
    pub fn subscribe_on_settings_change<F, Fut>(&self, key: SettingKey, callback: F) -> CallbackId
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let callback: OnSettingsChange = Arc::new(move || callback().boxed());
        let id = self.lock_listeners().entry(key).or_default().register(callback);
        debug!("Subscribed listener {} to '{}'", id, key);
        id
    }

    /// Remove the listener `id` from `key`.
    ///
    /// Returns `false` when nothing was registered under that key and id.
    pub fn unsubscribe_on_settings_change(&self, key: SettingKey, id: CallbackId) -> bool {
        let mut listeners = self.lock_listeners();
        let Some(registry) = listeners.get_mut(&key) else {
            warn!("No listeners registered for '{}', ignoring unsubscribe", key);
            return false;
        };

        let removed = registry.remove(&id).is_some();
        if registry.is_empty() {
            listeners.remove(&key);
        }
        if !removed {
            warn!("Listener {} is not subscribed to '{}'", id, key);
        }
        removed
    }

    /// Number of listeners subscribed to `key`
    pub fn listener_count(&self, key: SettingKey) -> usize {
        self.lock_listeners()
            .get(&key)
            .map(|registry| registry.len())
            .unwrap_or(0)
    }

    async fn notify_listeners(&self, key: SettingKey) -> PluginResult<()> {
        let callbacks: Vec<OnSettingsChange> = self
            .lock_listeners()
            .get(&key)
            .map(|registry| registry.values().cloned().collect())
            .unwrap_or_default();

        if callbacks.is_empty() {
            return Ok(());
        }
        debug!("Notifying {} listener(s) of '{}'", callbacks.len(), key);

        let results = join_all(callbacks.iter().map(|callback| callback())).await;

        let mut first_error = None;
        for err in results.into_iter().filter_map(Result::err) {
            warn!("Settings listener for '{}' failed: {:#}", key, err);
            if first_error.is_none() {
                first_error = Some(PluginError::listener(key, &err));
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn read_settings(&self) -> RwLockReadGuard<'_, PocketSettings> {
        self.settings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_settings(&self) -> RwLockWriteGuard<'_, PocketSettings> {
        self.settings
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_listeners(&self) -> MutexGuard<'_, HashMap<SettingKey, CallbackRegistry<OnSettingsChange>>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::persistence::{JsonFilePersistence, MemoryPersistence};
    use crate::config::settings::FolderTagMapping;
    use crate::config::tags::MultiWordTagConversion;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    fn create_test_manager() -> (Arc<SettingsManager>, Arc<MemoryPersistence>) {
        let persistence = Arc::new(MemoryPersistence::new());
        let manager = Arc::new(SettingsManager::new(persistence.clone()));
        (manager, persistence)
    }

    fn counting_listener(
        manager: &SettingsManager,
        key: SettingKey,
    ) -> (CallbackId, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let id = manager.subscribe_on_settings_change(key, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok(())
            }
        });
        (id, calls)
    }

    #[tokio::test]
    async fn test_unset_keys_resolve_to_defaults() {
        let (manager, _persistence) = create_test_manager();
        manager.load().await.unwrap();

        let defaults = PocketSettings::defaults();
        for key in SettingKey::ALL {
            assert_eq!(manager.get_setting(key), defaults.get(key));
        }
        assert!(manager.get_setting(SettingKey::ItemNoteTemplate).is_absent());
    }

    #[tokio::test]
    async fn test_load_replaces_snapshot_without_merging_defaults() {
        let stored = PocketSettings::default()
            .with(SettingValue::PocketSyncTag(Some("obsidian".to_string())));
        let persistence = Arc::new(MemoryPersistence::with_settings(stored.clone()));
        let manager = SettingsManager::new(persistence);

        manager.load().await.unwrap();
        assert_eq!(manager.snapshot(), stored);
        assert_eq!(
            manager.get_setting(SettingKey::PocketSyncTag),
            SettingValue::PocketSyncTag(Some("obsidian".to_string()))
        );
        assert_eq!(
            manager.get_setting(SettingKey::FrontmatterUrlKey),
            SettingValue::FrontmatterUrlKey(Some("URL".to_string()))
        );
    }

    #[tokio::test]
    async fn test_update_custom_api_url() {
        let (manager, persistence) = create_test_manager();
        manager.load().await.unwrap();

        let value = SettingValue::CustomPocketApiUrl(Some("https://example.com".to_string()));
        manager.update_setting(value.clone()).await.unwrap();

        assert_eq!(manager.get_setting(SettingKey::CustomPocketApiUrl), value);
        assert_eq!(persistence.stored(), manager.snapshot());
        assert_eq!(persistence.stored().custom_pocket_api_url(), "https://example.com");
        assert_eq!(persistence.save_count(), 1);
    }

    #[tokio::test]
    async fn test_listeners_invoked_once_per_update() {
        let (manager, _persistence) = create_test_manager();
        let (_, first) = counting_listener(&manager, SettingKey::PocketSyncTag);
        let (_, second) = counting_listener(&manager, SettingKey::PocketSyncTag);
        let (_, other) = counting_listener(&manager, SettingKey::FrontmatterUrlKey);

        manager
            .update_setting(SettingValue::PocketSyncTag(Some("obsidian".to_string())))
            .await
            .unwrap();

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(other.load(Ordering::SeqCst), 0);
        assert_eq!(manager.listener_count(SettingKey::PocketSyncTag), 2);
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_only_that_listener() {
        let (manager, _persistence) = create_test_manager();
        let (removed_id, removed) = counting_listener(&manager, SettingKey::UploadAllowTags);
        let (_, kept) = counting_listener(&manager, SettingKey::UploadAllowTags);

        assert!(manager.unsubscribe_on_settings_change(SettingKey::UploadAllowTags, removed_id));
        manager
            .update_setting(SettingValue::UploadAllowTags(Some(vec!["share".to_string()])))
            .await
            .unwrap();

        assert_eq!(removed.load(Ordering::SeqCst), 0);
        assert_eq!(kept.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_is_noop() {
        let (manager, _persistence) = create_test_manager();
        let stray = CallbackRegistry::<OnSettingsChange>::generate_id();
        assert!(!manager.unsubscribe_on_settings_change(SettingKey::PocketSyncTag, stray));

        let (id, _) = counting_listener(&manager, SettingKey::PocketSyncTag);
        assert!(!manager.unsubscribe_on_settings_change(SettingKey::PocketSyncTag, stray));
        assert!(manager.unsubscribe_on_settings_change(SettingKey::PocketSyncTag, id));
        assert!(!manager.unsubscribe_on_settings_change(SettingKey::PocketSyncTag, id));
        assert_eq!(manager.listener_count(SettingKey::PocketSyncTag), 0);
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let (manager, persistence) = create_test_manager();
        let settings = PocketSettings::default()
            .with(SettingValue::MultiWordTagConverter(Some(MultiWordTagConversion::DoNothing)))
            .with(SettingValue::UploadFolderTagMappings(Some(vec![FolderTagMapping {
                folder: Some("Inbox/".to_string()),
                tags: vec!["inbox".to_string()],
            }])));

        manager.save(settings.clone()).await.unwrap();
        assert_eq!(persistence.stored(), settings);

        let reloaded = SettingsManager::new(persistence);
        reloaded.load().await.unwrap();
        assert_eq!(reloaded.snapshot(), settings);
    }

    #[tokio::test]
    async fn test_listeners_see_updated_value() {
        let (manager, _persistence) = create_test_manager();
        let seen = Arc::new(Mutex::new(None));

        let reader = manager.clone();
        let sink = seen.clone();
        manager.subscribe_on_settings_change(SettingKey::ItemNotesFolder, move || {
            let value = reader.get_setting(SettingKey::ItemNotesFolder);
            let sink = sink.clone();
            async move {
                *sink.lock().unwrap() = Some(value);
                anyhow::Ok(())
            }
        });

        let value = SettingValue::ItemNotesFolder(Some("Pocket/".to_string()));
        manager.update_setting(value.clone()).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(value));
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_previous_value() {
        let (manager, persistence) = create_test_manager();
        manager
            .update_setting(SettingValue::PocketSyncTag(Some("old".to_string())))
            .await
            .unwrap();
        let (_, calls) = counting_listener(&manager, SettingKey::PocketSyncTag);

        persistence.set_fail_saves(true);
        let result = manager
            .update_setting(SettingValue::PocketSyncTag(Some("new".to_string())))
            .await;

        assert!(matches!(result, Err(PluginError::Persistence(_))));
        assert_eq!(
            manager.get_setting(SettingKey::PocketSyncTag),
            SettingValue::PocketSyncTag(Some("old".to_string()))
        );
        assert_eq!(persistence.stored(), manager.snapshot());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let save_result = manager.save(PocketSettings::defaults()).await;
        assert_err!(save_result);
        assert_eq!(persistence.stored(), manager.snapshot());
    }

    #[tokio::test]
    async fn test_listener_failure_is_reported_after_persisting() {
        let (manager, persistence) = create_test_manager();
        manager.subscribe_on_settings_change(SettingKey::CreateItemNotesOnSync, || async {
            Err::<(), _>(anyhow::anyhow!("index rebuild failed"))
        });
        let (_, healthy) = counting_listener(&manager, SettingKey::CreateItemNotesOnSync);

        let result = manager
            .update_setting(SettingValue::CreateItemNotesOnSync(Some(false)))
            .await;

        match result {
            Err(PluginError::Listener { key, message }) => {
                assert_eq!(key, SettingKey::CreateItemNotesOnSync);
                assert!(message.contains("index rebuild failed"));
            }
            other => panic!("expected listener error, got {:?}", other),
        }
        assert_eq!(healthy.load(Ordering::SeqCst), 1);
        assert!(!persistence.stored().create_item_notes_on_sync());
        assert!(!manager.snapshot().create_item_notes_on_sync());
    }

    #[tokio::test]
    async fn test_persistence_error_wins_over_listener_error() {
        let (manager, persistence) = create_test_manager();
        manager.subscribe_on_settings_change(SettingKey::ItemNotesFolder, || async {
            Err::<(), _>(anyhow::anyhow!("folder watcher failed"))
        });

        persistence.set_fail_saves(true);
        let result = manager
            .update_setting(SettingValue::ItemNotesFolder(Some("Pocket/".to_string())))
            .await;

        assert!(matches!(result, Err(PluginError::Persistence(_))));
        assert!(manager.get_setting(SettingKey::ItemNotesFolder).is_absent());
        assert_eq!(persistence.save_count(), 0);
    }

    #[tokio::test]
    async fn test_listener_can_update_another_setting() {
        let (manager, persistence) = create_test_manager();

        let writer = manager.clone();
        manager.subscribe_on_settings_change(SettingKey::PocketSyncTag, move || {
            let writer = writer.clone();
            async move {
                writer
                    .update_setting(SettingValue::UploadAllowTags(Some(vec!["synced".to_string()])))
                    .await?;
                anyhow::Ok(())
            }
        });

        let update = manager.update_setting(SettingValue::PocketSyncTag(Some("obsidian".to_string())));
        let result = tokio::time::timeout(Duration::from_secs(5), update).await;
        assert_ok!(result.expect("update deadlocked"));

        let stored = persistence.stored();
        assert_eq!(stored.pocket_sync_tag(), Some("obsidian"));
        assert_eq!(stored.upload_allow_tags(), ["synced".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_updates_to_different_keys_are_kept() {
        let (manager, persistence) = create_test_manager();

        let (a, b, c) = tokio::join!(
            manager.update_setting(SettingValue::PocketSyncTag(Some("obsidian".to_string()))),
            manager.update_setting(SettingValue::FrontmatterUrlKey(Some("source".to_string()))),
            manager.update_setting(SettingValue::CreateItemNotesOnSync(Some(false))),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();

        let stored = persistence.stored();
        assert_eq!(stored, manager.snapshot());
        assert_eq!(stored.pocket_sync_tag(), Some("obsidian"));
        assert_eq!(stored.frontmatter_url_key(), "source");
        assert!(!stored.create_item_notes_on_sync());
        assert_eq!(persistence.save_count(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_updates_across_tasks() {
        let (manager, persistence) = create_test_manager();

        let mut handles = Vec::new();
        for (i, key) in [SettingKey::ItemNoteTemplate, SettingKey::ItemNotesFolder, SettingKey::PocketSyncTag]
            .into_iter()
            .enumerate()
        {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move {
                let value = SettingValue::from_json(key, serde_json::json!(format!("value-{}", i))).unwrap();
                manager.update_setting(value).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = persistence.stored();
        assert_eq!(stored.item_note_template(), Some("value-0"));
        assert_eq!(stored.item_notes_folder(), Some("value-1"));
        assert_eq!(stored.pocket_sync_tag(), Some("value-2"));
    }

    #[tokio::test]
    async fn test_update_with_derives_from_current_snapshot() {
        let (manager, persistence) = create_test_manager();
        let (_, calls) = counting_listener(&manager, SettingKey::UploadAllowTags);

        for tag in ["a", "b"] {
            manager
                .update_setting_with(move |settings| {
                    let mut tags = settings.upload_allow_tags().to_vec();
                    tags.push(tag.to_string());
                    Ok(SettingValue::UploadAllowTags(Some(tags)))
                })
                .await
                .unwrap();
        }
        assert_eq!(persistence.stored().upload_allow_tags(), ["a".to_string(), "b".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let result = manager
            .update_setting_with(|_| Err(PluginError::invalid_input("no such mapping")))
            .await;
        assert!(matches!(result, Err(PluginError::InvalidInput(_))));
        assert_eq!(persistence.save_count(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clearing_a_value_restores_default() {
        let (manager, persistence) = create_test_manager();
        manager
            .update_setting(SettingValue::FrontmatterUrlKey(Some("source".to_string())))
            .await
            .unwrap();
        manager
            .update_setting(SettingValue::cleared(SettingKey::FrontmatterUrlKey))
            .await
            .unwrap();

        assert_eq!(
            manager.get_setting(SettingKey::FrontmatterUrlKey),
            SettingValue::FrontmatterUrlKey(Some("URL".to_string()))
        );
        assert_eq!(persistence.stored().frontmatter_url_key, None);
    }

    #[tokio::test]
    async fn test_file_backed_manager() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");

        let manager = SettingsManager::new(Arc::new(JsonFilePersistence::new(&path)));
        manager.load().await.unwrap();
        manager
            .update_setting(SettingValue::ItemNoteIgnoreTags(Some(vec!["done".to_string()])))
            .await
            .unwrap();

        let reopened = SettingsManager::new(Arc::new(JsonFilePersistence::new(&path)));
        reopened.load().await.unwrap();
        assert_eq!(reopened.snapshot(), manager.snapshot());
        assert_eq!(reopened.snapshot().item_note_ignore_tags(), ["done".to_string()]);
    }
}
