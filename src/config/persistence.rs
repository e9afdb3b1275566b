use async_trait::async_trait;
use log::{debug, info};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::fs;

use crate::config::settings::PocketSettings;
use crate::utils::error_handling::{PluginError, PluginResult};

/// Environment variable overriding the settings file location
pub const SETTINGS_PATH_ENV: &str = "POCKET_SYNC_SETTINGS";

/// Durable storage for the settings snapshot
#[async_trait]
pub trait SettingsPersistence: Send + Sync {
    /// Load the stored snapshot
    async fn load_settings(&self) -> PluginResult<PocketSettings>;

    /// Store the whole snapshot
    async fn save_settings(&self, settings: &PocketSettings) -> PluginResult<()>;
}

/// Settings stored as a pretty-printed JSON object in a single file
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Use `POCKET_SYNC_SETTINGS` if set, otherwise the per-user config directory
    pub fn from_env() -> PluginResult<Self> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve the settings file location
    pub fn default_path() -> PluginResult<PathBuf> {
        if let Ok(path) = std::env::var(SETTINGS_PATH_ENV) {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        let home = std::env::var("HOME")
            .map_err(|_| PluginError::config("HOME environment variable not found"))?;

        Ok(PathBuf::from(home)
            .join(".config")
            .join("pocket-sync")
            .join("settings.json"))
    }
}

#[async_trait]
impl SettingsPersistence for JsonFilePersistence {
    async fn load_settings(&self) -> PluginResult<PocketSettings> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No settings file at {}, starting empty", self.path.display());
                return Ok(PocketSettings::default());
            }
            Err(e) => {
                return Err(PluginError::filesystem(&format!(
                    "Failed to read settings file: {}",
                    e
                )))
            }
        };

        if content.trim().is_empty() {
            return Ok(PocketSettings::default());
        }

        let settings: PocketSettings = serde_json::from_str(&content)?;
        info!("Loaded settings from {}", self.path.display());
        Ok(settings)
    }

    async fn save_settings(&self, settings: &PocketSettings) -> PluginResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    PluginError::filesystem(&format!(
                        "Failed to create settings directory: {}",
                        e
                    ))
                })?;
            }
        }

        let content = serde_json::to_string_pretty(settings)?;

        fs::write(&self.path, content).await.map_err(|e| {
            PluginError::persistence(&format!("Failed to write settings file: {}", e))
        })?;
        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }
}

/// Settings kept in memory, for embedding hosts that persist elsewhere
#[derive(Default)]
pub struct MemoryPersistence {
    stored: Mutex<PocketSettings>,
    save_count: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: PocketSettings) -> Self {
        Self {
            stored: Mutex::new(settings),
            ..Default::default()
        }
    }

    /// What a subsequent `load_settings` would return
    pub fn stored(&self) -> PocketSettings {
        self.stored
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }

    /// Make every following save fail until switched off again
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SettingsPersistence for MemoryPersistence {
    async fn load_settings(&self) -> PluginResult<PocketSettings> {
        Ok(self.stored())
    }

    async fn save_settings(&self, settings: &PocketSettings) -> PluginResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PluginError::persistence("settings storage is unavailable"));
        }
        *self
            .stored
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = settings.clone();
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
