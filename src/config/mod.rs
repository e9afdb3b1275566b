pub mod settings;
pub mod tags;
pub mod registry;
pub mod persistence;
pub mod manager;

pub use settings::{FolderTagMapping, PocketSettings, SettingKey, SettingValue};
pub use tags::{format_tag_list, parse_tag_list, MultiWordTagConversion};
pub use registry::{CallbackId, CallbackRegistry};
pub use persistence::{JsonFilePersistence, MemoryPersistence, SettingsPersistence, SETTINGS_PATH_ENV};
pub use manager::{OnSettingsChange, SettingsChangeFuture, SettingsManager};
