use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::tags::MultiWordTagConversion;
use crate::utils::error_handling::{PluginError, PluginResult};

pub const DEFAULT_FRONTMATTER_URL_KEY: &str = "URL";
pub const DEFAULT_POCKET_API_URL: &str = "https://getpocket.com";
pub const DEFAULT_CREATE_ITEM_NOTES_ON_SYNC: bool = true;
pub const DEFAULT_ITEM_NOTE_TEMPLATE_WITH_TEMPLATER: bool = false;

/// Name of a plugin setting.
///
/// The kebab-case names are the keys used in the persisted settings object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SettingKey {
    ItemNoteTemplate,
    ItemNoteTemplateWithTemplater,
    ItemNotesFolder,
    ItemNoteIgnoreTags,
    MultiWordTagConverter,
    PocketSyncTag,
    FrontmatterUrlKey,
    CreateItemNotesOnSync,
    CustomPocketApiUrl,
    UploadAllowTags,
    UploadFolderTagMappings,
}

impl SettingKey {
    pub const ALL: [SettingKey; 11] = [
        SettingKey::ItemNoteTemplate,
        SettingKey::ItemNoteTemplateWithTemplater,
        SettingKey::ItemNotesFolder,
        SettingKey::ItemNoteIgnoreTags,
        SettingKey::MultiWordTagConverter,
        SettingKey::PocketSyncTag,
        SettingKey::FrontmatterUrlKey,
        SettingKey::CreateItemNotesOnSync,
        SettingKey::CustomPocketApiUrl,
        SettingKey::UploadAllowTags,
        SettingKey::UploadFolderTagMappings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::ItemNoteTemplate => "item-note-template",
            SettingKey::ItemNoteTemplateWithTemplater => "item-note-template-with-templater",
            SettingKey::ItemNotesFolder => "item-notes-folder",
            SettingKey::ItemNoteIgnoreTags => "item-note-ignore-tags",
            SettingKey::MultiWordTagConverter => "multi-word-tag-converter",
            SettingKey::PocketSyncTag => "pocket-sync-tag",
            SettingKey::FrontmatterUrlKey => "frontmatter-url-key",
            SettingKey::CreateItemNotesOnSync => "create-item-notes-on-sync",
            SettingKey::CustomPocketApiUrl => "custom-pocket-api-url",
            SettingKey::UploadAllowTags => "upload-allow-tags",
            SettingKey::UploadFolderTagMappings => "upload-folder-tag-mappings",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| PluginError::invalid_input(&format!("unknown setting '{}'", s)))
    }
}

/// Tags appended to item notes in a folder when uploading to Pocket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderTagMapping {
    pub folder: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Persisted plugin settings.
///
/// Every field is optional. `None` and a `null` in the stored JSON both mean
/// "unset" and resolve through [`PocketSettings::defaults`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PocketSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_note_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_note_template_with_templater: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_notes_folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_note_ignore_tags: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_word_tag_converter: Option<MultiWordTagConversion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pocket_sync_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontmatter_url_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_item_notes_on_sync: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_pocket_api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_allow_tags: Option<Vec<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "skip_null_mappings"
    )]
    pub upload_folder_tag_mappings: Option<Vec<FolderTagMapping>>,
}

/// Null entries in a stored mapping list are dropped rather than failing the load
fn skip_null_mappings<'de, D>(deserializer: D) -> Result<Option<Vec<FolderTagMapping>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let mappings: Option<Vec<Option<FolderTagMapping>>> = Option::deserialize(deserializer)?;
    Ok(mappings.map(|list| list.into_iter().flatten().collect()))
}

/// A value for exactly one setting. `None` clears the setting.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    ItemNoteTemplate(Option<String>),
    ItemNoteTemplateWithTemplater(Option<bool>),
    ItemNotesFolder(Option<String>),
    ItemNoteIgnoreTags(Option<Vec<String>>),
    MultiWordTagConverter(Option<MultiWordTagConversion>),
    PocketSyncTag(Option<String>),
    FrontmatterUrlKey(Option<String>),
    CreateItemNotesOnSync(Option<bool>),
    CustomPocketApiUrl(Option<String>),
    UploadAllowTags(Option<Vec<String>>),
    UploadFolderTagMappings(Option<Vec<FolderTagMapping>>),
}

impl SettingValue {
    pub fn key(&self) -> SettingKey {
        match self {
            SettingValue::ItemNoteTemplate(_) => SettingKey::ItemNoteTemplate,
            SettingValue::ItemNoteTemplateWithTemplater(_) => {
                SettingKey::ItemNoteTemplateWithTemplater
            }
            SettingValue::ItemNotesFolder(_) => SettingKey::ItemNotesFolder,
            SettingValue::ItemNoteIgnoreTags(_) => SettingKey::ItemNoteIgnoreTags,
            SettingValue::MultiWordTagConverter(_) => SettingKey::MultiWordTagConverter,
            SettingValue::PocketSyncTag(_) => SettingKey::PocketSyncTag,
            SettingValue::FrontmatterUrlKey(_) => SettingKey::FrontmatterUrlKey,
            SettingValue::CreateItemNotesOnSync(_) => SettingKey::CreateItemNotesOnSync,
            SettingValue::CustomPocketApiUrl(_) => SettingKey::CustomPocketApiUrl,
            SettingValue::UploadAllowTags(_) => SettingKey::UploadAllowTags,
            SettingValue::UploadFolderTagMappings(_) => SettingKey::UploadFolderTagMappings,
        }
    }

    /// The "unset" value for `key`
    pub fn cleared(key: SettingKey) -> Self {
        PocketSettings::default().get(key)
    }

    pub fn is_absent(&self) -> bool {
        match self {
            SettingValue::ItemNoteTemplate(v)
            | SettingValue::ItemNotesFolder(v)
            | SettingValue::PocketSyncTag(v)
            | SettingValue::FrontmatterUrlKey(v)
            | SettingValue::CustomPocketApiUrl(v) => v.is_none(),
            SettingValue::ItemNoteTemplateWithTemplater(v)
            | SettingValue::CreateItemNotesOnSync(v) => v.is_none(),
            SettingValue::ItemNoteIgnoreTags(v) | SettingValue::UploadAllowTags(v) => {
                v.is_none()
            }
            SettingValue::MultiWordTagConverter(v) => v.is_none(),
            SettingValue::UploadFolderTagMappings(v) => v.is_none(),
        }
    }

    /// Decode a raw JSON value for `key`, as found in the persisted object.
    /// `null` decodes to the cleared value.
    pub fn from_json(key: SettingKey, value: serde_json::Value) -> PluginResult<Self> {
        let mut object = serde_json::Map::new();
        object.insert(key.as_str().to_string(), value);
        let settings: PocketSettings = serde_json::from_value(serde_json::Value::Object(object))
            .map_err(|e| {
                PluginError::invalid_input(&format!("bad value for '{}': {}", key, e))
            })?;
        Ok(settings.get(key))
    }

    /// Encode as the JSON value stored under [`SettingValue::key`]
    pub fn to_json(&self) -> PluginResult<serde_json::Value> {
        let settings = PocketSettings::default().with(self.clone());
        let mut encoded = serde_json::to_value(&settings)?;
        Ok(encoded
            .as_object_mut()
            .and_then(|object| object.remove(self.key().as_str()))
            .unwrap_or(serde_json::Value::Null))
    }
}

impl PocketSettings {
    /// The static default table. Keys without a sensible default stay unset.
    pub fn defaults() -> Self {
        PocketSettings {
            multi_word_tag_converter: Some(MultiWordTagConversion::SnakeCase),
            frontmatter_url_key: Some(DEFAULT_FRONTMATTER_URL_KEY.to_string()),
            create_item_notes_on_sync: Some(DEFAULT_CREATE_ITEM_NOTES_ON_SYNC),
            custom_pocket_api_url: Some(DEFAULT_POCKET_API_URL.to_string()),
            item_note_template_with_templater: Some(DEFAULT_ITEM_NOTE_TEMPLATE_WITH_TEMPLATER),
            item_note_ignore_tags: Some(Vec::new()),
            upload_allow_tags: Some(Vec::new()),
            ..Default::default()
        }
    }

    /// Raw stored value for `key`, without defaults
    pub fn get(&self, key: SettingKey) -> SettingValue {
        match key {
            SettingKey::ItemNoteTemplate => {
                SettingValue::ItemNoteTemplate(self.item_note_template.clone())
            }
            SettingKey::ItemNoteTemplateWithTemplater => {
                SettingValue::ItemNoteTemplateWithTemplater(self.item_note_template_with_templater)
            }
            SettingKey::ItemNotesFolder => {
                SettingValue::ItemNotesFolder(self.item_notes_folder.clone())
            }
            SettingKey::ItemNoteIgnoreTags => {
                SettingValue::ItemNoteIgnoreTags(self.item_note_ignore_tags.clone())
            }
            SettingKey::MultiWordTagConverter => {
                SettingValue::MultiWordTagConverter(self.multi_word_tag_converter)
            }
            SettingKey::PocketSyncTag => SettingValue::PocketSyncTag(self.pocket_sync_tag.clone()),
            SettingKey::FrontmatterUrlKey => {
                SettingValue::FrontmatterUrlKey(self.frontmatter_url_key.clone())
            }
            SettingKey::CreateItemNotesOnSync => {
                SettingValue::CreateItemNotesOnSync(self.create_item_notes_on_sync)
            }
            SettingKey::CustomPocketApiUrl => {
                SettingValue::CustomPocketApiUrl(self.custom_pocket_api_url.clone())
            }
            SettingKey::UploadAllowTags => {
                SettingValue::UploadAllowTags(self.upload_allow_tags.clone())
            }
            SettingKey::UploadFolderTagMappings => {
                SettingValue::UploadFolderTagMappings(self.upload_folder_tag_mappings.clone())
            }
        }
    }

    /// Stored value for `key`, falling back to the default table
    pub fn resolve(&self, key: SettingKey) -> SettingValue {
        let value = self.get(key);
        if value.is_absent() {
            Self::defaults().get(key)
        } else {
            value
        }
    }

    pub fn set(&mut self, value: SettingValue) {
        match value {
            SettingValue::ItemNoteTemplate(v) => self.item_note_template = v,
            SettingValue::ItemNoteTemplateWithTemplater(v) => {
                self.item_note_template_with_templater = v
            }
            SettingValue::ItemNotesFolder(v) => self.item_notes_folder = v,
            SettingValue::ItemNoteIgnoreTags(v) => self.item_note_ignore_tags = v,
            SettingValue::MultiWordTagConverter(v) => self.multi_word_tag_converter = v,
            SettingValue::PocketSyncTag(v) => self.pocket_sync_tag = v,
            SettingValue::FrontmatterUrlKey(v) => self.frontmatter_url_key = v,
            SettingValue::CreateItemNotesOnSync(v) => self.create_item_notes_on_sync = v,
            SettingValue::CustomPocketApiUrl(v) => self.custom_pocket_api_url = v,
            SettingValue::UploadAllowTags(v) => self.upload_allow_tags = v,
            SettingValue::UploadFolderTagMappings(v) => self.upload_folder_tag_mappings = v,
        }
    }

    /// Copy of these settings with one value replaced
    pub fn with(&self, value: SettingValue) -> Self {
        let mut updated = self.clone();
        updated.set(value);
        updated
    }

    pub fn item_note_template(&self) -> Option<&str> {
        self.item_note_template.as_deref()
    }

    pub fn item_note_template_with_templater(&self) -> bool {
        self.item_note_template_with_templater
            .unwrap_or(DEFAULT_ITEM_NOTE_TEMPLATE_WITH_TEMPLATER)
    }

    pub fn item_notes_folder(&self) -> Option<&str> {
        self.item_notes_folder.as_deref()
    }

    pub fn item_note_ignore_tags(&self) -> &[String] {
        self.item_note_ignore_tags.as_deref().unwrap_or(&[])
    }

    pub fn multi_word_tag_converter(&self) -> MultiWordTagConversion {
        self.multi_word_tag_converter.unwrap_or_default()
    }

    pub fn pocket_sync_tag(&self) -> Option<&str> {
        self.pocket_sync_tag.as_deref()
    }

    pub fn frontmatter_url_key(&self) -> &str {
        self.frontmatter_url_key
            .as_deref()
            .unwrap_or(DEFAULT_FRONTMATTER_URL_KEY)
    }

    pub fn create_item_notes_on_sync(&self) -> bool {
        self.create_item_notes_on_sync
            .unwrap_or(DEFAULT_CREATE_ITEM_NOTES_ON_SYNC)
    }

    pub fn custom_pocket_api_url(&self) -> &str {
        self.custom_pocket_api_url
            .as_deref()
            .unwrap_or(DEFAULT_POCKET_API_URL)
    }

    pub fn upload_allow_tags(&self) -> &[String] {
        self.upload_allow_tags.as_deref().unwrap_or(&[])
    }

    pub fn upload_folder_tag_mappings(&self) -> &[FolderTagMapping] {
        self.upload_folder_tag_mappings.as_deref().unwrap_or(&[])
    }
}
