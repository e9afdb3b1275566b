use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::settings::{
    FolderTagMapping, PocketSettings, SettingKey, SettingValue, DEFAULT_FRONTMATTER_URL_KEY,
    DEFAULT_POCKET_API_URL,
};
use crate::config::tags::{format_tag_list, parse_tag_list, MultiWordTagConversion};
use crate::config::SettingsManager;
use crate::ui::actions::{PanelAction, PluginActions};
use crate::utils::error_handling::{PluginError, PluginResult};

pub const HEADING_ITEM_NOTE: &str = "Pocket item note settings";
pub const HEADING_UPLOAD_DATA: &str = "Upload data to pocket settings";

const ITEM_NOTE_TEMPLATE_DESC: &str = "Choose the file to use as a custom template when \
creating a new note from a Pocket item, rather than using the default template provided by \
obsidian-pocket. IMPORTANT: Please consider carefully whether it is worth the effort to \
provide your own custom template, as the default one is complete and tested to work properly \
with YAML front matter.";

const TEMPLATER_DESC: &str = "Use the templater plugin to process the Pocket item note \
template. This will allow you to use templater 'replace-in-file-templater' command in your \
Pocket item note template file, you must have the templater plugin installed and enabled for \
this";

const MULTI_WORD_TAG_CONVERTER_DESC: &str = "Pocket supports spaces within a tag (e.g. '#tag \
with spaces' is a valid Pocket tag), while Obsidian tags do not. This setting determines how \
Pocket tags that contain spaces are changed to work consistently in Obsidian. This setting \
only affects the Pocket reading list - it does not change any existing tags in Pocket or \
Obsidian.";

const SYNC_TAG_DESC: &str = "Specify a Pocket tag to sync, e.g. adding 'obsidian' here will \
result in only Pocket items tagged with 'obsidian' being synced. If this setting is left \
blank, all Pocket items will be synced.";

const FRONT_MATTER_URL_KEY_DESC: &str = "Specify the key in the front matter to use when \
matching Pocket items to Obsidian notes. The default key is \"URL\". IMPORTANT: Please \
consider carefully whether it is worth the effort to customize this option, and make sure \
that the key specified here is the same one that is used in the Pocket item note template \
used to create your Pocket item notes. Failure to do so will result in Pocket item notes not \
being matched to their respective Pocket items.";

const CUSTOM_POCKET_API_URL_DESC: &str = "Use a custom Pocket API URL. This is an advanced \
setting and should only be used if you know what you are doing.";

const UPLOAD_ALLOW_TAGS_DESC: &str = "Specify the allowed list of tags, multiple tags \
separated by commas. If this setting is left blank, data will not be uploaded.";

const FOLDER_TAG_MAPPINGS_DESC: &str = "Set tags for folder mappings, item notes in that \
folder will automatically append these tags for uploading to Pocket.";

/// One row of the settings panel, in display order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelEntry {
    Heading { text: String },
    Action(ActionButton),
    Setting(SettingControl),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionButton {
    pub action: PanelAction,
    pub name: String,
    pub description: String,
    pub button_text: String,
}

/// A control bound to one setting, with the value it should display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingControl {
    pub key: SettingKey,
    pub name: String,
    pub description: String,
    pub control: ControlKind,
    pub value: ControlValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlKind {
    Toggle,
    Text { placeholder: String },
    Dropdown { options: Vec<DropdownOption> },
    TagList { placeholder: String },
    FolderTagMappings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    Toggle(bool),
    Text(String),
    Mappings(Vec<FolderTagMapping>),
}

/// Toolkit-independent model of the plugin settings tab.
///
/// Widgets are drawn by the host from [`SettingsPanel::render`]; edits come
/// back as raw input and are normalized here before reaching the store.
pub struct SettingsPanel {
    settings: Arc<SettingsManager>,
    actions: Arc<dyn PluginActions>,
}

impl SettingsPanel {
    pub fn new(settings: Arc<SettingsManager>, actions: Arc<dyn PluginActions>) -> Self {
        Self { settings, actions }
    }

    pub fn settings(&self) -> &Arc<SettingsManager> {
        &self.settings
    }

    /// All panel rows with their current values
    pub fn render(&self) -> Vec<PanelEntry> {
        let snapshot = self.settings.snapshot();
        let control = |key| PanelEntry::Setting(Self::describe(&snapshot, key));

        let mut entries: Vec<PanelEntry> = PanelAction::ALL
            .iter()
            .map(|action| {
                PanelEntry::Action(ActionButton {
                    action: *action,
                    name: action.name().to_string(),
                    description: action.description().to_string(),
                    button_text: action.button_text().to_string(),
                })
            })
            .collect();

        entries.push(control(SettingKey::MultiWordTagConverter));
        entries.push(control(SettingKey::PocketSyncTag));
        entries.push(control(SettingKey::CustomPocketApiUrl));

        entries.push(PanelEntry::Heading {
            text: HEADING_ITEM_NOTE.to_string(),
        });
        entries.push(control(SettingKey::CreateItemNotesOnSync));
        entries.push(control(SettingKey::ItemNotesFolder));
        entries.push(control(SettingKey::ItemNoteTemplate));
        entries.push(control(SettingKey::ItemNoteTemplateWithTemplater));
        entries.push(control(SettingKey::FrontmatterUrlKey));
        entries.push(control(SettingKey::ItemNoteIgnoreTags));

        entries.push(PanelEntry::Heading {
            text: HEADING_UPLOAD_DATA.to_string(),
        });
        entries.push(control(SettingKey::UploadAllowTags));
        entries.push(control(SettingKey::UploadFolderTagMappings));

        entries
    }

    /// The control for a single setting
    pub fn control(&self, key: SettingKey) -> SettingControl {
        Self::describe(&self.settings.snapshot(), key)
    }

    fn describe(snapshot: &PocketSettings, key: SettingKey) -> SettingControl {
        let text = |placeholder: &str| ControlKind::Text {
            placeholder: placeholder.to_string(),
        };
        let tag_list = |placeholder: &str| ControlKind::TagList {
            placeholder: placeholder.to_string(),
        };
        let optional_text = |value: Option<&str>| ControlValue::Text(value.unwrap_or("").to_string());

        let (name, description, control, value) = match key {
            SettingKey::MultiWordTagConverter => (
                "Multi-word Pocket tag converter options",
                MULTI_WORD_TAG_CONVERTER_DESC,
                ControlKind::Dropdown {
                    options: MultiWordTagConversion::ALL
                        .iter()
                        .map(|conversion| DropdownOption {
                            value: conversion.as_str().to_string(),
                            label: conversion.label().to_string(),
                        })
                        .collect(),
                },
                ControlValue::Text(snapshot.multi_word_tag_converter().as_str().to_string()),
            ),
            SettingKey::PocketSyncTag => (
                "Pocket sync tag",
                SYNC_TAG_DESC,
                text("Specify a tag to limit syncs"),
                optional_text(snapshot.pocket_sync_tag()),
            ),
            SettingKey::CustomPocketApiUrl => (
                "Custom Pocket API URL",
                CUSTOM_POCKET_API_URL_DESC,
                text(DEFAULT_POCKET_API_URL),
                ControlValue::Text(snapshot.custom_pocket_api_url().to_string()),
            ),
            SettingKey::CreateItemNotesOnSync => (
                "Create Pocket item notes on sync",
                "Create Pocket item notes automatically when new Pocket items are synced",
                ControlKind::Toggle,
                ControlValue::Toggle(snapshot.create_item_notes_on_sync()),
            ),
            SettingKey::ItemNotesFolder => (
                "Pocket item notes folder location",
                "Choose the folder for creating new Pocket item notes. Pocket item notes will \
                 be created in the root folder by default.",
                text("Example: Pocket item notes/"),
                optional_text(snapshot.item_notes_folder()),
            ),
            SettingKey::ItemNoteTemplate => (
                "Pocket item note template file location",
                ITEM_NOTE_TEMPLATE_DESC,
                text("Example: Templates/Pocket item note"),
                optional_text(snapshot.item_note_template()),
            ),
            SettingKey::ItemNoteTemplateWithTemplater => (
                "Integrated templater plugin for item note template",
                TEMPLATER_DESC,
                ControlKind::Toggle,
                ControlValue::Toggle(snapshot.item_note_template_with_templater()),
            ),
            SettingKey::FrontmatterUrlKey => (
                "Front matter URL key",
                FRONT_MATTER_URL_KEY_DESC,
                text(DEFAULT_FRONTMATTER_URL_KEY),
                ControlValue::Text(snapshot.frontmatter_url_key().to_string()),
            ),
            SettingKey::ItemNoteIgnoreTags => (
                "Ignore item tags",
                "Specify a list of tags to ignore when creating item notes",
                tag_list("Specify a list of tags to ignore"),
                ControlValue::Text(format_tag_list(snapshot.item_note_ignore_tags())),
            ),
            SettingKey::UploadAllowTags => (
                "Upload allow tags",
                UPLOAD_ALLOW_TAGS_DESC,
                tag_list("Specify a list of tags to allow"),
                ControlValue::Text(format_tag_list(snapshot.upload_allow_tags())),
            ),
            SettingKey::UploadFolderTagMappings => (
                "Folder tags mappings",
                FOLDER_TAG_MAPPINGS_DESC,
                ControlKind::FolderTagMappings,
                ControlValue::Mappings(snapshot.upload_folder_tag_mappings().to_vec()),
            ),
        };

        SettingControl {
            key,
            name: name.to_string(),
            description: description.to_string(),
            control,
            value,
        }
    }

    /// Apply raw text typed into a text or tag-list field.
    ///
    /// Blank text clears the setting so its default applies again.
    pub async fn apply_text(&self, key: SettingKey, raw: &str) -> PluginResult<()> {
        let text = non_blank(raw);
        let value = match key {
            SettingKey::ItemNoteTemplate => SettingValue::ItemNoteTemplate(text),
            SettingKey::ItemNotesFolder => SettingValue::ItemNotesFolder(text),
            SettingKey::PocketSyncTag => SettingValue::PocketSyncTag(text),
            SettingKey::FrontmatterUrlKey => SettingValue::FrontmatterUrlKey(text),
            SettingKey::CustomPocketApiUrl => SettingValue::CustomPocketApiUrl(text),
            SettingKey::ItemNoteIgnoreTags => {
                SettingValue::ItemNoteIgnoreTags(Some(parse_tag_list(raw)))
            }
            SettingKey::UploadAllowTags => SettingValue::UploadAllowTags(Some(parse_tag_list(raw))),
            _ => {
                return Err(PluginError::invalid_input(&format!(
                    "'{}' is not a text setting",
                    key
                )))
            }
        };
        debug!("Panel text input for '{}'", key);
        self.settings.update_setting(value).await
    }

    pub async fn apply_toggle(&self, key: SettingKey, enabled: bool) -> PluginResult<()> {
        let value = match key {
            SettingKey::CreateItemNotesOnSync => SettingValue::CreateItemNotesOnSync(Some(enabled)),
            SettingKey::ItemNoteTemplateWithTemplater => {
                SettingValue::ItemNoteTemplateWithTemplater(Some(enabled))
            }
            _ => {
                return Err(PluginError::invalid_input(&format!(
                    "'{}' is not a toggle setting",
                    key
                )))
            }
        };
        self.settings.update_setting(value).await
    }

    pub async fn select_option(&self, key: SettingKey, option: &str) -> PluginResult<()> {
        if key != SettingKey::MultiWordTagConverter {
            return Err(PluginError::invalid_input(&format!(
                "'{}' is not a dropdown setting",
                key
            )));
        }
        let conversion: MultiWordTagConversion = option.parse()?;
        self.settings
            .update_setting(SettingValue::MultiWordTagConverter(Some(conversion)))
            .await
    }

    /// Append an empty folder-tag mapping row
    pub async fn add_folder_mapping(&self) -> PluginResult<()> {
        self.modify_mappings(|mappings| {
            mappings.push(FolderTagMapping::default());
            Ok(())
        })
        .await
    }

    /// Set the folder of mapping `index`; a trailing `/` is added if missing
    pub async fn set_mapping_folder(&self, index: usize, raw: &str) -> PluginResult<()> {
        let folder = non_blank(raw).map(|folder| {
            if folder.ends_with('/') {
                folder
            } else {
                format!("{}/", folder)
            }
        });
        self.modify_mappings(move |mappings| {
            mapping_at(mappings, index)?.folder = folder;
            Ok(())
        })
        .await
    }

    /// Set the tags of mapping `index` from comma-separated input
    pub async fn set_mapping_tags(&self, index: usize, raw: &str) -> PluginResult<()> {
        let tags = parse_tag_list(raw);
        self.modify_mappings(move |mappings| {
            mapping_at(mappings, index)?.tags = tags;
            Ok(())
        })
        .await
    }

    pub async fn remove_folder_mapping(&self, index: usize) -> PluginResult<()> {
        self.modify_mappings(move |mappings| {
            mapping_at(mappings, index)?;
            mappings.remove(index);
            Ok(())
        })
        .await
    }

    async fn modify_mappings<F>(&self, edit: F) -> PluginResult<()>
    where
        F: FnOnce(&mut Vec<FolderTagMapping>) -> PluginResult<()> + Send,
    {
        self.settings
            .update_setting_with(move |settings| {
                let mut mappings = settings.upload_folder_tag_mappings().to_vec();
                edit(&mut mappings)?;
                Ok(SettingValue::UploadFolderTagMappings(Some(mappings)))
            })
            .await
    }

    /// Run a panel button and return the notice to show the user
    pub async fn trigger(&self, action: PanelAction) -> PluginResult<String> {
        info!("Settings panel action: {:?}", action);
        match action {
            PanelAction::ConnectAccount => {
                self.actions.connect_account().await?;
                Ok("Opening Pocket authorization".to_string())
            }
            PanelAction::DisconnectAccount => {
                if self.actions.is_connected().await? {
                    debug!("Disconnecting from Pocket by clearing Pocket access info");
                    self.actions.disconnect_account().await?;
                    Ok("Disconnected from Pocket".to_string())
                } else {
                    Ok("Already logged out of Pocket, skipping".to_string())
                }
            }
            PanelAction::SyncItems => {
                self.actions.sync_items().await?;
                Ok("Syncing Pocket items".to_string())
            }
            PanelAction::ClearLocalData => {
                self.actions.clear_local_data().await?;
                Ok("Cleared locally-stored Pocket data".to_string())
            }
        }
    }
}

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn mapping_at(mappings: &mut [FolderTagMapping], index: usize) -> PluginResult<&mut FolderTagMapping> {
    let len = mappings.len();
    mappings.get_mut(index).ok_or_else(|| {
        PluginError::invalid_input(&format!(
            "folder mapping {} does not exist ({} configured)",
            index, len
        ))
    })
}
