use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::error_handling::PluginResult;

/// Buttons on the settings panel that run plugin operations rather than
/// editing a setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelAction {
    ConnectAccount,
    DisconnectAccount,
    SyncItems,
    ClearLocalData,
}

impl PanelAction {
    pub const ALL: [PanelAction; 4] = [
        PanelAction::ConnectAccount,
        PanelAction::DisconnectAccount,
        PanelAction::SyncItems,
        PanelAction::ClearLocalData,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PanelAction::ConnectAccount => "Pocket authorization",
            PanelAction::DisconnectAccount => "Disconnect your Pocket account",
            PanelAction::SyncItems => "Sync Pocket items",
            PanelAction::ClearLocalData => "Clear locally-stored Pocket data",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PanelAction::ConnectAccount => "Connect your Pocket account",
            PanelAction::DisconnectAccount => "Disconnects Obsidian from Pocket",
            PanelAction::SyncItems => "Updates the Pocket items in Obsidian from Pocket",
            PanelAction::ClearLocalData => {
                "Clears Pocket data stored locally by obsidian-pocket plugin"
            }
        }
    }

    pub fn button_text(&self) -> &'static str {
        match self {
            PanelAction::ConnectAccount => "Connect your Pocket account",
            PanelAction::DisconnectAccount => "Disconnect your Pocket account",
            PanelAction::SyncItems => "Sync Pocket items",
            PanelAction::ClearLocalData => "Clear locally-stored Pocket data",
        }
    }
}

/// Plugin operations reachable from the settings panel.
///
/// Authentication, syncing and the local item stores live outside the
/// settings subsystem; the host provides them through this trait.
#[async_trait]
pub trait PluginActions: Send + Sync {
    /// Start the Pocket authorization flow
    async fn connect_account(&self) -> PluginResult<()>;

    /// Whether Pocket access credentials are stored
    async fn is_connected(&self) -> PluginResult<bool>;

    /// Forget the stored Pocket access credentials
    async fn disconnect_account(&self) -> PluginResult<()>;

    /// Sync Pocket items into notes
    async fn sync_items(&self) -> PluginResult<()>;

    /// Clear the locally stored item, metadata and URL index data
    async fn clear_local_data(&self) -> PluginResult<()>;
}
