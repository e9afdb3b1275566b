use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{CallbackId, PocketSettings, SettingKey};
use crate::ui::{PanelAction, PanelEntry};

/// Unique identifier for correlating requests and responses
pub type MessageId = String;

/// Envelope for every line exchanged with the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for this message
    pub id: MessageId,
    /// Type of message (request, response, notification)
    pub message_type: MessageType,
    /// Timestamp when message was created
    pub timestamp: DateTime<Utc>,
    /// Message payload
    pub payload: MessagePayload,
}

/// Type of message being sent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MessageType {
    /// Request expecting a response
    Request { correlation_id: Option<MessageId> },
    /// Response to a previous request
    Response { correlation_id: MessageId },
    /// One-way notification (no response expected)
    Notification,
}

/// All possible message payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MessagePayload {
    // System messages
    Ping,
    Pong,
    Startup { status: String },
    Shutdown,
    Error { message: String, details: Option<String> },

    // Store operations
    Load,
    Loaded,
    GetSetting { key: SettingKey },
    Setting { key: SettingKey, value: serde_json::Value },
    UpdateSetting { key: SettingKey, value: serde_json::Value },
    Updated { key: SettingKey },
    Snapshot,
    SettingsSnapshot { settings: PocketSettings },

    // Change notification
    Subscribe { key: SettingKey },
    Subscribed { key: SettingKey, id: CallbackId },
    Unsubscribe { key: SettingKey, id: CallbackId },
    Unsubscribed { key: SettingKey, removed: bool },
    SettingChanged { key: SettingKey, value: serde_json::Value },

    // Settings panel
    RenderPanel,
    Panel { entries: Vec<PanelEntry> },
    PanelText { key: SettingKey, input: String },
    PanelToggle { key: SettingKey, enabled: bool },
    PanelSelect { key: SettingKey, option: String },
    AddFolderMapping,
    SetMappingFolder { index: usize, input: String },
    SetMappingTags { index: usize, input: String },
    RemoveFolderMapping { index: usize },

    // Plugin actions
    TriggerAction { action: PanelAction },
    Notice { message: String },
    ActionRequested { action: PanelAction },
    AccountStatus { connected: bool },
}

impl Message {
    /// Create a new request message
    pub fn new_request(payload: MessagePayload) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message_type: MessageType::Request { correlation_id: None },
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Create a response to a request
    pub fn new_response(correlation_id: MessageId, payload: MessagePayload) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message_type: MessageType::Response { correlation_id },
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Create a notification message
    pub fn new_notification(payload: MessagePayload) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message_type: MessageType::Notification,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Get correlation ID if this is a request or response
    pub fn correlation_id(&self) -> Option<&MessageId> {
        match &self.message_type {
            MessageType::Request { correlation_id } => correlation_id.as_ref(),
            MessageType::Response { correlation_id } => Some(correlation_id),
            MessageType::Notification => None,
        }
    }

    /// Check if this message expects a response
    pub fn expects_response(&self) -> bool {
        matches!(self.message_type, MessageType::Request { .. })
    }
}
