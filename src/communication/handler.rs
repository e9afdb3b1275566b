use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::communication::types::{Message, MessagePayload};
use crate::config::{SettingKey, SettingValue, SettingsManager};
use crate::ui::{PanelAction, PluginActions, SettingsPanel};
use crate::utils::error_handling::{PluginError, PluginResult};

/// Outgoing messages, drained to the host by the protocol writer
pub type Outbound = mpsc::UnboundedSender<Message>;

fn send(outbound: &Outbound, message: Message) -> PluginResult<()> {
    outbound
        .send(message)
        .map_err(|_| PluginError::communication("host output channel closed"))
}

/// Plugin actions carried out by the host process.
///
/// Each action is forwarded as an `ActionRequested` notification; the host
/// reports whether an account is connected with `AccountStatus`.
pub struct HostActions {
    outbound: Outbound,
    connected: AtomicBool,
}

impl HostActions {
    pub fn new(outbound: Outbound) -> Self {
        Self {
            outbound,
            connected: AtomicBool::new(false),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    fn request(&self, action: PanelAction) -> PluginResult<()> {
        debug!("Forwarding {:?} to host", action);
        send(
            &self.outbound,
            Message::new_notification(MessagePayload::ActionRequested { action }),
        )
    }
}

#[async_trait]
impl PluginActions for HostActions {
    async fn connect_account(&self) -> PluginResult<()> {
        self.request(PanelAction::ConnectAccount)
    }

    async fn is_connected(&self) -> PluginResult<bool> {
        Ok(self.connected.load(Ordering::SeqCst))
    }

    async fn disconnect_account(&self) -> PluginResult<()> {
        self.request(PanelAction::DisconnectAccount)?;
        self.set_connected(false);
        Ok(())
    }

    async fn sync_items(&self) -> PluginResult<()> {
        self.request(PanelAction::SyncItems)
    }

    async fn clear_local_data(&self) -> PluginResult<()> {
        self.request(PanelAction::ClearLocalData)
    }
}

/// Dispatches host requests to the settings store and panel
pub struct MessageHandler {
    settings: Arc<SettingsManager>,
    panel: SettingsPanel,
    actions: Arc<HostActions>,
    outbound: Outbound,
}

impl MessageHandler {
    pub fn new(settings: Arc<SettingsManager>, outbound: Outbound) -> Self {
        let actions = Arc::new(HostActions::new(outbound.clone()));
        let panel = SettingsPanel::new(settings.clone(), actions.clone());
        Self {
            settings,
            panel,
            actions,
            outbound,
        }
    }

    /// Handle one message. Requests always get a response; failures become
    /// an `Error` response correlated with the request.
    pub async fn handle_message(&self, message: Message) -> Option<Message> {
        let expects_response = message.expects_response();
        let id = message.id.clone();

        let payload = match self.dispatch(message.payload).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Request {} failed: {}", id, e);
                MessagePayload::Error {
                    message: e.user_message(),
                    details: Some(e.to_string()),
                }
            }
        };

        if expects_response {
            Some(Message::new_response(id, payload))
        } else {
            None
        }
    }

    async fn dispatch(&self, payload: MessagePayload) -> PluginResult<MessagePayload> {
        match payload {
            MessagePayload::Ping => Ok(MessagePayload::Pong),
            MessagePayload::Shutdown => {
                info!("Host requested shutdown");
                Ok(MessagePayload::Shutdown)
            }

            MessagePayload::Load => {
                self.settings.load().await?;
                Ok(MessagePayload::Loaded)
            }
            MessagePayload::GetSetting { key } => Ok(MessagePayload::Setting {
                key,
                value: self.settings.get_setting(key).to_json()?,
            }),
            MessagePayload::UpdateSetting { key, value } => {
                let value = SettingValue::from_json(key, value)?;
                self.settings.update_setting(value).await?;
                Ok(MessagePayload::Updated { key })
            }
            MessagePayload::Snapshot => Ok(MessagePayload::SettingsSnapshot {
                settings: self.settings.snapshot(),
            }),

            MessagePayload::Subscribe { key } => {
                let id = self.subscribe(key);
                Ok(MessagePayload::Subscribed { key, id })
            }
            MessagePayload::Unsubscribe { key, id } => Ok(MessagePayload::Unsubscribed {
                key,
                removed: self.settings.unsubscribe_on_settings_change(key, id),
            }),

            MessagePayload::RenderPanel => Ok(MessagePayload::Panel {
                entries: self.panel.render(),
            }),
            MessagePayload::PanelText { key, input } => {
                self.panel.apply_text(key, &input).await?;
                Ok(MessagePayload::Updated { key })
            }
            MessagePayload::PanelToggle { key, enabled } => {
                self.panel.apply_toggle(key, enabled).await?;
                Ok(MessagePayload::Updated { key })
            }
            MessagePayload::PanelSelect { key, option } => {
                self.panel.select_option(key, &option).await?;
                Ok(MessagePayload::Updated { key })
            }
            MessagePayload::AddFolderMapping => {
                self.panel.add_folder_mapping().await?;
                Ok(self.mappings_updated())
            }
            MessagePayload::SetMappingFolder { index, input } => {
                self.panel.set_mapping_folder(index, &input).await?;
                Ok(self.mappings_updated())
            }
            MessagePayload::SetMappingTags { index, input } => {
                self.panel.set_mapping_tags(index, &input).await?;
                Ok(self.mappings_updated())
            }
            MessagePayload::RemoveFolderMapping { index } => {
                self.panel.remove_folder_mapping(index).await?;
                Ok(self.mappings_updated())
            }

            MessagePayload::TriggerAction { action } => Ok(MessagePayload::Notice {
                message: self.panel.trigger(action).await?,
            }),
            MessagePayload::AccountStatus { connected } => {
                self.actions.set_connected(connected);
                Ok(MessagePayload::Pong)
            }

            other => Err(PluginError::invalid_input(&format!(
                "unexpected message from host: {:?}",
                other
            ))),
        }
    }

    fn mappings_updated(&self) -> MessagePayload {
        MessagePayload::Updated {
            key: SettingKey::UploadFolderTagMappings,
        }
    }

    /// Forward every change of `key` to the host as a `SettingChanged` notification
    fn subscribe(&self, key: SettingKey) -> crate::config::CallbackId {
        let outbound = self.outbound.clone();
        let settings = Arc::downgrade(&self.settings);
        self.settings.subscribe_on_settings_change(key, move || {
            let outbound = outbound.clone();
            let settings = settings.upgrade();
            async move {
                let Some(settings) = settings else {
                    return anyhow::Ok(());
                };
                let value = settings.get_setting(key).to_json()?;
                send(
                    &outbound,
                    Message::new_notification(MessagePayload::SettingChanged { key, value }),
                )?;
                anyhow::Ok(())
            }
        })
    }
}
