use log::{debug, error, info};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use super::handler::{MessageHandler, Outbound};
use super::types::{Message, MessagePayload};
use crate::utils::error_handling::{PluginError, PluginResult};

/// Line-delimited JSON protocol between the host and the settings process
#[derive(Debug, Default)]
pub struct JsonProtocol;

impl JsonProtocol {
    pub fn new() -> Self {
        Self
    }

    /// Serialize a message to a single JSON line (without the newline)
    pub fn serialize_message(&self, message: &Message) -> PluginResult<String> {
        let json = serde_json::to_string(message)?;
        Ok(json)
    }

    /// Deserialize a JSON line to a message.
    ///
    /// A bare payload such as `{"type": "Ping"}` is accepted as a request.
    pub fn deserialize_message(&self, json: &str) -> PluginResult<Message> {
        if let Ok(message) = serde_json::from_str::<Message>(json) {
            return Ok(message);
        }

        match serde_json::from_str::<MessagePayload>(json) {
            Ok(payload) => Ok(Message::new_request(payload)),
            Err(e) => Err(PluginError::communication(&format!(
                "could not parse message: {}",
                e
            ))),
        }
    }

    /// Read messages until EOF or a `Shutdown` request, handing each to `handler`
    pub async fn read_messages<R>(
        &self,
        mut reader: R,
        handler: &MessageHandler,
        outbound: &Outbound,
    ) -> PluginResult<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buffer = Vec::new();

        loop {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer).await? == 0 {
                break;
            }

            let line = match std::str::from_utf8(&buffer) {
                Ok(line) => line.trim(),
                Err(e) => {
                    error!("Received a line that is not UTF-8: {}", e);
                    let error_message = Message::new_notification(MessagePayload::Error {
                        message: format!("Invalid message encoding: {}", e),
                        details: Some(String::from_utf8_lossy(&buffer).trim().to_string()),
                    });
                    Self::queue(outbound, error_message)?;
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            let message = match self.deserialize_message(line) {
                Ok(message) => message,
                Err(e) => {
                    error!("Failed to deserialize message: {}", e);
                    let error_message = Message::new_notification(MessagePayload::Error {
                        message: format!("Invalid message format: {}", e),
                        details: Some(line.to_string()),
                    });
                    Self::queue(outbound, error_message)?;
                    continue;
                }
            };

            debug!("Received message: {}", message.id);
            let shutdown = matches!(message.payload, MessagePayload::Shutdown);

            if let Some(response) = handler.handle_message(message).await {
                Self::queue(outbound, response)?;
            }
            if shutdown {
                break;
            }
        }

        info!("Message loop ended");
        Ok(())
    }

    /// Drain `outbound` into `writer`, one JSON line per message
    pub async fn write_messages<W>(
        &self,
        mut receiver: mpsc::UnboundedReceiver<Message>,
        mut writer: W,
    ) -> PluginResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        while let Some(message) = receiver.recv().await {
            let mut json = self.serialize_message(&message)?;
            json.push('\n');
            writer.write_all(json.as_bytes()).await?;
            writer.flush().await?;
            debug!("Sent message: {}", message.id);
        }
        Ok(())
    }

    fn queue(outbound: &Outbound, message: Message) -> PluginResult<()> {
        outbound
            .send(message)
            .map_err(|_| PluginError::communication("host output channel closed"))
    }
}
