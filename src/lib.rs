//! Settings subsystem of the Pocket sync note plugin.
//!
//! [`config::SettingsManager`] owns the settings snapshot, resolves defaults,
//! persists through an injected [`config::SettingsPersistence`] and notifies
//! per-key listeners. [`ui::SettingsPanel`] describes the settings tab and
//! feeds edits back into the store. [`communication`] exposes both to a host
//! process over line-delimited JSON.

pub mod communication;
pub mod config;
pub mod ui;
pub mod utils;

pub use config::{PocketSettings, SettingKey, SettingValue, SettingsManager};
pub use utils::error_handling::{PluginError, PluginResult};

use crate::communication::{JsonProtocol, Message, MessageHandler, MessagePayload};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;

const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Initialize logging to stderr so it doesn't interfere with protocol output
pub fn init_logging() {
    // RUST_LOG overrides the default level
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();
}

/// Serve `settings` to the host over stdin/stdout until EOF or shutdown
pub async fn run_stdio(settings: Arc<SettingsManager>) -> PluginResult<()> {
    serve(
        settings,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}

/// Serve `settings` over any line-oriented reader and writer
pub async fn serve<R, W>(settings: Arc<SettingsManager>, reader: R, writer: W) -> PluginResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let protocol = JsonProtocol::new();
    let (outbound, receiver) = mpsc::unbounded_channel();

    let writer = tokio::spawn(async move { JsonProtocol::new().write_messages(receiver, writer).await });

    {
        let handler = MessageHandler::new(settings, outbound.clone());
        outbound
            .send(Message::new_notification(MessagePayload::Startup {
                status: "ready".to_string(),
            }))
            .map_err(|_| PluginError::communication("host output channel closed"))?;

        info!("Waiting for host messages");
        protocol.read_messages(reader, &handler, &outbound).await?;
    }

    // Host subscriptions keep a sender inside the manager's listener table. The
    // writer ends once the last sender is gone, which does not happen while the
    // caller still holds the manager.
    drop(outbound);
    match tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer).await {
        Ok(joined) => joined.map_err(|e| PluginError::unknown(&e.to_string()))?,
        Err(_) => {
            warn!(
                "Output writer still open after {:?}, host subscriptions outlive the session",
                WRITER_DRAIN_TIMEOUT
            );
            Ok(())
        }
    }
}
