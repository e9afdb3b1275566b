use anyhow::Result;
use log::{error, info};
use std::sync::Arc;

use pocket_sync::config::{JsonFilePersistence, SettingsManager};

#[tokio::main]
async fn main() -> Result<()> {
    pocket_sync::init_logging();

    info!("Starting pocket-sync settings process");

    let persistence = JsonFilePersistence::from_env()?;
    info!("Using settings file {}", persistence.path().display());

    let settings = Arc::new(SettingsManager::new(Arc::new(persistence)));
    if let Err(e) = settings.load().await {
        error!("Failed to load settings: {}", e);
        return Err(e.into());
    }

    pocket_sync::run_stdio(settings).await?;

    info!("Shutting down");
    Ok(())
}
