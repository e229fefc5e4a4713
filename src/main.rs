mod bot;
mod config;
mod l10n;
mod messaging;
mod router;
mod storage;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, StorageBackend};
use crate::l10n::Localizer;
use crate::storage::{MemoryStorage, RouteStore, SqliteStorage};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,askrelay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Nothing needs draining on shutdown, so an interrupt exits right away.
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            std::process::exit(0);
        }
    });

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Owner: {}", config.telegram.owner_username);
    info!("  Locales: {}", config.locales.directory.display());
    info!("  Storage: {}", config.storage.backend);

    let localizer =
        Localizer::load_from_dir(&config.locales.directory, &config.locales.fallback_language)
            .await
            .context("Failed to load locale bundles")?;

    let store: Arc<dyn RouteStore> = match config.storage.backend {
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        StorageBackend::Sqlite => Arc::new(SqliteStorage::open(&config.storage.database_path)?),
    };

    // Run the Telegram bot
    info!("Bot is starting...");
    bot::run(config, Arc::new(localizer), store).await?;

    Ok(())
}
