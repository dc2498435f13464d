//! docflip - Telegram bot converting documents between Word and PDF
//!
//! Each user walks a small state machine: pick a direction, upload a file,
//! receive the converted document.

mod config;
mod converter;
mod runtime;
mod session;
mod state_machine;
mod telegram;

use config::Config;
use converter::FileConverter;
use runtime::{ProductionManager, RuntimeSettings};
use session::InMemorySessionStore;
use std::sync::Arc;
use telegram::TelegramClient;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.default_log_filter().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    tracing::info!(
        work_dir = %config.work_dir.display(),
        conversion_timeout_secs = config.conversion_timeout.as_secs(),
        "Starting docflip"
    );

    let converter = Arc::new(FileConverter::new(&config.work_dir)?);
    let client = Arc::new(TelegramClient::new(
        &config.api_url,
        &config.telegram_token,
        config.poll_timeout,
    )?);

    match client.get_me().await {
        Ok(me) => tracing::info!(
            bot_id = me.id,
            username = me.username.as_deref().unwrap_or("unknown"),
            "Bot authenticated"
        ),
        Err(e) => tracing::warn!(error = %e, "Could not verify bot identity"),
    }

    let cancel = CancellationToken::new();
    let manager: Arc<ProductionManager> = Arc::new(runtime::SessionManager::new(
        Arc::new(InMemorySessionStore::new()),
        converter,
        Arc::clone(&client),
        RuntimeSettings {
            conversion_timeout: config.conversion_timeout,
        },
        cancel.clone(),
    ));

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Shutdown requested");
        shutdown.cancel();
    });

    telegram::poll_updates(client, manager, cancel).await;

    tracing::info!("docflip stopped");
    Ok(())
}
