//! Hotel Scout - chat bot for hotel searches
//!
//! Walks chat users through city, result count, photo and price/distance
//! questions, queries the hotel provider, and keeps a per-user search history.

mod config;
mod db;
mod filter;
mod hotels;
mod messenger;
mod runtime;
mod state_machine;
mod validators;

use config::BotConfig;
use db::Database;
use hotels::{LoggingProvider, RapidApiProvider};
use messenger::{TelegramMessenger, TelegramPoller};
use runtime::{Dispatcher, ProductionEngine};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pause after a failed poll before asking again
const POLL_ERROR_PAUSE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hotel_scout=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = BotConfig::from_env()?;

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    let rapidapi = RapidApiProvider::new(config.rapidapi.clone())?;
    let provider = LoggingProvider::new(Arc::new(rapidapi));
    let messenger = TelegramMessenger::new(&config.telegram_token)?;
    let engine: Arc<ProductionEngine> =
        Arc::new(runtime::DialogEngine::new(provider, db, messenger));
    let dispatcher = Dispatcher::new(engine, config.worker_idle_timeout);

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown requested");
            }
            shutdown.cancel();
        });
    }

    let mut poller = TelegramPoller::new(&config.telegram_token)?;
    tracing::info!(
        host = %config.rapidapi.host,
        locale = %config.rapidapi.locale,
        currency = %config.rapidapi.currency,
        "Hotel Scout polling for messages"
    );

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            result = poller.poll() => match result {
                Ok(messages) => {
                    for (user_id, text) in messages {
                        tracing::debug!(user_id = %user_id, "Message received");
                        dispatcher.dispatch(user_id, text);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Polling failed");
                    tokio::select! {
                        () = shutdown.cancelled() => break,
                        () = tokio::time::sleep(POLL_ERROR_PAUSE) => {}
                    }
                }
            },
        }
    }

    tracing::info!(active_workers = dispatcher.active_workers(), "Hotel Scout stopped");
    Ok(())
}
