//! Process configuration from environment variables

use crate::hotels::RapidApiConfig;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_RAPIDAPI_HOST: &str = "hotels4.p.rapidapi.com";
const DEFAULT_LOCALE: &str = "en_US";
const DEFAULT_CURRENCY: &str = "USD";
const DEFAULT_WORKER_IDLE_SECS: u64 = 600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Everything the bot needs to start
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram_token: String,
    pub rapidapi: RapidApiConfig,
    pub db_path: PathBuf,
    /// How long a user's worker waits for a message before retiring
    pub worker_idle_timeout: Duration,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let present = |name: &str| var(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| present(name).ok_or(ConfigError::Missing(name));
        let optional = |name: &str, default: &str| {
            present(name).unwrap_or_else(|| default.to_string())
        };

        let db_path = present("HOTEL_SCOUT_DB_PATH").map_or_else(
            || {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".hotel-scout").join("history.db")
            },
            PathBuf::from,
        );

        let worker_idle_secs = match var("HOTEL_SCOUT_WORKER_IDLE_SECS") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "HOTEL_SCOUT_WORKER_IDLE_SECS",
                value,
            })?,
            None => DEFAULT_WORKER_IDLE_SECS,
        };

        Ok(Self {
            telegram_token: required("TELEGRAM_BOT_TOKEN")?,
            rapidapi: RapidApiConfig {
                api_key: required("RAPIDAPI_KEY")?,
                host: optional("RAPIDAPI_HOST", DEFAULT_RAPIDAPI_HOST),
                locale: optional("HOTELS_LOCALE", DEFAULT_LOCALE),
                currency: optional("HOTELS_CURRENCY", DEFAULT_CURRENCY),
            },
            db_path,
            worker_idle_timeout: Duration::from_secs(worker_idle_secs),
        })
    }
}
