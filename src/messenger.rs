//! Outbound chat actions and the Telegram transport

mod telegram;

pub use telegram::{TelegramMessenger, TelegramPoller};

use crate::hotels::HotelRecord;
use thiserror::Error;

/// One outbound action for a chat user
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Text with optional quick-reply choices
    Prompt { text: String, choices: Vec<String> },
    /// One presented hotel: card, location and photos
    ResultPage(HotelRecord),
    /// End-of-scenario text
    Summary(String),
    /// Non-fatal notice about something that went wrong
    Error(String),
}

impl Reply {
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Prompt { .. } => "prompt",
            Reply::ResultPage(_) => "result_page",
            Reply::Summary(_) => "summary",
            Reply::Error(_) => "error",
        }
    }
}

#[derive(Debug, Error)]
pub enum MessengerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Bot API error: {description}")]
    Api { description: String },
}
