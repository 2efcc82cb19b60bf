//! Telegram Bot API transport
//!
//! Outbound replies go through `sendMessage`, `sendLocation` and `sendPhoto`;
//! inbound text is long-polled with `getUpdates`.

use super::{MessengerError, Reply};
use crate::runtime::Messenger;
use crate::state_machine::UserId;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const API_BASE: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(30);
const LONG_POLL_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<IncomingMessage>,
}

/// Sessions are keyed by sender, replies go to the sender's private chat
#[derive(Debug, Deserialize)]
struct IncomingMessage {
    from: Option<Sender>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Sender {
    id: i64,
}

/// Shared Bot API call plumbing
#[derive(Clone)]
struct BotApi {
    client: Client,
    base_url: String,
}

impl BotApi {
    fn new(token: &str, timeout: Duration) -> Result<Self, MessengerError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: format!("{API_BASE}/bot{token}"),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
    ) -> Result<T, MessengerError> {
        let response: ApiResponse<T> = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .json(body)
            .send()
            .await?
            .json()
            .await?;

        match response {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(MessengerError::Api {
                description: description.unwrap_or_else(|| format!("{method} failed")),
            }),
        }
    }
}

fn reply_markup(choices: &[String]) -> Value {
    if choices.is_empty() {
        return json!({ "remove_keyboard": true });
    }
    let rows: Vec<Value> = choices.iter().map(|c| json!([{ "text": c }])).collect();
    json!({
        "keyboard": rows,
        "resize_keyboard": true,
        "one_time_keyboard": true,
    })
}

// ============================================================================
// Outbound
// ============================================================================

/// Messenger that delivers replies to Telegram chats
#[derive(Clone)]
pub struct TelegramMessenger {
    api: BotApi,
}

impl TelegramMessenger {
    pub fn new(token: &str) -> Result<Self, MessengerError> {
        Ok(Self {
            api: BotApi::new(token, SEND_TIMEOUT)?,
        })
    }

    async fn send_text(
        &self,
        chat_id: UserId,
        text: &str,
        choices: &[String],
    ) -> Result<(), MessengerError> {
        let body = json!({
            "chat_id": chat_id.0,
            "text": text,
            "reply_markup": reply_markup(choices),
        });
        self.api.call::<Value>("sendMessage", &body).await?;
        Ok(())
    }

    async fn send_result_page(
        &self,
        chat_id: UserId,
        hotel: &crate::hotels::HotelRecord,
    ) -> Result<(), MessengerError> {
        self.send_text(chat_id, &hotel.card(), &[]).await?;

        if let Some(point) = hotel.coordinates {
            let body = json!({
                "chat_id": chat_id.0,
                "latitude": point.lat,
                "longitude": point.lon,
            });
            self.api.call::<Value>("sendLocation", &body).await?;
        }

        for url in &hotel.photos {
            let body = json!({
                "chat_id": chat_id.0,
                "photo": url,
                "caption": hotel.name,
            });
            self.api.call::<Value>("sendPhoto", &body).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn deliver(&self, user_id: UserId, reply: &Reply) -> Result<(), MessengerError> {
        match reply {
            Reply::Prompt { text, choices } => self.send_text(user_id, text, choices).await,
            Reply::ResultPage(hotel) => self.send_result_page(user_id, hotel).await,
            Reply::Summary(text) => self.send_text(user_id, text, &["/start".to_string()]).await,
            Reply::Error(text) => self.send_text(user_id, text, &[]).await,
        }
    }
}

// ============================================================================
// Inbound
// ============================================================================

/// Long-polling source of inbound chat text
pub struct TelegramPoller {
    api: BotApi,
    offset: i64,
}

impl TelegramPoller {
    pub fn new(token: &str) -> Result<Self, MessengerError> {
        Ok(Self {
            api: BotApi::new(token, Duration::from_secs(LONG_POLL_SECS + 10))?,
            offset: 0,
        })
    }

    /// Wait for the next batch of text messages, acknowledging everything seen
    pub async fn poll(&mut self) -> Result<Vec<(UserId, String)>, MessengerError> {
        let body = json!({
            "offset": self.offset,
            "timeout": LONG_POLL_SECS,
            "allowed_updates": ["message"],
        });
        let updates: Vec<Update> = self.api.call("getUpdates", &body).await?;
        Ok(self.accept(updates))
    }

    fn accept(&mut self, updates: Vec<Update>) -> Vec<(UserId, String)> {
        let mut messages = Vec::with_capacity(updates.len());
        for update in updates {
            self.offset = self.offset.max(update.update_id + 1);
            if let Some(IncomingMessage { from: Some(sender), text: Some(text) }) = update.message {
                messages.push((UserId(sender.id), text));
            }
        }
        messages
    }
}
