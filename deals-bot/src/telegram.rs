use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use deals_core::{DeliveryError, Messenger};

const LONG_POLL_SECS: u64 = 30;

/// Thin Bot API client: long-poll inbound events, push outbound text.
pub struct TelegramApi {
    http: Client,
    base: String,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub inline_query: Option<InlineQuery>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct InlineQuery {
    pub id: String,
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub data: Option<String>,
    pub message: Option<Message>,
}

impl TelegramApi {
    pub fn new(http: Client, token: &str) -> Self {
        Self::with_base(http, format!("https://api.telegram.org/bot{token}"))
    }

    /// Base-URL injection point so tests can run against a mock server.
    pub fn with_base(http: Client, base: String) -> Self {
        Self { http, base }
    }

    async fn call(&self, method: &str, payload: Value, timeout: Duration) -> Result<Value> {
        let response = self
            .http
            .post(format!("{}/{method}", self.base))
            .json(&payload)
            .timeout(timeout)
            .send()
            .await?;
        let mut body: Value = response.json().await?;
        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            bail!(
                "{method} failed: {}",
                body.get("description")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
            );
        }
        Ok(body
            .get_mut("result")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let result = self
            .call(
                "getUpdates",
                json!({ "timeout": LONG_POLL_SECS, "offset": offset }),
                Duration::from_secs(LONG_POLL_SECS + 10),
            )
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    pub async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.call(
            "sendMessage",
            json!({ "chat_id": chat_id, "text": text }),
            Duration::from_secs(15),
        )
        .await
        .map(|_| ())
    }

    pub async fn send_text_with_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Value,
    ) -> Result<()> {
        self.call(
            "sendMessage",
            json!({
                "chat_id": chat_id,
                "text": text,
                "reply_markup": { "inline_keyboard": keyboard }
            }),
            Duration::from_secs(15),
        )
        .await
        .map(|_| ())
    }

    pub async fn answer_callback_query(&self, callback_id: &str) -> Result<()> {
        self.call(
            "answerCallbackQuery",
            json!({ "callback_query_id": callback_id }),
            Duration::from_secs(15),
        )
        .await
        .map(|_| ())
    }

    pub async fn edit_message_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()> {
        self.call(
            "editMessageText",
            json!({ "chat_id": chat_id, "message_id": message_id, "text": text }),
            Duration::from_secs(15),
        )
        .await
        .map(|_| ())
    }

    pub async fn answer_inline_query(&self, query_id: &str, results: Value) -> Result<()> {
        self.call(
            "answerInlineQuery",
            json!({ "inline_query_id": query_id, "results": results, "cache_time": 30 }),
            Duration::from_secs(15),
        )
        .await
        .map(|_| ())
    }
}

#[async_trait]
impl Messenger for TelegramApi {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError> {
        let payload = json!({ "chat_id": chat_id, "text": text });
        let response = self
            .http
            .post(format!("{}/sendMessage", self.base))
            .json(&payload)
            .timeout(Duration::from_secs(15))
            .send()
            .await?;
        let body: Value = response.json().await?;
        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            let description = body
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(DeliveryError::Rejected(description));
        }
        Ok(())
    }
}
