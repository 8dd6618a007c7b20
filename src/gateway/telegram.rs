//! Telegram Bot API adapter
//!
//! The bot token doubles as the conversation's bot id, so a single gateway
//! serves every bot whose webhook points at this relay.

use super::{ChatGateway, GatewayError, InboundEvent};
use crate::jobs::ImageUnit;
use crate::menu::Menu;
use crate::session::ConversationKey;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Telegram rejects messages longer than 4096 UTF-16 code units
const MAX_CHUNK_UNITS: usize = 4000;

pub struct TelegramGateway {
    client: Client,
    api_base: String,
}

impl TelegramGateway {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn method_url(&self, bot_id: &str, method: &str) -> String {
        format!("{}/bot{bot_id}/{method}", self.api_base)
    }

    async fn call(&self, bot_id: &str, method: &str, body: &Value) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(self.method_url(bot_id, method))
            .json(body)
            .send()
            .await?;
        check_response(method, response).await
    }

    async fn upload(&self, bot_id: &str, method: &str, form: Form) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(self.method_url(bot_id, method))
            .multipart(form)
            .send()
            .await?;
        check_response(method, response).await
    }
}

#[derive(Debug, Deserialize)]
struct ApiResult {
    ok: bool,
    description: Option<String>,
}

async fn check_response(method: &str, response: reqwest::Response) -> Result<(), GatewayError> {
    let status = response.status();
    let body: ApiResult = response.json().await.map_err(|e| {
        GatewayError::Api(format!("{method}: unreadable response (status {status}): {e}"))
    })?;
    if body.ok {
        Ok(())
    } else {
        Err(GatewayError::Api(format!(
            "{method}: {}",
            body.description.as_deref().unwrap_or("unknown error")
        )))
    }
}

/// `reply_markup` payload for an inline keyboard
fn keyboard(menu: &Menu) -> Value {
    let rows: Vec<Vec<Value>> = menu
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| json!({ "text": b.label, "callback_data": b.action }))
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

/// Split on character boundaries into pieces of at most `max_units`
/// UTF-16 code units, the unit Telegram measures message length in.
fn chunk_text(text: &str, max_units: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut units = 0;
    for c in text.chars() {
        let width = c.len_utf16();
        if units + width > max_units && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            units = 0;
        }
        current.push(c);
        units += width;
    }
    chunks.push(current);
    chunks
}

#[async_trait]
impl ChatGateway for TelegramGateway {
    async fn send_text(
        &self,
        to: &ConversationKey,
        text: &str,
        menu: Option<&Menu>,
    ) -> Result<(), GatewayError> {
        let chunks = chunk_text(text, MAX_CHUNK_UNITS);
        let last = chunks.len() - 1;
        for (i, chunk) in chunks.into_iter().enumerate() {
            let mut body = json!({ "chat_id": to.chat_id, "text": chunk });
            if let (true, Some(menu)) = (i == last, menu) {
                body["reply_markup"] = keyboard(menu);
            }
            self.call(&to.bot_id, "sendMessage", &body).await?;
        }
        Ok(())
    }

    async fn send_image(
        &self,
        to: &ConversationKey,
        image: &ImageUnit,
        caption: Option<&str>,
    ) -> Result<(), GatewayError> {
        match image {
            ImageUnit::Reference(url) => {
                let mut body = json!({ "chat_id": to.chat_id, "photo": url });
                if let Some(caption) = caption {
                    body["caption"] = json!(caption);
                }
                self.call(&to.bot_id, "sendPhoto", &body).await
            }
            ImageUnit::Inline { mime, bytes } => {
                let part = Part::bytes(bytes.clone())
                    .file_name(image.file_name())
                    .mime_str(mime)?;
                let mut form = Form::new()
                    .text("chat_id", to.chat_id.to_string())
                    .part("photo", part);
                if let Some(caption) = caption {
                    form = form.text("caption", caption.to_string());
                }
                self.upload(&to.bot_id, "sendPhoto", form).await
            }
        }
    }

    async fn edit_menu(
        &self,
        to: &ConversationKey,
        message_id: i64,
        menu: &Menu,
    ) -> Result<(), GatewayError> {
        let body = json!({
            "chat_id": to.chat_id,
            "message_id": message_id,
            "reply_markup": keyboard(menu),
        });
        self.call(&to.bot_id, "editMessageReplyMarkup", &body).await
    }

    async fn acknowledge_callback(
        &self,
        bot_id: &str,
        callback_id: &str,
    ) -> Result<(), GatewayError> {
        let body = json!({ "callback_query_id": callback_id });
        self.call(bot_id, "answerCallbackQuery", &body).await
    }
}

// Inbound webhook payload. Only the fields the relay reads are modelled.

#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    #[serde(default)]
    message: Option<TgMessage>,
    #[serde(default)]
    callback_query: Option<TgCallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    message_id: i64,
    chat: TgChat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgCallbackQuery {
    id: String,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    message: Option<TgMessage>,
}

impl TelegramUpdate {
    /// The event this update carries, if it is one the relay handles.
    ///
    /// Callbacks win over messages. A callback without data still yields an
    /// event with an empty token so it gets acknowledged. Messages without
    /// text and callbacks without an originating message are ignored.
    pub fn into_event(self) -> Option<InboundEvent> {
        if let Some(cb) = self.callback_query {
            let message = cb.message?;
            return Some(InboundEvent::Callback {
                chat_id: message.chat.id,
                callback_id: cb.id,
                action_token: cb.data.unwrap_or_default(),
                message_id: message.message_id,
            });
        }

        let message = self.message?;
        Some(InboundEvent::Message {
            chat_id: message.chat.id,
            text: message.text?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::main_menu;

    fn decode(value: Value) -> Option<InboundEvent> {
        serde_json::from_value::<TelegramUpdate>(value)
            .unwrap()
            .into_event()
    }

    #[test]
    fn test_message_update() {
        let event = decode(json!({
            "update_id": 1,
            "message": { "message_id": 7, "chat": { "id": 42, "type": "private" }, "text": "/start" }
        }));
        assert_eq!(
            event,
            Some(InboundEvent::Message {
                chat_id: 42,
                text: "/start".to_string()
            })
        );
    }

    #[test]
    fn test_callback_update() {
        let event = decode(json!({
            "update_id": 2,
            "callback_query": {
                "id": "cb-9",
                "data": "settings",
                "message": { "message_id": 11, "chat": { "id": 42 } }
            }
        }));
        assert_eq!(
            event,
            Some(InboundEvent::Callback {
                chat_id: 42,
                callback_id: "cb-9".to_string(),
                action_token: "settings".to_string(),
                message_id: 11,
            })
        );
    }

    #[test]
    fn test_callback_without_data_keeps_empty_token() {
        let event = decode(json!({
            "callback_query": { "id": "cb-3", "message": { "message_id": 5, "chat": { "id": 9 } } }
        }));
        assert_eq!(
            event,
            Some(InboundEvent::Callback {
                chat_id: 9,
                callback_id: "cb-3".to_string(),
                action_token: String::new(),
                message_id: 5,
            })
        );
    }

    #[test]
    fn test_ignored_updates() {
        // Sticker without text
        assert_eq!(
            decode(json!({ "message": { "message_id": 1, "chat": { "id": 1 } } })),
            None
        );
        // Callback whose originating message is gone
        assert_eq!(decode(json!({ "callback_query": { "id": "x", "data": "noop" } })), None);
        assert_eq!(decode(json!({ "update_id": 3 })), None);
    }

    #[test]
    fn test_chunking() {
        assert_eq!(chunk_text("", 4), vec![String::new()]);
        assert_eq!(chunk_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        // Multibyte characters are never split
        let chunks = chunk_text("ééééé", 2);
        assert_eq!(chunks, vec!["éé", "éé", "é"]);
    }

    #[test]
    fn test_chunking_counts_utf16_units() {
        // Astral-plane emoji take two UTF-16 units each
        let chunks = chunk_text("😀😀😀😀😀", 4);
        assert_eq!(chunks, vec!["😀😀", "😀😀", "😀"]);

        let long = "😀".repeat(MAX_CHUNK_UNITS);
        let chunks = chunk_text(&long, MAX_CHUNK_UNITS);
        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            assert!(chunk.encode_utf16().count() <= MAX_CHUNK_UNITS);
        }
        assert_eq!(chunks.concat(), long);
    }

    #[test]
    fn test_keyboard_shape() {
        let value = keyboard(&main_menu());
        let rows = value["inline_keyboard"].as_array().unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0][0]["text"], "Choose model");
        assert!(rows[0][0]["callback_data"].is_string());
    }

    #[test]
    fn test_method_url() {
        let gw = TelegramGateway::new("https://api.telegram.org/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            gw.method_url("123:abc", "sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }
}
