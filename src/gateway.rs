//! Chat gateway: inbound events and outbound delivery
//!
//! The conversation core only sees [`InboundEvent`] and the narrow
//! [`ChatGateway`] send interface; the Telegram adapter lives below.

mod telegram;

pub use telegram::{TelegramGateway, TelegramUpdate};

use crate::jobs::ImageUnit;
use crate::menu::Menu;
use crate::session::ConversationKey;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// One decoded inbound event for a conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Message {
        chat_id: i64,
        text: String,
    },
    Callback {
        chat_id: i64,
        callback_id: String,
        action_token: String,
        message_id: i64,
    },
}

impl InboundEvent {
    pub fn chat_id(&self) -> i64 {
        match self {
            InboundEvent::Message { chat_id, .. } | InboundEvent::Callback { chat_id, .. } => {
                *chat_id
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("gateway rejected request: {0}")]
    Api(String),
}

/// Outbound operations the conversation needs
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send_text(
        &self,
        to: &ConversationKey,
        text: &str,
        menu: Option<&Menu>,
    ) -> Result<(), GatewayError>;

    async fn send_image(
        &self,
        to: &ConversationKey,
        image: &ImageUnit,
        caption: Option<&str>,
    ) -> Result<(), GatewayError>;

    /// Replace the menu attached to an earlier message
    async fn edit_menu(
        &self,
        to: &ConversationKey,
        message_id: i64,
        menu: &Menu,
    ) -> Result<(), GatewayError>;

    async fn acknowledge_callback(
        &self,
        bot_id: &str,
        callback_id: &str,
    ) -> Result<(), GatewayError>;
}

#[async_trait]
impl<T: ChatGateway + ?Sized> ChatGateway for Arc<T> {
    async fn send_text(
        &self,
        to: &ConversationKey,
        text: &str,
        menu: Option<&Menu>,
    ) -> Result<(), GatewayError> {
        (**self).send_text(to, text, menu).await
    }

    async fn send_image(
        &self,
        to: &ConversationKey,
        image: &ImageUnit,
        caption: Option<&str>,
    ) -> Result<(), GatewayError> {
        (**self).send_image(to, image, caption).await
    }

    async fn edit_menu(
        &self,
        to: &ConversationKey,
        message_id: i64,
        menu: &Menu,
    ) -> Result<(), GatewayError> {
        (**self).edit_menu(to, message_id, menu).await
    }

    async fn acknowledge_callback(
        &self,
        bot_id: &str,
        callback_id: &str,
    ) -> Result<(), GatewayError> {
        (**self).acknowledge_callback(bot_id, callback_id).await
    }
}
