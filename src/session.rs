//! Per-conversation generation settings
//!
//! A [`Session`] is created lazily on first contact and lives until an
//! explicit reset or process exit. Nothing here is persisted.

mod lora;

pub use lora::{LoraError, LoraSelection, LoraToggle, MAX_LORAS};

use crate::menu::catalog;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Identity of one conversation: the bot it arrived on plus the chat id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub bot_id: String,
    pub chat_id: i64,
}

impl ConversationKey {
    pub fn new(bot_id: impl Into<String>, chat_id: i64) -> Self {
        Self {
            bot_id: bot_id.into(),
            chat_id,
        }
    }
}

/// Never prints the full bot token.
impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tail: String = self
            .bot_id
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        write!(f, "bot…{tail}/chat {}", self.chat_id)
    }
}

/// Which free text the conversation is waiting for, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Free text is not captured; the menus drive the conversation
    #[default]
    Menu,
    /// Next text message is the generation prompt
    AwaitingPrompt,
    /// Next text message replaces the negative prompt
    AwaitingNegativePrompt,
}

/// Mutable generation settings for one conversation
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub model_id: Option<String>,
    pub loras: LoraSelection,
    /// Short callback token -> LORA id, refreshed whenever LORA buttons are rendered
    pub lora_shortcodes: HashMap<String, String>,
    pub nsfw: bool,
    pub height: u32,
    pub width: u32,
    pub samples: u32,
    pub negative_prompt: String,
    /// -1 lets the backend pick
    pub seed: i64,
    pub sampler: String,
    pub steps: u32,
    pub guidance: f64,
    pub clip_skip: u32,
    pub input_mode: InputMode,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            model_id: None,
            loras: LoraSelection::default(),
            lora_shortcodes: HashMap::new(),
            nsfw: true,
            height: 768,
            width: 768,
            samples: 3,
            negative_prompt: String::new(),
            seed: -1,
            sampler: catalog::SAMPLERS[0].to_string(),
            steps: 50,
            guidance: 7.0,
            clip_skip: 2,
            input_mode: InputMode::Menu,
        }
    }
}

impl Session {
    #[cfg(test)]
    pub fn awaiting_prompt(&self) -> bool {
        self.input_mode == InputMode::AwaitingPrompt
    }

    #[cfg(test)]
    pub fn awaiting_negative_prompt(&self) -> bool {
        self.input_mode == InputMode::AwaitingNegativePrompt
    }

    /// Model used for submission: the selection, or the first catalog entry.
    pub fn effective_model(&self) -> &str {
        self.model_id.as_deref().unwrap_or(catalog::MODELS[0])
    }
}

/// Shared handle to one session. Holding the lock serializes event
/// handling for that conversation.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Process-wide map of conversations to their sessions.
///
/// Per-key operations are atomic under the map lock, so conversations
/// never observe each other. Within one conversation, callers lock the
/// returned handle for the duration of a state transition.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<ConversationKey, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the session for `key`, creating a defaulted one on first use.
    pub async fn get_or_create(&self, key: &ConversationKey) -> SessionHandle {
        if let Some(handle) = self.sessions.read().await.get(key) {
            return Arc::clone(handle);
        }

        let mut sessions = self.sessions.write().await;
        // Another task may have inserted between the two locks
        Arc::clone(sessions.entry(key.clone()).or_insert_with(|| {
            tracing::debug!(conversation = %key, "Creating session");
            Arc::new(Mutex::new(Session::default()))
        }))
    }

    /// Drop the session for `key`. Idempotent.
    ///
    /// Tasks still holding the old handle keep mutating a detached record;
    /// the next `get_or_create` starts from defaults.
    pub async fn reset(&self, key: &ConversationKey) {
        if self.sessions.write().await.remove(key).is_some() {
            tracing::info!(conversation = %key, "Session reset");
        }
    }

    #[cfg(test)]
    pub async fn contains(&self, key: &ConversationKey) -> bool {
        self.sessions.read().await.contains_key(key)
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
