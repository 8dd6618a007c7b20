//! HTTP API for the relay
//!
//! Direct generation endpoints behind API key validation, plus the chat
//! webhook ingress.

mod auth;
mod handlers;
mod types;

pub use auth::{ApiKeyValidator, InMemoryKeyStore};
pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::conversation::ConversationController;
use crate::jobs::{JobClient, PollSettings};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub conversations: Arc<ConversationController>,
    pub jobs: JobClient,
    /// `None` when no key store is configured; keyed endpoints then fail
    pub keys: Option<Arc<dyn ApiKeyValidator>>,
    pub api_poll: PollSettings,
}

impl AppState {
    pub fn new(
        conversations: Arc<ConversationController>,
        jobs: JobClient,
        keys: Option<Arc<dyn ApiKeyValidator>>,
        api_poll: PollSettings,
    ) -> Self {
        Self {
            conversations,
            jobs,
            keys,
            api_poll,
        }
    }
}
