//! Conversation controller
//!
//! Routes one inbound chat event through the session state machine: reset
//! commands, free-text capture, menu actions and prompt finalization. No
//! failure here reaches the webhook ingress; everything ends as a chat
//! message or a log line.
//!
//! Events of one conversation are handled strictly in arrival order by a
//! per-conversation worker. Generation is the exception: it runs on its
//! own task so a slow job never holds up the queue.

use crate::gateway::{ChatGateway, InboundEvent};
use crate::jobs::{ImageUnit, JobClient, JobSpec, PollSettings};
use crate::menu::{self, Action, Menu, Reply};
use crate::session::{ConversationKey, InputMode, SessionStore};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, error::SendError, UnboundedReceiver, UnboundedSender};

const GREETING: &str = "Hello! 👋\nI'm an AI image bot. What would you like to create today?";
const CANCELLED: &str = "Cancelled. Your session has been reset.";
const FREE_TEXT_HINT: &str =
    "Use the menu below. Tap \"Send prompt\" first if you want to send a prompt.";
const WORKING: &str = "✨ Working on it, this can take a few minutes…";
const IMAGE_CAPTION: &str = "🔥 Here is your image!";
const UNDELIVERABLE: &str = "One of the images could not be delivered.";
const DONE: &str = "Done! Want to make another one? 😉";

/// What to do once the session lock is released
enum NextStep {
    Reply { text: String, menu: Menu },
    Generate(JobSpec),
}

pub struct ConversationController {
    sessions: Arc<SessionStore>,
    gateway: Arc<dyn ChatGateway>,
    jobs: JobClient,
    poll: PollSettings,
    /// Inbound queue of each conversation's worker
    queues: Mutex<HashMap<ConversationKey, UnboundedSender<InboundEvent>>>,
}

impl ConversationController {
    pub fn new(
        sessions: Arc<SessionStore>,
        gateway: Arc<dyn ChatGateway>,
        jobs: JobClient,
        poll: PollSettings,
    ) -> Self {
        Self {
            sessions,
            gateway,
            jobs,
            poll,
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Queue `event` behind everything already received for its
    /// conversation, starting the conversation's worker if needed.
    pub fn dispatch(self: &Arc<Self>, bot_id: &str, event: InboundEvent) {
        let key = ConversationKey::new(bot_id, event.chat_id());
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);

        let event = match queues.get(&key) {
            Some(queue) => match queue.send(event) {
                Ok(()) => return,
                // The worker is gone; start a fresh one below
                Err(SendError(event)) => event,
            },
            None => event,
        };

        let (queue, inbound) = mpsc::unbounded_channel();
        queues.insert(key.clone(), queue);
        tokio::spawn(Arc::clone(self).drain(key, event, inbound));
    }

    async fn drain(
        self: Arc<Self>,
        key: ConversationKey,
        first: InboundEvent,
        mut inbound: UnboundedReceiver<InboundEvent>,
    ) {
        tracing::debug!(conversation = %key, "Conversation worker started");
        let mut next = Some(first);
        while let Some(event) = next {
            if let Some(spec) = self.step(&key, event).await {
                let this = Arc::clone(&self);
                let key = key.clone();
                tokio::spawn(async move { this.generate(&key, &spec).await });
            }
            next = inbound.recv().await;
        }
    }

    /// Apply one event. Returns the job to run when the event finalized a
    /// prompt.
    async fn step(&self, key: &ConversationKey, event: InboundEvent) -> Option<JobSpec> {
        match event {
            InboundEvent::Message { text, .. } => self.on_text(key, text.trim()).await,
            InboundEvent::Callback {
                callback_id,
                action_token,
                message_id,
                ..
            } => {
                self.on_callback(key, &callback_id, &action_token, message_id)
                    .await;
                None
            }
        }
    }

    async fn on_callback(
        &self,
        key: &ConversationKey,
        callback_id: &str,
        token: &str,
        message_id: i64,
    ) {
        if let Err(e) = self
            .gateway
            .acknowledge_callback(&key.bot_id, callback_id)
            .await
        {
            tracing::warn!(conversation = %key, error = %e, "Callback acknowledgment failed");
        }

        let handle = self.sessions.get_or_create(key).await;
        let replies = {
            let mut session = handle.lock().await;
            match Action::parse(token) {
                Ok(action) => {
                    tracing::debug!(conversation = %key, ?action, "Menu action");
                    menu::apply(&mut session, action)
                }
                Err(e) => {
                    tracing::info!(conversation = %key, token, error = %e, "Rejected menu action");
                    menu::reject(&mut session, &e)
                }
            }
        };

        for reply in replies {
            match reply {
                Reply::Text { text, menu } => self.send(key, &text, menu.as_ref()).await,
                Reply::EditMenu { menu } => {
                    if let Err(e) = self.gateway.edit_menu(key, message_id, &menu).await {
                        tracing::warn!(conversation = %key, message_id, error = %e, "Menu edit failed");
                    }
                }
            }
        }
    }

    async fn on_text(&self, key: &ConversationKey, text: &str) -> Option<JobSpec> {
        if text.is_empty() {
            tracing::debug!(conversation = %key, "Ignoring empty message");
            return None;
        }

        if text.starts_with("/start") {
            self.sessions.reset(key).await;
            self.sessions.get_or_create(key).await;
            self.send(key, GREETING, Some(&menu::main_menu())).await;
            return None;
        }

        let lowered = text.to_lowercase();
        if lowered == "/cancel" || lowered == "cancel" {
            self.sessions.reset(key).await;
            self.send(key, CANCELLED, None).await;
            return None;
        }

        let handle = self.sessions.get_or_create(key).await;
        let next = {
            let mut session = handle.lock().await;
            match session.input_mode {
                InputMode::AwaitingNegativePrompt => {
                    session.negative_prompt = text.to_string();
                    session.input_mode = InputMode::Menu;
                    tracing::info!(conversation = %key, "Negative prompt captured");
                    NextStep::Reply {
                        text: format!("Negative prompt set: {text}"),
                        menu: menu::settings_menu(&session),
                    }
                }
                InputMode::AwaitingPrompt => {
                    session.input_mode = InputMode::Menu;
                    NextStep::Generate(JobSpec::from_session(&session, text))
                }
                InputMode::Menu => NextStep::Reply {
                    text: FREE_TEXT_HINT.to_string(),
                    menu: menu::main_menu(),
                },
            }
        };

        match next {
            NextStep::Reply { text, menu } => {
                self.send(key, &text, Some(&menu)).await;
                None
            }
            NextStep::Generate(spec) => Some(spec),
        }
    }

    /// Submit, wait, and deliver. Neither the session nor the queue is held
    /// here, so the user can keep using the menus while the job runs.
    async fn generate(&self, key: &ConversationKey, spec: &JobSpec) {
        tracing::info!(conversation = %key, model = %spec.model_id, "Prompt finalized");
        self.send(key, WORKING, None).await;

        match self.jobs.run(spec, self.poll).await {
            Ok(units) => {
                self.deliver(key, &units).await;
                self.send(key, DONE, Some(&menu::main_menu())).await;
            }
            Err(e) => {
                tracing::warn!(conversation = %key, error = %e, "Generation failed");
                self.send(
                    key,
                    &format!("😕 Failed to generate image: {e}"),
                    Some(&menu::main_menu()),
                )
                .await;
            }
        }
    }

    /// Each unit is delivered on its own; one bad unit never stops the rest.
    async fn deliver(&self, key: &ConversationKey, units: &[Value]) {
        for (index, unit) in units.iter().enumerate() {
            let image = match ImageUnit::classify(unit) {
                Ok(image) => image,
                Err(e) => {
                    tracing::warn!(conversation = %key, index, error = %e, "Unrecognized image unit");
                    self.send(key, &e.to_string(), None).await;
                    continue;
                }
            };

            let caption = match image {
                ImageUnit::Reference(_) => Some(IMAGE_CAPTION),
                ImageUnit::Inline { .. } => None,
            };
            if let Err(e) = self.gateway.send_image(key, &image, caption).await {
                tracing::warn!(conversation = %key, index, error = %e, "Image delivery failed");
                self.send(key, UNDELIVERABLE, None).await;
            }
        }
    }

    async fn send(&self, key: &ConversationKey, text: &str, menu: Option<&Menu>) {
        if let Err(e) = self.gateway.send_text(key, text, menu).await {
            tracing::warn!(conversation = %key, error = %e, "Message delivery failed");
        }
    }
}
