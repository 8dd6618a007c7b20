//! Mock collaborators for testing
//!
//! These mocks let the conversation and API layers run without real I/O.

use crate::gateway::{ChatGateway, GatewayError};
use crate::jobs::{GenerationBackend, ImageUnit, JobError, JobSpec};
use crate::menu::Menu;
use crate::session::ConversationKey;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock generation backend
// ============================================================================

/// Backend that returns queued status results.
///
/// An empty status queue answers "not ready yet".
#[allow(dead_code)]
pub struct MockBackend {
    statuses: Mutex<VecDeque<Result<Vec<Value>, JobError>>>,
    submit_failure: Mutex<Option<String>>,
    queries: AtomicUsize,
    /// Record of all submitted jobs
    pub submitted: Mutex<Vec<JobSpec>>,
}

#[allow(dead_code)]
impl MockBackend {
    pub fn new() -> Self {
        Self {
            statuses: Mutex::new(VecDeque::new()),
            submit_failure: Mutex::new(None),
            queries: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Queue the result of the next status query
    pub fn queue_status(&self, status: Result<Vec<Value>, JobError>) {
        self.statuses.lock().unwrap().push_back(status);
    }

    /// Make every following submission fail with `message`
    pub fn fail_submissions(&self, message: impl Into<String>) {
        *self.submit_failure.lock().unwrap() = Some(message.into());
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn recorded_submissions(&self) -> Vec<JobSpec> {
        self.submitted.lock().unwrap().clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn submit(&self, spec: &JobSpec) -> Result<String, JobError> {
        if let Some(message) = self.submit_failure.lock().unwrap().clone() {
            return Err(JobError::Submission(message));
        }
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(spec.clone());
        Ok(format!("job-{}", submitted.len()))
    }

    async fn query_status(&self, _job_id: &str) -> Result<Vec<Value>, JobError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

// ============================================================================
// Mock chat gateway
// ============================================================================

/// One outbound call, as recorded by [`MockGateway`]
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text {
        chat_id: i64,
        text: String,
        menu: Option<Menu>,
    },
    Image {
        chat_id: i64,
        image: ImageUnit,
        caption: Option<String>,
    },
    EditMenu {
        chat_id: i64,
        message_id: i64,
        menu: Menu,
    },
    Ack {
        callback_id: String,
    },
}

/// Gateway that records everything sent through it
#[allow(dead_code)]
pub struct MockGateway {
    sent: Mutex<Vec<Outbound>>,
    fail_images: Mutex<bool>,
    ack_delay: Mutex<Duration>,
}

#[allow(dead_code)]
impl MockGateway {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_images: Mutex::new(false),
            ack_delay: Mutex::new(Duration::ZERO),
        }
    }

    /// Hold every following callback acknowledgment for `delay`
    pub fn delay_acks(&self, delay: Duration) {
        *self.ack_delay.lock().unwrap() = delay;
    }

    /// Make every following image delivery fail
    pub fn fail_images(&self) {
        *self.fail_images.lock().unwrap() = true;
    }

    pub fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().unwrap().clone()
    }

    /// Text of every sent message, in order
    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// The most recent message that carried a menu
    pub fn last_menu(&self) -> Option<Menu> {
        self.sent().into_iter().rev().find_map(|o| match o {
            Outbound::Text { menu: Some(m), .. } | Outbound::EditMenu { menu: m, .. } => Some(m),
            _ => None,
        })
    }

    pub fn images(&self) -> Vec<ImageUnit> {
        self.sent()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Image { image, .. } => Some(image),
                _ => None,
            })
            .collect()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatGateway for MockGateway {
    async fn send_text(
        &self,
        to: &ConversationKey,
        text: &str,
        menu: Option<&Menu>,
    ) -> Result<(), GatewayError> {
        self.sent.lock().unwrap().push(Outbound::Text {
            chat_id: to.chat_id,
            text: text.to_string(),
            menu: menu.cloned(),
        });
        Ok(())
    }

    async fn send_image(
        &self,
        to: &ConversationKey,
        image: &ImageUnit,
        caption: Option<&str>,
    ) -> Result<(), GatewayError> {
        if *self.fail_images.lock().unwrap() {
            return Err(GatewayError::Api("sendPhoto: wrong file identifier".to_string()));
        }
        self.sent.lock().unwrap().push(Outbound::Image {
            chat_id: to.chat_id,
            image: image.clone(),
            caption: caption.map(str::to_string),
        });
        Ok(())
    }

    async fn edit_menu(
        &self,
        to: &ConversationKey,
        message_id: i64,
        menu: &Menu,
    ) -> Result<(), GatewayError> {
        self.sent.lock().unwrap().push(Outbound::EditMenu {
            chat_id: to.chat_id,
            message_id,
            menu: menu.clone(),
        });
        Ok(())
    }

    async fn acknowledge_callback(
        &self,
        _bot_id: &str,
        callback_id: &str,
    ) -> Result<(), GatewayError> {
        let delay = *self.ack_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.sent.lock().unwrap().push(Outbound::Ack {
            callback_id: callback_id.to_string(),
        });
        Ok(())
    }
}
