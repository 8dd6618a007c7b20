//! Image generation jobs
//!
//! A job is submitted once and then polled at a fixed interval until the
//! backend reports output or the deadline passes.

mod arting;
mod error;
mod output;

pub use arting::ArtingBackend;
pub use error::JobError;
pub use output::ImageUnit;

use crate::session::Session;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Generation parameters sent to the backend.
///
/// Only `prompt` and `model_id` are mandatory; unset fields are left to
/// backend defaults. Fields not modelled here are passed through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub prompt: String,
    pub model_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampler: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_skip: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_nsfw: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lora_ids: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lora_weight: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobSpec {
    /// Snapshot `session` into a job for the user's free text.
    ///
    /// The final prompt is every selected LORA's marker, in selection
    /// order, followed by the text.
    pub fn from_session(session: &Session, text: &str) -> Self {
        let markers = session.loras.prompt_markers();
        let prompt = format!("{markers} {text}").trim().to_string();

        Self {
            prompt,
            model_id: session.effective_model().to_string(),
            samples: Some(session.samples),
            height: Some(session.height),
            width: Some(session.width),
            negative_prompt: Some(session.negative_prompt.clone()),
            seed: Some(session.seed),
            sampler: Some(session.sampler.clone()),
            steps: Some(session.steps),
            guidance: Some(session.guidance),
            clip_skip: Some(session.clip_skip),
            is_nsfw: Some(session.nsfw),
            lora_ids: Some(session.loras.joined_ids()),
            lora_weight: Some(session.loras.joined_weights()),
            extra: Map::new(),
        }
    }
}

/// How long and how often to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub deadline: Duration,
    pub interval: Duration,
}

impl PollSettings {
    /// Direct API callers
    pub const API: Self = Self {
        deadline: Duration::from_secs(180),
        interval: Duration::from_secs(4),
    };

    /// Chat conversations, which tolerate a longer wait
    pub const CHAT: Self = Self {
        deadline: Duration::from_secs(300),
        interval: Duration::from_secs(5),
    };
}

/// The external generation service
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Create a job and return its id
    async fn submit(&self, spec: &JobSpec) -> Result<String, JobError>;

    /// Current output units of a job; empty while it is still running
    async fn query_status(&self, job_id: &str) -> Result<Vec<Value>, JobError>;
}

#[async_trait]
impl<T: GenerationBackend + ?Sized> GenerationBackend for Arc<T> {
    async fn submit(&self, spec: &JobSpec) -> Result<String, JobError> {
        (**self).submit(spec).await
    }

    async fn query_status(&self, job_id: &str) -> Result<Vec<Value>, JobError> {
        (**self).query_status(job_id).await
    }
}

/// Submits jobs and waits for their output
#[derive(Clone)]
pub struct JobClient {
    backend: Arc<dyn GenerationBackend>,
}

impl JobClient {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    pub async fn submit(&self, spec: &JobSpec) -> Result<String, JobError> {
        let job_id = self.backend.submit(spec).await?;
        tracing::info!(job_id = %job_id, model = %spec.model_id, "Job submitted");
        Ok(job_id)
    }

    /// Poll until output appears or `settings.deadline` has elapsed.
    ///
    /// Only "not ready" is retried; a failed query ends polling at once.
    pub async fn poll(&self, job_id: &str, settings: PollSettings) -> Result<Vec<Value>, JobError> {
        let start = Instant::now();
        let mut attempt: u32 = 0;

        while start.elapsed() < settings.deadline {
            attempt += 1;
            let output = self.backend.query_status(job_id).await.map_err(|e| {
                tracing::warn!(job_id = %job_id, attempt, error = %e, "Job status query failed");
                e
            })?;

            if !output.is_empty() {
                tracing::info!(
                    job_id = %job_id,
                    attempt,
                    elapsed_ms = %start.elapsed().as_millis(),
                    units = output.len(),
                    "Job output ready"
                );
                return Ok(output);
            }

            tracing::debug!(job_id = %job_id, attempt, "Job output not ready");
            tokio::time::sleep(settings.interval).await;
        }

        tracing::warn!(job_id = %job_id, attempt, "Job polling timed out");
        Err(JobError::Timeout(settings.deadline))
    }

    /// Submit and wait in one step
    pub async fn run(&self, spec: &JobSpec, settings: PollSettings) -> Result<Vec<Value>, JobError> {
        let job_id = self.submit(spec).await?;
        self.poll(&job_id, settings).await
    }
}
