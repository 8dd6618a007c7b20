//! Generation job error types

use std::time::Duration;
use thiserror::Error;

/// Failures talking to the generation backend. None of these are retried.
#[derive(Debug, Error)]
pub enum JobError {
    /// The create call failed at transport or application level
    #[error("Failed to submit job: {0}")]
    Submission(String),
    /// One status query failed; polling stops immediately
    #[error("Failed to get job result: {0}")]
    Query(String),
    /// Output never appeared within the deadline
    #[error("Timed out after {}s, image not ready yet. Please try again.", .0.as_secs())]
    Timeout(Duration),
}

impl JobError {
    pub fn submission(message: impl Into<String>) -> Self {
        Self::Submission(message.into())
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
