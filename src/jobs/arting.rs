//! Arting text-to-image backend

use super::{GenerationBackend, JobError, JobSpec};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const SUCCESS_CODE: i64 = 100_000;
const CREATE_PATH: &str = "/api/cg/text-to-image/create";
const GET_PATH: &str = "/api/cg/text-to-image/get";

/// Envelope shared by both endpoints
#[derive(Debug, Deserialize)]
struct ArtingResponse {
    code: Option<i64>,
    message: Option<String>,
    data: Option<ArtingData>,
}

#[derive(Debug, Deserialize)]
struct ArtingData {
    request_id: Option<String>,
    output: Option<Vec<Value>>,
}

pub struct ArtingBackend {
    client: Client,
    base_url: String,
    token: String,
}

impl ArtingBackend {
    pub fn new(base_url: &str, token: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<ArtingResponse, String> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .header(reqwest::header::AUTHORIZATION, &self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("status {}: {text}", status.as_u16()));
        }

        response
            .json::<ArtingResponse>()
            .await
            .map_err(|e| format!("malformed response: {e}"))
    }
}

#[async_trait]
impl GenerationBackend for ArtingBackend {
    async fn submit(&self, spec: &JobSpec) -> Result<String, JobError> {
        let body = serde_json::to_value(spec).map_err(|e| JobError::submission(e.to_string()))?;
        let resp = self
            .post(CREATE_PATH, &body)
            .await
            .map_err(JobError::Submission)?;

        match (resp.code, resp.data.and_then(|d| d.request_id)) {
            (Some(SUCCESS_CODE), Some(request_id)) => Ok(request_id),
            _ => Err(JobError::submission(format!(
                "API error: {}",
                resp.message.as_deref().unwrap_or("Unknown error")
            ))),
        }
    }

    async fn query_status(&self, job_id: &str) -> Result<Vec<Value>, JobError> {
        let resp = self
            .post(GET_PATH, &json!({ "request_id": job_id }))
            .await
            .map_err(JobError::Query)?;

        if let Some(code) = resp.code.filter(|c| *c != SUCCESS_CODE) {
            return Err(JobError::query(format!(
                "API error {code}: {}",
                resp.message.as_deref().unwrap_or("Unknown error")
            )));
        }

        Ok(resp.data.and_then(|d| d.output).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_decoding() {
        let created: ArtingResponse = serde_json::from_value(json!({
            "code": 100_000,
            "message": "success",
            "data": { "request_id": "req-1" }
        }))
        .unwrap();
        assert_eq!(created.code, Some(SUCCESS_CODE));
        assert_eq!(
            created.data.and_then(|d| d.request_id).as_deref(),
            Some("req-1")
        );

        let pending: ArtingResponse =
            serde_json::from_value(json!({ "code": 100_000, "data": { "output": null } })).unwrap();
        assert!(pending.data.and_then(|d| d.output).is_none());

        let bare: ArtingResponse = serde_json::from_value(json!({})).unwrap();
        assert!(bare.code.is_none() && bare.data.is_none());
    }

    #[test]
    fn test_base_url_normalized() {
        let backend =
            ArtingBackend::new("https://api.arting.ai/", String::new(), Duration::from_secs(5))
                .unwrap();
        assert_eq!(backend.base_url, "https://api.arting.ai");
    }
}
