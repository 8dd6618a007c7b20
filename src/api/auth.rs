//! API key validation for the direct generation endpoints
//!
//! Keys are looked up in a record store loaded once at startup. Usage is
//! counted in memory only.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Missing API key")]
    Missing,
    #[error("Invalid API key")]
    Invalid,
    #[error("API key revoked")]
    Revoked,
    #[error("API limit exceeded")]
    LimitExceeded,
    #[error("API key store not configured")]
    StoreUnavailable,
}

/// Stored state of one API key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    #[serde(default)]
    pub revoked: bool,
    #[serde(default)]
    pub usage: u64,
    /// No limit when absent
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait ApiKeyValidator: Send + Sync {
    /// Check `key` and count one use of it on success.
    async fn validate(&self, key: &str) -> Result<(), AuthError>;
}

#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("failed to read key file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse key file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Key records keyed by the key itself
#[derive(Debug, Default)]
pub struct InMemoryKeyStore {
    records: Mutex<HashMap<String, KeyRecord>>,
}

impl InMemoryKeyStore {
    pub fn new(records: HashMap<String, KeyRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    /// Load a JSON object mapping keys to records.
    pub fn load(path: &Path) -> Result<Self, KeyStoreError> {
        let raw = std::fs::read_to_string(path)?;
        let records: HashMap<String, KeyRecord> = serde_json::from_str(&raw)?;
        tracing::info!(path = %path.display(), keys = records.len(), "Loaded API keys");
        Ok(Self::new(records))
    }

    #[cfg(test)]
    pub fn record(&self, key: &str) -> Option<KeyRecord> {
        self.records.lock().ok()?.get(key).cloned()
    }
}

#[async_trait]
impl ApiKeyValidator for InMemoryKeyStore {
    async fn validate(&self, key: &str) -> Result<(), AuthError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| AuthError::StoreUnavailable)?;
        let record = records.get_mut(key).ok_or(AuthError::Invalid)?;

        if record.revoked {
            return Err(AuthError::Revoked);
        }
        if record.limit.is_some_and(|limit| record.usage >= limit) {
            return Err(AuthError::LimitExceeded);
        }

        record.usage += 1;
        record.last_used = Some(Utc::now());
        Ok(())
    }
}

/// The caller's key: a bearer token, then `x-api-key`, then `?key=`.
pub fn extract_api_key(headers: &HeaderMap, query_key: Option<&str>) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    let key = match bearer {
        Some(key) => Some(key),
        None => headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .or(query_key),
    };

    key.filter(|k| !k.is_empty()).map(str::to_string)
}
