//! HTTP request handlers

use super::auth::{extract_api_key, AuthError};
use super::types::{
    ErrorResponse, GenerateResponse, HealthResponse, KeyQuery, ResultResponse, StatusResponse,
};
use super::AppState;
use crate::gateway::TelegramUpdate;
use crate::jobs::{JobError, JobSpec};
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/health", get(health))
        // Direct generation, key required
        .route("/generate", post(generate))
        .route("/get_result", get(get_result).post(get_result))
        // Chat webhook ingress, no key
        .route(
            "/telegram/:bot_token",
            get(webhook_liveness).post(telegram_webhook),
        )
        .fallback(not_found)
        .with_state(state)
}

// ============================================================
// Status
// ============================================================

async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "online",
        message: "txt2img relay is running",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

// ============================================================
// Direct generation
// ============================================================

async fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    query_key: Option<&str>,
) -> Result<(), AuthError> {
    let key = extract_api_key(headers, query_key).ok_or(AuthError::Missing)?;
    let keys = state.keys.as_ref().ok_or(AuthError::StoreUnavailable)?;
    keys.validate(&key).await.map_err(|e| {
        tracing::info!(error = %e, "API key rejected");
        e
    })
}

async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<KeyQuery>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    authorize(&state, &headers, query.key.as_deref()).await?;

    let Json(body) =
        body.map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e.body_text())))?;
    let present = |field: &str| {
        body.get(field)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty())
    };
    if !present("prompt") || !present("model_id") {
        return Err(AppError::BadRequest(
            "Fields prompt and model_id are required".to_string(),
        ));
    }

    let spec: JobSpec = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid job parameters: {e}")))?;
    let request_id = state.jobs.submit(&spec).await?;

    Ok(Json(GenerateResponse { request_id }))
}

async fn get_result(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<KeyQuery>,
) -> Result<Json<ResultResponse>, AppError> {
    authorize(&state, &headers, query.key.as_deref()).await?;

    let request_id = query
        .request_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing request_id".to_string()))?;
    let images = state.jobs.poll(&request_id, state.api_poll).await?;

    Ok(Json(ResultResponse { images }))
}

// ============================================================
// Chat webhook
// ============================================================

async fn webhook_liveness() -> &'static str {
    "ok"
}

/// Always acknowledges, so the chat platform never redelivers. The event
/// is queued behind earlier events of the same conversation.
async fn telegram_webhook(
    State(state): State<AppState>,
    Path(bot_token): Path<String>,
    body: Bytes,
) -> Json<Value> {
    match serde_json::from_slice::<TelegramUpdate>(&body) {
        Ok(update) => {
            if let Some(event) = update.into_event() {
                state.conversations.dispatch(&bot_token, event);
            } else {
                tracing::debug!("Ignoring webhook update without a handled event");
            }
        }
        Err(e) => tracing::warn!(error = %e, "Undecodable webhook body"),
    }

    Json(json!({ "ok": true }))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    Auth(AuthError),
    Job(JobError),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::Auth(e)
    }
}

impl From<JobError> for AppError {
    fn from(e: JobError) -> Self {
        AppError::Job(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Auth(e) => {
                let status = match e {
                    AuthError::Missing => StatusCode::UNAUTHORIZED,
                    AuthError::Invalid | AuthError::Revoked => StatusCode::FORBIDDEN,
                    AuthError::LimitExceeded => StatusCode::TOO_MANY_REQUESTS,
                    AuthError::StoreUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            AppError::Job(e) => {
                tracing::warn!(error = %e, "Generation backend call failed");
                let status = if e.is_timeout() {
                    StatusCode::GATEWAY_TIMEOUT
                } else {
                    StatusCode::BAD_GATEWAY
                };
                (status, e.to_string())
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
