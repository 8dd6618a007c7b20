//! txt2img relay
//!
//! HTTP relay between API callers or chat bots and a text-to-image
//! generation backend. Chat users configure generation through inline
//! menus before sending a prompt.

mod api;
mod config;
mod conversation;
mod gateway;
mod jobs;
mod menu;
mod session;

#[cfg(test)]
mod testing;

use api::{create_router, ApiKeyValidator, AppState, InMemoryKeyStore};
use axum::http::{header, HeaderName, Method};
use config::RelayConfig;
use conversation::ConversationController;
use gateway::TelegramGateway;
use jobs::{ArtingBackend, JobClient};
use session::SessionStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "txt2img_relay=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = RelayConfig::from_env();

    // Generation backend
    let token = config.arting_token.clone().unwrap_or_else(|| {
        tracing::warn!("ARTING_TOKEN is not set; generation requests will be rejected upstream");
        String::new()
    });
    let backend = ArtingBackend::new(&config.arting_base_url, token, config.http_timeout)?;
    let jobs = JobClient::new(Arc::new(backend));

    // API keys
    let keys: Option<Arc<dyn ApiKeyValidator>> = if let Some(path) = &config.api_keys_file {
        Some(Arc::new(InMemoryKeyStore::load(path)?))
    } else {
        tracing::warn!("RELAY_API_KEYS_FILE is not set; keyed endpoints will fail");
        None
    };

    // Chat conversations
    let gateway = TelegramGateway::new(&config.telegram_api_base, config.http_timeout)?;
    let conversations = Arc::new(ConversationController::new(
        Arc::new(SessionStore::new()),
        Arc::new(gateway),
        jobs.clone(),
        config.chat_poll,
    ));

    let state = AppState::new(conversations, jobs, keys, config.api_poll);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
        ]);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("txt2img relay listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
