//! Process configuration read from the environment

use crate::jobs::PollSettings;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8787;
const DEFAULT_ARTING_BASE_URL: &str = "https://api.arting.ai";
const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub port: u16,
    /// Credential for the generation backend
    pub arting_token: Option<String>,
    pub arting_base_url: String,
    pub telegram_api_base: String,
    /// JSON file of API key records; direct API calls fail without it
    pub api_keys_file: Option<PathBuf>,
    pub api_poll: PollSettings,
    pub chat_poll: PollSettings,
    pub http_timeout: Duration,
}

impl RelayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let secs = |name: &str, default: Duration| {
            var(name)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map_or(default, Duration::from_secs)
        };

        Self {
            port: var("RELAY_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            arting_token: var("ARTING_TOKEN").filter(|t| !t.is_empty()),
            arting_base_url: var("ARTING_BASE_URL")
                .unwrap_or_else(|| DEFAULT_ARTING_BASE_URL.to_string()),
            telegram_api_base: var("TELEGRAM_API_BASE")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_string()),
            api_keys_file: var("RELAY_API_KEYS_FILE").map(PathBuf::from),
            api_poll: PollSettings {
                deadline: secs("RELAY_API_POLL_TIMEOUT_SECS", PollSettings::API.deadline),
                interval: secs("RELAY_API_POLL_INTERVAL_SECS", PollSettings::API.interval),
            },
            chat_poll: PollSettings {
                deadline: secs("RELAY_CHAT_POLL_TIMEOUT_SECS", PollSettings::CHAT.deadline),
                interval: secs("RELAY_CHAT_POLL_INTERVAL_SECS", PollSettings::CHAT.interval),
            },
            http_timeout: secs(
                "RELAY_HTTP_TIMEOUT_SECS",
                Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
        }
    }
}
