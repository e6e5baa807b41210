use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::chat_stream::CompletionParams;
use crate::core::constants::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
    DEFAULT_OPENAI_BASE_URL, DEFAULT_TEMPERATURE, MAX_TEMPERATURE,
};

/// On-disk settings. Every key is optional; unset keys fall back to the
/// built-in defaults.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// OpenAI-compatible API root, e.g. `https://api.openai.com/v1`
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    /// Ceiling on generated tokens per reply
    pub max_tokens: Option<u32>,
    /// Seconds to wait for the next fragment; 0 waits forever
    pub idle_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
}

impl Config {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_OPENAI_BASE_URL)
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .filter(|model| !model.trim().is_empty())
            .unwrap_or(DEFAULT_MODEL)
    }

    /// Clamped to the range the API accepts; NaN falls back to the default.
    pub fn temperature(&self) -> f32 {
        match self.temperature {
            Some(value) if value.is_finite() => value.clamp(0.0, MAX_TEMPERATURE),
            _ => DEFAULT_TEMPERATURE,
        }
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
            .filter(|&tokens| tokens > 0)
            .unwrap_or(DEFAULT_MAX_TOKENS)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.idle_timeout_secs.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    pub fn completion_params(&self) -> CompletionParams {
        CompletionParams {
            model: self.model().to_string(),
            temperature: self.temperature(),
            max_tokens: self.max_tokens(),
            idle_timeout: self.idle_timeout(),
        }
    }

    /// HTTP client with the configured connect timeout. No overall request
    /// timeout: long replies are bounded by the idle timeout instead.
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout())
            .build()
    }

    /// Apply `OPENAI_BASE_URL` when set and non-empty.
    pub fn apply_env_overrides(&mut self) {
        self.apply_base_url_override(std::env::var("OPENAI_BASE_URL").ok());
    }

    pub(crate) fn apply_base_url_override(&mut self, base_url: Option<String>) {
        if let Some(url) = base_url.filter(|url| !url.trim().is_empty()) {
            self.base_url = Some(url);
        }
    }
}
