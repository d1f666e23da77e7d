//! Local text-generation clients.
//!
//! Provides a unified interface over locally hosted inference services.

mod lmstudio;
mod ollama;
mod prompt;
mod resilience;

pub use lmstudio::LmStudioClient;
pub use ollama::OllamaClient;
pub use prompt::{SamplingOptions, build_intent_prompt};
pub use resilience::{LlmResilienceConfig, ResilientGenerator};

use crate::config::ModelConfig;
use crate::{Error, Result};
use std::time::Duration;

/// Trait for text-generation services.
pub trait TextGenerator: Send + Sync {
    /// The provider name.
    fn name(&self) -> &'static str;

    /// Generates a completion for `prompt` with `model` within `timeout`.
    ///
    /// # Errors
    ///
    /// - [`Error::ServiceUnavailable`] if the service is unreachable or
    ///   rejects the request
    /// - [`Error::Timeout`] if no response arrives within `timeout`
    /// - [`Error::MalformedResponse`] if the response envelope is unreadable
    fn generate(&self, prompt: &str, model: &str, timeout: Duration) -> Result<String>;

    /// Checks whether the service answers its health endpoint.
    fn is_available(&self) -> bool;
}

/// HTTP client configuration for inference providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmHttpConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for LlmHttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
        }
    }
}

impl LlmHttpConfig {
    /// Loads HTTP configuration from the model settings.
    #[must_use]
    pub const fn from_config(config: &ModelConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            connect_timeout_ms: config.connect_timeout_ms,
        }
    }

    /// Request timeout as a duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Builds a blocking HTTP client with configured timeouts.
#[must_use]
pub fn build_http_client(config: LlmHttpConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build LLM HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}

/// Maps a transport error to the error taxonomy.
///
/// Logged with the provider and an `error_kind` field; a timeout becomes
/// [`Error::Timeout`], everything else [`Error::ServiceUnavailable`].
pub(crate) fn map_transport_error(
    provider: &'static str,
    operation: &str,
    model: &str,
    timeout: Duration,
    e: &reqwest::Error,
) -> Error {
    let error_kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_request() {
        "request"
    } else {
        "unknown"
    };
    tracing::error!(
        provider = provider,
        model = %model,
        error = %e,
        error_kind = error_kind,
        is_timeout = e.is_timeout(),
        is_connect = e.is_connect(),
        "LLM request failed"
    );

    if e.is_timeout() {
        Error::Timeout {
            operation: operation.to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    } else {
        Error::ServiceUnavailable {
            service: provider.to_string(),
            cause: format!("{error_kind} error: {e}"),
        }
    }
}

/// Maps a non-success HTTP status to [`Error::ServiceUnavailable`].
pub(crate) fn map_status_error(
    provider: &'static str,
    model: &str,
    response: reqwest::blocking::Response,
) -> Error {
    let status = response.status();
    let body = response.text().unwrap_or_default();
    tracing::error!(
        provider = provider,
        model = %model,
        status = %status,
        body = %body,
        "LLM API returned error status"
    );
    Error::ServiceUnavailable {
        service: provider.to_string(),
        cause: format!("API returned status: {status} - {body}"),
    }
}
