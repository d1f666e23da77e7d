//! Ollama (local) client.

use super::{
    LlmHttpConfig, SamplingOptions, TextGenerator, build_http_client, map_status_error,
    map_transport_error,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ollama local inference client.
pub struct OllamaClient {
    /// API endpoint.
    endpoint: String,
    /// Sampling options sent with every request.
    options: SamplingOptions,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl OllamaClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "http://localhost:11434";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "llama3.2:3b";

    /// Creates a client for the default endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self {
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            options: SamplingOptions::default(),
            client: build_http_client(LlmHttpConfig::default()),
        }
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the sampling options.
    #[must_use]
    pub const fn with_options(mut self, options: SamplingOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets HTTP client timeouts.
    #[must_use]
    pub fn with_http_config(mut self, config: LlmHttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// The configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Lists the models installed on the server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceUnavailable`] if the server cannot be reached.
    pub fn list_models(&self) -> Result<Vec<String>> {
        let timeout = Duration::from_secs(5);
        let response = self
            .client
            .get(format!("{}/api/tags", self.endpoint))
            .timeout(timeout)
            .send()
            .map_err(|e| map_transport_error("ollama", "ollama_tags", "", timeout, &e))?;
        if !response.status().is_success() {
            return Err(map_status_error("ollama", "", response));
        }
        let tags: TagsResponse = response.json().map_err(|e| Error::MalformedResponse {
            cause: format!("unreadable model list: {e}"),
        })?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TextGenerator for OllamaClient {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn generate(&self, prompt: &str, model: &str, timeout: Duration) -> Result<String> {
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: self.options,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&request)
            .timeout(timeout)
            .send()
            .map_err(|e| map_transport_error("ollama", "ollama_generate", model, timeout, &e))?;

        if !response.status().is_success() {
            return Err(map_status_error("ollama", model, response));
        }

        let response: GenerateResponse = response.json().map_err(|e| {
            tracing::error!(
                provider = "ollama",
                model = %model,
                error = %e,
                "Failed to parse LLM response"
            );
            Error::MalformedResponse {
                cause: format!("unreadable generate envelope: {e}"),
            }
        })?;

        Ok(response.response)
    }

    fn is_available(&self) -> bool {
        self.list_models().is_ok()
    }
}

/// Request to the Generate API.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: SamplingOptions,
}

/// Response from the Generate API.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}
