//! LM Studio client.

use super::{
    LlmHttpConfig, SamplingOptions, TextGenerator, build_http_client, map_status_error,
    map_transport_error,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// LM Studio local inference client.
///
/// LM Studio provides an OpenAI-compatible API on localhost.
pub struct LmStudioClient {
    /// API endpoint.
    endpoint: String,
    /// Sampling options sent with every request.
    options: SamplingOptions,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl LmStudioClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "http://localhost:1234/v1";

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
}

impl Default for LmStudioClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TextGenerator for LmStudioClient {
    fn name(&self) -> &'static str {
        "lmstudio"
    }

    fn generate(&self, prompt: &str, model: &str, timeout: Duration) -> Result<String> {
        let request = ChatCompletionRequest {
            model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: 512,
            temperature: self.options.temperature,
            top_p: self.options.top_p,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .json(&request)
            .timeout(timeout)
            .send()
            .map_err(|e| map_transport_error("lmstudio", "lmstudio_generate", model, timeout, &e))?;

        if !response.status().is_success() {
            return Err(map_status_error("lmstudio", model, response));
        }

        let response: ChatCompletionResponse =
            response.json().map_err(|e| Error::MalformedResponse {
                cause: format!("unreadable chat completion envelope: {e}"),
            })?;

        // Extract content from first choice
        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::MalformedResponse {
                cause: "no choices in response".to_string(),
            })
    }

    fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/models", self.endpoint))
            .timeout(Duration::from_secs(5))
            .send()
            .is_ok_and(|r| r.status().is_success())
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}
