//! Firecrawl search and scrape client.

use super::{PageDocument, SearchOptions, SearchProvider, SearchResponse, SearchResult};
use crate::models::Query;
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Firecrawl v2 API client.
pub struct FirecrawlClient {
    /// API base URL.
    endpoint: String,
    /// Bearer API key.
    api_key: SecretString,
    /// Per-request deadline.
    timeout: Duration,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for FirecrawlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirecrawlClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"***REDACTED***")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl FirecrawlClient {
    /// Default API base URL.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.firecrawl.dev";

    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the API key is empty.
    pub fn new(api_key: SecretString) -> Result<Self> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(Error::InvalidInput(
                "FIRECRAWL_API_KEY is not set".to_string(),
            ));
        }
        let timeout = Duration::from_secs(60);
        Ok(Self {
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            api_key,
            timeout,
            client: crate::llm::build_http_client(crate::llm::LlmHttpConfig {
                timeout_ms: 0,
                connect_timeout_ms: 5_000,
            }),
        })
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the per-request deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        operation: &str,
        body: &B,
    ) -> Result<R> {
        let response = self
            .client
            .post(format!("{}{path}", self.endpoint))
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .timeout(self.timeout)
            .send()
            .map_err(|e| {
                tracing::warn!(
                    provider = "firecrawl",
                    operation = operation,
                    error = %e,
                    is_timeout = e.is_timeout(),
                    "Search request failed"
                );
                if e.is_timeout() {
                    Error::Timeout {
                        operation: operation.to_string(),
                        timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                    }
                } else {
                    Error::ServiceUnavailable {
                        service: "firecrawl".to_string(),
                        cause: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::warn!(
                provider = "firecrawl",
                operation = operation,
                status = %status,
                "Search API returned error status"
            );
            return Err(Error::ServiceUnavailable {
                service: "firecrawl".to_string(),
                cause: format!("API returned status: {status} - {body}"),
            });
        }

        response.json().map_err(|e| Error::MalformedResponse {
            cause: format!("unreadable {operation} response: {e}"),
        })
    }
}

impl SearchProvider for FirecrawlClient {
    fn name(&self) -> &'static str {
        "firecrawl"
    }

    fn search(&self, query: &Query, options: &SearchOptions) -> Result<SearchResponse> {
        options.validate()?;
        let request = SearchRequest {
            query: query.as_str(),
            limit: options.limit,
            country: &options.country,
            location: options.location.as_deref().filter(|l| !l.trim().is_empty()),
            sources: ["web"],
            scrape_options: options.scrape_content.then_some(ScrapeOptions {
                formats: ["markdown", "html"],
                only_main_content: true,
            }),
        };
        let envelope: SearchEnvelope = self.post("/v2/search", "firecrawl_search", &request)?;
        if !envelope.success {
            return Err(Error::ServiceUnavailable {
                service: "firecrawl".to_string(),
                cause: envelope.error.unwrap_or_else(|| "search failed".to_string()),
            });
        }

        let results = match envelope.data {
            Some(SearchData::Grouped { web }) => web,
            Some(SearchData::Flat(results)) => results,
            None => Vec::new(),
        };
        tracing::debug!(query = %query, results = results.len(), "Search completed");
        Ok(SearchResponse { results })
    }

    fn fetch_content(&self, url: &str) -> Result<PageDocument> {
        let request = ScrapeRequest {
            url,
            formats: ["markdown", "html"],
            only_main_content: true,
        };
        let envelope: ScrapeEnvelope = self.post("/v2/scrape", "firecrawl_scrape", &request)?;
        let data = envelope.data.ok_or_else(|| Error::MalformedResponse {
            cause: envelope
                .error
                .unwrap_or_else(|| "scrape returned no data".to_string()),
        })?;
        Ok(PageDocument {
            url: url.to_string(),
            title: data.metadata.and_then(|m| m.title),
            markdown: data.markdown.unwrap_or_default(),
            html: data.html,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    limit: usize,
    country: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    sources: [&'static str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    scrape_options: Option<ScrapeOptions>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeOptions {
    formats: [&'static str; 2],
    only_main_content: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: [&'static str; 2],
    only_main_content: bool,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    data: Option<SearchData>,
    #[serde(default)]
    error: Option<String>,
}

const fn default_success() -> bool {
    true
}

/// v2 groups results by source; v1 returned a flat list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchData {
    Grouped {
        #[serde(default)]
        web: Vec<SearchResult>,
    },
    Flat(Vec<SearchResult>),
}

#[derive(Debug, Deserialize)]
struct ScrapeEnvelope {
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    metadata: Option<ScrapeMetadata>,
}

#[derive(Debug, Deserialize)]
struct ScrapeMetadata {
    #[serde(default)]
    title: Option<String>,
}
