//! Search and content-fetch collaborators.
//!
//! The fusion pipeline only sees the [`SearchProvider`] trait; any failure
//! here turns the SERP and content sources absent for that query.

mod firecrawl;

pub use firecrawl::FirecrawlClient;

use crate::models::Query;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Largest result count a search may request.
pub const MAX_RESULT_LIMIT: usize = 20;

/// Search parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// ISO country code.
    pub country: String,
    /// Optional location refinement.
    pub location: Option<String>,
    /// Number of results, `1..=20`.
    pub limit: usize,
    /// Ask the provider to return page markdown inline.
    pub scrape_content: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            country: "US".to_string(),
            location: None,
            limit: 10,
            scrape_content: true,
        }
    }
}

impl SearchOptions {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the limit is outside `1..=20` or the
    /// country code is not two letters.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_RESULT_LIMIT).contains(&self.limit) {
            return Err(Error::InvalidInput(format!(
                "search.limit must be between 1 and {MAX_RESULT_LIMIT}, got {}",
                self.limit
            )));
        }
        if self.country.len() != 2 || !self.country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::InvalidInput(format!(
                "search.country must be a two-letter ISO code, got '{}'",
                self.country
            )));
        }
        Ok(())
    }
}

/// One organic search result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Result URL.
    pub url: String,
    /// Result title.
    #[serde(default)]
    pub title: String,
    /// Result snippet.
    #[serde(default)]
    pub description: String,
    /// Page markdown, when scraped inline.
    #[serde(default)]
    pub markdown: Option<String>,
    /// Raw page HTML, when scraped inline.
    #[serde(default)]
    pub html: Option<String>,
}

/// Results for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Organic results in rank order.
    pub results: Vec<SearchResult>,
}

/// A fetched page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDocument {
    /// Page URL.
    pub url: String,
    /// Page title, if known.
    pub title: Option<String>,
    /// Main content as markdown.
    pub markdown: String,
    /// Raw HTML, if fetched.
    pub html: Option<String>,
}

/// Trait for search providers.
pub trait SearchProvider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &'static str;

    /// Runs a search.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceUnavailable`] or [`Error::Timeout`] when the
    /// provider cannot answer, [`Error::MalformedResponse`] when the response
    /// cannot be read.
    fn search(&self, query: &Query, options: &SearchOptions) -> Result<SearchResponse>;

    /// Fetches one page's content.
    ///
    /// # Errors
    ///
    /// Same as [`SearchProvider::search`].
    fn fetch_content(&self, url: &str) -> Result<PageDocument>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_validate_limit() {
        assert!(SearchOptions::default().validate().is_ok());
        let too_many = SearchOptions {
            limit: 21,
            ..SearchOptions::default()
        };
        assert!(too_many.validate().is_err());
        let zero = SearchOptions {
            limit: 0,
            ..SearchOptions::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_options_validate_country() {
        let bad = SearchOptions {
            country: "USA".to_string(),
            ..SearchOptions::default()
        };
        assert!(bad.validate().is_err());
    }
}
