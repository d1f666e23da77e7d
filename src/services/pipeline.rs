//! Signal gathering for the fusion path.

use super::QueryAnalyzer;
use super::fusion::{SourceVectors, fuse};
use crate::models::{AnalysisPath, IntentResult, Query, SignalSource, WeightConfig};
use crate::search::{SearchOptions, SearchProvider, SearchResult};
use crate::signals::{
    ClassifierAdapter, ModifierMatcher, ModifierRules, PageSummary, ScoreProvider,
    SerpFeatures, SignalContext, score_content, score_serp,
};
use crate::Result;
use std::sync::Arc;

/// Default number of pages fetched when results lack inline content.
pub const DEFAULT_FETCH_PAGES: usize = 3;

/// Gathers every signal source for a query and fuses them.
///
/// Collaborator failures never fail the query. A search error makes the
/// SERP and content sources absent; a classifier error makes the classifier
/// absent. Only when every source is absent does fusion fail.
pub struct FusionPipeline {
    weights: WeightConfig,
    matcher: ModifierMatcher,
    search: Option<Arc<dyn SearchProvider>>,
    search_options: SearchOptions,
    fetch_pages: usize,
    classifier: Arc<dyn ScoreProvider>,
}

impl std::fmt::Debug for FusionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FusionPipeline")
            .field("weights", &self.weights)
            .field("search", &self.search.as_ref().map(|s| s.name()))
            .field("search_options", &self.search_options)
            .field("fetch_pages", &self.fetch_pages)
            .field("classifier", &self.classifier.name())
            .finish_non_exhaustive()
    }
}

impl FusionPipeline {
    /// Creates a pipeline with only the modifier source wired.
    #[must_use]
    pub fn new(weights: WeightConfig) -> Self {
        Self {
            weights,
            matcher: ModifierMatcher::default(),
            search: None,
            search_options: SearchOptions::default(),
            fetch_pages: DEFAULT_FETCH_PAGES,
            classifier: Arc::new(ClassifierAdapter::absent()),
        }
    }

    /// Uses custom keyword tables.
    #[must_use]
    pub fn with_rules(mut self, rules: &ModifierRules) -> Self {
        self.matcher = rules.compile();
        self
    }

    /// Wires a search provider for the SERP and content sources.
    #[must_use]
    pub fn with_search(mut self, provider: Arc<dyn SearchProvider>, options: SearchOptions) -> Self {
        self.search = Some(provider);
        self.search_options = options;
        self
    }

    /// Sets how many results without inline content are fetched separately.
    #[must_use]
    pub const fn with_fetch_pages(mut self, pages: usize) -> Self {
        self.fetch_pages = pages;
        self
    }

    /// Fills the classifier slot.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn ScoreProvider>) -> Self {
        self.classifier = classifier;
        self
    }

    /// The configured weights.
    #[must_use]
    pub const fn weights(&self) -> &WeightConfig {
        &self.weights
    }

    /// Collects the score vector of every available source.
    #[must_use]
    pub fn gather(&self, query: &Query) -> SourceVectors {
        let mut vectors = SourceVectors::new();
        vectors.insert(SignalSource::Modifiers, self.matcher.score(query));

        let results = self.search_results(query);
        if let Some(results) = &results {
            let features = SerpFeatures::from_results(query, results);
            vectors.insert(SignalSource::Serp, score_serp(&features));

            let pages = self.page_summaries(results);
            if pages.is_empty() {
                tracing::debug!(query = %query, "No page content available");
            } else {
                vectors.insert(SignalSource::Content, score_content(&pages));
            }
        }

        let context = results
            .as_deref()
            .map(SignalContext::from_results)
            .unwrap_or_default();
        vectors.insert_optional(
            SignalSource::Classifier,
            self.classifier.score(query, &context),
        );

        for source in vectors.absent() {
            metrics::counter!("intent_source_absent_total", "source" => source.as_str())
                .increment(1);
        }
        vectors
    }

    fn search_results(&self, query: &Query) -> Option<Vec<SearchResult>> {
        let provider = self.search.as_ref()?;
        match provider.search(query, &self.search_options) {
            Ok(response) if response.results.is_empty() => {
                tracing::warn!(
                    query = %query,
                    provider = provider.name(),
                    "Search returned no results, SERP and content sources absent"
                );
                None
            },
            Ok(response) => Some(response.results),
            Err(e) => {
                tracing::warn!(
                    query = %query,
                    provider = provider.name(),
                    error = %e,
                    error_kind = e.kind().as_str(),
                    "Search failed, SERP and content sources absent"
                );
                None
            },
        }
    }

    fn page_summaries(&self, results: &[SearchResult]) -> Vec<PageSummary> {
        let mut pages = Vec::new();
        let mut fetched = 0;
        for result in results {
            if let Some(markdown) = result.markdown.as_deref().filter(|m| !m.trim().is_empty()) {
                pages.push(PageSummary::from_document(
                    &result.url,
                    markdown,
                    result.html.as_deref(),
                ));
                continue;
            }
            if fetched >= self.fetch_pages || result.url.is_empty() {
                continue;
            }
            let Some(provider) = self.search.as_ref() else {
                break;
            };
            fetched += 1;
            match provider.fetch_content(&result.url) {
                Ok(doc) if !doc.markdown.trim().is_empty() => pages.push(
                    PageSummary::from_document(&doc.url, &doc.markdown, doc.html.as_deref()),
                ),
                Ok(_) => tracing::debug!(url = %result.url, "Fetched page was empty"),
                Err(e) => tracing::debug!(url = %result.url, error = %e, "Page fetch failed"),
            }
        }
        pages
    }
}

impl QueryAnalyzer for FusionPipeline {
    fn path(&self) -> AnalysisPath {
        AnalysisPath::Fusion
    }

    fn analyze(&self, query: &Query) -> Result<IntentResult> {
        let vectors = self.gather(query);
        fuse(query.clone(), &vectors, &self.weights)
    }
}
