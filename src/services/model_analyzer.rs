//! Model-based intent analysis.

use super::QueryAnalyzer;
use super::batch::analyze_sequential;
use super::response_parser::parse_model_response;
use crate::llm::{TextGenerator, build_intent_prompt};
use crate::models::{AnalysisPath, BatchResult, IntentResult, Query, ScoreVector};
use crate::search::{SearchOptions, SearchProvider};
use crate::signals::{ScoreProvider, SignalContext};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;

/// Default per-call deadline.
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(30);

/// Prompts a local text-generation model for an intent judgment.
///
/// The prompt asks for JSON scores for all four intents. The response goes
/// through the ordered parse chain in
/// [`parse_model_response`](super::parse_model_response) and the scores
/// are normalized the same way fused scores are. The primary intent is the
/// argmax of those scores; a disagreeing `primary_intent` field is logged
/// and ignored.
pub struct ModelAnalyzer {
    generator: Arc<dyn TextGenerator>,
    model: String,
    timeout: Duration,
    search: Option<(Arc<dyn SearchProvider>, SearchOptions)>,
}

impl std::fmt::Debug for ModelAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelAnalyzer")
            .field("provider", &self.generator.name())
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("serp_context", &self.search.is_some())
            .finish()
    }
}

impl ModelAnalyzer {
    /// Creates an analyzer for `model` on `generator`.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>, model: impl Into<String>) -> Self {
        Self {
            generator,
            model: model.into(),
            timeout: DEFAULT_MODEL_TIMEOUT,
            search: None,
        }
    }

    /// Sets the per-call deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Searches each query first and includes the top results in the prompt.
    #[must_use]
    pub fn with_search_context(
        mut self,
        provider: Arc<dyn SearchProvider>,
        options: SearchOptions,
    ) -> Self {
        self.search = Some((provider, options));
        self
    }

    /// The configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The configured deadline.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns true if the inference service answers its health check.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.generator.is_available()
    }

    /// Analyzes one query with an explicit model and deadline.
    ///
    /// # Errors
    ///
    /// - [`Error::ServiceUnavailable`](crate::Error::ServiceUnavailable) if the service is unreachable
    /// - [`Error::Timeout`](crate::Error::Timeout) if it does not answer in time
    /// - [`Error::MalformedResponse`](crate::Error::MalformedResponse) if no scores can be parsed
    pub fn analyze_with(
        &self,
        query: &Query,
        model: &str,
        timeout: Duration,
    ) -> Result<IntentResult> {
        let context = self.search_context(query);
        let (scores, reasoning) = self.judge(query, context.as_ref(), model, timeout)?;
        Ok(IntentResult::from_scores(
            query.clone(),
            &scores,
            AnalysisPath::Model,
            reasoning,
        ))
    }

    /// Analyzes queries one by one, preserving order and recording failures.
    #[must_use]
    pub fn analyze_batch(&self, queries: &[String]) -> BatchResult {
        analyze_sequential(self, queries)
    }

    fn search_context(&self, query: &Query) -> Option<SignalContext> {
        let (provider, options) = self.search.as_ref()?;
        match provider.search(query, options) {
            Ok(response) => Some(SignalContext::from_results(&response.results)),
            Err(e) => {
                tracing::warn!(
                    provider = provider.name(),
                    error = %e,
                    "Search context unavailable, prompting without it"
                );
                None
            },
        }
    }

    fn judge(
        &self,
        query: &Query,
        context: Option<&SignalContext>,
        model: &str,
        timeout: Duration,
    ) -> Result<(ScoreVector, Option<String>)> {
        let prompt = build_intent_prompt(query, context);
        let response = self.generator.generate(&prompt, model, timeout)?;
        let parsed = parse_model_response(&response)?;

        let argmax = parsed.scores.argmax();
        if let Some(stated) = parsed.stated_primary
            && stated != argmax
        {
            tracing::debug!(
                query = %query,
                stated = %stated,
                scored = %argmax,
                "Model's stated primary intent disagrees with its scores"
            );
        }
        Ok((parsed.scores, parsed.reasoning))
    }
}

impl QueryAnalyzer for ModelAnalyzer {
    fn path(&self) -> AnalysisPath {
        AnalysisPath::Model
    }

    fn analyze(&self, query: &Query) -> Result<IntentResult> {
        self.analyze_with(query, &self.model, self.timeout)
    }
}

impl ScoreProvider for ModelAnalyzer {
    fn name(&self) -> &'static str {
        "model"
    }

    fn score(&self, query: &Query, context: &SignalContext) -> Option<ScoreVector> {
        let context = (!context.is_empty()).then_some(context);
        match self.judge(query, context, &self.model, self.timeout) {
            Ok((scores, _)) => Some(scores),
            Err(e) => {
                tracing::warn!(
                    provider = self.generator.name(),
                    error = %e,
                    "Model classifier failed, treating source as absent"
                );
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IntentLabel;
    use crate::{Error, ErrorKind};
    use std::sync::Mutex;

    #[derive(Clone, Copy)]
    enum Reply {
        Text(&'static str),
        Refused,
    }

    /// Answers by the first word of the quoted query.
    struct Canned {
        replies: Vec<(&'static str, Reply)>,
        prompts: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(replies: Vec<(&'static str, Reply)>) -> Self {
            Self {
                replies,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl TextGenerator for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        fn generate(&self, prompt: &str, _model: &str, _timeout: Duration) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let reply = self
                .replies
                .iter()
                .find(|(word, _)| prompt.contains(&format!("Search query: \"{word}")))
                .map(|(_, reply)| *reply);
            match reply {
                Some(Reply::Text(text)) => Ok(text.to_string()),
                Some(Reply::Refused) => Err(Error::ServiceUnavailable {
                    service: "canned".to_string(),
                    cause: "connection refused".to_string(),
                }),
                None => Err(Error::MalformedResponse {
                    cause: "no canned reply".to_string(),
                }),
            }
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    const BUY: &str = r#"{"primary_intent": "Transactional", "secondary_intent": "Commercial Investigation", "confidence_scores": {"Informational": 5, "Transactional": 80, "Navigational": 5, "Commercial Investigation": 10}, "reasoning": "Purchase verb."}"#;

    fn analyzer(replies: Vec<(&'static str, Reply)>) -> ModelAnalyzer {
        ModelAnalyzer::new(Arc::new(Canned::new(replies)), "m")
    }

    #[test]
    fn test_analyze_normalizes_model_scores() {
        let analyzer = analyzer(vec![("buy", Reply::Text(BUY))]);
        let result = analyzer.analyze(&Query::parse("buy shoes").unwrap()).unwrap();
        assert_eq!(result.primary(), IntentLabel::Transactional);
        assert_eq!(result.secondary(), IntentLabel::CommercialInvestigation);
        assert!((result.confidence() - 80.0).abs() < 1e-9);
        assert_eq!(result.reasoning(), Some("Purchase verb."));
        assert_eq!(result.path(), AnalysisPath::Model);
        assert!(result.breakdown().is_none());
    }

    #[test]
    fn test_primary_follows_scores_not_label() {
        let response = r#"{"primary_intent": "Informational", "confidence_scores": {"Informational": 20, "Navigational": 70}}"#;
        let analyzer = analyzer(vec![("gmail", Reply::Text(response))]);
        let result = analyzer.analyze(&Query::parse("gmail login").unwrap()).unwrap();
        assert_eq!(result.primary(), IntentLabel::Navigational);
    }

    #[test]
    fn test_service_errors_propagate() {
        let analyzer = analyzer(vec![("weather", Reply::Refused)]);
        let err = analyzer.analyze(&Query::parse("weather").unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
    }

    #[test]
    fn test_batch_isolates_malformed_response() {
        let analyzer = analyzer(vec![
            ("buy", Reply::Text(BUY)),
            ("garbled", Reply::Text("I am not sure what you mean.")),
        ]);
        let queries = vec![
            "buy socks".to_string(),
            "garbled words".to_string(),
            "buy hats".to_string(),
        ];
        let batch = analyzer.analyze_batch(&queries);
        assert_eq!(batch.len(), 3);
        assert!(batch.items()[0].result().is_some());
        assert_eq!(
            batch.items()[1].failure().unwrap().kind,
            ErrorKind::MalformedResponse
        );
        assert!(batch.items()[2].result().is_some());
    }

    #[test]
    fn test_score_provider_swallows_errors() {
        let analyzer = analyzer(Vec::new());
        let context = SignalContext::default();
        assert!(
            analyzer
                .score(&Query::parse("anything").unwrap(), &context)
                .is_none()
        );
    }

    #[test]
    fn test_score_provider_passes_context_into_prompt() {
        let generator = Arc::new(Canned::new(vec![("red", Reply::Text(BUY))]));
        let analyzer = ModelAnalyzer::new(generator.clone(), "m");
        let context = SignalContext {
            urls: vec!["https://shop.example.com/p/1".to_string()],
            titles: vec!["Buy now".to_string()],
        };
        let scores = analyzer
            .score(&Query::parse("red shoes").unwrap(), &context)
            .unwrap();
        assert_eq!(scores.argmax(), IntentLabel::Transactional);
        assert!(generator.prompts.lock().unwrap()[0].contains("shop.example.com"));
    }
}
