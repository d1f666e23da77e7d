//! Builders that turn configuration into wired analyzers.

use std::sync::Arc;

use crate::config::{AppConfig, ClassifierMode, LlmProvider, ModelConfig, SearchConfig};
use crate::llm::{
    LlmHttpConfig, LlmResilienceConfig, LmStudioClient, OllamaClient, ResilientGenerator,
    TextGenerator,
};
use crate::models::AnalysisPath;
use crate::search::{FirecrawlClient, SearchProvider};
use crate::services::{FusionPipeline, ModelAnalyzer, QueryAnalyzer};
use crate::signals::{ClassifierAdapter, ScoreProvider};
use crate::Result;

/// Builds an Ollama client from configuration.
#[must_use]
pub fn build_ollama_client(config: &ModelConfig) -> OllamaClient {
    let mut client = OllamaClient::new().with_options(config.sampling);
    if let Some(ref endpoint) = config.endpoint {
        client = client.with_endpoint(endpoint);
    }
    client.with_http_config(LlmHttpConfig::from_config(config))
}

/// Builds an LM Studio client from configuration.
#[must_use]
pub fn build_lmstudio_client(config: &ModelConfig) -> LmStudioClient {
    let mut client = LmStudioClient::new().with_options(config.sampling);
    if let Some(ref endpoint) = config.endpoint {
        client = client.with_endpoint(endpoint);
    }
    client.with_http_config(LlmHttpConfig::from_config(config))
}

/// Builds the configured text generator behind a circuit breaker.
#[must_use]
pub fn build_generator(config: &ModelConfig) -> Arc<dyn TextGenerator> {
    let resilience = LlmResilienceConfig::from_config(config);
    match config.provider {
        LlmProvider::Ollama => Arc::new(ResilientGenerator::new(
            build_ollama_client(config),
            resilience,
        )),
        LlmProvider::LmStudio => Arc::new(ResilientGenerator::new(
            build_lmstudio_client(config),
            resilience,
        )),
    }
}

/// Builds the search client when an API key is configured.
///
/// # Errors
///
/// Returns an error if the client cannot be constructed.
pub fn build_search_provider(config: &SearchConfig) -> Result<Option<Arc<dyn SearchProvider>>> {
    let Some(api_key) = config.api_key.clone().filter(|_| config.has_api_key()) else {
        tracing::info!("No search API key configured, SERP and content sources disabled");
        return Ok(None);
    };
    let client = FirecrawlClient::new(api_key)?
        .with_endpoint(&config.endpoint)
        .with_timeout(std::time::Duration::from_millis(config.timeout_ms));
    Ok(Some(Arc::new(client)))
}

/// Builds the model analyzer, with SERP context when configured and available.
#[must_use]
pub fn build_model_analyzer(
    config: &AppConfig,
    search: Option<Arc<dyn SearchProvider>>,
) -> ModelAnalyzer {
    let analyzer = ModelAnalyzer::new(build_generator(&config.model), &config.model.model)
        .with_timeout(config.model.timeout());
    match search {
        Some(provider) if config.model.include_serp_context => {
            analyzer.with_search_context(provider, config.search.options())
        },
        _ => analyzer,
    }
}

/// Builds whatever fills the fusion classifier slot.
#[must_use]
pub fn build_classifier(config: &AppConfig) -> Arc<dyn ScoreProvider> {
    let classifier = &config.classifier;
    match (classifier.mode, classifier.artifact_path.as_deref()) {
        (ClassifierMode::None, _) => Arc::new(ClassifierAdapter::absent()),
        (ClassifierMode::Builtin, _) => Arc::new(ClassifierAdapter::builtin()),
        (ClassifierMode::Artifact, Some(path)) => Arc::new(ClassifierAdapter::from_artifact(path)),
        (ClassifierMode::Artifact, None) => {
            tracing::warn!("Classifier artifact mode without a path, classifier disabled");
            Arc::new(ClassifierAdapter::absent())
        },
        (ClassifierMode::Model, _) => Arc::new(build_model_analyzer(config, None)),
    }
}

/// Builds the fusion pipeline.
///
/// # Errors
///
/// Returns an error if the weights are invalid or the search client cannot
/// be built.
pub fn build_fusion_pipeline(
    config: &AppConfig,
    search: Option<Arc<dyn SearchProvider>>,
) -> Result<FusionPipeline> {
    let mut pipeline = FusionPipeline::new(config.weights.to_weights()?)
        .with_rules(&config.rules)
        .with_fetch_pages(config.search.fetch_pages)
        .with_classifier(build_classifier(config));
    if let Some(provider) = search {
        pipeline = pipeline.with_search(provider, config.search.options());
    }
    Ok(pipeline)
}

/// Builds the analyzer for the configured path.
///
/// # Errors
///
/// Returns an error if configuration is invalid.
pub fn build_analyzer(config: &AppConfig) -> Result<Arc<dyn QueryAnalyzer>> {
    config.validate()?;
    let search = build_search_provider(&config.search)?;
    let analyzer: Arc<dyn QueryAnalyzer> = match config.mode {
        AnalysisPath::Fusion => Arc::new(build_fusion_pipeline(config, search)?),
        AnalysisPath::Model => Arc::new(build_model_analyzer(config, search)),
    };
    tracing::debug!(path = analyzer.path().as_str(), "Analyzer ready");
    Ok(analyzer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassifierConfig;
    use crate::models::{IntentLabel, Query};

    #[test]
    fn test_no_api_key_means_no_search() {
        assert!(build_search_provider(&SearchConfig::default()).unwrap().is_none());
    }

    #[test]
    fn test_api_key_builds_client() {
        let config = SearchConfig {
            api_key: Some("fc-test".to_string().into()),
            ..SearchConfig::default()
        };
        let provider = build_search_provider(&config).unwrap().unwrap();
        assert_eq!(provider.name(), "firecrawl");
    }

    #[test]
    fn test_offline_fusion_analyzer() {
        let mut config = AppConfig::default();
        config.classifier.mode = ClassifierMode::None;
        let analyzer = build_analyzer(&config).unwrap();
        assert_eq!(analyzer.path(), AnalysisPath::Fusion);

        let result = analyzer
            .analyze(&Query::parse("facebook login").unwrap())
            .unwrap();
        assert_eq!(result.primary(), IntentLabel::Navigational);
    }

    #[test]
    fn test_model_path_selected() {
        let config = AppConfig {
            mode: AnalysisPath::Model,
            ..AppConfig::default()
        };
        let analyzer = build_analyzer(&config).unwrap();
        assert_eq!(analyzer.path(), AnalysisPath::Model);
    }

    #[test]
    fn test_classifier_modes() {
        let mut config = AppConfig::default();
        assert_eq!(build_classifier(&config).name(), "url_pattern");
        config.classifier = ClassifierConfig {
            mode: ClassifierMode::Model,
            artifact_path: None,
        };
        assert_eq!(build_classifier(&config).name(), "model");
    }
}
