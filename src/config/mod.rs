//! Configuration management.
//!
//! Settings come from a TOML file, then environment overrides, then CLI
//! flags. Every section has defaults, so an empty file is a valid config.
//!
//! ```toml
//! mode = "fusion"
//!
//! [weights]          # percentages, clamped to 0..=100
//! serp = 25
//! modifiers = 20
//! content = 25
//! classifier = 30
//!
//! [search]
//! api_key = "${FIRECRAWL_API_KEY}"
//! country = "US"
//! limit = 10
//!
//! [model]
//! provider = "ollama"
//! model = "llama3.2:3b"
//! timeout_ms = 30000
//! ```

use crate::llm::SamplingOptions;
use crate::models::{AnalysisPath, WeightConfig};
use crate::search::{FirecrawlClient, MAX_RESULT_LIMIT, SearchOptions};
use crate::signals::ModifierRules;
use crate::{Error, Result};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Upper bound on batch worker threads.
pub const MAX_WORKERS: usize = 16;

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "INTENT_ANALYZER_CONFIG";

#[allow(clippy::expect_used)]
static ENV_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex: env reference")
});

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default analysis path.
    pub mode: AnalysisPath,
    /// Fusion weights as percentages.
    pub weights: WeightPercentages,
    /// Search collaborator settings.
    pub search: SearchConfig,
    /// Local inference settings.
    pub model: ModelConfig,
    /// Classifier slot settings.
    pub classifier: ClassifierConfig,
    /// Batch settings.
    pub batch: BatchSettings,
    /// Modifier keyword tables.
    pub rules: ModifierRules,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Metrics settings.
    pub metrics: MetricsConfig,
}

/// Fusion weights in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightPercentages {
    /// SERP structure weight.
    pub serp: f64,
    /// Query modifier weight.
    pub modifiers: f64,
    /// Page content weight.
    pub content: f64,
    /// Classifier weight.
    pub classifier: f64,
}

impl Default for WeightPercentages {
    fn default() -> Self {
        Self {
            serp: 25.0,
            modifiers: 20.0,
            content: 25.0,
            classifier: 30.0,
        }
    }
}

impl WeightPercentages {
    /// Converts to fusion weights, clamping each percentage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a value is not a finite number.
    pub fn to_weights(&self) -> Result<WeightConfig> {
        WeightConfig::from_percentages(self.serp, self.modifiers, self.content, self.classifier)
    }
}

/// Search collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Firecrawl API base URL.
    pub endpoint: String,
    /// Firecrawl API key. Supports `${VAR}` references.
    #[serde(with = "optional_secret_serde")]
    pub api_key: Option<SecretString>,
    /// ISO country code.
    pub country: String,
    /// Optional location refinement.
    pub location: Option<String>,
    /// Results per search, `1..=20`.
    pub limit: usize,
    /// Request page markdown inline with search results.
    pub scrape_content: bool,
    /// Top results to fetch separately when a result lacks inline content.
    pub fetch_pages: usize,
    /// Per-request deadline.
    pub timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: FirecrawlClient::DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            country: "US".to_string(),
            location: None,
            limit: 10,
            scrape_content: true,
            fetch_pages: 3,
            timeout_ms: 60_000,
        }
    }
}

impl SearchConfig {
    /// Search options for each query.
    #[must_use]
    pub fn options(&self) -> SearchOptions {
        SearchOptions {
            country: self.country.clone(),
            location: self.location.clone(),
            limit: self.limit,
            scrape_content: self.scrape_content,
        }
    }

    /// Returns true if an API key is configured.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().trim().is_empty())
    }
}

/// Local inference providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Ollama.
    #[default]
    Ollama,
    /// LM Studio.
    #[serde(alias = "lm_studio", alias = "lm-studio")]
    LmStudio,
}

impl LlmProvider {
    /// Parses a provider string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "lmstudio" | "lm_studio" | "lm-studio" => Some(Self::LmStudio),
            _ => None,
        }
    }

    /// Returns the provider name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::LmStudio => "lmstudio",
        }
    }
}

/// Local inference settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Inference service.
    pub provider: LlmProvider,
    /// Base URL; the provider default when unset.
    pub endpoint: Option<String>,
    /// Model name.
    pub model: String,
    /// Per-request deadline.
    pub timeout_ms: u64,
    /// Connect deadline.
    pub connect_timeout_ms: u64,
    /// Retries after a timeout.
    pub max_retries: u32,
    /// Pause between retries.
    pub retry_backoff_ms: u64,
    /// Consecutive failures before the breaker opens.
    pub breaker_failure_threshold: u32,
    /// How long the breaker stays open.
    pub breaker_reset_ms: u64,
    /// Search first and include top results in the prompt.
    pub include_serp_context: bool,
    /// Sampling parameters.
    pub sampling: SamplingOptions,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama,
            endpoint: None,
            model: crate::llm::OllamaClient::DEFAULT_MODEL.to_string(),
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
            max_retries: 1,
            retry_backoff_ms: 250,
            breaker_failure_threshold: 3,
            breaker_reset_ms: 30_000,
            include_serp_context: false,
            sampling: SamplingOptions::default(),
        }
    }
}

impl ModelConfig {
    /// Request deadline as a duration.
    #[must_use]
    pub const fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

/// What fills the classifier slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierMode {
    /// No classifier; the slot is always absent.
    None,
    /// Built-in URL and title pattern classifier.
    #[default]
    Builtin,
    /// Trained lexicon artifact from `artifact_path`.
    Artifact,
    /// The configured local model scores the query.
    Model,
}

/// Classifier slot settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Slot mode.
    pub mode: ClassifierMode,
    /// Path to a JSON lexicon artifact.
    pub artifact_path: Option<PathBuf>,
}

/// Batch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Worker threads, `1..=16`.
    pub workers: usize,
    /// Per-item deadline; 0 disables it.
    pub item_timeout_ms: u64,
    /// Drop repeated queries, keeping the first.
    pub dedupe: bool,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            workers: 1,
            item_timeout_ms: 0,
            dedupe: true,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `intent_analyzer=debug`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

/// Metrics settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder.
    pub enabled: bool,
    /// Write a Prometheus text snapshot here after each run.
    pub snapshot_path: Option<PathBuf>,
}

impl AppConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the text is not valid TOML for
    /// this schema.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        Self::from_toml(&contents)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks, in order:
    /// 1. The file named by `INTENT_ANALYZER_CONFIG`
    /// 2. The platform config dir (`~/.config/intent-analyzer/config.toml` on Linux)
    /// 3. `~/.config/intent-analyzer/config.toml` on other platforms
    ///
    /// Returns the defaults if no file is found.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists but cannot be parsed.
    pub fn load_default() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::load_from_file(Path::new(&path));
        }
        for path in Self::default_paths() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "Loading config file");
                return Self::load_from_file(&path);
            }
        }
        Ok(Self::default())
    }

    /// Candidate config file locations.
    #[must_use]
    pub fn default_paths() -> Vec<PathBuf> {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Vec::new();
        };
        let platform = base_dirs
            .config_dir()
            .join("intent-analyzer")
            .join("config.toml");
        let xdg = base_dirs
            .home_dir()
            .join(".config")
            .join("intent-analyzer")
            .join("config.toml");
        if platform == xdg {
            vec![platform]
        } else {
            vec![platform, xdg]
        }
    }

    /// Applies overrides from the process environment.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::apply_env_overrides`].
    pub fn apply_process_env(&mut self) -> Result<()> {
        self.apply_env_overrides(|key| std::env::var(key).ok())
    }

    /// Applies environment overrides through `lookup`.
    ///
    /// Recognized variables: `FIRECRAWL_API_KEY`, `OLLAMA_HOST`,
    /// `OLLAMA_MODEL`, and `INTENT_ANALYZER_{MODE, PROVIDER, MODEL,
    /// MODEL_ENDPOINT, MODEL_TIMEOUT_MS, COUNTRY, LOCATION, RESULT_LIMIT,
    /// WORKERS, ITEM_TIMEOUT_MS, CLASSIFIER_ARTIFACT, LOG_LEVEL, LOG_FORMAT,
    /// LOG_FILE, METRICS_FILE}`. Afterwards `${VAR}` references in the API
    /// key are expanded through the same lookup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a numeric or enum variable does
    /// not parse.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("FIRECRAWL_API_KEY") {
            self.search.api_key = Some(SecretString::from(key));
        }
        if let Some(host) = get("OLLAMA_HOST")
            && self.model.provider == LlmProvider::Ollama
        {
            self.model.endpoint = Some(normalize_host(&host));
        }
        if let Some(model) = get("OLLAMA_MODEL") {
            self.model.model = model;
        }

        if let Some(mode) = get("INTENT_ANALYZER_MODE") {
            self.mode = parse_mode(&mode)?;
        }
        if let Some(provider) = get("INTENT_ANALYZER_PROVIDER") {
            self.model.provider = LlmProvider::parse(&provider).ok_or_else(|| {
                Error::InvalidInput(format!("unknown model provider '{provider}'"))
            })?;
        }
        if let Some(model) = get("INTENT_ANALYZER_MODEL") {
            self.model.model = model;
        }
        if let Some(endpoint) = get("INTENT_ANALYZER_MODEL_ENDPOINT") {
            self.model.endpoint = Some(endpoint);
        }
        if let Some(v) = get("INTENT_ANALYZER_MODEL_TIMEOUT_MS") {
            self.model.timeout_ms = parse_number("INTENT_ANALYZER_MODEL_TIMEOUT_MS", &v)?;
        }
        if let Some(country) = get("INTENT_ANALYZER_COUNTRY") {
            self.search.country = country.to_uppercase();
        }
        if let Some(location) = get("INTENT_ANALYZER_LOCATION") {
            self.search.location = Some(location);
        }
        if let Some(v) = get("INTENT_ANALYZER_RESULT_LIMIT") {
            self.search.limit = parse_number("INTENT_ANALYZER_RESULT_LIMIT", &v)?;
        }
        if let Some(v) = get("INTENT_ANALYZER_WORKERS") {
            self.batch.workers = parse_number("INTENT_ANALYZER_WORKERS", &v)?;
        }
        if let Some(v) = get("INTENT_ANALYZER_ITEM_TIMEOUT_MS") {
            self.batch.item_timeout_ms = parse_number("INTENT_ANALYZER_ITEM_TIMEOUT_MS", &v)?;
        }
        if let Some(path) = get("INTENT_ANALYZER_CLASSIFIER_ARTIFACT") {
            self.classifier.mode = ClassifierMode::Artifact;
            self.classifier.artifact_path = Some(PathBuf::from(path));
        }
        if let Some(level) = get("INTENT_ANALYZER_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = get("INTENT_ANALYZER_LOG_FORMAT") {
            self.logging.format = match format.trim().to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "text" => LogFormat::Pretty,
                other => {
                    return Err(Error::InvalidInput(format!("unknown log format '{other}'")));
                },
            };
        }
        if let Some(path) = get("INTENT_ANALYZER_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(path));
        }
        if let Some(path) = get("INTENT_ANALYZER_METRICS_FILE") {
            self.metrics.enabled = true;
            self.metrics.snapshot_path = Some(PathBuf::from(path));
        }

        if let Some(key) = self.search.api_key.take() {
            let expanded = expand_env_references(key.expose_secret(), &lookup);
            self.search.api_key = Some(SecretString::from(expanded));
        }
        Ok(())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        self.weights.to_weights()?;
        self.search.options().validate()?;
        if self.search.fetch_pages > MAX_RESULT_LIMIT {
            return Err(Error::InvalidInput(format!(
                "search.fetch_pages must be at most {MAX_RESULT_LIMIT}, got {}",
                self.search.fetch_pages
            )));
        }
        if self.model.model.trim().is_empty() {
            return Err(Error::InvalidInput("model.model must not be empty".to_string()));
        }
        if self.model.timeout_ms == 0 {
            return Err(Error::InvalidInput(
                "model.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if !(1..=MAX_WORKERS).contains(&self.batch.workers) {
            return Err(Error::InvalidInput(format!(
                "batch.workers must be between 1 and {MAX_WORKERS}, got {}",
                self.batch.workers
            )));
        }
        if self.classifier.mode == ClassifierMode::Artifact && self.classifier.artifact_path.is_none()
        {
            return Err(Error::InvalidInput(
                "classifier.mode = \"artifact\" requires classifier.artifact_path".to_string(),
            ));
        }
        self.rules.validate()
    }

    /// Renders the effective configuration as TOML with secrets redacted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::OperationFailed {
            operation: "render_config".to_string(),
            cause: e.to_string(),
        })
    }
}

/// Expands `${VAR}` references; unknown variables expand to nothing.
pub fn expand_env_references<F>(value: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_REFERENCE
        .replace_all(value, |caps: &regex::Captures<'_>| {
            lookup(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

fn parse_mode(value: &str) -> Result<AnalysisPath> {
    match value.trim().to_lowercase().as_str() {
        "fusion" | "rules" => Ok(AnalysisPath::Fusion),
        "model" | "llm" => Ok(AnalysisPath::Model),
        other => Err(Error::InvalidInput(format!("unknown analysis mode '{other}'"))),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("{name} must be a number, got '{value}'")))
}

/// Serde helpers for optional secrets; serialized values are redacted.
mod optional_secret_serde {
    use secrecy::SecretString;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(secret: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match secret {
            Some(_) => serializer.serialize_some("***REDACTED***"),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.map(SecretString::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mode, AnalysisPath::Fusion);
        assert_eq!(config.batch.workers, 1);
        assert!(!config.search.has_api_key());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.search.limit, 10);
        assert_eq!(config.model.provider, LlmProvider::Ollama);
    }

    #[test]
    fn test_parse_sections() {
        let config = AppConfig::from_toml(
            r#"
            mode = "model"

            [weights]
            serp = 40
            classifier = 0

            [search]
            country = "GB"
            limit = 5

            [model]
            provider = "lm-studio"
            model = "qwen2.5"

            [classifier]
            mode = "none"

            [batch]
            workers = 4

            [rules]
            transactional = ["buy", "rent"]
            "#,
        )
        .unwrap();
        assert_eq!(config.mode, AnalysisPath::Model);
        assert!((config.weights.serp - 40.0).abs() < f64::EPSILON);
        assert!((config.weights.modifiers - 20.0).abs() < f64::EPSILON);
        assert_eq!(config.search.country, "GB");
        assert_eq!(config.model.provider, LlmProvider::LmStudio);
        assert_eq!(config.classifier.mode, ClassifierMode::None);
        assert_eq!(config.batch.workers, 4);
        assert_eq!(config.rules.transactional, vec!["buy", "rent"]);
        assert!(!config.rules.informational.is_empty());
    }

    #[test]
    fn test_invalid_toml() {
        let err = AppConfig::from_toml("[search\nlimit = 5").unwrap_err();
        assert!(matches!(err, Error::OperationFailed { .. }));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = AppConfig::default();
        config.search.limit = 25;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.batch.workers = 17;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.classifier.mode = ClassifierMode::Artifact;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.weights.serp = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(env(&[
                ("FIRECRAWL_API_KEY", "fc-123"),
                ("OLLAMA_HOST", "10.0.0.5:11434"),
                ("OLLAMA_MODEL", "mistral"),
                ("INTENT_ANALYZER_WORKERS", "8"),
                ("INTENT_ANALYZER_MODE", "llm"),
                ("INTENT_ANALYZER_LOG_FORMAT", "json"),
            ]))
            .unwrap();
        assert!(config.search.has_api_key());
        assert_eq!(config.model.endpoint.as_deref(), Some("http://10.0.0.5:11434"));
        assert_eq!(config.model.model, "mistral");
        assert_eq!(config.batch.workers, 8);
        assert_eq!(config.mode, AnalysisPath::Model);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_overrides(env(&[("INTENT_ANALYZER_WORKERS", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("INTENT_ANALYZER_WORKERS"));
    }

    #[test]
    fn test_api_key_reference_expanded() {
        let mut config = AppConfig::from_toml(
            r#"
            [search]
            api_key = "${MY_FC_KEY}"
            "#,
        )
        .unwrap();
        config
            .apply_env_overrides(env(&[("MY_FC_KEY", "fc-abc")]))
            .unwrap();
        let key = config.search.api_key.as_ref().unwrap();
        assert_eq!(key.expose_secret(), "fc-abc");
    }

    #[test]
    fn test_rendered_config_redacts_key() {
        let mut config = AppConfig::default();
        config.search.api_key = Some(SecretString::from("fc-secret".to_string()));
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("***REDACTED***"));
        assert!(!rendered.contains("fc-secret"));
    }

    #[test]
    fn test_expand_env_references() {
        let lookup = env(&[("A", "1")]);
        assert_eq!(expand_env_references("x${A}y${B}", lookup), "x1y");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[batch]\nworkers = 3\n").unwrap();
        let config = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(config.batch.workers, 3);

        let missing = AppConfig::load_from_file(&dir.path().join("nope.toml"));
        assert!(missing.is_err());
    }
}
