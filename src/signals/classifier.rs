//! Optional trained classifier slot.
//!
//! The fusion engine treats the classifier as one more signal source. Any
//! component that can turn a query (plus whatever search context is at hand)
//! into a score vector implements [`ScoreProvider`]; the model-based analyzer
//! does too, so a local model can fill the slot.
// Allow expect() on static regex patterns - these are guaranteed to compile
#![allow(clippy::expect_used)]

use crate::models::{IntentLabel, Query, SCORE_SCALE, ScoreVector, tokenize};
use crate::search::SearchResult;
use crate::{Error, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

/// Search context available when scoring a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalContext {
    /// Result URLs in rank order.
    pub urls: Vec<String>,
    /// Result titles in rank order.
    pub titles: Vec<String>,
}

impl SignalContext {
    /// Builds context from search results.
    #[must_use]
    pub fn from_results(results: &[SearchResult]) -> Self {
        Self {
            urls: results
                .iter()
                .filter(|r| !r.url.is_empty())
                .map(|r| r.url.clone())
                .collect(),
            titles: results.iter().map(|r| r.title.clone()).collect(),
        }
    }

    /// Returns true if there is no search context.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty() && self.titles.iter().all(|t| t.trim().is_empty())
    }
}

/// Capability to produce a score vector for the classifier slot.
///
/// Returns `None` when the provider has nothing to say; implementations
/// swallow their own failures.
pub trait ScoreProvider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &'static str;

    /// Scores a query.
    fn score(&self, query: &Query, context: &SignalContext) -> Option<ScoreVector>;
}

/// A classifier that may fail.
pub trait IntentClassifier: Send + Sync {
    /// Classifier name for logs.
    fn name(&self) -> &'static str;

    /// Classifies a query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceUnavailable`] if the classifier cannot score
    /// this query.
    fn classify(&self, query: &Query, context: &SignalContext) -> Result<ScoreVector>;
}

/// Wraps an optional classifier and turns its failures into absence.
pub struct ClassifierAdapter {
    inner: Option<Box<dyn IntentClassifier>>,
}

impl std::fmt::Debug for ClassifierAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierAdapter")
            .field("inner", &self.inner.as_ref().map(|c| c.name()))
            .finish()
    }
}

impl ClassifierAdapter {
    /// An adapter with no classifier configured.
    #[must_use]
    pub const fn absent() -> Self {
        Self { inner: None }
    }

    /// Wraps a classifier.
    #[must_use]
    pub fn new(classifier: Box<dyn IntentClassifier>) -> Self {
        Self {
            inner: Some(classifier),
        }
    }

    /// The built-in URL and title pattern classifier.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(Box::new(UrlPatternClassifier))
    }

    /// Loads a lexicon artifact.
    ///
    /// A load failure is logged once and leaves the adapter absent for the
    /// rest of the session.
    #[must_use]
    pub fn from_artifact(path: &Path) -> Self {
        match LexiconModel::load(path) {
            Ok(model) => {
                tracing::info!(path = %path.display(), "Loaded classifier artifact");
                Self::new(Box::new(model))
            },
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Classifier artifact failed to load, classifier disabled"
                );
                metrics::counter!("intent_classifier_load_failures_total").increment(1);
                Self::absent()
            },
        }
    }

    /// Returns true if a classifier is configured.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.inner.is_some()
    }
}

impl ScoreProvider for ClassifierAdapter {
    fn name(&self) -> &'static str {
        self.inner.as_ref().map_or("none", |c| c.name())
    }

    fn score(&self, query: &Query, context: &SignalContext) -> Option<ScoreVector> {
        let classifier = self.inner.as_ref()?;
        match classifier.classify(query, context) {
            Ok(vector) => Some(vector),
            Err(e) => {
                tracing::warn!(
                    classifier = classifier.name(),
                    error = %e,
                    "Classifier failed, treating source as absent"
                );
                None
            },
        }
    }
}

static BUILTIN: LazyLock<ClassifierAdapter> = LazyLock::new(ClassifierAdapter::builtin);

/// Scores a query with the built-in pattern classifier.
///
/// Returns `None` (absent) when the context holds no results to classify.
#[must_use]
pub fn score_classifier(query: &Query, context: &SignalContext) -> Option<ScoreVector> {
    BUILTIN.score(query, context)
}

// Problem-solving evidence from the five-class pattern classifier counts as
// informational.
static TITLE_CUES: LazyLock<Vec<(IntentLabel, Regex)>> = LazyLock::new(|| {
    vec![
        (
            IntentLabel::Informational,
            Regex::new(r"(?i)\b(how to|can i|error|fix|solve|issue|guide|tutorial)\b")
                .expect("static regex: problem cues"),
        ),
        (
            IntentLabel::CommercialInvestigation,
            Regex::new(r"(?i)\b(vs\.?|comparison|best|compared to)\b")
                .expect("static regex: comparison cues"),
        ),
        (
            IntentLabel::Informational,
            Regex::new(r"(?i)\b(what is|explain|overview|introduction|definition)\b")
                .expect("static regex: info cues"),
        ),
    ]
});

static COMPARISON_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(comparison|[-_/]vs[-_/.])").expect("static regex: comparison url")
});

static TUTORIAL_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(how-to|tutorial|guide)").expect("static regex: tutorial url"));

/// Pattern classifier over result URLs and titles.
///
/// Community and code hosts signal problem solving, blogs and encyclopedias
/// signal research, stores signal purchase and comparison paths signal
/// investigation. Title cues count twice per occurrence.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlPatternClassifier;

impl UrlPatternClassifier {
    fn url_scores(urls: &[String]) -> ScoreVector {
        let mut community = false;
        let mut research = false;
        let mut video = false;
        let mut store = false;
        let mut comparison = false;
        let mut tutorial = false;

        for url in urls {
            let url = url.to_lowercase();
            if url.contains("reddit.com") || url.contains("github.com") || url.contains("stackoverflow") {
                community = true;
            } else if url.contains("youtube.com") {
                video = true;
            } else if url.contains("wikipedia.org") || ["blog", "medium", "hashnode"].iter().any(|x| url.contains(x)) {
                research = true;
            } else if ["amazon", "shop", "store", "ebay"].iter().any(|x| url.contains(x)) {
                store = true;
            }
            comparison |= COMPARISON_URL.is_match(&url);
            tutorial |= TUTORIAL_URL.is_match(&url);
        }

        let mut vector = ScoreVector::zero();
        if community {
            vector.add(IntentLabel::Informational, 3.0);
        }
        if research {
            vector.add(IntentLabel::Informational, 2.0);
        }
        if video {
            vector.add(IntentLabel::Informational, 2.0);
        }
        if store {
            vector.add(IntentLabel::Transactional, 3.0);
        }
        if comparison {
            vector.add(IntentLabel::CommercialInvestigation, 3.0);
        }
        if tutorial {
            vector.add(IntentLabel::Informational, 2.0);
        }
        vector
    }

    fn title_scores(titles: &[String]) -> ScoreVector {
        let text = titles.join(" ");
        let mut vector = ScoreVector::zero();
        for (label, pattern) in TITLE_CUES.iter() {
            #[allow(clippy::cast_precision_loss)]
            let count = pattern.find_iter(&text).count() as f64;
            vector.add(*label, count * 2.0);
        }
        vector
    }
}

impl IntentClassifier for UrlPatternClassifier {
    fn name(&self) -> &'static str {
        "url_pattern"
    }

    fn classify(&self, _query: &Query, context: &SignalContext) -> Result<ScoreVector> {
        if context.is_empty() {
            return Err(Error::SourceUnavailable {
                source_name: "classifier".to_string(),
                cause: "no search results to classify".to_string(),
            });
        }

        let mut vector = Self::url_scores(&context.urls);
        for (label, score) in Self::title_scores(&context.titles).iter() {
            vector.add(label, score);
        }
        if vector.is_zero() {
            return Ok(vector);
        }
        Ok(vector.normalized())
    }
}

#[derive(Debug, Deserialize)]
struct LexiconArtifact {
    #[serde(default)]
    bias: HashMap<String, f64>,
    weights: HashMap<String, HashMap<String, f64>>,
    #[serde(default)]
    context_weight: f64,
}

/// A linear token model loaded from a JSON artifact.
///
/// ```json
/// {
///   "bias": { "informational": 0.2 },
///   "weights": {
///     "transactional": { "buy": 2.1, "price": 1.4 },
///     "navigational": { "login": 2.5 }
///   },
///   "context_weight": 0.25
/// }
/// ```
///
/// Labels are parsed leniently. Query tokens contribute their weight; result
/// title tokens contribute `context_weight` times theirs. The per-label
/// logits go through a softmax scaled to 100.
#[derive(Debug, Clone, PartialEq)]
pub struct LexiconModel {
    bias: [f64; 4],
    weights: [HashMap<String, f64>; 4],
    context_weight: f64,
}

fn slot(label: IntentLabel) -> usize {
    IntentLabel::ALL
        .iter()
        .position(|l| *l == label)
        .unwrap_or_default()
}

impl LexiconModel {
    /// Loads and validates an artifact file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the file cannot be read or
    /// parsed, and [`Error::InvalidInput`] for unknown labels, non-finite
    /// weights, or an artifact without any weights.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_classifier_artifact".to_string(),
            cause: e.to_string(),
        })?;
        Self::from_json(&text)
    }

    /// Parses an artifact from JSON text.
    ///
    /// # Errors
    ///
    /// See [`LexiconModel::load`].
    pub fn from_json(text: &str) -> Result<Self> {
        let artifact: LexiconArtifact =
            serde_json::from_str(text).map_err(|e| Error::OperationFailed {
                operation: "parse_classifier_artifact".to_string(),
                cause: e.to_string(),
            })?;

        if !artifact.context_weight.is_finite() || artifact.context_weight < 0.0 {
            return Err(Error::InvalidInput(
                "context_weight must be a non-negative number".to_string(),
            ));
        }

        let mut bias = [0.0; 4];
        for (key, value) in &artifact.bias {
            let label = parse_label(key)?;
            bias[slot(label)] = finite(*value, key)?;
        }

        let mut weights: [HashMap<String, f64>; 4] = Default::default();
        for (key, tokens) in &artifact.weights {
            let label = parse_label(key)?;
            for (token, value) in tokens {
                let value = finite(*value, token)?;
                for part in tokenize(token) {
                    weights[slot(label)].insert(part, value);
                }
            }
        }
        if weights.iter().all(HashMap::is_empty) {
            return Err(Error::InvalidInput(
                "classifier artifact has no token weights".to_string(),
            ));
        }

        Ok(Self {
            bias,
            weights,
            context_weight: artifact.context_weight,
        })
    }

    fn logits(&self, query: &Query, context: &SignalContext) -> [f64; 4] {
        let query_tokens = query.tokens();
        let title_tokens = tokenize(&context.titles.join(" "));
        let mut logits = self.bias;
        for (i, table) in self.weights.iter().enumerate() {
            let query_sum: f64 = query_tokens.iter().filter_map(|t| table.get(t)).sum();
            let title_sum: f64 = title_tokens.iter().filter_map(|t| table.get(t)).sum();
            logits[i] += query_sum + self.context_weight * title_sum;
        }
        logits
    }
}

fn parse_label(key: &str) -> Result<IntentLabel> {
    IntentLabel::parse(key)
        .ok_or_else(|| Error::InvalidInput(format!("unknown intent label '{key}' in artifact")))
}

fn finite(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::InvalidInput(format!("weight for '{what}' is not finite")))
    }
}

impl IntentClassifier for LexiconModel {
    fn name(&self) -> &'static str {
        "lexicon"
    }

    fn classify(&self, query: &Query, context: &SignalContext) -> Result<ScoreVector> {
        let logits = self.logits(query, context);
        let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps = logits.map(|l| (l - max).exp());
        let total: f64 = exps.iter().sum();
        if !total.is_finite() || total <= 0.0 {
            return Err(Error::SourceUnavailable {
                source_name: "classifier".to_string(),
                cause: "softmax overflowed".to_string(),
            });
        }
        Ok(ScoreVector::from_pairs(
            IntentLabel::ALL
                .iter()
                .zip(exps)
                .map(|(label, e)| (*label, e / total * SCORE_SCALE)),
        ))
    }
}
