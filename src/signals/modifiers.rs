//! Keyword modifier signals extracted from the query text.
//!
//! Matching is case-insensitive and token-bounded: `how` matches
//! "how to tie a tie" but not "show times". Multi-word entries such as
//! `near me` must appear as contiguous tokens.

use super::lexicon::{self, DEFAULT_BRANDS, DEFAULT_INTEGRATION_VERBS, Phrase};
use crate::models::{IntentLabel, Query, SCORE_SCALE, ScoreVector};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Score added per distinct keyword match.
pub const DEFAULT_KEYWORD_INCREMENT: f64 = 30.0;

/// Score added by the brand and integration rules.
pub const DEFAULT_CONTEXT_BONUS: f64 = 20.0;

static DEFAULT_MATCHER: LazyLock<ModifierMatcher> =
    LazyLock::new(|| ModifierRules::default().compile());

/// Tunable keyword tables for modifier extraction.
///
/// Loaded from the `[rules]` section of the configuration file; any list left
/// out keeps its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifierRules {
    /// Informational keywords.
    pub informational: Vec<String>,
    /// Transactional keywords.
    pub transactional: Vec<String>,
    /// Navigational keywords.
    pub navigational: Vec<String>,
    /// Commercial investigation keywords.
    pub commercial_investigation: Vec<String>,
    /// Brand lexicon.
    pub brands: Vec<String>,
    /// Integration verbs.
    pub integration_verbs: Vec<String>,
    /// Score per distinct keyword match.
    pub increment: f64,
    /// Score for the brand and integration rules.
    pub context_bonus: f64,
}

impl Default for ModifierRules {
    fn default() -> Self {
        Self {
            informational: lexicon::owned(&[
                "how",
                "what",
                "why",
                "who",
                "guide",
                "tutorial",
                "learn",
                "meaning",
                "definition",
                "ideas",
                "examples",
                "steps",
            ]),
            transactional: lexicon::owned(&[
                "buy", "price", "deal", "discount", "coupon", "book", "order", "subscribe",
                "download", "purchase", "cheap",
            ]),
            navigational: lexicon::owned(&[
                "login",
                "log in",
                "sign in",
                "official",
                "homepage",
                "website",
                "near me",
                "locations",
                "contact",
            ]),
            commercial_investigation: lexicon::owned(&[
                "best",
                "top",
                "vs",
                "versus",
                "review",
                "reviews",
                "compare",
                "comparison",
                "alternative",
                "alternatives",
                "pros",
                "cons",
            ]),
            brands: lexicon::owned(DEFAULT_BRANDS),
            integration_verbs: lexicon::owned(DEFAULT_INTEGRATION_VERBS),
            increment: DEFAULT_KEYWORD_INCREMENT,
            context_bonus: DEFAULT_CONTEXT_BONUS,
        }
    }
}

impl ModifierRules {
    /// Returns the keyword list for a label.
    #[must_use]
    pub fn keywords(&self, label: IntentLabel) -> &[String] {
        match label {
            IntentLabel::Informational => &self.informational,
            IntentLabel::Transactional => &self.transactional,
            IntentLabel::Navigational => &self.navigational,
            IntentLabel::CommercialInvestigation => &self.commercial_investigation,
        }
    }

    /// Checks that increments are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if an increment is negative or not finite.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("increment", self.increment),
            ("context_bonus", self.context_bonus),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidInput(format!(
                    "rules.{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Compiles the keyword lists into a matcher.
    #[must_use]
    pub fn compile(&self) -> ModifierMatcher {
        ModifierMatcher {
            keywords: IntentLabel::ALL.map(|label| (label, lexicon::compile(self.keywords(label)))),
            brands: lexicon::compile(&self.brands),
            integration_verbs: lexicon::compile(&self.integration_verbs),
            increment: self.increment,
            context_bonus: self.context_bonus,
        }
    }
}

/// A keyword that fired for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierMatch {
    /// Intent the keyword points to.
    pub label: IntentLabel,
    /// The normalized keyword.
    pub keyword: String,
}

/// Compiled modifier rules, ready to score queries.
#[derive(Debug, Clone)]
pub struct ModifierMatcher {
    keywords: [(IntentLabel, Vec<Phrase>); 4],
    brands: Vec<Phrase>,
    integration_verbs: Vec<Phrase>,
    increment: f64,
    context_bonus: f64,
}

impl Default for ModifierMatcher {
    fn default() -> Self {
        DEFAULT_MATCHER.clone()
    }
}

impl ModifierMatcher {
    /// Lists the keywords that fire for a query, in label order.
    #[must_use]
    pub fn matches(&self, query: &Query) -> Vec<ModifierMatch> {
        let tokens = query.tokens();
        self.keywords
            .iter()
            .flat_map(|(label, phrases)| {
                lexicon::matches(phrases, &tokens)
                    .into_iter()
                    .map(|phrase| ModifierMatch {
                        label: *label,
                        keyword: phrase.as_str().to_string(),
                    })
            })
            .collect()
    }

    /// Number of distinct brands mentioned in the query.
    #[must_use]
    pub fn brand_count(&self, query: &Query) -> usize {
        lexicon::matches(&self.brands, &query.tokens()).len()
    }

    /// Scores a query.
    ///
    /// Each distinct keyword adds the increment to its intent. One brand adds
    /// the context bonus to Navigational; two or more brands, or any
    /// integration verb, add it to Informational. Scores are capped at 100.
    #[must_use]
    pub fn score(&self, query: &Query) -> ScoreVector {
        let tokens = query.tokens();
        let mut vector = ScoreVector::zero();

        for m in self.matches(query) {
            vector.add(m.label, self.increment);
        }

        match lexicon::matches(&self.brands, &tokens).len() {
            0 => {},
            1 => vector.add(IntentLabel::Navigational, self.context_bonus),
            _ => vector.add(IntentLabel::Informational, self.context_bonus),
        }

        if lexicon::any_match(&self.integration_verbs, &tokens) {
            vector.add(IntentLabel::Informational, self.context_bonus);
        }

        vector.capped(SCORE_SCALE)
    }
}

/// Scores a query with the default modifier rules.
///
/// Pure and deterministic. A query with no recognized modifier yields an
/// all-zero vector, which means "no modifier signal" rather than an error.
#[must_use]
pub fn extract_modifiers(query: &Query) -> ScoreVector {
    DEFAULT_MATCHER.score(query)
}
