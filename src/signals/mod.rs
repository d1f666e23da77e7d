//! Signal extraction.
//!
//! Each scorer maps one kind of evidence to an unnormalized per-intent
//! [`ScoreVector`](crate::models::ScoreVector):
//!
//! | Source | Entry point | Input |
//! |--------|-------------|-------|
//! | Modifiers | [`extract_modifiers`] | query text |
//! | SERP | [`score_serp`] | [`SerpFeatures`] |
//! | Content | [`score_content`] | [`PageSummary`] list |
//! | Classifier | [`ScoreProvider::score`] | query + [`SignalContext`] |
//!
//! The first three are pure functions. The classifier slot is pluggable and
//! may be absent.

mod classifier;
mod content;
pub mod lexicon;
mod modifiers;
mod serp;

pub use classifier::{
    ClassifierAdapter, IntentClassifier, LexiconModel, ScoreProvider, SignalContext,
    UrlPatternClassifier, score_classifier,
};
pub use content::{PageSummary, SchemaType, score_content};
pub use modifiers::{
    DEFAULT_CONTEXT_BONUS, DEFAULT_KEYWORD_INCREMENT, ModifierMatch, ModifierMatcher,
    ModifierRules, extract_modifiers,
};
pub use serp::{DomainCategory, SerpFeatures, score_serp};
