//! Shared vocabularies and phrase matching for the rule-based scorers.

use crate::models::tokenize;

/// Brands whose single mention suggests a navigational query, and whose
/// co-occurrence suggests an integration question.
pub const DEFAULT_BRANDS: &[&str] = &[
    "facebook",
    "instagram",
    "twitter",
    "linkedin",
    "youtube",
    "netflix",
    "spotify",
    "amazon",
    "ebay",
    "walmart",
    "google",
    "gmail",
    "nest",
    "apple",
    "iphone",
    "siri",
    "homekit",
    "homepod",
    "alexa",
    "microsoft",
    "outlook",
    "samsung",
    "smartthings",
    "nike",
    "adidas",
    "ikea",
    "philips hue",
    "paypal",
    "reddit",
    "github",
];

/// Verbs that mark a query or page about making products work together.
pub const DEFAULT_INTEGRATION_VERBS: &[&str] = &[
    "connect",
    "pair",
    "link",
    "enable",
    "setup",
    "set up",
    "integrate",
    "integration",
    "bridge",
    "work with",
    "works with",
];

/// A keyword or multi-word phrase matched against token boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    text: String,
    tokens: Vec<String>,
}

impl Phrase {
    /// Builds a phrase; returns `None` if it has no alphanumeric content.
    #[must_use]
    pub fn new(text: &str) -> Option<Self> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return None;
        }
        Some(Self {
            text: tokens.join(" "),
            tokens,
        })
    }

    /// Normalized phrase text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns true if the phrase occurs as contiguous tokens.
    #[must_use]
    pub fn occurs_in(&self, tokens: &[String]) -> bool {
        tokens
            .windows(self.tokens.len())
            .any(|window| window == self.tokens.as_slice())
    }
}

/// Compiles a word list into phrases, dropping blanks and duplicates.
#[must_use]
pub fn compile<S: AsRef<str>>(words: &[S]) -> Vec<Phrase> {
    let mut phrases: Vec<Phrase> = Vec::with_capacity(words.len());
    for phrase in words.iter().filter_map(|w| Phrase::new(w.as_ref())) {
        if !phrases.contains(&phrase) {
            phrases.push(phrase);
        }
    }
    phrases
}

/// Returns the phrases from `phrases` that occur in `tokens`.
#[must_use]
pub fn matches<'a>(phrases: &'a [Phrase], tokens: &[String]) -> Vec<&'a Phrase> {
    phrases.iter().filter(|p| p.occurs_in(tokens)).collect()
}

/// Returns true if any phrase occurs in `tokens`.
#[must_use]
pub fn any_match(phrases: &[Phrase], tokens: &[String]) -> bool {
    phrases.iter().any(|p| p.occurs_in(tokens))
}

/// Converts a static word list to owned strings.
#[must_use]
pub fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}
