//! Content cues from the top ranking pages.
// Allow expect() on static regex patterns - these are guaranteed to compile
#![allow(clippy::expect_used)]

use super::lexicon::{self, DEFAULT_INTEGRATION_VERBS, Phrase};
use crate::models::{IntentLabel, SCORE_SCALE, ScoreVector, tokenize};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

const PRIMARY_CUE: f64 = 50.0;
const LOGIN_CUE: f64 = 40.0;
const MIXED_PRODUCT_INFO: f64 = 35.0;
const MIXED_PRODUCT_PENALTY: f64 = 15.0;
const PRICE_CUE: f64 = 25.0;
const INTEGRATION_CUE: f64 = 25.0;
const HEADING_CUE: f64 = 20.0;
const MAX_HEADINGS: usize = 12;

const CALLS_TO_ACTION: &[&str] = &[
    "buy now",
    "add to cart",
    "order now",
    "checkout",
    "subscribe",
    "sign up",
    "download",
    "book now",
    "get started",
];

static PRICE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([$€£¥]\s?\d[\d,]*(\.\d{2})?|\d[\d,]*(\.\d{2})?\s?(usd|eur|gbp))")
        .expect("static regex: price")
});

static HEADING_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]{0,3}#{1,6}[ \t]+(.+?)[ \t]*#*[ \t]*$").expect("static regex: heading"));

struct PhraseSet {
    cta: Vec<Phrase>,
    cart: Vec<Phrase>,
    login: Vec<Phrase>,
    integration: Vec<Phrase>,
    headings: Vec<(IntentLabel, Vec<Phrase>)>,
}

static PHRASES: LazyLock<PhraseSet> = LazyLock::new(|| PhraseSet {
    cta: lexicon::compile(CALLS_TO_ACTION),
    cart: lexicon::compile(&["add to cart", "checkout", "shopping cart"]),
    login: lexicon::compile(&["login", "log in", "sign in"]),
    integration: lexicon::compile(DEFAULT_INTEGRATION_VERBS),
    headings: vec![
        (
            IntentLabel::Informational,
            lexicon::compile(&["how to", "what is", "guide", "tutorial", "faq", "steps"]),
        ),
        (
            IntentLabel::Transactional,
            lexicon::compile(&["buy", "price", "pricing", "shop", "order"]),
        ),
        (
            IntentLabel::Navigational,
            lexicon::compile(&["login", "sign in", "contact us", "official"]),
        ),
        (
            IntentLabel::CommercialInvestigation,
            lexicon::compile(&["review", "best", "vs", "comparison", "alternatives"]),
        ),
    ],
});

/// Structured-data schema types detected on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SchemaType {
    /// FAQ page markup.
    #[serde(rename = "FAQ")]
    Faq,
    /// HowTo markup.
    HowTo,
    /// Product markup.
    Product,
    /// Review or aggregate rating markup.
    Review,
}

/// Summary of one fetched page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    /// Page URL.
    pub url: String,
    /// Heading samples.
    pub headings: Vec<String>,
    /// A price is shown.
    pub has_price: bool,
    /// A cart or checkout is present.
    pub has_cart: bool,
    /// A login form or link is present.
    pub has_login: bool,
    /// The page talks about connecting products together.
    pub has_integration: bool,
    /// Calls to action found on the page.
    pub calls_to_action: Vec<String>,
    /// Structured-data schema types.
    pub schema_types: Vec<SchemaType>,
}

impl PageSummary {
    /// Derives page cues from fetched markdown and optional raw HTML.
    #[must_use]
    pub fn from_document(url: &str, markdown: &str, html: Option<&str>) -> Self {
        let html = html.unwrap_or_default().to_lowercase();
        let tokens = tokenize(markdown);
        let phrases = &*PHRASES;

        let headings: Vec<String> = HEADING_LINE
            .captures_iter(markdown)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .take(MAX_HEADINGS)
            .collect();

        let calls_to_action: Vec<String> = lexicon::matches(&phrases.cta, &tokens)
            .into_iter()
            .map(|p| p.as_str().to_string())
            .collect();

        let mut schema_types = Vec::new();
        if tokens.iter().any(|t| t == "faq") || html.contains("faqpage") {
            schema_types.push(SchemaType::Faq);
        }
        if html.contains("howto") || html.contains("how-to") {
            schema_types.push(SchemaType::HowTo);
        }
        if html.contains("product") && (html.contains("price") || html.contains("sku")) {
            schema_types.push(SchemaType::Product);
        }
        if tokens.iter().any(|t| t == "review" || t == "reviews") || html.contains("aggregaterating") {
            schema_types.push(SchemaType::Review);
        }

        Self {
            url: url.to_string(),
            headings,
            has_price: PRICE_PATTERN.is_match(markdown),
            has_cart: lexicon::any_match(&phrases.cart, &tokens),
            has_login: lexicon::any_match(&phrases.login, &tokens),
            has_integration: lexicon::any_match(&phrases.integration, &tokens),
            calls_to_action,
            schema_types,
        }
    }

    fn has_schema(&self, schema: SchemaType) -> bool {
        self.schema_types.contains(&schema)
    }

    /// Scores this page alone, capped at 100 per intent.
    #[must_use]
    pub fn score(&self) -> ScoreVector {
        let mut vector = ScoreVector::zero();
        let product = self.has_schema(SchemaType::Product);
        let instructional = self.has_schema(SchemaType::Faq) || self.has_schema(SchemaType::HowTo);

        if !self.calls_to_action.is_empty() || self.has_cart || product {
            vector.add(IntentLabel::Transactional, PRIMARY_CUE);
        }
        if instructional {
            vector.add(IntentLabel::Informational, PRIMARY_CUE);
        }
        if self.has_schema(SchemaType::Review) {
            vector.add(IntentLabel::CommercialInvestigation, PRIMARY_CUE);
        }
        // Product pages carrying FAQ/HowTo content lean informational.
        if product && instructional {
            vector.add(IntentLabel::Informational, MIXED_PRODUCT_INFO);
            vector.add(IntentLabel::Transactional, -MIXED_PRODUCT_PENALTY);
        }
        if self.has_login {
            vector.add(IntentLabel::Navigational, LOGIN_CUE);
        }
        if self.has_price {
            vector.add(IntentLabel::Transactional, PRICE_CUE);
        }
        if self.has_integration {
            vector.add(IntentLabel::Informational, INTEGRATION_CUE);
        }

        let heading_tokens = tokenize(&self.headings.join("\n"));
        for (label, phrases) in &PHRASES.headings {
            if lexicon::any_match(phrases, &heading_tokens) {
                vector.add(*label, HEADING_CUE);
            }
        }

        vector.capped(SCORE_SCALE)
    }
}

/// Maps page summaries to per-intent partial scores.
///
/// Pages are scored individually and averaged without weighting. An empty
/// slice yields the all-zero vector.
#[must_use]
pub fn score_content(pages: &[PageSummary]) -> ScoreVector {
    if pages.is_empty() {
        return ScoreVector::zero();
    }
    let mut sum = ScoreVector::zero();
    for page in pages {
        for (label, score) in page.score().iter() {
            sum.add(label, score);
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let count = pages.len() as f64;
    sum.scaled(1.0 / count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pages_zero() {
        assert!(score_content(&[]).is_zero());
    }

    #[test]
    fn test_product_with_faq_leans_informational() {
        let page = PageSummary {
            schema_types: vec![SchemaType::Product, SchemaType::Faq],
            ..PageSummary::default()
        };
        let v = page.score();
        assert!((v.get(IntentLabel::Informational) - 85.0).abs() < 1e-9);
        assert!((v.get(IntentLabel::Transactional) - 35.0).abs() < 1e-9);
    }

    #[test]
    fn test_pages_are_averaged() {
        let shop = PageSummary {
            calls_to_action: vec!["add to cart".to_string()],
            has_price: true,
            ..PageSummary::default()
        };
        let blank = PageSummary::default();
        let v = score_content(&[shop, blank]);
        // (50 + 25) / 2
        assert!((v.get(IntentLabel::Transactional) - 37.5).abs() < 1e-9);
    }

    #[test]
    fn test_from_document_detects_cues() {
        let markdown = "# Acme Pro Review\n\nOnly $199.99. Add to cart today!\n\n## FAQ\nLog in to track your order.";
        let page = PageSummary::from_document(
            "https://shop.example.com/acme",
            markdown,
            Some(r#"<script type="application/ld+json">{"@type":"Product","sku":"A1"}</script>"#),
        );

        assert!(page.has_price);
        assert!(page.has_cart);
        assert!(page.has_login);
        assert_eq!(page.headings, vec!["Acme Pro Review", "FAQ"]);
        assert!(page.calls_to_action.contains(&"add to cart".to_string()));
        assert!(page.schema_types.contains(&SchemaType::Product));
        assert!(page.schema_types.contains(&SchemaType::Faq));
        assert!(page.schema_types.contains(&SchemaType::Review));
    }

    #[test]
    fn test_order_inside_word_is_not_a_cta() {
        let page = PageSummary::from_document("https://e.com", "A border of the recorder", None);
        assert!(page.calls_to_action.is_empty());
        assert!(page.score().is_zero());
    }
}
