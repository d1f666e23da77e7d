//! SERP structural signals.
// Allow expect() on static regex patterns - these are guaranteed to compile
#![allow(clippy::expect_used)]

use super::lexicon::{self, DEFAULT_INTEGRATION_VERBS, Phrase};
use crate::models::{IntentLabel, Query, SCORE_SCALE, ScoreVector, tokenize};
use crate::search::SearchResult;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Score for a shopping block.
pub const SHOPPING_BONUS: f64 = 40.0;
/// Score for a local pack or map.
pub const LOCAL_PACK_BONUS: f64 = 25.0;
/// Score for a knowledge panel.
pub const KNOWLEDGE_PANEL_BONUS: f64 = 30.0;
/// Score for a people-also-ask block and for a featured snippet, each.
pub const QUESTION_BLOCK_BONUS: f64 = 20.0;
/// Score for a video carousel.
pub const VIDEO_BONUS: f64 = 10.0;
/// Score for a text cue group.
pub const TEXT_CUE_BONUS: f64 = 15.0;
/// Score for the navigational text cue group.
pub const NAVIGATIONAL_CUE_BONUS: f64 = 10.0;

/// Domain shares scaled into intents: `(categories, intent, multiplier)`.
const DOMAIN_RULES: &[(&[DomainCategory], IntentLabel, f64)] = &[
    (&[DomainCategory::Ecommerce], IntentLabel::Transactional, 40.0),
    (&[DomainCategory::Official], IntentLabel::Navigational, 50.0),
    (
        &[
            DomainCategory::Reference,
            DomainCategory::Blog,
            DomainCategory::Forum,
        ],
        IntentLabel::Informational,
        30.0,
    ),
    (&[DomainCategory::Review], IntentLabel::CommercialInvestigation, 40.0),
];

struct TextCue {
    label: IntentLabel,
    phrases: Vec<Phrase>,
    bonus: f64,
}

static TEXT_CUES: LazyLock<Vec<TextCue>> = LazyLock::new(|| {
    vec![
        TextCue {
            label: IntentLabel::Informational,
            phrases: lexicon::compile(&[
                "how to",
                "what is",
                "guide",
                "tutorial",
                "faq",
                "people also ask",
            ]),
            bonus: TEXT_CUE_BONUS,
        },
        TextCue {
            label: IntentLabel::Informational,
            phrases: lexicon::compile(DEFAULT_INTEGRATION_VERBS),
            bonus: TEXT_CUE_BONUS,
        },
        TextCue {
            label: IntentLabel::Transactional,
            phrases: lexicon::compile(&["buy", "price", "add to cart", "checkout", "shop"]),
            bonus: TEXT_CUE_BONUS,
        },
        TextCue {
            label: IntentLabel::Navigational,
            phrases: lexicon::compile(&["official site", "login", "log in", "contact us"]),
            bonus: NAVIGATIONAL_CUE_BONUS,
        },
        TextCue {
            label: IntentLabel::CommercialInvestigation,
            phrases: lexicon::compile(&["review", "reviews", "best", "top", "vs", "comparison"]),
            bonus: TEXT_CUE_BONUS,
        },
    ]
});

static QUESTION_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(how|what|why|when|who|which|can|is|are|does)\b")
        .expect("static regex: question title")
});

/// Coarse category of a result's site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainCategory {
    /// Online store or marketplace.
    Ecommerce,
    /// The official site of a brand named in the query.
    Official,
    /// Forum, Q&A or code hosting community.
    Forum,
    /// Encyclopedia, dictionary or documentation.
    Reference,
    /// Blog or publishing platform.
    Blog,
    /// Video platform.
    Video,
    /// Review or comparison site.
    Review,
    /// News outlet.
    News,
    /// Anything else.
    Other,
}

const VIDEO_HOSTS: &[&str] = &["youtube.com", "youtu.be", "vimeo.com", "tiktok.com"];
const REFERENCE_HOSTS: &[&str] = &[
    "wikipedia.org",
    "britannica.com",
    "investopedia.com",
    "merriam-webster.com",
    "dictionary.com",
    "wikihow.com",
];
const FORUM_HOSTS: &[&str] = &[
    "reddit.com",
    "quora.com",
    "stackoverflow.com",
    "stackexchange.com",
    "github.com",
];
const REVIEW_HOSTS: &[&str] = &[
    "g2.com",
    "capterra.com",
    "trustpilot.com",
    "cnet.com",
    "pcmag.com",
    "rtings.com",
    "techradar.com",
    "tomsguide.com",
    "consumerreports.org",
];
const ECOMMERCE_HOSTS: &[&str] = &[
    "amazon.",
    "ebay.",
    "walmart.com",
    "etsy.com",
    "bestbuy.com",
    "target.com",
    "aliexpress.com",
];
const BLOG_HOSTS: &[&str] = &["medium.com", "hashnode.", "substack.com", "wordpress.com", "blogspot."];
const NEWS_HOSTS: &[&str] = &[
    "cnn.com",
    "bbc.",
    "nytimes.com",
    "reuters.com",
    "theguardian.com",
    "apnews.com",
];
const ACCOUNT_SUBDOMAINS: &[&str] = &["login.", "signin.", "account.", "accounts.", "my."];

fn host_matches(host: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| {
        if p.ends_with('.') {
            host.starts_with(p) || host.contains(&format!(".{p}"))
        } else {
            host == *p || host.ends_with(&format!(".{p}"))
        }
    })
}

impl DomainCategory {
    /// Classifies a URL, treating hosts named after a query token as official.
    #[must_use]
    pub fn classify(url: &str, query_tokens: &[String]) -> Self {
        let Ok(parsed) = reqwest::Url::parse(url) else {
            return Self::Other;
        };
        let Some(host) = parsed.host_str() else {
            return Self::Other;
        };
        let host = host.trim_start_matches("www.").to_lowercase();
        let path = parsed.path().to_lowercase();

        let site_name = host.rsplit('.').nth(1).unwrap_or_default();
        let is_query_brand = !site_name.is_empty() && query_tokens.iter().any(|t| t == site_name);

        if host_matches(&host, VIDEO_HOSTS) {
            Self::Video
        } else if is_query_brand || ACCOUNT_SUBDOMAINS.iter().any(|p| host.starts_with(p)) {
            Self::Official
        } else if host_matches(&host, REFERENCE_HOSTS) || host.ends_with(".edu") || host.starts_with("docs.") {
            Self::Reference
        } else if host_matches(&host, FORUM_HOSTS) || host.contains("forum") || host.starts_with("community.") {
            Self::Forum
        } else if host_matches(&host, REVIEW_HOSTS)
            || path.contains("review")
            || path.contains("-vs-")
            || path.contains("comparison")
        {
            Self::Review
        } else if host_matches(&host, ECOMMERCE_HOSTS)
            || host.contains("shop")
            || host.contains("store")
            || path.contains("/product")
            || path.contains("/cart")
        {
            Self::Ecommerce
        } else if host_matches(&host, BLOG_HOSTS) || host.starts_with("blog.") || path.contains("/blog") {
            Self::Blog
        } else if host_matches(&host, NEWS_HOSTS) || host.contains("news") {
            Self::News
        } else {
            Self::Other
        }
    }
}

/// Structural features of one results page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerpFeatures {
    /// Shopping or product listing block.
    pub shopping: bool,
    /// Local pack or map.
    pub local_pack: bool,
    /// Knowledge panel.
    pub knowledge_panel: bool,
    /// People-also-ask block.
    pub people_also_ask: bool,
    /// Featured snippet.
    pub featured_snippet: bool,
    /// Video carousel.
    pub video: bool,
    /// Number of organic results observed.
    pub result_count: usize,
    /// Result counts per domain category.
    pub domains: BTreeMap<DomainCategory, usize>,
    /// Titles and snippets.
    pub text_samples: Vec<String>,
}

impl SerpFeatures {
    /// Derives features from raw search results.
    ///
    /// The search API returns organic results only, so block flags are
    /// inferred: a shopping block from store results or cart language, a
    /// knowledge panel from a reference site in the top three, a featured
    /// snippet from a question-style top result, and so on.
    #[must_use]
    pub fn from_results(query: &Query, results: &[SearchResult]) -> Self {
        let query_tokens = query.tokens();
        let mut features = Self {
            result_count: results.len(),
            ..Self::default()
        };

        for result in results {
            let category = DomainCategory::classify(&result.url, &query_tokens);
            *features.domains.entry(category).or_default() += 1;

            let sample = format!("{} {}", result.title, result.description);
            if !sample.trim().is_empty() {
                features.text_samples.push(sample.trim().to_string());
            }
        }

        let text_tokens = tokenize(&features.text_samples.join("\n"));
        let has = |words: &[&str]| lexicon::any_match(&lexicon::compile(words), &text_tokens);

        features.shopping = features.count(DomainCategory::Ecommerce) >= 2
            || has(&["add to cart", "free shipping", "in stock"]);
        features.local_pack = has(&["near me", "directions", "opening hours", "open now"])
            || results
                .iter()
                .any(|r| r.url.contains("maps.google.") || r.url.contains("yelp.com"));
        features.knowledge_panel = results.iter().take(3).any(|r| {
            DomainCategory::classify(&r.url, &query_tokens) == DomainCategory::Reference
        });
        features.people_also_ask = has(&["people also ask", "faq", "frequently asked"]);
        features.featured_snippet = results
            .first()
            .is_some_and(|r| QUESTION_TITLE.is_match(&r.title));
        features.video = features.count(DomainCategory::Video) > 0;

        features
    }

    /// Number of results in a domain category.
    #[must_use]
    pub fn count(&self, category: DomainCategory) -> usize {
        self.domains.get(&category).copied().unwrap_or_default()
    }

    /// Share of results in the given categories, in `[0, 1]`.
    #[must_use]
    pub fn share(&self, categories: &[DomainCategory]) -> f64 {
        if self.result_count == 0 {
            return 0.0;
        }
        let count: usize = categories.iter().map(|c| self.count(*c)).sum();
        #[allow(clippy::cast_precision_loss)]
        let share = count as f64 / self.result_count as f64;
        share.min(1.0)
    }
}

/// Maps SERP features to per-intent partial scores.
///
/// Pure. Block flags add fixed amounts, domain shares scale into their
/// intent, and each text cue group adds once. Scores are capped at 100.
#[must_use]
pub fn score_serp(features: &SerpFeatures) -> ScoreVector {
    let mut vector = ScoreVector::zero();

    let flags = [
        (features.shopping, IntentLabel::Transactional, SHOPPING_BONUS),
        (features.local_pack, IntentLabel::Navigational, LOCAL_PACK_BONUS),
        (features.knowledge_panel, IntentLabel::Informational, KNOWLEDGE_PANEL_BONUS),
        (features.people_also_ask, IntentLabel::Informational, QUESTION_BLOCK_BONUS),
        (features.featured_snippet, IntentLabel::Informational, QUESTION_BLOCK_BONUS),
        (features.video, IntentLabel::Informational, VIDEO_BONUS),
    ];
    for (present, label, bonus) in flags {
        if present {
            vector.add(label, bonus);
        }
    }

    for (categories, label, multiplier) in DOMAIN_RULES {
        vector.add(*label, features.share(categories) * multiplier);
    }

    let tokens = tokenize(&features.text_samples.join("\n"));
    for cue in TEXT_CUES.iter() {
        if lexicon::any_match(&cue.phrases, &tokens) {
            vector.add(cue.label, cue.bonus);
        }
    }

    vector.capped(SCORE_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(url: &str, title: &str) -> SearchResult {
        SearchResult {
            url: url.to_string(),
            title: title.to_string(),
            ..SearchResult::default()
        }
    }

    #[test]
    fn test_empty_features_score_zero() {
        assert!(score_serp(&SerpFeatures::default()).is_zero());
    }

    #[test]
    fn test_shopping_block_is_transactional() {
        let features = SerpFeatures {
            shopping: true,
            result_count: 10,
            domains: BTreeMap::from([(DomainCategory::Ecommerce, 5)]),
            ..SerpFeatures::default()
        };
        let v = score_serp(&features);
        // 40 + 0.5 * 40
        assert!((v.get(IntentLabel::Transactional) - 60.0).abs() < 1e-9);
        assert_eq!(v.argmax(), IntentLabel::Transactional);
    }

    #[test]
    fn test_question_blocks_are_informational() {
        let features = SerpFeatures {
            knowledge_panel: true,
            people_also_ask: true,
            featured_snippet: true,
            video: true,
            ..SerpFeatures::default()
        };
        let v = score_serp(&features);
        assert!((v.get(IntentLabel::Informational) - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_text_cues_add_once_per_group() {
        let features = SerpFeatures {
            text_samples: vec![
                "Best laptops 2024 review".to_string(),
                "Top 10 laptops: a comparison".to_string(),
            ],
            ..SerpFeatures::default()
        };
        let v = score_serp(&features);
        assert!((v.get(IntentLabel::CommercialInvestigation) - TEXT_CUE_BONUS).abs() < 1e-9);
        // "laptops" must not trigger the "top" cue on its own
        assert!(v.get(IntentLabel::Transactional).abs() < 1e-9);
    }

    #[test]
    fn test_classify_domains() {
        let tokens = vec!["facebook".to_string(), "login".to_string()];
        assert_eq!(
            DomainCategory::classify("https://www.facebook.com/login", &tokens),
            DomainCategory::Official
        );
        assert_eq!(
            DomainCategory::classify("https://en.wikipedia.org/wiki/Tie", &[]),
            DomainCategory::Reference
        );
        assert_eq!(
            DomainCategory::classify("https://www.reddit.com/r/smarthome/", &[]),
            DomainCategory::Forum
        );
        assert_eq!(
            DomainCategory::classify("https://www.amazon.com/dp/B0", &[]),
            DomainCategory::Ecommerce
        );
        assert_eq!(
            DomainCategory::classify("https://youtu.be/abc", &[]),
            DomainCategory::Video
        );
        assert_eq!(DomainCategory::classify("not a url", &[]), DomainCategory::Other);
    }

    #[test]
    fn test_from_results_infers_blocks() {
        let query = Query::parse("how to tie a tie").unwrap();
        let results = vec![
            result("https://en.wikipedia.org/wiki/Necktie", "How to tie a tie"),
            result("https://www.youtube.com/watch?v=1", "Tie tutorial"),
            result("https://www.amazon.com/ties", "Silk ties"),
        ];
        let features = SerpFeatures::from_results(&query, &results);

        assert_eq!(features.result_count, 3);
        assert!(features.knowledge_panel);
        assert!(features.featured_snippet);
        assert!(features.video);
        assert!(!features.shopping);
        assert_eq!(score_serp(&features).argmax(), IntentLabel::Informational);
    }
}
