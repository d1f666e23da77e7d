//! Intent classification prompt.

use crate::models::{IntentLabel, Query};
use crate::signals::SignalContext;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Context results included in a prompt.
const MAX_CONTEXT_RESULTS: usize = 5;

/// Sampling parameters for intent prompts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingOptions {
    /// Sampling temperature; low for consistent judgments.
    pub temperature: f32,
    /// Nucleus sampling threshold.
    pub top_p: f32,
    /// Top-k cutoff.
    pub top_k: u32,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.9,
            top_k: 40,
        }
    }
}

const fn examples(label: IntentLabel) -> &'static str {
    match label {
        IntentLabel::Informational => {
            r#""how to tie a tie", "what is machine learning", "python tutorial""#
        },
        IntentLabel::Transactional => {
            r#""buy iPhone 15", "download spotify premium", "book hotel NYC""#
        },
        IntentLabel::Navigational => {
            r#""facebook login", "amazon official site", "netflix homepage""#
        },
        IntentLabel::CommercialInvestigation => {
            r#""best laptops 2024", "iPhone vs Samsung", "Nike shoes review""#
        },
    }
}

/// Builds the structured intent prompt for one query.
///
/// The prompt lists the four categories with examples and asks for a JSON
/// object with `primary_intent`, `secondary_intent`, `confidence_scores`
/// for all four intents on a 0-100 scale, and `reasoning`. When search
/// context is supplied the top result titles and URLs are appended as
/// evidence.
#[must_use]
pub fn build_intent_prompt(query: &Query, context: Option<&SignalContext>) -> String {
    let mut prompt = String::with_capacity(2048);
    prompt.push_str(
        "You are an expert SEO analyst specializing in search intent classification. \
         Analyze the following search query and determine the user's search intent.\n\n",
    );
    // Query text is embedded as a JSON string so quotes cannot break the frame.
    let quoted = serde_json::to_string(query.as_str()).unwrap_or_default();
    let _ = writeln!(prompt, "Search query: {quoted}\n");

    prompt.push_str("Intent categories:\n");
    for (i, label) in IntentLabel::ALL.iter().enumerate() {
        let _ = writeln!(
            prompt,
            "{}. {}: {}\n   Examples: {}",
            i + 1,
            label.as_str(),
            label.description(),
            examples(*label)
        );
    }

    if let Some(context) = context.filter(|c| !c.is_empty()) {
        prompt.push_str("\nTop search results for this query:\n");
        for (i, title) in context.titles.iter().take(MAX_CONTEXT_RESULTS).enumerate() {
            let url = context.urls.get(i).map_or("", String::as_str);
            let _ = writeln!(prompt, "- {} ({url})", title.trim());
        }
    }

    prompt.push_str(
        r#"
Instructions:
1. Consider keywords, structure, and implied user intent.
2. Assign a primary intent (most likely) and a secondary intent (next most likely).
3. Provide confidence scores from 0 to 100 for ALL four intents.
4. Explain your reasoning in 1-2 sentences.

Output format (JSON only, no other text):
{
  "primary_intent": "Intent Name",
  "secondary_intent": "Intent Name",
  "confidence_scores": {
    "Informational": 25,
    "Transactional": 60,
    "Navigational": 5,
    "Commercial Investigation": 10
  },
  "reasoning": "Brief explanation of why this intent was chosen"
}

Respond ONLY with the JSON object."#,
    );
    prompt
}
