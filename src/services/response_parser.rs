//! Model response parsing.
//!
//! Strategies run in order and the first one that yields a usable score
//! distribution wins:
//!
//! 1. The whole response is a JSON document.
//! 2. A JSON object embedded in the text, from a code fence or the first
//!    balanced `{...}` that parses.
//! 3. `Label: number` pairs, requiring at least two distinct labels.
//!
//! A document "parses" only when it carries scores for at least one known
//! label. Anything else falls through to the next strategy, and exhausting
//! the chain is a [`Error::MalformedResponse`]. Scores that are all zero are
//! kept; normalization turns them into an equal split.

#![allow(clippy::expect_used)]

use crate::models::{IntentLabel, ScoreVector};
use crate::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n?(.*?)```").expect("static regex: fenced block")
});

static KEY_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)["'*]*(informational|transactional|navigational|commercial[ _-]?investigation|commercial)["'*]*\s*(?:[:=]|-)\s*["']?(\d{1,3}(?:\.\d+)?)\s*%?"#,
    )
    .expect("static regex: key value score")
});

static REASONING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?im)^\W*reasoning\W*\s*[:=]\s*"?([^"\r\n]+)"?"#)
        .expect("static regex: reasoning line")
});

/// How a response was parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// The response was a JSON document.
    StrictJson,
    /// JSON was found inside surrounding text.
    EmbeddedJson,
    /// Scores were read from `Label: number` pairs.
    KeyValue,
}

impl ParseStrategy {
    /// Returns the strategy name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StrictJson => "strict_json",
            Self::EmbeddedJson => "embedded_json",
            Self::KeyValue => "key_value",
        }
    }
}

/// A parsed model judgment.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedJudgment {
    /// Raw scores as stated by the model.
    pub scores: ScoreVector,
    /// The primary intent the model named, if recognizable.
    pub stated_primary: Option<IntentLabel>,
    /// The secondary intent the model named, if recognizable.
    pub stated_secondary: Option<IntentLabel>,
    /// The model's rationale.
    pub reasoning: Option<String>,
    /// Which strategy succeeded.
    pub strategy: ParseStrategy,
}

/// Parses a model response into a judgment.
///
/// # Errors
///
/// Returns [`Error::MalformedResponse`] when no strategy finds usable scores.
pub fn parse_model_response(text: &str) -> Result<ParsedJudgment> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        record_parse("none", "failure");
        return Err(Error::MalformedResponse {
            cause: "empty response".to_string(),
        });
    }

    let parsed = parse_strict(trimmed)
        .or_else(|| parse_embedded(trimmed))
        .or_else(|| parse_key_value(trimmed));

    match parsed {
        Some(judgment) => {
            record_parse(judgment.strategy.as_str(), "success");
            if judgment.strategy != ParseStrategy::StrictJson {
                tracing::debug!(
                    strategy = judgment.strategy.as_str(),
                    "Model response needed a fallback parse strategy"
                );
            }
            Ok(judgment)
        },
        None => {
            record_parse("none", "failure");
            Err(Error::MalformedResponse {
                cause: format!(
                    "no intent scores found in response: {}",
                    preview(trimmed, 120)
                ),
            })
        },
    }
}

fn record_parse(strategy: &'static str, status: &'static str) {
    metrics::counter!(
        "intent_model_parse_total",
        "strategy" => strategy,
        "status" => status
    )
    .increment(1);
}

fn parse_strict(text: &str) -> Option<ParsedJudgment> {
    let value: Value = serde_json::from_str(text).ok()?;
    judgment_from_value(&value, ParseStrategy::StrictJson)
}

fn parse_embedded(text: &str) -> Option<ParsedJudgment> {
    let fenced = FENCED_BLOCK
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find_map(|body| {
            let value: Value = serde_json::from_str(body.as_str().trim()).ok()?;
            judgment_from_value(&value, ParseStrategy::EmbeddedJson)
        });
    if fenced.is_some() {
        return fenced;
    }

    balanced_objects(text).find_map(|candidate| {
        let value: Value = serde_json::from_str(candidate).ok()?;
        judgment_from_value(&value, ParseStrategy::EmbeddedJson)
    })
}

fn parse_key_value(text: &str) -> Option<ParsedJudgment> {
    let mut scores = ScoreVector::zero();
    let mut seen: Vec<IntentLabel> = Vec::new();
    for caps in KEY_VALUE.captures_iter(text) {
        let Some(label) = IntentLabel::parse(&caps[1]) else {
            continue;
        };
        if seen.contains(&label) {
            continue;
        }
        let Ok(score) = caps[2].parse::<f64>() else {
            continue;
        };
        scores.set(label, score);
        seen.push(label);
    }

    if seen.len() < 2 {
        return None;
    }
    let reasoning = REASONING_LINE
        .captures(text)
        .map(|caps| caps[1].trim().to_string());
    Some(ParsedJudgment {
        scores,
        stated_primary: None,
        stated_secondary: None,
        reasoning,
        strategy: ParseStrategy::KeyValue,
    })
}

fn judgment_from_value(value: &Value, strategy: ParseStrategy) -> Option<ParsedJudgment> {
    let object = value.as_object()?;
    let raw_scores = object
        .get("confidence_scores")
        .or_else(|| object.get("scores"))
        .and_then(Value::as_object)?;

    let mut scores = ScoreVector::zero();
    let mut recognized = false;
    for (key, raw) in raw_scores {
        let Some(label) = IntentLabel::parse(key) else {
            continue;
        };
        let Some(score) = number(raw) else {
            continue;
        };
        scores.add(label, score);
        recognized = true;
    }
    if !recognized {
        return None;
    }

    let label_field = |name: &str| {
        object
            .get(name)
            .and_then(Value::as_str)
            .and_then(IntentLabel::parse)
    };
    let reasoning = object
        .get("reasoning")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(ToString::to_string);

    Some(ParsedJudgment {
        scores,
        stated_primary: label_field("primary_intent"),
        stated_secondary: label_field("secondary_intent"),
        reasoning,
        strategy,
    })
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}

/// Yields each balanced `{...}` span in order of its opening brace.
fn balanced_objects(text: &str) -> impl Iterator<Item = &str> {
    text.char_indices()
        .filter(|(_, c)| *c == '{')
        .filter_map(move |(start, _)| matching_brace(text, start).map(|end| &text[start..=end]))
}

fn matching_brace(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {},
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset);
                }
            },
            _ => {},
        }
    }
    None
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRICT: &str = r#"{
        "primary_intent": "Transactional",
        "secondary_intent": "Commercial Investigation",
        "confidence_scores": {
            "Informational": 10,
            "Transactional": 70,
            "Navigational": 5,
            "Commercial Investigation": 15
        },
        "reasoning": "The query contains 'buy'."
    }"#;

    #[test]
    fn test_strict_json() {
        let parsed = parse_model_response(STRICT).unwrap();
        assert_eq!(parsed.strategy, ParseStrategy::StrictJson);
        assert_eq!(parsed.stated_primary, Some(IntentLabel::Transactional));
        assert_eq!(
            parsed.stated_secondary,
            Some(IntentLabel::CommercialInvestigation)
        );
        assert!((parsed.scores.get(IntentLabel::Transactional) - 70.0).abs() < 1e-9);
        assert_eq!(parsed.reasoning.as_deref(), Some("The query contains 'buy'."));
    }

    #[test]
    fn test_fenced_json() {
        let text = format!("Sure! Here is my analysis:\n```json\n{STRICT}\n```\nHope it helps.");
        let parsed = parse_model_response(&text).unwrap();
        assert_eq!(parsed.strategy, ParseStrategy::EmbeddedJson);
        assert_eq!(parsed.scores.argmax(), IntentLabel::Transactional);
    }

    #[test]
    fn test_first_balanced_object_with_scores_wins() {
        let text = r#"Note {"unrelated": true} then {"confidence_scores": {"navigational": "80%", "informational": 20}} and {"confidence_scores": {"transactional": 99}}"#;
        let parsed = parse_model_response(text).unwrap();
        assert_eq!(parsed.strategy, ParseStrategy::EmbeddedJson);
        assert_eq!(parsed.scores.argmax(), IntentLabel::Navigational);
    }

    #[test]
    fn test_braces_inside_strings() {
        let text = r#"prefix {"reasoning": "uses } brace", "scores": {"Informational": 60, "Navigational": 40}} suffix"#;
        let parsed = parse_model_response(text).unwrap();
        assert_eq!(parsed.reasoning.as_deref(), Some("uses } brace"));
    }

    #[test]
    fn test_key_value_fallback() {
        let text = "Informational: 20\nTransactional: 10\nNavigational: 5\nCommercial Investigation: 65\nReasoning: comparison words dominate";
        let parsed = parse_model_response(text).unwrap();
        assert_eq!(parsed.strategy, ParseStrategy::KeyValue);
        assert_eq!(parsed.scores.argmax(), IntentLabel::CommercialInvestigation);
        assert_eq!(
            parsed.reasoning.as_deref(),
            Some("comparison words dominate")
        );
    }

    #[test]
    fn test_key_value_needs_two_labels() {
        let err = parse_model_response("I think Transactional: 90").unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[test]
    fn test_all_zero_scores_accepted() {
        let text = r#"{"primary_intent": "Navigational", "confidence_scores": {"Informational": 0, "Transactional": 0, "Navigational": 0, "Commercial Investigation": 0}}"#;
        let parsed = parse_model_response(text).unwrap();
        assert_eq!(parsed.strategy, ParseStrategy::StrictJson);
        assert!(parsed.scores.is_zero());
        assert_eq!(parsed.stated_primary, Some(IntentLabel::Navigational));
    }

    #[test]
    fn test_all_zero_key_values_accepted() {
        let parsed = parse_model_response("Informational: 0\nNavigational: 0").unwrap();
        assert_eq!(parsed.strategy, ParseStrategy::KeyValue);
        assert!(parsed.scores.is_zero());
    }

    #[test]
    fn test_unknown_labels_rejected() {
        let text = r#"{"confidence_scores": {"Local": 80, "Shopping": 20}}"#;
        assert!(parse_model_response(text).is_err());
    }

    #[test]
    fn test_garbage_and_empty() {
        assert!(parse_model_response("").is_err());
        assert!(parse_model_response("I cannot help with that.").is_err());
        assert!(parse_model_response("{ not json").is_err());
    }
}
