//! Per-query analysis results.

use super::intent::{IntentLabel, SCORE_SCALE, ScoreVector};
use super::query::Query;
use super::weights::{EffectiveWeights, SignalSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Normalized entropy above which a distribution counts as mixed intent.
pub const MIXED_INTENT_ENTROPY: f64 = 0.85;

/// Which analysis path produced a result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPath {
    /// Rule-based signal fusion.
    #[default]
    Fusion,
    /// Local language model judgment.
    Model,
}

impl AnalysisPath {
    /// Returns the path name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fusion => "fusion",
            Self::Model => "model",
        }
    }
}

impl fmt::Display for AnalysisPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether one intent clearly dominates the distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Clarity {
    /// One intent dominates.
    Clear,
    /// Scores are spread across several intents.
    Mixed,
}

impl Clarity {
    /// Returns a display label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::Mixed => "Mixed Intent",
        }
    }
}

impl fmt::Display for Clarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a fused result was assembled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionBreakdown {
    /// Weights applied to each present source.
    pub weights: EffectiveWeights,
    /// Raw vector each present source contributed.
    pub sources: BTreeMap<SignalSource, ScoreVector>,
    /// Sources that were absent for this query.
    pub absent: Vec<SignalSource>,
    /// Weighted sum before normalization.
    pub combined: ScoreVector,
}

impl FusionBreakdown {
    /// Renders a one-line explanation naming the strongest contributor.
    #[must_use]
    pub fn summary(&self, primary: IntentLabel) -> String {
        let top = self
            .sources
            .iter()
            .filter_map(|(source, vector)| {
                self.weights
                    .get(*source)
                    .map(|w| (*source, w * vector.get(primary)))
            })
            .max_by(|a, b| a.1.total_cmp(&b.1));

        let mut parts: Vec<String> = self
            .weights
            .iter()
            .map(|(source, w)| format!("{source} {:.0}%", w * 100.0))
            .collect();
        if !self.absent.is_empty() {
            let absent: Vec<&str> = self.absent.iter().map(SignalSource::as_str).collect();
            parts.push(format!("absent: {}", absent.join(", ")));
        }

        match top {
            Some((source, contribution)) if contribution > 0.0 => format!(
                "{primary} driven mostly by {source} signals ({})",
                parts.join("; ")
            ),
            _ => format!("no source favored {primary} ({})", parts.join("; ")),
        }
    }
}

/// The outcome of analyzing one query.
///
/// Created once per query and never mutated. Scores always sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentResult {
    query: Query,
    scores: ScoreVector,
    primary: IntentLabel,
    secondary: IntentLabel,
    confidence: f64,
    reasoning: Option<String>,
    path: AnalysisPath,
    #[serde(skip_serializing_if = "Option::is_none")]
    breakdown: Option<FusionBreakdown>,
}

impl IntentResult {
    /// Builds a result from an unnormalized score vector.
    ///
    /// Scores are rescaled to sum to 100 (equal split if all zero), the
    /// primary label is the argmax with the fixed tie-break order, and the
    /// confidence is the primary label's score clipped to `[0, 100]`.
    #[must_use]
    pub fn from_scores(
        query: Query,
        raw: &ScoreVector,
        path: AnalysisPath,
        reasoning: Option<String>,
    ) -> Self {
        let scores = raw.normalized();
        let primary = scores.argmax();
        let secondary = scores.runner_up(primary);
        let confidence = scores.get(primary).clamp(0.0, SCORE_SCALE);

        Self {
            query,
            scores,
            primary,
            secondary,
            confidence,
            reasoning: reasoning.filter(|r| !r.trim().is_empty()),
            path,
            breakdown: None,
        }
    }

    /// Attaches the fusion breakdown.
    #[must_use]
    pub(crate) fn with_breakdown(mut self, breakdown: FusionBreakdown) -> Self {
        self.breakdown = Some(breakdown);
        self
    }

    /// The analyzed query.
    #[must_use]
    pub const fn query(&self) -> &Query {
        &self.query
    }

    /// Normalized scores summing to 100.
    #[must_use]
    pub const fn scores(&self) -> &ScoreVector {
        &self.scores
    }

    /// The winning intent.
    #[must_use]
    pub const fn primary(&self) -> IntentLabel {
        self.primary
    }

    /// The runner-up intent.
    #[must_use]
    pub const fn secondary(&self) -> IntentLabel {
        self.secondary
    }

    /// Score of the primary intent, in `[0, 100]`.
    #[must_use]
    pub const fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Free-text rationale, populated by the model path.
    #[must_use]
    pub fn reasoning(&self) -> Option<&str> {
        self.reasoning.as_deref()
    }

    /// Which path produced this result.
    #[must_use]
    pub const fn path(&self) -> AnalysisPath {
        self.path
    }

    /// Fusion breakdown, present on fused results.
    #[must_use]
    pub const fn breakdown(&self) -> Option<&FusionBreakdown> {
        self.breakdown.as_ref()
    }

    /// Normalized Shannon entropy of the distribution, in `[0, 1]`.
    #[must_use]
    pub fn entropy(&self) -> f64 {
        let h: f64 = self
            .scores
            .iter()
            .map(|(_, s)| s / SCORE_SCALE)
            .filter(|p| *p > 0.0)
            .map(|p| -p * p.ln())
            .sum();
        (h / 4.0_f64.ln()).clamp(0.0, 1.0)
    }

    /// Whether the distribution is clear or mixed.
    #[must_use]
    pub fn clarity(&self) -> Clarity {
        if self.entropy() > MIXED_INTENT_ENTROPY {
            Clarity::Mixed
        } else {
            Clarity::Clear
        }
    }

    /// Human-readable explanation: the model's reasoning if any, else the
    /// fusion breakdown summary.
    #[must_use]
    pub fn explanation(&self) -> Option<String> {
        self.reasoning.clone().or_else(|| {
            self.breakdown
                .as_ref()
                .map(|breakdown| breakdown.summary(self.primary))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(s: &str) -> Query {
        Query::parse(s).unwrap()
    }

    #[test]
    fn test_from_scores_normalizes() {
        let raw = ScoreVector::from_pairs([
            (IntentLabel::Transactional, 60.0),
            (IntentLabel::Informational, 20.0),
        ]);
        let result = IntentResult::from_scores(query("buy shoes"), &raw, AnalysisPath::Model, None);

        assert!((result.scores().total() - 100.0).abs() < 1e-9);
        assert_eq!(result.primary(), IntentLabel::Transactional);
        assert_eq!(result.secondary(), IntentLabel::Informational);
        assert!((result.confidence() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_zero_equal_split() {
        let result = IntentResult::from_scores(
            query("xyz"),
            &ScoreVector::zero(),
            AnalysisPath::Model,
            Some("   ".to_string()),
        );
        assert_eq!(result.primary(), IntentLabel::Transactional);
        assert!((result.confidence() - 25.0).abs() < 1e-9);
        assert_eq!(result.clarity(), Clarity::Mixed);
        assert!(result.reasoning().is_none());
    }

    #[test]
    fn test_clarity_clear_when_dominant() {
        let raw = ScoreVector::from_pairs([
            (IntentLabel::Navigational, 95.0),
            (IntentLabel::Informational, 5.0),
        ]);
        let result = IntentResult::from_scores(query("facebook"), &raw, AnalysisPath::Fusion, None);
        assert_eq!(result.clarity(), Clarity::Clear);
        assert!(result.entropy() < 0.3);
    }
}
