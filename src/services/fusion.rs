//! Weighted fusion of per-source score vectors.

use crate::models::{
    AnalysisPath, FusionBreakdown, IntentResult, Query, ScoreVector, SignalSource, WeightConfig,
};
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Score vectors gathered for one query, keyed by source.
///
/// A source missing from the map is absent. A present source may still
/// carry an all-zero vector, meaning it ran and found nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceVectors {
    vectors: BTreeMap<SignalSource, ScoreVector>,
}

impl SourceVectors {
    /// Creates an empty set; every source absent.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a source present with its vector, replacing any earlier one.
    pub fn insert(&mut self, source: SignalSource, vector: ScoreVector) {
        self.vectors.insert(source, vector);
    }

    /// Inserts when `Some`; `None` leaves the source absent.
    pub fn insert_optional(&mut self, source: SignalSource, vector: Option<ScoreVector>) {
        if let Some(vector) = vector {
            self.insert(source, vector);
        }
    }

    /// Builder-style [`SourceVectors::insert`].
    #[must_use]
    pub fn with(mut self, source: SignalSource, vector: ScoreVector) -> Self {
        self.insert(source, vector);
        self
    }

    /// Returns the vector for a source, if present.
    #[must_use]
    pub fn get(&self, source: SignalSource) -> Option<&ScoreVector> {
        self.vectors.get(&source)
    }

    /// Present sources in canonical order.
    #[must_use]
    pub fn present(&self) -> Vec<SignalSource> {
        self.vectors.keys().copied().collect()
    }

    /// Absent sources in canonical order.
    #[must_use]
    pub fn absent(&self) -> Vec<SignalSource> {
        SignalSource::ALL
            .into_iter()
            .filter(|s| !self.vectors.contains_key(s))
            .collect()
    }

    /// Number of present sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Returns true if every source is absent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Fuses source vectors into one result.
///
/// 1. Configured weights are redistributed over the present sources so they
///    sum to 1.0.
/// 2. Each label's combined score is the weighted sum of the raw source
///    scores.
/// 3. The combined vector is normalized to 100 (equal split if all zero).
/// 4. The primary label is the argmax with the fixed tie-break order and the
///    confidence is its score.
///
/// # Errors
///
/// Returns [`Error::AllSourcesAbsent`] if no source is present. An empty
/// input is never turned into an equal split.
///
/// # Example
///
/// ```rust
/// use intent_analyzer::models::{IntentLabel, Query, ScoreVector, SignalSource, WeightConfig};
/// use intent_analyzer::services::{SourceVectors, fuse};
///
/// let vectors = SourceVectors::new().with(
///     SignalSource::Serp,
///     ScoreVector::from_pairs([(IntentLabel::Navigational, 60.0)]),
/// );
/// let result = fuse(Query::parse("netflix")?, &vectors, &WeightConfig::default())?;
/// assert_eq!(result.primary(), IntentLabel::Navigational);
/// assert!((result.confidence() - 100.0).abs() < 1e-9);
/// # Ok::<(), intent_analyzer::Error>(())
/// ```
pub fn fuse(query: Query, vectors: &SourceVectors, weights: &WeightConfig) -> Result<IntentResult> {
    if vectors.is_empty() {
        return Err(Error::AllSourcesAbsent);
    }
    let effective = weights.effective(&vectors.present())?;

    let mut combined = ScoreVector::zero();
    for (source, vector) in &vectors.vectors {
        let weight = effective.get(*source).unwrap_or(0.0);
        for (label, score) in vector.iter() {
            combined.add(label, weight * score);
        }
    }

    let breakdown = FusionBreakdown {
        weights: effective,
        sources: vectors.vectors.clone(),
        absent: vectors.absent(),
        combined,
    };
    let result = IntentResult::from_scores(query, &combined, AnalysisPath::Fusion, None)
        .with_breakdown(breakdown);

    tracing::debug!(
        query = %result.query(),
        primary = %result.primary(),
        confidence = result.confidence(),
        sources = vectors.len(),
        "Fused signal sources"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IntentLabel, SCORE_SCALE};

    fn query(s: &str) -> Query {
        Query::parse(s).unwrap()
    }

    fn vector(pairs: &[(IntentLabel, f64)]) -> ScoreVector {
        ScoreVector::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_all_absent_is_error() {
        let err = fuse(query("x"), &SourceVectors::new(), &WeightConfig::default()).unwrap_err();
        assert!(matches!(err, Error::AllSourcesAbsent));
    }

    #[test]
    fn test_single_source_passes_through() {
        let raw = vector(&[
            (IntentLabel::Informational, 30.0),
            (IntentLabel::Transactional, 10.0),
        ]);
        let vectors = SourceVectors::new().with(SignalSource::Modifiers, raw);
        let result = fuse(query("q"), &vectors, &WeightConfig::default()).unwrap();
        assert_eq!(*result.scores(), raw.normalized());
        assert!((result.confidence() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_combination() {
        let weights = WeightConfig::new(0.5, 0.5, 0.0, 0.0).unwrap();
        let vectors = SourceVectors::new()
            .with(SignalSource::Serp, vector(&[(IntentLabel::Transactional, 80.0)]))
            .with(SignalSource::Modifiers, vector(&[(IntentLabel::Informational, 40.0)]));
        let result = fuse(query("q"), &vectors, &weights).unwrap();

        let breakdown = result.breakdown().unwrap();
        assert!((breakdown.combined.get(IntentLabel::Transactional) - 40.0).abs() < 1e-9);
        assert!((breakdown.combined.get(IntentLabel::Informational) - 20.0).abs() < 1e-9);
        assert_eq!(result.primary(), IntentLabel::Transactional);
        assert_eq!(result.secondary(), IntentLabel::Informational);
        assert!((result.scores().total() - SCORE_SCALE).abs() < 1e-6);
    }

    #[test]
    fn test_absent_classifier_redistributes() {
        let weights = WeightConfig::default()
            .with(SignalSource::Classifier, 0.0)
            .unwrap();
        let vectors = SourceVectors::new()
            .with(SignalSource::Serp, vector(&[(IntentLabel::Navigational, 50.0)]))
            .with(SignalSource::Modifiers, ScoreVector::zero())
            .with(SignalSource::Content, vector(&[(IntentLabel::Informational, 50.0)]));
        let result = fuse(query("q"), &vectors, &weights).unwrap();

        let breakdown = result.breakdown().unwrap();
        assert!((breakdown.weights.total() - 1.0).abs() < 1e-9);
        assert!(breakdown.weights.get(SignalSource::Classifier).is_none());
        assert_eq!(breakdown.absent, vec![SignalSource::Classifier]);
        assert!((weights.total() - 0.7).abs() < 1e-9);
        let serp = breakdown.weights.get(SignalSource::Serp).unwrap();
        assert!((serp - 0.25 / 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_all_zero_present_sources_split_equally() {
        let vectors = SourceVectors::new().with(SignalSource::Modifiers, ScoreVector::zero());
        let result = fuse(query("hello"), &vectors, &WeightConfig::default()).unwrap();
        for (_, score) in result.scores().iter() {
            assert!((score - 25.0).abs() < 1e-9);
        }
        assert_eq!(result.primary(), IntentLabel::Transactional);
    }

    #[test]
    fn test_insert_optional_none_is_absent() {
        let mut vectors = SourceVectors::new();
        vectors.insert_optional(SignalSource::Classifier, None);
        assert!(vectors.is_empty());
        assert_eq!(vectors.absent().len(), 4);
    }
}
