//! Signal sources and fusion weights.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A source of per-intent scores feeding the fusion engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// Structural features of the search results page.
    Serp,
    /// Keyword modifiers in the query itself.
    Modifiers,
    /// Content cues from the top ranking pages.
    Content,
    /// An optional trained classifier.
    Classifier,
}

impl SignalSource {
    /// All sources in canonical order.
    pub const ALL: [Self; 4] = [Self::Serp, Self::Modifiers, Self::Content, Self::Classifier];

    /// Returns the source name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Serp => "serp",
            Self::Modifiers => "modifiers",
            Self::Content => "content",
            Self::Classifier => "classifier",
        }
    }

    /// Parses a source name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "serp" => Some(Self::Serp),
            "modifiers" | "rules" | "keywords" => Some(Self::Modifiers),
            "content" | "pages" => Some(Self::Content),
            "classifier" | "clf" => Some(Self::Classifier),
            _ => None,
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Serp => 0,
            Self::Modifiers => 1,
            Self::Content => 2,
            Self::Classifier => 3,
        }
    }
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configured fusion weight per signal source, each in `[0, 1]`.
///
/// Weights need not sum to 1; [`WeightConfig::effective`] rescales them over
/// whichever sources are present for a given query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightConfig {
    weights: [f64; 4],
}

impl Default for WeightConfig {
    /// SERP 25%, modifiers 20%, content 25%, classifier 30%.
    fn default() -> Self {
        Self {
            weights: [0.25, 0.20, 0.25, 0.30],
        }
    }
}

impl WeightConfig {
    /// Creates weights from fractions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if any weight is non-finite or outside `[0, 1]`.
    pub fn new(serp: f64, modifiers: f64, content: f64, classifier: f64) -> Result<Self> {
        let weights = [serp, modifiers, content, classifier];
        for (source, weight) in SignalSource::ALL.iter().zip(weights) {
            if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
                return Err(Error::InvalidInput(format!(
                    "weight for '{source}' must be within [0, 1], got {weight}"
                )));
            }
        }
        Ok(Self { weights })
    }

    /// Creates weights from percentages, clamping each into `0..=100`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if any percentage is not a finite number.
    pub fn from_percentages(serp: f64, modifiers: f64, content: f64, classifier: f64) -> Result<Self> {
        let mut weights = [0.0; 4];
        for ((source, pct), slot) in SignalSource::ALL
            .iter()
            .zip([serp, modifiers, content, classifier])
            .zip(&mut weights)
        {
            if !pct.is_finite() {
                return Err(Error::InvalidInput(format!(
                    "weight percentage for '{source}' is not a number"
                )));
            }
            let clamped = pct.clamp(0.0, 100.0);
            if (clamped - pct).abs() > f64::EPSILON {
                tracing::warn!(
                    source = %source,
                    requested = pct,
                    clamped = clamped,
                    "Weight percentage out of range, clamping"
                );
            }
            *slot = clamped / 100.0;
        }
        Ok(Self { weights })
    }

    /// Creates a config where only one source carries weight.
    #[must_use]
    pub fn only(source: SignalSource) -> Self {
        let mut weights = [0.0; 4];
        weights[source.index()] = 1.0;
        Self { weights }
    }

    /// Returns the configured weight for a source.
    #[must_use]
    pub const fn get(&self, source: SignalSource) -> f64 {
        self.weights[source.index()]
    }

    /// Returns a copy with one weight replaced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the weight is outside `[0, 1]`.
    pub fn with(mut self, source: SignalSource, weight: f64) -> Result<Self> {
        if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
            return Err(Error::InvalidInput(format!(
                "weight for '{source}' must be within [0, 1], got {weight}"
            )));
        }
        self.weights[source.index()] = weight;
        Ok(self)
    }

    /// Sum of the configured weights.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Redistributes weight over the present sources.
    ///
    /// Each present source gets `w / sum(present w)`, so absent weight is
    /// spread proportionally and the result sums to 1.0. If every present
    /// source is configured at zero they share equally.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllSourcesAbsent`] if `present` is empty.
    pub fn effective(&self, present: &[SignalSource]) -> Result<EffectiveWeights> {
        let mut sources: Vec<SignalSource> = present.to_vec();
        sources.sort_unstable();
        sources.dedup();
        if sources.is_empty() {
            return Err(Error::AllSourcesAbsent);
        }

        let present_total: f64 = sources.iter().map(|s| self.get(*s)).sum();
        #[allow(clippy::cast_precision_loss)]
        let share = 1.0 / sources.len() as f64;

        let weights = sources
            .into_iter()
            .map(|source| {
                let weight = if present_total > 0.0 {
                    self.get(source) / present_total
                } else {
                    share
                };
                (source, weight)
            })
            .collect();

        Ok(EffectiveWeights { weights })
    }
}

/// Weights actually applied for one fusion, over present sources only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveWeights {
    weights: BTreeMap<SignalSource, f64>,
}

impl EffectiveWeights {
    /// Returns the applied weight for a source; absent sources are `None`.
    #[must_use]
    pub fn get(&self, source: SignalSource) -> Option<f64> {
        self.weights.get(&source).copied()
    }

    /// Iterates `(source, weight)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (SignalSource, f64)> + '_ {
        self.weights.iter().map(|(s, w)| (*s, *w))
    }

    /// Sum of applied weights; 1.0 up to rounding.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentages_clamped() {
        let w = WeightConfig::from_percentages(150.0, -10.0, 50.0, 0.0).unwrap();
        assert!((w.get(SignalSource::Serp) - 1.0).abs() < f64::EPSILON);
        assert!(w.get(SignalSource::Modifiers).abs() < f64::EPSILON);
        assert!((w.get(SignalSource::Content) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_percentages_reject_nan() {
        assert!(WeightConfig::from_percentages(f64::NAN, 0.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(WeightConfig::new(1.2, 0.0, 0.0, 0.0).is_err());
        assert!(WeightConfig::new(0.2, 0.2, 0.2, 0.2).is_ok());
    }

    #[test]
    fn test_effective_redistributes_proportionally() {
        let w = WeightConfig::default();
        let eff = w
            .effective(&[SignalSource::Serp, SignalSource::Modifiers, SignalSource::Content])
            .unwrap();

        assert!((eff.total() - 1.0).abs() < 1e-12);
        assert!(eff.get(SignalSource::Classifier).is_none());
        // 0.25 / 0.70
        assert!((eff.get(SignalSource::Serp).unwrap() - 0.25 / 0.70).abs() < 1e-12);
        assert!((eff.get(SignalSource::Modifiers).unwrap() - 0.20 / 0.70).abs() < 1e-12);
    }

    #[test]
    fn test_effective_zero_weights_share_equally() {
        let w = WeightConfig::only(SignalSource::Classifier);
        let eff = w
            .effective(&[SignalSource::Serp, SignalSource::Modifiers])
            .unwrap();
        assert!((eff.get(SignalSource::Serp).unwrap() - 0.5).abs() < 1e-12);
        assert!((eff.get(SignalSource::Modifiers).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_effective_empty_is_error() {
        let err = WeightConfig::default().effective(&[]).unwrap_err();
        assert!(matches!(err, Error::AllSourcesAbsent));
    }

    #[test]
    fn test_source_parse_aliases() {
        assert_eq!(SignalSource::parse("rules"), Some(SignalSource::Modifiers));
        assert_eq!(SignalSource::parse("Pages"), Some(SignalSource::Content));
        assert_eq!(SignalSource::parse("unknown"), None);
    }
}
