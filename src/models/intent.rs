//! Intent labels and per-intent score vectors.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Total that every normalized [`ScoreVector`] sums to.
pub const SCORE_SCALE: f64 = 100.0;

/// Tolerance used when comparing fused scores.
pub const SCORE_EPSILON: f64 = 1e-9;

/// The four search intent categories.
///
/// The set is closed: every analysis assigns one of these labels, there is no
/// "unknown" outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentLabel {
    /// Seeking knowledge: guides, definitions, how-to content.
    Informational,
    /// Intending to act: buy, download, subscribe, book.
    Transactional,
    /// Looking for a specific site, brand page, or login portal.
    Navigational,
    /// Researching before a purchase: comparisons, reviews, best-of lists.
    CommercialInvestigation,
}

impl IntentLabel {
    /// All labels in canonical (display and export) order.
    pub const ALL: [Self; 4] = [
        Self::Informational,
        Self::Transactional,
        Self::Navigational,
        Self::CommercialInvestigation,
    ];

    /// Tie-break order for argmax, highest priority first.
    pub const PRIORITY: [Self; 4] = [
        Self::Transactional,
        Self::CommercialInvestigation,
        Self::Navigational,
        Self::Informational,
    ];

    /// Returns the human-readable display name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Informational => "Informational",
            Self::Transactional => "Transactional",
            Self::Navigational => "Navigational",
            Self::CommercialInvestigation => "Commercial Investigation",
        }
    }

    /// Returns the snake_case key used in exports and config files.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Informational => "informational",
            Self::Transactional => "transactional",
            Self::Navigational => "navigational",
            Self::CommercialInvestigation => "commercial_investigation",
        }
    }

    /// Returns a one-line description used in model prompts.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Informational => {
                "User seeks knowledge, answers, guides, tutorials, definitions, or how-to content."
            },
            Self::Transactional => {
                "User intends to complete an action like buying, downloading, subscribing, or booking."
            },
            Self::Navigational => {
                "User wants to find a specific website, brand page, or login portal."
            },
            Self::CommercialInvestigation => {
                "User is researching before making a purchase decision (comparisons, reviews, best options)."
            },
        }
    }

    /// Parses a label leniently.
    ///
    /// Case-insensitive; accepts display names, snake/kebab case, and the
    /// aliases `commercial` and `problem_solving` (folded into Informational).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "informational" | "information" | "info" | "problemsolving" => {
                Some(Self::Informational)
            },
            "transactional" | "transaction" => Some(Self::Transactional),
            "navigational" | "navigation" => Some(Self::Navigational),
            "commercialinvestigation" | "commercial" | "investigation" => {
                Some(Self::CommercialInvestigation)
            },
            _ => None,
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Informational => 0,
            Self::Transactional => 1,
            Self::Navigational => 2,
            Self::CommercialInvestigation => 3,
        }
    }
}

impl fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Non-negative score per intent label.
///
/// Scorers emit vectors on a rough 0-100 scale without normalizing them;
/// [`ScoreVector::normalized`] rescales a vector to sum to [`SCORE_SCALE`].
/// Negative and non-finite values are clamped to zero on every write.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreVector {
    scores: [f64; 4],
}

impl ScoreVector {
    /// Creates an all-zero vector.
    #[must_use]
    pub const fn zero() -> Self {
        Self { scores: [0.0; 4] }
    }

    /// Creates a vector with the same value for every label.
    #[must_use]
    pub fn uniform(value: f64) -> Self {
        Self {
            scores: [sanitize(value); 4],
        }
    }

    /// Creates a vector from `(label, score)` pairs; repeated labels accumulate.
    #[must_use]
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (IntentLabel, f64)>,
    {
        let mut vector = Self::zero();
        for (label, score) in pairs {
            vector.add(label, score);
        }
        vector
    }

    /// Returns the score for a label.
    #[must_use]
    pub const fn get(&self, label: IntentLabel) -> f64 {
        self.scores[label.index()]
    }

    /// Sets the score for a label.
    pub fn set(&mut self, label: IntentLabel, score: f64) {
        self.scores[label.index()] = sanitize(score);
    }

    /// Adds to the score for a label; the result is floored at zero.
    pub fn add(&mut self, label: IntentLabel, delta: f64) {
        let current = self.get(label);
        self.set(label, current + delta);
    }

    /// Caps every score at `max`.
    #[must_use]
    pub fn capped(mut self, max: f64) -> Self {
        for score in &mut self.scores {
            *score = score.min(max);
        }
        self
    }

    /// Multiplies every score by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self::from_pairs(self.iter().map(|(label, score)| (label, score * factor)))
    }

    /// Returns the sum of all scores.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.scores.iter().sum()
    }

    /// Returns true if every score is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.total() <= 0.0
    }

    /// Iterates `(label, score)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (IntentLabel, f64)> + '_ {
        IntentLabel::ALL.iter().map(|label| (*label, self.get(*label)))
    }

    /// Returns a copy rescaled to sum to [`SCORE_SCALE`].
    ///
    /// An all-zero vector becomes an equal split (25 per label).
    #[must_use]
    pub fn normalized(&self) -> Self {
        let total = self.total();
        if total <= 0.0 || !total.is_finite() {
            return Self::uniform(SCORE_SCALE / 4.0);
        }
        self.scaled(SCORE_SCALE / total)
    }

    /// Returns the label with the highest score.
    ///
    /// Ties resolve by [`IntentLabel::PRIORITY`].
    #[must_use]
    pub fn argmax(&self) -> IntentLabel {
        self.ranked()[0]
    }

    /// Returns the best label other than `excluded`, with the same tie-break.
    #[must_use]
    pub fn runner_up(&self, excluded: IntentLabel) -> IntentLabel {
        self.ranked()
            .into_iter()
            .find(|label| *label != excluded)
            .unwrap_or(IntentLabel::Informational)
    }

    /// Returns labels ordered by descending score, ties by priority.
    #[must_use]
    pub fn ranked(&self) -> [IntentLabel; 4] {
        let mut remaining = IntentLabel::PRIORITY.to_vec();
        let mut ranked = IntentLabel::PRIORITY;
        for slot in &mut ranked {
            // Earlier entries win unless beaten by more than the tolerance.
            let mut best = 0;
            for (i, label) in remaining.iter().enumerate().skip(1) {
                if self.get(*label) > self.get(remaining[best]) + SCORE_EPSILON {
                    best = i;
                }
            }
            *slot = remaining.remove(best);
        }
        ranked
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

impl Serialize for ScoreVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        for (label, score) in self.iter() {
            map.serialize_entry(label.as_str(), &score)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ScoreVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScoreVectorVisitor;

        impl<'de> Visitor<'de> for ScoreVectorVisitor {
            type Value = ScoreVector;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of intent label to score")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut vector = ScoreVector::zero();
                while let Some((key, score)) = access.next_entry::<String, f64>()? {
                    if let Some(label) = IntentLabel::parse(&key) {
                        vector.add(label, score);
                    }
                }
                Ok(vector)
            }
        }

        deserializer.deserialize_map(ScoreVectorVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parse_variants() {
        assert_eq!(
            IntentLabel::parse("Commercial Investigation"),
            Some(IntentLabel::CommercialInvestigation)
        );
        assert_eq!(
            IntentLabel::parse("commercial_investigation"),
            Some(IntentLabel::CommercialInvestigation)
        );
        assert_eq!(
            IntentLabel::parse("problem_solving"),
            Some(IntentLabel::Informational)
        );
        assert_eq!(IntentLabel::parse("NAVIGATIONAL"), Some(IntentLabel::Navigational));
        assert_eq!(IntentLabel::parse("shopping"), None);
    }

    #[test]
    fn test_negative_and_nan_clamped() {
        let mut v = ScoreVector::zero();
        v.set(IntentLabel::Transactional, -5.0);
        v.set(IntentLabel::Navigational, f64::NAN);
        assert!(v.is_zero());

        v.set(IntentLabel::Informational, 10.0);
        v.add(IntentLabel::Informational, -25.0);
        assert!(v.get(IntentLabel::Informational).abs() < f64::EPSILON);
    }

    #[test]
    fn test_normalized_sums_to_scale() {
        let v = ScoreVector::from_pairs([
            (IntentLabel::Informational, 3.0),
            (IntentLabel::Transactional, 1.0),
        ]);
        let n = v.normalized();
        assert!((n.total() - SCORE_SCALE).abs() < 1e-9);
        assert!((n.get(IntentLabel::Informational) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalized_zero_is_equal_split() {
        let n = ScoreVector::zero().normalized();
        for (_, score) in n.iter() {
            assert!((score - 25.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_argmax_tie_break_order() {
        let all_equal = ScoreVector::uniform(10.0);
        assert_eq!(all_equal.argmax(), IntentLabel::Transactional);

        let info_nav = ScoreVector::from_pairs([
            (IntentLabel::Informational, 40.0),
            (IntentLabel::Navigational, 40.0),
        ]);
        assert_eq!(info_nav.argmax(), IntentLabel::Navigational);
        assert_eq!(info_nav.runner_up(IntentLabel::Navigational), IntentLabel::Informational);

        let comm_nav = ScoreVector::from_pairs([
            (IntentLabel::CommercialInvestigation, 5.0),
            (IntentLabel::Navigational, 5.0),
        ]);
        assert_eq!(comm_nav.argmax(), IntentLabel::CommercialInvestigation);
    }

    #[test]
    fn test_serde_uses_display_names() {
        let v = ScoreVector::from_pairs([(IntentLabel::CommercialInvestigation, 12.5)]);
        let json = serde_json::to_string(&v).unwrap();
        assert!(json.contains("\"Commercial Investigation\":12.5"));

        let back: ScoreVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
