//! Core traits for query import and result export.
//!
//! Format adapters implement [`ImportSource`] and [`ExportSink`].

use crate::Result;
use crate::models::{BatchItem, BatchSummary, IntentLabel};
use serde::{Deserialize, Serialize};

/// Source of raw queries.
///
/// Sources yield raw strings; blank-line handling and de-duplication happen
/// in the import service so every format behaves the same.
pub trait ImportSource {
    /// Reads the next raw query.
    ///
    /// Returns `Ok(None)` when the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O errors occur.
    fn next(&mut self) -> Result<Option<String>>;
}

/// One flattened result row.
///
/// Failed queries keep their row with empty intent fields, zero scores and
/// the error message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    /// The query as supplied.
    pub query: String,
    /// Primary intent display name.
    pub primary_intent: String,
    /// Secondary intent display name.
    pub secondary_intent: String,
    /// Primary intent score.
    pub confidence: f64,
    /// Informational score.
    pub informational: f64,
    /// Transactional score.
    pub transactional: f64,
    /// Navigational score.
    pub navigational: f64,
    /// Commercial investigation score.
    pub commercial_investigation: f64,
    /// Clear or mixed intent.
    pub clarity: String,
    /// Model reasoning or fusion breakdown summary.
    pub reasoning: String,
    /// Error message for failed queries.
    pub error: String,
}

impl ExportRow {
    /// Column names, in CSV order.
    pub const HEADERS: [&'static str; 11] = [
        "query",
        "primary_intent",
        "secondary_intent",
        "confidence",
        "informational",
        "transactional",
        "navigational",
        "commercial_investigation",
        "clarity",
        "reasoning",
        "error",
    ];

    /// Flattens a batch entry.
    #[must_use]
    pub fn from_item(item: &BatchItem) -> Self {
        match (item.result(), item.failure()) {
            (Some(result), _) => {
                let scores = result.scores();
                Self {
                    query: item.query.clone(),
                    primary_intent: result.primary().as_str().to_string(),
                    secondary_intent: result.secondary().as_str().to_string(),
                    confidence: round1(result.confidence()),
                    informational: round1(scores.get(IntentLabel::Informational)),
                    transactional: round1(scores.get(IntentLabel::Transactional)),
                    navigational: round1(scores.get(IntentLabel::Navigational)),
                    commercial_investigation: round1(
                        scores.get(IntentLabel::CommercialInvestigation),
                    ),
                    clarity: result.clarity().as_str().to_string(),
                    reasoning: result.explanation().unwrap_or_default(),
                    error: String::new(),
                }
            },
            (None, failure) => Self {
                query: item.query.clone(),
                primary_intent: String::new(),
                secondary_intent: String::new(),
                confidence: 0.0,
                informational: 0.0,
                transactional: 0.0,
                navigational: 0.0,
                commercial_investigation: 0.0,
                clarity: String::new(),
                reasoning: String::new(),
                error: failure.map(|f| f.message.clone()).unwrap_or_default(),
            },
        }
    }

    /// Values as strings, in [`Self::HEADERS`] order.
    #[must_use]
    pub fn to_record(&self) -> [String; 11] {
        let score = |v: f64| {
            if self.error.is_empty() {
                format!("{v:.1}")
            } else {
                String::new()
            }
        };
        [
            self.query.clone(),
            self.primary_intent.clone(),
            self.secondary_intent.clone(),
            score(self.confidence),
            score(self.informational),
            score(self.transactional),
            score(self.navigational),
            score(self.commercial_investigation),
            self.clarity.clone(),
            self.reasoning.clone(),
            self.error.clone(),
        ]
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Sink for exported rows.
///
/// # Lifecycle
///
/// 1. Create sink with output destination
/// 2. Call `write()` for each row
/// 3. Call `finalize()` with the batch summary
pub trait ExportSink {
    /// Writes a single row.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or I/O fails.
    fn write(&mut self, row: &ExportRow) -> Result<()>;

    /// Finishes the export and flushes buffers.
    ///
    /// Formats without a summary section ignore `summary`.
    ///
    /// # Errors
    ///
    /// Returns an error if I/O fails.
    fn finalize(self: Box<Self>, summary: &BatchSummary) -> Result<()>;
}
