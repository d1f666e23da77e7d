//! Batch results, failure records and summaries.

use super::intent::IntentLabel;
use super::result::IntentResult;
use crate::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Why one query in a batch produced no result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// The raw query as supplied.
    pub query: String,
    /// Error category.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
}

impl FailureRecord {
    /// Creates a failure record from an error.
    #[must_use]
    pub fn from_error(query: impl Into<String>, error: &Error) -> Self {
        Self {
            query: query.into(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    /// Record for a query that never started because the batch was cancelled.
    #[must_use]
    pub fn cancelled(query: impl Into<String>) -> Self {
        Self::from_error(query, &Error::Cancelled)
    }
}

/// Outcome for one batch entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// The query was analyzed.
    Analyzed(IntentResult),
    /// The query failed.
    Failed(FailureRecord),
}

/// One entry of a batch, in input position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem {
    /// The raw query as supplied.
    pub query: String,
    /// What happened to it.
    pub outcome: BatchOutcome,
}

impl BatchItem {
    /// Wraps an analysis outcome.
    #[must_use]
    pub fn from_result(query: impl Into<String>, result: crate::Result<IntentResult>) -> Self {
        let query = query.into();
        let outcome = match result {
            Ok(result) => BatchOutcome::Analyzed(result),
            Err(e) => BatchOutcome::Failed(FailureRecord::from_error(query.clone(), &e)),
        };
        Self { query, outcome }
    }

    /// Returns the result, if analyzed.
    #[must_use]
    pub const fn result(&self) -> Option<&IntentResult> {
        match &self.outcome {
            BatchOutcome::Analyzed(result) => Some(result),
            BatchOutcome::Failed(_) => None,
        }
    }

    /// Returns the failure, if any.
    #[must_use]
    pub const fn failure(&self) -> Option<&FailureRecord> {
        match &self.outcome {
            BatchOutcome::Analyzed(_) => None,
            BatchOutcome::Failed(failure) => Some(failure),
        }
    }
}

/// Confidence statistics for one primary intent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntentStats {
    /// Number of queries with this primary intent.
    pub count: usize,
    /// Mean confidence.
    pub mean_confidence: f64,
    /// Lowest confidence.
    pub min_confidence: f64,
    /// Highest confidence.
    pub max_confidence: f64,
}

/// Aggregate view of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Number of entries.
    pub total: usize,
    /// Entries analyzed successfully.
    pub analyzed: usize,
    /// Entries that failed, cancelled ones included.
    pub failed: usize,
    /// Failure counts by kind.
    pub failures_by_kind: BTreeMap<String, usize>,
    /// Stats keyed by primary intent; intents with no results are omitted.
    pub by_intent: BTreeMap<IntentLabel, IntentStats>,
}

/// Criteria for narrowing a batch before display or export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchFilter {
    /// Keep only these primary intents; empty keeps all.
    pub intents: Vec<IntentLabel>,
    /// Keep only results at or above this confidence.
    pub min_confidence: Option<f64>,
    /// Keep only queries containing this text, case-insensitively.
    pub contains: Option<String>,
}

impl BatchFilter {
    /// Returns true if no criterion is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty() && self.min_confidence.is_none() && self.contains.is_none()
    }

    /// Returns true if the item passes every criterion.
    ///
    /// Failed items carry no intent or confidence, so they pass only when
    /// neither of those criteria is set.
    #[must_use]
    pub fn matches(&self, item: &BatchItem) -> bool {
        if let Some(needle) = &self.contains
            && !item.query.to_lowercase().contains(&needle.to_lowercase())
        {
            return false;
        }

        match item.result() {
            Some(result) => {
                (self.intents.is_empty() || self.intents.contains(&result.primary()))
                    && self
                        .min_confidence
                        .is_none_or(|min| result.confidence() >= min)
            },
            None => self.intents.is_empty() && self.min_confidence.is_none(),
        }
    }
}

/// Ordered results of a batch run.
///
/// Entry `i` always corresponds to input query `i`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchResult {
    items: Vec<BatchItem>,
    cancelled: bool,
}

impl BatchResult {
    /// Creates a batch result from ordered items.
    #[must_use]
    pub const fn new(items: Vec<BatchItem>, cancelled: bool) -> Self {
        Self { items, cancelled }
    }

    /// All entries in input order.
    #[must_use]
    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the batch has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the run was cancelled before every query started.
    #[must_use]
    pub const fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Successful results in input order.
    pub fn results(&self) -> impl Iterator<Item = &IntentResult> {
        self.items.iter().filter_map(BatchItem::result)
    }

    /// Failures in input order.
    pub fn failures(&self) -> impl Iterator<Item = &FailureRecord> {
        self.items.iter().filter_map(BatchItem::failure)
    }

    /// Returns a copy holding only the entries that pass `filter`.
    #[must_use]
    pub fn filtered(&self, filter: &BatchFilter) -> Self {
        if filter.is_empty() {
            return self.clone();
        }
        Self {
            items: self
                .items
                .iter()
                .filter(|item| filter.matches(item))
                .cloned()
                .collect(),
            cancelled: self.cancelled,
        }
    }

    /// Computes per-intent statistics.
    #[must_use]
    pub fn summary(&self) -> BatchSummary {
        let mut by_intent: BTreeMap<IntentLabel, IntentStats> = BTreeMap::new();
        let mut sums: BTreeMap<IntentLabel, f64> = BTreeMap::new();
        let mut failures_by_kind: BTreeMap<String, usize> = BTreeMap::new();
        let mut analyzed = 0;

        for item in &self.items {
            match &item.outcome {
                BatchOutcome::Analyzed(result) => {
                    analyzed += 1;
                    let confidence = result.confidence();
                    let stats = by_intent.entry(result.primary()).or_insert(IntentStats {
                        count: 0,
                        mean_confidence: 0.0,
                        min_confidence: f64::INFINITY,
                        max_confidence: f64::NEG_INFINITY,
                    });
                    stats.count += 1;
                    stats.min_confidence = stats.min_confidence.min(confidence);
                    stats.max_confidence = stats.max_confidence.max(confidence);
                    *sums.entry(result.primary()).or_default() += confidence;
                },
                BatchOutcome::Failed(failure) => {
                    *failures_by_kind
                        .entry(failure.kind.as_str().to_string())
                        .or_default() += 1;
                },
            }
        }

        for (label, stats) in &mut by_intent {
            #[allow(clippy::cast_precision_loss)]
            let count = stats.count as f64;
            stats.mean_confidence = sums.get(label).copied().unwrap_or_default() / count;
        }

        BatchSummary {
            total: self.items.len(),
            analyzed,
            failed: self.items.len() - analyzed,
            failures_by_kind,
            by_intent,
        }
    }
}
