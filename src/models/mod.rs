//! Data models for intent analysis.
//!
//! This module contains the value types shared by both analysis paths.

mod batch;
mod intent;
mod query;
mod result;
mod weights;

pub use batch::{
    BatchFilter, BatchItem, BatchOutcome, BatchResult, BatchSummary, FailureRecord, IntentStats,
};
pub use intent::{IntentLabel, SCORE_EPSILON, SCORE_SCALE, ScoreVector};
pub use query::{MAX_QUERY_CHARS, Query, tokenize};
pub use result::{AnalysisPath, Clarity, FusionBreakdown, IntentResult, MIXED_INTENT_ENTROPY};
pub use weights::{EffectiveWeights, SignalSource, WeightConfig};
