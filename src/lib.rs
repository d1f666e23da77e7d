//! # Intent Analyzer
//!
//! Classifies the intent behind a search query as Informational,
//! Transactional, Navigational, or Commercial Investigation.
//!
//! Two analysis paths share one result shape:
//!
//! - **Fusion**: keyword modifiers, SERP structure, fetched page content and
//!   an optional trained classifier each produce a per-intent score vector.
//!   The fusion engine weights them into one distribution summing to 100.
//! - **Model**: a locally hosted text-generation model is prompted for a
//!   structured judgment that is parsed and normalized the same way.
//!
//! Batches run either path over many queries, preserving input order and
//! recording per-query failures instead of aborting.
//!
//! ## Example
//!
//! ```rust
//! use intent_analyzer::models::{IntentLabel, Query, SignalSource, WeightConfig};
//! use intent_analyzer::services::{SourceVectors, fuse};
//! use intent_analyzer::signals::extract_modifiers;
//!
//! let query = Query::parse("buy iphone 15 pro")?;
//! let mut vectors = SourceVectors::new();
//! vectors.insert(SignalSource::Modifiers, extract_modifiers(&query));
//!
//! let result = fuse(query, &vectors, &WeightConfig::default())?;
//! assert_eq!(result.primary(), IntentLabel::Transactional);
//! # Ok::<(), intent_analyzer::Error>(())
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod io;
pub mod llm;
pub mod models;
pub mod observability;
pub mod search;
pub mod services;
pub mod signals;

pub use config::AppConfig;
pub use models::{
    BatchResult, FailureRecord, IntentLabel, IntentResult, Query, ScoreVector, SignalSource,
    WeightConfig,
};
pub use services::{BatchOrchestrator, FusionPipeline, ModelAnalyzer, QueryAnalyzer, fuse};

/// Error type for intent analysis.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When | Batch Behavior |
/// |---------|-------------|----------------|
/// | `InvalidInput` | Empty or oversized query, invalid configuration | Item recorded as failed |
/// | `SourceUnavailable` | A signal source could not be computed | Never fatal; source becomes absent |
/// | `ServiceUnavailable` | Inference or search service unreachable | Item recorded as failed |
/// | `Timeout` | A collaborator call or batch item exceeded its deadline | Item recorded as failed |
/// | `MalformedResponse` | Model output did not parse after every strategy | Item recorded as failed |
/// | `AllSourcesAbsent` | Fusion called with no signal at all | Item recorded as failed |
/// | `Cancelled` | Batch stopped before the item started | Item recorded as cancelled |
/// | `OperationFailed` | I/O, config parsing, HTTP client construction | Propagated |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A query is empty after trimming or exceeds the length bound
    /// - A configuration value is out of range and cannot be clamped
    /// - An import file lacks a query column
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A signal source could not be computed.
    ///
    /// Callers of scorers and collaborators convert this into an absent
    /// source; it is never fatal to a single query.
    #[error("signal source '{source_name}' unavailable: {cause}")]
    SourceUnavailable {
        /// The signal source that failed.
        source_name: String,
        /// The underlying cause.
        cause: String,
    },

    /// An external service could not be reached.
    #[error("service '{service}' unavailable: {cause}")]
    ServiceUnavailable {
        /// The service that failed.
        service: String,
        /// The underlying cause.
        cause: String,
    },

    /// An operation exceeded its deadline.
    #[error("operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The deadline that was exceeded.
        timeout_ms: u64,
    },

    /// A model response could not be parsed into scores.
    #[error("malformed model response: {cause}")]
    MalformedResponse {
        /// Why the response was rejected.
        cause: String,
    },

    /// Fusion was requested with every signal source absent.
    #[error("all signal sources are absent; nothing to fuse")]
    AllSourcesAbsent,

    /// The batch was cancelled before this work started.
    #[error("cancelled before analysis started")]
    Cancelled,

    /// An operation failed.
    ///
    /// Raised when:
    /// - Filesystem I/O errors occur
    /// - Configuration files cannot be parsed
    /// - Exports cannot be written
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Returns the serializable kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            Self::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Self::AllSourcesAbsent => ErrorKind::AllSourcesAbsent,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::OperationFailed { .. } => ErrorKind::OperationFailed,
        }
    }
}

/// Error category carried by batch failure records and exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Empty, oversized, or otherwise invalid input.
    InvalidInput,
    /// A signal source could not be computed.
    SourceUnavailable,
    /// The inference or search service was unreachable.
    ServiceUnavailable,
    /// The item exceeded its deadline.
    Timeout,
    /// The model response did not parse.
    MalformedResponse,
    /// No signal was available to fuse.
    AllSourcesAbsent,
    /// The batch stopped before the item started.
    Cancelled,
    /// Any other failure.
    OperationFailed,
}

impl ErrorKind {
    /// Returns the kind as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::SourceUnavailable => "source_unavailable",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Timeout => "timeout",
            Self::MalformedResponse => "malformed_response",
            Self::AllSourcesAbsent => "all_sources_absent",
            Self::Cancelled => "cancelled",
            Self::OperationFailed => "operation_failed",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result type alias for intent analysis operations.
pub type Result<T> = std::result::Result<T, Error>;
