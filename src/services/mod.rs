//! Analysis services.
//!
//! Both analysis paths implement [`QueryAnalyzer`] so the batch
//! orchestrator and the CLI can drive either one.

mod batch;
mod fusion;
mod model_analyzer;
mod pipeline;
mod response_parser;

pub use batch::{
    BatchConfig, BatchOrchestrator, BatchProgress, CancellationToken, analyze_sequential,
};
pub use fusion::{SourceVectors, fuse};
pub use model_analyzer::{DEFAULT_MODEL_TIMEOUT, ModelAnalyzer};
pub use pipeline::{DEFAULT_FETCH_PAGES, FusionPipeline};
pub use response_parser::{ParseStrategy, ParsedJudgment, parse_model_response};

use crate::Result;
use crate::models::{AnalysisPath, IntentResult, Query};

/// One way of turning a query into an [`IntentResult`].
pub trait QueryAnalyzer: Send + Sync {
    /// Which path this analyzer implements.
    fn path(&self) -> AnalysisPath;

    /// Analyzes a single validated query.
    ///
    /// # Errors
    ///
    /// Returns the path's failure for this query; callers running batches
    /// record it and continue.
    fn analyze(&self, query: &Query) -> Result<IntentResult>;
}
