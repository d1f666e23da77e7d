//! Batch orchestration.
//!
//! Runs an analysis path over many queries. Entry `i` of the result always
//! corresponds to input query `i`, whatever order workers finish in. A
//! failing query becomes a [`FailureRecord`](crate::models::FailureRecord)
//! and never stops the batch. A panicking analyzer is recorded as an
//! `OperationFailed` item.

use super::QueryAnalyzer;
use crate::config::{BatchSettings, MAX_WORKERS};
use crate::models::{
    AnalysisPath, BatchItem, BatchOutcome, BatchResult, FailureRecord, IntentResult, Query,
};
use crate::observability::{RequestContext, current_request_id, enter_request_context};
use crate::{Error, Result};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Shared flag that stops a batch from starting new items.
///
/// Items already running finish normally.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates an untriggered token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Worker and deadline settings for a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Worker threads, `1..=16`.
    pub workers: usize,
    /// Per-item deadline enforced by the orchestrator.
    pub item_timeout: Option<Duration>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            item_timeout: None,
        }
    }
}

impl BatchConfig {
    /// Builds from the `[batch]` config section. A zero timeout disables it.
    #[must_use]
    pub const fn from_settings(settings: &BatchSettings) -> Self {
        Self {
            workers: settings.workers,
            item_timeout: if settings.item_timeout_ms == 0 {
                None
            } else {
                Some(Duration::from_millis(settings.item_timeout_ms))
            },
        }
    }
}

/// Progress report sent after each completed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    /// Items finished so far.
    pub completed: usize,
    /// Items in the batch.
    pub total: usize,
    /// The query that just finished.
    pub query: String,
    /// Whether it produced a result.
    pub ok: bool,
}

type ProgressFn = Arc<dyn Fn(&BatchProgress) + Send + Sync>;

/// Runs a [`QueryAnalyzer`] over a list of queries with a bounded worker pool.
pub struct BatchOrchestrator {
    analyzer: Arc<dyn QueryAnalyzer>,
    config: BatchConfig,
    cancel: CancellationToken,
    progress: Option<ProgressFn>,
}

impl std::fmt::Debug for BatchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("path", &self.analyzer.path())
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl BatchOrchestrator {
    /// Creates an orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `workers` is outside `1..=16` or
    /// the item timeout is zero.
    pub fn new(analyzer: Arc<dyn QueryAnalyzer>, config: BatchConfig) -> Result<Self> {
        if !(1..=MAX_WORKERS).contains(&config.workers) {
            return Err(Error::InvalidInput(format!(
                "workers must be between 1 and {MAX_WORKERS}, got {}",
                config.workers
            )));
        }
        if config.item_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::InvalidInput(
                "item timeout must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            analyzer,
            config,
            cancel: CancellationToken::new(),
            progress: None,
        })
    }

    /// Uses an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Registers a progress callback, invoked on the calling thread.
    #[must_use]
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&BatchProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// The token that cancels this orchestrator's runs.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Analyzes every query, preserving input order.
    ///
    /// Items not started before cancellation are recorded as cancelled and
    /// the result is flagged.
    #[must_use]
    pub fn run(&self, queries: &[String]) -> BatchResult {
        let total = queries.len();
        let workers = self.config.workers.clamp(1, total.max(1));
        let started = Instant::now();
        tracing::info!(
            total = total,
            workers = workers,
            path = self.analyzer.path().as_str(),
            "Starting batch"
        );

        let next = AtomicUsize::new(0);
        let mut slots: Vec<Option<BatchItem>> = (0..total).map(|_| None).collect();
        let (tx, rx) = mpsc::channel::<(usize, BatchItem)>();

        thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let next = &next;
                scope.spawn(move || {
                    while !self.cancel.is_cancelled() {
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        let Some(raw) = queries.get(index) else {
                            break;
                        };
                        let item = self.run_item(raw);
                        if tx.send((index, item)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            let mut completed = 0;
            for (index, item) in rx {
                completed += 1;
                if let Some(progress) = &self.progress {
                    progress(&BatchProgress {
                        completed,
                        total,
                        query: item.query.clone(),
                        ok: item.result().is_some(),
                    });
                }
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(item);
                }
            }
        });

        let mut unstarted = 0;
        let items: Vec<BatchItem> = slots
            .into_iter()
            .zip(queries)
            .map(|(slot, raw)| {
                slot.unwrap_or_else(|| {
                    unstarted += 1;
                    BatchItem {
                        query: raw.clone(),
                        outcome: BatchOutcome::Failed(FailureRecord::cancelled(raw.as_str())),
                    }
                })
            })
            .collect();

        if unstarted > 0 {
            tracing::warn!(unstarted = unstarted, total = total, "Batch cancelled");
        }
        tracing::info!(
            total = total,
            elapsed_ms = started.elapsed().as_millis(),
            "Batch finished"
        );
        BatchResult::new(items, unstarted > 0)
    }

    fn run_item(&self, raw: &str) -> BatchItem {
        let path = self.analyzer.path();
        match self.config.item_timeout {
            Some(timeout) => traced(path, raw, || self.analyze_with_deadline(raw, timeout)),
            None => traced(path, raw, || analyze_raw(self.analyzer.as_ref(), raw)),
        }
    }

    /// Runs one item on its own thread and abandons it past the deadline.
    ///
    /// The abandoned thread keeps running until its collaborator returns;
    /// its result is discarded.
    fn analyze_with_deadline(&self, raw: &str, timeout: Duration) -> Result<IntentResult> {
        let analyzer = Arc::clone(&self.analyzer);
        let query = raw.to_string();
        let (tx, rx) = mpsc::channel();
        let parent_span = tracing::Span::current();
        let request_id = current_request_id();

        thread::spawn(move || {
            let _request_guard = request_id
                .map(RequestContext::from_id)
                .map(enter_request_context);
            let _parent = parent_span.enter();
            let result = analyze_raw(analyzer.as_ref(), &query);
            // Receiver is gone after a timeout.
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                metrics::counter!("intent_item_timeout_total", "reason" => "timeout").increment(1);
                tracing::debug!("Item deadline exceeded, thread will complete in background");
                Err(Error::Timeout {
                    operation: "analyze_item".to_string(),
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })
            },
            Err(RecvTimeoutError::Disconnected) => {
                metrics::counter!("intent_item_timeout_total", "reason" => "disconnected")
                    .increment(1);
                Err(Error::OperationFailed {
                    operation: "analyze_item".to_string(),
                    cause: "analysis thread exited without a result".to_string(),
                })
            },
        }
    }
}

/// Analyzes queries one at a time on the calling thread.
///
/// Used by analyzers that expose their own batch entry point.
#[must_use]
pub fn analyze_sequential<A: QueryAnalyzer + ?Sized>(
    analyzer: &A,
    queries: &[String],
) -> BatchResult {
    let items = queries
        .iter()
        .map(|raw| traced(analyzer.path(), raw, || analyze_raw(analyzer, raw)))
        .collect();
    BatchResult::new(items, false)
}

fn analyze_raw<A: QueryAnalyzer + ?Sized>(analyzer: &A, raw: &str) -> Result<IntentResult> {
    let query = Query::parse(raw)?;
    panic::catch_unwind(AssertUnwindSafe(|| analyzer.analyze(&query))).unwrap_or_else(|payload| {
        let cause = panic_message(payload.as_ref());
        metrics::counter!("intent_analyzer_panics_total").increment(1);
        tracing::error!(cause = %cause, "Analyzer panicked, recording item as failed");
        Err(Error::OperationFailed {
            operation: "analyze_item".to_string(),
            cause: format!("analyzer panicked: {cause}"),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

/// Runs `analyze` under a fresh request context and records the outcome.
fn traced<F>(path: AnalysisPath, raw: &str, analyze: F) -> BatchItem
where
    F: FnOnce() -> Result<IntentResult>,
{
    let context = RequestContext::new();
    let span = tracing::info_span!(
        "intent.analyze",
        query = %raw,
        request_id = %context.request_id(),
        path = path.as_str()
    );
    let _request = enter_request_context(context);
    let _enter = span.enter();

    let started = Instant::now();
    let result = analyze();
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    let status = match &result {
        Ok(result) => {
            tracing::debug!(
                primary = %result.primary(),
                confidence = result.confidence(),
                elapsed_ms = elapsed_ms,
                "Query analyzed"
            );
            "ok"
        },
        Err(e) => {
            tracing::warn!(
                error = %e,
                error_kind = e.kind().as_str(),
                elapsed_ms = elapsed_ms,
                "Query failed"
            );
            e.kind().as_str()
        },
    };
    metrics::counter!(
        "intent_analyses_total",
        "path" => path.as_str(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!("intent_analysis_duration_ms", "path" => path.as_str())
        .record(elapsed_ms);

    BatchItem::from_result(raw, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::models::{IntentLabel, ScoreVector};

    /// Scores by keyword; "fail" errors, "slow" sleeps, "stop" cancels.
    struct Scripted {
        token: Option<CancellationToken>,
    }

    impl QueryAnalyzer for Scripted {
        fn path(&self) -> AnalysisPath {
            AnalysisPath::Fusion
        }

        #[allow(clippy::panic)]
        fn analyze(&self, query: &Query) -> Result<IntentResult> {
            let text = query.as_str();
            if text.contains("panic") {
                panic!("scripted panic");
            }
            if text.contains("fail") {
                return Err(Error::MalformedResponse {
                    cause: "scripted".to_string(),
                });
            }
            if text.contains("slow") {
                thread::sleep(Duration::from_millis(300));
            }
            if text.contains("stop")
                && let Some(token) = &self.token
            {
                token.cancel();
            }
            thread::sleep(Duration::from_millis(text.len() as u64 % 7));
            let raw = ScoreVector::from_pairs([(IntentLabel::Informational, 60.0)]);
            Ok(IntentResult::from_scores(query.clone(), &raw, self.path(), None))
        }
    }

    fn orchestrator(config: BatchConfig) -> BatchOrchestrator {
        BatchOrchestrator::new(Arc::new(Scripted { token: None }), config).unwrap()
    }

    fn queries(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_rejects_worker_count_out_of_range() {
        for workers in [0, MAX_WORKERS + 1] {
            let err = BatchOrchestrator::new(
                Arc::new(Scripted { token: None }),
                BatchConfig {
                    workers,
                    item_timeout: None,
                },
            )
            .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn test_order_preserved_with_middle_failure() {
        let input = queries(&["alpha", "beta fail", "gamma"]);
        let batch = orchestrator(BatchConfig::default()).run(&input);
        assert_eq!(batch.len(), 3);
        assert!(batch.items()[0].result().is_some());
        assert_eq!(
            batch.items()[1].failure().unwrap().kind,
            ErrorKind::MalformedResponse
        );
        assert!(batch.items()[2].result().is_some());
        assert!(!batch.was_cancelled());
    }

    #[test]
    fn test_parallel_workers_keep_input_order() {
        let input: Vec<String> = (0..40).map(|i| format!("query number {i}")).collect();
        let batch = orchestrator(BatchConfig {
            workers: 4,
            item_timeout: None,
        })
        .run(&input);
        let order: Vec<&str> = batch.items().iter().map(|i| i.query.as_str()).collect();
        let expected: Vec<&str> = input.iter().map(String::as_str).collect();
        assert_eq!(order, expected);
        assert_eq!(batch.results().count(), 40);
    }

    #[test]
    fn test_panicking_item_becomes_failure() {
        let input = queries(&["alpha", "beta panic", "gamma", "delta"]);
        let batch = orchestrator(BatchConfig {
            workers: 2,
            item_timeout: None,
        })
        .run(&input);
        assert_eq!(batch.len(), 4);
        let failure = batch.items()[1].failure().unwrap();
        assert_eq!(failure.kind, ErrorKind::OperationFailed);
        assert!(failure.message.contains("scripted panic"));
        assert_eq!(batch.results().count(), 3);
        assert!(!batch.was_cancelled());
    }

    #[test]
    fn test_panicking_item_under_deadline() {
        let batch = orchestrator(BatchConfig {
            workers: 1,
            item_timeout: Some(Duration::from_secs(5)),
        })
        .run(&queries(&["panic now", "fine"]));
        assert_eq!(
            batch.items()[0].failure().unwrap().kind,
            ErrorKind::OperationFailed
        );
        assert!(batch.items()[1].result().is_some());
    }

    #[test]
    fn test_empty_query_recorded_as_invalid_input() {
        let batch = orchestrator(BatchConfig::default()).run(&queries(&["ok", "   "]));
        assert_eq!(
            batch.items()[1].failure().unwrap().kind,
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn test_item_timeout() {
        let batch = orchestrator(BatchConfig {
            workers: 1,
            item_timeout: Some(Duration::from_millis(50)),
        })
        .run(&queries(&["slow query", "fast"]));
        assert_eq!(batch.items()[0].failure().unwrap().kind, ErrorKind::Timeout);
        assert!(batch.items()[1].result().is_some());
    }

    #[test]
    fn test_cancel_before_run() {
        let orchestrator = orchestrator(BatchConfig::default());
        orchestrator.cancellation_token().cancel();
        let batch = orchestrator.run(&queries(&["a", "b"]));
        assert!(batch.was_cancelled());
        assert!(
            batch
                .failures()
                .all(|failure| failure.kind == ErrorKind::Cancelled)
        );
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_cancel_mid_run_keeps_completed() {
        let token = CancellationToken::new();
        let orchestrator = BatchOrchestrator::new(
            Arc::new(Scripted {
                token: Some(token.clone()),
            }),
            BatchConfig::default(),
        )
        .unwrap()
        .with_cancellation(token);

        let batch = orchestrator.run(&queries(&["first", "stop here", "third", "fourth"]));
        assert!(batch.was_cancelled());
        assert!(batch.items()[0].result().is_some());
        assert!(batch.items()[1].result().is_some());
        assert_eq!(batch.items()[2].failure().unwrap().kind, ErrorKind::Cancelled);
        assert_eq!(batch.items()[3].failure().unwrap().kind, ErrorKind::Cancelled);
    }

    #[test]
    fn test_progress_reports_every_item() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let orchestrator = orchestrator(BatchConfig {
            workers: 2,
            item_timeout: None,
        })
        .with_progress(move |p| sink.lock().unwrap().push(p.clone()));

        orchestrator.run(&queries(&["one", "two fail", "three"]));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen.last().unwrap().completed, 3);
        assert_eq!(seen.iter().filter(|p| !p.ok).count(), 1);
    }

    #[test]
    fn test_sequential_helper() {
        let analyzer = Scripted { token: None };
        let batch = analyze_sequential(&analyzer, &queries(&["x fail", "y"]));
        assert!(batch.items()[0].failure().is_some());
        assert!(batch.items()[1].result().is_some());
    }

    #[test]
    fn test_config_from_settings() {
        let settings = BatchSettings {
            workers: 3,
            item_timeout_ms: 0,
            dedupe: true,
        };
        assert_eq!(BatchConfig::from_settings(&settings).item_timeout, None);
        let settings = BatchSettings {
            item_timeout_ms: 250,
            ..settings
        };
        assert_eq!(
            BatchConfig::from_settings(&settings).item_timeout,
            Some(Duration::from_millis(250))
        );
    }
}
