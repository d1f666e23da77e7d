//! End-to-end batch runs: import, analyze with a stub search provider,
//! export, and read the report back.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use intent_analyzer::io::{ExportOptions, Format, export_to_path, read_queries_from_path};
use intent_analyzer::models::{BatchFilter, IntentLabel, Query, SignalSource, WeightConfig};
use intent_analyzer::search::{PageDocument, SearchOptions, SearchProvider, SearchResponse, SearchResult};
use intent_analyzer::services::{BatchConfig, BatchOrchestrator, FusionPipeline, QueryAnalyzer};
use intent_analyzer::{Error, Result};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returns a fixed page of results, failing for queries mentioning "offline".
#[derive(Default)]
struct StubSearch {
    searches: AtomicUsize,
}

impl SearchProvider for StubSearch {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn search(&self, query: &Query, _options: &SearchOptions) -> Result<SearchResponse> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if query.as_ref().contains("offline") {
            return Err(Error::ServiceUnavailable {
                service: "stub".to_string(),
                cause: "connection refused".to_string(),
            });
        }
        Ok(SearchResponse {
            results: vec![
                SearchResult {
                    url: "https://en.wikipedia.org/wiki/Topic".to_string(),
                    title: "Topic - Wikipedia".to_string(),
                    description: "An encyclopedia article.".to_string(),
                    markdown: Some("# Topic\n\nWhat it is and how it works.".to_string()),
                    html: None,
                },
                SearchResult {
                    url: "https://www.reddit.com/r/topic".to_string(),
                    title: "r/topic".to_string(),
                    ..SearchResult::default()
                },
            ],
        })
    }

    fn fetch_content(&self, url: &str) -> Result<PageDocument> {
        Err(Error::ServiceUnavailable {
            service: "stub".to_string(),
            cause: format!("no content for {url}"),
        })
    }
}

fn pipeline(search: Arc<StubSearch>) -> Arc<dyn QueryAnalyzer> {
    Arc::new(
        FusionPipeline::new(WeightConfig::default())
            .with_search(search, SearchOptions::default()),
    )
}

fn write_input(lines: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    file.write_all(lines.as_bytes()).unwrap();
    file
}

#[test]
fn test_batch_end_to_end_csv() {
    let input = write_input("buy running shoes\nhow to bake bread\n\nbuy running shoes\noffline pricing\n");
    let imported = read_queries_from_path(input.path(), None, true).unwrap();
    assert_eq!(imported.queries.len(), 3);
    assert_eq!(imported.skipped_duplicates, 1);

    let search = Arc::new(StubSearch::default());
    let config = BatchConfig {
        workers: 3,
        item_timeout: None,
    };
    let batch = BatchOrchestrator::new(pipeline(Arc::clone(&search)), config)
        .unwrap()
        .run(&imported.queries);

    assert_eq!(batch.len(), 3);
    assert!(!batch.was_cancelled());
    assert_eq!(batch.failures().count(), 0);
    assert_eq!(search.searches.load(Ordering::SeqCst), 3);

    let queries: Vec<&str> = batch.items().iter().map(|i| i.query.as_str()).collect();
    assert_eq!(queries, imported.queries.iter().map(String::as_str).collect::<Vec<_>>());

    let results: Vec<_> = batch.results().collect();
    let with_serp = results[0].breakdown().unwrap();
    assert!(with_serp.weights.get(SignalSource::Serp).is_some());
    assert!(with_serp.weights.get(SignalSource::Content).is_some());
    let without_serp = results[2].breakdown().unwrap();
    assert!(without_serp.absent.contains(&SignalSource::Serp));
    assert!(without_serp.absent.contains(&SignalSource::Content));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.csv");
    let exported = export_to_path(&path, &batch, &ExportOptions::default()).unwrap();
    assert_eq!(exported.exported, 3);

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[0], "query");
    assert_eq!(&headers[1], "primary_intent");
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[1][0], "how to bake bread");
    assert_eq!(&rows[1][1], "Informational");
}

#[test]
fn test_batch_json_report_filtered() {
    let queries: Vec<String> = ["buy a laptop", "laptop discount", "what is a laptop", ""]
        .iter()
        .map(ToString::to_string)
        .collect();
    let analyzer: Arc<dyn QueryAnalyzer> = Arc::new(FusionPipeline::new(WeightConfig::default()));
    let batch = BatchOrchestrator::new(analyzer, BatchConfig::default())
        .unwrap()
        .run(&queries);

    let failures: Vec<_> = batch.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, intent_analyzer::ErrorKind::InvalidInput);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    let options = ExportOptions::default()
        .with_format(Format::Json)
        .with_filter(BatchFilter {
            intents: vec![IntentLabel::Transactional],
            ..BatchFilter::default()
        });
    let exported = export_to_path(&path, &batch, &options).unwrap();
    assert_eq!(exported.exported, 2);
    assert_eq!(exported.total, 4);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(report["generated_at"].as_str().unwrap().ends_with('Z'));
    assert_eq!(report["summary"]["total"], 2);
    let rows = report["results"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r["primary_intent"] == "Transactional"));
}
