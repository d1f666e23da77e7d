//! Benchmarks for the offline parts of intent analysis.
//!
//! Benchmark targets:
//! - Modifier extraction: <50us per query
//! - Fusion of four sources: <10us
//! - Model response parsing: <100us
//! - Offline batch of 1000 queries on 4 workers: <100ms

// Criterion macros generate items without docs - this is expected for benchmarks
#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use intent_analyzer::models::{IntentLabel, Query, ScoreVector, SignalSource, WeightConfig};
use intent_analyzer::services::{
    BatchConfig, BatchOrchestrator, FusionPipeline, SourceVectors, fuse, parse_model_response,
};
use intent_analyzer::signals::extract_modifiers;

const QUERIES: &[&str] = &[
    "buy iphone 15 pro",
    "facebook login",
    "how to connect alexa to philips hue",
    "best noise cancelling headphones review vs sony",
    "cheap flights to lisbon in october",
    "what is the meaning of serendipity",
];

const STRICT_REPLY: &str = r#"{"primary_intent": "Transactional", "secondary_intent": "Commercial Investigation", "confidence_scores": {"informational": 10, "transactional": 70, "navigational": 5, "commercial_investigation": 15}, "reasoning": "Purchase verb with a product name."}"#;

const CHATTY_REPLY: &str = "Sure! Based on the query, here is my assessment.\n\n\
    Informational: 15\nTransactional: 5\nNavigational: 70\nCommercial Investigation: 10\n\
    Reasoning: the user names a site and wants to sign in.";

fn bench_modifiers(c: &mut Criterion) {
    let mut group = c.benchmark_group("modifier_extraction");
    group.measurement_time(Duration::from_secs(5));

    for raw in QUERIES {
        let query = Query::parse(raw).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(raw), &query, |b, q| {
            b.iter(|| extract_modifiers(black_box(q)));
        });
    }
    group.finish();
}

fn bench_fuse(c: &mut Criterion) {
    let mut group = c.benchmark_group("fuse");
    let query = Query::parse("best running shoes").unwrap();
    let all = SourceVectors::new()
        .with(
            SignalSource::Serp,
            ScoreVector::from_pairs([(IntentLabel::CommercialInvestigation, 60.0), (IntentLabel::Transactional, 30.0)]),
        )
        .with(
            SignalSource::Modifiers,
            ScoreVector::from_pairs([(IntentLabel::CommercialInvestigation, 30.0)]),
        )
        .with(
            SignalSource::Content,
            ScoreVector::from_pairs([(IntentLabel::Transactional, 45.0), (IntentLabel::Informational, 20.0)]),
        )
        .with(
            SignalSource::Classifier,
            ScoreVector::from_pairs([(IntentLabel::CommercialInvestigation, 55.0)]),
        );
    let modifiers_only = SourceVectors::new().with(
        SignalSource::Modifiers,
        ScoreVector::from_pairs([(IntentLabel::CommercialInvestigation, 30.0)]),
    );
    let weights = WeightConfig::default();

    group.bench_function("four_sources", |b| {
        b.iter(|| fuse(black_box(query.clone()), black_box(&all), &weights));
    });
    group.bench_function("redistributed", |b| {
        b.iter(|| fuse(black_box(query.clone()), black_box(&modifiers_only), &weights));
    });
    group.finish();
}

fn bench_response_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("response_parsing");
    group.bench_function("strict_json", |b| {
        b.iter(|| parse_model_response(black_box(STRICT_REPLY)));
    });
    let fenced = format!("Here you go:\n```json\n{STRICT_REPLY}\n```");
    group.bench_function("fenced_json", |b| {
        b.iter(|| parse_model_response(black_box(&fenced)));
    });
    group.bench_function("key_value", |b| {
        b.iter(|| parse_model_response(black_box(CHATTY_REPLY)));
    });
    group.finish();
}

fn bench_offline_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("offline_batch");
    group.sample_size(20);

    let queries: Vec<String> = (0..1000)
        .map(|i| format!("{} {i}", QUERIES[i % QUERIES.len()]))
        .collect();
    let analyzer = Arc::new(FusionPipeline::new(WeightConfig::default()));

    for workers in [1, 4] {
        let orchestrator = BatchOrchestrator::new(
            analyzer.clone(),
            BatchConfig {
                workers,
                item_timeout: None,
            },
        )
        .unwrap();
        group.throughput(Throughput::Elements(queries.len() as u64));
        group.bench_with_input(BenchmarkId::new("workers", workers), &queries, |b, q| {
            b.iter(|| orchestrator.run(black_box(q)));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_modifiers,
    bench_fuse,
    bench_response_parsing,
    bench_offline_batch
);
criterion_main!(benches);
