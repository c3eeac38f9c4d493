//! Criterion benchmarks for the enqueue hot path

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use logdash::prelude::*;
use logdash::sinks::{HttpLogSink, Sink};
use logdash::{AsyncQueue, MetricEntry};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Transport that accepts everything instantly
struct NullTransport;

impl Transport for NullTransport {
    fn send_data(&self, _endpoint: &str, _method: HttpMethod, _payload: &Value) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Queue Benchmarks
// ============================================================================

fn bench_async_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_queue");
    group.throughput(Throughput::Elements(1));

    let drop_queue =
        AsyncQueue::bounded(1024, OverflowPolicy::Drop, |_: u64| Ok(()), Arc::new(|_| {}))
            .unwrap();
    group.bench_function("send_drop_policy", |b| {
        b.iter(|| drop_queue.send(black_box(42)));
    });

    let block_queue =
        AsyncQueue::bounded(1024, OverflowPolicy::Block, |_: u64| Ok(()), Arc::new(|_| {}))
            .unwrap();
    group.bench_function("send_block_policy", |b| {
        b.iter(|| block_queue.send(black_box(42)));
    });

    group.finish();
    let _ = drop_queue.close();
    let _ = block_queue.close();
}

// ============================================================================
// Logging Benchmarks
// ============================================================================

fn bench_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("logging");
    group.throughput(Throughput::Elements(1));

    let noop = Logger::noop();
    group.bench_function("noop_logger", |b| {
        b.iter(|| noop.info(black_box("Benchmark message")));
    });

    let sink = HttpLogSink::new(
        Arc::new(NullTransport),
        4096,
        OverflowPolicy::Drop,
        Arc::new(Logger::noop()),
        None,
    )
    .unwrap();
    let remote = Logger::new(vec![Sink::Http(sink)]);
    group.bench_function("remote_logger", |b| {
        b.iter(|| remote.info(black_box("Benchmark message")));
    });

    group.finish();
    let _ = remote.shutdown(Duration::from_secs(5));
}

// ============================================================================
// Metrics Benchmarks
// ============================================================================

fn bench_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics");
    group.throughput(Throughput::Elements(1));

    group.bench_function("merge", |b| {
        let mut acc = MetricEntry::mutate("requests", 0.0);
        b.iter(|| acc.merge(black_box(MetricEntry::mutate("requests", 1.0))));
    });

    let logdash = Logdash::builder()
        .transport(Arc::new(NullTransport))
        .build()
        .unwrap();

    group.bench_function("mutate_single_name", |b| {
        b.iter(|| logdash.metrics().mutate("requests", black_box(1.0)));
    });

    let names: Vec<String> = (0..16).map(|i| format!("metric_{}", i)).collect();
    let mut next = 0usize;
    group.bench_function("mutate_many_names", |b| {
        b.iter(|| {
            next = (next + 1) % names.len();
            logdash.metrics().set(names[next].as_str(), black_box(1.0));
        });
    });

    group.finish();
    let _ = logdash.shutdown(Duration::from_secs(30));
}

criterion_group!(benches, bench_async_queue, bench_logging, bench_metrics);
criterion_main!(benches);
