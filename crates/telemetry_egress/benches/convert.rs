//! Conversion and dispatch benchmarks
//!
//! Measures the work done on the instrumentation call path: turning captured
//! spans and aggregates into wire records, and offering them to the engine.
//!
//! Run with: cargo bench --bench convert

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use telemetry_egress::{
    convert_aggregate, convert_span, reconstruct_centroids, Aggregation, Annotation,
    CapturedAggregate, CapturedSpan, ConversionContext, DispatchMode, DistributionData,
    Exporter, ExporterConfig, MessageEvent, MessageEventKind, NullSender, SpanId, SpanKind,
    SpanStatus, TraceId,
};

fn context() -> ConversionContext {
    ConversionContext::new(
        "bench-host",
        HashMap::from([
            ("application".to_string(), "bench".to_string()),
            ("service".to_string(), "convert".to_string()),
        ]),
    )
}

fn rich_span() -> CapturedSpan {
    let mut span = CapturedSpan::new(
        "GET /api/orders",
        TraceId::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef),
        SpanId::from_u64(0xfedc_ba98_7654_3210),
        SpanId::from_u64(42),
    );
    span.kind = SpanKind::Server;
    span.status = SpanStatus::error(14, "upstream unavailable");
    for i in 0..8_i64 {
        span.set_attribute(format!("attr.{i}"), i);
    }
    span.annotations.push(Annotation {
        time: UNIX_EPOCH + Duration::from_millis(10),
        message: "retrying".to_string(),
        attributes: HashMap::new(),
    });
    span.message_events.push(MessageEvent {
        time: UNIX_EPOCH + Duration::from_millis(12),
        kind: MessageEventKind::Sent,
        message_id: 1,
        uncompressed_size: 2048,
        compressed_size: 512,
    });
    span
}

fn distribution(buckets: usize) -> DistributionData {
    let mut rng = rand::thread_rng();
    DistributionData {
        bounds: (1..=buckets).map(|b| b as f64 * 10.0).collect(),
        counts: (0..=buckets).map(|_| rng.gen_range(0..100)).collect(),
        min: 0.5,
        max: buckets as f64 * 10.0 + 5.0,
        mean: 0.0,
        exemplars: (0..=buckets).map(|_| Some(rng.gen_range(0.0..1000.0))).collect(),
    }
}

// =============================================================================
// CONVERSION (pure, single-threaded)
// =============================================================================

fn bench_convert_span(c: &mut Criterion) {
    let ctx = context();
    let span = rich_span();

    let mut group = c.benchmark_group("convert_span");
    group.throughput(Throughput::Elements(1));
    group.bench_function("rich_span", |b| {
        b.iter(|| convert_span(black_box(&span), &ctx));
    });
    group.finish();
}

fn bench_reconstruct_centroids(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruct_centroids");
    for buckets in [8, 64, 512] {
        let data = distribution(buckets);
        group.throughput(Throughput::Elements(buckets as u64 + 1));
        group.bench_with_input(BenchmarkId::from_parameter(buckets), &data, |b, data| {
            b.iter(|| reconstruct_centroids(black_box(data)));
        });
    }
    group.finish();
}

fn bench_convert_aggregate(c: &mut Criterion) {
    let ctx = context();
    let mut record = CapturedAggregate::new("http.latency", "ms");
    for route in 0..16 {
        let tags = HashMap::from([("route".to_string(), format!("/r{route}"))]);
        record = record
            .with_row(tags.clone(), Aggregation::Distribution(distribution(32)))
            .with_row(tags, Aggregation::Count(route));
    }

    let mut group = c.benchmark_group("convert_aggregate");
    group.throughput(Throughput::Elements(record.rows.len() as u64));
    group.bench_function("32_rows", |b| {
        b.iter(|| convert_aggregate(black_box(&record), &ctx));
    });
    group.finish();
}

// =============================================================================
// EXPORT PATH (conversion + non-blocking dispatch)
// =============================================================================

fn bench_export_span(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let span = rich_span();

    let mut group = c.benchmark_group("export_span");
    group.throughput(Throughput::Elements(1));
    for mode in [DispatchMode::Slots, DispatchMode::Worker] {
        let config = ExporterConfig::default()
            .with_dispatch_mode(mode)
            .with_queue_size(10_000);
        let exporter = Exporter::with_runtime(Arc::new(NullSender::new()), config, runtime.handle().clone());

        group.bench_function(format!("{mode:?}"), |b| {
            b.iter(|| exporter.export_span(black_box(&span)));
        });
        runtime.block_on(exporter.flush());
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_convert_span,
    bench_reconstruct_centroids,
    bench_convert_aggregate,
    bench_export_span,
);
criterion_main!(benches);
