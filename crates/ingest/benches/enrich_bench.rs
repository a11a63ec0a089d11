//! 라인 보강 / 배치 / 벌크 본문 벤치마크
//!
//! 파일 하나 분량의 라인을 보강하고 배치로 묶어 NDJSON 본문을 만드는 처리량을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use steplog_core::types::IngestionEvent;
use steplog_ingest::indexer::build_bulk_body;
use steplog_ingest::{BulkDocument, Batcher, LineEnricher, LineOutcome, PathFilter, document_id};

const STEP_LINE: &str = "24/01/15 12:00:00 INFO TaskSetManager: Finished task 12.0 in stage 3.0 (TID 118) in 2043 ms on ip-10-0-1-12.ec2.internal (executor 4) (13/200)";

fn event() -> IngestionEvent {
    IngestionEvent {
        source_bucket: "emr-logs".to_owned(),
        object_key: "emr/j-2AXXXXXXGAPLF/steps/s-1000XXXXXXXX/stdout.gz".to_owned(),
        region: "us-east-1".to_owned(),
        event_time: "2024-01-15T12:00:00.000Z".to_owned(),
    }
}

fn bench_enrich(c: &mut Criterion) {
    let enricher = LineEnricher::new().unwrap();
    let ctx = enricher.file_context(&event(), "2024-01-15T11:59:58+00:00".to_owned());

    let mut group = c.benchmark_group("enrich");
    group.throughput(Throughput::Elements(1));
    group.bench_function("single_line", |b| {
        b.iter(|| enricher.enrich(black_box(42), black_box(STEP_LINE), &ctx))
    });
    group.bench_function("blank_line", |b| {
        b.iter(|| enricher.enrich(black_box(42), black_box("   "), &ctx))
    });
    group.finish();
}

fn bench_batching(c: &mut Criterion) {
    let enricher = LineEnricher::new().unwrap();
    let ctx = enricher.file_context(&event(), "2024-01-15T11:59:58+00:00".to_owned());

    let mut group = c.benchmark_group("batch_file");
    for lines in [1_000u64, 10_000] {
        group.throughput(Throughput::Elements(lines));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &lines, |b, &lines| {
            b.iter(|| {
                let mut batcher = Batcher::new(1000, lines);
                let mut flushed = 0usize;
                for n in 1..=lines {
                    if let Some(batch) = batcher.push(n, enricher.enrich(n, STEP_LINE, &ctx)) {
                        flushed += batch.len();
                    }
                }
                black_box(flushed)
            })
        });
    }
    group.finish();
}

fn bench_bulk_body(c: &mut Criterion) {
    let enricher = LineEnricher::new().unwrap();
    let ctx = enricher.file_context(&event(), "2024-01-15T11:59:58+00:00".to_owned());
    let records: Vec<_> = (1..=1000)
        .filter_map(|n| match enricher.enrich(n, STEP_LINE, &ctx) {
            LineOutcome::Record(record) => Some(record),
            LineOutcome::Skipped => None,
        })
        .collect();

    let mut group = c.benchmark_group("indexer");
    group.throughput(Throughput::Elements(records.len() as u64));
    group.bench_function("bulk_body_1000", |b| {
        b.iter(|| {
            let docs: Vec<_> = records.iter().map(BulkDocument::from_record).collect();
            build_bulk_body(black_box("emr-logs-2024-01-15"), &docs).unwrap()
        })
    });
    group.bench_function("document_id", |b| {
        b.iter(|| document_id(black_box("s3://emr-logs/emr/j-1/steps/s-1/stdout.gz"), black_box(1234)))
    });
    group.finish();
}

fn bench_path_filter(c: &mut Criterion) {
    let filter = PathFilter::new().unwrap();
    c.bench_function("path_filter/accepts", |b| {
        b.iter(|| filter.accepts(black_box("emr/j-2AXXXXXXGAPLF/steps/s-1000XXXXXXXX/stderr.gz")))
    });
}

criterion_group!(
    benches,
    bench_enrich,
    bench_batching,
    bench_bulk_body,
    bench_path_filter
);
criterion_main!(benches);
