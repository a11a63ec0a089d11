#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use steplog_core::types::IngestionEvent;
use steplog_ingest::{LineEnricher, LineOutcome, PathFilter};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    bucket: String,
    key: String,
    line: String,
    line_number: u64,
}

fuzz_target!(|input: FuzzInput| {
    let (Ok(filter), Ok(enricher)) = (PathFilter::new(), LineEnricher::new()) else {
        return;
    };

    let accepted = filter.accepts(&input.key);

    let event = IngestionEvent {
        source_bucket: input.bucket,
        object_key: input.key,
        region: "us-east-1".to_owned(),
        event_time: String::new(),
    };
    let ctx = enricher.file_context(&event, String::new());

    // 필터를 통과한 키는 항상 클러스터/스텝 ID를 모두 가져야 함
    if accepted {
        assert!(ctx.ids.cluster_id().is_some());
        assert!(ctx.ids.step_id().is_some());
    }

    match enricher.enrich(input.line_number, &input.line, &ctx) {
        LineOutcome::Record(record) => {
            assert_eq!(record.raw_log, input.line);
            assert_eq!(record.log_file_line_number, input.line_number);
        }
        LineOutcome::Skipped => assert!(input.line.trim().is_empty()),
    }
});
