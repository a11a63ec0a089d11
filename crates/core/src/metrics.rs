//! 메트릭 상수
//!
//! 모든 메트릭의 이름을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `steplog_ingest_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! 익스포터는 설치하지 않습니다. 호스트 환경에 레코더가 있으면 수집됩니다.

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 플러시 트리거 레이블 키 (size, end_of_file)
pub const LABEL_TRIGGER: &str = "trigger";

// ─── Ingest 메트릭 ─────────────────────────────────────────────────

/// 디코딩된 수집 이벤트 수 (counter)
pub const INGEST_EVENTS_DECODED_TOTAL: &str = "steplog_ingest_events_decoded_total";

/// 해석에 실패한 큐 메시지 수 (counter)
pub const INGEST_MALFORMED_MESSAGES_TOTAL: &str = "steplog_ingest_malformed_messages_total";

/// 경로 필터에서 제외된 키 수 (counter)
pub const INGEST_KEYS_FILTERED_TOTAL: &str = "steplog_ingest_keys_filtered_total";

/// 처리된 파일 수 (counter, label: result)
pub const INGEST_FILES_TOTAL: &str = "steplog_ingest_files_total";

/// 인덱싱된 레코드 수 (counter)
pub const INGEST_RECORDS_INDEXED_TOTAL: &str = "steplog_ingest_records_indexed_total";

/// 건너뛴 빈 라인 수 (counter)
pub const INGEST_LINES_SKIPPED_TOTAL: &str = "steplog_ingest_lines_skipped_total";

/// 플러시된 배치 수 (counter, label: trigger)
pub const INGEST_BATCHES_FLUSHED_TOTAL: &str = "steplog_ingest_batches_flushed_total";

/// 벌크 쓰기에서 실패한 문서 수 (counter)
pub const INGEST_DOCUMENT_FAILURES_TOTAL: &str = "steplog_ingest_document_failures_total";

/// 파일 하나의 처리 시간 (histogram, 초)
pub const INGEST_FILE_DURATION_SECONDS: &str = "steplog_ingest_file_duration_seconds";
