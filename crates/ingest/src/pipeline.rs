//! 파이프라인 오케스트레이션 -- 디코딩/필터/조회/보강/배치/인덱싱의 전체 흐름을 관리합니다.
//!
//! [`IngestPipeline`]은 큐 이벤트 하나(호출 하나)를 순차적으로 처리하고
//! 메시지별 결과를 [`InvocationReport`]로 돌려줍니다.
//!
//! # 내부 아키텍처
//! ```text
//! QueueEnvelope -> NotificationDecoder -> PathFilter -> ObjectRetriever
//!     -> LineEnricher -> Batcher -> Indexer -> DocumentIndex
//! ```
//!
//! # 실패 범위
//! - 메시지 해석 실패: 해당 메시지만 실패, 다음 메시지 계속 처리
//! - 파일 실패 (조회/디코딩/벌크 요청): 해당 파일만 중단, 같은 메시지의 다음 파일 계속 처리
//! - 문서 단위 실패: 다음 배치 계속 처리, 메시지는 실패로 표시
//!
//! 내부 재시도는 없습니다. 재처리는 실패한 메시지의 재전달로 이루어지며,
//! 문서 ID가 결정적이므로 재처리는 멱등합니다.

use std::time::Instant;

use serde::Serialize;

use steplog_core::error::SteplogError;
use steplog_core::metrics as m;
use steplog_core::types::IngestionEvent;

use crate::batcher::{Batch, Batcher};
use crate::config::PipelineConfig;
use crate::enricher::LineEnricher;
use crate::error::IngestError;
use crate::indexer::{DocumentFailure, DocumentIndex, Indexer};
use crate::notification::{NotificationDecoder, QueueEnvelope};
use crate::path_filter::PathFilter;
use crate::retriever::{ObjectRetriever, ObjectStore};

/// 파일 하나의 처리 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    /// 원본 버킷
    pub bucket: String,
    /// 원본 키
    pub key: String,
    /// 압축 해제 후 전체 라인 수
    pub total_lines: u64,
    /// 인덱싱에 성공한 레코드 수
    pub indexed: u64,
    /// 건너뛴 빈 라인 수
    pub skipped: u64,
    /// 플러시된 배치 수
    pub batches_flushed: u64,
    /// 모든 배치에서 모은 문서 단위 실패
    pub document_failures: Vec<DocumentFailure>,
}

impl FileReport {
    fn new(event: &IngestionEvent, total_lines: u64) -> Self {
        Self {
            bucket: event.source_bucket.clone(),
            key: event.object_key.clone(),
            total_lines,
            indexed: 0,
            skipped: 0,
            batches_flushed: 0,
            document_failures: Vec::new(),
        }
    }

    /// 문서 단위 실패가 있었는지 확인합니다.
    pub fn has_failures(&self) -> bool {
        !self.document_failures.is_empty()
    }
}

/// 큐 메시지 하나의 처리 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MessageOutcome {
    /// 큐 메시지 ID
    pub message_id: String,
    /// 처리 완료된 파일
    pub files: Vec<FileReport>,
    /// 경로 필터에서 제외된 키 수
    pub filtered: u64,
    /// 메시지 해석 실패 또는 파일 실패 사유 ([`SteplogError`] 분류 포함)
    pub errors: Vec<String>,
}

impl MessageOutcome {
    /// 빈 결과를 생성합니다.
    pub fn new(message_id: &str) -> Self {
        Self {
            message_id: message_id.to_owned(),
            ..Default::default()
        }
    }

    /// 재전달이 필요한 메시지인지 확인합니다.
    ///
    /// 해석 실패, 파일 실패, 문서 단위 실패 중 하나라도 있으면 실패입니다.
    pub fn failed(&self) -> bool {
        !self.errors.is_empty() || self.files.iter().any(FileReport::has_failures)
    }
}

/// 호출 하나의 처리 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvocationReport {
    /// 호출 ID
    pub invocation_id: String,
    /// 메시지별 결과 (입력 순서 유지)
    pub messages: Vec<MessageOutcome>,
}

impl InvocationReport {
    /// 실패한 메시지 ID 목록 (부분 재전달 응답용)
    pub fn failed_message_ids(&self) -> Vec<String> {
        self.messages
            .iter()
            .filter(|m| m.failed())
            .map(|m| m.message_id.clone())
            .collect()
    }

    /// 처리 완료된 파일 수
    pub fn files_processed(&self) -> usize {
        self.messages.iter().map(|m| m.files.len()).sum()
    }

    /// 인덱싱된 레코드 총합
    pub fn records_indexed(&self) -> u64 {
        self.messages
            .iter()
            .flat_map(|m| &m.files)
            .map(|f| f.indexed)
            .sum()
    }

    /// 건너뛴 라인 총합
    pub fn lines_skipped(&self) -> u64 {
        self.messages
            .iter()
            .flat_map(|m| &m.files)
            .map(|f| f.skipped)
            .sum()
    }

    /// 문서 단위 실패 총합
    pub fn document_failures(&self) -> usize {
        self.messages
            .iter()
            .flat_map(|m| &m.files)
            .map(|f| f.document_failures.len())
            .sum()
    }
}

/// 수집 파이프라인
///
/// 클라이언트는 프로세스당 한 번 생성되어 빌더로 주입됩니다.
/// 호출 안에서는 모든 단계가 순차적으로 진행됩니다.
///
/// # 사용 예시
/// ```ignore
/// use steplog_ingest::{IngestPipelineBuilder, OpenSearchIndex, S3ObjectStore};
///
/// let pipeline = IngestPipelineBuilder::new()
///     .config(config)
///     .object_store(S3ObjectStore::from_sdk_config(&sdk_config))
///     .document_index(OpenSearchIndex::from_config(&core_config.ingest))
///     .build()?;
///
/// let report = pipeline.process(&envelope).await;
/// ```
pub struct IngestPipeline<S, I> {
    config: PipelineConfig,
    decoder: NotificationDecoder,
    filter: PathFilter,
    retriever: ObjectRetriever<S>,
    enricher: LineEnricher,
    indexer: Indexer<I>,
}

impl<S: ObjectStore, I: DocumentIndex> IngestPipeline<S, I> {
    /// 파이프라인 설정
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 주입된 스토리지 구현
    pub fn object_store(&self) -> &S {
        self.retriever.store()
    }

    /// 주입된 문서 저장소 구현
    pub fn document_index(&self) -> &I {
        self.indexer.document_index()
    }

    /// 새 호출 ID를 생성하여 큐 이벤트를 처리합니다.
    pub async fn process(&self, envelope: &QueueEnvelope) -> InvocationReport {
        let invocation_id = uuid::Uuid::new_v4().to_string();
        self.process_envelope(envelope, &invocation_id).await
    }

    /// 큐 이벤트 하나를 처리합니다.
    ///
    /// 개별 실패는 결과에 기록될 뿐, 이 함수 자체는 실패하지 않습니다.
    pub async fn process_envelope(
        &self,
        envelope: &QueueEnvelope,
        invocation_id: &str,
    ) -> InvocationReport {
        tracing::info!(
            invocation_id,
            messages = envelope.records.len(),
            "processing queue event"
        );

        let mut report = InvocationReport {
            invocation_id: invocation_id.to_owned(),
            messages: Vec::with_capacity(envelope.records.len()),
        };

        for message in &envelope.records {
            let mut outcome = MessageOutcome::new(message.id());

            let events = match self.decoder.decode_message(message) {
                Ok(events) => events,
                Err(e) => {
                    metrics::counter!(m::INGEST_MALFORMED_MESSAGES_TOTAL).increment(1);
                    tracing::warn!(
                        invocation_id,
                        message_id = message.id(),
                        error = %e,
                        "failed to decode queue message"
                    );
                    outcome.errors.push(SteplogError::from(e).to_string());
                    report.messages.push(outcome);
                    continue;
                }
            };

            for event in events {
                metrics::counter!(m::INGEST_EVENTS_DECODED_TOTAL).increment(1);

                if !self.filter.accepts(&event.object_key) {
                    metrics::counter!(m::INGEST_KEYS_FILTERED_TOTAL).increment(1);
                    outcome.filtered += 1;
                    continue;
                }

                match self.process_file(&event).await {
                    Ok(file) => {
                        metrics::counter!(m::INGEST_FILES_TOTAL, m::LABEL_RESULT => "success")
                            .increment(1);
                        outcome.files.push(file);
                    }
                    Err(e) => {
                        metrics::counter!(m::INGEST_FILES_TOTAL, m::LABEL_RESULT => "failure")
                            .increment(1);
                        tracing::error!(
                            invocation_id,
                            message_id = message.id(),
                            log_file = %event.log_file(),
                            error = %e,
                            "failed to process log file"
                        );
                        outcome.errors.push(SteplogError::from(e).to_string());
                    }
                }
            }

            report.messages.push(outcome);
        }

        tracing::info!(
            invocation_id,
            files = report.files_processed(),
            records = report.records_indexed(),
            skipped = report.lines_skipped(),
            document_failures = report.document_failures(),
            failed_messages = report.failed_message_ids().len(),
            "queue event processed"
        );

        report
    }

    /// 로그 파일 하나를 조회, 보강, 배치, 인덱싱합니다.
    ///
    /// 경로 필터는 적용하지 않습니다. 조회/디코딩/벌크 요청 실패 시
    /// 남은 라인을 처리하지 않고 에러를 반환합니다.
    pub async fn process_file(&self, event: &IngestionEvent) -> Result<FileReport, IngestError> {
        let started = Instant::now();
        let log_file = event.log_file();

        let modified = self.retriever.last_modified(event).await?;
        let text = self.retriever.fetch_text(event).await?;
        let lines = text.lines();
        let total_lines = lines.len() as u64;

        tracing::info!(
            log_file = %log_file,
            region = %event.region,
            event_time = %event.event_time,
            entries = total_lines,
            "log file retrieved"
        );

        let ctx = self.enricher.file_context(event, modified.to_rfc3339());
        let mut batcher = Batcher::new(self.config.batch_size, total_lines);
        let mut report = FileReport::new(event, total_lines);

        for (idx, line) in lines.iter().enumerate() {
            let line_number = idx as u64 + 1;
            let outcome = self.enricher.enrich(line_number, line, &ctx);
            if let Some(batch) = batcher.push(line_number, outcome) {
                self.flush(&batch, &mut report).await?;
                batcher.complete_flush();
            }
        }
        if let Some(batch) = batcher.finish() {
            self.flush(&batch, &mut report).await?;
        }

        report.skipped = batcher.skipped();
        report.batches_flushed = batcher.batches_flushed();

        if report.skipped > 0 {
            metrics::counter!(m::INGEST_LINES_SKIPPED_TOTAL).increment(report.skipped);
            tracing::info!(log_file = %log_file, skipped = report.skipped, "skipped blank lines");
        }

        metrics::histogram!(m::INGEST_FILE_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        tracing::info!(
            log_file = %log_file,
            indexed = report.indexed,
            batches = report.batches_flushed,
            document_failures = report.document_failures.len(),
            "log file indexed"
        );

        Ok(report)
    }

    async fn flush(&self, batch: &Batch, report: &mut FileReport) -> Result<(), IngestError> {
        let bulk = self.indexer.write_batch(batch).await?;

        metrics::counter!(m::INGEST_BATCHES_FLUSHED_TOTAL, m::LABEL_TRIGGER => batch.trigger.as_str())
            .increment(1);
        metrics::counter!(m::INGEST_RECORDS_INDEXED_TOTAL).increment(bulk.succeeded as u64);
        if !bulk.failures.is_empty() {
            metrics::counter!(m::INGEST_DOCUMENT_FAILURES_TOTAL)
                .increment(bulk.failures.len() as u64);
        }

        report.indexed += bulk.succeeded as u64;
        report.document_failures.extend(bulk.failures);
        Ok(())
    }
}

/// 수집 파이프라인 빌더
pub struct IngestPipelineBuilder<S, I> {
    config: PipelineConfig,
    store: Option<S>,
    index: Option<I>,
}

impl<S: ObjectStore, I: DocumentIndex> IngestPipelineBuilder<S, I> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            store: None,
            index: None,
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 원본 객체 스토리지를 지정합니다.
    pub fn object_store(mut self, store: S) -> Self {
        self.store = Some(store);
        self
    }

    /// 문서 저장소를 지정합니다.
    pub fn document_index(mut self, index: I) -> Self {
        self.index = Some(index);
        self
    }

    /// 파이프라인을 빌드합니다.
    pub fn build(self) -> Result<IngestPipeline<S, I>, IngestError> {
        self.config.validate()?;

        let store = self.store.ok_or_else(|| IngestError::Config {
            field: "object_store".to_owned(),
            reason: "object store is required".to_owned(),
        })?;
        let index = self.index.ok_or_else(|| IngestError::Config {
            field: "document_index".to_owned(),
            reason: "document index is required".to_owned(),
        })?;

        Ok(IngestPipeline {
            decoder: NotificationDecoder::new(),
            filter: PathFilter::new()?,
            retriever: ObjectRetriever::new(store, &self.config),
            enricher: LineEnricher::new()?,
            indexer: Indexer::new(index, &self.config),
            config: self.config,
        })
    }
}

impl<S: ObjectStore, I: DocumentIndex> Default for IngestPipelineBuilder<S, I> {
    fn default() -> Self {
        Self::new()
    }
}
