#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`notification`]: 큐 메시지 → 스토리지 변경 알림 → [`IngestionEvent`] 언랩
//! - [`path_filter`]: 스텝 로그 키 형태만 통과시키는 필터
//! - [`retriever`]: 객체 메타데이터/본문 조회 및 gzip 압축 해제 ([`ObjectStore`] trait)
//! - [`enricher`]: 라인 → [`EnrichedRecord`] 보강
//! - [`batcher`]: 크기/파일 끝 기준 배치 상태 머신
//! - [`indexer`]: 문서 ID 계산 및 벌크 upsert ([`DocumentIndex`] trait)
//! - [`pipeline`]: 전체 흐름 오케스트레이션
//! - [`config`]: 파이프라인 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! QueueEnvelope -> NotificationDecoder -> PathFilter -> ObjectRetriever
//!                                                            |
//!              DocumentIndex <- Indexer <- Batcher <- LineEnricher
//! ```
//!
//! [`IngestionEvent`]: steplog_core::types::IngestionEvent
//! [`EnrichedRecord`]: steplog_core::types::EnrichedRecord

pub mod batcher;
pub mod config;
pub mod enricher;
pub mod error;
pub mod indexer;
pub mod notification;
pub mod path_filter;
pub mod pipeline;
pub mod retriever;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::{
    FileReport, IngestPipeline, IngestPipelineBuilder, InvocationReport, MessageOutcome,
};

// 설정
pub use config::{PipelineConfig, PipelineConfigBuilder};

// 에러
pub use error::IngestError;

// 디코더
pub use notification::{NotificationDecoder, QueueEnvelope, QueueMessage};

// 필터 / 보강
pub use enricher::{FileContext, LineEnricher, LineOutcome};
pub use path_filter::PathFilter;

// 조회
pub use retriever::{ObjectRetriever, ObjectStore, ObjectText, S3ObjectStore, decode_gzip};

// 배치
pub use batcher::{Batch, Batcher, BatcherState, FlushTrigger};

// 인덱싱
pub use indexer::{
    BulkDocument, BulkReport, DocumentFailure, DocumentIndex, Indexer, OpenSearchIndex,
    document_id, index_name,
};
