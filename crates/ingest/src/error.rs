//! 수집 파이프라인 에러 타입
//!
//! [`IngestError`]는 수집 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<IngestError> for SteplogError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! # 전파 범위
//! - `MalformedNotification`: 해당 큐 메시지 하나만 실패
//! - `Retrieval` / `Decode` / `Index`: 해당 파일 하나만 실패
//! - 문서 단위 벌크 실패는 에러가 아니라 [`BulkReport`](crate::indexer::BulkReport)로 보고됩니다.

use steplog_core::error::{ConfigError, PipelineError, SteplogError, StorageError};

/// 수집 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// 큐 메시지 또는 내부 알림의 필수 필드 해석 실패
    #[error("malformed notification in message '{message_id}': {reason}")]
    MalformedNotification {
        /// 큐 메시지 ID (없으면 "unknown")
        message_id: String,
        /// 실패 사유
        reason: String,
    },

    /// 원본 객체 메타데이터/본문 조회 실패 (없음, 권한, 네트워크, 타임아웃)
    #[error("retrieval failed for {location}: {reason}")]
    Retrieval {
        /// `s3://bucket/key`
        location: String,
        /// 실패 사유
        reason: String,
    },

    /// 압축 해제 또는 UTF-8 디코딩 실패
    #[error("decode failed for {location}: {reason}")]
    Decode {
        /// `s3://bucket/key`
        location: String,
        /// 실패 사유
        reason: String,
    },

    /// 벌크 쓰기 전체 실패 (전송 에러, 비정상 응답, 타임아웃)
    #[error("bulk write to '{index}' failed: {reason}")]
    Index {
        /// 대상 인덱스 이름
        index: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<IngestError> for SteplogError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::MalformedNotification { .. } => {
                SteplogError::Pipeline(PipelineError::MalformedNotification(err.to_string()))
            }
            IngestError::Retrieval { .. } => {
                SteplogError::Storage(StorageError::ObjectStore(err.to_string()))
            }
            IngestError::Decode { .. } => {
                SteplogError::Pipeline(PipelineError::FileFailed(err.to_string()))
            }
            IngestError::Index { .. } => {
                SteplogError::Storage(StorageError::Index(err.to_string()))
            }
            IngestError::Config { field, reason } => {
                SteplogError::Config(ConfigError::InvalidValue { field, reason })
            }
            IngestError::Regex(_) => {
                SteplogError::Pipeline(PipelineError::InitFailed(err.to_string()))
            }
        }
    }
}
