//! 도메인 타입 -- 워크스페이스 전역에서 사용되는 공통 타입
//!
//! 알림 디코더가 만드는 [`IngestionEvent`], 라인 보강기가 만드는 [`EnrichedRecord`],
//! 그리고 경로에서 추출한 클러스터/스텝 식별자 [`StepIds`]를 정의합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 수집 이벤트 -- "객체 생성" 알림 하나가 나타내는 작업 단위
///
/// 디코더가 생성하고 파이프라인이 한 번 소비합니다. 저장되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionEvent {
    /// 원본 버킷 이름
    pub source_bucket: String,
    /// 객체 키
    pub object_key: String,
    /// 이벤트가 발생한 리전
    pub region: String,
    /// 알림의 `eventTime` (진단용)
    pub event_time: String,
}

impl IngestionEvent {
    /// 레코드의 `log_file` 값으로 쓰이는 완전한 원본 위치 (`s3://bucket/key`)
    pub fn log_file(&self) -> String {
        format!("s3://{}/{}", self.source_bucket, self.object_key)
    }
}

impl fmt::Display for IngestionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "s3://{}/{} region={} time={}",
            self.source_bucket, self.object_key, self.region, self.event_time
        )
    }
}

/// 경로에서 추출한 클러스터/스텝 식별자
///
/// 더 구체적인 `j-.../steps/s-...` 형태를 먼저 시도하고,
/// 실패하면 `j-...` 단독 형태로 폴백한 결과를 명시적으로 표현합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepIds {
    /// 클러스터 ID와 스텝 ID 모두 발견
    ClusterAndStep { cluster_id: String, step_id: String },
    /// 클러스터 ID만 발견
    ClusterOnly { cluster_id: String },
    /// 둘 다 없음 (에러 아님)
    None,
}

impl StepIds {
    /// 클러스터 ID (`j-...`)
    pub fn cluster_id(&self) -> Option<&str> {
        match self {
            Self::ClusterAndStep { cluster_id, .. } | Self::ClusterOnly { cluster_id } => {
                Some(cluster_id)
            }
            Self::None => None,
        }
    }

    /// 스텝 ID (`s-...`)
    pub fn step_id(&self) -> Option<&str> {
        match self {
            Self::ClusterAndStep { step_id, .. } => Some(step_id),
            Self::ClusterOnly { .. } | Self::None => None,
        }
    }
}

/// 보강된 로그 레코드 -- 인덱스에 기록되는 단위
///
/// 직렬화 필드명은 기존 인덱스와의 호환을 위해 `aws_region`, `emr_cluster_id`,
/// `emr_step_id`를 사용합니다. 식별자가 없으면 필드 자체를 생략합니다.
///
/// `(log_file, log_file_line_number)` 쌍이 유일한 멱등성 키입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    /// 원본 라인 (공백 포함 그대로)
    pub raw_log: String,
    /// 압축 해제된 파일 내 1부터 시작하는 라인 번호
    pub log_file_line_number: u64,
    /// 원본 위치 (`s3://bucket/key`)
    pub log_file: String,
    /// 원본 객체의 마지막 수정 시각 (ISO-8601)
    pub log_file_timestamp: String,
    /// 이벤트 리전
    #[serde(rename = "aws_region")]
    pub region: String,
    /// EMR 클러스터 ID
    #[serde(
        rename = "emr_cluster_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cluster_id: Option<String>,
    /// EMR 스텝 ID
    #[serde(rename = "emr_step_id", default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
}
