//! 수집 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`IngestConfig`](steplog_core::config::IngestConfig)에서
//! 파이프라인 동작에 필요한 값만 추려 담습니다. 엔드포인트와 인증 정보는
//! 클라이언트 생성 시점에만 쓰이므로 여기에 포함하지 않습니다.
//!
//! # 사용 예시
//! ```ignore
//! use steplog_core::config::SteplogConfig;
//! use steplog_ingest::config::PipelineConfig;
//!
//! let core_config = SteplogConfig::from_env()?;
//! let config = PipelineConfig::from_core(&core_config.ingest);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use steplog_core::config::{MAX_BATCH_SIZE, MAX_TIMEOUT_SECS};

use crate::error::IngestError;

/// 수집 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 배치 크기 (이 개수만큼 모이면 플러시)
    pub batch_size: usize,
    /// 객체 메타데이터/본문 조회 타임아웃 (초)
    pub fetch_timeout_secs: u64,
    /// 벌크 쓰기 타임아웃 (초)
    pub bulk_timeout_secs: u64,
    /// 압축 해제 후 최대 크기 (바이트)
    pub max_object_bytes: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let core = steplog_core::config::IngestConfig::default();
        Self::from_core(&core)
    }
}

impl PipelineConfig {
    /// core의 `IngestConfig`에서 파이프라인 설정을 생성합니다.
    pub fn from_core(core: &steplog_core::config::IngestConfig) -> Self {
        Self {
            batch_size: core.batch_size,
            fetch_timeout_secs: core.fetch_timeout_secs,
            bulk_timeout_secs: core.bulk_timeout_secs,
            max_object_bytes: core.max_object_bytes,
        }
    }

    /// 조회 타임아웃
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// 벌크 쓰기 타임아웃
    pub fn bulk_timeout(&self) -> Duration {
        Duration::from_secs(self.bulk_timeout_secs)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(IngestError::Config {
                field: "batch_size".to_owned(),
                reason: format!("must be 1-{MAX_BATCH_SIZE}"),
            });
        }

        if self.fetch_timeout_secs == 0 || self.fetch_timeout_secs > MAX_TIMEOUT_SECS {
            return Err(IngestError::Config {
                field: "fetch_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_TIMEOUT_SECS}"),
            });
        }

        if self.bulk_timeout_secs == 0 || self.bulk_timeout_secs > MAX_TIMEOUT_SECS {
            return Err(IngestError::Config {
                field: "bulk_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_TIMEOUT_SECS}"),
            });
        }

        if self.max_object_bytes == 0 {
            return Err(IngestError::Config {
                field: "max_object_bytes".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 파이프라인 설정 빌더
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 배치 크기를 설정합니다.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// 조회 타임아웃(초)을 설정합니다.
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    /// 벌크 쓰기 타임아웃(초)을 설정합니다.
    pub fn bulk_timeout_secs(mut self, secs: u64) -> Self {
        self.config.bulk_timeout_secs = secs;
        self
    }

    /// 압축 해제 후 최대 크기를 설정합니다.
    pub fn max_object_bytes(mut self, bytes: u64) -> Self {
        self.config.max_object_bytes = bytes;
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, IngestError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
