//! 라인 보강기 -- 로그 라인 하나를 [`EnrichedRecord`]로 변환합니다.
//!
//! 공백만 있는 라인은 [`LineOutcome::Skipped`]가 되고 라인 번호 슬롯만 차지합니다.
//! 클러스터/스텝 ID는 원본 경로에서 추출하며, `j-.../steps/s-...` 형태를
//! `j-...` 단독 형태보다 먼저 시도합니다.

use regex::Regex;

use steplog_core::types::{EnrichedRecord, IngestionEvent, StepIds};

use crate::error::IngestError;

const CLUSTER_AND_STEP_PATTERN: &str = r"/(j-[A-Za-z0-9_]+)/steps/(s-[A-Za-z0-9_]+)/";
const CLUSTER_ONLY_PATTERN: &str = r"/(j-[A-Za-z0-9_]+)/";

/// 라인 하나의 보강 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// 보강된 레코드
    Record(EnrichedRecord),
    /// 공백 라인 (에러 아님)
    Skipped,
}

/// 파일 단위로 고정되는 보강 컨텍스트
///
/// 한 파일의 모든 레코드는 같은 `log_file`, 타임스탬프, 리전, ID를 공유합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContext {
    /// `s3://bucket/key`
    pub log_file: String,
    /// 원본 객체의 마지막 수정 시각 (RFC 3339)
    pub log_file_timestamp: String,
    /// 이벤트 리전
    pub region: String,
    /// 경로에서 추출한 식별자
    pub ids: StepIds,
}

/// 라인 보강기
#[derive(Debug, Clone)]
pub struct LineEnricher {
    cluster_and_step: Regex,
    cluster_only: Regex,
}

impl LineEnricher {
    /// 경로 패턴을 컴파일하여 보강기를 생성합니다.
    pub fn new() -> Result<Self, IngestError> {
        Ok(Self {
            cluster_and_step: Regex::new(CLUSTER_AND_STEP_PATTERN)?,
            cluster_only: Regex::new(CLUSTER_ONLY_PATTERN)?,
        })
    }

    /// 원본 위치에서 클러스터/스텝 ID를 추출합니다.
    pub fn step_ids(&self, log_file: &str) -> StepIds {
        if let Some(caps) = self.cluster_and_step.captures(log_file) {
            return StepIds::ClusterAndStep {
                cluster_id: caps[1].to_owned(),
                step_id: caps[2].to_owned(),
            };
        }

        if let Some(caps) = self.cluster_only.captures(log_file) {
            return StepIds::ClusterOnly {
                cluster_id: caps[1].to_owned(),
            };
        }

        StepIds::None
    }

    /// 이벤트와 마지막 수정 시각으로 파일 컨텍스트를 만듭니다.
    pub fn file_context(&self, event: &IngestionEvent, log_file_timestamp: String) -> FileContext {
        let log_file = event.log_file();
        let ids = self.step_ids(&log_file);
        FileContext {
            log_file,
            log_file_timestamp,
            region: event.region.clone(),
            ids,
        }
    }

    /// 라인 하나를 보강합니다. `line_number`는 1부터 시작합니다.
    pub fn enrich(&self, line_number: u64, text: &str, ctx: &FileContext) -> LineOutcome {
        if text.trim().is_empty() {
            return LineOutcome::Skipped;
        }

        LineOutcome::Record(EnrichedRecord {
            raw_log: text.to_owned(),
            log_file_line_number: line_number,
            log_file: ctx.log_file.clone(),
            log_file_timestamp: ctx.log_file_timestamp.clone(),
            region: ctx.region.clone(),
            cluster_id: ctx.ids.cluster_id().map(str::to_owned),
            step_id: ctx.ids.step_id().map(str::to_owned),
        })
    }
}
