//! 배치 상태 머신 -- 보강된 레코드를 크기 제한 배치로 모읍니다.
//!
//! [`Batcher`]는 파일 하나를 처리하는 동안만 존재합니다.
//!
//! # 상태 전이
//! ```text
//! Accumulating --(크기 도달)--> Flushing --(다음 push / complete_flush)--> Accumulating
//! Accumulating --(마지막 라인 / finish)--> Done
//! ```
//!
//! # 플러시 조건
//! - 현재 배치가 최대 크기에 도달한 경우 ([`FlushTrigger::Size`])
//! - 처리한 라인의 위치가 전체 라인 수와 같은 경우 ([`FlushTrigger::EndOfFile`])
//!
//! 레코드가 없는 플러시는 쓰기를 만들지 않으며 배치 번호도 소비하지 않습니다.

use std::fmt;

use steplog_core::types::EnrichedRecord;

use crate::enricher::LineOutcome;

/// 배치를 플러시한 원인
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// 배치가 최대 크기에 도달
    Size,
    /// 파일의 마지막 라인 처리 완료
    EndOfFile,
}

impl FlushTrigger {
    /// 메트릭 라벨 값
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::EndOfFile => "end_of_file",
        }
    }
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 배처 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatcherState {
    /// 레코드 누적 중
    Accumulating,
    /// 배치를 내보냈고 쓰기 완료를 기다리는 중
    Flushing,
    /// 파일 처리 완료 (종료 상태)
    Done,
}

/// 한 번의 벌크 쓰기 단위
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 1부터 시작하는 배치 번호
    pub number: u64,
    /// 순서가 유지된 레코드
    pub records: Vec<EnrichedRecord>,
    /// 플러시 원인
    pub trigger: FlushTrigger,
}

impl Batch {
    /// 배치 내 레코드 수
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 배치가 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// 파일 단위 배처
pub struct Batcher {
    /// 최대 배치 크기
    max_size: usize,
    /// 파일의 전체 라인 수
    total_lines: u64,
    /// 현재 누적 중인 배치
    current: Vec<EnrichedRecord>,
    /// 다음 배치 번호
    next_number: u64,
    /// 건너뛴 라인 수
    skipped: u64,
    /// 현재 상태
    state: BatcherState,
}

impl Batcher {
    /// 새 배처를 생성합니다. `max_size`가 0이면 1로 취급합니다.
    pub fn new(max_size: usize, total_lines: u64) -> Self {
        let max_size = max_size.max(1);
        let state = if total_lines == 0 {
            BatcherState::Done
        } else {
            BatcherState::Accumulating
        };
        Self {
            max_size,
            total_lines,
            current: Vec::with_capacity(max_size.min(10_000)),
            next_number: 1,
            skipped: 0,
            state,
        }
    }

    /// 라인 하나의 보강 결과를 추가합니다.
    ///
    /// 플러시 조건을 만족하고 레코드가 있으면 배치를 반환합니다.
    /// `line_number`는 1부터 시작하는 파일 내 절대 위치입니다.
    pub fn push(&mut self, line_number: u64, outcome: LineOutcome) -> Option<Batch> {
        match self.state {
            BatcherState::Done => {
                tracing::warn!(line_number, "line pushed after batcher completed, ignoring");
                return None;
            }
            BatcherState::Flushing => self.complete_flush(),
            BatcherState::Accumulating => {}
        }

        match outcome {
            LineOutcome::Record(record) => self.current.push(record),
            LineOutcome::Skipped => self.skipped += 1,
        }

        let end_of_file = line_number >= self.total_lines;
        let trigger = if end_of_file {
            FlushTrigger::EndOfFile
        } else if self.current.len() >= self.max_size {
            FlushTrigger::Size
        } else {
            return None;
        };

        let batch = self.take(trigger);
        self.state = if end_of_file {
            BatcherState::Done
        } else if batch.is_some() {
            BatcherState::Flushing
        } else {
            BatcherState::Accumulating
        };
        batch
    }

    /// 내보낸 배치의 쓰기가 끝났음을 알립니다.
    pub fn complete_flush(&mut self) {
        if self.state == BatcherState::Flushing {
            self.state = BatcherState::Accumulating;
        }
    }

    /// 남은 레코드를 내보내고 종료 상태로 전이합니다.
    ///
    /// 마지막 라인에서 이미 플러시되었다면 `None`을 반환합니다.
    pub fn finish(&mut self) -> Option<Batch> {
        if self.state == BatcherState::Done {
            return None;
        }
        self.state = BatcherState::Done;
        self.take(FlushTrigger::EndOfFile)
    }

    /// 건너뛴 라인 수
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// 지금까지 내보낸 배치 수
    pub fn batches_flushed(&self) -> u64 {
        self.next_number - 1
    }

    /// 현재 상태
    pub fn state(&self) -> BatcherState {
        self.state
    }

    /// 현재 누적된 레코드 수
    pub fn pending(&self) -> usize {
        self.current.len()
    }

    fn take(&mut self, trigger: FlushTrigger) -> Option<Batch> {
        if self.current.is_empty() {
            tracing::debug!(trigger = %trigger, "nothing to flush");
            return None;
        }

        let number = self.next_number;
        self.next_number += 1;
        let records = std::mem::replace(
            &mut self.current,
            Vec::with_capacity(self.max_size.min(10_000)),
        );
        Some(Batch {
            number,
            records,
            trigger,
        })
    }
}
