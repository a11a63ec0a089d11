//! 알림 디코더 -- 큐 메시지에 감싸진 스토리지 변경 알림을 언랩합니다.
//!
//! 입력은 `{"Records": [...]}` 형태의 큐 이벤트이며, 각 메시지의 `body`는
//! 다시 `{"Records": [...]}` 형태의 스토리지 변경 알림 JSON 문자열입니다.
//!
//! # 필터링 규칙
//! - `eventSource != "aws:sqs"`인 외부 메시지는 건너뜁니다.
//! - `Event == "s3:TestEvent"`인 테스트 알림은 건너뜁니다.
//! - `Records` 키가 없는 알림은 건너뜁니다.
//! - `eventSource != "aws:s3"`인 내부 레코드는 건너뜁니다.
//!
//! `body`가 없거나 JSON 객체가 아니거나, `Records`가 배열이 아니거나(`null` 포함),
//! 통과한 레코드에 필수 필드가 없으면
//! 해당 외부 메시지만 [`IngestError::MalformedNotification`]으로 실패합니다.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use steplog_core::types::IngestionEvent;

use crate::error::IngestError;

/// 큐 전달 소스 식별자
pub const QUEUE_EVENT_SOURCE: &str = "aws:sqs";

/// 스토리지 변경 소스 식별자
pub const STORAGE_EVENT_SOURCE: &str = "aws:s3";

/// 합성 테스트 알림의 `Event` 값
pub const TEST_EVENT: &str = "s3:TestEvent";

/// 큐 트리거 이벤트 (외부 봉투)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEnvelope {
    /// 외부 메시지 목록
    #[serde(rename = "Records", default)]
    pub records: Vec<QueueMessage>,
}

/// 큐 메시지 하나
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessage {
    /// 메시지 ID (부분 재전달 응답에 사용)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// 전달 소스 (`aws:sqs`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_source: Option<String>,
    /// 내부 알림 JSON 문자열
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl QueueMessage {
    /// 로그와 에러 메시지에 쓰이는 메시지 ID
    pub fn id(&self) -> &str {
        self.message_id.as_deref().unwrap_or("unknown")
    }
}

/// 필수 필드를 갖춘 스토리지 레코드
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageRecord {
    event_time: String,
    aws_region: String,
    s3: StorageEntity,
}

#[derive(Debug, Deserialize)]
struct StorageEntity {
    bucket: StorageBucket,
    object: StorageObject,
}

#[derive(Debug, Deserialize)]
struct StorageBucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct StorageObject {
    key: String,
}

/// 알림 디코더
///
/// 상태가 없는 순수 변환기입니다. 같은 입력에 대해 항상 같은 결과를 냅니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationDecoder;

impl NotificationDecoder {
    /// 새 디코더를 생성합니다.
    pub fn new() -> Self {
        Self
    }

    /// 외부 메시지 하나를 0개 이상의 수집 이벤트로 펼칩니다.
    ///
    /// 필터링 대상이면 빈 Vec을, 필수 필드가 없으면 에러를 반환합니다.
    pub fn decode_message(&self, message: &QueueMessage) -> Result<Vec<IngestionEvent>, IngestError> {
        if message.event_source.as_deref() != Some(QUEUE_EVENT_SOURCE) {
            tracing::debug!(
                message_id = message.id(),
                event_source = ?message.event_source,
                "skipping message from unexpected source"
            );
            return Ok(Vec::new());
        }

        let body = message
            .body
            .as_deref()
            .ok_or_else(|| malformed(message, "message has no body".to_owned()))?;

        let value: Value = serde_json::from_str(body)
            .map_err(|e| malformed(message, format!("invalid body: {e}")))?;
        let mut notification = match value {
            Value::Object(map) => map,
            other => {
                return Err(malformed(
                    message,
                    format!("body must be a JSON object, got {}", json_kind(&other)),
                ));
            }
        };

        if notification.get("Event").and_then(Value::as_str) == Some(TEST_EVENT) {
            tracing::info!(message_id = message.id(), "ignoring storage test event");
            return Ok(Vec::new());
        }

        let records = match notification.remove("Records") {
            None => {
                tracing::debug!(message_id = message.id(), "notification has no records");
                return Ok(Vec::new());
            }
            Some(Value::Array(records)) => records,
            Some(other) => {
                return Err(malformed(
                    message,
                    format!("Records must be an array, got {}", json_kind(&other)),
                ));
            }
        };

        let mut events = Vec::with_capacity(records.len());
        for (idx, raw) in records.into_iter().enumerate() {
            let source = raw.get("eventSource").and_then(Value::as_str);
            if source != Some(STORAGE_EVENT_SOURCE) {
                tracing::debug!(
                    message_id = message.id(),
                    record = idx,
                    event_source = ?source,
                    "skipping record from unexpected source"
                );
                continue;
            }

            let record: StorageRecord = serde_json::from_value(raw)
                .map_err(|e| malformed(message, format!("record[{idx}]: {e}")))?;

            events.push(IngestionEvent {
                source_bucket: record.s3.bucket.name,
                object_key: record.s3.object.key,
                region: record.aws_region,
                event_time: record.event_time,
            });
        }

        Ok(events)
    }

    /// 봉투 전체를 평탄화한 지연 시퀀스를 반환합니다.
    ///
    /// 해석에 실패한 메시지는 `Err` 항목 하나로 나타나며, 다음 메시지는 계속 처리됩니다.
    pub fn events<'a>(
        &'a self,
        envelope: &'a QueueEnvelope,
    ) -> impl Iterator<Item = Result<IngestionEvent, IngestError>> + 'a {
        envelope
            .records
            .iter()
            .flat_map(move |message| match self.decode_message(message) {
                Ok(events) => events.into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(e)],
            })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn malformed(message: &QueueMessage, reason: String) -> IngestError {
    IngestError::MalformedNotification {
        message_id: message.id().to_owned(),
        reason,
    }
}
