//! 멱등 인덱서 -- 배치를 `_bulk` API로 upsert 합니다.
//!
//! 문서 ID는 `hex(sha256("<log_file>|<line_number>"))`로 결정되므로
//! 같은 파일을 다시 처리해도 같은 문서를 덮어쓸 뿐 중복이 생기지 않습니다.
//! 인덱스 이름은 쓰기 시점의 UTC 날짜로 `emr-logs-YYYY-MM-DD`입니다.
//!
//! # 실패 분류
//! - 문서 단위 실패: [`BulkReport::failures`]에 담겨 반환되며 다음 배치를 막지 않습니다.
//! - 요청 전체 실패 (전송 에러, 비정상 HTTP 상태, 타임아웃): [`IngestError::Index`]

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use steplog_core::config::IngestConfig;
use steplog_core::types::EnrichedRecord;

use crate::batcher::Batch;
use crate::config::PipelineConfig;
use crate::error::IngestError;

/// 인덱스 이름 접두사
pub const INDEX_PREFIX: &str = "emr-logs-";

/// 레코드의 멱등성 키로부터 문서 ID를 계산합니다.
pub fn document_id(log_file: &str, line_number: u64) -> String {
    let digest = Sha256::digest(format!("{log_file}|{line_number}").as_bytes());
    format!("{digest:x}")
}

/// 날짜별 인덱스 이름 (`emr-logs-YYYY-MM-DD`)
pub fn index_name(date: NaiveDate) -> String {
    format!("{INDEX_PREFIX}{}", date.format("%Y-%m-%d"))
}

/// 벌크 요청의 문서 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkDocument<'a> {
    /// 문서 ID
    pub id: String,
    /// 문서 본문
    pub source: &'a EnrichedRecord,
}

impl<'a> BulkDocument<'a> {
    /// 레코드에서 ID를 계산하여 문서를 만듭니다.
    pub fn from_record(record: &'a EnrichedRecord) -> Self {
        Self {
            id: document_id(&record.log_file, record.log_file_line_number),
            source: record,
        }
    }
}

/// 문서 단위 실패
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentFailure {
    /// 문서 ID
    pub document_id: String,
    /// 항목의 HTTP 상태 코드 (응답에 결과가 없으면 0)
    pub status: u16,
    /// 실패 사유
    pub reason: String,
}

/// 벌크 쓰기 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    /// 대상 인덱스
    pub index: String,
    /// 요청한 문서 수
    pub attempted: usize,
    /// 성공한 문서 수
    pub succeeded: usize,
    /// 실패한 문서 목록
    pub failures: Vec<DocumentFailure>,
}

impl BulkReport {
    /// 모든 문서가 성공했는지 확인합니다.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.succeeded == self.attempted
    }
}

/// 문서 저장소 추상화
///
/// 운영 코드는 [`OpenSearchIndex`]를, 테스트는 인메모리 구현을 사용합니다.
pub trait DocumentIndex: Send + Sync + 'static {
    /// 문서를 ID 기준으로 upsert 합니다.
    ///
    /// 문서 단위 실패는 `Ok(BulkReport)`에 담고, 요청 전체 실패만 `Err`로 반환합니다.
    fn bulk_upsert(
        &self,
        index: &str,
        documents: &[BulkDocument<'_>],
    ) -> impl Future<Output = Result<BulkReport, IngestError>> + Send;
}

/// `_bulk` 요청 본문(NDJSON)을 만듭니다. 마지막 줄도 개행으로 끝납니다.
pub fn build_bulk_body(index: &str, documents: &[BulkDocument<'_>]) -> Result<String, IngestError> {
    let mut body = String::with_capacity(documents.len() * 512);
    for doc in documents {
        let action = serde_json::json!({ "index": { "_index": index, "_id": doc.id } });
        body.push_str(&action.to_string());
        body.push('\n');

        let source = serde_json::to_string(doc.source).map_err(|e| IngestError::Index {
            index: index.to_owned(),
            reason: format!("failed to serialize document {}: {e}", doc.id),
        })?;
        body.push_str(&source);
        body.push('\n');
    }
    Ok(body)
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<BulkResponseItem>,
}

#[derive(Debug, Deserialize)]
struct BulkResponseItem {
    #[serde(default)]
    index: Option<BulkItemResult>,
}

#[derive(Debug, Deserialize)]
struct BulkItemResult {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(default)]
    status: u16,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// `_bulk` 응답 본문을 해석하여 문서 단위 결과를 분류합니다.
pub fn parse_bulk_response(
    index: &str,
    documents: &[BulkDocument<'_>],
    body: &str,
) -> Result<BulkReport, IngestError> {
    let response: BulkResponse = serde_json::from_str(body).map_err(|e| IngestError::Index {
        index: index.to_owned(),
        reason: format!("invalid bulk response: {e}"),
    })?;

    let mut report = BulkReport {
        index: index.to_owned(),
        attempted: documents.len(),
        ..Default::default()
    };

    for (pos, doc) in documents.iter().enumerate() {
        let result = response.items.get(pos).and_then(|item| item.index.as_ref());
        let Some(result) = result else {
            report.failures.push(DocumentFailure {
                document_id: doc.id.clone(),
                status: 0,
                reason: "no result for document in bulk response".to_owned(),
            });
            continue;
        };

        let document_id = result.id.clone().unwrap_or_else(|| doc.id.clone());
        match &result.error {
            Some(error) => report.failures.push(DocumentFailure {
                document_id,
                status: result.status,
                reason: error_reason(error),
            }),
            None if !(200..300).contains(&result.status) => {
                report.failures.push(DocumentFailure {
                    document_id,
                    status: result.status,
                    reason: format!("unexpected item status {}", result.status),
                });
            }
            None => report.succeeded += 1,
        }
    }

    Ok(report)
}

fn error_reason(error: &serde_json::Value) -> String {
    let kind = error.get("type").and_then(serde_json::Value::as_str);
    let reason = error.get("reason").and_then(serde_json::Value::as_str);
    match (kind, reason) {
        (Some(kind), Some(reason)) => format!("{kind}: {reason}"),
        (None, Some(reason)) => reason.to_owned(),
        _ => error.to_string(),
    }
}

/// HTTP 기반 OpenSearch `_bulk` 구현체
///
/// 요청 서명은 하지 않습니다. 엔드포인트는 VPC 접근 정책이나 서명 프록시를 통해
/// 요청을 허용해야 하며, 필요하면 HTTP 기본 인증을 사용할 수 있습니다.
#[derive(Clone)]
pub struct OpenSearchIndex {
    client: reqwest::Client,
    endpoint: String,
    username: Option<String>,
    password: Option<String>,
}

impl OpenSearchIndex {
    /// 엔드포인트 URL로 생성합니다.
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint: String = endpoint.into();
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            username: None,
            password: None,
        }
    }

    /// core 설정으로 생성합니다. 기본 인증 정보가 있으면 함께 사용합니다.
    pub fn from_config(config: &IngestConfig) -> Self {
        let index = Self::new(config.endpoint_url());
        match &config.index_username {
            Some(user) => index.with_basic_auth(user.clone(), config.index_password.clone()),
            None => index,
        }
    }

    /// HTTP 기본 인증을 설정합니다.
    pub fn with_basic_auth(mut self, username: String, password: Option<String>) -> Self {
        self.username = Some(username);
        self.password = password;
        self
    }

    /// `_bulk` 엔드포인트 URL
    pub fn bulk_url(&self) -> String {
        format!("{}/_bulk", self.endpoint)
    }
}

impl DocumentIndex for OpenSearchIndex {
    async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[BulkDocument<'_>],
    ) -> Result<BulkReport, IngestError> {
        let body = build_bulk_body(index, documents)?;
        let index_error = |reason: String| IngestError::Index {
            index: index.to_owned(),
            reason,
        };

        let mut request = self
            .client
            .post(self.bulk_url())
            .header("Content-Type", "application/x-ndjson")
            .body(body);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| index_error(format!("request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| index_error(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(index_error(format!("HTTP {status}: {text}")));
        }

        parse_bulk_response(index, documents, &text)
    }
}

/// 배치를 날짜별 인덱스에 쓰는 인덱서
pub struct Indexer<I> {
    index: I,
    bulk_timeout: Duration,
}

impl<I: DocumentIndex> Indexer<I> {
    /// 문서 저장소 구현과 파이프라인 설정으로 인덱서를 생성합니다.
    pub fn new(index: I, config: &PipelineConfig) -> Self {
        Self {
            index,
            bulk_timeout: config.bulk_timeout(),
        }
    }

    /// 내부 문서 저장소 참조
    pub fn document_index(&self) -> &I {
        &self.index
    }

    /// 현재 UTC 날짜의 인덱스에 배치를 씁니다.
    pub async fn write_batch(&self, batch: &Batch) -> Result<BulkReport, IngestError> {
        self.write_batch_at(batch, Utc::now()).await
    }

    /// 주어진 시각의 UTC 날짜 인덱스에 배치를 씁니다.
    pub async fn write_batch_at(
        &self,
        batch: &Batch,
        now: DateTime<Utc>,
    ) -> Result<BulkReport, IngestError> {
        let index = index_name(now.date_naive());
        if batch.is_empty() {
            return Ok(BulkReport {
                index,
                ..Default::default()
            });
        }

        let documents: Vec<BulkDocument<'_>> =
            batch.records.iter().map(BulkDocument::from_record).collect();

        let report = tokio::time::timeout(
            self.bulk_timeout,
            self.index.bulk_upsert(&index, &documents),
        )
        .await
        .map_err(|_| IngestError::Index {
            index: index.clone(),
            reason: format!("timed out after {}s", self.bulk_timeout.as_secs()),
        })??;

        for failure in &report.failures {
            tracing::warn!(
                index = %report.index,
                batch = batch.number,
                document_id = %failure.document_id,
                status = failure.status,
                reason = %failure.reason,
                "document failed to index"
            );
        }

        tracing::info!(
            index = %report.index,
            batch = batch.number,
            trigger = %batch.trigger,
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failures.len(),
            "batch saved"
        );

        Ok(report)
    }
}

/// 테스트용 인메모리 문서 저장소
#[cfg(test)]
#[derive(Default)]
pub struct MockDocumentIndex {
    /// (index, id) -> 문서
    pub documents: std::sync::Mutex<std::collections::BTreeMap<(String, String), EnrichedRecord>>,
    /// 실패시킬 라인 번호
    pub reject_lines: Vec<u64>,
    /// 요청 전체를 실패시킬지 여부
    pub fail_requests: bool,
}

#[cfg(test)]
impl DocumentIndex for MockDocumentIndex {
    async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[BulkDocument<'_>],
    ) -> Result<BulkReport, IngestError> {
        if self.fail_requests {
            return Err(IngestError::Index {
                index: index.to_owned(),
                reason: "mock failure".to_owned(),
            });
        }

        let mut report = BulkReport {
            index: index.to_owned(),
            attempted: documents.len(),
            ..Default::default()
        };
        let mut stored = self.documents.lock().map_err(|e| IngestError::Index {
            index: index.to_owned(),
            reason: e.to_string(),
        })?;
        for doc in documents {
            if self.reject_lines.contains(&doc.source.log_file_line_number) {
                report.failures.push(DocumentFailure {
                    document_id: doc.id.clone(),
                    status: 400,
                    reason: "mapper_parsing_exception".to_owned(),
                });
                continue;
            }
            stored.insert((index.to_owned(), doc.id.clone()), doc.source.clone());
            report.succeeded += 1;
        }
        Ok(report)
    }
}
