//! 객체 조회 -- 원본 로그 객체의 메타데이터/본문을 가져와 텍스트로 복원합니다.
//!
//! [`ObjectStore`] trait이 스토리지 API를 추상화하므로, 운영 코드는
//! [`S3ObjectStore`]를, 테스트는 인메모리 구현을 사용합니다.
//!
//! # 처리 순서
//! 1. 마지막 수정 시각 조회 (`last_modified`)
//! 2. 본문 조회 (`get_object`)
//! 3. gzip 압축 해제 (멀티 멤버 스트림 지원, `max_object_bytes` 제한)
//! 4. UTF-8 디코딩 후 라인 분리 (`\n` 기준, 끝의 `\r` 제거)
//!
//! 조회 실패와 타임아웃은 [`IngestError::Retrieval`], 압축 해제와 디코딩 실패는
//! [`IngestError::Decode`]로 보고되며 해당 파일 하나만 실패합니다.

use std::future::Future;
use std::io::Read;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use flate2::read::MultiGzDecoder;

use steplog_core::types::IngestionEvent;

use crate::config::PipelineConfig;
use crate::error::IngestError;

/// 오브젝트 스토리지 추상화
///
/// 구현체는 실패 시 [`IngestError::Retrieval`]을 반환해야 합니다.
pub trait ObjectStore: Send + Sync + 'static {
    /// 객체의 마지막 수정 시각을 조회합니다.
    fn last_modified(
        &self,
        bucket: &str,
        key: &str,
    ) -> impl Future<Output = Result<DateTime<Utc>, IngestError>> + Send;

    /// 객체 본문 전체를 조회합니다.
    fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> impl Future<Output = Result<Bytes, IngestError>> + Send;
}

/// AWS SDK 기반 S3 구현체
///
/// 자격 증명은 `aws-config`의 기본 체인(환경변수, 실행 역할 등)에서 가져옵니다.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    /// 이미 구성된 SDK 클라이언트로 생성합니다.
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// 공유 SDK 설정에서 클라이언트를 생성합니다.
    pub fn from_sdk_config(config: &aws_config::SdkConfig) -> Self {
        Self::new(aws_sdk_s3::Client::new(config))
    }
}

impl ObjectStore for S3ObjectStore {
    async fn last_modified(&self, bucket: &str, key: &str) -> Result<DateTime<Utc>, IngestError> {
        let output = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| retrieval(bucket, key, aws_sdk_s3::error::DisplayErrorContext(e)))?;

        let modified = output
            .last_modified()
            .ok_or_else(|| retrieval(bucket, key, "object has no last-modified time"))?;

        let nanos = modified.subsec_nanos();
        DateTime::from_timestamp(modified.secs(), nanos)
            .ok_or_else(|| retrieval(bucket, key, "last-modified time out of range"))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, IngestError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| retrieval(bucket, key, aws_sdk_s3::error::DisplayErrorContext(e)))?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| retrieval(bucket, key, e))?;

        Ok(data.into_bytes())
    }
}

/// 압축 해제된 로그 텍스트
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectText(String);

impl ObjectText {
    /// 텍스트를 감쌉니다.
    pub fn new(text: String) -> Self {
        Self(text)
    }

    /// 라인 목록. 끝의 빈 라인은 포함하지 않으며 `\r\n`의 `\r`은 제거됩니다.
    ///
    /// `\n`에서만 나눕니다. 단독 `\r`(진행률 출력 등)이나 폼 피드는 라인 안에 남습니다.
    pub fn lines(&self) -> Vec<&str> {
        self.0.lines().collect()
    }

    /// 전체 텍스트
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 압축 해제된 바이트 수
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 텍스트가 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// gzip 바이트를 압축 해제하고 UTF-8로 디코딩합니다.
///
/// 압축 해제 결과가 `max_bytes`를 넘으면 실패합니다.
/// `location`은 에러 메시지에만 쓰입니다.
pub fn decode_gzip(location: &str, data: &[u8], max_bytes: u64) -> Result<ObjectText, IngestError> {
    let mut decoder = MultiGzDecoder::new(data).take(max_bytes.saturating_add(1));
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf).map_err(|e| IngestError::Decode {
        location: location.to_owned(),
        reason: format!("gzip: {e}"),
    })?;

    if buf.len() as u64 > max_bytes {
        return Err(IngestError::Decode {
            location: location.to_owned(),
            reason: format!("decompressed size exceeds {max_bytes} bytes"),
        });
    }

    let text = String::from_utf8(buf).map_err(|e| IngestError::Decode {
        location: location.to_owned(),
        reason: format!("utf-8: {e}"),
    })?;

    Ok(ObjectText(text))
}

/// 스토리지 조회 + 압축 해제를 담당하는 리트리버
pub struct ObjectRetriever<S> {
    store: S,
    fetch_timeout: Duration,
    max_object_bytes: u64,
}

impl<S: ObjectStore> ObjectRetriever<S> {
    /// 스토리지 구현과 파이프라인 설정으로 리트리버를 생성합니다.
    pub fn new(store: S, config: &PipelineConfig) -> Self {
        Self {
            store,
            fetch_timeout: config.fetch_timeout(),
            max_object_bytes: config.max_object_bytes,
        }
    }

    /// 내부 스토리지 구현 참조
    pub fn store(&self) -> &S {
        &self.store
    }

    /// 이벤트가 가리키는 객체의 마지막 수정 시각을 조회합니다.
    pub async fn last_modified(&self, event: &IngestionEvent) -> Result<DateTime<Utc>, IngestError> {
        tokio::time::timeout(
            self.fetch_timeout,
            self.store.last_modified(&event.source_bucket, &event.object_key),
        )
        .await
        .map_err(|_| self.timed_out(event))?
    }

    /// 이벤트가 가리키는 객체를 조회하여 텍스트로 복원합니다.
    pub async fn fetch_text(&self, event: &IngestionEvent) -> Result<ObjectText, IngestError> {
        let data = tokio::time::timeout(
            self.fetch_timeout,
            self.store.get_object(&event.source_bucket, &event.object_key),
        )
        .await
        .map_err(|_| self.timed_out(event))??;

        tracing::debug!(
            bucket = %event.source_bucket,
            key = %event.object_key,
            compressed_bytes = data.len(),
            "object fetched"
        );

        decode_gzip(&event.log_file(), &data, self.max_object_bytes)
    }

    fn timed_out(&self, event: &IngestionEvent) -> IngestError {
        IngestError::Retrieval {
            location: event.log_file(),
            reason: format!("timed out after {}s", self.fetch_timeout.as_secs()),
        }
    }
}

fn retrieval(bucket: &str, key: &str, reason: impl std::fmt::Display) -> IngestError {
    IngestError::Retrieval {
        location: format!("s3://{bucket}/{key}"),
        reason: reason.to_string(),
    }
}

/// 테스트용 인메모리 스토리지
#[cfg(test)]
#[derive(Default)]
pub struct MockObjectStore {
    /// (bucket, key) -> (마지막 수정 시각, 본문)
    pub objects: std::collections::HashMap<(String, String), (DateTime<Utc>, Bytes)>,
    /// 응답 전 지연
    pub delay: Option<Duration>,
}

#[cfg(test)]
impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, bucket: &str, key: &str, modified: DateTime<Utc>, body: Bytes) -> Self {
        self.objects
            .insert((bucket.to_owned(), key.to_owned()), (modified, body));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn lookup(&self, bucket: &str, key: &str) -> Result<(DateTime<Utc>, Bytes), IngestError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.objects
            .get(&(bucket.to_owned(), key.to_owned()))
            .cloned()
            .ok_or_else(|| retrieval(bucket, key, "NoSuchKey"))
    }
}

#[cfg(test)]
impl ObjectStore for MockObjectStore {
    async fn last_modified(&self, bucket: &str, key: &str) -> Result<DateTime<Utc>, IngestError> {
        Ok(self.lookup(bucket, key).await?.0)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, IngestError> {
        Ok(self.lookup(bucket, key).await?.1)
    }
}
