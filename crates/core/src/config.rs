//! 설정 관리 -- steplog.toml 파싱 및 런타임 설정
//!
//! [`SteplogConfig`]는 모든 크레이트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선, 바이너리에서 처리)
//! 2. 환경변수 (`STEPLOG_INGEST_BATCH_SIZE=500` 형식, 배포 계약인
//!    `OPENSEARCH_ENDPOINT` / `AWS_REGION` 포함)
//! 3. 설정 파일 (`steplog.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), steplog_core::error::SteplogError> {
//! use steplog_core::config::SteplogConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = SteplogConfig::load("steplog.toml").await?;
//!
//! // 파일 없이 기본값 + 환경변수만 사용 (함수 실행 환경)
//! let config = SteplogConfig::from_env()?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, SteplogError};

/// 배치 크기 상한
pub const MAX_BATCH_SIZE: usize = 100_000;

/// 네트워크 타임아웃 상한 (초)
pub const MAX_TIMEOUT_SECS: u64 = 900;

/// steplog 통합 설정
///
/// `steplog.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SteplogConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 수집 파이프라인 설정
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl SteplogConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SteplogError> {
        let mut config = Self::read_file(path.as_ref()).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SteplogError> {
        let config = Self::read_file(path.as_ref()).await?;
        config.validate()?;
        Ok(config)
    }

    /// 기본값에 환경변수 오버라이드만 적용합니다.
    ///
    /// `STEPLOG_CONFIG`가 설정되어 있으면 해당 파일을 먼저 읽어야 하므로
    /// 그 경우에는 [`load`](Self::load)를 사용합니다.
    pub fn from_env() -> Result<Self, SteplogError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    async fn read_file(path: &Path) -> Result<Self, SteplogError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SteplogError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                SteplogError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, SteplogError> {
        toml::from_str(toml_str).map_err(|e| {
            SteplogError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 네이밍 규칙: `STEPLOG_{SECTION}_{FIELD}`.
    /// 배포 계약 변수(`OPENSEARCH_ENDPOINT`, `AWS_REGION`)를 먼저 적용하고,
    /// 같은 필드의 `STEPLOG_*` 변수가 있으면 그 값이 우선합니다.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "STEPLOG_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "STEPLOG_GENERAL_LOG_FORMAT");

        // Ingest
        override_string(&mut self.ingest.index_endpoint, "OPENSEARCH_ENDPOINT");
        override_string(
            &mut self.ingest.index_endpoint,
            "STEPLOG_INGEST_INDEX_ENDPOINT",
        );
        override_string(&mut self.ingest.region, "AWS_REGION");
        override_string(&mut self.ingest.region, "STEPLOG_INGEST_REGION");
        override_usize(&mut self.ingest.batch_size, "STEPLOG_INGEST_BATCH_SIZE");
        override_u64(
            &mut self.ingest.fetch_timeout_secs,
            "STEPLOG_INGEST_FETCH_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.ingest.bulk_timeout_secs,
            "STEPLOG_INGEST_BULK_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.ingest.max_object_bytes,
            "STEPLOG_INGEST_MAX_OBJECT_BYTES",
        );
        override_opt_string(
            &mut self.ingest.index_username,
            "STEPLOG_INGEST_INDEX_USERNAME",
        );
        override_opt_string(
            &mut self.ingest.index_password,
            "STEPLOG_INGEST_INDEX_PASSWORD",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), SteplogError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        self.ingest.validate()
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 수집 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// 인덱스 저장소 엔드포인트 (호스트 또는 URL)
    pub index_endpoint: String,
    /// 배포 리전 (인증 컨텍스트 전용)
    pub region: String,
    /// 벌크 쓰기 한 번에 담을 최대 레코드 수
    pub batch_size: usize,
    /// 객체 메타데이터/본문 조회 타임아웃 (초)
    pub fetch_timeout_secs: u64,
    /// 벌크 쓰기 타임아웃 (초)
    pub bulk_timeout_secs: u64,
    /// 압축 해제 후 허용하는 최대 크기 (바이트)
    pub max_object_bytes: u64,
    /// 인덱스 저장소 basic auth 사용자명
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_username: Option<String>,
    /// 인덱스 저장소 basic auth 비밀번호
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_password: Option<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            index_endpoint: String::new(),
            region: String::new(),
            batch_size: 1000,
            fetch_timeout_secs: 30,
            bulk_timeout_secs: 60,
            max_object_bytes: 512 * 1024 * 1024, // 512MB
            index_username: None,
            index_password: None,
        }
    }
}

impl IngestConfig {
    /// 스킴이 포함된 엔드포인트 URL을 반환합니다.
    ///
    /// 스킴이 없는 호스트에는 `https://`를 붙이고, 끝의 `/`는 제거합니다.
    pub fn endpoint_url(&self) -> String {
        let trimmed = self.index_endpoint.trim().trim_end_matches('/');
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_owned()
        } else {
            format!("https://{trimmed}")
        }
    }

    /// 수집 설정의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), SteplogError> {
        if self.index_endpoint.trim().is_empty() {
            return Err(invalid(
                "ingest.index_endpoint",
                "must not be empty (set OPENSEARCH_ENDPOINT)".to_owned(),
            ));
        }

        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(invalid(
                "ingest.batch_size",
                format!("must be 1-{MAX_BATCH_SIZE}"),
            ));
        }

        for (field, secs) in [
            ("ingest.fetch_timeout_secs", self.fetch_timeout_secs),
            ("ingest.bulk_timeout_secs", self.bulk_timeout_secs),
        ] {
            if secs == 0 || secs > MAX_TIMEOUT_SECS {
                return Err(invalid(field, format!("must be 1-{MAX_TIMEOUT_SECS}")));
            }
        }

        if self.max_object_bytes == 0 {
            return Err(invalid(
                "ingest.max_object_bytes",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.index_password.is_some() && self.index_username.is_none() {
            return Err(invalid(
                "ingest.index_username",
                "required when index_password is set".to_owned(),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> SteplogError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_opt_string(target: &mut Option<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = if val.is_empty() { None } else { Some(val) };
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> SteplogConfig {
        let mut config = SteplogConfig::default();
        config.ingest.index_endpoint = "search-logs.us-east-1.es.amazonaws.com".to_owned();
        config
    }

    #[test]
    fn default_config_has_sane_values() {
        let config = SteplogConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.ingest.batch_size, 1000);
        assert!(config.ingest.index_endpoint.is_empty());
    }

    #[test]
    fn default_config_requires_endpoint() {
        let err = SteplogConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("index_endpoint"));
    }

    #[test]
    fn config_with_endpoint_passes_validation() {
        valid_config().validate().unwrap();
    }

    #[test]
    fn parse_partial_toml_merges_with_defaults() {
        let toml = r#"
[general]
log_level = "debug"

[ingest]
index_endpoint = "localhost:9200"
batch_size = 250
"#;
        let config = SteplogConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        // log_format은 기본값 유지
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.ingest.batch_size, 250);
        assert_eq!(config.ingest.fetch_timeout_secs, 30);
    }

    #[test]
    fn parse_invalid_toml_fails() {
        let err = SteplogConfig::parse("[ingest\nbatch_size = 1").unwrap_err();
        assert!(matches!(
            err,
            SteplogError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = valid_config();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let mut config = valid_config();
        config.ingest.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_oversized_batch() {
        let mut config = valid_config();
        config.ingest.batch_size = MAX_BATCH_SIZE + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = valid_config();
        config.ingest.bulk_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bulk_timeout_secs"));
    }

    #[test]
    fn validate_rejects_password_without_username() {
        let mut config = valid_config();
        config.ingest.index_password = Some("secret".to_owned());
        assert!(config.validate().is_err());
    }

    #[test]
    fn endpoint_url_adds_https_scheme() {
        let config = valid_config();
        assert_eq!(
            config.ingest.endpoint_url(),
            "https://search-logs.us-east-1.es.amazonaws.com"
        );
    }

    #[test]
    fn endpoint_url_keeps_explicit_scheme() {
        let mut config = valid_config();
        config.ingest.index_endpoint = "http://localhost:9200/".to_owned();
        assert_eq!(config.ingest.endpoint_url(), "http://localhost:9200");
    }

    #[test]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_STEPLOG_STR", "overridden") };
        override_string(&mut val, "TEST_STEPLOG_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_STEPLOG_STR") };
    }

    #[test]
    fn env_override_usize_invalid_keeps_original() {
        let mut val = 10usize;
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_STEPLOG_USIZE_BAD", "ten") };
        override_usize(&mut val, "TEST_STEPLOG_USIZE_BAD");
        assert_eq!(val, 10); // 원래 값 유지
        unsafe { std::env::remove_var("TEST_STEPLOG_USIZE_BAD") };
    }

    #[test]
    fn env_override_empty_option_clears() {
        let mut val = Some("admin".to_owned());
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_STEPLOG_OPT", "") };
        override_opt_string(&mut val, "TEST_STEPLOG_OPT");
        assert!(val.is_none());
        unsafe { std::env::remove_var("TEST_STEPLOG_OPT") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = "original".to_owned();
        override_string(&mut val, "TEST_STEPLOG_NONEXISTENT_12345");
        assert_eq!(val, "original");
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = valid_config();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = SteplogConfig::parse(&toml_str).unwrap();
        assert_eq!(config.ingest.index_endpoint, parsed.ingest.index_endpoint);
        assert_eq!(config.ingest.max_object_bytes, parsed.ingest.max_object_bytes);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = SteplogConfig::from_file("/nonexistent/steplog.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SteplogError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
