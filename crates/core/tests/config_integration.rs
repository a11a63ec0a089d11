//! steplog.toml 통합 설정 테스트
//!
//! - steplog.toml.example 파싱 테스트
//! - 파일 로딩 / 환경변수 우선순위 테스트
//! - 잘못된 형식 에러 테스트

use std::fs;

use steplog_core::config::SteplogConfig;
use steplog_core::error::{ConfigError, SteplogError};

// =============================================================================
// steplog.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../steplog.toml.example");
    let config = SteplogConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert_eq!(
        config.ingest.index_endpoint,
        "search-emr-logs.us-east-1.es.amazonaws.com"
    );
    assert_eq!(config.ingest.region, "us-east-1");
    assert_eq!(config.ingest.batch_size, 1000);
    assert_eq!(config.ingest.max_object_bytes, 536_870_912);
    assert!(config.ingest.index_username.is_none());
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../steplog.toml.example");
    let config = SteplogConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

// =============================================================================
// 파일 로딩 테스트
// =============================================================================

#[tokio::test]
async fn from_file_loads_valid_config() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("steplog.toml");
    fs::write(
        &path,
        r#"
[ingest]
index_endpoint = "http://localhost:9200"
batch_size = 10
"#,
    )
    .expect("should write config");

    let config = SteplogConfig::from_file(&path).await.expect("should load");
    assert_eq!(config.ingest.batch_size, 10);
    assert_eq!(config.ingest.endpoint_url(), "http://localhost:9200");
}

#[tokio::test]
async fn from_file_rejects_invalid_values() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("steplog.toml");
    fs::write(
        &path,
        r#"
[ingest]
index_endpoint = "http://localhost:9200"
batch_size = 0
"#,
    )
    .expect("should write config");

    let err = SteplogConfig::from_file(&path).await.unwrap_err();
    match err {
        SteplogError::Config(ConfigError::InvalidValue { field, .. }) => {
            assert_eq!(field, "ingest.batch_size");
        }
        other => panic!("expected InvalidValue, got {other:?}"),
    }
}

#[tokio::test]
async fn from_file_rejects_malformed_toml() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[general\nlog_level = \"info\"\n").expect("should write config");

    let err = SteplogConfig::from_file(&path).await.unwrap_err();
    assert!(matches!(
        err,
        SteplogError::Config(ConfigError::ParseFailed { .. })
    ));
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

/// 환경변수를 설정한 채로 클로저를 실행하고 원래 값을 복원합니다.
fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
    let originals: Vec<_> = vars
        .iter()
        .map(|(key, _)| (key.to_string(), std::env::var(key).ok()))
        .collect();

    // SAFETY: 테스트는 serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
    }

    let result = f();

    // SAFETY: 테스트 정리
    unsafe {
        for (key, original) in originals {
            match original {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }

    result
}

#[test]
#[serial_test::serial]
fn deployment_env_vars_populate_ingest_section() {
    let config = with_env(
        &[
            ("OPENSEARCH_ENDPOINT", "search-a.eu-west-1.es.amazonaws.com"),
            ("AWS_REGION", "eu-west-1"),
        ],
        || {
            let mut config = SteplogConfig::parse("").expect("should parse");
            config.apply_env_overrides();
            config
        },
    );

    assert_eq!(
        config.ingest.index_endpoint,
        "search-a.eu-west-1.es.amazonaws.com"
    );
    assert_eq!(config.ingest.region, "eu-west-1");
    config.validate().expect("env-provided config should validate");
}

#[test]
#[serial_test::serial]
fn steplog_env_var_wins_over_deployment_var() {
    let config = with_env(
        &[
            ("OPENSEARCH_ENDPOINT", "deploy.example.com"),
            ("STEPLOG_INGEST_INDEX_ENDPOINT", "http://localhost:9200"),
        ],
        || {
            let mut config = SteplogConfig::parse("").expect("should parse");
            config.apply_env_overrides();
            config
        },
    );

    assert_eq!(config.ingest.index_endpoint, "http://localhost:9200");
}

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[general]
log_level = "info"

[ingest]
batch_size = 100
"#;

    let config = with_env(
        &[
            ("STEPLOG_GENERAL_LOG_LEVEL", "error"),
            ("STEPLOG_INGEST_BATCH_SIZE", "5"),
        ],
        || {
            let mut config = SteplogConfig::parse(toml).expect("should parse");
            config.apply_env_overrides();
            config
        },
    );

    assert_eq!(config.general.log_level, "error");
    assert_eq!(config.ingest.batch_size, 5);
}

#[test]
#[serial_test::serial]
fn from_env_fails_without_endpoint() {
    let result = with_env(&[("STEPLOG_INGEST_INDEX_ENDPOINT", "")], SteplogConfig::from_env);
    assert!(result.is_err());
}
