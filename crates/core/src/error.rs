//! 에러 타입 -- 도메인별 에러 정의

/// steplog 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum SteplogError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 수집 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 원본 저장소 / 인덱스 저장소 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 알림 메시지 해석 실패
    #[error("malformed notification: {0}")]
    MalformedNotification(String),

    /// 파일 처리 실패 (조회, 압축 해제, 디코딩)
    #[error("file processing failed: {0}")]
    FileFailed(String),

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),
}

/// 스토리지 에러
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 원본 객체 저장소 접근 실패
    #[error("object store error: {0}")]
    ObjectStore(String),

    /// 인덱스 저장소 쓰기 실패
    #[error("index store error: {0}")]
    Index(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_top_level() {
        let err: SteplogError = ConfigError::InvalidValue {
            field: "ingest.batch_size".to_owned(),
            reason: "must be 1-100000".to_owned(),
        }
        .into();
        assert!(matches!(err, SteplogError::Config(_)));
        assert!(err.to_string().contains("ingest.batch_size"));
    }

    #[test]
    fn storage_error_display() {
        let err = SteplogError::Storage(StorageError::Index("connection refused".to_owned()));
        let msg = err.to_string();
        assert!(msg.contains("index store"));
        assert!(msg.contains("connection refused"));
    }
}
