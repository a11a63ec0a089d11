//! 경로 필터 -- 스텝 로그 객체 키만 통과시킵니다.
//!
//! 키가 `/j-<id>/steps/s-<id>/stdout.gz` 또는 `/stderr.gz`로 끝나야 통과합니다.
//! 대소문자를 구분하며 `.gz`는 리터럴로 비교합니다.
//!
//! 패턴은 키 끝에 고정됩니다. 따라서 `stdout.gz.1`, `stdout.gz.bak`처럼 뒤에 문자가
//! 붙은 키나 `stdoutXgz`는 부분 일치 검색이라면 통과했겠지만 여기서는 거부됩니다.
//! 로테이션되거나 복사된 사본이 같은 라인을 다른 `log_file`로 다시 인덱싱하지
//! 않도록 의도적으로 좁힌 규칙입니다.

use regex::Regex;

use crate::error::IngestError;

/// 스텝 로그 키 패턴
pub const STEP_LOG_KEY_PATTERN: &str =
    r"/j-[A-Za-z0-9_]+/steps/s-[A-Za-z0-9_]+/std(?:out|err)\.gz$";

/// 스텝 로그 경로 필터
#[derive(Debug, Clone)]
pub struct PathFilter {
    pattern: Regex,
}

impl PathFilter {
    /// 기본 스텝 로그 패턴으로 필터를 생성합니다.
    pub fn new() -> Result<Self, IngestError> {
        Ok(Self {
            pattern: Regex::new(STEP_LOG_KEY_PATTERN)?,
        })
    }

    /// 키가 스텝 로그 형태이면 `true`를 반환합니다.
    pub fn accepts(&self, object_key: &str) -> bool {
        let accepted = self.pattern.is_match(object_key);
        if !accepted {
            tracing::debug!(key = object_key, "object key does not match step log pattern");
        }
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> PathFilter {
        PathFilter::new().unwrap()
    }

    #[test]
    fn accepts_stdout_and_stderr() {
        let f = filter();
        assert!(f.accepts("emr/j-2AXXXXXXGAPLF/steps/s-1000/stdout.gz"));
        assert!(f.accepts("logs/j-ABC_1/steps/s-XYZ_2/stderr.gz"));
    }

    #[test]
    fn rejects_other_step_files() {
        let f = filter();
        assert!(!f.accepts("emr/j-1/steps/s-1/controller.gz"));
        assert!(!f.accepts("emr/j-1/steps/s-1/syslog.gz"));
    }

    #[test]
    fn rejects_uncompressed_and_suffixed_keys() {
        let f = filter();
        assert!(!f.accepts("emr/j-1/steps/s-1/stdout"));
        assert!(!f.accepts("emr/j-1/steps/s-1/stdout.gz.bak"));
        assert!(!f.accepts("emr/j-1/steps/s-1/stdout.gz.1"));
        assert!(!f.accepts("emr/j-1/steps/s-1/stdoutXgz"));
        assert!(!f.accepts("emr/j-1/steps/s-1/stdoutxgz"));
    }

    #[test]
    fn rejects_wrong_case() {
        let f = filter();
        assert!(!f.accepts("emr/J-1/steps/s-1/stdout.gz"));
        assert!(!f.accepts("emr/j-1/Steps/s-1/stdout.gz"));
        assert!(!f.accepts("emr/j-1/steps/s-1/STDOUT.gz"));
    }

    #[test]
    fn requires_leading_separator_before_cluster() {
        let f = filter();
        assert!(!f.accepts("j-1/steps/s-1/stdout.gz"));
        assert!(f.accepts("/j-1/steps/s-1/stdout.gz"));
    }

    #[test]
    fn rejects_node_and_container_logs() {
        let f = filter();
        assert!(!f.accepts("emr/j-1/node/i-0abc/applications/hadoop/stdout.gz"));
        assert!(!f.accepts("emr/j-1/containers/application_1/container_1/stderr.gz"));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn generated_step_keys_are_accepted(
                prefix in "[a-z0-9/-]{0,20}",
                cluster in "[A-Za-z0-9_]{1,16}",
                step in "[A-Za-z0-9_]{1,16}",
                stream in prop_oneof![Just("stdout"), Just("stderr")],
            ) {
                let key = format!("{prefix}/j-{cluster}/steps/s-{step}/{stream}.gz");
                prop_assert!(filter().accepts(&key));
            }

            #[test]
            fn keys_with_trailing_text_are_rejected(
                cluster in "[A-Za-z0-9_]{1,16}",
                suffix in "[a-z.]{1,8}",
            ) {
                let key = format!("emr/j-{cluster}/steps/s-1/stdout.gz{suffix}");
                prop_assert!(!filter().accepts(&key));
            }
        }
    }
}
