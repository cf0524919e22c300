//! 에러 타입 -- 도메인별 에러 정의

/// flowprobe 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum FlowprobeError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 피처 명세 로딩 에러
    #[error("spec error: {0}")]
    Spec(#[from] SpecError),

    /// 피처 명세 컴파일 에러
    #[error("compile error: {0}")]
    Compile(String),

    /// 익스포터 에러
    #[error("export error: {0}")]
    Export(String),

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

/// 피처 명세(JSON) 로딩 에러
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    /// 명세 파일을 찾을 수 없음
    #[error("spec file not found: {path}")]
    FileNotFound { path: String },

    /// JSON 파싱 실패
    #[error("failed to parse spec: {reason}")]
    ParseFailed { reason: String },

    /// 구조가 올바르지 않은 명세
    #[error("invalid spec: {reason}")]
    Invalid { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_top_level() {
        let err: FlowprobeError = ConfigError::InvalidValue {
            field: "general.log_level".to_owned(),
            reason: "bad".to_owned(),
        }
        .into();
        assert!(matches!(err, FlowprobeError::Config(_)));
        assert!(err.to_string().contains("general.log_level"));
    }

    #[test]
    fn spec_error_display() {
        let err = SpecError::Invalid {
            reason: "features must not be empty".to_owned(),
        };
        assert_eq!(err.to_string(), "invalid spec: features must not be empty");
    }

    #[test]
    fn io_error_converts_to_top_level() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: FlowprobeError = io.into();
        assert!(matches!(err, FlowprobeError::Io(_)));
    }
}
