//! 설정 관리 -- flowprobe.toml 파싱 및 런타임 설정
//!
//! [`FlowprobeConfig`]는 모든 크레이트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`FLOWPROBE_COMPILER_MAX_VARIANT_COMBINATIONS=1024` 형식)
//! 3. 설정 파일 (`flowprobe.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), flowprobe_core::error::FlowprobeError> {
//! use flowprobe_core::config::FlowprobeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = FlowprobeConfig::load("flowprobe.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = FlowprobeConfig::parse("[compiler]\nmax_variant_combinations = 64")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, FlowprobeError};

/// 변형 조합 수 상한 기본값
pub const DEFAULT_MAX_VARIANT_COMBINATIONS: usize = 4096;

/// flowprobe 통합 설정
///
/// `flowprobe.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowprobeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 컴파일러 설정
    #[serde(default)]
    pub compiler: CompilerConfig,
    /// 피처 명세 설정
    #[serde(default)]
    pub spec: SpecConfig,
}

impl FlowprobeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, FlowprobeError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, FlowprobeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FlowprobeError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                FlowprobeError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, FlowprobeError> {
        toml::from_str(toml_str).map_err(|e| {
            FlowprobeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `FLOWPROBE_{SECTION}_{FIELD}`
    /// 예: `FLOWPROBE_SPEC_PATH=/etc/flowprobe/features.json`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "FLOWPROBE_GENERAL_LOG_LEVEL");
        override_string(
            &mut self.general.log_format,
            "FLOWPROBE_GENERAL_LOG_FORMAT",
        );

        // Compiler
        override_usize(
            &mut self.compiler.max_variant_combinations,
            "FLOWPROBE_COMPILER_MAX_VARIANT_COMBINATIONS",
        );

        // Spec
        override_string(&mut self.spec.path, "FLOWPROBE_SPEC_PATH");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), FlowprobeError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.compiler.max_variant_combinations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "compiler.max_variant_combinations".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.spec.path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "spec.path".to_owned(),
                reason: "path must not be empty".to_owned(),
            }
            .into());
        }

        Ok(())
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

/// 컴파일러 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// 단일 호출에서 열거할 수 있는 변형 조합의 최대 개수
    pub max_variant_combinations: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_variant_combinations: DEFAULT_MAX_VARIANT_COMBINATIONS,
        }
    }
}

/// 피처 명세 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecConfig {
    /// CLI가 인자 없이 사용할 명세 파일 경로
    pub path: String,
}

impl Default for SpecConfig {
    fn default() -> Self {
        Self {
            path: "features.json".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = FlowprobeConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.compiler.max_variant_combinations, 4096);
        assert_eq!(config.spec.path, "features.json");
    }

    #[test]
    fn default_config_passes_validation() {
        let config = FlowprobeConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = FlowprobeConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.compiler.max_variant_combinations, 4096);
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[compiler]
max_variant_combinations = 16
"#;
        let config = FlowprobeConfig::parse(toml).unwrap();
        assert_eq!(config.compiler.max_variant_combinations, 16);
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.spec.path, "features.json");
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let result = FlowprobeConfig::parse("invalid = [[[toml");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            FlowprobeError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = FlowprobeConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = FlowprobeConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn validate_rejects_zero_variant_limit() {
        let mut config = FlowprobeConfig::default();
        config.compiler.max_variant_combinations = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_variant_combinations"));
    }

    #[test]
    fn validate_rejects_blank_spec_path() {
        let mut config = FlowprobeConfig::default();
        config.spec.path = "  ".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("spec.path"));
    }

    #[test]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_FLOWPROBE_STR", "overridden") };
        override_string(&mut val, "TEST_FLOWPROBE_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_FLOWPROBE_STR") };
    }

    #[test]
    fn env_override_usize_invalid_keeps_original() {
        let mut val = 7usize;
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_FLOWPROBE_USIZE_BAD", "many") };
        override_usize(&mut val, "TEST_FLOWPROBE_USIZE_BAD");
        assert_eq!(val, 7); // 원래 값 유지
        unsafe { std::env::remove_var("TEST_FLOWPROBE_USIZE_BAD") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = "original".to_owned();
        override_string(&mut val, "TEST_FLOWPROBE_NONEXISTENT_12345");
        assert_eq!(val, "original");
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = FlowprobeConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = FlowprobeConfig::parse(&toml_str).unwrap();
        assert_eq!(config.general.log_level, parsed.general.log_level);
        assert_eq!(
            config.compiler.max_variant_combinations,
            parsed.compiler.max_variant_combinations
        );
        assert_eq!(config.spec.path, parsed.spec.path);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = FlowprobeConfig::from_file("/nonexistent/path/flowprobe.toml").await;
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            FlowprobeError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
