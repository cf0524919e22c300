//! flowprobe.toml 통합 설정 테스트
//!
//! - flowprobe.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use std::io::Write;

use flowprobe_core::config::FlowprobeConfig;
use flowprobe_core::error::{ConfigError, FlowprobeError};

// =============================================================================
// flowprobe.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../flowprobe.toml.example");
    let config = FlowprobeConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.compiler.max_variant_combinations, 4096);
    assert_eq!(config.spec.path, "features.json");
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../flowprobe.toml.example");
    let config = FlowprobeConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_matches_code_defaults() {
    let content = include_str!("../../../flowprobe.toml.example");
    let example = FlowprobeConfig::parse(content).expect("should parse");
    let defaults = FlowprobeConfig::default();

    assert_eq!(example.general.log_level, defaults.general.log_level);
    assert_eq!(example.general.log_format, defaults.general.log_format);
    assert_eq!(
        example.compiler.max_variant_combinations,
        defaults.compiler.max_variant_combinations
    );
    assert_eq!(example.spec.path, defaults.spec.path);
}

// =============================================================================
// 부분 설정 테스트
// =============================================================================

#[test]
fn partial_config_general_only() {
    let toml = r#"
[general]
log_level = "debug"
log_format = "pretty"
"#;
    let config = FlowprobeConfig::parse(toml).expect("should parse");
    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.compiler.max_variant_combinations, 4096);
}

#[test]
fn partial_config_spec_only() {
    let toml = r#"
[spec]
path = "/etc/flowprobe/features.json"
"#;
    let config = FlowprobeConfig::parse(toml).expect("should parse");
    assert_eq!(config.spec.path, "/etc/flowprobe/features.json");
    assert_eq!(config.general.log_level, "info");
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[general]
log_level = "info"
"#;

    let original = std::env::var("FLOWPROBE_GENERAL_LOG_LEVEL").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("FLOWPROBE_GENERAL_LOG_LEVEL", "error");
    }

    let mut config = FlowprobeConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();
    let result = config.general.log_level.clone();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("FLOWPROBE_GENERAL_LOG_LEVEL", val),
            None => std::env::remove_var("FLOWPROBE_GENERAL_LOG_LEVEL"),
        }
    }

    assert_eq!(result, "error");
}

#[test]
#[serial_test::serial]
fn env_override_numeric_field() {
    let original = std::env::var("FLOWPROBE_COMPILER_MAX_VARIANT_COMBINATIONS").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("FLOWPROBE_COMPILER_MAX_VARIANT_COMBINATIONS", "64");
    }

    let mut config = FlowprobeConfig::default();
    config.apply_env_overrides();
    let result = config.compiler.max_variant_combinations;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("FLOWPROBE_COMPILER_MAX_VARIANT_COMBINATIONS", val),
            None => std::env::remove_var("FLOWPROBE_COMPILER_MAX_VARIANT_COMBINATIONS"),
        }
    }

    assert_eq!(result, 64);
}

#[test]
#[serial_test::serial]
fn env_override_invalid_numeric_keeps_toml_value() {
    let toml = r#"
[compiler]
max_variant_combinations = 10
"#;
    let original = std::env::var("FLOWPROBE_COMPILER_MAX_VARIANT_COMBINATIONS").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("FLOWPROBE_COMPILER_MAX_VARIANT_COMBINATIONS", "lots");
    }

    let mut config = FlowprobeConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();
    let result = config.compiler.max_variant_combinations;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("FLOWPROBE_COMPILER_MAX_VARIANT_COMBINATIONS", val),
            None => std::env::remove_var("FLOWPROBE_COMPILER_MAX_VARIANT_COMBINATIONS"),
        }
    }

    assert_eq!(result, 10);
}

#[test]
#[serial_test::serial]
fn env_override_spec_path() {
    let original = std::env::var("FLOWPROBE_SPEC_PATH").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("FLOWPROBE_SPEC_PATH", "/tmp/other.json");
    }

    let mut config = FlowprobeConfig::default();
    config.apply_env_overrides();
    let result = config.spec.path.clone();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("FLOWPROBE_SPEC_PATH", val),
            None => std::env::remove_var("FLOWPROBE_SPEC_PATH"),
        }
    }

    assert_eq!(result, "/tmp/other.json");
}

// =============================================================================
// 에러 케이스 테스트
// =============================================================================

#[test]
fn empty_string_parses_with_defaults() {
    let config = FlowprobeConfig::parse("").expect("empty should parse");
    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.spec.path, "features.json");
}

#[test]
fn comments_only_parses_with_defaults() {
    let toml = "# nothing here\n# [general]\n";
    let config = FlowprobeConfig::parse(toml).expect("should parse");
    assert_eq!(config.compiler.max_variant_combinations, 4096);
}

#[test]
fn malformed_toml_returns_parse_error() {
    let result = FlowprobeConfig::parse("[general\nlog_level = ");
    assert!(matches!(
        result.unwrap_err(),
        FlowprobeError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn wrong_type_for_numeric_field() {
    let toml = r#"
[compiler]
max_variant_combinations = "many"
"#;
    let result = FlowprobeConfig::parse(toml);
    assert!(matches!(
        result.unwrap_err(),
        FlowprobeError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn unknown_section_is_ignored() {
    let toml = r#"
[general]
log_level = "warn"

[exporter]
kind = "csv"
"#;
    let config = FlowprobeConfig::parse(toml).expect("unknown sections should be ignored");
    assert_eq!(config.general.log_level, "warn");
}

#[tokio::test]
async fn from_file_nonexistent_returns_file_not_found() {
    let result = FlowprobeConfig::from_file("/tmp/flowprobe_test_nonexistent_12345.toml").await;
    assert!(matches!(
        result.unwrap_err(),
        FlowprobeError::Config(ConfigError::FileNotFound { .. })
    ));
}

#[tokio::test]
async fn from_file_rejects_invalid_values() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[general]\nlog_format = \"xml\"").expect("write");

    let result = FlowprobeConfig::from_file(file.path()).await;
    assert!(matches!(
        result.unwrap_err(),
        FlowprobeError::Config(ConfigError::InvalidValue { .. })
    ));
}

#[tokio::test]
#[serial_test::serial]
async fn load_applies_overrides_from_disk() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[spec]\npath = \"a.json\"").expect("write");

    let original = std::env::var("FLOWPROBE_GENERAL_LOG_FORMAT").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("FLOWPROBE_GENERAL_LOG_FORMAT", "pretty");
    }

    let result = FlowprobeConfig::load(file.path()).await;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("FLOWPROBE_GENERAL_LOG_FORMAT", val),
            None => std::env::remove_var("FLOWPROBE_GENERAL_LOG_FORMAT"),
        }
    }

    let config = result.expect("should load");
    assert_eq!(config.spec.path, "a.json");
    assert_eq!(config.general.log_format, "pretty");
}

// =============================================================================
// 직렬화 라운드트립 테스트
// =============================================================================

#[test]
fn serialize_and_reparse_roundtrip() {
    let mut original = FlowprobeConfig::default();
    original.compiler.max_variant_combinations = 12;
    original.spec.path = "custom.json".to_owned();

    let toml_str = toml::to_string_pretty(&original).expect("should serialize");
    let reparsed = FlowprobeConfig::parse(&toml_str).expect("should reparse");

    assert_eq!(reparsed.compiler.max_variant_combinations, 12);
    assert_eq!(reparsed.spec.path, "custom.json");
}
