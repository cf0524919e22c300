//! 엔진 에러 타입
//!
//! [`CompileError`]는 피처 명세 컴파일 중 발생하는 모든 에러를 표현합니다.
//! 모든 변형은 문제가 된 노드의 위치(최상위 목록 기준 1부터 시작)와 이름을 가집니다.
//! 중첩된 노드는 자신이 속한 최상위 노드의 위치를 물려받습니다.
//!
//! `From<CompileError> for FlowprobeError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use flowprobe_core::error::FlowprobeError;

/// 피처 명세 컴파일 에러
///
/// 컴파일 에러는 복구 불가능하며, 부분적으로 만들어진 프로그램은 사용할 수 없습니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// 카탈로그에 없는 피처 이름
    #[error("feature #{position}: unknown feature '{name}'")]
    UnknownFeature {
        /// 최상위 목록 위치 (1부터 시작)
        position: usize,
        /// 피처 이름
        name: String,
    },

    /// 카탈로그에 없는 컨트롤 피처
    #[error("control #{position}: unknown control feature '{name}'")]
    UnknownControl {
        /// 컨트롤 목록 위치 (1부터 시작)
        position: usize,
        /// 컨트롤 피처 이름
        name: String,
    },

    /// 카탈로그에 없는 필터
    #[error("filter #{position}: unknown filter '{name}'")]
    UnknownFilter {
        /// 필터 목록 위치 (1부터 시작)
        position: usize,
        /// 필터 이름
        name: String,
    },

    /// 어떤 오버로드 후보도 인자 타입을 만족하지 못함
    #[error("feature #{position}: type mismatch in '{name}': {reason}")]
    TypeMismatch {
        position: usize,
        name: String,
        /// 후보별 실패 사유 (" or "로 연결)
        reason: String,
    },

    /// 모든 변형 조합이 호환되지 않음
    #[error("feature #{position}: could not resolve types of '{name}'")]
    UnresolvableVariant { position: usize, name: String },

    /// 변형 조합 수가 설정된 상한을 초과
    #[error(
        "feature #{position}: '{name}' needs {combinations} variant combinations (limit {limit})"
    )]
    TooManyVariants {
        position: usize,
        name: String,
        /// 필요한 조합 수
        combinations: usize,
        /// 설정된 상한
        limit: usize,
    },

    /// 같은 표현식을 두 번 익스포트
    #[error("feature #{position}: exporting feature twice not allowed: '{name}'")]
    DuplicateExport { position: usize, name: String },

    /// 지원하지 않는 상수 타입 (bool, 정수, 실수 외)
    #[error("feature #{position}: unsupported constant {name}")]
    UnsupportedConstant { position: usize, name: String },

    /// 문법에 맞지 않는 표현식
    #[error("feature #{position}: invalid expression '{name}': {reason}")]
    InvalidExpression {
        position: usize,
        name: String,
        reason: String,
    },
}

impl CompileError {
    /// 에러가 발생한 노드의 위치
    pub fn position(&self) -> usize {
        match self {
            Self::UnknownFeature { position, .. }
            | Self::UnknownControl { position, .. }
            | Self::UnknownFilter { position, .. }
            | Self::TypeMismatch { position, .. }
            | Self::UnresolvableVariant { position, .. }
            | Self::TooManyVariants { position, .. }
            | Self::DuplicateExport { position, .. }
            | Self::UnsupportedConstant { position, .. }
            | Self::InvalidExpression { position, .. } => *position,
        }
    }

    /// 에러가 발생한 노드의 이름
    pub fn name(&self) -> &str {
        match self {
            Self::UnknownFeature { name, .. }
            | Self::UnknownControl { name, .. }
            | Self::UnknownFilter { name, .. }
            | Self::TypeMismatch { name, .. }
            | Self::UnresolvableVariant { name, .. }
            | Self::TooManyVariants { name, .. }
            | Self::DuplicateExport { name, .. }
            | Self::UnsupportedConstant { name, .. }
            | Self::InvalidExpression { name, .. } => name,
        }
    }

    /// 메트릭 레이블로 사용하는 에러 종류
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownFeature { .. } => "unknown_feature",
            Self::UnknownControl { .. } => "unknown_control",
            Self::UnknownFilter { .. } => "unknown_filter",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::UnresolvableVariant { .. } => "unresolvable_variant",
            Self::TooManyVariants { .. } => "too_many_variants",
            Self::DuplicateExport { .. } => "duplicate_export",
            Self::UnsupportedConstant { .. } => "unsupported_constant",
            Self::InvalidExpression { .. } => "invalid_expression",
        }
    }

    /// 오버로드 후보 집계 메시지에 들어갈 짧은 설명
    pub(crate) fn summary(&self) -> String {
        match self {
            Self::UnknownFeature { name, .. } => format!("unknown feature '{name}'"),
            Self::TypeMismatch { name, reason, .. } => format!("{name}: {reason}"),
            other => other.to_string(),
        }
    }
}

impl From<CompileError> for FlowprobeError {
    fn from(err: CompileError) -> Self {
        FlowprobeError::Compile(err.to_string())
    }
}

/// 카탈로그 등록 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// 같은 이름, 반환 종류, 인자 종류를 가진 항목이 이미 존재
    #[error("already registered: {name} {signature}")]
    AlreadyRegistered {
        /// 피처/컴포지트/필터 이름
        name: String,
        /// 충돌한 시그니처
        signature: String,
    },

    /// 잘못된 정의
    #[error("invalid definition of '{name}': {reason}")]
    InvalidDefinition { name: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_display_includes_position_and_name() {
        let err = CompileError::UnknownFeature {
            position: 3,
            name: "__nonexistent__".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "feature #3: unknown feature '__nonexistent__'"
        );
        assert_eq!(err.position(), 3);
        assert_eq!(err.name(), "__nonexistent__");
        assert_eq!(err.kind(), "unknown_feature");
    }

    #[test]
    fn duplicate_export_message() {
        let err = CompileError::DuplicateExport {
            position: 2,
            name: "sourceIPAddress".to_owned(),
        };
        assert!(err.to_string().contains("exporting feature twice not allowed"));
    }

    #[test]
    fn compile_error_converts_to_top_level() {
        let err: FlowprobeError = CompileError::UnresolvableVariant {
            position: 1,
            name: "add".to_owned(),
        }
        .into();
        assert!(matches!(err, FlowprobeError::Compile(_)));
        assert!(err.to_string().contains("could not resolve types"));
    }

    #[test]
    fn catalog_error_display() {
        let err = CatalogError::AlreadyRegistered {
            name: "min".to_owned(),
            signature: "FlowFeature(PacketFeature)".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "already registered: min FlowFeature(PacketFeature)"
        );
    }
}
