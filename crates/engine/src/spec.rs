//! 피처 명세 로더 -- JSON 명세 파일을 읽어 [`FeatureSpec`]으로 변환합니다.
//!
//! # 명세 형식
//! ```json
//! { "features": ["octetTotalCount", ["mean", "ipTotalLength"]],
//!   "control":  ["_tcpEnd"],
//!   "filter":   ["tcp"] }
//! ```
//!
//! 최상위가 배열이면 `{"features": [...]}`의 축약형으로 취급합니다.
//! 표현식 자체의 해석(상수 타입 검사 등)은 컴파일러가 수행합니다.

use std::path::Path;

use serde::{Deserialize, Serialize};

use flowprobe_core::error::SpecError;

/// 명세 파일 최대 크기
const MAX_SPEC_FILE_SIZE: u64 = 4 * 1024 * 1024; // 4MB

/// 피처 명세
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureSpec {
    /// 익스포트할 피처 표현식 목록
    pub features: Vec<serde_json::Value>,
    /// 컨트롤 피처 목록
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub control: Vec<serde_json::Value>,
    /// 필터 이름 목록
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<String>,
}

impl FeatureSpec {
    /// 피처 목록으로 명세를 생성합니다.
    pub fn new(features: impl IntoIterator<Item = serde_json::Value>) -> Self {
        Self {
            features: features.into_iter().collect(),
            control: Vec::new(),
            filter: Vec::new(),
        }
    }

    /// 컨트롤 피처를 추가합니다.
    pub fn with_control(mut self, control: impl Into<serde_json::Value>) -> Self {
        self.control.push(control.into());
        self
    }

    /// 필터를 추가합니다.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter.push(filter.into());
        self
    }

    /// JSON 문자열에서 명세를 파싱합니다.
    pub fn parse(json: &str) -> Result<Self, SpecError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| SpecError::ParseFailed {
                reason: e.to_string(),
            })?;
        Self::from_value(value)
    }

    /// 이미 파싱된 JSON 값에서 명세를 만듭니다.
    pub fn from_value(value: serde_json::Value) -> Result<Self, SpecError> {
        let spec = match value {
            serde_json::Value::Array(features) => Self::new(features),
            value @ serde_json::Value::Object(_) => {
                serde_json::from_value(value).map_err(|e| SpecError::Invalid {
                    reason: e.to_string(),
                })?
            }
            other => {
                return Err(SpecError::Invalid {
                    reason: format!("expected an object or an array, got {}", json_kind(&other)),
                });
            }
        };
        spec.validate()?;
        Ok(spec)
    }

    /// 파일에서 명세를 로드합니다.
    ///
    /// # Errors
    /// - 파일이 없거나 읽을 수 없는 경우
    /// - 파일이 `MAX_SPEC_FILE_SIZE`보다 큰 경우
    /// - JSON 파싱 또는 구조 검증에 실패한 경우
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SpecError> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SpecError::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                SpecError::ParseFailed {
                    reason: format!("{}: {e}", path.display()),
                }
            }
        })?;

        if metadata.len() > MAX_SPEC_FILE_SIZE {
            return Err(SpecError::Invalid {
                reason: format!(
                    "file too large: {} bytes (max: {MAX_SPEC_FILE_SIZE})",
                    metadata.len()
                ),
            });
        }

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| SpecError::ParseFailed {
                    reason: format!("{}: {e}", path.display()),
                })?;

        let spec = Self::parse(&content)?;
        tracing::debug!(
            path = %path.display(),
            features = spec.features.len(),
            controls = spec.control.len(),
            filters = spec.filter.len(),
            "loaded feature spec"
        );
        Ok(spec)
    }

    /// 구조를 검증합니다.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.features.is_empty() {
            return Err(SpecError::Invalid {
                reason: "features must not be empty".to_owned(),
            });
        }
        if let Some(pos) = self.filter.iter().position(|f| f.trim().is_empty()) {
            return Err(SpecError::Invalid {
                reason: format!("filter #{} has an empty name", pos + 1),
            });
        }
        Ok(())
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
