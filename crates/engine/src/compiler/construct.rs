//! Construct 패스 -- JSON 표현식을 트리로 변환
//!
//! - 문자열: 원시 입력 하나를 암묵 인자로 받는 호출
//! - 배열: `[이름, 인자...]` 형식의 호출
//! - bool / 정수 / 실수: 상수 (i64 → u64 → f64 순서로 시도)
//! - null / 객체: 지원하지 않는 상수

use flowprobe_core::types::Value;

use crate::ast::{Ast, NodeId};
use crate::error::CompileError;
use crate::spec::FeatureSpec;

pub(crate) fn run(spec: &FeatureSpec) -> Result<Ast, CompileError> {
    let mut ast = Ast::new();

    for (i, feature) in spec.features.iter().enumerate() {
        let root = from_json(&mut ast, feature, i + 1)?;
        ast.roots.push(root);
    }

    for (i, control) in spec.control.iter().enumerate() {
        let position = i + 1;
        let serde_json::Value::String(name) = control else {
            return Err(CompileError::UnknownControl {
                position,
                name: control.to_string(),
            });
        };
        let raw = ast.raw(position);
        let id = ast.call(name.as_str(), vec![raw], position);
        ast.get_mut(id).control = true;
        ast.controls.push(id);
    }

    Ok(ast)
}

/// JSON 표현식 하나를 트리로 변환합니다. 컴포지트 확장에서도 사용합니다.
pub(crate) fn from_json(
    ast: &mut Ast,
    value: &serde_json::Value,
    position: usize,
) -> Result<NodeId, CompileError> {
    use serde_json::Value as Json;

    match value {
        Json::String(name) => {
            if name.is_empty() {
                return Err(CompileError::InvalidExpression {
                    position,
                    name: value.to_string(),
                    reason: "identifier must not be empty".to_owned(),
                });
            }
            let raw = ast.raw(position);
            Ok(ast.call(name.as_str(), vec![raw], position))
        }
        Json::Array(items) => {
            let Some((head, rest)) = items.split_first() else {
                return Err(CompileError::InvalidExpression {
                    position,
                    name: "[]".to_owned(),
                    reason: "call must not be empty".to_owned(),
                });
            };
            let Json::String(name) = head else {
                return Err(CompileError::InvalidExpression {
                    position,
                    name: head.to_string(),
                    reason: "call name must be a string".to_owned(),
                });
            };
            let args = rest
                .iter()
                .map(|arg| from_json(ast, arg, position))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ast.call(name.as_str(), args, position))
        }
        Json::Bool(b) => Ok(ast.constant(Value::Bool(*b), position)),
        Json::Number(n) => {
            let constant = if let Some(i) = n.as_i64() {
                Value::Signed(i)
            } else if let Some(u) = n.as_u64() {
                Value::Unsigned(u)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                return Err(CompileError::UnsupportedConstant {
                    position,
                    name: n.to_string(),
                });
            };
            Ok(ast.constant(constant, position))
        }
        Json::Null | Json::Object(_) => Err(CompileError::UnsupportedConstant {
            position,
            name: value.to_string(),
        }),
    }
}
