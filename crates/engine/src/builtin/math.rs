//! 산술/비교 연산 피처
//!
//! 반환 종류가 호출 문맥을 따르는 `MatchType` 항목입니다.
//! 패킷 종류 인스턴스는 이번 이벤트에서 모든 인자가 값을 낸 뒤 즉시 값을 내보내고,
//! 플로우 종류 인스턴스는 종료 시 마지막 인자 값들로 한 번 내보냅니다.
//!
//! 정수 연산은 범위를 벗어나면 값 없음(`None`)이 됩니다.

use std::cmp::Ordering;

use flowprobe_core::types::{FieldType, FlowEndReason, Value};

use crate::catalog::{Catalog, FeatureMaker};
use crate::error::CatalogError;
use crate::feature::{Feature, FeatureContext, Input, Source};
use crate::kind::FeatureKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Op {
    Add,
    Subtract,
    Multiply,
    Divide,
    Less,
    Greater,
    Equal,
}

impl Op {
    fn apply(self, a: &Value, b: &Value) -> Option<Value> {
        match self {
            Self::Add => arithmetic(a, b, i128::checked_add, |x, y| x + y),
            Self::Subtract => arithmetic(a, b, i128::checked_sub, |x, y| x - y),
            Self::Multiply => arithmetic(a, b, i128::checked_mul, |x, y| x * y),
            Self::Divide => {
                let divisor = b.as_f64()?;
                if divisor == 0.0 {
                    return None;
                }
                Some(Value::Float(a.as_f64()? / divisor))
            }
            Self::Less => Some(Value::Bool(a.compare(b)? == Ordering::Less)),
            Self::Greater => Some(Value::Bool(a.compare(b)? == Ordering::Greater)),
            Self::Equal => Some(Value::Bool(a.compare(b)? == Ordering::Equal)),
        }
    }
}

fn as_i128(value: &Value) -> Option<i128> {
    match value {
        Value::Signed(v) => Some((*v).into()),
        Value::Unsigned(v) => Some((*v).into()),
        _ => None,
    }
}

/// 두 숫자 값을 승격 규칙에 맞춰 계산합니다.
///
/// 실수가 하나라도 있으면 `f64`, 둘 다 부호 없는 정수면 `u64`, 그 외는 `i64`.
pub(super) fn arithmetic(
    a: &Value,
    b: &Value,
    integer: fn(i128, i128) -> Option<i128>,
    float: fn(f64, f64) -> f64,
) -> Option<Value> {
    if !a.is_numeric() || !b.is_numeric() {
        return None;
    }
    if matches!(a, Value::Float(_)) || matches!(b, Value::Float(_)) {
        return Some(Value::Float(float(a.as_f64()?, b.as_f64()?)));
    }
    let result = integer(as_i128(a)?, as_i128(b)?)?;
    match (a, b) {
        (Value::Unsigned(_), Value::Unsigned(_)) => u64::try_from(result).ok().map(Value::Unsigned),
        _ => i64::try_from(result).ok().map(Value::Signed),
    }
}

/// 인자 값 슬롯을 모아 연산하는 피처
struct Operator {
    op: Op,
    kind: FeatureKind,
    slots: Vec<Option<Value>>,
    constant: Vec<bool>,
}

impl Operator {
    fn new(op: Op, kind: FeatureKind) -> Self {
        Self {
            op,
            kind,
            slots: Vec::new(),
            constant: Vec::new(),
        }
    }

    fn evaluate(&self) -> Option<Value> {
        let mut values = self.slots.iter();
        let first = values.next()?.clone()?;
        values.try_fold(first, |acc, value| self.op.apply(&acc, value.as_ref()?))
    }

    fn complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }
}

impl Feature for Operator {
    fn start(&mut self, ctx: &mut FeatureContext<'_>) {
        self.slots = (0..ctx.arity()).map(|i| ctx.argument(i).cloned()).collect();
        self.constant = self.slots.iter().map(Option::is_some).collect();
    }

    fn event(&mut self, input: Input<'_>, ctx: &mut FeatureContext<'_>) {
        let Input::Value { value, source } = input else {
            // 상수 인자만 가진 패킷 연산은 패킷마다 직접 호출됨
            if self.kind == FeatureKind::PacketFeature && self.complete() {
                ctx.set_value(self.evaluate());
            }
            return;
        };
        let positions: Vec<usize> = ctx.positions(Source::Register(source)).collect();
        for position in positions {
            if let Some(slot) = self.slots.get_mut(position) {
                *slot = Some(value.clone());
            }
        }
        if self.kind == FeatureKind::PacketFeature && self.complete() {
            ctx.set_value(self.evaluate());
        }
    }

    fn finish_event(&mut self) {
        if self.kind != FeatureKind::PacketFeature {
            return;
        }
        for (slot, constant) in self.slots.iter_mut().zip(&self.constant) {
            if !constant {
                *slot = None;
            }
        }
    }

    fn stop(&mut self, _reason: FlowEndReason, ctx: &mut FeatureContext<'_>) {
        if self.kind != FeatureKind::PacketFeature && self.complete() {
            ctx.set_value(self.evaluate());
        }
    }
}

fn upconverted(types: &[FieldType]) -> Option<FieldType> {
    let (first, rest) = types.split_first()?;
    rest.iter()
        .try_fold(first.upconvert(*first)?, |acc, t| acc.upconvert(*t))
}

fn quotient(types: &[FieldType]) -> Option<FieldType> {
    match types {
        [a, b] if a.is_numeric() && b.is_numeric() => Some(FieldType::Float64),
        _ => None,
    }
}

fn comparison(types: &[FieldType]) -> Option<FieldType> {
    match types {
        [a, b] if (a.is_numeric() && b.is_numeric()) || a == b => Some(FieldType::Boolean),
        _ => None,
    }
}

fn operator(
    name: &str,
    op: Op,
    arguments: &[FeatureKind],
    resolver: fn(&[FieldType]) -> Option<FieldType>,
) -> FeatureMaker {
    FeatureMaker::new(name, FeatureKind::MatchType, arguments.iter().copied())
        .with_resolver(resolver)
        .with_factory(move |kind| Box::new(Operator::new(op, kind)))
}

pub(super) fn register(catalog: &mut Catalog) -> Result<(), CatalogError> {
    use FeatureKind::{Ellipsis, MatchType};

    let variadic = [MatchType, MatchType, Ellipsis];
    let binary = [MatchType, MatchType];

    catalog.register(operator("add", Op::Add, &variadic, upconverted))?;
    catalog.register(operator("multiply", Op::Multiply, &variadic, upconverted))?;
    catalog.register(operator("subtract", Op::Subtract, &binary, upconverted))?;
    catalog.register(operator("divide", Op::Divide, &binary, quotient))?;
    catalog.register(operator("less", Op::Less, &binary, comparison))?;
    catalog.register(operator("greater", Op::Greater, &binary, comparison))?;
    catalog.register(operator("equal", Op::Equal, &binary, comparison))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_arithmetic_stays_unsigned() {
        assert_eq!(
            Op::Add.apply(&Value::Unsigned(2), &Value::Unsigned(3)),
            Some(Value::Unsigned(5))
        );
        // 음수가 되는 부호 없는 뺄셈은 값 없음
        assert_eq!(Op::Subtract.apply(&Value::Unsigned(2), &Value::Unsigned(3)), None);
    }

    #[test]
    fn mixed_sign_is_signed() {
        assert_eq!(
            Op::Subtract.apply(&Value::Unsigned(2), &Value::Signed(3)),
            Some(Value::Signed(-1))
        );
        assert_eq!(Op::Multiply.apply(&Value::Signed(i64::MAX), &Value::Signed(2)), None);
    }

    #[test]
    fn float_wins_and_division_by_zero_is_none() {
        assert_eq!(
            Op::Add.apply(&Value::Float(0.5), &Value::Unsigned(1)),
            Some(Value::Float(1.5))
        );
        assert_eq!(
            Op::Divide.apply(&Value::Unsigned(3), &Value::Unsigned(2)),
            Some(Value::Float(1.5))
        );
        assert_eq!(Op::Divide.apply(&Value::Unsigned(3), &Value::Unsigned(0)), None);
    }

    #[test]
    fn comparisons_promote_numbers() {
        assert_eq!(
            Op::Less.apply(&Value::Signed(-1), &Value::Unsigned(0)),
            Some(Value::Bool(true))
        );
        assert_eq!(
            Op::Equal.apply(&Value::Unsigned(1), &Value::Float(1.0)),
            Some(Value::Bool(true))
        );
        assert_eq!(Op::Greater.apply(&Value::Bool(true), &Value::Unsigned(0)), None);
    }

    #[test]
    fn resolvers_follow_upconversion() {
        assert_eq!(
            upconverted(&[FieldType::Unsigned16, FieldType::Unsigned8]),
            Some(FieldType::Unsigned64)
        );
        assert_eq!(
            upconverted(&[FieldType::Unsigned16, FieldType::Signed64, FieldType::Float32]),
            Some(FieldType::Float64)
        );
        assert_eq!(upconverted(&[FieldType::Ipv4Address, FieldType::Unsigned8]), None);
        assert_eq!(
            comparison(&[FieldType::Ipv4Address, FieldType::Ipv4Address]),
            Some(FieldType::Boolean)
        );
        assert_eq!(comparison(&[FieldType::Ipv4Address, FieldType::Unsigned8]), None);
    }
}
