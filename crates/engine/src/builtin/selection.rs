//! 선택 피처 -- 조건을 만족하는 패킷만 의존 레지스터로 전달
//!
//! `apply`와 `map`은 런타임 인스턴스가 없는 재작성 항목이며 Lower 패스가 처리합니다.

use flowprobe_core::types::Value;

use crate::catalog::{Catalog, FeatureMaker};
use crate::error::CatalogError;
use crate::feature::{Feature, FeatureContext, Input};
use crate::kind::FeatureKind;

/// 방향 선택 (`forward`, `backward`)
struct Direction {
    forward: bool,
}

impl Feature for Direction {
    fn event(&mut self, input: Input<'_>, ctx: &mut FeatureContext<'_>) {
        if input.packet().is_some_and(|p| p.forward() == self.forward) {
            ctx.forward();
        }
    }
}

/// 술어 선택 (`select`). 같은 이벤트에서 술어가 참이면 패킷을 전달합니다.
#[derive(Default)]
struct Predicate {
    constant: Option<bool>,
    current: Option<bool>,
}

impl Feature for Predicate {
    fn start(&mut self, ctx: &mut FeatureContext<'_>) {
        self.constant = ctx.argument(0).map(Value::is_truthy);
        self.current = None;
    }

    fn event(&mut self, input: Input<'_>, ctx: &mut FeatureContext<'_>) {
        match input {
            Input::Value { value, .. } => self.current = Some(value.is_truthy()),
            Input::Packet { .. } => {
                if self.current.or(self.constant) == Some(true) {
                    ctx.forward();
                }
            }
        }
    }

    fn finish_event(&mut self) {
        self.current = None;
    }
}

/// 구간 내 패킷 순번으로 선택 (`select_slice`)
///
/// 순번은 0부터 시작하며 `start`에서 초기화됩니다.
/// 음수 시작 값은 0으로, 음수 끝 값은 끝 없음으로 취급합니다.
#[derive(Debug, Default)]
struct Slice {
    start: u64,
    stop: Option<u64>,
    index: u64,
}

impl Slice {
    fn new(start: i64, stop: Option<i64>) -> Self {
        Self {
            start: u64::try_from(start).unwrap_or(0),
            stop: stop.and_then(|s| u64::try_from(s).ok()),
            index: 0,
        }
    }

    /// 다음 패킷의 순번을 소비하고 선택 여부를 반환합니다.
    fn next(&mut self) -> bool {
        let index = self.index;
        self.index += 1;
        index >= self.start && self.stop.is_none_or(|stop| index < stop)
    }
}

fn constant_index(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

impl Feature for Slice {
    fn start(&mut self, ctx: &mut FeatureContext<'_>) {
        let start = ctx.argument(0).and_then(constant_index).unwrap_or(0);
        let stop = ctx.argument(1).and_then(constant_index);
        *self = Self::new(start, stop);
    }

    fn event(&mut self, input: Input<'_>, ctx: &mut FeatureContext<'_>) {
        if input.packet().is_some() && self.next() {
            ctx.forward();
        }
    }
}

pub(super) fn register(catalog: &mut Catalog) -> Result<(), CatalogError> {
    use FeatureKind::{Constant, FlowFeature, PacketFeature, RawPacket, Selection};

    catalog.register(
        FeatureMaker::new("forward", Selection, [RawPacket])
            .with_factory(|_| Box::new(Direction { forward: true })),
    )?;
    catalog.register(
        FeatureMaker::new("backward", Selection, [RawPacket])
            .with_factory(|_| Box::new(Direction { forward: false })),
    )?;
    catalog.register(
        FeatureMaker::new("select", Selection, [PacketFeature])
            .with_implicit_input()
            .with_factory(|_| Box::new(Predicate::default())),
    )?;
    catalog.register(
        FeatureMaker::new("select_slice", Selection, [Constant])
            .with_implicit_input()
            .with_factory(|_| Box::new(Slice::default())),
    )?;
    catalog.register(
        FeatureMaker::new("select_slice", Selection, [Constant, Constant])
            .with_implicit_input()
            .with_factory(|_| Box::new(Slice::default())),
    )?;

    catalog.register(FeatureMaker::new("apply", FlowFeature, [FlowFeature, Selection]))?;
    catalog.register(FeatureMaker::new("map", PacketFeature, [PacketFeature, Selection]))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected(mut slice: Slice, packets: u64) -> Vec<u64> {
        (0..packets).filter(|_| slice.next()).collect()
    }

    #[test]
    fn slice_selects_half_open_range() {
        assert_eq!(selected(Slice::new(1, Some(3)), 5), vec![1, 2]);
    }

    #[test]
    fn slice_without_stop_is_unbounded() {
        assert_eq!(selected(Slice::new(2, None), 5), vec![2, 3, 4]);
        assert_eq!(selected(Slice::new(2, Some(-1)), 5), vec![2, 3, 4]);
    }

    #[test]
    fn negative_start_is_clamped() {
        assert_eq!(selected(Slice::new(-4, Some(2)), 5), vec![0, 1]);
    }

    #[test]
    fn empty_range_selects_nothing() {
        assert!(selected(Slice::new(3, Some(3)), 5).is_empty());
        assert!(selected(Slice::new(4, Some(1)), 5).is_empty());
    }
}
