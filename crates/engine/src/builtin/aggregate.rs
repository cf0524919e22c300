//! 집계 피처 -- 패킷 피처 값을 모아 구간 종료 시 내보냄

use std::cmp::Ordering;

use flowprobe_core::types::{FieldType, FlowEndReason, Value};

use crate::catalog::{Catalog, FeatureMaker};
use crate::error::CatalogError;
use crate::feature::{Feature, FeatureContext, Input};
use crate::kind::FeatureKind;

use super::math::arithmetic;
use super::same_as_argument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Min,
    Max,
    First,
    Last,
    Sum,
}

/// 값 하나를 유지하는 집계 (min, max, first, last, sum)
struct Running {
    kind: Kind,
    current: Option<Value>,
}

impl Running {
    fn new(kind: Kind) -> Self {
        Self {
            kind,
            current: None,
        }
    }

    fn update(&self, current: &Value, value: &Value) -> Option<Value> {
        match self.kind {
            Kind::Min => (value.compare(current) == Some(Ordering::Less)).then(|| value.clone()),
            Kind::Max => {
                (value.compare(current) == Some(Ordering::Greater)).then(|| value.clone())
            }
            Kind::First => None,
            Kind::Last => Some(value.clone()),
            Kind::Sum => arithmetic(current, value, i128::checked_add, |a, b| a + b),
        }
    }
}

impl Feature for Running {
    fn start(&mut self, _ctx: &mut FeatureContext<'_>) {
        self.current = None;
    }

    fn event(&mut self, input: Input<'_>, _ctx: &mut FeatureContext<'_>) {
        let Some(value) = input.value() else {
            return;
        };
        let next = match &self.current {
            None => Some(value.clone()),
            Some(current) => self.update(current, value),
        };
        if next.is_some() {
            self.current = next;
        }
    }

    fn stop(&mut self, _reason: FlowEndReason, ctx: &mut FeatureContext<'_>) {
        ctx.set_value(self.current.take());
    }
}

#[derive(Default)]
struct Mean {
    sum: f64,
    count: u64,
}

impl Feature for Mean {
    fn start(&mut self, _ctx: &mut FeatureContext<'_>) {
        self.sum = 0.0;
        self.count = 0;
    }

    fn event(&mut self, input: Input<'_>, _ctx: &mut FeatureContext<'_>) {
        if let Some(v) = input.value().and_then(Value::as_f64) {
            self.sum += v;
            self.count += 1;
        }
    }

    fn stop(&mut self, _reason: FlowEndReason, ctx: &mut FeatureContext<'_>) {
        if self.count == 0 {
            ctx.set_value(None);
        } else {
            ctx.set_value(Some(Value::Float(self.sum / self.count as f64)));
        }
    }
}

#[derive(Default)]
struct Count {
    count: u64,
}

impl Feature for Count {
    fn start(&mut self, _ctx: &mut FeatureContext<'_>) {
        self.count = 0;
    }

    fn event(&mut self, input: Input<'_>, _ctx: &mut FeatureContext<'_>) {
        if input.value().is_some() {
            self.count += 1;
        }
    }

    fn stop(&mut self, _reason: FlowEndReason, ctx: &mut FeatureContext<'_>) {
        ctx.set_value(Some(Value::Unsigned(self.count)));
    }
}

fn summed(types: &[FieldType]) -> Option<FieldType> {
    let t = types.first()?;
    t.upconvert(*t)
}

fn averaged(types: &[FieldType]) -> Option<FieldType> {
    types
        .first()
        .filter(|t| t.is_numeric())
        .map(|_| FieldType::Float64)
}

fn aggregate(name: &str) -> FeatureMaker {
    FeatureMaker::new(name, FeatureKind::FlowFeature, [FeatureKind::PacketFeature])
}

pub(super) fn register(catalog: &mut Catalog) -> Result<(), CatalogError> {
    for (name, kind) in [
        ("min", Kind::Min),
        ("max", Kind::Max),
        ("first", Kind::First),
        ("last", Kind::Last),
    ] {
        catalog.register(
            aggregate(name)
                .with_resolver(same_as_argument)
                .with_factory(move |_| Box::new(Running::new(kind))),
        )?;
    }
    catalog.register(
        aggregate("sum")
            .with_resolver(summed)
            .with_factory(|_| Box::new(Running::new(Kind::Sum))),
    )?;
    catalog.register(
        aggregate("mean")
            .with_resolver(averaged)
            .with_factory(|_| Box::new(Mean::default())),
    )?;
    catalog.register(
        aggregate("count")
            .with_type(FieldType::Unsigned64)
            .with_factory(|_| Box::new(Count::default())),
    )?;
    Ok(())
}
