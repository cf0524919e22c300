//! 피처 런타임 인터페이스
//!
//! 레코드마다 레지스터 하나에 [`Feature`] 인스턴스 하나가 만들어집니다.
//! 레코드는 Start → Event* → Stop 순서로 피처를 호출하며, 재시작 시 같은
//! 인스턴스에 다시 `start`를 호출하므로 피처는 `start`에서 상태를 초기화해야 합니다.
//!
//! 피처는 [`FeatureContext`]를 통해서만 값을 내보내고 컨트롤 신호를 보냅니다.
//! 값의 전파는 호출이 반환된 직후 레코드가 수행합니다.

use std::sync::Arc;

use flowprobe_core::packet::Packet;
use flowprobe_core::types::{FlowEndReason, Timestamp, Value};

use crate::kind::FeatureKind;
use crate::program::{Arg, Register};

/// 이벤트의 출처
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// 플로우에서 직접 전달된 원시 이벤트
    Flow,
    /// 다른 레지스터가 내보낸 값 또는 전달(forward)한 패킷
    Register(Register),
}

/// 피처로 전달되는 이벤트
#[derive(Clone, Copy)]
pub enum Input<'a> {
    /// 원시 패킷 (플로우 또는 선택 레지스터로부터)
    Packet {
        packet: &'a dyn Packet,
        source: Source,
    },
    /// 인자 레지스터가 내보낸 값
    Value { value: &'a Value, source: Register },
}

impl<'a> Input<'a> {
    /// 이벤트의 출처
    pub fn source(&self) -> Source {
        match self {
            Self::Packet { source, .. } => *source,
            Self::Value { source, .. } => Source::Register(*source),
        }
    }

    /// 패킷 이벤트면 패킷을 반환합니다.
    pub fn packet(&self) -> Option<&'a dyn Packet> {
        match self {
            Self::Packet { packet, .. } => Some(*packet),
            Self::Value { .. } => None,
        }
    }

    /// 값 이벤트면 값을 반환합니다.
    pub fn value(&self) -> Option<&'a Value> {
        match self {
            Self::Value { value, .. } => Some(*value),
            Self::Packet { .. } => None,
        }
    }
}

/// 레지스터 하나의 런타임 피처
pub trait Feature: Send {
    /// 플로우 구간 시작 (최초 이벤트 또는 재시작)
    fn start(&mut self, _ctx: &mut FeatureContext<'_>) {}

    /// 이벤트 처리
    fn event(&mut self, input: Input<'_>, ctx: &mut FeatureContext<'_>);

    /// 원시 이벤트 하나의 처리가 끝난 뒤 호출됩니다.
    fn finish_event(&mut self) {}

    /// 플로우 구간 종료. 집계 피처는 보통 여기서 최종 값을 내보냅니다.
    fn stop(&mut self, _reason: FlowEndReason, _ctx: &mut FeatureContext<'_>) {}

    /// 런타임에 선택된 변형 인덱스 (변형 피처만 의미 있음)
    fn variant(&self) -> usize {
        0
    }
}

/// 패킷 필터
///
/// 필터는 처음 사용될 때 시작되고 플로우 재시작과 무관하게 유지됩니다.
pub trait Filter: Send {
    /// 필터 시작
    fn start(&mut self) {}

    /// 패킷을 통과시키면 `true`, 거부하면 `false`
    fn matches(&mut self, packet: &dyn Packet) -> bool;

    /// 필터 종료
    fn stop(&mut self) {}
}

/// 피처 인스턴스 생성 함수. 노드의 반환 종류를 받습니다.
pub type FeatureFactory = Arc<dyn Fn(FeatureKind) -> Box<dyn Feature> + Send + Sync>;

/// 필터 인스턴스 생성 함수
pub type FilterFactory = Arc<dyn Fn() -> Box<dyn Filter> + Send + Sync>;

/// 이벤트 하나 동안 컨트롤 피처가 설정하는 신호
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Signals {
    /// 즉시 종료 (처음 설정된 사유 유지)
    pub stop: Option<FlowEndReason>,
    /// 이벤트 처리 후 익스포트 (사유, 스냅샷 시각)
    pub export: Option<(FlowEndReason, Timestamp)>,
    /// 이벤트 처리 후 재시작
    pub restart: bool,
}

/// 피처 호출 결과로 관찰된 방출
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Emission {
    None,
    Value(Option<Value>),
    Forward,
}

/// 피처 호출 하나의 실행 문맥
pub struct FeatureContext<'a> {
    register: Register,
    args: &'a [Arg],
    values: &'a [Option<Value>],
    now: Timestamp,
    last: Timestamp,
    emission: Emission,
    signals: &'a mut Signals,
}

impl<'a> FeatureContext<'a> {
    pub(crate) fn new(
        register: Register,
        args: &'a [Arg],
        values: &'a [Option<Value>],
        now: Timestamp,
        last: Timestamp,
        signals: &'a mut Signals,
    ) -> Self {
        Self {
            register,
            args,
            values,
            now,
            last,
            emission: Emission::None,
            signals,
        }
    }

    pub(crate) fn into_emission(self) -> Emission {
        self.emission
    }

    /// 현재 레지스터 번호
    pub fn register(&self) -> Register {
        self.register
    }

    /// 자신의 값을 설정합니다. `Some`이면 의존 레지스터에 전파됩니다.
    ///
    /// 전파는 피처 호출이 반환된 뒤 한 번 일어납니다. 한 호출 안에서 여러 번
    /// 부르면 마지막 값만 저장되고 전파되며, [`forward`](Self::forward)와도
    /// 마지막 호출이 이깁니다.
    pub fn set_value(&mut self, value: Option<Value>) {
        self.emission = Emission::Value(value);
    }

    /// 현재 패킷을 의존 레지스터로 전달합니다 (선택 피처 전용).
    pub fn forward(&mut self) {
        self.emission = Emission::Forward;
    }

    /// 인자 개수 (원시 입력 포함)
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// `index`번째 인자 레지스터의 현재 값. 원시 입력 인자는 `None`.
    pub fn argument(&self, index: usize) -> Option<&Value> {
        match self.args.get(index)? {
            Arg::Register(r) => self.values.get(*r)?.as_ref(),
            Arg::Raw => None,
        }
    }

    /// `source`가 연결된 인자 위치들
    pub fn positions(&self, source: Source) -> impl Iterator<Item = usize> + '_ {
        self.args
            .iter()
            .enumerate()
            .filter(move |(_, arg)| match (source, arg) {
                (Source::Flow, Arg::Raw) => true,
                (Source::Register(s), Arg::Register(r)) => s == *r,
                _ => false,
            })
            .map(|(i, _)| i)
    }

    /// 현재 시각 (이벤트 시각 또는 종료 시각)
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// 직전 이벤트의 시각
    pub fn last(&self) -> Timestamp {
        self.last
    }

    /// 플로우를 즉시 종료하고 익스포트합니다. 이번 이벤트는 전달되지 않습니다.
    pub fn stop(&mut self, reason: FlowEndReason) {
        self.signals.stop.get_or_insert(reason);
    }

    /// 이벤트 처리가 끝난 뒤 `when` 시각으로 익스포트합니다.
    pub fn export(&mut self, reason: FlowEndReason, when: Timestamp) {
        self.signals.export = Some((reason, when));
    }

    /// 이벤트 처리가 끝난 뒤 피처를 다시 시작합니다.
    pub fn restart(&mut self) {
        self.signals.restart = true;
    }
}
