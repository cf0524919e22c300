//! 플로우 레코드 런타임
//!
//! [`Record`]는 플로우 하나에 대해 프로그램의 레지스터마다 피처 인스턴스를 하나씩
//! 갖고, 패킷 이벤트를 받아 피처를 구동합니다. 레코드는 소유한 워커 하나에서만
//! 사용되므로 내부 잠금이 없습니다.
//!
//! # 상태
//! ```text
//! inactive --event--> active --stop/export--> inactive --event--> active ...
//!                        \--Record::stop--> terminal
//! ```
//!
//! # 이벤트 처리 순서
//! 1. 필터 (처음 사용 시 시작). 하나라도 거부하면 `Filtered`
//! 2. 비활성 상태면 모든 피처 시작
//! 3. 컨트롤 피처 실행. 즉시 종료 신호가 있으면 익스포트 후 `Stopped`
//! 4. 원시 입력을 직접 받는 레지스터에 이벤트 전달, 모든 레지스터의 `finish_event`
//! 5. 지연된 익스포트/재시작 처리
//! 6. `last` 갱신

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, trace, warn};

use flowprobe_core::metrics as m;
use flowprobe_core::packet::Packet;
use flowprobe_core::pipeline::Exporter;
use flowprobe_core::types::{FlowEndReason, Timestamp, Value};

use crate::feature::{Emission, Feature, FeatureContext, Filter, Input, Signals, Source};
use crate::program::{Program, Register};

/// 이벤트 하나의 처리 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// 필터가 거부함
    Filtered,
    /// 피처에 전달됨
    Processed,
    /// 컨트롤 피처가 종료시킴 (또는 이미 종료된 레코드)
    Stopped,
    /// 이벤트 처리 후 익스포트됨
    Exported,
}

/// 레코드 생성기
///
/// 컴파일된 프로그램과 익스포터 목록을 보관하며 플로우마다 [`Record`]를 만듭니다.
pub struct RecordMaker {
    program: Arc<Program>,
    exporters: Arc<[Arc<dyn Exporter>]>,
}

impl RecordMaker {
    pub fn new(program: Arc<Program>, exporters: Vec<Arc<dyn Exporter>>) -> Self {
        Self {
            program,
            exporters: Arc::from(exporters),
        }
    }

    /// 모든 익스포터에 필드 이름 목록을 알립니다.
    pub fn exporter_fields(&self) {
        for exporter in self.exporters.iter() {
            debug!(exporter = exporter.name(), fields = self.program.fields().len(), "announcing fields");
            exporter.fields(self.program.fields());
        }
    }

    /// 새 레코드를 만듭니다.
    pub fn make(&self) -> Record {
        counter!(m::RECORD_CREATED_TOTAL).increment(1);
        let program = Arc::clone(&self.program);
        let features = program
            .nodes()
            .iter()
            .map(|node| node.factory.as_ref().map(|factory| factory(node.kind)))
            .collect();
        let values = program.nodes().iter().map(|node| node.constant.clone()).collect();
        let filters = program.filters().iter().map(|entry| (entry.factory)()).collect();
        Record {
            exporters: Arc::clone(&self.exporters),
            features,
            values,
            filters,
            filters_alive: false,
            active: false,
            alive: true,
            last: 0,
            program,
        }
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }
}

/// 플로우 하나의 피처 상태
pub struct Record {
    program: Arc<Program>,
    exporters: Arc<[Arc<dyn Exporter>]>,
    features: Vec<Option<Box<dyn Feature>>>,
    values: Vec<Option<Value>>,
    filters: Vec<Box<dyn Filter>>,
    filters_alive: bool,
    active: bool,
    alive: bool,
    last: Timestamp,
}

impl Record {
    /// 패킷 이벤트 하나를 처리합니다.
    pub fn event(&mut self, packet: &dyn Packet) -> EventOutcome {
        if !self.alive {
            return EventOutcome::Stopped;
        }
        let now = packet.timestamp();

        if !self.filters.is_empty() {
            if !self.filters_alive {
                for filter in &mut self.filters {
                    filter.start();
                }
                self.filters_alive = true;
            }
            if !self.filters.iter_mut().all(|filter| filter.matches(packet)) {
                trace!(now, "event vetoed by filter");
                counter!(m::RECORD_EVENTS_FILTERED_TOTAL).increment(1);
                return EventOutcome::Filtered;
            }
        }

        let program = Arc::clone(&self.program);
        if !self.active {
            self.start(&program, now);
        }

        let mut signals = Signals::default();
        for &control in program.controls() {
            let input = Input::Packet {
                packet,
                source: Source::Flow,
            };
            self.dispatch(&program, control, input, Some(packet), now, &mut signals);
            if signals.stop.is_some() {
                break;
            }
        }

        if let Some(reason) = signals.stop {
            debug!(%reason, now, "control feature stopped record");
            counter!(m::RECORD_CONTROL_STOPS_TOTAL, m::LABEL_REASON => reason.to_string())
                .increment(1);
            self.finish(&program, reason, now);
            self.last = now;
            return EventOutcome::Stopped;
        }

        for &register in program.events() {
            let input = Input::Packet {
                packet,
                source: Source::Flow,
            };
            self.dispatch(&program, register, input, Some(packet), now, &mut signals);
        }
        for feature in self.features.iter_mut().flatten() {
            feature.finish_event();
        }

        // 전달 중의 종료 신호는 재시작 없는 익스포트로 처리
        let (deferred, restart) = match signals.stop {
            Some(reason) => (Some((reason, now)), false),
            None => (signals.export, signals.restart),
        };
        let outcome = match deferred {
            Some((reason, when)) => {
                self.finish(&program, reason, when);
                if restart {
                    self.start(&program, now);
                }
                EventOutcome::Exported
            }
            None => {
                if restart {
                    self.start(&program, now);
                }
                EventOutcome::Processed
            }
        };
        self.last = now;
        outcome
    }

    /// 외부 요인(타임아웃, 캡처 종료 등)으로 레코드를 종료합니다.
    ///
    /// 활성 상태면 피처를 종료하고 익스포트합니다. 이후 이벤트는 무시됩니다.
    pub fn stop(&mut self, reason: FlowEndReason, now: Timestamp) {
        if !self.alive {
            return;
        }
        if self.active {
            let program = Arc::clone(&self.program);
            self.finish(&program, reason, now);
        }
        if self.filters_alive {
            for filter in &mut self.filters {
                filter.stop();
            }
            self.filters_alive = false;
        }
        self.alive = false;
    }

    /// 피처가 시작된 상태인지 여부
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// 아직 이벤트를 받을 수 있는지 여부
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// 버려도 되는지 여부
    ///
    /// 익스포트할 데이터가 없고 필터 상태도 살아 있지 않아야 합니다. 필터 상태는
    /// 데이터 재시작과 무관하게 [`Record::stop`]까지 유지됩니다.
    pub fn is_reclaimable(&self) -> bool {
        !self.active && !self.filters_alive
    }

    /// 마지막으로 처리한 이벤트의 시각
    pub fn last(&self) -> Timestamp {
        self.last
    }

    /// 레지스터의 현재 값
    pub fn value(&self, register: Register) -> Option<&Value> {
        self.values.get(register)?.as_ref()
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    fn start(&mut self, program: &Program, now: Timestamp) {
        for (value, node) in self.values.iter_mut().zip(program.nodes()) {
            if node.constant.is_none() {
                *value = None;
            }
        }
        let mut signals = Signals::default();
        for register in 0..self.features.len() {
            let Some(feature) = self.features[register].as_mut() else {
                continue;
            };
            let mut ctx = FeatureContext::new(
                register,
                &program.node(register).args,
                &self.values,
                now,
                self.last,
                &mut signals,
            );
            feature.start(&mut ctx);
            if let Emission::Value(value) = ctx.into_emission() {
                self.values[register] = value;
            }
        }
        self.active = true;
    }

    /// 모든 피처를 종료하고 익스포트한 뒤 비활성 상태로 만듭니다.
    fn finish(&mut self, program: &Program, reason: FlowEndReason, when: Timestamp) {
        let mut signals = Signals::default();
        for register in 0..self.features.len() {
            let emission = {
                let Some(feature) = self.features[register].as_mut() else {
                    continue;
                };
                let mut ctx = FeatureContext::new(
                    register,
                    &program.node(register).args,
                    &self.values,
                    when,
                    self.last,
                    &mut signals,
                );
                feature.stop(reason, &mut ctx);
                ctx.into_emission()
            };
            self.emit(program, register, emission, None, when, &mut signals);
        }
        self.export(program, reason, when);
        self.active = false;
    }

    fn export(&self, program: &Program, reason: FlowEndReason, when: Timestamp) {
        let features = &self.features;
        let variant = |register: Register| {
            features
                .get(register)
                .and_then(|f| f.as_ref())
                .map_or(0, |f| f.variant())
        };
        let Some(template) = program.template().select(variant) else {
            warn!(%reason, "no export template for runtime variant combination, record dropped");
            return;
        };

        let values: Vec<Option<Value>> = program
            .exports()
            .iter()
            .map(|&r| self.values[r].clone())
            .collect();
        counter!(m::RECORD_EXPORTS_TOTAL, m::LABEL_REASON => reason.to_string()).increment(1);
        for exporter in self.exporters.iter() {
            if let Err(e) = exporter.export(template, &values, when) {
                warn!(exporter = exporter.name(), error = %e, "export failed");
                counter!(
                    m::RECORD_EXPORT_FAILURES_TOTAL,
                    m::LABEL_EXPORTER => exporter.name().to_owned()
                )
                .increment(1);
            }
        }
    }

    fn dispatch(
        &mut self,
        program: &Program,
        register: Register,
        input: Input<'_>,
        packet: Option<&dyn Packet>,
        now: Timestamp,
        signals: &mut Signals,
    ) {
        let emission = {
            let Some(feature) = self.features[register].as_mut() else {
                return;
            };
            let mut ctx = FeatureContext::new(
                register,
                &program.node(register).args,
                &self.values,
                now,
                self.last,
                signals,
            );
            feature.event(input, &mut ctx);
            ctx.into_emission()
        };
        self.emit(program, register, emission, packet, now, signals);
    }

    /// 피처 호출이 남긴 방출을 저장하고 의존 레지스터로 깊이 우선 전파합니다.
    fn emit(
        &mut self,
        program: &Program,
        register: Register,
        emission: Emission,
        packet: Option<&dyn Packet>,
        now: Timestamp,
        signals: &mut Signals,
    ) {
        match emission {
            Emission::None => {}
            Emission::Value(value) => {
                self.values[register] = value;
                let Some(value) = self.values[register].clone() else {
                    return;
                };
                for &dependent in program.dependents(register) {
                    let input = Input::Value {
                        value: &value,
                        source: register,
                    };
                    self.dispatch(program, dependent, input, packet, now, signals);
                }
            }
            Emission::Forward => {
                let Some(packet) = packet else {
                    return;
                };
                for &dependent in program.dependents(register) {
                    let input = Input::Packet {
                        packet,
                        source: Source::Register(register),
                    };
                    self.dispatch(program, dependent, input, Some(packet), now, signals);
                }
            }
        }
    }
}
