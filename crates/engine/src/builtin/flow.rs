//! 플로우 피처 -- 구간 전체를 집계하여 종료 시 값 하나를 내보냄

use std::net::IpAddr;

use flowprobe_core::packet::Packet;
use flowprobe_core::types::{FieldType, FlowEndReason, InformationElement, Timestamp, Value};

use crate::catalog::{Catalog, FeatureMaker};
use crate::error::CatalogError;
use crate::feature::{Feature, FeatureContext, Input};
use crate::kind::FeatureKind;

use super::packet::{destination_address_variants, family, source_address_variants};

#[derive(Default)]
struct OctetCount {
    total: u64,
}

impl Feature for OctetCount {
    fn start(&mut self, _ctx: &mut FeatureContext<'_>) {
        self.total = 0;
    }

    fn event(&mut self, input: Input<'_>, _ctx: &mut FeatureContext<'_>) {
        if let Some(length) = input.packet().and_then(|p| p.ip_total_length()) {
            self.total = self.total.saturating_add(length.into());
        }
    }

    fn stop(&mut self, _reason: FlowEndReason, ctx: &mut FeatureContext<'_>) {
        ctx.set_value(Some(Value::Unsigned(self.total)));
    }
}

#[derive(Default)]
struct PacketCount {
    count: u64,
}

impl Feature for PacketCount {
    fn start(&mut self, _ctx: &mut FeatureContext<'_>) {
        self.count = 0;
    }

    fn event(&mut self, input: Input<'_>, _ctx: &mut FeatureContext<'_>) {
        if input.packet().is_some() {
            self.count += 1;
        }
    }

    fn stop(&mut self, _reason: FlowEndReason, ctx: &mut FeatureContext<'_>) {
        ctx.set_value(Some(Value::Unsigned(self.count)));
    }
}

/// 구간의 첫 패킷과 마지막 패킷 시각
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timing {
    Start,
    End,
    DurationMillis,
}

struct FlowTime {
    timing: Timing,
    first: Option<Timestamp>,
    last: Timestamp,
}

impl FlowTime {
    fn new(timing: Timing) -> Self {
        Self {
            timing,
            first: None,
            last: 0,
        }
    }
}

impl Feature for FlowTime {
    fn start(&mut self, _ctx: &mut FeatureContext<'_>) {
        self.first = None;
        self.last = 0;
    }

    fn event(&mut self, input: Input<'_>, _ctx: &mut FeatureContext<'_>) {
        if let Some(packet) = input.packet() {
            let ts = packet.timestamp();
            self.first.get_or_insert(ts);
            self.last = ts;
        }
    }

    fn stop(&mut self, _reason: FlowEndReason, ctx: &mut FeatureContext<'_>) {
        let Some(first) = self.first else {
            ctx.set_value(None);
            return;
        };
        let value = match self.timing {
            Timing::Start => Value::Signed(first),
            Timing::End => Value::Signed(self.last),
            Timing::DurationMillis => {
                Value::Unsigned(u64::try_from(self.last.saturating_sub(first) / 1_000_000).unwrap_or(0))
            }
        };
        ctx.set_value(Some(value));
    }
}

struct EndReason;

impl Feature for EndReason {
    fn event(&mut self, _input: Input<'_>, _ctx: &mut FeatureContext<'_>) {}

    fn stop(&mut self, reason: FlowEndReason, ctx: &mut FeatureContext<'_>) {
        ctx.set_value(Some(Value::Unsigned(reason.code().into())));
    }
}

/// 구간에서 처음 본 주소
struct FirstAddress {
    extract: fn(&dyn Packet) -> Option<IpAddr>,
    first: Option<IpAddr>,
}

impl FirstAddress {
    fn new(extract: fn(&dyn Packet) -> Option<IpAddr>) -> Self {
        Self {
            extract,
            first: None,
        }
    }
}

impl Feature for FirstAddress {
    fn start(&mut self, _ctx: &mut FeatureContext<'_>) {
        self.first = None;
    }

    fn event(&mut self, input: Input<'_>, _ctx: &mut FeatureContext<'_>) {
        if self.first.is_none() {
            self.first = input.packet().and_then(self.extract);
        }
    }

    fn stop(&mut self, _reason: FlowEndReason, ctx: &mut FeatureContext<'_>) {
        ctx.set_value(self.first.map(Value::Address));
    }

    fn variant(&self) -> usize {
        self.first.map_or(0, family)
    }
}

#[derive(Default)]
struct FirstProtocol {
    protocol: Option<u8>,
}

impl Feature for FirstProtocol {
    fn start(&mut self, _ctx: &mut FeatureContext<'_>) {
        self.protocol = None;
    }

    fn event(&mut self, input: Input<'_>, _ctx: &mut FeatureContext<'_>) {
        if self.protocol.is_none() {
            self.protocol = input.packet().and_then(|p| p.protocol());
        }
    }

    fn stop(&mut self, _reason: FlowEndReason, ctx: &mut FeatureContext<'_>) {
        ctx.set_value(self.protocol.map(|p| Value::Unsigned(p.into())));
    }
}

fn flow(name: &str) -> FeatureMaker {
    FeatureMaker::new(name, FeatureKind::FlowFeature, [FeatureKind::RawFlow])
}

pub(super) fn register(catalog: &mut Catalog) -> Result<(), CatalogError> {
    catalog.register(
        flow("octetTotalCount")
            .with_ie(InformationElement::iana("octetTotalCount", 85, FieldType::Unsigned64))
            .with_factory(|_| Box::new(OctetCount::default())),
    )?;
    catalog.register(
        flow("packetTotalCount")
            .with_ie(InformationElement::iana("packetTotalCount", 86, FieldType::Unsigned64))
            .with_factory(|_| Box::new(PacketCount::default())),
    )?;
    catalog.register(
        flow("flowStartNanoseconds")
            .with_ie(InformationElement::iana(
                "flowStartNanoseconds",
                156,
                FieldType::DateTimeNanoseconds,
            ))
            .with_factory(|_| Box::new(FlowTime::new(Timing::Start))),
    )?;
    catalog.register(
        flow("flowEndNanoseconds")
            .with_ie(InformationElement::iana(
                "flowEndNanoseconds",
                157,
                FieldType::DateTimeNanoseconds,
            ))
            .with_factory(|_| Box::new(FlowTime::new(Timing::End))),
    )?;
    catalog.register(
        flow("flowDurationMilliseconds")
            .with_ie(InformationElement::iana(
                "flowDurationMilliseconds",
                161,
                FieldType::Unsigned64,
            ))
            .with_factory(|_| Box::new(FlowTime::new(Timing::DurationMillis))),
    )?;
    catalog.register(
        flow("flowEndReason")
            .with_ie(InformationElement::iana("flowEndReason", 136, FieldType::Unsigned8))
            .with_factory(|_| Box::new(EndReason)),
    )?;
    catalog.register(
        flow("sourceIPAddress")
            .with_variants(source_address_variants())
            .with_factory(|_| Box::new(FirstAddress::new(|p| p.source_address()))),
    )?;
    catalog.register(
        flow("destinationIPAddress")
            .with_variants(destination_address_variants())
            .with_factory(|_| Box::new(FirstAddress::new(|p| p.destination_address()))),
    )?;
    catalog.register(
        flow("protocolIdentifier")
            .with_ie(InformationElement::iana("protocolIdentifier", 4, FieldType::Unsigned8))
            .with_factory(|_| Box::new(FirstProtocol::default())),
    )?;
    Ok(())
}
