//! 패킷 피처 -- 패킷마다 값 하나를 내보냄

use std::net::IpAddr;

use flowprobe_core::packet::Packet;
use flowprobe_core::types::{FieldType, InformationElement, Value};

use crate::catalog::{Catalog, FeatureMaker};
use crate::error::CatalogError;
use crate::feature::{Feature, FeatureContext, Input};
use crate::kind::FeatureKind;

/// 패킷에서 값 하나를 꺼내는 피처
struct Field {
    extract: fn(&dyn Packet) -> Option<Value>,
}

impl Feature for Field {
    fn event(&mut self, input: Input<'_>, ctx: &mut FeatureContext<'_>) {
        if let Some(packet) = input.packet() {
            ctx.set_value((self.extract)(packet));
        }
    }
}

/// 주소 피처. 마지막 패킷의 주소 체계가 변형 인덱스가 됩니다 (0: IPv4, 1: IPv6).
pub(super) struct Address {
    extract: fn(&dyn Packet) -> Option<IpAddr>,
    variant: usize,
}

impl Address {
    pub(super) fn new(extract: fn(&dyn Packet) -> Option<IpAddr>) -> Self {
        Self { extract, variant: 0 }
    }
}

impl Feature for Address {
    fn start(&mut self, _ctx: &mut FeatureContext<'_>) {
        self.variant = 0;
    }

    fn event(&mut self, input: Input<'_>, ctx: &mut FeatureContext<'_>) {
        let Some(packet) = input.packet() else {
            return;
        };
        let address = (self.extract)(packet);
        if let Some(address) = address {
            self.variant = family(address);
        }
        ctx.set_value(address.map(Value::Address));
    }

    fn variant(&self) -> usize {
        self.variant
    }
}

pub(super) fn family(address: IpAddr) -> usize {
    match address {
        IpAddr::V4(_) => 0,
        IpAddr::V6(_) => 1,
    }
}

pub(super) fn source_address_variants() -> [InformationElement; 2] {
    [
        InformationElement::iana("sourceIPv4Address", 8, FieldType::Ipv4Address),
        InformationElement::iana("sourceIPv6Address", 27, FieldType::Ipv6Address),
    ]
}

pub(super) fn destination_address_variants() -> [InformationElement; 2] {
    [
        InformationElement::iana("destinationIPv4Address", 12, FieldType::Ipv4Address),
        InformationElement::iana("destinationIPv6Address", 28, FieldType::Ipv6Address),
    ]
}

fn field(
    name: &str,
    id: u16,
    field_type: FieldType,
    extract: fn(&dyn Packet) -> Option<Value>,
) -> FeatureMaker {
    FeatureMaker::new(name, FeatureKind::PacketFeature, [FeatureKind::RawPacket])
        .with_ie(InformationElement::iana(name, id, field_type))
        .with_factory(move |_| Box::new(Field { extract }))
}

pub(super) fn register(catalog: &mut Catalog) -> Result<(), CatalogError> {
    catalog.register(field("ipTotalLength", 224, FieldType::Unsigned16, |p| {
        p.ip_total_length().map(|v| Value::Unsigned(v.into()))
    }))?;
    catalog.register(field("octetTotalCount", 85, FieldType::Unsigned64, |p| {
        p.ip_total_length().map(|v| Value::Unsigned(v.into()))
    }))?;
    catalog.register(field("sourceTransportPort", 7, FieldType::Unsigned16, |p| {
        p.source_port().map(|v| Value::Unsigned(v.into()))
    }))?;
    catalog.register(field("destinationTransportPort", 11, FieldType::Unsigned16, |p| {
        p.destination_port().map(|v| Value::Unsigned(v.into()))
    }))?;
    catalog.register(field("protocolIdentifier", 4, FieldType::Unsigned8, |p| {
        p.protocol().map(|v| Value::Unsigned(v.into()))
    }))?;
    catalog.register(field("tcpControlBits", 6, FieldType::Unsigned16, |p| {
        p.tcp_flags().map(|v| Value::Unsigned(v.into()))
    }))?;
    catalog.register(field("flowDirection", 61, FieldType::Unsigned8, |p| {
        Some(Value::Unsigned(if p.forward() { 0 } else { 1 }))
    }))?;

    catalog.register(
        FeatureMaker::new(
            "sourceIPAddress",
            FeatureKind::PacketFeature,
            [FeatureKind::RawPacket],
        )
        .with_variants(source_address_variants())
        .with_factory(|_| Box::new(Address::new(|p| p.source_address()))),
    )?;
    catalog.register(
        FeatureMaker::new(
            "destinationIPAddress",
            FeatureKind::PacketFeature,
            [FeatureKind::RawPacket],
        )
        .with_variants(destination_address_variants())
        .with_factory(|_| Box::new(Address::new(|p| p.destination_address()))),
    )?;
    Ok(())
}
