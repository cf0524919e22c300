//! 패킷 필터

use flowprobe_core::packet::{PROTO_TCP, PROTO_UDP, Packet};

use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::feature::Filter;

/// IP 프로토콜 번호 필터
struct Protocol(u8);

impl Filter for Protocol {
    fn matches(&mut self, packet: &dyn Packet) -> bool {
        packet.protocol() == Some(self.0)
    }
}

/// 주소 체계 필터
struct Family {
    v6: bool,
}

impl Filter for Family {
    fn matches(&mut self, packet: &dyn Packet) -> bool {
        packet.source_address().is_some_and(|a| a.is_ipv6() == self.v6)
    }
}

pub(super) fn register(catalog: &mut Catalog) -> Result<(), CatalogError> {
    catalog.register_filter("tcp", || Box::new(Protocol(PROTO_TCP)))?;
    catalog.register_filter("udp", || Box::new(Protocol(PROTO_UDP)))?;
    catalog.register_filter("ipv4", || Box::new(Family { v6: false }))?;
    catalog.register_filter("ipv6", || Box::new(Family { v6: true }))?;
    Ok(())
}
