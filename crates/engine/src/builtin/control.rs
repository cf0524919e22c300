//! 컨트롤 피처

use flowprobe_core::packet::{TCP_ACK, TCP_FIN, TCP_RST};
use flowprobe_core::types::FlowEndReason;

use crate::catalog::{Catalog, FeatureMaker};
use crate::error::CatalogError;
use crate::feature::{Feature, FeatureContext, Input};
use crate::kind::FeatureKind;

/// TCP 연결 종료 감지 (`_tcpEnd`)
///
/// RST를 받거나, 양방향 FIN 이후 마지막 ACK가 도착하면 이번 패킷까지 포함하여
/// 익스포트합니다.
#[derive(Debug, Default)]
struct TcpEnd {
    fin_forward: bool,
    fin_backward: bool,
}

impl Feature for TcpEnd {
    fn start(&mut self, _ctx: &mut FeatureContext<'_>) {
        *self = Self::default();
    }

    fn event(&mut self, input: Input<'_>, ctx: &mut FeatureContext<'_>) {
        let Some(packet) = input.packet() else {
            return;
        };
        let Some(flags) = packet.tcp_flags() else {
            return;
        };

        let closing = self.fin_forward && self.fin_backward;
        if flags & TCP_FIN != 0 {
            if packet.forward() {
                self.fin_forward = true;
            } else {
                self.fin_backward = true;
            }
        }

        if flags & TCP_RST != 0 || (closing && flags & TCP_ACK != 0) {
            ctx.export(FlowEndReason::EndOfFlowDetected, packet.timestamp());
        }
    }
}

pub(super) fn register(catalog: &mut Catalog) -> Result<(), CatalogError> {
    catalog.register(
        FeatureMaker::new("_tcpEnd", FeatureKind::Control, [FeatureKind::RawPacket])
            .with_factory(|_| Box::new(TcpEnd::default())),
    )?;
    Ok(())
}
