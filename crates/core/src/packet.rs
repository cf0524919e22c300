//! 패킷 추상화 -- 레코드 런타임이 소비하는 패킷 인터페이스
//!
//! 디코더(캡처 소스)는 [`Packet`] trait을 구현하여 레코드에 패킷을 전달합니다.
//! 피처 구현은 구체 디코더 타입을 알 필요 없이 이 trait만 사용합니다.
//!
//! [`PacketInfo`]는 이미 디코딩된 필드를 담은 단순 구현체입니다.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// TCP FIN 플래그
pub const TCP_FIN: u16 = 0x01;
/// TCP SYN 플래그
pub const TCP_SYN: u16 = 0x02;
/// TCP RST 플래그
pub const TCP_RST: u16 = 0x04;
/// TCP ACK 플래그
pub const TCP_ACK: u16 = 0x10;

/// IP 프로토콜 번호: TCP
pub const PROTO_TCP: u8 = 6;
/// IP 프로토콜 번호: UDP
pub const PROTO_UDP: u8 = 17;

/// 레코드로 전달되는 단일 패킷
///
/// 해당 계층이 없는 패킷은 관련 메서드에서 `None`을 반환합니다.
pub trait Packet {
    /// 캡처 시각 (나노초)
    fn timestamp(&self) -> Timestamp;

    /// 플로우의 정방향(최초 패킷 방향) 여부
    fn forward(&self) -> bool;

    /// IP 헤더의 전체 길이
    fn ip_total_length(&self) -> Option<u16>;

    /// IP 프로토콜 번호
    fn protocol(&self) -> Option<u8>;

    /// 출발지 IP 주소
    fn source_address(&self) -> Option<IpAddr>;

    /// 목적지 IP 주소
    fn destination_address(&self) -> Option<IpAddr>;

    /// 출발지 전송 계층 포트
    fn source_port(&self) -> Option<u16>;

    /// 목적지 전송 계층 포트
    fn destination_port(&self) -> Option<u16>;

    /// TCP 제어 플래그
    fn tcp_flags(&self) -> Option<u16>;
}

/// 디코딩이 끝난 패킷 정보
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketInfo {
    pub timestamp: Timestamp,
    pub forward: bool,
    pub ip_total_length: Option<u16>,
    pub protocol: Option<u8>,
    pub source_address: Option<IpAddr>,
    pub destination_address: Option<IpAddr>,
    pub source_port: Option<u16>,
    pub destination_port: Option<u16>,
    pub tcp_flags: Option<u16>,
}

impl PacketInfo {
    /// 정방향 패킷 정보를 생성합니다.
    pub fn new(timestamp: Timestamp, ip_total_length: u16) -> Self {
        Self {
            timestamp,
            forward: true,
            ip_total_length: Some(ip_total_length),
            ..Default::default()
        }
    }

    /// 역방향 패킷으로 설정합니다.
    pub fn backward(mut self) -> Self {
        self.forward = false;
        self
    }

    /// IP 주소 쌍을 설정합니다.
    pub fn with_addresses(mut self, source: IpAddr, destination: IpAddr) -> Self {
        self.source_address = Some(source);
        self.destination_address = Some(destination);
        self
    }

    /// TCP 계층 정보를 설정합니다.
    pub fn with_tcp(mut self, source_port: u16, destination_port: u16, flags: u16) -> Self {
        self.protocol = Some(PROTO_TCP);
        self.source_port = Some(source_port);
        self.destination_port = Some(destination_port);
        self.tcp_flags = Some(flags);
        self
    }

    /// UDP 계층 정보를 설정합니다.
    pub fn with_udp(mut self, source_port: u16, destination_port: u16) -> Self {
        self.protocol = Some(PROTO_UDP);
        self.source_port = Some(source_port);
        self.destination_port = Some(destination_port);
        self.tcp_flags = None;
        self
    }
}

impl Packet for PacketInfo {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    fn forward(&self) -> bool {
        self.forward
    }

    fn ip_total_length(&self) -> Option<u16> {
        self.ip_total_length
    }

    fn protocol(&self) -> Option<u8> {
        self.protocol
    }

    fn source_address(&self) -> Option<IpAddr> {
        self.source_address
    }

    fn destination_address(&self) -> Option<IpAddr> {
        self.destination_address
    }

    fn source_port(&self) -> Option<u16> {
        self.source_port
    }

    fn destination_port(&self) -> Option<u16> {
        self.destination_port
    }

    fn tcp_flags(&self) -> Option<u16> {
        self.tcp_flags
    }
}
