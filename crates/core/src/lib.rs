#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod metrics;
pub mod packet;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, FlowprobeError, SpecError};

// 설정
pub use config::FlowprobeConfig;

// 패킷
pub use packet::{Packet, PacketInfo};

// 익스포터 trait
pub use pipeline::Exporter;

// 도메인 타입
pub use types::{ExportTemplate, FieldType, FlowEndReason, InformationElement, Timestamp, Value};
