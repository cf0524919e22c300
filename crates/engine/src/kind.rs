//! 피처 종류 -- 반환 종류와 인자 종류
//!
//! 카탈로그 항목은 자신이 반환하는 종류와 각 인자가 요구하는 종류를 선언합니다.
//! 오버로드 해석은 이 종류들을 비교하여 후보를 고릅니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 표현식 노드의 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    /// 상수 값
    Constant,
    /// 패킷마다 값을 내는 피처
    PacketFeature,
    /// 플로우 단위로 값을 내는 피처
    FlowFeature,
    /// 원시 입력의 부분집합을 골라내는 선택
    Selection,
    /// 원시 패킷 입력 (인자 전용)
    RawPacket,
    /// 원시 플로우 입력 (인자 전용)
    RawFlow,
    /// 플로우를 종료/익스포트/재시작시키는 컨트롤 피처
    Control,
    /// 호출 문맥에서 종류를 받는 항목
    MatchType,
    /// 가변 인자 표시 (마지막 인자 종류를 반복)
    Ellipsis,
}

impl FeatureKind {
    /// 원시 입력 종류 여부
    pub fn is_raw(self) -> bool {
        matches!(self, Self::RawPacket | Self::RawFlow)
    }

    /// 상수 노드가 이 종류의 인자로 쓰일 수 있는지 여부
    pub fn accepts_constant(self) -> bool {
        matches!(
            self,
            Self::Constant | Self::PacketFeature | Self::FlowFeature
        )
    }

    /// 카탈로그 항목의 반환 종류로 쓸 수 있는지 여부
    pub fn is_return_kind(self) -> bool {
        matches!(
            self,
            Self::PacketFeature
                | Self::FlowFeature
                | Self::Selection
                | Self::Control
                | Self::MatchType
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Constant => "Constant",
            Self::PacketFeature => "PacketFeature",
            Self::FlowFeature => "FlowFeature",
            Self::Selection => "Selection",
            Self::RawPacket => "RawPacket",
            Self::RawFlow => "RawFlow",
            Self::Control => "Control",
            Self::MatchType => "MatchType",
            Self::Ellipsis => "...",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
