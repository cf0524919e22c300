//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 컴파일러, 레코드 런타임, 익스포터가 공유하는 데이터 구조를 정의합니다.
//! 필드 타입 이름과 플로우 종료 사유 코드는 IPFIX(RFC 7011/7012)를 따릅니다.

use std::cmp::Ordering;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// 나노초 단위 Unix 타임스탬프
pub type Timestamp = i64;

/// IPFIX 추상 데이터 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    Unsigned8,
    Unsigned16,
    Unsigned32,
    Unsigned64,
    Signed8,
    Signed16,
    Signed32,
    Signed64,
    Float32,
    Float64,
    Boolean,
    MacAddress,
    OctetArray,
    String,
    DateTimeSeconds,
    DateTimeMilliseconds,
    DateTimeMicroseconds,
    DateTimeNanoseconds,
    Ipv4Address,
    Ipv6Address,
}

impl FieldType {
    /// 부호 없는 정수 타입 여부
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Self::Unsigned8 | Self::Unsigned16 | Self::Unsigned32 | Self::Unsigned64
        )
    }

    /// 부호 있는 정수 타입 여부 (시각 타입은 부호 있는 정수로 취급)
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Self::Signed8
                | Self::Signed16
                | Self::Signed32
                | Self::Signed64
                | Self::DateTimeSeconds
                | Self::DateTimeMilliseconds
                | Self::DateTimeMicroseconds
                | Self::DateTimeNanoseconds
        )
    }

    /// 부동소수점 타입 여부
    pub fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// 산술 연산이 가능한 타입 여부
    pub fn is_numeric(self) -> bool {
        self.is_unsigned() || self.is_signed() || self.is_float()
    }

    /// 두 숫자 타입을 공통 타입으로 승격합니다.
    ///
    /// - 한쪽이라도 부동소수점이면 `float64`
    /// - 둘 다 부호 없는 정수면 `unsigned64`
    /// - 그 외 숫자 조합은 `signed64`
    /// - 숫자가 아닌 타입이 섞이면 `None` (호환 불가)
    pub fn upconvert(self, other: FieldType) -> Option<FieldType> {
        if !self.is_numeric() || !other.is_numeric() {
            return None;
        }
        if self.is_float() || other.is_float() {
            return Some(Self::Float64);
        }
        if self.is_unsigned() && other.is_unsigned() {
            return Some(Self::Unsigned64);
        }
        Some(Self::Signed64)
    }

    /// IPFIX 타입 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unsigned8 => "unsigned8",
            Self::Unsigned16 => "unsigned16",
            Self::Unsigned32 => "unsigned32",
            Self::Unsigned64 => "unsigned64",
            Self::Signed8 => "signed8",
            Self::Signed16 => "signed16",
            Self::Signed32 => "signed32",
            Self::Signed64 => "signed64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Boolean => "boolean",
            Self::MacAddress => "macAddress",
            Self::OctetArray => "octetArray",
            Self::String => "string",
            Self::DateTimeSeconds => "dateTimeSeconds",
            Self::DateTimeMilliseconds => "dateTimeMilliseconds",
            Self::DateTimeMicroseconds => "dateTimeMicroseconds",
            Self::DateTimeNanoseconds => "dateTimeNanoseconds",
            Self::Ipv4Address => "ipv4Address",
            Self::Ipv6Address => "ipv6Address",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 익스포트 필드 설명 (IPFIX Information Element)
///
/// IANA 등록 IE는 `id`를 가지며, 파생 피처(예: `mean(ipTotalLength)`)는
/// 이름과 타입만 가집니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InformationElement {
    /// 필드 이름
    pub name: String,
    /// 데이터 타입
    pub field_type: FieldType,
    /// IANA 엘리먼트 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u16>,
    /// 엔터프라이즈 번호 (IANA 등록 필드는 None)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pen: Option<u32>,
}

impl InformationElement {
    /// ID 없는 IE를 생성합니다.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            id: None,
            pen: None,
        }
    }

    /// IANA 등록 IE를 생성합니다.
    pub fn iana(name: impl Into<String>, id: u16, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            id: Some(id),
            pen: None,
        }
    }

    /// 같은 타입에 이름만 바꾼 IE를 반환합니다 (ID는 제거).
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self::new(name, self.field_type)
    }
}

impl fmt::Display for InformationElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{}({}<{}>)", self.name, id, self.field_type),
            None => write!(f, "{}<{}>", self.name, self.field_type),
        }
    }
}

/// 피처 값
///
/// 레지스터 사이를 흐르는 박싱된 값입니다. 각 피처 구현은 경계에서
/// 한 번만 자신의 구체 타입으로 꺼내 사용합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    Address(IpAddr),
    Bytes(Vec<u8>),
    Text(String),
}

impl Value {
    /// 숫자 값 여부
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Signed(_) | Self::Unsigned(_) | Self::Float(_))
    }

    /// `f64`로 변환합니다 (숫자/불리언만).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Signed(v) => Some(*v as f64),
            Self::Unsigned(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// `i64`로 변환합니다. 범위를 벗어나거나 실수면 None.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Signed(v) => Some(*v),
            Self::Unsigned(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// `u64`로 변환합니다. 음수거나 실수면 None.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Unsigned(v) => Some(*v),
            Self::Signed(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// 참/거짓 판정 (0, false, 빈 값은 거짓)
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Signed(v) => *v != 0,
            Self::Unsigned(v) => *v != 0,
            Self::Float(v) => *v != 0.0,
            Self::Address(_) => true,
            Self::Bytes(b) => !b.is_empty(),
            Self::Text(s) => !s.is_empty(),
        }
    }

    /// 값 자체에서 유도되는 기본 필드 타입
    pub fn natural_type(&self) -> FieldType {
        match self {
            Self::Bool(_) => FieldType::Boolean,
            Self::Signed(_) => FieldType::Signed64,
            Self::Unsigned(_) => FieldType::Unsigned64,
            Self::Float(_) => FieldType::Float64,
            Self::Address(IpAddr::V4(_)) => FieldType::Ipv4Address,
            Self::Address(IpAddr::V6(_)) => FieldType::Ipv6Address,
            Self::Bytes(_) => FieldType::OctetArray,
            Self::Text(_) => FieldType::String,
        }
    }

    /// 두 값을 비교합니다.
    ///
    /// 숫자끼리는 타입을 승격하여 비교하고, 같은 종류의 비숫자 값은
    /// 자연 순서로 비교합니다. 비교할 수 없으면 None.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Unsigned(a), Self::Unsigned(b)) => Some(a.cmp(b)),
            (Self::Signed(a), Self::Signed(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Address(a), Self::Address(b)) => Some(a.cmp(b)),
            (Self::Bytes(a), Self::Bytes(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
                    return Some(x.cmp(&y));
                }
                a.as_f64()?.partial_cmp(&b.as_f64()?)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Signed(v) => write!(f, "{v}"),
            Self::Unsigned(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Address(v) => write!(f, "{v}"),
            Self::Bytes(v) => {
                for b in v {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Signed(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Unsigned(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<IpAddr> for Value {
    fn from(v: IpAddr) -> Self {
        Self::Address(v)
    }
}

/// 플로우 종료 사유 (IPFIX `flowEndReason`, IE 136)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowEndReason {
    /// 유휴 타임아웃
    IdleTimeout,
    /// 활성 타임아웃
    ActiveTimeout,
    /// 프로토콜 수준 종료 감지 (TCP FIN/RST 등) 또는 컨트롤 피처 결정
    EndOfFlowDetected,
    /// 캡처 종료 등 강제 종료
    ForcedEnd,
    /// 리소스 부족
    LackOfResources,
}

impl FlowEndReason {
    /// IPFIX 코드 값
    pub fn code(self) -> u8 {
        match self {
            Self::IdleTimeout => 1,
            Self::ActiveTimeout => 2,
            Self::EndOfFlowDetected => 3,
            Self::ForcedEnd => 4,
            Self::LackOfResources => 5,
        }
    }
}

impl fmt::Display for FlowEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdleTimeout => write!(f, "idle_timeout"),
            Self::ActiveTimeout => write!(f, "active_timeout"),
            Self::EndOfFlowDetected => write!(f, "end_of_flow"),
            Self::ForcedEnd => write!(f, "forced_end"),
            Self::LackOfResources => write!(f, "lack_of_resources"),
        }
    }
}

/// 익스포터에 전달되는 확정된 템플릿
///
/// 변형(variant) 레지스터의 런타임 선택이 끝난 뒤의 단일 IE 목록입니다.
/// `id`는 같은 피처 세트 내에서 대안 템플릿마다 고유합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTemplate {
    /// 템플릿 ID (대안 인덱스)
    pub id: usize,
    /// 익스포트 순서의 IE 목록
    pub elements: Arc<[InformationElement]>,
}

impl ExportTemplate {
    /// 필드 이름 목록을 반환합니다.
    pub fn field_names(&self) -> Vec<&str> {
        self.elements.iter().map(|ie| ie.name.as_str()).collect()
    }
}
