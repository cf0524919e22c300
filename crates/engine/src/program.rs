//! 컴파일된 프로그램 -- 레지스터 단위의 평면 데이터 흐름
//!
//! [`Program`]은 컴파일 이후 읽기 전용이며 `Arc`로 여러 워커가 공유합니다.
//! 레지스터 번호는 인자 우선(후위) 순서로 할당되므로 인자 레지스터는 항상
//! 자신을 사용하는 레지스터보다 작습니다.

use std::fmt;

use flowprobe_core::types::Value;

use crate::feature::{FeatureFactory, FilterFactory};
use crate::kind::FeatureKind;
use crate::template::Template;
use crate::variant::TypeTree;

/// 레지스터 번호
pub type Register = usize;

/// 레지스터 인자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arg {
    /// 원시 입력 (레지스터 없음)
    Raw,
    /// 다른 레지스터의 값
    Register(Register),
}

/// 레지스터 하나
#[derive(Clone)]
pub struct ProgramNode {
    /// 피처 이름
    pub name: String,
    /// 사람이 읽는 시그니처 (예: `mean(ipTotalLength)`)
    pub signature: String,
    /// 중복 제거 키
    pub key: String,
    /// 반환 종류
    pub kind: FeatureKind,
    /// 인자
    pub args: Vec<Arg>,
    /// 상수 레지스터의 값
    pub constant: Option<Value>,
    /// 런타임 인스턴스 생성 함수 (상수는 없음)
    pub factory: Option<FeatureFactory>,
    /// 컨트롤 피처 여부
    pub control: bool,
    /// 익스포트 이름
    pub export: Option<String>,
    /// 해석된 타입
    pub ty: TypeTree,
    /// 처음 등장한 최상위 위치
    pub position: usize,
}

impl ProgramNode {
    /// 원시 입력을 직접 받는지 여부
    pub fn consumes_raw(&self) -> bool {
        self.args.contains(&Arg::Raw)
    }
}

impl fmt::Debug for ProgramNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramNode")
            .field("signature", &self.signature)
            .field("kind", &self.kind)
            .field("args", &self.args)
            .field("constant", &self.constant)
            .field("control", &self.control)
            .field("export", &self.export)
            .field("ty", &self.ty)
            .finish()
    }
}

/// 필터 항목
#[derive(Clone)]
pub struct FilterEntry {
    pub name: String,
    pub factory: FilterFactory,
}

impl fmt::Debug for FilterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterEntry")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// 컴파일된 피처 프로그램
#[derive(Debug, Clone)]
pub struct Program {
    pub(crate) nodes: Vec<ProgramNode>,
    pub(crate) controls: Vec<Register>,
    pub(crate) events: Vec<Register>,
    pub(crate) exports: Vec<Register>,
    pub(crate) variants: Vec<Register>,
    pub(crate) arguments: Vec<Vec<Register>>,
    pub(crate) dependents: Vec<Vec<Register>>,
    pub(crate) template: Template,
    pub(crate) fields: Vec<String>,
    pub(crate) filters: Vec<FilterEntry>,
}

impl Program {
    /// 레지스터(런타임 피처 인스턴스) 수
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 레지스터 순서의 노드 목록
    pub fn nodes(&self) -> &[ProgramNode] {
        &self.nodes
    }

    /// 레지스터 하나를 조회합니다.
    pub fn node(&self, register: Register) -> &ProgramNode {
        &self.nodes[register]
    }

    /// 컨트롤 피처 레지스터
    pub fn controls(&self) -> &[Register] {
        &self.controls
    }

    /// 패킷마다 직접 구동되는 (컨트롤이 아닌) 레지스터: 원시 입력을 받거나 인자가 모두 상수인 패킷 피처
    pub fn events(&self) -> &[Register] {
        &self.events
    }

    /// 익스포트 레지스터 (최상위 목록 순서)
    pub fn exports(&self) -> &[Register] {
        &self.exports
    }

    /// 템플릿 선택에 쓰이는 변형 레지스터
    pub fn variants(&self) -> &[Register] {
        &self.variants
    }

    /// 레지스터의 명시적 인자 레지스터 (상수 포함, 인자 순서)
    pub fn arguments(&self, register: Register) -> &[Register] {
        &self.arguments[register]
    }

    /// 레지스터가 값을 내보낼 때 알림을 받을 레지스터
    pub fn dependents(&self, register: Register) -> &[Register] {
        &self.dependents[register]
    }

    /// 익스포트 템플릿
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// 익스포트 필드 이름 (익스포트 순서)
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// 필터 (등록 순서)
    pub fn filters(&self) -> &[FilterEntry] {
        &self.filters
    }

    /// 익스포트 이름으로 레지스터를 찾습니다.
    pub fn export_register(&self, name: &str) -> Option<Register> {
        self.exports
            .iter()
            .copied()
            .find(|&r| self.nodes[r].export.as_deref() == Some(name))
    }
}
