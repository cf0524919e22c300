//! 표현식 트리 -- 아레나 인덱스 기반 노드 저장소
//!
//! 모든 노드는 [`Ast`]의 벡터에 저장되고 [`NodeId`]로 참조됩니다.
//! 패스가 노드를 교체할 때는 부모의 인자 목록에서 인덱스만 바꿉니다.

use std::fmt;

use flowprobe_core::types::{InformationElement, Value};

use crate::catalog::MakerId;
use crate::kind::FeatureKind;
use crate::variant::TypeTree;

/// 아레나 내 노드 식별자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// 노드 형태
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// 피처 호출
    Call { name: String, args: Vec<NodeId> },
    /// 상수
    Constant(Value),
    /// 원시 입력 자리표시자
    Raw,
}

/// 익스포트 정보
#[derive(Debug, Clone, PartialEq)]
pub struct ExportName {
    /// 익스포트 필드 이름
    pub name: String,
    /// 컴포지트가 선언한 IE
    pub ie: Option<InformationElement>,
}

/// 표현식 노드
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// 속한 최상위 항목의 위치 (1부터 시작)
    pub position: usize,
    /// 컨트롤 목록에서 온 노드인지 여부
    pub control: bool,
    /// 익스포트 대상이면 그 이름
    pub export: Option<ExportName>,
    /// Build 패스가 정한 반환 종류
    pub return_kind: Option<FeatureKind>,
    /// Build 패스가 고른 카탈로그 항목
    pub maker: Option<MakerId>,
    /// Resolve 패스가 계산한 타입
    pub ty: TypeTree,
}

impl Node {
    fn new(kind: NodeKind, position: usize) -> Self {
        Self {
            kind,
            position,
            control: false,
            export: None,
            return_kind: None,
            maker: None,
            ty: TypeTree::Untyped,
        }
    }

    /// 호출 이름. 상수와 원시 입력은 표시용 이름을 돌려줍니다.
    pub fn name(&self) -> String {
        match &self.kind {
            NodeKind::Call { name, .. } => name.clone(),
            NodeKind::Constant(value) => value.to_string(),
            NodeKind::Raw => "<raw>".to_owned(),
        }
    }

    /// 호출 인자. 호출이 아니면 빈 슬라이스.
    pub fn args(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Call { args, .. } => args,
            _ => &[],
        }
    }
}

/// 표현식 트리 아레나
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    /// 최상위 피처 (익스포트 순서)
    pub roots: Vec<NodeId>,
    /// 컨트롤 피처
    pub controls: Vec<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, node: Node) -> NodeId {
        let raw = u32::try_from(self.nodes.len())
            .unwrap_or_else(|_| unreachable!("expression tree exceeds u32::MAX nodes"));
        let id = NodeId::from_raw(raw);
        self.nodes.push(node);
        id
    }

    /// 호출 노드를 추가합니다.
    pub fn call(&mut self, name: impl Into<String>, args: Vec<NodeId>, position: usize) -> NodeId {
        self.push(Node::new(
            NodeKind::Call {
                name: name.into(),
                args,
            },
            position,
        ))
    }

    /// 상수 노드를 추가합니다.
    pub fn constant(&mut self, value: Value, position: usize) -> NodeId {
        self.push(Node::new(NodeKind::Constant(value), position))
    }

    /// 원시 입력 노드를 추가합니다.
    pub fn raw(&mut self, position: usize) -> NodeId {
        self.push(Node::new(NodeKind::Raw, position))
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// 아레나의 전체 노드 수 (도달 불가능한 노드 포함)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 호출 노드의 `index`번째 인자를 교체합니다.
    pub fn set_arg(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if let NodeKind::Call { args, .. } = &mut self.get_mut(parent).kind {
            args[index] = child;
        }
    }

    /// 호출 노드에 인자를 추가합니다.
    pub fn push_arg(&mut self, parent: NodeId, child: NodeId) {
        if let NodeKind::Call { args, .. } = &mut self.get_mut(parent).kind {
            args.push(child);
        }
    }

    /// 서브트리를 깊은 복사합니다. 복사본은 익스포트 정보를 갖지 않습니다.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let mut node = self.get(id).clone();
        node.export = None;
        if let NodeKind::Call { args, .. } = &mut node.kind {
            let originals = std::mem::take(args);
            *args = originals.into_iter().map(|a| self.deep_clone(a)).collect();
        }
        self.push(node)
    }

    /// 서브트리를 후위 순서(인자 먼저)로 나열합니다.
    pub fn post_order(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.post_order_into(root, &mut out);
        out
    }

    fn post_order_into(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for &arg in self.get(id).args() {
            self.post_order_into(arg, out);
        }
        out.push(id);
    }

    /// 사람이 읽는 호출 시그니처를 만듭니다.
    ///
    /// 원시 입력 인자는 생략되므로 `octetTotalCount`처럼 인자가 원시 입력뿐인
    /// 호출은 이름만, 그 외에는 `mean(ipTotalLength)` 형식이 됩니다.
    pub fn render(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.render_into(id, &mut out);
        out
    }

    fn render_into(&self, id: NodeId, out: &mut String) {
        use std::fmt::Write;

        let node = self.get(id);
        match &node.kind {
            NodeKind::Raw => {}
            NodeKind::Constant(value) => {
                let _ = write!(out, "{value}");
            }
            NodeKind::Call { name, args } => {
                out.push_str(name);
                let visible: Vec<NodeId> = args
                    .iter()
                    .copied()
                    .filter(|a| !matches!(self.get(*a).kind, NodeKind::Raw))
                    .collect();
                if !visible.is_empty() {
                    out.push('(');
                    for (i, arg) in visible.into_iter().enumerate() {
                        if i > 0 {
                            out.push(',');
                        }
                        self.render_into(arg, out);
                    }
                    out.push(')');
                }
            }
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}
