//! 변형 타입 해석
//!
//! 하나의 노드가 고정된 타입 하나를 갖지 못할 때(예: IPv4/IPv6 주소), 그 타입은
//! 변형 원천(variant source)을 키로 하는 트리로 표현됩니다. 원천은 변형을 만든
//! 노드의 구조적 시그니처이며, 같은 시그니처의 노드는 공통 부분식 제거 후 같은
//! 레지스터가 되므로 같은 런타임 선택을 공유합니다.
//!
//! 인자 타입이 변형인 호출은 인자에서 도달 가능한 서로 다른 원천들의 데카르트 곱을
//! 열거하여 조합마다 타입 계산 함수를 한 번씩 호출합니다.

use std::fmt;
use std::sync::Arc;

use flowprobe_core::types::InformationElement;

static DEAD: TypeTree = TypeTree::Dead;

/// 노드의 타입
#[derive(Debug, Clone, PartialEq)]
pub enum TypeTree {
    /// 데이터 타입 없음 (선택, 컨트롤, 원시 입력)
    Untyped,
    /// 가능한 타입 없음 (잘라낼 분기)
    Dead,
    /// 단일 타입
    Fixed(InformationElement),
    /// `source`의 런타임 선택에 따라 갈라지는 분기
    Variants {
        source: Arc<str>,
        branches: Vec<TypeTree>,
    },
}

/// 조합 열거 실패
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum VariantError {
    /// 조합 수가 상한을 초과
    TooMany { combinations: usize },
    /// 모든 조합이 호환되지 않음
    AllDead,
}

impl TypeTree {
    /// 모든 잎이 `Dead`인지 여부
    pub fn is_dead(&self) -> bool {
        match self {
            Self::Dead => true,
            Self::Variants { branches, .. } => branches.iter().all(Self::is_dead),
            Self::Untyped | Self::Fixed(_) => false,
        }
    }

    /// 변형 분기를 포함하는지 여부
    pub fn is_variant(&self) -> bool {
        matches!(self, Self::Variants { .. })
    }

    /// 트리에 등장하는 원천과 분기 수를 처음 등장한 순서대로 `out`에 추가합니다.
    pub fn collect_sources(&self, out: &mut Vec<(Arc<str>, usize)>) {
        if let Self::Variants { source, branches } = self {
            if !out.iter().any(|(s, _)| s == source) {
                out.push((Arc::clone(source), branches.len()));
            }
            for branch in branches {
                branch.collect_sources(out);
            }
        }
    }

    /// 원천별 선택 인덱스로 잎을 고릅니다. 범위를 벗어난 선택은 `Dead`.
    pub fn select(&self, choice: &dyn Fn(&str) -> usize) -> &TypeTree {
        match self {
            Self::Variants { source, branches } => match branches.get(choice(source)) {
                Some(branch) => branch.select(choice),
                None => &DEAD,
            },
            leaf => leaf,
        }
    }

    /// 모든 분기가 같은 `Variants` 노드를 그 분기로 대체합니다.
    fn collapse(self) -> Self {
        match self {
            Self::Variants { source, branches } => {
                let branches: Vec<TypeTree> = branches.into_iter().map(Self::collapse).collect();
                if branches.windows(2).all(|w| w[0] == w[1]) {
                    branches.into_iter().next().unwrap_or(Self::Dead)
                } else {
                    Self::Variants { source, branches }
                }
            }
            leaf => leaf,
        }
    }
}

impl fmt::Display for TypeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Untyped => write!(f, "-"),
            Self::Dead => write!(f, "!"),
            Self::Fixed(ie) => write!(f, "{}", ie.field_type),
            Self::Variants { branches, .. } => {
                write!(f, "[")?;
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{branch}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// 인자 타입 트리들로부터 호출의 타입 트리를 만듭니다.
///
/// 인자에서 도달 가능한 원천들의 모든 조합에 대해 `eval`을 호출합니다.
/// `eval`은 조합마다 고정된 인자 잎들을 받습니다.
pub(crate) fn combine(
    args: &[&TypeTree],
    limit: usize,
    eval: impl Fn(&[&TypeTree]) -> TypeTree,
) -> Result<TypeTree, VariantError> {
    let mut sources = Vec::new();
    for arg in args {
        arg.collect_sources(&mut sources);
    }

    let combinations = sources
        .iter()
        .try_fold(1usize, |acc, (_, n)| acc.checked_mul(*n))
        .unwrap_or(usize::MAX);
    if combinations > limit {
        return Err(VariantError::TooMany { combinations });
    }

    let mut assignment = Vec::with_capacity(sources.len());
    let tree = enumerate(args, &sources, &mut assignment, &eval).collapse();
    if tree.is_dead() {
        return Err(VariantError::AllDead);
    }
    Ok(tree)
}

fn enumerate(
    args: &[&TypeTree],
    sources: &[(Arc<str>, usize)],
    assignment: &mut Vec<usize>,
    eval: &dyn Fn(&[&TypeTree]) -> TypeTree,
) -> TypeTree {
    let depth = assignment.len();
    if depth == sources.len() {
        let choice = |source: &str| {
            sources
                .iter()
                .position(|(s, _)| &**s == source)
                .map_or(usize::MAX, |i| assignment[i])
        };
        let leaves: Vec<&TypeTree> = args.iter().map(|arg| arg.select(&choice)).collect();
        if leaves.iter().any(|leaf| matches!(leaf, TypeTree::Dead)) {
            return TypeTree::Dead;
        }
        return eval(&leaves);
    }

    let (source, count) = &sources[depth];
    let mut branches = Vec::with_capacity(*count);
    for branch in 0..*count {
        assignment.push(branch);
        branches.push(enumerate(args, sources, assignment, eval));
        assignment.pop();
    }
    TypeTree::Variants {
        source: Arc::clone(source),
        branches,
    }
}
