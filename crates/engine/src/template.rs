//! 익스포트 템플릿
//!
//! 변형 레지스터가 없으면 템플릿은 잎 하나입니다. 변형 레지스터가 있으면
//! 레지스터별 런타임 변형 인덱스로 한 단계씩 좁혀 가는 선택 트리가 됩니다.
//!
//! ```text
//! Choice(r2) ─┬─ Choice(r5) ─┬─ Leaf#0 [sourceIPv4Address, destinationIPv4Address]
//!             │              └─ Leaf(None)   (불가능한 조합)
//!             └─ ...
//! ```

use std::sync::Arc;

use flowprobe_core::types::{ExportTemplate, InformationElement};

use crate::error::CompileError;
use crate::program::Register;
use crate::variant::TypeTree;

/// 익스포트 템플릿 트리
#[derive(Debug, Clone, PartialEq)]
pub enum Template {
    /// 확정된 템플릿. `None`은 불가능한 변형 조합.
    Leaf(Option<ExportTemplate>),
    /// `register`의 변형 인덱스로 대안을 고름
    Choice {
        register: Register,
        alternatives: Vec<Template>,
    },
}

/// 템플릿에 들어갈 익스포트 하나
pub(crate) struct ExportSlot<'a> {
    /// 익스포트 이름
    pub name: &'a str,
    /// 노드 자신의 피처 이름
    pub feature: &'a str,
    /// 컴포지트가 선언한 IE
    pub declared: Option<&'a InformationElement>,
    pub ty: &'a TypeTree,
    pub position: usize,
}

impl Template {
    /// 변형 인덱스를 따라 템플릿을 고릅니다.
    ///
    /// 불가능한 조합이거나 인덱스가 범위를 벗어나면 `None`.
    pub fn select(&self, variant: impl Fn(Register) -> usize) -> Option<&ExportTemplate> {
        let mut node = self;
        loop {
            match node {
                Self::Leaf(leaf) => return leaf.as_ref(),
                Self::Choice {
                    register,
                    alternatives,
                } => node = alternatives.get(variant(*register))?,
            }
        }
    }

    /// 가능한 모든 템플릿 (ID 순서)
    pub fn alternatives(&self) -> Vec<&ExportTemplate> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a ExportTemplate>) {
        match self {
            Self::Leaf(Some(template)) => out.push(template),
            Self::Leaf(None) => {}
            Self::Choice { alternatives, .. } => {
                for alt in alternatives {
                    alt.collect_leaves(out);
                }
            }
        }
    }

    /// 선택 트리에 쓰인 레지스터 (처음 등장한 순서)
    pub fn registers(&self) -> Vec<Register> {
        let mut out = Vec::new();
        self.collect_registers(&mut out);
        out
    }

    fn collect_registers(&self, out: &mut Vec<Register>) {
        if let Self::Choice {
            register,
            alternatives,
        } = self
        {
            if !out.contains(register) {
                out.push(*register);
            }
            for alt in alternatives {
                alt.collect_registers(out);
            }
        }
    }

    fn collapse(self) -> Self {
        match self {
            Self::Choice {
                register,
                alternatives,
            } => {
                let alternatives: Vec<Template> =
                    alternatives.into_iter().map(Self::collapse).collect();
                if alternatives.windows(2).all(|w| w[0] == w[1]) {
                    alternatives.into_iter().next().unwrap_or(Self::Leaf(None))
                } else {
                    Self::Choice {
                        register,
                        alternatives,
                    }
                }
            }
            leaf => leaf,
        }
    }

    fn number(&mut self, next: &mut usize) {
        match self {
            Self::Leaf(Some(template)) => {
                template.id = *next;
                *next += 1;
            }
            Self::Leaf(None) => {}
            Self::Choice { alternatives, .. } => {
                for alt in alternatives {
                    alt.number(next);
                }
            }
        }
    }
}

/// 익스포트 목록과 타입으로 템플릿을 만듭니다.
///
/// `register_of`는 변형 원천 시그니처를 레지스터로 바꿉니다.
pub(crate) fn build(
    slots: &[ExportSlot<'_>],
    register_of: impl Fn(&str) -> Register,
    limit: usize,
) -> Result<Template, CompileError> {
    let mut sources: Vec<(Arc<str>, usize)> = Vec::new();
    for slot in slots {
        slot.ty.collect_sources(&mut sources);
        let combinations = sources
            .iter()
            .try_fold(1usize, |acc, (_, n)| acc.checked_mul(*n))
            .unwrap_or(usize::MAX);
        if combinations > limit {
            return Err(CompileError::TooManyVariants {
                position: slot.position,
                name: slot.name.to_owned(),
                combinations,
                limit,
            });
        }
    }

    let registers: Vec<Register> = sources.iter().map(|(s, _)| register_of(s)).collect();
    let mut assignment = Vec::with_capacity(sources.len());
    let mut template = enumerate(slots, &sources, &registers, &mut assignment).collapse();
    template.number(&mut 0);
    Ok(template)
}

fn enumerate(
    slots: &[ExportSlot<'_>],
    sources: &[(Arc<str>, usize)],
    registers: &[Register],
    assignment: &mut Vec<usize>,
) -> Template {
    let depth = assignment.len();
    if depth == sources.len() {
        let choice = |source: &str| {
            sources
                .iter()
                .position(|(s, _)| &**s == source)
                .map_or(usize::MAX, |i| assignment[i])
        };
        let elements: Option<Vec<InformationElement>> = slots
            .iter()
            .map(|slot| leaf_element(slot, slot.ty.select(&choice)))
            .collect();
        return Template::Leaf(elements.map(|elements| ExportTemplate {
            id: 0,
            elements: Arc::from(elements),
        }));
    }

    let count = sources[depth].1;
    let mut alternatives = Vec::with_capacity(count);
    for branch in 0..count {
        assignment.push(branch);
        alternatives.push(enumerate(slots, sources, registers, assignment));
        assignment.pop();
    }
    Template::Choice {
        register: registers[depth],
        alternatives,
    }
}

/// 잎 타입 하나를 IE로 바꿉니다.
///
/// 컴포지트가 선언한 IE가 우선합니다. 익스포트 이름이 피처 이름과 같으면
/// 카탈로그 IE를 그대로 쓰고, 아니면 익스포트 이름과 잎 타입으로 새 IE를 만듭니다.
fn leaf_element(slot: &ExportSlot<'_>, leaf: &TypeTree) -> Option<InformationElement> {
    let TypeTree::Fixed(ie) = leaf else {
        return None;
    };
    if let Some(declared) = slot.declared {
        return Some(declared.clone());
    }
    if slot.name == slot.feature {
        Some(ie.clone())
    } else {
        Some(ie.renamed(slot.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowprobe_core::types::FieldType;

    fn address(source: &str, v4: &str, v6: &str) -> TypeTree {
        TypeTree::Variants {
            source: Arc::from(source),
            branches: vec![
                TypeTree::Fixed(InformationElement::iana(v4, 8, FieldType::Ipv4Address)),
                TypeTree::Fixed(InformationElement::iana(v6, 27, FieldType::Ipv6Address)),
            ],
        }
    }

    fn slot<'a>(name: &'a str, ty: &'a TypeTree) -> ExportSlot<'a> {
        ExportSlot {
            name,
            feature: name,
            declared: None,
            ty,
            position: 1,
        }
    }

    #[test]
    fn fixed_exports_form_single_leaf() {
        let count = TypeTree::Fixed(InformationElement::iana(
            "packetTotalCount",
            86,
            FieldType::Unsigned64,
        ));
        let template = build(&[slot("packetTotalCount", &count)], |_| 0, 16).unwrap();
        let leaf = template.select(|_| 0).unwrap();
        assert_eq!(leaf.id, 0);
        assert_eq!(leaf.field_names(), vec!["packetTotalCount"]);
        assert_eq!(leaf.elements[0].id, Some(86));
        assert!(template.registers().is_empty());
    }

    #[test]
    fn variant_export_selects_by_register() {
        let src = address("src", "sourceIPv4Address", "sourceIPv6Address");
        let template = build(&[slot("sourceIPAddress", &src)], |_| 4, 16).unwrap();

        assert_eq!(template.registers(), vec![4]);
        let v6 = template.select(|r| if r == 4 { 1 } else { 0 }).unwrap();
        assert_eq!(v6.field_names(), vec!["sourceIPv6Address"]);
        assert_eq!(v6.id, 1);
        assert!(template.select(|_| 7).is_none());
        assert_eq!(template.alternatives().len(), 2);
    }

    #[test]
    fn derived_export_is_renamed() {
        let src = address("src", "sourceIPv4Address", "sourceIPv6Address");
        let mut s = slot("first(sourceIPAddress)", &src);
        s.feature = "first";
        let template = build(&[s], |_| 0, 16).unwrap();
        let leaf = template.select(|_| 0).unwrap();
        assert_eq!(leaf.elements[0].name, "first(sourceIPAddress)");
        assert_eq!(leaf.elements[0].field_type, FieldType::Ipv4Address);
        assert_eq!(leaf.elements[0].id, None);
    }

    #[test]
    fn declared_ie_wins() {
        let ty = TypeTree::Fixed(InformationElement::new("min", FieldType::Unsigned16));
        let declared = InformationElement::iana("minimumIpTotalLength", 25, FieldType::Unsigned64);
        let mut s = slot("minimumIpTotalLength", &ty);
        s.feature = "min";
        s.declared = Some(&declared);
        let template = build(&[s], |_| 0, 16).unwrap();
        assert_eq!(template.select(|_| 0).unwrap().elements[0], declared);
    }

    #[test]
    fn dead_combination_is_empty_leaf() {
        let ty = TypeTree::Variants {
            source: Arc::from("src"),
            branches: vec![
                TypeTree::Fixed(InformationElement::new("x", FieldType::Unsigned8)),
                TypeTree::Dead,
            ],
        };
        let template = build(&[slot("x", &ty)], |_| 2, 16).unwrap();
        assert!(template.select(|_| 0).is_some());
        assert!(template.select(|_| 1).is_none());
    }

    #[test]
    fn template_limit_reports_overflowing_export() {
        let src = address("src", "a", "b");
        let dst = address("dst", "c", "d");
        let mut second = slot("destinationIPAddress", &dst);
        second.position = 2;
        let err = build(&[slot("sourceIPAddress", &src), second], |_| 0, 3).unwrap_err();
        assert!(matches!(
            err,
            CompileError::TooManyVariants {
                position: 2,
                combinations: 4,
                ..
            }
        ));
    }
}
