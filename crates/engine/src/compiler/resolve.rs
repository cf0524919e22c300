//! Resolve 패스 -- 변형 타입 해석
//!
//! 노드마다 구조적 시그니처를 만들고 출력 타입 트리를 계산합니다.
//! 시그니처는 공통 부분식 제거 후 같은 레지스터가 될 노드끼리 같으므로
//! 변형 원천의 키로 쓰입니다.
//!
//! - 원시 입력: `raw`
//! - 상수: `const:<타입>:<값>`
//! - 호출: `<이름>#<항목 ID>(<인자 시그니처>,...)`

use std::collections::HashMap;
use std::sync::Arc;

use flowprobe_core::types::{FieldType, InformationElement};

use crate::ast::{Ast, NodeId, NodeKind};
use crate::catalog::{Catalog, OutputType};
use crate::error::CompileError;
use crate::variant::{self, TypeTree, VariantError};

/// 노드별 구조적 시그니처
pub(crate) type Signatures = HashMap<NodeId, Arc<str>>;

pub(crate) fn run(
    ast: &mut Ast,
    catalog: &Catalog,
    limit: usize,
) -> Result<Signatures, CompileError> {
    let mut signatures = Signatures::new();

    for root in ast.roots.clone() {
        for id in ast.post_order(root) {
            if signatures.contains_key(&id) {
                continue;
            }
            let signature = signature(ast, &signatures, id);
            signatures.insert(id, signature);
            let ty = resolve(ast, catalog, &signatures, id, limit)?;
            ast.get_mut(id).ty = ty;
        }
    }
    for control in ast.controls.clone() {
        for id in ast.post_order(control) {
            let signature = signature(ast, &signatures, id);
            signatures.insert(id, signature);
        }
    }
    Ok(signatures)
}

fn signature(ast: &Ast, signatures: &Signatures, id: NodeId) -> Arc<str> {
    let node = ast.get(id);
    match &node.kind {
        NodeKind::Raw => Arc::from("raw"),
        NodeKind::Constant(value) => {
            Arc::from(format!("const:{}:{value}", value.natural_type()))
        }
        NodeKind::Call { name, args } => {
            let args: Vec<&str> = args
                .iter()
                .map(|a| signatures.get(a).map_or("?", |s| &**s))
                .collect();
            let maker = node.maker.map_or_else(|| "-".to_owned(), |m| m.to_string());
            Arc::from(format!("{name}#{maker}({})", args.join(",")))
        }
    }
}

fn resolve(
    ast: &Ast,
    catalog: &Catalog,
    signatures: &Signatures,
    id: NodeId,
    limit: usize,
) -> Result<TypeTree, CompileError> {
    let node = ast.get(id);
    let (maker, args) = match &node.kind {
        NodeKind::Raw => return Ok(TypeTree::Untyped),
        NodeKind::Constant(value) => {
            return Ok(TypeTree::Fixed(InformationElement::new(
                value.to_string(),
                value.natural_type(),
            )));
        }
        NodeKind::Call { args, .. } => match node.maker {
            Some(maker) => (catalog.maker(maker), args),
            None => return Ok(TypeTree::Untyped),
        },
    };

    match &maker.output {
        OutputType::Untyped => Ok(TypeTree::Untyped),
        OutputType::Fixed(ie) => Ok(TypeTree::Fixed(ie.clone())),
        OutputType::Variants(ies) => Ok(TypeTree::Variants {
            source: signatures
                .get(&id)
                .cloned()
                .unwrap_or_else(|| Arc::from(maker.name.as_str())),
            branches: ies.iter().cloned().map(TypeTree::Fixed).collect(),
        }),
        OutputType::Resolver(resolver) => {
            let trees: Vec<&TypeTree> = args.iter().map(|a| &ast.get(*a).ty).collect();
            let eval = |leaves: &[&TypeTree]| {
                let types: Vec<FieldType> = leaves
                    .iter()
                    .filter_map(|leaf| match leaf {
                        TypeTree::Fixed(ie) => Some(ie.field_type),
                        _ => None,
                    })
                    .collect();
                match resolver(&types) {
                    Some(ft) => TypeTree::Fixed(InformationElement::new(maker.name.clone(), ft)),
                    None => TypeTree::Dead,
                }
            };
            variant::combine(&trees, limit, eval).map_err(|e| match e {
                VariantError::TooMany { combinations } => CompileError::TooManyVariants {
                    position: node.position,
                    name: ast.render(id),
                    combinations,
                    limit,
                },
                VariantError::AllDead => CompileError::UnresolvableVariant {
                    position: node.position,
                    name: ast.render(id),
                },
            })
        }
    }
}
