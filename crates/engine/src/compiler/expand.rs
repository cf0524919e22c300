//! Expand 패스 -- 컴포지트 확장과 익스포트 이름 지정
//!
//! 컴포지트 호출은 정의 표현식으로 치환되며, 치환 결과에 다시 컴포지트가 있으면
//! 재귀적으로 확장합니다. 최상위 항목은 확장이 끝난 뒤 익스포트 이름을 받습니다.
//! 최상위가 컴포지트였다면 그 이름(별칭)과 선언된 IE를 씁니다.

use crate::ast::{Ast, ExportName, NodeId, NodeKind};
use crate::catalog::Catalog;
use crate::error::CompileError;

use super::construct;

/// 컴포지트 중첩 확장 상한
const MAX_EXPANSION_DEPTH: usize = 64;

pub(crate) fn run(ast: &mut Ast, catalog: &Catalog) -> Result<(), CompileError> {
    for i in 0..ast.roots.len() {
        let root = ast.roots[i];
        let alias = match &ast.get(root).kind {
            NodeKind::Call { name, .. } => catalog.composite(name).cloned(),
            _ => None,
        };

        let expanded = expand(ast, catalog, root, 0)?;
        let export = match alias {
            Some(composite) => ExportName {
                name: composite.name,
                ie: composite.ie,
            },
            None => ExportName {
                name: ast.render(expanded),
                ie: None,
            },
        };
        ast.get_mut(expanded).export = Some(export);
        ast.roots[i] = expanded;
    }
    Ok(())
}

fn expand(
    ast: &mut Ast,
    catalog: &Catalog,
    id: NodeId,
    depth: usize,
) -> Result<NodeId, CompileError> {
    let node = ast.get(id);
    let position = node.position;
    let NodeKind::Call { name, args } = &node.kind else {
        return Ok(id);
    };

    if let Some(composite) = catalog.composite(name) {
        let implicit_only = match args.as_slice() {
            [] => true,
            [only] => ast.get(*only).kind == NodeKind::Raw,
            _ => false,
        };
        if !implicit_only {
            return Err(CompileError::InvalidExpression {
                position,
                name: name.clone(),
                reason: "composite features take no arguments".to_owned(),
            });
        }
        if depth >= MAX_EXPANSION_DEPTH {
            return Err(CompileError::InvalidExpression {
                position,
                name: name.clone(),
                reason: format!("composite expansion nested deeper than {MAX_EXPANSION_DEPTH}"),
            });
        }
        let replacement = construct::from_json(ast, &composite.definition, position)?;
        return expand(ast, catalog, replacement, depth + 1);
    }

    let args = args.clone();
    for (i, arg) in args.into_iter().enumerate() {
        let expanded = expand(ast, catalog, arg, depth)?;
        if expanded != arg {
            ast.set_arg(id, i, expanded);
        }
    }
    Ok(id)
}
