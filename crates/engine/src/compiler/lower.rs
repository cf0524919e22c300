//! Lower 패스 -- 팩토리 없는 재작성 항목 제거
//!
//! `apply(F, S)`와 `map(F, S)`는 런타임 인스턴스를 만들지 않습니다. 대신 `F` 안의
//! 모든 원시 입력 자리를 `S`의 복사본으로 바꾸고 호출 자체를 `F`로 대체합니다.
//!
//! ```text
//! apply(octetTotalCount(raw), forward(raw))
//!   => octetTotalCount(forward(raw))
//! ```
//!
//! 호출이 익스포트 대상이었다면 익스포트 정보는 `F`로 옮겨집니다.

use crate::ast::{Ast, NodeId, NodeKind};
use crate::catalog::Catalog;

pub(crate) fn run(ast: &mut Ast, catalog: &Catalog) {
    for i in 0..ast.roots.len() {
        let root = ast.roots[i];
        ast.roots[i] = lower(ast, catalog, root);
    }
}

fn lower(ast: &mut Ast, catalog: &Catalog, id: NodeId) -> NodeId {
    let args = ast.get(id).args().to_vec();
    for (i, arg) in args.into_iter().enumerate() {
        let lowered = lower(ast, catalog, arg);
        if lowered != arg {
            ast.set_arg(id, i, lowered);
        }
    }

    let Some(maker) = ast.get(id).maker else {
        return id;
    };
    if catalog.maker(maker).factory.is_some() {
        return id;
    }
    let &[feature, selection] = ast.get(id).args() else {
        return id;
    };

    substitute(ast, feature, selection);
    if let Some(export) = ast.get_mut(id).export.take() {
        ast.get_mut(feature).export = Some(export);
    }
    feature
}

/// `id` 아래의 원시 입력 인자를 모두 `selection`의 복사본으로 바꿉니다.
fn substitute(ast: &mut Ast, id: NodeId, selection: NodeId) {
    let args = ast.get(id).args().to_vec();
    for (i, arg) in args.into_iter().enumerate() {
        if ast.get(arg).kind == NodeKind::Raw {
            let copy = ast.deep_clone(selection);
            ast.set_arg(id, i, copy);
        } else {
            substitute(ast, arg, selection);
        }
    }
}
