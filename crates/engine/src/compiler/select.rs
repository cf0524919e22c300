//! ExpandSelect 패스 -- 선택 피처에 암묵 원시 입력 추가
//!
//! `implicit_input`으로 표시된 항목(예: `select`, `select_slice`)은 명시 인자 뒤에
//! 원시 패킷 입력을 하나 더 받습니다. 런타임에서 선택 피처는 인자 값으로 판정하고
//! 이 입력의 패킷을 전달합니다.

use crate::ast::Ast;
use crate::catalog::Catalog;
use crate::kind::FeatureKind;

pub(crate) fn run(ast: &mut Ast, catalog: &Catalog) {
    for root in ast.roots.clone() {
        for id in ast.post_order(root) {
            let node = ast.get(id);
            let position = node.position;
            let Some(maker) = node.maker else {
                continue;
            };
            if !catalog.maker(maker).implicit_input {
                continue;
            }
            let raw = ast.raw(position);
            ast.get_mut(raw).return_kind = Some(FeatureKind::RawPacket);
            ast.push_arg(id, raw);
        }
    }
}
