//! Build 패스 -- 오버로드 선택
//!
//! 최상위 항목은 `FlowFeature`를 요구받고, 각 호출은 요구 종류와 인자 수로
//! 후보를 찾아 우선순위 순서로 시도합니다. 후보의 인자 종류 중 `MatchType`은
//! 호출에 요구된 종류로 치환됩니다. 인자 하나라도 실패하면 그 후보가 서브트리에
//! 남긴 선택을 모두 지우고 다음 후보로 넘어갑니다.

use crate::ast::{Ast, NodeId, NodeKind};
use crate::catalog::Catalog;
use crate::error::CompileError;
use crate::kind::FeatureKind;

pub(crate) fn run(ast: &mut Ast, catalog: &Catalog) -> Result<(), CompileError> {
    for root in ast.roots.clone() {
        build(ast, catalog, root, FeatureKind::FlowFeature)?;
    }
    for control in ast.controls.clone() {
        build_control(ast, catalog, control)?;
    }
    Ok(())
}

fn build_control(ast: &mut Ast, catalog: &Catalog, id: NodeId) -> Result<(), CompileError> {
    let node = ast.get(id);
    let Some(maker) = catalog.find_control(&node.name()) else {
        return Err(CompileError::UnknownControl {
            position: node.position,
            name: node.name(),
        });
    };
    let raw = node.args().to_vec();
    for arg in raw {
        ast.get_mut(arg).return_kind = Some(FeatureKind::RawPacket);
    }
    let node = ast.get_mut(id);
    node.maker = Some(maker);
    node.return_kind = Some(FeatureKind::Control);
    Ok(())
}

fn build(
    ast: &mut Ast,
    catalog: &Catalog,
    id: NodeId,
    required: FeatureKind,
) -> Result<(), CompileError> {
    let node = ast.get(id);
    let position = node.position;

    let (name, args) = match &node.kind {
        NodeKind::Raw => {
            if !required.is_raw() {
                return Err(CompileError::TypeMismatch {
                    position,
                    name: node.name(),
                    reason: format!("raw input cannot be used as {required}"),
                });
            }
            ast.get_mut(id).return_kind = Some(required);
            return Ok(());
        }
        NodeKind::Constant(value) => {
            if !required.accepts_constant() {
                return Err(CompileError::TypeMismatch {
                    position,
                    name: value.to_string(),
                    reason: format!("constant cannot be used as {required}"),
                });
            }
            ast.get_mut(id).return_kind = Some(FeatureKind::Constant);
            return Ok(());
        }
        NodeKind::Call { name, args } => (name.clone(), args.clone()),
    };

    let candidates = catalog.find(&name, required, args.len());
    if candidates.is_empty() {
        if !catalog.contains(&name) {
            return Err(CompileError::UnknownFeature { position, name });
        }
        return Err(CompileError::TypeMismatch {
            position,
            reason: format!(
                "no overload returns {required} with {} argument(s)",
                args.len()
            ),
            name,
        });
    }

    let mut errors = Vec::new();
    for candidate in candidates {
        let Some(kinds) = catalog.maker(candidate).argument_kinds(args.len()) else {
            continue;
        };
        let attempt = args.iter().zip(kinds).try_for_each(|(&arg, kind)| {
            let kind = if kind == FeatureKind::MatchType { required } else { kind };
            build(ast, catalog, arg, kind)
        });
        match attempt {
            Ok(()) => {
                let node = ast.get_mut(id);
                node.maker = Some(candidate);
                node.return_kind = Some(required);
                return Ok(());
            }
            Err(e) => {
                reset(ast, id);
                errors.push(e);
            }
        }
    }

    Err(aggregate(position, name, errors))
}

/// 실패한 후보가 남긴 선택을 서브트리에서 지웁니다.
fn reset(ast: &mut Ast, id: NodeId) {
    for id in ast.post_order(id) {
        let node = ast.get_mut(id);
        node.maker = None;
        node.return_kind = None;
    }
}

/// 후보별 실패를 하나의 에러로 합칩니다.
///
/// 모든 후보가 같은 이유로 실패했으면 그 에러를 그대로 전달하고,
/// 이유가 여럿이면 `" or "`로 이어 붙인 타입 불일치로 보고합니다.
fn aggregate(position: usize, name: String, errors: Vec<CompileError>) -> CompileError {
    let mut unique: Vec<CompileError> = Vec::with_capacity(errors.len());
    for error in errors {
        if !unique.contains(&error) {
            unique.push(error);
        }
    }
    if unique.len() == 1 {
        if let Some(only) = unique.pop() {
            return only;
        }
    }
    let reasons: Vec<String> = unique.iter().map(CompileError::summary).collect();
    CompileError::TypeMismatch {
        position,
        name,
        reason: reasons.join(" or "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Feature, FeatureContext, Input};
    use crate::catalog::FeatureMaker;
    use crate::spec::FeatureSpec;
    use serde_json::json;

    struct Nop;

    impl Feature for Nop {
        fn event(&mut self, _input: Input<'_>, _ctx: &mut FeatureContext<'_>) {}
    }

    fn maker(name: &str, ret: FeatureKind, args: &[FeatureKind]) -> FeatureMaker {
        FeatureMaker::new(name, ret, args.iter().copied()).with_factory(|_| Box::new(Nop))
    }

    fn catalog() -> Catalog {
        use FeatureKind::*;
        let mut catalog = Catalog::new();
        catalog.register(maker("length", PacketFeature, &[RawPacket])).unwrap();
        catalog.register(maker("count", FlowFeature, &[RawFlow])).unwrap();
        catalog.register(maker("mean", FlowFeature, &[PacketFeature])).unwrap();
        catalog.register(maker("add", MatchType, &[MatchType, MatchType])).unwrap();
        catalog.register(maker("forward", Selection, &[RawPacket])).unwrap();
        catalog.register(maker("_end", Control, &[RawPacket])).unwrap();
        catalog
    }

    fn built(spec: FeatureSpec) -> Result<Ast, CompileError> {
        let catalog = catalog();
        let mut ast = super::super::construct::run(&spec)?;
        run(&mut ast, &catalog)?;
        Ok(ast)
    }

    #[test]
    fn match_type_follows_call_site() {
        let ast = built(FeatureSpec::new([json!(["mean", ["add", "length", 1]])])).unwrap();
        let mean = ast.get(ast.roots[0]);
        let add = ast.get(mean.args()[0]);
        assert_eq!(add.return_kind, Some(FeatureKind::PacketFeature));
        let constant = ast.get(add.args()[1]);
        assert_eq!(constant.return_kind, Some(FeatureKind::Constant));
    }

    #[test]
    fn unknown_identifier_reports_position() {
        let err = built(FeatureSpec::new([json!("count"), json!(["mean", "nope"])])).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownFeature {
                position: 2,
                name: "nope".to_owned(),
            }
        );
    }

    #[test]
    fn packet_feature_at_top_level_is_mismatch() {
        let err = built(FeatureSpec::new([json!("length")])).unwrap_err();
        assert!(matches!(err, CompileError::TypeMismatch { position: 1, .. }));
    }

    #[test]
    fn selection_cannot_be_constant() {
        let err = built(FeatureSpec::new([json!(["add", "count", "forward"])])).unwrap_err();
        assert!(matches!(err, CompileError::TypeMismatch { .. }));
    }

    #[test]
    fn controls_resolve_separately() {
        let ast = built(FeatureSpec::new([json!("count")]).with_control("_end")).unwrap();
        let control = ast.get(ast.controls[0]);
        assert_eq!(control.return_kind, Some(FeatureKind::Control));

        let err = built(FeatureSpec::new([json!("count")]).with_control("count")).unwrap_err();
        assert!(matches!(err, CompileError::UnknownControl { position: 1, .. }));
    }

    #[test]
    fn distinct_failures_are_joined() {
        let errors = vec![
            CompileError::UnknownFeature {
                position: 1,
                name: "a".to_owned(),
            },
            CompileError::TypeMismatch {
                position: 1,
                name: "b".to_owned(),
                reason: "nope".to_owned(),
            },
        ];
        let CompileError::TypeMismatch { reason, .. } = aggregate(1, "f".to_owned(), errors) else {
            panic!("expected a type mismatch");
        };
        assert_eq!(reason, "unknown feature 'a' or b: nope");
    }
}
