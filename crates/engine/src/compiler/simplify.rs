//! Simplify 패스 -- 공통 부분식 제거와 레지스터 할당
//!
//! 최상위 항목을 순서대로, 각 항목을 후위 순서로 방문하며 노드마다 키를 만듭니다.
//! 키가 이미 있으면 기존 레지스터를 재사용하고, 없으면 새 레지스터를 할당합니다.
//! 원시 입력은 레지스터를 갖지 않습니다.
//!
//! | 노드 | 키 |
//! |------|-----|
//! | 상수 | `const:<타입>:<값>` |
//! | 컨트롤 | `ctl:<이름>` |
//! | 호출 | `<이름>#<항목 ID>(r<n>|raw,...)` |

use std::collections::HashMap;
use std::sync::Arc;

use flowprobe_core::types::InformationElement;

use crate::ast::{Ast, NodeId, NodeKind};
use crate::catalog::Catalog;
use crate::error::CompileError;
use crate::kind::FeatureKind;
use crate::program::{Arg, Program, ProgramNode, Register};
use crate::template::{self, ExportSlot};

use super::resolve::Signatures;

/// 익스포트 하나의 할당 결과
struct Export {
    register: Register,
    name: String,
    ie: Option<InformationElement>,
    position: usize,
}

#[derive(Default)]
struct Allocator {
    nodes: Vec<ProgramNode>,
    keys: HashMap<String, Register>,
    registers: HashMap<NodeId, Register>,
    by_signature: HashMap<Arc<str>, Register>,
    exports: Vec<Export>,
    controls: Vec<Register>,
}

pub(crate) fn run(
    ast: &Ast,
    signatures: &Signatures,
    catalog: &Catalog,
    limit: usize,
) -> Result<Program, CompileError> {
    let mut alloc = Allocator::default();
    for &root in &ast.roots {
        for id in ast.post_order(root) {
            alloc.visit(ast, signatures, catalog, id)?;
        }
    }
    for &control in &ast.controls {
        for id in ast.post_order(control) {
            alloc.visit(ast, signatures, catalog, id)?;
        }
    }
    alloc.finish(limit)
}

impl Allocator {
    fn visit(
        &mut self,
        ast: &Ast,
        signatures: &Signatures,
        catalog: &Catalog,
        id: NodeId,
    ) -> Result<(), CompileError> {
        let node = ast.get(id);
        if node.kind == NodeKind::Raw {
            return Ok(());
        }

        let args: Vec<Arg> = node
            .args()
            .iter()
            .map(|a| match self.registers.get(a) {
                Some(&r) => Arg::Register(r),
                None => Arg::Raw,
            })
            .collect();

        let key = match &node.kind {
            NodeKind::Constant(value) => format!("const:{}:{value}", value.natural_type()),
            NodeKind::Call { name, .. } if node.control => format!("ctl:{name}"),
            NodeKind::Call { name, .. } => {
                let args: Vec<String> = args
                    .iter()
                    .map(|a| match a {
                        Arg::Raw => "raw".to_owned(),
                        Arg::Register(r) => format!("r{r}"),
                    })
                    .collect();
                let maker = node.maker.map_or_else(|| "-".to_owned(), |m| m.to_string());
                format!("{name}#{maker}({})", args.join(","))
            }
            NodeKind::Raw => return Ok(()),
        };

        let register = match self.keys.get(&key) {
            Some(&existing) => existing,
            None => {
                let register = self.nodes.len();
                let (constant, factory) = match &node.kind {
                    NodeKind::Constant(value) => (Some(value.clone()), None),
                    _ => (
                        None,
                        node.maker.and_then(|m| catalog.maker(m).factory.clone()),
                    ),
                };
                self.nodes.push(ProgramNode {
                    name: node.name(),
                    signature: ast.render(id),
                    key: key.clone(),
                    kind: node.return_kind.unwrap_or(FeatureKind::Constant),
                    args,
                    constant,
                    factory,
                    control: node.control,
                    export: None,
                    ty: node.ty.clone(),
                    position: node.position,
                });
                self.keys.insert(key, register);
                if node.control {
                    self.controls.push(register);
                }
                register
            }
        };
        self.registers.insert(id, register);
        if let Some(signature) = signatures.get(&id) {
            self.by_signature
                .entry(Arc::clone(signature))
                .or_insert(register);
        }

        if let Some(export) = &node.export {
            if self.nodes[register].export.is_some() {
                return Err(CompileError::DuplicateExport {
                    position: node.position,
                    name: export.name.clone(),
                });
            }
            self.nodes[register].export = Some(export.name.clone());
            self.exports.push(Export {
                register,
                name: export.name.clone(),
                ie: export.ie.clone(),
                position: node.position,
            });
        }
        Ok(())
    }

    fn finish(self, limit: usize) -> Result<Program, CompileError> {
        let nodes = self.nodes;
        let count = nodes.len();

        let events: Vec<Register> = (0..count)
            .filter(|&r| {
                !nodes[r].control && (nodes[r].consumes_raw() || packet_clocked(&nodes, r))
            })
            .collect();

        let arguments: Vec<Vec<Register>> = nodes
            .iter()
            .map(|node| {
                node.args
                    .iter()
                    .filter_map(|a| match a {
                        Arg::Register(r) => Some(*r),
                        Arg::Raw => None,
                    })
                    .collect()
            })
            .collect();

        let mut dependents: Vec<Vec<Register>> = vec![Vec::new(); count];
        for (r, args) in arguments.iter().enumerate() {
            for &arg in args {
                if nodes[arg].constant.is_some() {
                    continue;
                }
                if dependents[arg].last() != Some(&r) {
                    dependents[arg].push(r);
                }
            }
        }

        let slots: Vec<ExportSlot<'_>> = self
            .exports
            .iter()
            .map(|export| ExportSlot {
                name: &export.name,
                feature: &nodes[export.register].name,
                declared: export.ie.as_ref(),
                ty: &nodes[export.register].ty,
                position: export.position,
            })
            .collect();
        let by_signature = &self.by_signature;
        let template = template::build(
            &slots,
            |source| by_signature.get(source).copied().unwrap_or(usize::MAX),
            limit,
        )?;

        let variants = template.registers();
        let exports: Vec<Register> = self.exports.iter().map(|e| e.register).collect();
        let fields: Vec<String> = self.exports.iter().map(|e| e.name.clone()).collect();
        drop(slots);

        Ok(Program {
            nodes,
            controls: self.controls,
            events,
            exports,
            variants,
            arguments,
            dependents,
            template,
            fields,
            filters: Vec::new(),
        })
    }
}

/// 인자가 모두 상수인 패킷 피처는 값을 받을 곳이 없으므로 패킷마다 직접 구동합니다.
fn packet_clocked(nodes: &[ProgramNode], register: Register) -> bool {
    let node = &nodes[register];
    node.kind == FeatureKind::PacketFeature
        && node.constant.is_none()
        && !node.args.is_empty()
        && node.args.iter().all(|arg| match arg {
            Arg::Register(r) => nodes[*r].constant.is_some(),
            Arg::Raw => false,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FeatureMaker;
    use crate::feature::{Feature, FeatureContext, Input};
    use crate::spec::FeatureSpec;
    use flowprobe_core::types::FieldType;
    use serde_json::json;

    struct Nop;

    impl Feature for Nop {
        fn event(&mut self, _input: Input<'_>, _ctx: &mut FeatureContext<'_>) {}
    }

    fn catalog() -> Catalog {
        use FeatureKind::*;
        let nop = |_| Box::new(Nop) as Box<dyn Feature>;
        let mut catalog = Catalog::new();
        catalog
            .register(
                FeatureMaker::new("length", PacketFeature, [RawPacket])
                    .with_type(FieldType::Unsigned16)
                    .with_factory(nop),
            )
            .unwrap();
        catalog
            .register(
                FeatureMaker::new("mean", FlowFeature, [PacketFeature])
                    .with_type(FieldType::Float64)
                    .with_factory(nop),
            )
            .unwrap();
        catalog
            .register(
                FeatureMaker::new("min", FlowFeature, [PacketFeature])
                    .with_resolver(|t| t.first().copied())
                    .with_factory(nop),
            )
            .unwrap();
        catalog
    }

    fn simplified(features: serde_json::Value) -> Result<Program, CompileError> {
        let catalog = catalog();
        let spec = FeatureSpec::from_value(features).unwrap();
        let mut ast = super::super::construct::run(&spec)?;
        super::super::expand::run(&mut ast, &catalog)?;
        super::super::build::run(&mut ast, &catalog)?;
        let signatures = super::super::resolve::run(&mut ast, &catalog, 16)?;
        run(&ast, &signatures, &catalog, 16)
    }

    #[test]
    fn shared_subexpression_gets_one_register() {
        let program = simplified(json!([["mean", "length"], ["min", "length"]])).unwrap();
        // length, mean, min
        assert_eq!(program.len(), 3);
        assert_eq!(program.events(), &[0]);
        assert_eq!(program.dependents(0), &[1, 2]);
        assert_eq!(program.exports(), &[1, 2]);
        assert_eq!(program.fields(), &["mean(length)", "min(length)"]);
    }

    #[test]
    fn duplicate_export_rejected() {
        let err = simplified(json!([["mean", "length"], ["mean", "length"]])).unwrap_err();
        assert_eq!(
            err,
            CompileError::DuplicateExport {
                position: 2,
                name: "mean(length)".to_owned(),
            }
        );
    }

    #[test]
    fn arguments_precede_their_users() {
        let program = simplified(json!([["min", "length"]])).unwrap();
        for (r, node) in program.nodes().iter().enumerate() {
            for arg in program.arguments(r) {
                assert!(*arg < r, "{node:?}");
            }
        }
    }
}
