//! 통합 테스트 -- 피처 명세 컴파일 검증
//!
//! 기본 카탈로그로 명세를 컴파일하여 오버로드 선택, 공통 부분식 제거,
//! 컴포지트 확장, apply/map 재작성, 변형 템플릿을 확인합니다.

use serde_json::json;

use flowprobe_core::config::CompilerConfig;
use flowprobe_core::types::FieldType;
use flowprobe_engine::{
    Arg, Catalog, CompileError, Compiler, Feature, FeatureContext, FeatureKind, FeatureMaker,
    FeatureSpec, Input, Program,
};

fn compile(catalog: &Catalog, spec: serde_json::Value) -> Result<Program, CompileError> {
    let spec = FeatureSpec::from_value(spec).expect("spec must be well-formed");
    Compiler::new(catalog).compile(&spec)
}

fn signatures(program: &Program) -> Vec<String> {
    program.nodes().iter().map(|n| n.key.clone()).collect()
}

struct Nop;

impl Feature for Nop {
    fn event(&mut self, _input: Input<'_>, _ctx: &mut FeatureContext<'_>) {}
}

/// 같은 명세는 항상 같은 프로그램으로 컴파일되어야 함
#[test]
fn test_compilation_is_deterministic() {
    let catalog = Catalog::builtin();
    let spec = json!([
        "octetTotalCount",
        ["mean", "ipTotalLength"],
        ["apply", ["min", "ipTotalLength"], "forward"],
        "sourceIPAddress"
    ]);

    let first = compile(&catalog, spec.clone()).unwrap();
    let second = compile(&catalog, spec).unwrap();
    assert_eq!(first.len(), second.len());
    assert_eq!(signatures(&first), signatures(&second));
    assert_eq!(first.exports(), second.exports());
    assert_eq!(first.fields(), second.fields());
}

/// 공유 부분식은 레지스터 하나로 합쳐져야 함
#[test]
fn test_shared_subexpression_single_register() {
    let catalog = Catalog::builtin();
    let program = compile(
        &catalog,
        json!([["mean", "ipTotalLength"], ["max", "ipTotalLength"], ["min", "ipTotalLength"]]),
    )
    .unwrap();

    let lengths: Vec<usize> = program
        .nodes()
        .iter()
        .enumerate()
        .filter(|(_, n)| n.name == "ipTotalLength")
        .map(|(r, _)| r)
        .collect();
    assert_eq!(lengths.len(), 1);
    assert_eq!(program.len(), 4);
    assert_eq!(program.events(), lengths.as_slice());
    assert_eq!(program.dependents(lengths[0]).len(), 3);
}

/// 같은 표현식을 두 번 익스포트하면 에러
#[test]
fn test_duplicate_export_rejected() {
    let catalog = Catalog::builtin();
    let err = compile(&catalog, json!(["sourceIPAddress", "sourceIPAddress"])).unwrap_err();
    assert_eq!(
        err,
        CompileError::DuplicateExport {
            position: 2,
            name: "sourceIPAddress".to_owned(),
        }
    );
}

/// 등록되지 않은 이름은 최상위 위치와 함께 보고
#[test]
fn test_unknown_identifier_position() {
    let catalog = Catalog::builtin();
    let err = compile(
        &catalog,
        json!(["packetTotalCount", "octetTotalCount", "__nonexistent__"]),
    )
    .unwrap_err();
    assert_eq!(
        err,
        CompileError::UnknownFeature {
            position: 3,
            name: "__nonexistent__".to_owned(),
        }
    );
    assert_eq!(err.position(), 3);
}

/// 가변 인자 피처는 최소 인자 수 이상만 허용
#[test]
fn test_variadic_argument_counts() {
    let mut catalog = Catalog::builtin();
    catalog
        .register(
            FeatureMaker::new(
                "total",
                FeatureKind::FlowFeature,
                [FeatureKind::FlowFeature, FeatureKind::FlowFeature, FeatureKind::Ellipsis],
            )
            .with_type(FieldType::Unsigned64)
            .with_factory(|_| Box::new(Nop)),
        )
        .unwrap();

    assert!(compile(&catalog, json!([["total", "packetTotalCount", "octetTotalCount"]])).is_ok());
    assert!(
        compile(
            &catalog,
            json!([["total", "packetTotalCount", "octetTotalCount", "flowEndReason"]])
        )
        .is_ok()
    );
    for spec in [json!([["total", "packetTotalCount"]]), json!([["total"]]), json!(["total"])] {
        let err = compile(&catalog, spec).unwrap_err();
        assert!(matches!(err, CompileError::TypeMismatch { position: 1, .. }), "{err}");
    }

    // 기본 라이브러리의 add도 가변 인자
    assert!(
        compile(
            &catalog,
            json!([["add", "packetTotalCount", "octetTotalCount", 1]])
        )
        .is_ok()
    );
}

/// 컴포지트는 직접 작성한 표현식과 같은 프로그램이 되어야 함
#[test]
fn test_composite_matches_hand_written() {
    let catalog = Catalog::builtin();
    let composite = compile(&catalog, json!(["minimumIpTotalLength"])).unwrap();
    let manual = compile(&catalog, json!([["min", "ipTotalLength"]])).unwrap();

    assert_eq!(signatures(&composite), signatures(&manual));
    assert_eq!(composite.fields(), &["minimumIpTotalLength"]);
    assert_eq!(manual.fields(), &["min(ipTotalLength)"]);

    let declared = composite.template().select(|_| 0).unwrap();
    assert_eq!(declared.elements[0].id, Some(25));
    let derived = manual.template().select(|_| 0).unwrap();
    assert_eq!(derived.elements[0].id, None);
    assert_eq!(derived.elements[0].field_type, FieldType::Unsigned16);
}

/// apply(F, forward)와 apply(F, backward)는 서로 다른 레지스터
#[test]
fn test_apply_lowering_distinct_selections() {
    let catalog = Catalog::builtin();
    let program = compile(
        &catalog,
        json!([
            ["apply", ["min", "ipTotalLength"], "forward"],
            ["apply", ["min", "ipTotalLength"], "backward"]
        ]),
    )
    .unwrap();

    let exports = program.exports();
    assert_eq!(exports.len(), 2);
    assert_ne!(exports[0], exports[1]);
    assert_eq!(
        program.fields(),
        &[
            "apply(min(ipTotalLength),forward)",
            "apply(min(ipTotalLength),backward)"
        ]
    );
    // 재작성 후에는 apply 노드가 남지 않음
    assert!(program.nodes().iter().all(|n| n.name != "apply"));
    // 원시 입력은 선택 피처만 직접 받음
    let direct: Vec<&str> = program
        .events()
        .iter()
        .map(|&r| program.node(r).name.as_str())
        .collect();
    assert_eq!(direct, vec!["forward", "backward"]);
}

/// map은 패킷 피처 수준에서 선택을 적용
#[test]
fn test_map_lowering_inside_aggregate() {
    let catalog = Catalog::builtin();
    let program = compile(&catalog, json!([["mean", ["map", "ipTotalLength", "backward"]]])).unwrap();
    let length = program
        .nodes()
        .iter()
        .position(|n| n.name == "ipTotalLength")
        .unwrap();
    assert!(!program.node(length).consumes_raw());
    assert_eq!(program.fields(), &["mean(map(ipTotalLength,backward))"]);
}

/// select와 select_slice는 암묵 원시 입력을 마지막 인자로 받음
#[test]
fn test_selection_gets_implicit_input() {
    let catalog = Catalog::builtin();
    let program = compile(
        &catalog,
        json!([
            ["apply", "packetTotalCount", ["select", ["greater", "ipTotalLength", 100]]],
            ["apply", "octetTotalCount", ["select_slice", 0, 10]]
        ]),
    )
    .unwrap();

    for name in ["select", "select_slice"] {
        let node = program.nodes().iter().find(|n| n.name == name).unwrap();
        assert_eq!(node.args.last(), Some(&Arg::Raw), "{name}");
        assert_eq!(node.kind, FeatureKind::Selection);
    }
}

/// 상수는 팩토리 없는 레지스터가 되고 의존 목록에 나타나지 않음
#[test]
fn test_constant_registers() {
    let catalog = Catalog::builtin();
    let program = compile(&catalog, json!([["add", "packetTotalCount", 1]])).unwrap();
    let constant = program
        .nodes()
        .iter()
        .position(|n| n.constant.is_some())
        .unwrap();
    assert!(program.node(constant).factory.is_none());
    assert!(program.dependents(constant).is_empty());

    let add = program.exports()[0];
    assert_eq!(program.arguments(add).len(), 2);
    let leaf = program.template().select(|_| 0).unwrap();
    assert_eq!(leaf.elements[0].field_type, FieldType::Signed64);
}

/// 패킷 피처는 최상위에서 사용할 수 없음
#[test]
fn test_packet_feature_at_top_level() {
    let catalog = Catalog::builtin();
    let err = compile(&catalog, json!(["ipTotalLength"])).unwrap_err();
    assert!(matches!(err, CompileError::TypeMismatch { position: 1, .. }));
}

/// 주소 변형은 템플릿 대안을 만듦
#[test]
fn test_variant_template_alternatives() {
    let catalog = Catalog::builtin();
    let program = compile(&catalog, json!(["sourceIPAddress", "packetTotalCount"])).unwrap();

    assert_eq!(program.variants().len(), 1);
    let source = program.variants()[0];
    assert_eq!(program.node(source).name, "sourceIPAddress");

    let alternatives = program.template().alternatives();
    assert_eq!(alternatives.len(), 2);
    assert_eq!(
        alternatives[0].field_names(),
        vec!["sourceIPv4Address", "packetTotalCount"]
    );
    assert_eq!(
        alternatives[1].field_names(),
        vec!["sourceIPv6Address", "packetTotalCount"]
    );
}

/// 모든 변형 조합이 호환되지 않으면 에러
#[test]
fn test_unresolvable_variant() {
    let catalog = Catalog::builtin();
    let err = compile(&catalog, json!([["add", "sourceIPAddress", 1]])).unwrap_err();
    assert!(matches!(err, CompileError::UnresolvableVariant { position: 1, .. }));
}

/// 변형 조합 수 상한
#[test]
fn test_variant_combination_limit() {
    let catalog = Catalog::builtin();
    let spec = FeatureSpec::from_value(json!([[
        "equal",
        "sourceIPAddress",
        "destinationIPAddress"
    ]]))
    .unwrap();

    let err = Compiler::new(&catalog)
        .with_max_variant_combinations(3)
        .compile(&spec)
        .unwrap_err();
    assert!(matches!(
        err,
        CompileError::TooManyVariants {
            combinations: 4,
            limit: 3,
            ..
        }
    ));

    let config = CompilerConfig::default();
    assert!(Compiler::from_config(&catalog, &config).compile(&spec).is_ok());
}

/// 컨트롤 피처와 필터 조회
#[test]
fn test_controls_and_filters() {
    let catalog = Catalog::builtin();
    let program = compile(
        &catalog,
        json!({"features": ["packetTotalCount"], "control": ["_tcpEnd"], "filter": ["tcp"]}),
    )
    .unwrap();
    assert_eq!(program.controls().len(), 1);
    assert!(!program.events().contains(&program.controls()[0]));
    assert_eq!(program.filters()[0].name, "tcp");

    let err = compile(&catalog, json!({"features": ["packetTotalCount"], "control": ["_nope"]}))
        .unwrap_err();
    assert!(matches!(err, CompileError::UnknownControl { position: 1, .. }));

    let err = compile(
        &catalog,
        json!({"features": ["packetTotalCount"], "filter": ["tcp", "sctp"]}),
    )
    .unwrap_err();
    assert_eq!(
        err,
        CompileError::UnknownFilter {
            position: 2,
            name: "sctp".to_owned(),
        }
    );
}

/// 지원하지 않는 상수
#[test]
fn test_unsupported_constant() {
    let catalog = Catalog::builtin();
    let err = compile(&catalog, json!([["add", "packetTotalCount", {"x": 1}]])).unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedConstant { position: 1, .. }));
}

/// 컴파일 에러는 FlowprobeError로 변환 가능
#[test]
fn test_compile_error_converts() {
    let catalog = Catalog::builtin();
    let err = compile(&catalog, json!(["__nope__"])).unwrap_err();
    let top: flowprobe_core::FlowprobeError = err.into();
    assert!(top.to_string().contains("__nope__"));
}
