//! 피처 카탈로그 -- 피처, 컴포지트, 필터 등록 및 오버로드 조회
//!
//! [`Catalog`]는 전역 상태가 아닌 명시적 객체입니다. 컴파일러에 참조로 전달되며,
//! 테스트마다 독립된 카탈로그를 만들어 쓸 수 있습니다.
//!
//! # 사용 예시
//! ```ignore
//! let mut catalog = Catalog::builtin();
//! catalog.register(
//!     FeatureMaker::new("double", FeatureKind::MatchType, [FeatureKind::MatchType])
//!         .with_resolver(|types| types.first().copied())
//!         .with_factory(|_| Box::new(Double::default())),
//! )?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use flowprobe_core::types::{FieldType, InformationElement};

use crate::error::CatalogError;
use crate::feature::{Feature, FeatureFactory, Filter, FilterFactory};
use crate::kind::FeatureKind;

/// 카탈로그 내 피처 항목 식별자
pub type MakerId = usize;

/// 인자 타입으로부터 출력 타입을 계산합니다. 호환되지 않으면 `None`.
pub type Resolver = fn(&[FieldType]) -> Option<FieldType>;

/// 피처의 출력 타입 선언
#[derive(Clone)]
pub enum OutputType {
    /// 데이터 타입 없음 (선택, 컨트롤)
    Untyped,
    /// 단일 고정 타입
    Fixed(InformationElement),
    /// 런타임에 고르는 고정 대안 목록 (예: IPv4 / IPv6 주소)
    Variants(Vec<InformationElement>),
    /// 인자 타입으로부터 계산
    Resolver(Resolver),
}

impl fmt::Debug for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Untyped => write!(f, "Untyped"),
            Self::Fixed(ie) => write!(f, "Fixed({ie})"),
            Self::Variants(ies) => f.debug_tuple("Variants").field(ies).finish(),
            Self::Resolver(_) => write!(f, "Resolver"),
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Untyped => write!(f, "-"),
            Self::Fixed(ie) => write!(f, "{}", ie.field_type),
            Self::Variants(ies) => {
                let names: Vec<String> = ies.iter().map(|ie| ie.field_type.to_string()).collect();
                write!(f, "{}", names.join("|"))
            }
            Self::Resolver(_) => write!(f, "<resolved>"),
        }
    }
}

/// 카탈로그 항목 하나 (피처 오버로드)
#[derive(Clone)]
pub struct FeatureMaker {
    /// 피처 이름
    pub name: String,
    /// 반환 종류
    pub return_kind: FeatureKind,
    /// 인자 종류 목록 (마지막이 `Ellipsis`면 가변 인자)
    pub arguments: Vec<FeatureKind>,
    /// 출력 타입
    pub output: OutputType,
    /// 런타임 인스턴스 생성 함수. `None`이면 컴파일 중 트리 재작성으로 처리됩니다.
    pub factory: Option<FeatureFactory>,
    /// 마지막 인자로 원시 입력을 암묵적으로 받는지 여부
    pub implicit_input: bool,
}

impl FeatureMaker {
    /// 새 항목을 생성합니다. 출력 타입은 `Untyped`, 팩토리는 없음으로 시작합니다.
    pub fn new(
        name: impl Into<String>,
        return_kind: FeatureKind,
        arguments: impl IntoIterator<Item = FeatureKind>,
    ) -> Self {
        Self {
            name: name.into(),
            return_kind,
            arguments: arguments.into_iter().collect(),
            output: OutputType::Untyped,
            factory: None,
            implicit_input: false,
        }
    }

    /// 단일 고정 출력 타입을 설정합니다.
    pub fn with_ie(mut self, ie: InformationElement) -> Self {
        self.output = OutputType::Fixed(ie);
        self
    }

    /// 이름이 같은 ID 없는 고정 출력 타입을 설정합니다.
    pub fn with_type(mut self, field_type: FieldType) -> Self {
        self.output = OutputType::Fixed(InformationElement::new(self.name.clone(), field_type));
        self
    }

    /// 런타임 변형 목록을 설정합니다.
    pub fn with_variants(mut self, variants: impl IntoIterator<Item = InformationElement>) -> Self {
        self.output = OutputType::Variants(variants.into_iter().collect());
        self
    }

    /// 타입 계산 함수를 설정합니다.
    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.output = OutputType::Resolver(resolver);
        self
    }

    /// 런타임 인스턴스 생성 함수를 설정합니다.
    pub fn with_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(FeatureKind) -> Box<dyn Feature> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// 원시 입력을 암묵적 마지막 인자로 받도록 표시합니다.
    pub fn with_implicit_input(mut self) -> Self {
        self.implicit_input = true;
        self
    }

    /// 가변 인자 여부
    pub fn is_variadic(&self) -> bool {
        self.arguments.last() == Some(&FeatureKind::Ellipsis)
    }

    /// 이 항목이 `count`개의 인자를 받을 수 있으면 인자별 종류를 반환합니다.
    ///
    /// `[K1..Kn, Ellipsis]`는 `count >= n`일 때 `Kn`을 반복하여 채웁니다.
    pub fn argument_kinds(&self, count: usize) -> Option<Vec<FeatureKind>> {
        if self.is_variadic() {
            let fixed = &self.arguments[..self.arguments.len() - 1];
            let repeated = *fixed.last()?;
            if count < fixed.len() {
                return None;
            }
            let mut kinds = fixed.to_vec();
            kinds.resize(count, repeated);
            Some(kinds)
        } else if self.arguments.len() == count {
            Some(self.arguments.clone())
        } else {
            None
        }
    }

    /// `ReturnKind(ArgKind, ...)` 형식의 시그니처
    pub fn signature(&self) -> String {
        let args: Vec<&str> = self.arguments.iter().map(|k| k.as_str()).collect();
        format!("{}({})", self.return_kind, args.join(", "))
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |reason: &str| CatalogError::InvalidDefinition {
            name: self.name.clone(),
            reason: reason.to_owned(),
        };
        if self.name.is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if !self.return_kind.is_return_kind() {
            return Err(invalid("return kind cannot be used as a feature result"));
        }
        if let Some(pos) = self
            .arguments
            .iter()
            .position(|k| *k == FeatureKind::Ellipsis)
            && (pos + 1 != self.arguments.len() || pos == 0)
        {
            return Err(invalid("ellipsis must follow at least one argument and come last"));
        }
        if self.arguments.contains(&FeatureKind::Control) {
            return Err(invalid("control cannot be used as an argument kind"));
        }
        if self.return_kind == FeatureKind::Control
            && self.arguments.as_slice() != [FeatureKind::RawPacket]
        {
            return Err(invalid("control features take exactly one RawPacket argument"));
        }
        if self.factory.is_none() && self.arguments.len() != 2 {
            return Err(invalid(
                "entries without a factory are rewrites taking (feature, selection)",
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for FeatureMaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureMaker")
            .field("name", &self.name)
            .field("return_kind", &self.return_kind)
            .field("arguments", &self.arguments)
            .field("output", &self.output)
            .field("factory", &self.factory.is_some())
            .field("implicit_input", &self.implicit_input)
            .finish()
    }
}

/// 컴포지트(매크로) 정의
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    /// 컴포지트 이름
    pub name: String,
    /// 템플릿 표현식 (명세와 같은 JSON 문법)
    pub definition: serde_json::Value,
    /// 선언된 출력 IE (익스포트 시 결과 타입 대신 사용)
    pub ie: Option<InformationElement>,
}

/// 피처 카탈로그
#[derive(Default)]
pub struct Catalog {
    makers: Vec<FeatureMaker>,
    by_name: HashMap<String, Vec<MakerId>>,
    composites: IndexMap<String, Composite>,
    filters: IndexMap<String, FilterFactory>,
}

impl Catalog {
    /// 빈 카탈로그를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기본 제공 피처 라이브러리가 등록된 카탈로그를 생성합니다.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        crate::builtin::register_all(&mut catalog);
        catalog
    }

    /// 피처 오버로드를 등록합니다.
    ///
    /// 이름, 반환 종류, 인자 종류가 모두 같은 항목이 있으면 에러를 반환합니다.
    pub fn register(&mut self, maker: FeatureMaker) -> Result<MakerId, CatalogError> {
        maker.validate()?;
        if let Some(ids) = self.by_name.get(&maker.name) {
            let clash = ids.iter().any(|&id| {
                let existing = &self.makers[id];
                existing.return_kind == maker.return_kind && existing.arguments == maker.arguments
            });
            if clash {
                return Err(CatalogError::AlreadyRegistered {
                    signature: maker.signature(),
                    name: maker.name,
                });
            }
        }
        let id = self.makers.len();
        self.by_name.entry(maker.name.clone()).or_default().push(id);
        tracing::trace!(name = %maker.name, signature = %maker.signature(), id, "registered feature");
        self.makers.push(maker);
        Ok(id)
    }

    /// 컴포지트를 등록합니다.
    pub fn register_composite(
        &mut self,
        name: impl Into<String>,
        definition: serde_json::Value,
        ie: Option<InformationElement>,
    ) -> Result<(), CatalogError> {
        let name = name.into();
        if self.composites.contains_key(&name) {
            return Err(CatalogError::AlreadyRegistered {
                name,
                signature: "composite".to_owned(),
            });
        }
        if definition.is_null() {
            return Err(CatalogError::InvalidDefinition {
                name,
                reason: "definition must not be null".to_owned(),
            });
        }
        self.composites.insert(
            name.clone(),
            Composite {
                name,
                definition,
                ie,
            },
        );
        Ok(())
    }

    /// 필터를 등록합니다.
    pub fn register_filter<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), CatalogError>
    where
        F: Fn() -> Box<dyn Filter> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.filters.contains_key(&name) {
            return Err(CatalogError::AlreadyRegistered {
                name,
                signature: "filter".to_owned(),
            });
        }
        self.filters.insert(name, Arc::new(factory));
        Ok(())
    }

    /// 오버로드 후보를 우선순위 순서로 반환합니다.
    ///
    /// 1. 반환 종류 일치 + 인자 수 일치
    /// 2. 반환 종류 일치 + 가변 인자
    /// 3. `MatchType` + 인자 수 일치
    /// 4. `MatchType` + 가변 인자
    ///
    /// 각 그룹 안에서는 등록 순서를 따릅니다.
    pub fn find(&self, name: &str, return_kind: FeatureKind, arg_count: usize) -> Vec<MakerId> {
        let Some(ids) = self.by_name.get(name) else {
            return Vec::new();
        };
        let mut groups: [Vec<MakerId>; 4] = Default::default();
        for &id in ids {
            let maker = &self.makers[id];
            let group = if maker.return_kind == return_kind {
                0
            } else if maker.return_kind == FeatureKind::MatchType
                && return_kind != FeatureKind::Control
            {
                2
            } else {
                continue;
            };
            if maker.argument_kinds(arg_count).is_none() {
                continue;
            }
            let slot = if maker.is_variadic() { group + 1 } else { group };
            groups[slot].push(id);
        }
        groups.into_iter().flatten().collect()
    }

    /// 원시 패킷 하나를 받는 컨트롤 피처를 찾습니다.
    pub fn find_control(&self, name: &str) -> Option<MakerId> {
        self.by_name.get(name)?.iter().copied().find(|&id| {
            let maker = &self.makers[id];
            maker.return_kind == FeatureKind::Control
                && maker.arguments.as_slice() == [FeatureKind::RawPacket]
        })
    }

    /// 항목을 조회합니다.
    pub fn maker(&self, id: MakerId) -> &FeatureMaker {
        &self.makers[id]
    }

    /// 이름이 등록되어 있는지 여부 (피처 또는 컴포지트)
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name) || self.composites.contains_key(name)
    }

    /// 컴포지트를 조회합니다.
    pub fn composite(&self, name: &str) -> Option<&Composite> {
        self.composites.get(name)
    }

    /// 필터 팩토리를 조회합니다.
    pub fn filter(&self, name: &str) -> Option<&FilterFactory> {
        self.filters.get(name)
    }

    /// 등록된 모든 피처 항목 (등록 순서)
    pub fn makers(&self) -> impl Iterator<Item = (MakerId, &FeatureMaker)> {
        self.makers.iter().enumerate()
    }

    /// 등록된 모든 컴포지트 (등록 순서)
    pub fn composites(&self) -> impl Iterator<Item = &Composite> {
        self.composites.values()
    }

    /// 등록된 모든 필터 이름 (등록 순서)
    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    /// 등록된 피처 항목 수
    pub fn len(&self) -> usize {
        self.makers.len()
    }

    /// 피처 항목이 하나도 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.makers.is_empty()
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("features", &self.makers.len())
            .field("composites", &self.composites.len())
            .field("filters", &self.filters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{FeatureContext, Input};

    struct Nop;

    impl Feature for Nop {
        fn event(&mut self, _input: Input<'_>, _ctx: &mut FeatureContext<'_>) {}
    }

    fn nop(name: &str, ret: FeatureKind, args: &[FeatureKind]) -> FeatureMaker {
        FeatureMaker::new(name, ret, args.iter().copied()).with_factory(|_| Box::new(Nop))
    }

    #[test]
    fn duplicate_signature_rejected() {
        let mut catalog = Catalog::new();
        catalog
            .register(nop("x", FeatureKind::FlowFeature, &[FeatureKind::RawFlow]))
            .unwrap();
        let err = catalog
            .register(nop("x", FeatureKind::FlowFeature, &[FeatureKind::RawFlow]))
            .unwrap_err();
        assert!(matches!(err, CatalogError::AlreadyRegistered { .. }));

        // 반환 종류가 다르면 별도 오버로드
        catalog
            .register(nop("x", FeatureKind::PacketFeature, &[FeatureKind::RawPacket]))
            .unwrap();
    }

    #[test]
    fn find_orders_candidate_groups() {
        let mut catalog = Catalog::new();
        let variadic_match = catalog
            .register(nop(
                "f",
                FeatureKind::MatchType,
                &[FeatureKind::MatchType, FeatureKind::Ellipsis],
            ))
            .unwrap();
        let exact_match = catalog
            .register(nop(
                "f",
                FeatureKind::MatchType,
                &[FeatureKind::MatchType, FeatureKind::MatchType],
            ))
            .unwrap();
        let variadic_flow = catalog
            .register(nop(
                "f",
                FeatureKind::FlowFeature,
                &[FeatureKind::PacketFeature, FeatureKind::Ellipsis],
            ))
            .unwrap();
        let exact_flow = catalog
            .register(nop(
                "f",
                FeatureKind::FlowFeature,
                &[FeatureKind::PacketFeature, FeatureKind::PacketFeature],
            ))
            .unwrap();

        assert_eq!(
            catalog.find("f", FeatureKind::FlowFeature, 2),
            vec![exact_flow, variadic_flow, exact_match, variadic_match]
        );
        assert_eq!(
            catalog.find("f", FeatureKind::PacketFeature, 3),
            vec![variadic_match]
        );
        assert!(catalog.find("g", FeatureKind::FlowFeature, 1).is_empty());
    }

    #[test]
    fn ellipsis_replicates_last_kind() {
        let maker = nop(
            "add",
            FeatureKind::MatchType,
            &[FeatureKind::MatchType, FeatureKind::Constant, FeatureKind::Ellipsis],
        );
        assert_eq!(maker.argument_kinds(1), None);
        assert_eq!(
            maker.argument_kinds(4),
            Some(vec![
                FeatureKind::MatchType,
                FeatureKind::Constant,
                FeatureKind::Constant,
                FeatureKind::Constant
            ])
        );
    }

    #[test]
    fn invalid_definitions_rejected() {
        let mut catalog = Catalog::new();
        let leading_ellipsis = nop("e", FeatureKind::FlowFeature, &[FeatureKind::Ellipsis]);
        assert!(matches!(
            catalog.register(leading_ellipsis),
            Err(CatalogError::InvalidDefinition { .. })
        ));

        let bad_control = nop("c", FeatureKind::Control, &[FeatureKind::RawFlow]);
        assert!(catalog.register(bad_control).is_err());

        let raw_return = nop("r", FeatureKind::RawPacket, &[]);
        assert!(catalog.register(raw_return).is_err());
    }

    #[test]
    fn find_control_requires_raw_packet_argument() {
        let mut catalog = Catalog::new();
        let id = catalog
            .register(nop("_end", FeatureKind::Control, &[FeatureKind::RawPacket]))
            .unwrap();
        assert_eq!(catalog.find_control("_end"), Some(id));
        assert_eq!(catalog.find_control("_missing"), None);
        // 컨트롤은 일반 조회의 MatchType 그룹에 섞이지 않음
        assert!(catalog.find("_end", FeatureKind::FlowFeature, 1).is_empty());
    }

    #[test]
    fn composites_and_filters_are_unique() {
        let mut catalog = Catalog::new();
        catalog
            .register_composite("c", serde_json::json!(["min", "x"]), None)
            .unwrap();
        assert!(catalog
            .register_composite("c", serde_json::json!("x"), None)
            .is_err());
        assert!(catalog.contains("c"));

        struct Pass;
        impl Filter for Pass {
            fn matches(&mut self, _packet: &dyn flowprobe_core::Packet) -> bool {
                true
            }
        }
        catalog.register_filter("all", || Box::new(Pass)).unwrap();
        assert!(catalog.register_filter("all", || Box::new(Pass)).is_err());
        assert_eq!(catalog.filter_names().collect::<Vec<_>>(), vec!["all"]);
    }
}
