//! 피처 표현식 컴파일러
//!
//! [`FeatureSpec`]을 레지스터 기반 [`Program`]으로 변환합니다.
//! 패스는 엄격한 순서로 실행되며, 뒤 패스는 앞 패스가 보장한 불변식을 전제합니다.
//!
//! ```text
//! Construct -> Expand -> Build -> ExpandSelect -> Lower -> Resolve -> Simplify
//!  JSON→트리   컴포지트   오버로드   암묵 입력 추가   apply/map   변형 타입   CSE + 레지스터
//! ```
//!
//! 컴파일은 명세마다 시작 시 한 번, 단일 스레드로 수행됩니다.

mod build;
mod construct;
mod expand;
mod lower;
mod resolve;
mod select;
mod simplify;

use std::time::Instant;

use metrics::{counter, gauge, histogram};
use tracing::{debug, info};

use flowprobe_core::config::{CompilerConfig, DEFAULT_MAX_VARIANT_COMBINATIONS};
use flowprobe_core::metrics as m;

use crate::catalog::Catalog;
use crate::error::CompileError;
use crate::program::{FilterEntry, Program};
use crate::spec::FeatureSpec;

/// 피처 명세 컴파일러
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'c> {
    catalog: &'c Catalog,
    max_variant_combinations: usize,
}

impl<'c> Compiler<'c> {
    /// 기본 설정으로 컴파일러를 생성합니다.
    pub fn new(catalog: &'c Catalog) -> Self {
        Self {
            catalog,
            max_variant_combinations: DEFAULT_MAX_VARIANT_COMBINATIONS,
        }
    }

    /// 설정 파일의 `[compiler]` 섹션으로 컴파일러를 생성합니다.
    pub fn from_config(catalog: &'c Catalog, config: &CompilerConfig) -> Self {
        Self::new(catalog).with_max_variant_combinations(config.max_variant_combinations)
    }

    /// 호출 하나가 열거할 수 있는 변형 조합 수의 상한을 설정합니다.
    pub fn with_max_variant_combinations(mut self, limit: usize) -> Self {
        self.max_variant_combinations = limit;
        self
    }

    /// 사용하는 카탈로그
    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    /// 명세를 컴파일합니다.
    ///
    /// # Errors
    /// 명세가 잘못되었으면 첫 번째로 발견된 [`CompileError`]를 반환합니다.
    pub fn compile(&self, spec: &FeatureSpec) -> Result<Program, CompileError> {
        let started = Instant::now();
        let result = self.run(spec);
        match &result {
            Ok(program) => {
                counter!(m::COMPILER_PROGRAMS_TOTAL).increment(1);
                histogram!(m::COMPILER_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
                gauge!(m::COMPILER_REGISTERS).set(program.len() as f64);
                info!(
                    features = spec.features.len(),
                    registers = program.len(),
                    exports = program.exports().len(),
                    variants = program.variants().len(),
                    templates = program.template().alternatives().len(),
                    "compiled feature spec"
                );
            }
            Err(e) => {
                counter!(m::COMPILER_ERRORS_TOTAL, m::LABEL_ERROR_KIND => e.kind()).increment(1);
                debug!(error = %e, "feature spec compilation failed");
            }
        }
        result
    }

    fn run(&self, spec: &FeatureSpec) -> Result<Program, CompileError> {
        let mut ast = construct::run(spec)?;
        debug!(nodes = ast.len(), "constructed expression tree");

        expand::run(&mut ast, self.catalog)?;
        debug!(nodes = ast.len(), "expanded composites");

        build::run(&mut ast, self.catalog)?;
        debug!("resolved overloads");

        select::run(&mut ast, self.catalog);
        lower::run(&mut ast, self.catalog);
        debug!(nodes = ast.len(), "lowered selections");

        let signatures = resolve::run(&mut ast, self.catalog, self.max_variant_combinations)?;
        debug!("resolved types");

        let filters = self.filters(spec)?;
        let mut program = simplify::run(&ast, &signatures, self.catalog, self.max_variant_combinations)?;
        program.filters = filters;
        debug!(registers = program.len(), "allocated registers");
        Ok(program)
    }

    fn filters(&self, spec: &FeatureSpec) -> Result<Vec<FilterEntry>, CompileError> {
        spec.filter
            .iter()
            .enumerate()
            .map(|(i, name)| match self.catalog.filter(name) {
                Some(factory) => Ok(FilterEntry {
                    name: name.clone(),
                    factory: factory.clone(),
                }),
                None => Err(CompileError::UnknownFilter {
                    position: i + 1,
                    name: name.clone(),
                }),
            })
            .collect()
    }
}
