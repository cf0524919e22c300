#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`spec`]: JSON 피처 명세 로더
//! - [`catalog`]: 피처/컴포지트/필터 등록 및 오버로드 조회
//! - [`ast`]: 아레나 기반 표현식 트리
//! - [`compiler`]: 명세를 레지스터 프로그램으로 바꾸는 7단계 패스
//! - [`variant`]: 변형 타입 트리와 조합 열거
//! - [`program`]: 컴파일된 레지스터 프로그램
//! - [`template`]: 런타임 변형 인덱스로 고르는 익스포트 템플릿
//! - [`feature`]: 런타임 피처/필터 trait과 실행 문맥
//! - [`record`]: 플로우별 레코드 런타임
//! - [`error`]: 컴파일/카탈로그 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! FeatureSpec -> Compiler(Catalog) -> Program -> RecordMaker -> Record* -> Exporter
//!    JSON          7 passes           Arc 공유     플로우마다     이벤트 구동
//! ```

pub mod ast;
pub mod catalog;
pub mod compiler;
pub mod error;
pub mod feature;
pub mod kind;
pub mod program;
pub mod record;
pub mod spec;
pub mod template;
pub mod variant;

mod builtin;

// --- 주요 타입 re-export ---

// 컴파일러
pub use compiler::Compiler;

// 카탈로그
pub use catalog::{Catalog, FeatureMaker, OutputType};

// 명세
pub use spec::FeatureSpec;

// 프로그램
pub use program::{Arg, Program, ProgramNode, Register};
pub use template::Template;

// 런타임
pub use feature::{Feature, FeatureContext, Filter, Input, Source};
pub use kind::FeatureKind;
pub use record::{EventOutcome, Record, RecordMaker};

// 에러
pub use error::{CatalogError, CompileError};
