//! 기본 제공 피처 라이브러리
//!
//! [`Catalog::builtin`](crate::Catalog::builtin)이 사용하는 등록 함수 모음입니다.
//! 모듈마다 `register(&mut Catalog)` 하나를 제공합니다.

mod aggregate;
mod composite;
mod control;
mod filter;
mod flow;
mod math;
mod packet;
mod selection;

use flowprobe_core::types::FieldType;

use crate::catalog::Catalog;
use crate::error::CatalogError;

/// 기본 라이브러리 전체를 등록합니다.
///
/// 기본 정의끼리는 충돌하지 않으므로 실패는 로그만 남깁니다.
pub(crate) fn register_all(catalog: &mut Catalog) {
    if let Err(e) = try_register_all(catalog) {
        tracing::error!(error = %e, "failed to register built-in features");
    }
}

pub(crate) fn try_register_all(catalog: &mut Catalog) -> Result<(), CatalogError> {
    packet::register(catalog)?;
    flow::register(catalog)?;
    aggregate::register(catalog)?;
    math::register(catalog)?;
    selection::register(catalog)?;
    control::register(catalog)?;
    filter::register(catalog)?;
    composite::register(catalog)?;
    Ok(())
}

/// 첫 번째 인자의 타입을 그대로 사용
fn same_as_argument(types: &[FieldType]) -> Option<FieldType> {
    types.first().copied()
}
