//! 파이프라인 trait -- 모듈 확장 포인트 정의

use crate::error::FlowprobeError;
use crate::types::{ExportTemplate, Timestamp, Value};

/// 레코드 익스포트를 처리하는 trait
///
/// CSV, IPFIX 등 새로운 출력 형식을 지원하려면 이 trait을 구현합니다.
/// 하나의 익스포터가 여러 워커의 레코드를 받으므로 내부 상태는 구현체가
/// 직접 동기화해야 합니다.
pub trait Exporter: Send + Sync {
    /// 익스포터 이름
    fn name(&self) -> &str;

    /// 익스포트될 필드 이름 목록을 한 번 전달받습니다.
    fn fields(&self, names: &[String]);

    /// 레코드 하나를 익스포트합니다.
    ///
    /// `values`는 `template.elements`와 같은 순서이며, 값을 만들지 못한
    /// 피처는 `None`입니다.
    fn export(
        &self,
        template: &ExportTemplate,
        values: &[Option<Value>],
        when: Timestamp,
    ) -> Result<(), FlowprobeError>;
}
