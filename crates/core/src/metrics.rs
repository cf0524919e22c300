//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! 레코더(exporter) 설치는 이 워크스페이스의 범위가 아닙니다.
//! 레코더가 없으면 매크로 호출은 아무 동작도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `flowprobe_`
//! - 영역: `compiler_`, `record_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(flowprobe_core::metrics::RECORD_EXPORTS_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 플로우 종료 사유 레이블 키 (idle_timeout, end_of_flow, ...)
pub const LABEL_REASON: &str = "reason";

/// 익스포터 이름 레이블 키
pub const LABEL_EXPORTER: &str = "exporter";

/// 에러 종류 레이블 키 (unknown_feature, type_mismatch, ...)
pub const LABEL_ERROR_KIND: &str = "kind";

// ─── Compiler 메트릭 ────────────────────────────────────────────────

/// Compiler: 컴파일에 성공한 명세 수 (counter)
pub const COMPILER_PROGRAMS_TOTAL: &str = "flowprobe_compiler_programs_total";

/// Compiler: 컴파일 실패 수 (counter, label: kind)
pub const COMPILER_ERRORS_TOTAL: &str = "flowprobe_compiler_errors_total";

/// Compiler: 컴파일 소요 시간 (histogram, 초)
pub const COMPILER_DURATION_SECONDS: &str = "flowprobe_compiler_duration_seconds";

/// Compiler: 마지막으로 컴파일된 프로그램의 레지스터 수 (gauge)
pub const COMPILER_REGISTERS: &str = "flowprobe_compiler_registers";

// ─── Record 메트릭 ─────────────────────────────────────────────────

/// Record: 생성된 레코드 수 (counter)
pub const RECORD_CREATED_TOTAL: &str = "flowprobe_record_created_total";

/// Record: 익스포트된 레코드 수 (counter, label: reason)
pub const RECORD_EXPORTS_TOTAL: &str = "flowprobe_record_exports_total";

/// Record: 필터에 의해 거부된 이벤트 수 (counter)
pub const RECORD_EVENTS_FILTERED_TOTAL: &str = "flowprobe_record_events_filtered_total";

/// Record: 컨트롤 피처가 즉시 종료시킨 횟수 (counter)
pub const RECORD_CONTROL_STOPS_TOTAL: &str = "flowprobe_record_control_stops_total";

/// Record: 익스포터 실패 수 (counter, label: exporter)
pub const RECORD_EXPORT_FAILURES_TOTAL: &str = "flowprobe_record_export_failures_total";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 컴파일 소요 시간 히스토그램 버킷 (초)
///
/// 10us ~ 1s 범위 (명세 컴파일은 시작 시 한 번 수행)
pub const COMPILE_DURATION_BUCKETS: [f64; 8] =
    [0.00001, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.1, 1.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Compiler
    describe_counter!(
        COMPILER_PROGRAMS_TOTAL,
        "Total number of feature specifications compiled successfully"
    );
    describe_counter!(
        COMPILER_ERRORS_TOTAL,
        "Total number of failed compilations by error kind"
    );
    describe_histogram!(
        COMPILER_DURATION_SECONDS,
        "Feature specification compile time in seconds"
    );
    describe_gauge!(
        COMPILER_REGISTERS,
        "Register count of the most recently compiled program"
    );

    // Record
    describe_counter!(RECORD_CREATED_TOTAL, "Total number of records created");
    describe_counter!(
        RECORD_EXPORTS_TOTAL,
        "Total number of record exports by flow end reason"
    );
    describe_counter!(
        RECORD_EVENTS_FILTERED_TOTAL,
        "Total number of packet events vetoed by filters"
    );
    describe_counter!(
        RECORD_CONTROL_STOPS_TOTAL,
        "Total number of records stopped by a control feature"
    );
    describe_counter!(
        RECORD_EXPORT_FAILURES_TOTAL,
        "Total number of exporter failures by exporter name"
    );
}
