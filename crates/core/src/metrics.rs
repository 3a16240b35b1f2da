//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `depscan_`
//! - 모듈명: `scan_`, `queue_`, `exceptions_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use depscan_core::metrics;
//! use metrics::counter;
//!
//! counter!(depscan_core::metrics::SCAN_PACKAGES_ENRICHED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 에코시스템 레이블 키 (cargo, npm, pypi 등)
pub const LABEL_ECOSYSTEM: &str = "ecosystem";

/// 심각도 레이블 키 (info, low, medium, high, critical)
pub const LABEL_SEVERITY: &str = "severity";

/// 보강기 이름 레이블 키
pub const LABEL_ENRICHER: &str = "enricher";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Scan 메트릭 ────────────────────────────────────────────────────

/// Scan: 스캔된 매니페스트 수 (counter)
pub const SCAN_MANIFESTS_TOTAL: &str = "depscan_scan_manifests_total";

/// Scan: 보강 완료된 패키지 수 (counter)
pub const SCAN_PACKAGES_ENRICHED_TOTAL: &str = "depscan_scan_packages_enriched_total";

/// Scan: 예외 규칙으로 제외된 패키지 수 (counter)
pub const SCAN_PACKAGES_SUPPRESSED_TOTAL: &str = "depscan_scan_packages_suppressed_total";

/// Scan: 보강 중 발견된 전이 의존성 수 (counter)
pub const SCAN_TRANSITIVE_DISCOVERED_TOTAL: &str = "depscan_scan_transitive_discovered_total";

/// Scan: 보강 실패 수 (counter, label: enricher)
pub const SCAN_ENRICH_FAILURES_TOTAL: &str = "depscan_scan_enrich_failures_total";

/// Scan: 실패로 종결된 스캔 수 (counter)
pub const SCAN_FAILURES_TOTAL: &str = "depscan_scan_failures_total";

/// Scan: 매니페스트 스캔 소요 시간 (histogram, 초)
pub const SCAN_DURATION_SECONDS: &str = "depscan_scan_duration_seconds";

// ─── Work Queue 메트릭 ──────────────────────────────────────────────

/// Queue: 큐에 수용된 작업 수 (counter)
pub const QUEUE_ITEMS_ADMITTED_TOTAL: &str = "depscan_queue_items_admitted_total";

/// Queue: 중복으로 거절된 작업 수 (counter)
pub const QUEUE_ITEMS_DEDUPED_TOTAL: &str = "depscan_queue_items_deduped_total";

/// Queue: 핸들러 실패 수 (counter)
pub const QUEUE_HANDLER_FAILURES_TOTAL: &str = "depscan_queue_handler_failures_total";

/// Queue: 현재 처리 중(in-flight) 작업 수 (gauge)
pub const QUEUE_IN_FLIGHT: &str = "depscan_queue_in_flight";

// ─── Exceptions 메트릭 ──────────────────────────────────────────────

/// Exceptions: 로드된 활성 규칙 수 (gauge)
pub const EXCEPTIONS_RULES_ACTIVE: &str = "depscan_exceptions_rules_active";

/// Exceptions: 만료되어 건너뛴 규칙 수 (counter)
pub const EXCEPTIONS_RULES_EXPIRED_TOTAL: &str = "depscan_exceptions_rules_expired_total";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 매니페스트 스캔 소요 시간 히스토그램 버킷 (초)
///
/// 100ms ~ 300s 범위 (원격 인텔리전스 조회 포함)
pub const SCAN_DURATION_BUCKETS: [f64; 9] = [0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// `metrics::describe_counter!()`, `describe_gauge!()`, `describe_histogram!()`을
/// 호출하여 Prometheus HELP 텍스트를 설정합니다.
///
/// 이 함수는 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Scan
    describe_counter!(SCAN_MANIFESTS_TOTAL, "Total number of manifests scanned");
    describe_counter!(
        SCAN_PACKAGES_ENRICHED_TOTAL,
        "Total number of packages enriched with external intelligence"
    );
    describe_counter!(
        SCAN_PACKAGES_SUPPRESSED_TOTAL,
        "Total number of packages suppressed by exception rules"
    );
    describe_counter!(
        SCAN_TRANSITIVE_DISCOVERED_TOTAL,
        "Total number of transitive dependencies discovered during enrichment"
    );
    describe_counter!(
        SCAN_ENRICH_FAILURES_TOTAL,
        "Total number of enricher failures (per enricher)"
    );
    describe_counter!(
        SCAN_FAILURES_TOTAL,
        "Total number of scans that ended in a failed state"
    );
    describe_histogram!(
        SCAN_DURATION_SECONDS,
        "Time to scan a single manifest in seconds"
    );

    // Work Queue
    describe_counter!(
        QUEUE_ITEMS_ADMITTED_TOTAL,
        "Total number of items admitted to the work queue"
    );
    describe_counter!(
        QUEUE_ITEMS_DEDUPED_TOTAL,
        "Total number of items rejected as duplicates by the work queue"
    );
    describe_counter!(
        QUEUE_HANDLER_FAILURES_TOTAL,
        "Total number of work queue handler failures"
    );
    describe_gauge!(
        QUEUE_IN_FLIGHT,
        "Number of items currently admitted but not yet completed"
    );

    // Exceptions
    describe_gauge!(
        EXCEPTIONS_RULES_ACTIVE,
        "Number of active exception rules loaded in the store"
    );
    describe_counter!(
        EXCEPTIONS_RULES_EXPIRED_TOTAL,
        "Total number of exception rules skipped because they were expired"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        SCAN_MANIFESTS_TOTAL,
        SCAN_PACKAGES_ENRICHED_TOTAL,
        SCAN_PACKAGES_SUPPRESSED_TOTAL,
        SCAN_TRANSITIVE_DISCOVERED_TOTAL,
        SCAN_ENRICH_FAILURES_TOTAL,
        SCAN_FAILURES_TOTAL,
        SCAN_DURATION_SECONDS,
        QUEUE_ITEMS_ADMITTED_TOTAL,
        QUEUE_ITEMS_DEDUPED_TOTAL,
        QUEUE_HANDLER_FAILURES_TOTAL,
        QUEUE_IN_FLIGHT,
        EXCEPTIONS_RULES_ACTIVE,
        EXCEPTIONS_RULES_EXPIRED_TOTAL,
    ];

    #[test]
    fn all_metrics_start_with_depscan_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("depscan_"),
                "Metric '{}' does not start with 'depscan_' prefix",
                name
            );
        }
    }

    #[test]
    fn counters_end_with_total() {
        let counters = [
            SCAN_MANIFESTS_TOTAL,
            SCAN_PACKAGES_ENRICHED_TOTAL,
            SCAN_PACKAGES_SUPPRESSED_TOTAL,
            SCAN_TRANSITIVE_DISCOVERED_TOTAL,
            SCAN_ENRICH_FAILURES_TOTAL,
            SCAN_FAILURES_TOTAL,
            QUEUE_ITEMS_ADMITTED_TOTAL,
            QUEUE_ITEMS_DEDUPED_TOTAL,
            QUEUE_HANDLER_FAILURES_TOTAL,
            EXCEPTIONS_RULES_EXPIRED_TOTAL,
        ];
        for name in &counters {
            assert!(
                name.ends_with("_total"),
                "Counter '{}' should end with '_total'",
                name
            );
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        // 레코더가 설치되지 않은 상태에서도 panic하지 않아야 합니다
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        let labels = [LABEL_ECOSYSTEM, LABEL_SEVERITY, LABEL_ENRICHER, LABEL_RESULT];
        for label in &labels {
            assert_eq!(
                label.to_lowercase(),
                *label,
                "Label key '{}' should be lowercase",
                label
            );
        }
    }

    #[test]
    fn scan_duration_buckets_are_sorted() {
        let buckets = SCAN_DURATION_BUCKETS;
        for i in 1..buckets.len() {
            assert!(
                buckets[i] > buckets[i - 1],
                "Bucket values must be in ascending order"
            );
        }
    }
}
