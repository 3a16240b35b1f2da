//! 스캔 엔진 에러 타입
//!
//! [`ScanEngineError`]는 스캔 엔진 모듈 내에서 발생할 수 있는 모든 에러를 나타냅니다.
//! `From<ScanEngineError> for DepscanError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 자연스럽게 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **예외 규칙**: `ExceptionLoad`, `ExceptionParse`
//! - **작업 큐**: `QueueClosed`, `QueueState`
//! - **스캔 파이프라인**: `Discovery`, `Enrichment`, `Analysis`, `AnalyzerFailEvent`
//! - **설정**: `Config`
//! - **파일 I/O**: `Io`

use depscan_core::error::{DepscanError, ExceptionError, QueueError, ScanError};

/// 스캔 엔진 도메인 에러
///
/// 스캔 엔진 내부의 모든 에러 시나리오를 포함합니다.
///
/// # 에러 변환
///
/// `From<ScanEngineError> for DepscanError` 구현으로
/// 상위 통합 에러 타입으로 자동 변환됩니다.
#[derive(Debug, thiserror::Error)]
pub enum ScanEngineError {
    /// 예외 규칙 소스 로딩 실패
    #[error("exception load error: {path}: {reason}")]
    ExceptionLoad {
        /// 규칙 소스 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 예외 규칙 파싱 실패
    #[error("exception parse error: {0}")]
    ExceptionParse(String),

    /// 작업 큐 채널이 닫힘
    #[error("work queue closed: {0}")]
    QueueClosed(String),

    /// 작업 큐 상태 오류 (중복 start 등)
    #[error("work queue state error: {0}")]
    QueueState(String),

    /// 매니페스트 열거 실패
    #[error("manifest discovery error: {reader}: {reason}")]
    Discovery {
        /// 열거자 이름
        reader: String,
        /// 실패 사유
        reason: String,
    },

    /// 패키지 보강 실패
    #[error("enrichment error: {enricher}: {reason}")]
    Enrichment {
        /// 보강기 이름
        enricher: String,
        /// 실패 사유
        reason: String,
    },

    /// 분석기 실행 실패
    #[error("analysis error: {analyzer}: {reason}")]
    Analysis {
        /// 분석기 이름
        analyzer: String,
        /// 실패 사유
        reason: String,
    },

    /// 분석기가 fail-on-error 이벤트를 발생시킴
    #[error("{analyzer} analyzer raised an event to fail with: {reason}")]
    AnalyzerFailEvent {
        /// 이벤트를 발생시킨 분석기 이름
        analyzer: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },
}

impl From<ScanEngineError> for DepscanError {
    fn from(err: ScanEngineError) -> Self {
        match err {
            ScanEngineError::ExceptionLoad { path, reason } => DepscanError::Exception(
                ExceptionError::LoadFailed(format!("exception load error: {path}: {reason}")),
            ),
            ScanEngineError::ExceptionParse(msg) => {
                DepscanError::Exception(ExceptionError::ParseFailed(msg))
            }
            ScanEngineError::QueueClosed(msg) => {
                DepscanError::Queue(QueueError::ChannelSend(msg))
            }
            ScanEngineError::QueueState(msg) => {
                DepscanError::Queue(QueueError::InvalidState(msg))
            }
            ScanEngineError::Discovery { reader, reason } => DepscanError::Scan(
                ScanError::Discovery(format!("manifest discovery error: {reader}: {reason}")),
            ),
            ScanEngineError::Enrichment { enricher, reason } => DepscanError::Scan(
                ScanError::Enrichment(format!("enrichment error: {enricher}: {reason}")),
            ),
            ScanEngineError::Analysis { analyzer, reason } => DepscanError::Scan(
                ScanError::Analysis(format!("analysis error: {analyzer}: {reason}")),
            ),
            ScanEngineError::AnalyzerFailEvent { analyzer, reason } => {
                DepscanError::Scan(ScanError::AnalyzerFailEvent {
                    source_name: analyzer,
                    reason,
                })
            }
            ScanEngineError::Config { field, reason } => DepscanError::Config(
                depscan_core::error::ConfigError::InvalidValue { field, reason },
            ),
            ScanEngineError::Io { path, source } => DepscanError::Scan(ScanError::Enrichment(
                format!("io error: {path}: {source}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_load_error_display() {
        let err = ScanEngineError::ExceptionLoad {
            path: "exceptions.json".to_owned(),
            reason: "file corrupted".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exceptions.json"));
        assert!(msg.contains("file corrupted"));
    }

    #[test]
    fn exception_parse_error_display() {
        let err = ScanEngineError::ExceptionParse("invalid JSON at line 3".to_owned());
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn queue_closed_error_display() {
        let err = ScanEngineError::QueueClosed("receiver dropped".to_owned());
        assert!(err.to_string().contains("receiver dropped"));
    }

    #[test]
    fn queue_state_error_display() {
        let err = ScanEngineError::QueueState("already started".to_owned());
        assert!(err.to_string().contains("already started"));
    }

    #[test]
    fn discovery_error_display() {
        let err = ScanEngineError::Discovery {
            reader: "lockfile-reader".to_owned(),
            reason: "permission denied".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("lockfile-reader"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn analyzer_fail_event_display() {
        let err = ScanEngineError::AnalyzerFailEvent {
            analyzer: "policy".to_owned(),
            reason: "critical vulnerability".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "policy analyzer raised an event to fail with: critical vulnerability"
        );
    }

    #[test]
    fn config_error_display() {
        let err = ScanEngineError::Config {
            field: "concurrency".to_owned(),
            reason: "must be greater than 0".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("concurrency"));
        assert!(msg.contains("must be greater than 0"));
    }

    #[test]
    fn io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ScanEngineError::Io {
            path: "/tmp/exceptions.json".to_owned(),
            source: io_err,
        };
        assert!(err.to_string().contains("/tmp/exceptions.json"));
    }

    #[test]
    fn converts_to_depscan_error_exception() {
        let err = ScanEngineError::ExceptionLoad {
            path: "x.json".to_owned(),
            reason: "bad".to_owned(),
        };
        let top: DepscanError = err.into();
        assert!(matches!(
            top,
            DepscanError::Exception(ExceptionError::LoadFailed(_))
        ));
    }

    #[test]
    fn converts_to_depscan_error_queue() {
        let err = ScanEngineError::QueueClosed("closed".to_owned());
        let top: DepscanError = err.into();
        assert!(matches!(top, DepscanError::Queue(QueueError::ChannelSend(_))));
    }

    #[test]
    fn converts_to_depscan_error_fail_event() {
        let err = ScanEngineError::AnalyzerFailEvent {
            analyzer: "policy".to_owned(),
            reason: "bad".to_owned(),
        };
        let top: DepscanError = err.into();
        assert!(matches!(
            top,
            DepscanError::Scan(ScanError::AnalyzerFailEvent { .. })
        ));
        assert!(top.to_string().contains("policy"));
    }

    #[test]
    fn converts_to_depscan_error_config() {
        let err = ScanEngineError::Config {
            field: "concurrency".to_owned(),
            reason: "zero".to_owned(),
        };
        let top: DepscanError = err.into();
        assert!(matches!(top, DepscanError::Config(_)));
    }
}
