//! 이벤트 시스템 — 분석기 결과 전달의 기본 단위
//!
//! 분석기(Analyzer)가 발생시키는 모든 판정은 [`AnalyzerEvent`]로
//! 표현되어 리포터에게 전달됩니다. [`EventMetadata`]는 모든 이벤트에
//! 공통으로 포함되는 추적 정보입니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::types::Package;

// --- 모듈명 상수 ---

/// 스캔 엔진 모듈명
pub const MODULE_SCAN_ENGINE: &str = "scan-engine";
/// 코어 모듈명
pub const MODULE_CORE: &str = "core";

// --- 이벤트 타입 상수 ---

/// 분석기 이벤트 타입
pub const EVENT_TYPE_ANALYZER: &str = "analyzer";

/// 이벤트 메타데이터 — 모든 이벤트에 공통으로 포함되는 추적 정보
///
/// 각 이벤트의 발생 시각, 생성 모듈, 분산 추적 ID를 담고 있어
/// 이벤트 흐름을 추적하고 디버깅할 수 있습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// 이벤트 발생 시각
    pub timestamp: SystemTime,
    /// 이벤트를 생성한 모듈명 (예: "scan-engine")
    pub source_module: String,
    /// 분산 추적 ID — 같은 흐름의 이벤트를 연결합니다
    pub trace_id: String,
}

impl EventMetadata {
    /// 기존 trace_id를 사용하여 새 메타데이터를 생성합니다.
    ///
    /// 이벤트 체인에서 동일한 추적 ID를 유지할 때 사용합니다.
    pub fn new(source_module: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source_module: source_module.into(),
            trace_id: trace_id.into(),
        }
    }

    /// 새로운 UUID v4 trace_id를 생성하여 메타데이터를 만듭니다.
    ///
    /// 새로운 이벤트 체인의 시작점에서 사용합니다.
    pub fn with_new_trace(source_module: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source_module: source_module.into(),
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl fmt::Display for EventMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] source={} trace={}",
            unix_timestamp_str(self.timestamp),
            self.source_module,
            self.trace_id,
        )
    }
}

/// 모든 이벤트가 구현해야 하는 기본 trait
///
/// `Send + Sync + 'static` 바운드로 채널을 통한 안전한 전송을
/// 보장합니다.
pub trait Event: Send + Sync + 'static {
    /// 이벤트 고유 ID (UUID v4)
    fn event_id(&self) -> &str;

    /// 이벤트 메타데이터 (timestamp, source_module, trace_id)
    fn metadata(&self) -> &EventMetadata;

    /// 이벤트 타입명 (로깅 및 라우팅에 사용)
    fn event_type(&self) -> &str;
}

// ─── AnalyzerEvent ───────────────────────────────────────────────────

/// 분석기 이벤트의 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerEventType {
    /// 정책/필터 규칙 매칭
    FilterMatch,
    /// 스캔을 실패로 종결해야 하는 판정
    FailOnError,
    /// 정보성 판정
    Info,
}

impl fmt::Display for AnalyzerEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FilterMatch => write!(f, "filter_match"),
            Self::FailOnError => write!(f, "fail_on_error"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// 분석기가 발생시키는 판정 이벤트
///
/// 매니페스트 분석 중 발견된 사실 하나를 담습니다. `FailOnError`
/// 이벤트는 스캔의 최종 결과를 실패로 만들지만 드레인 자체를 멈추지는
/// 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerEvent {
    /// 이벤트 고유 ID
    pub id: String,
    /// 이벤트 메타데이터
    pub metadata: EventMetadata,
    /// 이벤트를 발생시킨 분석기 이름
    pub analyzer: String,
    /// 이벤트 종류
    pub event_type: AnalyzerEventType,
    /// 관련 패키지 (있을 경우)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<Package>,
    /// 관련 매니페스트 표시 경로 (있을 경우)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<String>,
    /// 사람이 읽을 메시지
    pub message: String,
    /// 실패 판정 사유 (FailOnError 이벤트)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalyzerEvent {
    /// 새 분석기 이벤트를 생성합니다.
    pub fn new(
        analyzer: impl Into<String>,
        event_type: AnalyzerEventType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::with_new_trace(MODULE_SCAN_ENGINE),
            analyzer: analyzer.into(),
            event_type,
            package: None,
            manifest_path: None,
            message: message.into(),
            error: None,
        }
    }

    /// 스캔을 실패로 종결해야 하는 이벤트를 생성합니다.
    pub fn fail_on_error(analyzer: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let mut event = Self::new(analyzer, AnalyzerEventType::FailOnError, reason.clone());
        event.error = Some(reason);
        event
    }

    /// 관련 패키지를 설정합니다.
    pub fn with_package(mut self, package: Package) -> Self {
        self.package = Some(package);
        self
    }

    /// 관련 매니페스트 경로를 설정합니다.
    pub fn with_manifest_path(mut self, path: impl Into<String>) -> Self {
        self.manifest_path = Some(path.into());
        self
    }

    /// 이 이벤트가 스캔을 실패로 종결해야 하는지 반환합니다.
    pub fn is_fail_on_error(&self) -> bool {
        self.event_type == AnalyzerEventType::FailOnError
    }
}

impl Event for AnalyzerEvent {
    fn event_id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn event_type(&self) -> &str {
        EVENT_TYPE_ANALYZER
    }
}

impl fmt::Display for AnalyzerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AnalyzerEvent[{}] analyzer={} type={} message={}",
            &self.id[..8.min(self.id.len())],
            self.analyzer,
            self.event_type,
            self.message,
        )
    }
}

/// SystemTime을 사람이 읽을 수 있는 형태로 변환합니다.
fn unix_timestamp_str(time: SystemTime) -> String {
    match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(duration) => {
            let secs = duration.as_secs();
            format!("{secs}")
        }
        Err(_) => "unknown".to_owned(),
    }
}
