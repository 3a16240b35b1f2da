//! 에러 타입 — 도메인별 에러 정의

/// Depscan 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum DepscanError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 예외 규칙 저장소 에러
    #[error("exception error: {0}")]
    Exception(#[from] ExceptionError),

    /// 작업 큐 에러
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// 스캔 처리 에러
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 예외 규칙 저장소 에러
#[derive(Debug, thiserror::Error)]
pub enum ExceptionError {
    /// 규칙 소스 로딩 실패
    #[error("exception load failed: {0}")]
    LoadFailed(String),

    /// 규칙 파싱 실패
    #[error("exception parse failed: {0}")]
    ParseFailed(String),
}

/// 작업 큐 에러
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// 채널 전송 실패
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    /// 큐가 이미 시작됨 또는 정지됨
    #[error("invalid queue state: {0}")]
    InvalidState(String),
}

/// 스캔 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// 매니페스트 열거 실패
    #[error("manifest discovery failed: {0}")]
    Discovery(String),

    /// 패키지 보강 실패
    #[error("enrichment failed: {0}")]
    Enrichment(String),

    /// 분석기 실패
    #[error("analyzer failed: {0}")]
    Analysis(String),

    /// 분석기가 fail-on-error 이벤트를 발생시킴
    #[error("{source_name} analyzer raised an event to fail with: {reason}")]
    AnalyzerFailEvent { source_name: String, reason: String },
}
