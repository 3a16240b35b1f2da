//! 설정 관리 — depscan.toml 파싱 및 런타임 설정
//!
//! [`DepscanConfig`]는 스캔 엔진 전체의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. 환경변수 (`DEPSCAN_SCAN_CONCURRENCY=8` 형식)
//! 2. 설정 파일 (`depscan.toml`)
//! 3. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), depscan_core::error::DepscanError> {
//! use depscan_core::config::DepscanConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = DepscanConfig::load("depscan.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = DepscanConfig::parse("[scan]\nconcurrency = 8")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, DepscanError};

/// 동시 보강 워커 수 하한
pub const MIN_CONCURRENCY: usize = 1;
/// 동시 보강 워커 수 상한
pub const MAX_CONCURRENCY: usize = 64;
/// 전이 의존성 추적 깊이 상한
pub const MAX_TRANSITIVE_DEPTH: u32 = 10;

/// Depscan 통합 설정
///
/// `depscan.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepscanConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 스캔 설정
    #[serde(default)]
    pub scan: ScanConfig,
    /// 예외(allow-list) 설정
    #[serde(default)]
    pub exceptions: ExceptionsConfig,
}

impl DepscanConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DepscanError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DepscanError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DepscanError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                DepscanError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, DepscanError> {
        toml::from_str(toml_str).map_err(|e| {
            DepscanError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `DEPSCAN_{SECTION}_{FIELD}`
    /// 예: `DEPSCAN_SCAN_CONCURRENCY=8`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "DEPSCAN_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "DEPSCAN_GENERAL_LOG_FORMAT");

        // Scan
        override_usize(&mut self.scan.concurrency, "DEPSCAN_SCAN_CONCURRENCY");
        override_bool(
            &mut self.scan.transitive_analysis,
            "DEPSCAN_SCAN_TRANSITIVE_ANALYSIS",
        );
        override_u32(
            &mut self.scan.transitive_depth,
            "DEPSCAN_SCAN_TRANSITIVE_DEPTH",
        );
        override_csv(
            &mut self.scan.exclude_patterns,
            "DEPSCAN_SCAN_EXCLUDE_PATTERNS",
        );

        // Exceptions
        override_bool(&mut self.exceptions.enabled, "DEPSCAN_EXCEPTIONS_ENABLED");
        override_string(&mut self.exceptions.path, "DEPSCAN_EXCEPTIONS_PATH");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), DepscanError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // concurrency 검증
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&self.scan.concurrency) {
            return Err(ConfigError::InvalidValue {
                field: "scan.concurrency".to_owned(),
                reason: format!("must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"),
            }
            .into());
        }

        // transitive_depth 검증
        if self.scan.transitive_analysis && self.scan.transitive_depth > MAX_TRANSITIVE_DEPTH {
            return Err(ConfigError::InvalidValue {
                field: "scan.transitive_depth".to_owned(),
                reason: format!("must be at most {MAX_TRANSITIVE_DEPTH}"),
            }
            .into());
        }

        // exceptions.path 검증
        if self.exceptions.enabled && self.exceptions.path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "exceptions.path".to_owned(),
                reason: "path must not be empty when exceptions are enabled".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

// Default는 derive 매크로로 자동 생성 (각 필드가 Default를 구현하므로)

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 스캔 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 동시 보강 워커 수
    pub concurrency: usize,
    /// 전이 의존성 추적 활성화 여부
    pub transitive_analysis: bool,
    /// 전이 의존성 추적 깊이 한계
    pub transitive_depth: u32,
    /// 매니페스트 경로 제외 패턴 (부분 문자열 매칭)
    pub exclude_patterns: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            transitive_analysis: false,
            transitive_depth: 2,
            exclude_patterns: Vec::new(),
        }
    }
}

/// 예외(allow-list) 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExceptionsConfig {
    /// 예외 규칙 적용 여부
    pub enabled: bool,
    /// 예외 규칙 파일 경로 (JSON)
    pub path: String,
}

impl Default for ExceptionsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: String::new(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split(',').map(|s| s.trim().to_owned()).collect();
    }
}
