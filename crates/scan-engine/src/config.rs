//! 스캔 엔진 설정
//!
//! [`ScannerConfig`]는 core의 [`ScanConfig`](depscan_core::config::ScanConfig)를
//! 확장하여 엔진 고유 설정(fail-fast, 매니페스트당 패키지 상한)을 추가합니다.
//!
//! # 사용 예시
//!
//! ```
//! use depscan_scan_engine::ScannerConfig;
//!
//! // 기본값으로 생성
//! let config = ScannerConfig::default();
//! config.validate().unwrap();
//!
//! // 빌더로 생성
//! use depscan_scan_engine::ScannerConfigBuilder;
//!
//! let config = ScannerConfigBuilder::new()
//!     .concurrency(8)
//!     .transitive_analysis(true)
//!     .transitive_depth(3)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};

use depscan_core::config::{MAX_CONCURRENCY, MAX_TRANSITIVE_DEPTH, MIN_CONCURRENCY};

use crate::error::ScanEngineError;

/// 스캔 엔진 설정
///
/// core의 `ScanConfig`에서 파생되며, 모듈 고유 확장 필드를 포함합니다.
///
/// # 필드
///
/// - **concurrency**: 보강 워커 수
/// - **transitive_analysis**: 전이 의존성 분석 활성화 여부
/// - **transitive_depth**: 전이 분석 최대 깊이 (직접 의존성 = 0)
/// - **exclude_patterns**: 스캔 제외 경로 패턴 목록
/// - **fail_fast**: fail-on-error 이벤트 발생 시 이후 매니페스트 스캔 중단 여부
/// - **max_packages**: 매니페스트당 최대 허용 패키지 수
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// 보강 워커 수
    pub concurrency: usize,
    /// 전이 의존성 분석 활성화 여부
    pub transitive_analysis: bool,
    /// 전이 분석 최대 깊이
    pub transitive_depth: u32,
    /// 스캔 제외 경로 패턴 목록 (부분 문자열 매칭)
    pub exclude_patterns: Vec<String>,

    // --- 모듈 고유 확장 ---
    /// fail-on-error 이벤트 발생 시 이후 매니페스트 스캔 중단 여부
    pub fail_fast: bool,
    /// 매니페스트당 최대 허용 패키지 수 (전이 포함)
    pub max_packages: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            transitive_analysis: false,
            transitive_depth: 2,
            exclude_patterns: Vec::new(),
            fail_fast: false,
            max_packages: 50_000,
        }
    }
}

/// 설정 상한값 상수
const MAX_PACKAGES_LIMIT: usize = 500_000;

impl ScannerConfig {
    /// core의 `DepscanConfig`에서 엔진 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값을 사용합니다.
    pub fn from_core(core: &depscan_core::DepscanConfig) -> Self {
        Self {
            concurrency: core.scan.concurrency,
            transitive_analysis: core.scan.transitive_analysis,
            transitive_depth: core.scan.transitive_depth,
            exclude_patterns: core.scan.exclude_patterns.clone(),
            ..Self::default()
        }
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `concurrency`: 1-64
    /// - `transitive_depth`: 전이 분석 활성화 시 1-10
    /// - `max_packages`: 1-500000
    pub fn validate(&self) -> Result<(), ScanEngineError> {
        if self.concurrency < MIN_CONCURRENCY || self.concurrency > MAX_CONCURRENCY {
            return Err(ScanEngineError::Config {
                field: "concurrency".to_owned(),
                reason: format!("must be {MIN_CONCURRENCY}-{MAX_CONCURRENCY}"),
            });
        }

        if self.transitive_analysis
            && (self.transitive_depth == 0 || self.transitive_depth > MAX_TRANSITIVE_DEPTH)
        {
            return Err(ScanEngineError::Config {
                field: "transitive_depth".to_owned(),
                reason: format!("must be 1-{MAX_TRANSITIVE_DEPTH} when transitive analysis is on"),
            });
        }

        if self.max_packages == 0 || self.max_packages > MAX_PACKAGES_LIMIT {
            return Err(ScanEngineError::Config {
                field: "max_packages".to_owned(),
                reason: format!("must be 1-{MAX_PACKAGES_LIMIT}"),
            });
        }

        Ok(())
    }

    /// 매니페스트 경로가 제외 패턴에 걸리는지 확인합니다.
    ///
    /// 패턴은 경로에 대한 부분 문자열 매칭으로 평가됩니다.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_patterns.iter().any(|p| path.contains(p.as_str()))
    }
}

/// [`ScannerConfig`] 빌더
///
/// 유연한 설정 구성 및 빌드 시 유효성 검증을 제공합니다.
#[derive(Default)]
pub struct ScannerConfigBuilder {
    config: ScannerConfig,
}

impl ScannerConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 보강 워커 수를 설정합니다.
    pub fn concurrency(mut self, workers: usize) -> Self {
        self.config.concurrency = workers;
        self
    }

    /// 전이 의존성 분석 여부를 설정합니다.
    pub fn transitive_analysis(mut self, enabled: bool) -> Self {
        self.config.transitive_analysis = enabled;
        self
    }

    /// 전이 분석 최대 깊이를 설정합니다.
    pub fn transitive_depth(mut self, depth: u32) -> Self {
        self.config.transitive_depth = depth;
        self
    }

    /// 제외 패턴 목록을 설정합니다.
    pub fn exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.config.exclude_patterns = patterns;
        self
    }

    /// fail-fast 여부를 설정합니다.
    pub fn fail_fast(mut self, enabled: bool) -> Self {
        self.config.fail_fast = enabled;
        self
    }

    /// 매니페스트당 최대 패키지 수를 설정합니다.
    pub fn max_packages(mut self, max: usize) -> Self {
        self.config.max_packages = max;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `ScanEngineError::Config` 반환
    pub fn build(self) -> Result<ScannerConfig, ScanEngineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ScannerConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn from_core_preserves_values() {
        let mut core = depscan_core::DepscanConfig::default();
        core.scan.concurrency = 8;
        core.scan.transitive_analysis = true;
        core.scan.transitive_depth = 3;
        core.scan.exclude_patterns = vec!["vendor/".to_owned()];

        let config = ScannerConfig::from_core(&core);
        assert_eq!(config.concurrency, 8);
        assert!(config.transitive_analysis);
        assert_eq!(config.transitive_depth, 3);
        assert_eq!(config.exclude_patterns, vec!["vendor/"]);
        // 확장 필드는 기본값
        assert!(!config.fail_fast);
        assert_eq!(config.max_packages, 50_000);
    }

    #[test]
    fn zero_concurrency_rejected() {
        let config = ScannerConfigBuilder::new().concurrency(0).build();
        assert!(matches!(config, Err(ScanEngineError::Config { ref field, .. }) if field == "concurrency"));
    }

    #[test]
    fn excessive_concurrency_rejected() {
        let config = ScannerConfigBuilder::new().concurrency(65).build();
        assert!(config.is_err());
    }

    #[test]
    fn depth_validated_only_when_transitive_enabled() {
        // 전이 분석 비활성화 상태에서는 depth 0도 허용
        let config = ScannerConfigBuilder::new()
            .transitive_analysis(false)
            .transitive_depth(0)
            .build();
        assert!(config.is_ok());

        // 활성화하면 0은 거부
        let config = ScannerConfigBuilder::new()
            .transitive_analysis(true)
            .transitive_depth(0)
            .build();
        assert!(matches!(config, Err(ScanEngineError::Config { ref field, .. }) if field == "transitive_depth"));
    }

    #[test]
    fn excessive_depth_rejected() {
        let config = ScannerConfigBuilder::new()
            .transitive_analysis(true)
            .transitive_depth(11)
            .build();
        assert!(config.is_err());
    }

    #[test]
    fn zero_max_packages_rejected() {
        let config = ScannerConfigBuilder::new().max_packages(0).build();
        assert!(config.is_err());
    }

    #[test]
    fn exclude_pattern_substring_match() {
        let config = ScannerConfigBuilder::new()
            .exclude_patterns(vec!["node_modules".to_owned(), "testdata/".to_owned()])
            .build()
            .unwrap();

        assert!(config.is_excluded("web/node_modules/pkg/package.json"));
        assert!(config.is_excluded("testdata/Cargo.lock"));
        assert!(!config.is_excluded("src/Cargo.lock"));
    }

    #[test]
    fn builder_chains_all_fields() {
        let config = ScannerConfigBuilder::new()
            .concurrency(16)
            .transitive_analysis(true)
            .transitive_depth(5)
            .exclude_patterns(vec!["dist/".to_owned()])
            .fail_fast(true)
            .max_packages(1000)
            .build()
            .unwrap();

        assert_eq!(config.concurrency, 16);
        assert!(config.transitive_analysis);
        assert_eq!(config.transitive_depth, 5);
        assert!(config.fail_fast);
        assert_eq!(config.max_packages, 1000);
    }

    #[test]
    fn serde_roundtrip() {
        let config = ScannerConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: ScannerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.concurrency, config.concurrency);
        assert_eq!(back.transitive_depth, config.transitive_depth);
    }
}
