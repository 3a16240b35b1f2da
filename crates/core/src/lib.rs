#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod event;
pub mod extension;
pub mod graph;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, DepscanError, ExceptionError, QueueError, ScanError};

// 설정
pub use config::DepscanConfig;

// 이벤트
pub use event::{AnalyzerEvent, AnalyzerEventType, Event, EventMetadata};

// 확장 지점 trait
pub use extension::{
    Analyzer, BoxFuture, DependencySink, DynEnricher, Enricher, ManifestReader, Reporter,
};

// 그래프
pub use graph::DependencyGraph;

// 도메인 타입
pub use types::{
    Ecosystem, Identify, ManifestSource, ManifestSourceType, Package, PackageInsight,
    PackageManifest, Severity, Vulnerability, hashed_id,
};
