//! 패키지 스캔 오케스트레이터 -- 전체 스캔 흐름 관리
//!
//! [`PackageScanner`]는 매니페스트 열거부터 리포트까지의 파이프라인을
//! 단계별로 진행합니다.
//!
//! # 내부 아키텍처
//!
//! ```text
//! ManifestReader --> PackageManifest --> ExceptionStore (Filtering)
//!                                              |
//!                                        WorkQueue<Package> (Enriching)
//!                                        |   Enricher*  --> EnrichSink --> 전이 의존성 재제출
//!                                              |
//!                                        Analyzer* (Analyzing)
//!                                        |   AnalyzerEvent --> Reporter*
//!                                              |
//!                                        Reporter*.add_manifest (Reporting)
//! ```
//!
//! 보강 단계는 매니페스트마다 새 [`WorkQueue`]를 만들어
//! `concurrency`개의 워커로 패키지를 병렬 보강합니다. 보강기가
//! 발견한 전이 의존성은 깊이 한도 안에서 같은 큐에 재제출됩니다.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{debug, info, warn};

use depscan_core::extension::{Analyzer, DependencySink, DynEnricher, Enricher, ManifestReader, Reporter};
use depscan_core::metrics as m;
use depscan_core::types::{Package, PackageManifest};

use crate::config::ScannerConfig;
use crate::error::ScanEngineError;
use crate::exceptions::ExceptionStore;
use crate::workqueue::{QueueHandler, WorkQueue};

/// 스캐너 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// 초기화됨, 아직 스캔하지 않음
    Idle,
    /// 예외 규칙 적용 중
    Filtering,
    /// 패키지 보강 중
    Enriching,
    /// 분석기 실행 중
    Analyzing,
    /// 리포터에 결과 전달 중
    Reporting,
    /// 정상 종료
    Done,
    /// fail-on-error 이벤트로 종료
    Failed,
}

/// 패키지 스캔 오케스트레이터
///
/// 열거, 필터링, 보강, 분석, 리포트의 전체 흐름을 관리합니다.
/// [`PackageScannerBuilder`]로 구성하며, [`run`](Self::run) 한 번이
/// 하나의 스캔 배치입니다.
///
/// # 재사용 제한
///
/// `run()` 이 끝난 스캐너를 다시 쓰려면 새 인스턴스를 빌드해야 합니다.
pub struct PackageScanner {
    /// 스캐너 설정
    config: ScannerConfig,
    /// 현재 상태
    state: ScanState,
    /// 보강기 목록 (워커 핸들러와 공유)
    enrichers: Arc<Vec<Box<dyn DynEnricher>>>,
    /// 분석기 목록
    analyzers: Vec<Box<dyn Analyzer>>,
    /// 리포터 목록
    reporters: Vec<Box<dyn Reporter>>,
    /// 예외 규칙 저장소
    exceptions: ExceptionStore,
    /// 첫 번째 fail-on-error 원인 (finish에서 반환)
    first_failure: Option<ScanEngineError>,
    /// 스캔 완료된 매니페스트 수
    manifests_scanned: u64,
}

impl PackageScanner {
    /// 새 빌더를 생성합니다.
    pub fn builder() -> PackageScannerBuilder {
        PackageScannerBuilder::new()
    }

    /// 현재 상태명을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            ScanState::Idle => "idle",
            ScanState::Filtering => "filtering",
            ScanState::Enriching => "enriching",
            ScanState::Analyzing => "analyzing",
            ScanState::Reporting => "reporting",
            ScanState::Done => "done",
            ScanState::Failed => "failed",
        }
    }

    /// 현재 상태를 반환합니다.
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// 스캔 완료된 매니페스트 수를 반환합니다.
    pub fn manifests_scanned(&self) -> u64 {
        self.manifests_scanned
    }

    /// 예외 규칙 저장소에 대한 가변 참조를 반환합니다.
    ///
    /// 스캔 시작 전 [`ExceptionStore::load`]를 호출하는 데 사용합니다.
    pub fn exceptions_mut(&mut self) -> &mut ExceptionStore {
        &mut self.exceptions
    }

    /// 배치 스캔을 수행합니다.
    ///
    /// 각 열거자의 매니페스트를 모두 스캔한 뒤 [`finish`](Self::finish)로
    /// 종료합니다. 열거자 실패는 로그만 남기고 배치를 계속합니다.
    ///
    /// # Errors
    ///
    /// 분석기가 fail-on-error 이벤트를 냈다면 첫 번째 원인을 반환합니다.
    pub async fn run(
        &mut self,
        mut readers: Vec<Box<dyn ManifestReader>>,
    ) -> Result<(), ScanEngineError> {
        info!(readers = readers.len(), "starting scan batch");

        'batch: for reader in &mut readers {
            let reader_name = reader.name().to_owned();

            let mut batch = Vec::new();
            let read = reader.read_manifests(&mut |manifest| {
                batch.push(manifest);
                Ok(())
            });
            if let Err(err) = read {
                warn!(reader = %reader_name, error = %err, "manifest reader failed, skipping");
                continue;
            }

            debug!(reader = %reader_name, manifests = batch.len(), "manifests enumerated");

            for manifest in batch {
                self.scan_manifest(manifest).await?;

                if self.config.fail_fast && self.first_failure.is_some() {
                    warn!("fail-fast enabled, aborting remaining manifests");
                    break 'batch;
                }
            }
        }

        self.finish()
    }

    /// 매니페스트 하나를 필터링, 보강, 분석, 리포트 단계로 처리합니다.
    pub async fn scan_manifest(
        &mut self,
        manifest: PackageManifest,
    ) -> Result<(), ScanEngineError> {
        let path = manifest.display_path();

        if self.config.is_excluded(&path) {
            debug!(path = %path, "manifest excluded by pattern");
            return Ok(());
        }

        if manifest.package_count() > self.config.max_packages {
            warn!(
                path = %path,
                packages = manifest.package_count(),
                max = self.config.max_packages,
                "too many packages, skipping manifest"
            );
            return Ok(());
        }

        let started = Instant::now();
        metrics::counter!(m::SCAN_MANIFESTS_TOTAL).increment(1);

        // --- Filtering ---
        self.state = ScanState::Filtering;
        let manifest = self.filter_manifest(manifest)?;

        // --- Enriching ---
        self.state = ScanState::Enriching;
        let manifest = self.enrich_manifest(manifest).await?;

        // --- Analyzing ---
        self.state = ScanState::Analyzing;
        self.analyze_manifest(&manifest);

        // --- Reporting ---
        self.state = ScanState::Reporting;
        for reporter in &mut self.reporters {
            reporter.add_manifest(&manifest);
        }

        self.manifests_scanned += 1;
        metrics::histogram!(m::SCAN_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        info!(
            path = %path,
            packages = manifest.package_count(),
            "manifest scan completed"
        );

        Ok(())
    }

    /// 예외 규칙에 걸린 패키지를 제거한 매니페스트를 반환합니다.
    ///
    /// 걸러진 패키지는 이후 어떤 단계에도 도달하지 않습니다.
    /// 살아남은 패키지 사이의 그래프 구조(간선, 루트 표시, `present`
    /// 플래그)는 그대로 유지됩니다.
    fn filter_manifest(
        &mut self,
        manifest: PackageManifest,
    ) -> Result<PackageManifest, ScanEngineError> {
        if self.exceptions.active_count() == 0 {
            return Ok(manifest);
        }

        let mut filtered = manifest.clone();
        filtered.packages.clear();
        filtered.dependency_graph.clear();

        let suppressed = self.exceptions.allowed_packages(&manifest, &mut |pkg| {
            filtered.add_package(pkg);
            Ok(())
        })?;

        // 생존 패키지 간의 구조를 원본 그래프에서 되살립니다.
        // 걸러진 노드와 그에 닿는 간선만 빠집니다.
        let source_graph = &manifest.dependency_graph;
        let survivors = filtered.packages.clone();
        for pkg in &survivors {
            if source_graph.is_root(pkg) {
                filtered.dependency_graph.set_root(pkg, true);
            }
            for child in source_graph.dependencies(pkg) {
                if !self.exceptions.apply(&child).is_match() {
                    filtered.dependency_graph.add_dependency(pkg, &child);
                }
            }
        }
        filtered
            .dependency_graph
            .set_present(source_graph.present());

        if suppressed > 0 {
            metrics::counter!(m::SCAN_PACKAGES_SUPPRESSED_TOTAL).increment(suppressed as u64);
            debug!(
                path = %manifest.display_path(),
                suppressed,
                "packages suppressed by exception rules"
            );
        }

        Ok(filtered)
    }

    /// 워커 풀로 매니페스트의 모든 패키지를 보강합니다.
    async fn enrich_manifest(
        &mut self,
        manifest: PackageManifest,
    ) -> Result<PackageManifest, ScanEngineError> {
        let seeds = manifest.get_packages();
        let shared = Arc::new(Mutex::new(manifest));

        let handler: QueueHandler<Package> = {
            let enrichers = Arc::clone(&self.enrichers);
            let manifest = Arc::clone(&shared);
            let transitive_analysis = self.config.transitive_analysis;
            let transitive_depth = self.config.transitive_depth;
            let max_packages = self.config.max_packages;

            Arc::new(move |queue, pkg| {
                let enrichers = Arc::clone(&enrichers);
                let manifest = Arc::clone(&manifest);
                Box::pin(async move {
                    let mut pkg = pkg;
                    let sink = EnrichSink {
                        queue,
                        manifest: &manifest,
                        transitive_analysis,
                        transitive_depth,
                        max_packages,
                    };

                    for enricher in enrichers.iter() {
                        if let Err(err) = enricher.enrich(&mut pkg, &sink).await {
                            metrics::counter!(m::SCAN_ENRICH_FAILURES_TOTAL).increment(1);
                            warn!(
                                enricher = enricher.name(),
                                package = %pkg.short_name(),
                                error = %err,
                                "enricher failed, continuing"
                            );
                        }
                    }

                    let mut guard = manifest.lock().unwrap_or_else(|e| e.into_inner());
                    guard.replace_package(pkg);
                    drop(guard);

                    metrics::counter!(m::SCAN_PACKAGES_ENRICHED_TOTAL).increment(1);
                    Ok(())
                })
            })
        };

        let queue = Arc::new(WorkQueue::new(self.config.concurrency, handler));
        for pkg in seeds {
            queue.add(pkg);
        }
        queue.start()?;
        queue.wait().await;
        queue.stop().await;
        drop(queue);

        // 워커가 전부 합류했으므로 남은 참조는 이것뿐이어야 합니다
        let manifest = Arc::into_inner(shared)
            .map(|mutex| mutex.into_inner().unwrap_or_else(|e| e.into_inner()))
            .ok_or_else(|| {
                ScanEngineError::QueueState("manifest still shared after enrichment".to_owned())
            })?;

        Ok(manifest)
    }

    /// 분석기를 실행하고 이벤트를 리포터에 전달합니다.
    ///
    /// 분석기 에러는 로그만 남기고 나머지 분석기를 계속 실행합니다.
    /// fail-on-error 이벤트는 첫 번째 것만 종료 원인으로 기록하되,
    /// 이벤트 스트림 전체는 끝까지 소비합니다.
    fn analyze_manifest(&mut self, manifest: &PackageManifest) {
        let reporters = &mut self.reporters;
        let first_failure = &mut self.first_failure;

        for analyzer in &mut self.analyzers {
            let analyzer_name = analyzer.name().to_owned();

            let result = analyzer.analyze(manifest, &mut |event| {
                for reporter in reporters.iter_mut() {
                    reporter.add_analyzer_event(&event);
                }

                if event.is_fail_on_error() && first_failure.is_none() {
                    let reason = event
                        .error
                        .clone()
                        .unwrap_or_else(|| event.message.clone());
                    *first_failure = Some(ScanEngineError::AnalyzerFailEvent {
                        analyzer: event.analyzer.clone(),
                        reason,
                    });
                }

                Ok(())
            });

            if let Err(err) = result {
                warn!(analyzer = %analyzer_name, error = %err, "analyzer failed, continuing");
            }
        }
    }

    /// 분석기와 리포터를 종료하고 배치 결과를 확정합니다.
    ///
    /// 개별 종료 실패는 로그만 남기며 다른 컴포넌트의 종료를 막지 않습니다.
    ///
    /// # Errors
    ///
    /// 배치 중 기록된 첫 번째 fail-on-error 원인을 반환합니다.
    pub fn finish(&mut self) -> Result<(), ScanEngineError> {
        for analyzer in &mut self.analyzers {
            if let Err(err) = analyzer.finish() {
                warn!(analyzer = analyzer.name(), error = %err, "analyzer finish failed");
            }
        }
        for reporter in &mut self.reporters {
            if let Err(err) = reporter.finish() {
                warn!(reporter = reporter.name(), error = %err, "reporter finish failed");
            }
        }

        match self.first_failure.take() {
            Some(cause) => {
                self.state = ScanState::Failed;
                metrics::counter!(m::SCAN_FAILURES_TOTAL).increment(1);
                warn!(error = %cause, "scan batch failed");
                Err(cause)
            }
            None => {
                self.state = ScanState::Done;
                info!(manifests = self.manifests_scanned, "scan batch done");
                Ok(())
            }
        }
    }
}

/// 보강기가 전이 의존성을 보고하는 싱크
///
/// 보강 패스 동안만 살아 있으며, 깊이 한도 안의 패키지를
/// 매니페스트와 작업 큐에 동시에 반영합니다.
struct EnrichSink<'a> {
    queue: &'a WorkQueue<Package>,
    manifest: &'a Mutex<PackageManifest>,
    transitive_analysis: bool,
    transitive_depth: u32,
    max_packages: usize,
}

impl DependencySink for EnrichSink<'_> {
    fn discover(&self, pkg: Package) {
        if !self.transitive_analysis || pkg.depth > self.transitive_depth {
            tracing::trace!(
                package = %pkg.short_name(),
                depth = pkg.depth,
                "transitive dependency outside analysis depth, dropped"
            );
            return;
        }

        {
            let guard = self.manifest.lock().unwrap_or_else(|e| e.into_inner());
            if guard.package_count() >= self.max_packages {
                warn!(
                    package = %pkg.short_name(),
                    max = self.max_packages,
                    "package limit reached, dropping transitive dependency"
                );
                return;
            }
        }

        // 첫 제출일 때만 매니페스트와 그래프에 반영 (중복 제출은 no-op)
        if self.queue.add(pkg.clone()) {
            let mut guard = self.manifest.lock().unwrap_or_else(|e| e.into_inner());
            guard.add_transitive(pkg);
            metrics::counter!(m::SCAN_TRANSITIVE_DISCOVERED_TOTAL).increment(1);
        }
    }
}

// ─── Builder ─────────────────────────────────────────────────────────

/// [`PackageScanner`] 빌더
pub struct PackageScannerBuilder {
    config: ScannerConfig,
    enrichers: Vec<Box<dyn DynEnricher>>,
    analyzers: Vec<Box<dyn Analyzer>>,
    reporters: Vec<Box<dyn Reporter>>,
    exceptions: Option<ExceptionStore>,
}

impl PackageScannerBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: ScannerConfig::default(),
            enrichers: Vec::new(),
            analyzers: Vec::new(),
            reporters: Vec::new(),
            exceptions: None,
        }
    }

    /// 스캐너 설정을 지정합니다.
    pub fn config(mut self, config: ScannerConfig) -> Self {
        self.config = config;
        self
    }

    /// 보강기를 등록합니다. 등록 순서대로 실행됩니다.
    pub fn enricher(mut self, enricher: impl Enricher + 'static) -> Self {
        self.enrichers.push(Box::new(enricher));
        self
    }

    /// 분석기를 등록합니다.
    pub fn analyzer(mut self, analyzer: impl Analyzer + 'static) -> Self {
        self.analyzers.push(Box::new(analyzer));
        self
    }

    /// 리포터를 등록합니다.
    pub fn reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }

    /// 예외 규칙 저장소를 주입합니다. 미설정 시 빈 저장소를 사용합니다.
    pub fn exceptions(mut self, store: ExceptionStore) -> Self {
        self.exceptions = Some(store);
        self
    }

    /// 스캐너를 빌드합니다.
    ///
    /// # Errors
    ///
    /// 설정 유효성 검증 실패 시 `ScanEngineError::Config` 반환
    pub fn build(self) -> Result<PackageScanner, ScanEngineError> {
        self.config.validate()?;

        Ok(PackageScanner {
            config: self.config,
            state: ScanState::Idle,
            enrichers: Arc::new(self.enrichers),
            analyzers: self.analyzers,
            reporters: self.reporters,
            exceptions: self.exceptions.unwrap_or_default(),
            first_failure: None,
            manifests_scanned: 0,
        })
    }
}

impl Default for PackageScannerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU32, Ordering};

    use depscan_core::error::DepscanError;
    use depscan_core::event::AnalyzerEvent;
    use depscan_core::types::{Ecosystem, PackageInsight};

    use crate::config::ScannerConfigBuilder;

    /// 모든 패키지에 빈 인사이트를 붙이는 보강기
    struct StampEnricher {
        calls: Arc<AtomicU32>,
    }

    impl Enricher for StampEnricher {
        fn name(&self) -> &str {
            "stamp"
        }

        async fn enrich<'a>(
            &'a self,
            pkg: &'a mut Package,
            _deps: &'a (dyn DependencySink + 'a),
        ) -> Result<(), DepscanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            pkg.insight = Some(PackageInsight {
                source: "stamp".to_owned(),
                ..PackageInsight::default()
            });
            Ok(())
        }
    }

    /// 이벤트와 매니페스트를 수집만 하는 리포터
    #[derive(Default)]
    struct CollectingReporter {
        manifests: Arc<Mutex<Vec<String>>>,
        events: Arc<Mutex<Vec<AnalyzerEvent>>>,
    }

    impl Reporter for CollectingReporter {
        fn name(&self) -> &str {
            "collecting"
        }

        fn add_manifest(&mut self, manifest: &PackageManifest) {
            self.manifests
                .lock()
                .unwrap()
                .push(manifest.display_path());
        }

        fn add_analyzer_event(&mut self, event: &AnalyzerEvent) {
            self.events.lock().unwrap().push(event.clone());
        }

        fn finish(&mut self) -> Result<(), DepscanError> {
            Ok(())
        }
    }

    fn sample_manifest() -> PackageManifest {
        let mut manifest = PackageManifest::from_local("app/package-lock.json", Ecosystem::Npm);
        manifest.add_package(Package::new(Ecosystem::Npm, "express", "4.18.0"));
        manifest.add_package(Package::new(Ecosystem::Npm, "lodash", "4.17.21"));
        manifest
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let config = ScannerConfig {
            concurrency: 0,
            ..ScannerConfig::default()
        };
        let result = PackageScanner::builder().config(config).build();
        assert!(matches!(result, Err(ScanEngineError::Config { .. })));
    }

    #[test]
    fn new_scanner_is_idle() {
        let scanner = PackageScanner::builder().build().unwrap();
        assert_eq!(scanner.state(), ScanState::Idle);
        assert_eq!(scanner.state_name(), "idle");
    }

    #[tokio::test]
    async fn scan_manifest_enriches_all_packages() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut scanner = PackageScanner::builder()
            .enricher(StampEnricher {
                calls: Arc::clone(&calls),
            })
            .build()
            .unwrap();

        scanner.scan_manifest(sample_manifest()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(scanner.manifests_scanned(), 1);
    }

    #[tokio::test]
    async fn excluded_manifest_is_skipped() {
        let calls = Arc::new(AtomicU32::new(0));
        let config = ScannerConfigBuilder::new()
            .exclude_patterns(vec!["package-lock".to_owned()])
            .build()
            .unwrap();
        let mut scanner = PackageScanner::builder()
            .config(config)
            .enricher(StampEnricher {
                calls: Arc::clone(&calls),
            })
            .build()
            .unwrap();

        scanner.scan_manifest(sample_manifest()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(scanner.manifests_scanned(), 0);
    }

    #[tokio::test]
    async fn reporter_receives_manifest() {
        let reporter = CollectingReporter::default();
        let manifests = Arc::clone(&reporter.manifests);

        let mut scanner = PackageScanner::builder().reporter(reporter).build().unwrap();
        scanner.scan_manifest(sample_manifest()).await.unwrap();

        let seen = manifests.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("package-lock.json"));
    }

    #[tokio::test]
    async fn finish_without_failure_is_done() {
        let mut scanner = PackageScanner::builder().build().unwrap();
        scanner.scan_manifest(sample_manifest()).await.unwrap();
        scanner.finish().unwrap();
        assert_eq!(scanner.state_name(), "done");
    }
}
