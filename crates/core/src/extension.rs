//! 확장 지점 trait — 스캔 파이프라인의 외부 협력자 인터페이스
//!
//! 스캔 엔진은 매니페스트 열거, 패키지 보강, 분석, 리포팅을 모두
//! 외부 구현에 위임합니다. 이 모듈은 그 경계의 trait들을 정의합니다.
//!
//! [`Enricher`]는 RPITIT를 사용하므로 `dyn Enricher`가 불가합니다.
//! [`DynEnricher`]는 `BoxFuture`를 반환하여 `Vec<Box<dyn DynEnricher>>`로
//! 보강기를 동적 관리할 수 있게 합니다.

use std::future::Future;
use std::pin::Pin;

use crate::error::DepscanError;
use crate::event::AnalyzerEvent;
use crate::types::{Package, PackageManifest};

/// Boxed future 타입 별칭
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ─── DependencySink ──────────────────────────────────────────────────

/// 보강 중 발견된 전이 의존성을 받는 콜백
///
/// 보강기는 패키지를 조사하다가 그 패키지의 의존성을 알게 되면
/// [`discover`](Self::discover)로 넘깁니다. 수신 측(스캔 엔진)은
/// 깊이 제한과 중복 제거 정책에 따라 버릴 수 있으며, 보강기는 수용
/// 여부를 알 필요가 없습니다.
pub trait DependencySink: Sync {
    /// 발견된 전이 의존성을 전달합니다.
    fn discover(&self, pkg: Package);
}

// ─── Enricher ────────────────────────────────────────────────────────

/// 패키지 보강기
///
/// 외부 인텔리전스(취약점 DB, 악성 패키지 피드 등)를 조회하여
/// 패키지에 [`PackageInsight`](crate::types::PackageInsight)를 채우고,
/// 알게 된 전이 의존성을 싱크로 넘깁니다.
pub trait Enricher: Send + Sync {
    /// 보강기 이름 (로깅용)
    fn name(&self) -> &str;

    /// 패키지를 보강합니다.
    ///
    /// 실패해도 같은 패키지에 대한 다른 보강기 실행은 계속됩니다.
    fn enrich<'a>(
        &'a self,
        pkg: &'a mut Package,
        deps: &'a (dyn DependencySink + 'a),
    ) -> impl Future<Output = Result<(), DepscanError>> + Send + 'a;
}

/// dyn-compatible 보강기 trait
///
/// `Enricher`를 구현한 타입은 자동으로 `DynEnricher`도 구현됩니다.
pub trait DynEnricher: Send + Sync {
    /// 보강기 이름 (로깅용)
    fn name(&self) -> &str;

    /// 패키지를 보강합니다.
    fn enrich<'a>(
        &'a self,
        pkg: &'a mut Package,
        deps: &'a (dyn DependencySink + 'a),
    ) -> BoxFuture<'a, Result<(), DepscanError>>;
}

impl<T: Enricher> DynEnricher for T {
    fn name(&self) -> &str {
        Enricher::name(self)
    }

    fn enrich<'a>(
        &'a self,
        pkg: &'a mut Package,
        deps: &'a (dyn DependencySink + 'a),
    ) -> BoxFuture<'a, Result<(), DepscanError>> {
        Box::pin(Enricher::enrich(self, pkg, deps))
    }
}

// ─── ManifestReader ──────────────────────────────────────────────────

/// 매니페스트 열거자
///
/// 디렉토리 순회, lockfile 파싱, purl 해석 등의 발견 메커니즘이
/// 이 trait 뒤에 숨습니다. 발견한 매니페스트를 핸들러에 하나씩
/// 넘기며, 핸들러가 에러를 반환하면 열거를 중단하고 전파합니다.
pub trait ManifestReader: Send {
    /// 열거자 이름 (로깅용)
    fn name(&self) -> &str;

    /// 매니페스트를 열거합니다.
    fn read_manifests(
        &mut self,
        handler: &mut dyn FnMut(PackageManifest) -> Result<(), DepscanError>,
    ) -> Result<(), DepscanError>;
}

// ─── Analyzer ────────────────────────────────────────────────────────

/// 매니페스트 분석기
///
/// 보강이 끝난 매니페스트를 받아 판정 이벤트를 스트리밍합니다.
pub trait Analyzer: Send {
    /// 분석기 이름 (로깅용)
    fn name(&self) -> &str;

    /// 매니페스트를 분석하고 판정 이벤트를 핸들러로 흘려보냅니다.
    fn analyze(
        &mut self,
        manifest: &PackageManifest,
        handler: &mut dyn FnMut(AnalyzerEvent) -> Result<(), DepscanError>,
    ) -> Result<(), DepscanError>;

    /// 모든 매니페스트 분석이 끝난 뒤 호출됩니다.
    fn finish(&mut self) -> Result<(), DepscanError>;
}

// ─── Reporter ────────────────────────────────────────────────────────

/// 스캔 결과 리포터
///
/// 매니페스트와 분석기 이벤트를 받아 보고서를 누적하고,
/// [`finish`](Self::finish)에서 최종 출력을 만듭니다.
pub trait Reporter: Send {
    /// 리포터 이름 (로깅용)
    fn name(&self) -> &str;

    /// 보강 완료된 매니페스트를 보고서에 추가합니다.
    fn add_manifest(&mut self, manifest: &PackageManifest);

    /// 분석기 이벤트를 보고서에 추가합니다.
    fn add_analyzer_event(&mut self, event: &AnalyzerEvent);

    /// 최종 보고서를 생성합니다.
    fn finish(&mut self) -> Result<(), DepscanError>;
}
