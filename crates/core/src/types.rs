//! 도메인 타입 — 패키지, 매니페스트, 보강 결과
//!
//! 모든 스캔 모듈이 공유하는 데이터 구조를 정의합니다.
//! 패키지 식별자는 [`Identify`] trait을 통해 얻으며, 의존성 그래프의
//! 노드 키와 작업 큐의 중복 제거 키로 동일하게 사용됩니다.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::graph::DependencyGraph;

// ─── Identity ────────────────────────────────────────────────────────

/// 안정적인 문자열 식별자를 제공하는 trait
///
/// 그래프 노드 키와 작업 큐 중복 제거 키가 모두 이 식별자를 사용합니다.
/// 동일한 입력에 대해 프로세스를 넘어 항상 같은 값을 반환해야 합니다.
pub trait Identify {
    /// 안정적인 고유 식별자를 반환합니다.
    fn id(&self) -> String;
}

/// 임의 문자열로부터 안정적인 64비트 16진수 식별자를 생성합니다.
///
/// 실행 간 재현 가능해야 하므로 시드가 섞이는 std 해셔 대신
/// blake3를 사용합니다.
pub fn hashed_id(data: &str) -> String {
    let hash = blake3::hash(data.as_bytes());
    let bytes = hash.as_bytes();
    let mut value: u64 = 0;
    for b in &bytes[..8] {
        value = (value << 8) | u64::from(*b);
    }
    format!("{value:016x}")
}

// ─── Ecosystem ───────────────────────────────────────────────────────

/// 패키지 생태계 (언어/패키지 관리자 네임스페이스)
///
/// `CycloneDxSbom`/`SpdxSbom`은 실제 레지스트리가 아니라 여러 생태계의
/// 패키지를 담는 컨테이너 형식입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ecosystem {
    /// Rust (Cargo.lock)
    Cargo,
    /// JavaScript/TypeScript (package-lock.json)
    Npm,
    /// Python (requirements.txt, poetry.lock)
    PyPI,
    /// Go (go.mod, go.sum)
    Go,
    /// JVM (pom.xml, gradle.lockfile)
    Maven,
    /// Ruby (Gemfile.lock)
    RubyGems,
    /// .NET (packages.lock.json)
    NuGet,
    /// PHP (composer.lock)
    Packagist,
    /// Erlang/Elixir (mix.lock)
    Hex,
    /// Dart (pubspec.lock)
    Pub,
    /// GitHub Actions 워크플로우
    GitHubActions,
    /// Terraform 프로바이더/모듈
    Terraform,
    /// CycloneDX SBOM 컨테이너
    CycloneDxSbom,
    /// SPDX SBOM 컨테이너
    SpdxSbom,
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cargo => write!(f, "cargo"),
            Self::Npm => write!(f, "npm"),
            Self::PyPI => write!(f, "pypi"),
            Self::Go => write!(f, "go"),
            Self::Maven => write!(f, "maven"),
            Self::RubyGems => write!(f, "rubygems"),
            Self::NuGet => write!(f, "nuget"),
            Self::Packagist => write!(f, "packagist"),
            Self::Hex => write!(f, "hex"),
            Self::Pub => write!(f, "pub"),
            Self::GitHubActions => write!(f, "github-actions"),
            Self::Terraform => write!(f, "terraform"),
            Self::CycloneDxSbom => write!(f, "cyclonedx-sbom"),
            Self::SpdxSbom => write!(f, "spdx-sbom"),
        }
    }
}

impl Ecosystem {
    /// 생태계에 대응하는 Package URL 타입 접두사를 반환합니다.
    ///
    /// 예: Cargo -> "cargo", PyPI -> "pypi"
    pub fn purl_type(&self) -> &str {
        match self {
            Self::Cargo => "cargo",
            Self::Npm => "npm",
            Self::PyPI => "pypi",
            Self::Go => "golang",
            Self::Maven => "maven",
            Self::RubyGems => "gem",
            Self::NuGet => "nuget",
            Self::Packagist => "composer",
            Self::Hex => "hex",
            Self::Pub => "pub",
            Self::GitHubActions => "github",
            Self::Terraform => "terraform",
            Self::CycloneDxSbom | Self::SpdxSbom => "generic",
        }
    }

    /// 문자열에서 생태계를 파싱합니다 (대소문자 구분 없음).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cargo" | "rust" | "crates" => Some(Self::Cargo),
            "npm" | "node" | "javascript" => Some(Self::Npm),
            "pypi" | "pip" | "python" => Some(Self::PyPI),
            "go" | "golang" => Some(Self::Go),
            "maven" | "java" => Some(Self::Maven),
            "rubygems" | "gem" | "ruby" => Some(Self::RubyGems),
            "nuget" | "dotnet" => Some(Self::NuGet),
            "packagist" | "composer" | "php" => Some(Self::Packagist),
            "hex" | "elixir" => Some(Self::Hex),
            "pub" | "dart" => Some(Self::Pub),
            "github-actions" | "githubactions" => Some(Self::GitHubActions),
            "terraform" => Some(Self::Terraform),
            "cyclonedx-sbom" | "cyclonedx" => Some(Self::CycloneDxSbom),
            "spdx-sbom" | "spdx" => Some(Self::SpdxSbom),
            _ => None,
        }
    }
}

// ─── Severity ────────────────────────────────────────────────────────

/// 심각도 레벨
///
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Info < Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    /// 정보성
    #[default]
    Info,
    /// 낮은 심각도
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적 — 즉시 대응 필요
    Critical,
}

impl Severity {
    /// 문자열에서 심각도를 파싱합니다 (대소문자 구분 없음).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" | "informational" => Some(Self::Info),
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

// ─── Enrichment results ──────────────────────────────────────────────

/// 취약점 정보
///
/// 외부 인텔리전스 소스에서 매칭된 단일 취약점을 나타냅니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    /// 취약점 식별자 (예: CVE-2024-1234, GHSA-xxxx)
    pub id: String,
    /// 요약 설명
    pub summary: String,
    /// 심각도
    pub severity: Severity,
    /// 수정된 버전 (있을 경우)
    pub fixed_version: Option<String>,
}

impl fmt::Display for Vulnerability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] (fixed: {})",
            self.id,
            self.severity,
            self.fixed_version.as_deref().unwrap_or("N/A"),
        )
    }
}

/// 패키지 보강 결과
///
/// Enricher가 외부 인텔리전스로부터 수집하여 패키지에 부착하는
/// 부가 정보입니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageInsight {
    /// 인텔리전스 출처 (Enricher 이름)
    pub source: String,
    /// 매칭된 취약점 목록
    pub vulnerabilities: Vec<Vulnerability>,
    /// 라이선스 식별자 목록 (SPDX 표기)
    pub licenses: Vec<String>,
    /// 의심 패키지 판정 (악성 확신은 없으나 위험 징후 존재)
    pub suspicious: bool,
    /// 악성 패키지 판정
    pub malware: bool,
}

// ─── Package ─────────────────────────────────────────────────────────

/// 스캔 대상 패키지
///
/// 매니페스트에서 직접 파싱되었거나(루트, `depth == 0`) 보강 과정에서
/// 전이 의존성으로 발견된(`depth > 0`) 단일 패키지 버전입니다.
///
/// 소유권 순환을 피하기 위해 부모 패키지와 소속 매니페스트는
/// 식별자 문자열로만 역참조합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    /// 패키지 생태계
    pub ecosystem: Ecosystem,
    /// 패키지 이름
    pub name: String,
    /// 해석 완료된 버전
    pub version: String,
    /// 가장 가까운 루트 패키지로부터의 거리 (직접 의존성은 0)
    pub depth: u32,
    /// 전이 의존성으로 발견된 경우 부모 패키지의 식별자
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// 소속 매니페스트의 식별자
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_id: Option<String>,
    /// 보강 결과 (Enricher가 채움)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insight: Option<PackageInsight>,
}

impl Package {
    /// 루트(직접 의존성) 패키지를 생성합니다.
    pub fn new(ecosystem: Ecosystem, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            ecosystem,
            name: name.into(),
            version: version.into(),
            depth: 0,
            parent_id: None,
            manifest_id: None,
            insight: None,
        }
    }

    /// 부모 패키지의 보강 과정에서 발견된 전이 의존성을 생성합니다.
    ///
    /// 깊이는 부모 + 1이며, 부모/매니페스트 역참조가 설정됩니다.
    pub fn transitive_of(
        parent: &Package,
        ecosystem: Ecosystem,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            ecosystem,
            name: name.into(),
            version: version.into(),
            depth: parent.depth + 1,
            parent_id: Some(parent.id()),
            manifest_id: parent.manifest_id.clone(),
            insight: None,
        }
    }

    /// `pkg:생태계/이름@버전` 형태의 짧은 표기를 반환합니다.
    pub fn short_name(&self) -> String {
        format!(
            "pkg:{}/{}@{}",
            self.ecosystem.purl_type(),
            self.name.to_lowercase(),
            self.version,
        )
    }

    /// 악성 판정 여부를 반환합니다.
    pub fn is_malware(&self) -> bool {
        self.insight.as_ref().is_some_and(|i| i.malware)
    }

    /// 의심 패키지 판정 여부를 반환합니다.
    pub fn is_suspicious(&self) -> bool {
        self.insight.as_ref().is_some_and(|i| i.suspicious)
    }
}

impl Identify for Package {
    /// 매니페스트 내에서 패키지를 유일하게 식별합니다.
    ///
    /// `(ecosystem, name, version)`을 소문자로 정규화한 튜플의 해시이며
    /// 실행 간 재현 가능합니다.
    fn id(&self) -> String {
        hashed_id(&format!(
            "{}/{}/{}",
            self.ecosystem.to_string().to_lowercase(),
            self.name.to_lowercase(),
            self.version.to_lowercase(),
        ))
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.name, self.version, self.ecosystem)
    }
}

// ─── Manifest source ─────────────────────────────────────────────────

/// 매니페스트 발견 경로의 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestSourceType {
    /// 로컬 파일시스템
    Local,
    /// 원격 git 저장소
    GitRepository,
    /// 패키지 레지스트리 (purl 단일 패키지 조회 등)
    Registry,
    /// 합성 매니페스트 (테스트, 단일 패키지 대상)
    Synthetic,
}

impl fmt::Display for ManifestSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::GitRepository => write!(f, "git_repository"),
            Self::Registry => write!(f, "registry"),
            Self::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// 매니페스트 출처 메타데이터
///
/// 같은 매니페스트라도 로컬 디렉토리, git 저장소, 레지스트리 등
/// 서로 다른 경로로 발견될 수 있으므로 출처 정보를 별도로 보존합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestSource {
    /// 출처 유형
    pub source_type: ManifestSourceType,
    /// 출처 네임스페이스 (로컬이면 디렉토리, git이면 저장소 URL)
    pub namespace: String,
    /// 네임스페이스 상대 경로
    pub path: String,
    /// 표시 경로 재정의 (설정 시 우선)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_path: Option<String>,
}

impl ManifestSource {
    /// 사용자에게 보여줄 경로를 반환합니다.
    ///
    /// 재정의가 있으면 그것을, 로컬/레지스트리 출처는 네임스페이스와
    /// 상대 경로를 합친 값을 사용합니다.
    pub fn display_path(&self) -> String {
        if let Some(display) = &self.display_path {
            return display.clone();
        }

        match self.source_type {
            ManifestSourceType::Local | ManifestSourceType::Registry => Path::new(&self.namespace)
                .join(&self.path)
                .display()
                .to_string(),
            ManifestSourceType::GitRepository | ManifestSourceType::Synthetic => {
                format!("{}/{}", self.namespace, self.path)
            }
        }
    }
}

// ─── PackageManifest ─────────────────────────────────────────────────

/// 패키지 매니페스트
///
/// 하나의 스캔 소스(lockfile, SBOM, 합성 대상)에서 발견된 패키지
/// 목록과 그 의존성 그래프를 소유합니다. 패키지 순서는 발견 순서를
/// 따르며 그래프 순서와는 무관합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// 매니페스트 출처
    pub source: ManifestSource,
    /// 파일시스템(또는 출처 내) 경로
    pub path: String,
    /// 매니페스트 해석 생태계
    pub ecosystem: Ecosystem,
    /// 발견 순서대로의 패키지 목록
    pub packages: Vec<Package>,
    /// 의존성 그래프 (구조 정보가 있으면 `present == true`)
    pub dependency_graph: DependencyGraph<Package>,
}

impl PackageManifest {
    fn with_source(source: ManifestSource, path: impl Into<String>, ecosystem: Ecosystem) -> Self {
        Self {
            source,
            path: path.into(),
            ecosystem,
            packages: Vec::new(),
            dependency_graph: DependencyGraph::new(),
        }
    }

    /// 로컬 파일 경로에서 매니페스트를 생성합니다.
    pub fn from_local(path: impl Into<String>, ecosystem: Ecosystem) -> Self {
        let path = path.into();
        let p = Path::new(&path);
        let namespace = p
            .parent()
            .map(|d| d.display().to_string())
            .unwrap_or_default();
        let file = p
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());

        Self::with_source(
            ManifestSource {
                source_type: ManifestSourceType::Local,
                namespace,
                path: file,
                display_path: None,
            },
            path,
            ecosystem,
        )
    }

    /// git 저장소에서 발견된 매니페스트를 생성합니다.
    pub fn from_git_repository(
        repo: impl Into<String>,
        repo_relative_path: impl Into<String>,
        real_path: impl Into<String>,
        ecosystem: Ecosystem,
    ) -> Self {
        Self::with_source(
            ManifestSource {
                source_type: ManifestSourceType::GitRepository,
                namespace: repo.into(),
                path: repo_relative_path.into(),
                display_path: None,
            },
            real_path,
            ecosystem,
        )
    }

    /// 합성(단일 패키지, 테스트) 매니페스트를 생성합니다.
    pub fn synthetic(name: impl Into<String>, ecosystem: Ecosystem) -> Self {
        let name = name.into();
        Self::with_source(
            ManifestSource {
                source_type: ManifestSourceType::Synthetic,
                namespace: "synthetic".to_owned(),
                path: name.clone(),
                display_path: None,
            },
            name,
            ecosystem,
        )
    }

    /// 표시 경로 재정의를 설정합니다.
    pub fn set_display_path(&mut self, path: impl Into<String>) {
        self.source.display_path = Some(path.into());
    }

    /// 사용자에게 보여줄 경로를 반환합니다.
    pub fn display_path(&self) -> String {
        self.source.display_path()
    }

    /// 패키지를 매니페스트에 추가합니다.
    ///
    /// 매니페스트 역참조를 설정하고 그래프에 노드를 등록합니다.
    /// 구조(간선) 정보는 파서 또는 [`add_transitive`](Self::add_transitive)가
    /// 별도로 채웁니다.
    pub fn add_package(&mut self, mut pkg: Package) {
        if pkg.manifest_id.is_none() {
            pkg.manifest_id = Some(self.id());
        }

        self.dependency_graph.add_node(pkg.clone());
        self.packages.push(pkg);
    }

    /// 보강 과정에서 발견된 전이 의존성을 추가합니다.
    ///
    /// 패키지 목록과 그래프 노드를 추가하고, 부모 패키지가 이 매니페스트에
    /// 존재하면 부모 -> 자식 간선을 만듭니다.
    pub fn add_transitive(&mut self, mut pkg: Package) {
        if pkg.manifest_id.is_none() {
            pkg.manifest_id = Some(self.id());
        }

        let parent = pkg
            .parent_id
            .as_ref()
            .and_then(|pid| self.packages.iter().find(|p| p.id() == *pid).cloned());

        match parent {
            Some(parent) => self.dependency_graph.add_dependency(&parent, &pkg),
            None => self.dependency_graph.add_node(pkg.clone()),
        }

        self.packages.push(pkg);
    }

    /// 보강 완료된 패키지 사본을 동일 식별자 항목에 되반영합니다.
    ///
    /// 패키지 목록과 그래프 노드 데이터가 함께 갱신됩니다.
    /// 식별자가 없으면 아무 일도 하지 않습니다.
    pub fn replace_package(&mut self, pkg: Package) {
        let id = pkg.id();
        if let Some(existing) = self.packages.iter_mut().find(|p| p.id() == id) {
            *existing = pkg.clone();
        }
        self.dependency_graph.set_node_data(&id, pkg);
    }

    /// 패키지에 보강 결과를 부착합니다.
    pub fn attach_insight(&mut self, package_id: &str, insight: PackageInsight) {
        if let Some(pkg) = self.packages.iter_mut().find(|p| p.id() == package_id) {
            pkg.insight = Some(insight.clone());
            let updated = pkg.clone();
            self.dependency_graph.set_node_data(package_id, updated);
        }
    }

    /// 매니페스트의 패키지 목록을 반환합니다.
    ///
    /// 그래프에 구조 정보가 있으면 그래프 노드를, 없으면 평탄한
    /// 패키지 목록을 사용합니다.
    pub fn get_packages(&self) -> Vec<Package> {
        if self.dependency_graph.present() {
            return self.dependency_graph.nodes();
        }

        self.packages.clone()
    }

    /// 패키지 수를 반환합니다.
    pub fn package_count(&self) -> usize {
        self.get_packages().len()
    }

    /// 식별자로 패키지를 검색합니다.
    pub fn find_package(&self, package_id: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.id() == package_id)
    }
}

impl Identify for PackageManifest {
    fn id(&self) -> String {
        hashed_id(&format!("{}/{}", self.ecosystem, self.path))
    }
}

impl fmt::Display for PackageManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PackageManifest({}, {} packages, ecosystem={})",
            self.display_path(),
            self.packages.len(),
            self.ecosystem,
        )
    }
}
