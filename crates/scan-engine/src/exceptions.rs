//! 예외(허용 목록) 저장소 -- 규칙 로딩, 만료 처리, 패키지 매칭
//!
//! [`ExceptionStore`]는 스캔 결과에서 제외할 패키지 규칙을 보관합니다.
//! 스캐너마다 독립적인 저장소 인스턴스를 주입받으며, 전역 상태를 두지 않습니다.
//!
//! # 규칙 파일 형식 (JSON)
//!
//! ```json
//! {
//!   "exceptions": [
//!     {
//!       "id": "EXC-2026-001",
//!       "ecosystem": "npm",
//!       "name": "left-pad",
//!       "version": "*",
//!       "expires": "2026-12-31T00:00:00Z"
//!     }
//!   ]
//! }
//! ```
//!
//! # 매칭 규칙
//!
//! - 생태계와 패키지 이름은 대소문자 무시 비교
//! - `version`이 `"*"`이거나 생략되면 모든 버전, 아니면 정확 일치
//! - `expires`가 지난 규칙은 로드 시점에 걸러짐

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use depscan_core::metrics as m;
use depscan_core::types::{Package, PackageManifest, hashed_id};

use crate::error::ScanEngineError;

/// 만료 판정 여유 시간 (초)
///
/// 스캔 도중 만료가 지나가는 규칙이 패키지마다 다르게 적용되는 것을 막기 위해
/// 만료까지 이 시간 미만으로 남은 규칙은 로드 시점에 이미 만료된 것으로 취급합니다.
const EXPIRY_JITTER_SECS: i64 = 5;

/// 예외 규칙 하나
///
/// 특정 생태계/패키지(및 선택적으로 버전)를 스캔 결과에서 제외합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionRule {
    /// 규칙 식별자 (예: 내부 티켓 번호)
    pub id: String,
    /// 대상 생태계 (예: "npm", "cargo")
    pub ecosystem: String,
    /// 대상 패키지 이름
    pub name: String,
    /// 버전 범위: `"*"` 또는 정확한 버전. 생략 시 모든 버전
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// 규칙 만료 시각 (RFC-3339)
    pub expires: DateTime<Utc>,
}

impl ExceptionRule {
    /// 저장소 조회에 쓰이는 복합 키를 반환합니다.
    ///
    /// 생태계와 이름을 소문자로 정규화한 뒤 해시합니다. 버전은 키에
    /// 포함되지 않으며 [`ExceptionStore::apply`]에서 별도로 평가됩니다.
    pub fn key(&self) -> String {
        hashed_id(&format!(
            "{}/{}",
            self.ecosystem.to_lowercase(),
            self.name.to_lowercase()
        ))
    }

    /// 규칙이 이미 만료되었는지 판정합니다.
    ///
    /// 만료까지 `EXPIRY_JITTER_SECS` 미만 남은 규칙도 만료로 봅니다.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires < now + Duration::seconds(EXPIRY_JITTER_SECS)
    }

    /// 패키지 버전이 규칙의 버전 범위에 들어가는지 확인합니다.
    fn matches_version(&self, version: &str) -> bool {
        match self.version.as_deref() {
            None | Some("*") => true,
            Some(v) => v == version,
        }
    }
}

/// [`ExceptionStore::apply`] 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExceptionMatch {
    /// 일치하는 규칙 있음
    Matched {
        /// 일치한 규칙 id
        rule_id: String,
    },
    /// 일치하는 규칙 없음
    None,
}

impl ExceptionMatch {
    /// 일치 여부를 반환합니다.
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

/// 예외 규칙 소스
///
/// [`ExceptionStore::load`]가 규칙을 하나씩 당겨오는 데 사용합니다.
/// `Ok(None)`은 소스의 끝을 의미하며 에러와 구분됩니다.
pub trait ExceptionsLoader {
    /// 다음 규칙을 반환합니다. 더 이상 없으면 `Ok(None)`.
    fn read(&mut self) -> Result<Option<ExceptionRule>, ScanEngineError>;
}

/// 예외 규칙 저장소
///
/// 복합 키(생태계/이름)로 인덱싱된 규칙 집합을 보유합니다.
/// [`load`](Self::load) 동안에만 쓰기가 일어나고 이후에는 읽기 전용입니다.
#[derive(Debug, Default)]
pub struct ExceptionStore {
    /// 복합 키 → 해당 키의 활성 규칙 목록
    rules: HashMap<String, Vec<ExceptionRule>>,
}

impl ExceptionStore {
    /// 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 로더에서 규칙을 모두 읽어 저장소에 반영합니다.
    ///
    /// - 만료된 규칙은 건너뛰고 경고 로그를 남깁니다.
    /// - 같은 복합 키 아래 같은 id가 이미 있으면 건너뜁니다.
    /// - 로더가 에러를 반환하면 이번 호출에서 읽은 규칙은 하나도 반영되지
    ///   않은 채 에러를 그대로 돌려줍니다.
    ///
    /// 반환값은 이번 호출로 새로 저장된 규칙 수입니다.
    pub fn load(&mut self, loader: &mut dyn ExceptionsLoader) -> Result<usize, ScanEngineError> {
        let now = Utc::now();
        let mut staged: HashMap<String, Vec<ExceptionRule>> = HashMap::new();
        let mut stored = 0usize;

        while let Some(rule) = loader.read()? {
            if rule.is_expired(now) {
                tracing::warn!(
                    rule_id = %rule.id,
                    ecosystem = %rule.ecosystem,
                    package = %rule.name,
                    expires = %rule.expires.to_rfc3339(),
                    "skipping expired exception rule"
                );
                metrics::counter!(m::EXCEPTIONS_RULES_EXPIRED_TOTAL).increment(1);
                continue;
            }

            let key = rule.key();
            let existing = self.rules.get(&key);
            let duplicate = existing
                .into_iter()
                .flatten()
                .chain(staged.get(&key).into_iter().flatten())
                .any(|r| r.id == rule.id);
            if duplicate {
                tracing::debug!(rule_id = %rule.id, "skipping duplicate exception rule");
                continue;
            }

            staged.entry(key).or_default().push(rule);
            stored += 1;
        }

        for (key, mut rules) in staged {
            self.rules.entry(key).or_default().append(&mut rules);
        }

        metrics::gauge!(m::EXCEPTIONS_RULES_ACTIVE).set(self.active_count() as f64);
        tracing::info!(stored, total = self.active_count(), "exception rules loaded");
        Ok(stored)
    }

    /// 패키지에 일치하는 예외 규칙을 찾습니다.
    pub fn apply(&self, pkg: &Package) -> ExceptionMatch {
        let key = hashed_id(&format!(
            "{}/{}",
            pkg.ecosystem.to_string().to_lowercase(),
            pkg.name.to_lowercase()
        ));

        let Some(rules) = self.rules.get(&key) else {
            return ExceptionMatch::None;
        };

        for rule in rules {
            if rule.ecosystem.eq_ignore_ascii_case(&pkg.ecosystem.to_string())
                && rule.name.eq_ignore_ascii_case(&pkg.name)
                && rule.matches_version(&pkg.version)
            {
                return ExceptionMatch::Matched {
                    rule_id: rule.id.clone(),
                };
            }
        }

        ExceptionMatch::None
    }

    /// 매니페스트의 패키지 중 예외에 걸리지 않는 것만 핸들러로 전달합니다.
    ///
    /// 예외에 걸린 패키지는 디버그 로그만 남기고 건너뜁니다.
    /// 핸들러가 에러를 반환하면 순회를 중단하고 그대로 전파합니다.
    ///
    /// 반환값은 예외로 걸러진 패키지 수입니다.
    pub fn allowed_packages(
        &self,
        manifest: &PackageManifest,
        handler: &mut dyn FnMut(Package) -> Result<(), ScanEngineError>,
    ) -> Result<usize, ScanEngineError> {
        let mut suppressed = 0usize;

        for pkg in manifest.get_packages() {
            match self.apply(&pkg) {
                ExceptionMatch::Matched { rule_id } => {
                    tracing::debug!(
                        package = %pkg.short_name(),
                        rule_id = %rule_id,
                        "package suppressed by exception rule"
                    );
                    suppressed += 1;
                }
                ExceptionMatch::None => handler(pkg)?,
            }
        }

        Ok(suppressed)
    }

    /// 저장소에 있는 활성 규칙 수를 반환합니다.
    pub fn active_count(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }
}

/// 예외 규칙 파일의 최상위 JSON 형태
#[derive(Debug, Deserialize)]
struct ExceptionsFile {
    exceptions: Vec<ExceptionRule>,
}

/// JSON 파일 기반 예외 규칙 로더
///
/// 생성 시점에 파일 전체를 읽고 파싱하므로, 손상된 파일은
/// [`ExceptionStore::load`]에 도달하기 전에 실패합니다.
pub struct FileExceptionsLoader {
    /// 아직 반환하지 않은 규칙 (역순 보관, pop으로 순서 유지)
    remaining: Vec<ExceptionRule>,
}

impl FileExceptionsLoader {
    /// 파일을 읽고 파싱하여 로더를 생성합니다.
    pub fn new(path: &str) -> Result<Self, ScanEngineError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ScanEngineError::ExceptionLoad {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
        Self::from_json(&contents)
    }

    /// JSON 문자열에서 로더를 생성합니다 (테스트용).
    pub fn from_json(json: &str) -> Result<Self, ScanEngineError> {
        let file: ExceptionsFile = serde_json::from_str(json).map_err(|e| {
            ScanEngineError::ExceptionParse(format!("failed to parse exceptions JSON: {e}"))
        })?;

        let mut remaining = file.exceptions;
        remaining.reverse();
        Ok(Self { remaining })
    }
}

impl ExceptionsLoader for FileExceptionsLoader {
    fn read(&mut self) -> Result<Option<ExceptionRule>, ScanEngineError> {
        Ok(self.remaining.pop())
    }
}
