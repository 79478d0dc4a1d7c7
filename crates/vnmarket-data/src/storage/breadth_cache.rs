//! breadth 결과 캐시 (단일 슬롯 JSON 파일).
//!
//! 수백 종목 분석을 UI 새로고침마다 반복하지 않도록 마지막 집계 하나만
//! `{created_at, stats}` 형태로 저장합니다. 저장은 쓰기마다 고유한 임시
//! 파일에 쓴 뒤 rename 하므로 읽는 쪽이 반쯤 쓰인 파일을 보지 않고,
//! 동시 저장은 마지막 rename이 남습니다.

use crate::error::{DataError, Result};
use chrono::Duration;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use vnmarket_core::{BreadthSnapshot, BreadthStats, Clock};

/// breadth 결과 캐시.
#[derive(Clone)]
pub struct BreadthResultCache {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl BreadthResultCache {
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 현재 시각으로 스냅샷을 저장합니다 (이전 스냅샷 덮어씀).
    pub async fn save(&self, stats: BreadthStats) -> Result<BreadthSnapshot> {
        let snapshot = BreadthSnapshot::new(self.clock.now(), stats);
        self.save_snapshot(&snapshot).await?;
        Ok(snapshot)
    }

    /// 주어진 스냅샷을 그대로 저장합니다.
    pub async fn save_snapshot(&self, snapshot: &BreadthSnapshot) -> Result<()> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &json))
            .await
            .map_err(|e| DataError::CacheError(format!("결과 캐시 저장 task 실패: {}", e)))??;

        debug!(
            path = %self.path.display(),
            analyzed = snapshot.stats.total_analyzed,
            "breadth 결과 캐시 저장"
        );
        Ok(())
    }

    /// `max_age` 이내의 스냅샷을 반환합니다.
    ///
    /// 파일이 없거나 만료되었거나 손상되었으면 `None`.
    pub async fn load(&self, max_age: Duration) -> Result<Option<BreadthSnapshot>> {
        let Some(snapshot) = self.read().await? else {
            return Ok(None);
        };

        if snapshot.is_expired(self.clock.now(), max_age) {
            debug!(created_at = %snapshot.created_at, "breadth 결과 캐시 만료");
            return Ok(None);
        }
        Ok(Some(snapshot))
    }

    /// 만료 여부와 무관하게 저장된 스냅샷을 읽습니다.
    pub async fn read(&self) -> Result<Option<BreadthSnapshot>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<BreadthSnapshot>(&bytes) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "손상된 breadth 결과 캐시 무시");
                Ok(None)
            }
        }
    }

    /// 캐시 파일 삭제. 삭제했으면 `true`.
    pub async fn clear(&self) -> Result<bool> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// 같은 디렉터리의 고유 임시 파일에 쓰고 `path`로 rename 합니다.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
