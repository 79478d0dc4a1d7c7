//! 설정 모듈.
//!
//! 공통 설정(`AppConfig`)은 TOML + `VNMARKET__*` 환경변수에서 읽고,
//! collector 전용 값(가격 소스 경로, 데몬 주기)은 `.env`/환경변수에서 읽습니다.

use crate::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vnmarket_core::AppConfig;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 공통 설정 (캐시, 업데이터, breadth, 로깅)
    pub app: AppConfig,
    /// SQLite URL. `DATABASE_URL`이 있으면 캐시 경로 설정보다 우선합니다.
    pub database_url: String,
    /// 가격 소스 설정
    pub source: SourceConfig,
    /// 데몬 모드 설정
    pub daemon: DaemonConfig,
}

/// 가격 소스 설정
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// `<SYMBOL>.csv` 내보내기 디렉터리
    pub csv_dir: PathBuf,
    /// 주 소스가 실패하거나 비었을 때 사용할 디렉터리
    pub fallback_dir: Option<PathBuf>,
    /// 소스 호출 간 최소 간격 (밀리초)
    pub min_interval_ms: u64,
}

/// 데몬 모드 설정
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// 워크플로우 실행 주기 (분 단위)
    pub interval_minutes: u64,
}

impl CollectorConfig {
    /// 설정 파일과 환경변수에서 설정 로드
    pub fn load(config_path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();

        let app = AppConfig::load(config_path)?;
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| app.cache.database_url());

        Ok(Self {
            database_url,
            source: SourceConfig {
                csv_dir: std::env::var("PRICE_CSV_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("data/prices")),
                fallback_dir: std::env::var("PRICE_FALLBACK_DIR").ok().map(PathBuf::from),
                min_interval_ms: env_var_parse("PRICE_SOURCE_MIN_INTERVAL_MS", 500),
            },
            daemon: DaemonConfig {
                interval_minutes: env_var_parse("DAEMON_INTERVAL_MINUTES", 60),
            },
            app,
        })
    }
}

impl SourceConfig {
    /// 소스 호출 간 최소 간격을 Duration으로 반환
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

impl DaemonConfig {
    /// 워크플로우 실행 주기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.max(1) * 60)
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_parse_falls_back_on_garbage() {
        std::env::set_var("VNMARKET_COLLECTOR_TEST_PARSE", "not-a-number");
        assert_eq!(env_var_parse("VNMARKET_COLLECTOR_TEST_PARSE", 7u64), 7);
        assert_eq!(env_var_parse("VNMARKET_COLLECTOR_TEST_MISSING", 3u64), 3);
    }

    #[test]
    fn test_daemon_interval_has_floor() {
        let daemon = DaemonConfig {
            interval_minutes: 0,
        };
        assert_eq!(daemon.interval(), Duration::from_secs(60));
    }
}
