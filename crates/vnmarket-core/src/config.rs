//! 설정 관리.
//!
//! TOML 파일 + `VNMARKET__` 접두사 환경 변수로 로드합니다.
//! 모든 섹션은 기본값을 가지므로 설정 파일이 없어도 동작합니다.
//!
//! ```text
//! VNMARKET__BREADTH__CONCURRENCY=10
//! VNMARKET__UPDATER__OVERLAP_DAYS=7
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::CoreResult;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// 캐시 저장소 설정
    pub cache: CacheConfig,
    /// 증분 업데이트 설정
    pub updater: UpdaterConfig,
    /// breadth 분석 설정
    pub breadth: BreadthConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
}

/// 캐시 저장소 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// SQLite 가격 캐시 파일 경로
    pub database_path: PathBuf,
    /// breadth 결과 캐시(JSON) 파일 경로
    pub breadth_cache_path: PathBuf,
    /// 최대 연결 수
    pub max_connections: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/ohlcv_cache.db"),
            breadth_cache_path: PathBuf::from("data/breadth_cache.json"),
            max_connections: 8,
        }
    }
}

impl CacheConfig {
    /// sqlx 연결 문자열 (`sqlite://...?mode=rwc`).
    pub fn database_url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.database_path.display())
    }
}

/// 증분 업데이트 설정.
///
/// `fresh_within_hours`와 `overlap_days`는 휴장일 달력이 다른 시장에
/// 맞출 수 있도록 설정으로 노출합니다.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// 캐시가 없을 때 가져올 기간 (일)
    pub lookback_days: i64,
    /// 증분 요청 시 마지막 캐시 날짜 이전으로 겹쳐 받을 일수
    pub overlap_days: i64,
    /// 마지막 갱신 후 이 시간 이내면 요청 생략
    pub fresh_within_hours: i64,
    /// 배치 크기 (배치마다 긴 휴지)
    pub batch_size: usize,
    /// 요청 간 지연 (밀리초)
    pub request_delay_ms: u64,
    /// 배치 간 휴지 (초)
    pub batch_pause_secs: u64,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            lookback_days: 5 * 365,
            overlap_days: 5,
            fresh_within_hours: 24,
            batch_size: 50,
            request_delay_ms: 500,
            batch_pause_secs: 10,
        }
    }
}

impl UpdaterConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_secs(self.batch_pause_secs)
    }
}

/// breadth 분석 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreadthConfig {
    /// 최소 거래대금 (VND)
    pub min_trading_value: u64,
    /// 동시 분석 종목 수
    pub concurrency: usize,
    /// 종목당 타임아웃 (초)
    pub symbol_timeout_secs: u64,
    /// 분석에 필요한 최소 봉 수
    pub min_history: usize,
    /// 결과 캐시 TTL (분)
    pub cache_ttl_minutes: i64,
    /// 이력 계산 기간 (일)
    pub history_days: i64,
    /// 이력 계산 시 일자별 최소 종목 수
    pub history_min_stocks: usize,
}

impl Default for BreadthConfig {
    fn default() -> Self {
        Self {
            min_trading_value: 3_000_000_000,
            concurrency: 20,
            symbol_timeout_secs: 5,
            min_history: 20,
            cache_ttl_minutes: 60,
            history_days: 365,
            history_min_stocks: 10,
        }
    }
}

impl BreadthConfig {
    pub fn min_trading_value(&self) -> Decimal {
        Decimal::from(self.min_trading_value)
    }

    pub fn symbol_timeout(&self) -> Duration {
        Duration::from_secs(self.symbol_timeout_secs)
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cache_ttl_minutes)
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없으면 기본값 + 환경 변수만 사용합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("VNMARKET")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> CoreResult<Self> {
        Self::load("config/default.toml")
    }
}
