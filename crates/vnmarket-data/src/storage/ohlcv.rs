//! OHLCV 가격 캐시 (SQLite).
//!
//! (symbol, date, resolution) 단위로 봉을 저장하고 (symbol, resolution) 단위로
//! 메타데이터를 관리합니다.
//!
//! # 동시성
//!
//! - 읽기는 제한 없이 병렬로 수행됩니다.
//! - `put`/`clear`는 같은 (종목, 해상도) 키에 대해 직렬화되며, 봉 upsert와
//!   메타데이터 갱신은 하나의 트랜잭션에서 커밋됩니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use vnmarket_data::PriceStore;
//!
//! let store = PriceStore::connect("sqlite://data/ohlcv_cache.db?mode=rwc", 8).await?;
//! store.put("VNM", Resolution::Daily, &bars).await?;
//! let bars = store.get("VNM", None, None, Resolution::Daily).await?;
//! ```

use crate::error::{DataError, Result};
use crate::locks::KeyedLocks;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use vnmarket_core::{CacheMetadata, Clock, OhlcvBar, Resolution, SystemClock};

/// 한 INSERT 문에 넣을 최대 봉 수 (9 바인딩 × 100).
const UPSERT_CHUNK: usize = 100;

/// OHLCV 봉 데이터베이스 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct OhlcvRecord {
    pub symbol: String,
    pub resolution: String,
    pub date: NaiveDate,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: i64,
}

impl OhlcvRecord {
    /// 도메인 객체로 변환.
    ///
    /// 가격 문자열이 Decimal로 파싱되지 않으면 `InvalidData`.
    pub fn to_bar(&self) -> Result<OhlcvBar> {
        let parse = |field: &str, raw: &str| -> Result<Decimal> {
            Decimal::from_str(raw).map_err(|e| {
                DataError::InvalidData(format!(
                    "{} {} {}={:?}: {}",
                    self.symbol, self.date, field, raw, e
                ))
            })
        };

        let volume = u64::try_from(self.volume).map_err(|_| {
            DataError::InvalidData(format!(
                "{} {} volume={}: 음수 거래량",
                self.symbol, self.date, self.volume
            ))
        })?;

        Ok(OhlcvBar {
            symbol: self.symbol.clone(),
            date: self.date,
            resolution: self.resolution.parse()?,
            open: parse("open", &self.open)?,
            high: parse("high", &self.high)?,
            low: parse("low", &self.low)?,
            close: parse("close", &self.close)?,
            volume,
        })
    }
}

/// 캐시 메타데이터 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct OhlcvMetadataRecord {
    pub symbol: String,
    pub resolution: String,
    pub last_update: DateTime<Utc>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub record_count: i64,
}

impl OhlcvMetadataRecord {
    pub fn to_metadata(&self) -> Result<CacheMetadata> {
        Ok(CacheMetadata {
            symbol: self.symbol.clone(),
            resolution: self.resolution.parse()?,
            last_update: self.last_update,
            start_date: self.start_date,
            end_date: self.end_date,
            record_count: self.record_count.max(0) as u64,
        })
    }
}

/// 메타데이터와 실제 행 수 비교 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityStatus {
    /// 메타데이터 없음 (캐시되지 않음)
    Missing,
    /// 일치
    Consistent { count: u64 },
    /// 불일치 (증분 병합 손상)
    Mismatch { recorded: u64, actual: u64 },
}

impl IntegrityStatus {
    pub fn is_consistent(&self) -> bool {
        matches!(self, IntegrityStatus::Consistent { .. })
    }
}

/// 전체 캐시 통계.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// 메타데이터가 있는 종목 수 (해상도 무관)
    pub symbol_count: u64,
    /// 저장된 전체 봉 수
    pub total_bars: u64,
    /// 가장 최근 봉 날짜
    pub latest_date: Option<NaiveDate>,
    /// 최근 갱신된 메타데이터
    pub recent: Vec<CacheMetadata>,
}

/// OHLCV 가격 캐시 저장소.
///
/// 복제 비용이 싸며(내부 `Arc`), 여러 작업에서 같은 핸들을 공유합니다.
#[derive(Clone)]
pub struct PriceStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    write_locks: KeyedLocks,
}

impl PriceStore {
    /// 기존 풀로 저장소 생성 (마이그레이션은 호출자가 실행).
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            clock,
            write_locks: KeyedLocks::new(),
        }
    }

    /// 파일 DB에 연결하고 마이그레이션을 적용합니다.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        Self::connect_with_clock(database_url, max_connections, Arc::new(SystemClock)).await
    }

    pub async fn connect_with_clock(
        database_url: &str,
        max_connections: u32,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| DataError::ConfigError(format!("{}: {}", database_url, e)))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        let store = Self::new(pool, clock);
        store.migrate().await?;

        info!(url = %database_url, "가격 캐시 연결 완료");
        Ok(store)
    }

    /// 인메모리 DB (테스트용).
    ///
    /// 연결마다 별도 DB가 생기므로 연결은 하나만 유지합니다.
    pub async fn in_memory(clock: Arc<dyn Clock>) -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| DataError::ConfigError(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        let store = Self::new(pool, clock);
        store.migrate().await?;
        Ok(store)
    }

    /// 스키마 마이그레이션 적용.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// 내부 풀 (진단/테스트용).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// 봉 upsert + 메타데이터 갱신.
    ///
    /// 같은 날짜의 봉은 OHLCV를 덮어씁니다. 메타데이터는 같은 트랜잭션 안에서
    /// 실제 행을 다시 집계하여 기록하므로 `record_count`는 항상 실제 행 수와
    /// 같습니다. 빈 입력은 아무것도 바꾸지 않습니다.
    ///
    /// 다른 키의 봉, 음수 가격, 고가 < 저가, `i64` 범위를 넘는 거래량이 하나라도
    /// 있으면 아무것도 쓰지 않고 `InvalidData`를 반환합니다.
    ///
    /// 반환값은 갱신 후 저장된 전체 봉 수입니다.
    #[instrument(skip(self, bars), fields(count = bars.len()))]
    pub async fn put(&self, symbol: &str, resolution: Resolution, bars: &[OhlcvBar]) -> Result<u64> {
        if bars.is_empty() {
            return Ok(self.count_bars(symbol, resolution).await?);
        }

        let mut volumes = Vec::with_capacity(bars.len());
        for bar in bars {
            if bar.symbol != symbol || bar.resolution != resolution {
                return Err(DataError::InvalidData(format!(
                    "{}:{} 저장 요청에 다른 키의 봉 포함: {}:{} {}",
                    symbol, resolution, bar.symbol, bar.resolution, bar.date
                )));
            }
            bar.validate()?;
            let volume = i64::try_from(bar.volume).map_err(|_| {
                DataError::InvalidData(format!(
                    "{} {}: 거래량 범위 초과 ({})",
                    symbol, bar.date, bar.volume
                ))
            })?;
            volumes.push(volume);
        }

        let _guard = self.write_locks.acquire(symbol, resolution).await;
        let now = self.clock.now();
        let res = resolution.as_str();

        let mut tx = self.pool.begin().await?;

        let chunks = bars.chunks(UPSERT_CHUNK).zip(volumes.chunks(UPSERT_CHUNK));
        for (chunk, chunk_volumes) in chunks {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO ohlcv_bars \
                 (symbol, resolution, date, open, high, low, close, volume, updated_at) ",
            );
            builder.push_values(chunk.iter().zip(chunk_volumes), |mut row, (bar, volume)| {
                row.push_bind(symbol)
                    .push_bind(res)
                    .push_bind(bar.date)
                    .push_bind(bar.open.to_string())
                    .push_bind(bar.high.to_string())
                    .push_bind(bar.low.to_string())
                    .push_bind(bar.close.to_string())
                    .push_bind(*volume)
                    .push_bind(now);
            });
            builder.push(
                " ON CONFLICT (symbol, resolution, date) DO UPDATE SET \
                 open = excluded.open, \
                 high = excluded.high, \
                 low = excluded.low, \
                 close = excluded.close, \
                 volume = excluded.volume, \
                 updated_at = excluded.updated_at",
            );

            builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| DataError::InsertError(e.to_string()))?;
        }

        sqlx::query(
            r#"
            INSERT INTO ohlcv_metadata
                (symbol, resolution, last_update, start_date, end_date, record_count)
            SELECT ?, ?, ?, MIN(date), MAX(date), COUNT(*)
            FROM ohlcv_bars
            WHERE symbol = ? AND resolution = ?
            ON CONFLICT (symbol, resolution) DO UPDATE SET
                last_update = excluded.last_update,
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                record_count = excluded.record_count
            "#,
        )
        .bind(symbol)
        .bind(res)
        .bind(now)
        .bind(symbol)
        .bind(res)
        .execute(&mut *tx)
        .await
        .map_err(|e| DataError::InsertError(format!("메타데이터 갱신 실패: {}", e)))?;

        let (record_count,): (i64,) = sqlx::query_as(
            "SELECT record_count FROM ohlcv_metadata WHERE symbol = ? AND resolution = ?",
        )
        .bind(symbol)
        .bind(res)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            symbol = symbol,
            resolution = res,
            upserted = bars.len(),
            record_count = record_count,
            "봉 데이터 캐시에 저장"
        );

        Ok(record_count.max(0) as u64)
    }

    /// 메타데이터의 `last_update`만 현재 시각으로 갱신합니다.
    ///
    /// 새 봉이 없는 증분 요청 후 같은 구간을 반복 요청하지 않기 위해 사용합니다.
    /// 메타데이터가 없으면 아무것도 하지 않고 `false`.
    pub async fn touch(&self, symbol: &str, resolution: Resolution) -> Result<bool> {
        let _guard = self.write_locks.acquire(symbol, resolution).await;
        let result = sqlx::query(
            "UPDATE ohlcv_metadata SET last_update = ? WHERE symbol = ? AND resolution = ?",
        )
        .bind(self.clock.now())
        .bind(symbol)
        .bind(resolution.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// 날짜 오름차순 봉 조회.
    ///
    /// 범위는 양 끝 포함. 캐시가 없으면 빈 Vec.
    #[instrument(skip(self))]
    pub async fn get(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        resolution: Resolution,
    ) -> Result<Vec<OhlcvBar>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT symbol, resolution, date, open, high, low, close, volume \
             FROM ohlcv_bars WHERE symbol = ",
        );
        builder.push_bind(symbol);
        builder.push(" AND resolution = ");
        builder.push_bind(resolution.as_str());
        if let Some(start) = start {
            builder.push(" AND date >= ");
            builder.push_bind(start);
        }
        if let Some(end) = end {
            builder.push(" AND date <= ");
            builder.push_bind(end);
        }
        builder.push(" ORDER BY date ASC");

        let records: Vec<OhlcvRecord> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DataError::QueryError(e.to_string()))?;

        records.iter().map(OhlcvRecord::to_bar).collect()
    }

    /// 해상도의 전체 종목 봉을 `start` 이후로 조회합니다 (종목, 날짜 순).
    pub async fn get_all_since(
        &self,
        resolution: Resolution,
        start: NaiveDate,
    ) -> Result<Vec<OhlcvBar>> {
        let records: Vec<OhlcvRecord> = sqlx::query_as(
            r#"
            SELECT symbol, resolution, date, open, high, low, close, volume
            FROM ohlcv_bars
            WHERE resolution = ? AND date >= ?
            ORDER BY symbol ASC, date ASC
            "#,
        )
        .bind(resolution.as_str())
        .bind(start)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DataError::QueryError(e.to_string()))?;

        records.iter().map(OhlcvRecord::to_bar).collect()
    }

    /// 캐시 메타데이터 조회.
    pub async fn metadata(
        &self,
        symbol: &str,
        resolution: Resolution,
    ) -> Result<Option<CacheMetadata>> {
        let record: Option<OhlcvMetadataRecord> = sqlx::query_as(
            r#"
            SELECT symbol, resolution, last_update, start_date, end_date, record_count
            FROM ohlcv_metadata
            WHERE symbol = ? AND resolution = ?
            "#,
        )
        .bind(symbol)
        .bind(resolution.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DataError::QueryError(e.to_string()))?;

        record.as_ref().map(OhlcvMetadataRecord::to_metadata).transpose()
    }

    /// `last_update`가 `max_age` 이내인지 여부. 메타데이터가 없으면 `false`.
    pub async fn is_fresh(
        &self,
        symbol: &str,
        resolution: Resolution,
        max_age: Duration,
    ) -> Result<bool> {
        let now = self.clock.now();
        Ok(self
            .metadata(symbol, resolution)
            .await?
            .map(|meta| meta.is_fresh(now, max_age))
            .unwrap_or(false))
    }

    /// 메타데이터가 있는 종목 목록 (알파벳 순).
    pub async fn list_cached_symbols(&self, resolution: Resolution) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT symbol FROM ohlcv_metadata WHERE resolution = ? ORDER BY symbol",
        )
        .bind(resolution.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DataError::QueryError(e.to_string()))?;

        Ok(rows.into_iter().map(|(s,)| s).collect())
    }

    /// 실제 저장된 봉 수.
    pub async fn count_bars(&self, symbol: &str, resolution: Resolution) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM ohlcv_bars WHERE symbol = ? AND resolution = ?",
        )
        .bind(symbol)
        .bind(resolution.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DataError::QueryError(e.to_string()))?;

        Ok(count.max(0) as u64)
    }

    /// 메타데이터 `record_count`와 실제 행 수 비교.
    pub async fn verify_integrity(
        &self,
        symbol: &str,
        resolution: Resolution,
    ) -> Result<IntegrityStatus> {
        let Some(meta) = self.metadata(symbol, resolution).await? else {
            return Ok(IntegrityStatus::Missing);
        };
        let actual = self.count_bars(symbol, resolution).await?;

        if meta.record_count == actual {
            Ok(IntegrityStatus::Consistent { count: actual })
        } else {
            warn!(
                symbol = symbol,
                resolution = %resolution,
                recorded = meta.record_count,
                actual = actual,
                "캐시 메타데이터 불일치"
            );
            Ok(IntegrityStatus::Mismatch {
                recorded: meta.record_count,
                actual,
            })
        }
    }

    /// 전체 캐시 통계 (최근 갱신 `recent_limit`개 포함).
    pub async fn cache_stats(&self, recent_limit: usize) -> Result<CacheStats> {
        let (symbol_count,): (i64,) =
            sqlx::query_as("SELECT COUNT(DISTINCT symbol) FROM ohlcv_metadata")
                .fetch_one(&self.pool)
                .await?;
        let (total_bars,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ohlcv_bars")
            .fetch_one(&self.pool)
            .await?;
        let (latest_date,): (Option<NaiveDate>,) =
            sqlx::query_as("SELECT MAX(date) FROM ohlcv_bars")
                .fetch_one(&self.pool)
                .await?;

        let records: Vec<OhlcvMetadataRecord> = sqlx::query_as(
            r#"
            SELECT symbol, resolution, last_update, start_date, end_date, record_count
            FROM ohlcv_metadata
            ORDER BY last_update DESC
            LIMIT ?
            "#,
        )
        .bind(recent_limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(CacheStats {
            symbol_count: symbol_count.max(0) as u64,
            total_bars: total_bars.max(0) as u64,
            latest_date,
            recent: records
                .iter()
                .map(OhlcvMetadataRecord::to_metadata)
                .collect::<Result<_>>()?,
        })
    }

    /// 캐시 삭제. `symbol`이 `None`이면 전체 삭제.
    ///
    /// 봉과 메타데이터를 같은 트랜잭션에서 지웁니다. 삭제된 봉 수를 반환합니다.
    pub async fn clear(&self, symbol: Option<&str>) -> Result<u64> {
        let _guards = match symbol {
            Some(s) => {
                let mut guards = Vec::with_capacity(Resolution::ALL.len());
                for res in Resolution::ALL {
                    guards.push(self.write_locks.acquire(s, res).await);
                }
                guards
            }
            None => Vec::new(),
        };

        let mut tx = self.pool.begin().await?;

        let deleted = match symbol {
            Some(s) => {
                let result = sqlx::query("DELETE FROM ohlcv_bars WHERE symbol = ?")
                    .bind(s)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| DataError::DeleteError(e.to_string()))?;
                sqlx::query("DELETE FROM ohlcv_metadata WHERE symbol = ?")
                    .bind(s)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| DataError::DeleteError(e.to_string()))?;
                result.rows_affected()
            }
            None => {
                let result = sqlx::query("DELETE FROM ohlcv_bars")
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| DataError::DeleteError(e.to_string()))?;
                sqlx::query("DELETE FROM ohlcv_metadata")
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| DataError::DeleteError(e.to_string()))?;
                result.rows_affected()
            }
        };

        tx.commit().await?;

        info!(symbol = ?symbol, deleted = deleted, "캐시 삭제");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use vnmarket_core::FixedClock;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bar(symbol: &str, d: NaiveDate, close: Decimal) -> OhlcvBar {
        OhlcvBar::daily(symbol, d, close, close, close, close, 1_000)
    }

    async fn store_at(now: DateTime<Utc>) -> (PriceStore, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(now));
        let store = PriceStore::in_memory(clock.clone()).await.unwrap();
        (store, clock)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_put_and_get_ordered() {
        let (store, _) = store_at(t0()).await;
        let bars = vec![
            bar("VNM", date(2024, 5, 31), dec!(66.1)),
            bar("VNM", date(2024, 5, 29), dec!(65.5)),
            bar("VNM", date(2024, 5, 30), dec!(65.9)),
        ];

        let count = store.put("VNM", Resolution::Daily, &bars).await.unwrap();
        assert_eq!(count, 3);

        let got = store.get("VNM", None, None, Resolution::Daily).await.unwrap();
        let dates: Vec<_> = got.iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![date(2024, 5, 29), date(2024, 5, 30), date(2024, 5, 31)]);
        assert_eq!(got[2].close, dec!(66.1));

        let ranged = store
            .get("VNM", Some(date(2024, 5, 30)), Some(date(2024, 5, 30)), Resolution::Daily)
            .await
            .unwrap();
        assert_eq!(ranged.len(), 1);
    }

    #[tokio::test]
    async fn test_get_miss_is_empty() {
        let (store, _) = store_at(t0()).await;
        let got = store.get("NONE", None, None, Resolution::Daily).await.unwrap();
        assert!(got.is_empty());
        assert!(store.metadata("NONE", Resolution::Daily).await.unwrap().is_none());
        assert!(!store.is_fresh("NONE", Resolution::Daily, Duration::hours(24)).await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_date() {
        let (store, _) = store_at(t0()).await;
        store
            .put("HPG", Resolution::Daily, &[bar("HPG", date(2024, 6, 3), dec!(28.0))])
            .await
            .unwrap();
        let count = store
            .put("HPG", Resolution::Daily, &[bar("HPG", date(2024, 6, 3), dec!(28.4))])
            .await
            .unwrap();

        assert_eq!(count, 1);
        let got = store.get("HPG", None, None, Resolution::Daily).await.unwrap();
        assert_eq!(got[0].close, dec!(28.4));
    }

    #[tokio::test]
    async fn test_metadata_tracks_range() {
        let (store, _) = store_at(t0()).await;
        store
            .put(
                "FPT",
                Resolution::Daily,
                &[
                    bar("FPT", date(2024, 5, 20), dec!(130)),
                    bar("FPT", date(2024, 5, 31), dec!(134)),
                ],
            )
            .await
            .unwrap();

        let meta = store.metadata("FPT", Resolution::Daily).await.unwrap().unwrap();
        assert_eq!(meta.start_date, date(2024, 5, 20));
        assert_eq!(meta.end_date, date(2024, 5, 31));
        assert_eq!(meta.record_count, 2);
        assert_eq!(meta.last_update, t0());
    }

    #[tokio::test]
    async fn test_put_rejects_foreign_bars() {
        let (store, _) = store_at(t0()).await;
        let err = store
            .put("VNM", Resolution::Daily, &[bar("HPG", date(2024, 6, 3), dec!(1))])
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::InvalidData(_)));
        assert_eq!(store.count_bars("VNM", Resolution::Daily).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_rejects_invalid_prices_without_writing() {
        let (store, _) = store_at(t0()).await;
        let good = bar("VNM", date(2024, 6, 3), dec!(66));
        // 고가 < 저가
        let inverted = OhlcvBar::daily(
            "VNM",
            date(2024, 6, 4),
            dec!(10),
            dec!(5),
            dec!(50),
            dec!(7),
            100,
        );
        let negative = bar("VNM", date(2024, 6, 5), dec!(-7));

        for bad in [inverted, negative] {
            let err = store
                .put("VNM", Resolution::Daily, &[good.clone(), bad])
                .await
                .unwrap_err();
            assert!(matches!(err, DataError::InvalidData(_)));
        }

        assert_eq!(store.count_bars("VNM", Resolution::Daily).await.unwrap(), 0);
        assert!(store.metadata("VNM", Resolution::Daily).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_rejects_volume_beyond_i64() {
        let (store, _) = store_at(t0()).await;
        let mut huge = bar("VNM", date(2024, 6, 3), dec!(66));
        huge.volume = i64::MAX as u64 + 1;

        let err = store.put("VNM", Resolution::Daily, &[huge]).await.unwrap_err();
        assert!(matches!(err, DataError::InvalidData(ref msg) if msg.contains("거래량")));
        assert_eq!(store.count_bars("VNM", Resolution::Daily).await.unwrap(), 0);

        let mut max = bar("VNM", date(2024, 6, 3), dec!(66));
        max.volume = i64::MAX as u64;
        assert_eq!(store.put("VNM", Resolution::Daily, &[max]).await.unwrap(), 1);
        let got = store.get("VNM", None, None, Resolution::Daily).await.unwrap();
        assert_eq!(got[0].volume, i64::MAX as u64);
    }

    #[tokio::test]
    async fn test_resolutions_are_separate() {
        let (store, _) = store_at(t0()).await;
        store
            .put("VNM", Resolution::Daily, &[bar("VNM", date(2024, 6, 3), dec!(66))])
            .await
            .unwrap();
        let mut weekly = bar("VNM", date(2024, 6, 3), dec!(66));
        weekly.resolution = Resolution::Weekly;
        store.put("VNM", Resolution::Weekly, &[weekly]).await.unwrap();

        assert_eq!(store.list_cached_symbols(Resolution::Daily).await.unwrap(), vec!["VNM"]);
        assert_eq!(store.count_bars("VNM", Resolution::Weekly).await.unwrap(), 1);
        assert!(store.list_cached_symbols(Resolution::Monthly).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_touch_updates_last_update_only() {
        let (store, clock) = store_at(t0()).await;
        assert!(!store.touch("VNM", Resolution::Daily).await.unwrap());

        store
            .put("VNM", Resolution::Daily, &[bar("VNM", date(2024, 6, 3), dec!(66))])
            .await
            .unwrap();
        clock.advance(Duration::days(2));
        assert!(store.touch("VNM", Resolution::Daily).await.unwrap());

        let meta = store.metadata("VNM", Resolution::Daily).await.unwrap().unwrap();
        assert_eq!(meta.last_update, t0() + Duration::days(2));
        assert_eq!(meta.record_count, 1);
    }

    #[tokio::test]
    async fn test_verify_integrity_detects_mismatch() {
        let (store, _) = store_at(t0()).await;
        assert_eq!(
            store.verify_integrity("VNM", Resolution::Daily).await.unwrap(),
            IntegrityStatus::Missing
        );

        store
            .put(
                "VNM",
                Resolution::Daily,
                &[
                    bar("VNM", date(2024, 6, 3), dec!(66)),
                    bar("VNM", date(2024, 6, 4), dec!(67)),
                ],
            )
            .await
            .unwrap();
        assert!(store
            .verify_integrity("VNM", Resolution::Daily)
            .await
            .unwrap()
            .is_consistent());

        sqlx::query("UPDATE ohlcv_metadata SET record_count = 5 WHERE symbol = 'VNM'")
            .execute(store.pool())
            .await
            .unwrap();
        assert_eq!(
            store.verify_integrity("VNM", Resolution::Daily).await.unwrap(),
            IntegrityStatus::Mismatch {
                recorded: 5,
                actual: 2
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_close_is_invalid_data() {
        let (store, _) = store_at(t0()).await;
        store
            .put("BAD", Resolution::Daily, &[bar("BAD", date(2024, 6, 3), dec!(10))])
            .await
            .unwrap();
        sqlx::query("UPDATE ohlcv_bars SET close = 'n/a' WHERE symbol = 'BAD'")
            .execute(store.pool())
            .await
            .unwrap();

        let err = store.get("BAD", None, None, Resolution::Daily).await.unwrap_err();
        assert!(matches!(err, DataError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_clear_symbol_and_all() {
        let (store, _) = store_at(t0()).await;
        for s in ["VNM", "HPG"] {
            store
                .put(s, Resolution::Daily, &[bar(s, date(2024, 6, 3), dec!(10))])
                .await
                .unwrap();
        }

        assert_eq!(store.clear(Some("VNM")).await.unwrap(), 1);
        assert_eq!(store.list_cached_symbols(Resolution::Daily).await.unwrap(), vec!["HPG"]);

        store.clear(None).await.unwrap();
        let stats = store.cache_stats(10).await.unwrap();
        assert_eq!(stats.symbol_count, 0);
        assert_eq!(stats.total_bars, 0);
        assert!(stats.latest_date.is_none());
    }

    #[tokio::test]
    async fn test_cache_stats() {
        let (store, clock) = store_at(t0()).await;
        store
            .put("VNM", Resolution::Daily, &[bar("VNM", date(2024, 6, 3), dec!(66))])
            .await
            .unwrap();
        clock.advance(Duration::hours(1));
        store
            .put(
                "HPG",
                Resolution::Daily,
                &[
                    bar("HPG", date(2024, 6, 3), dec!(28)),
                    bar("HPG", date(2024, 6, 4), dec!(29)),
                ],
            )
            .await
            .unwrap();

        let stats = store.cache_stats(1).await.unwrap();
        assert_eq!(stats.symbol_count, 2);
        assert_eq!(stats.total_bars, 3);
        assert_eq!(stats.latest_date, Some(date(2024, 6, 4)));
        assert_eq!(stats.recent.len(), 1);
        assert_eq!(stats.recent[0].symbol, "HPG");
    }
}
