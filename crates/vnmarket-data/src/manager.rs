//! 시장 데이터 서비스.
//!
//! 가격 캐시, 증분 업데이터, breadth 분석기, breadth 결과 캐시를 묶어
//! 호출자(CLI/UI)가 쓰는 작업 단위를 제공합니다.
//!
//! ```text
//! get_or_analyze_breadth
//!   ├─ BreadthResultCache.load(max_age) ── hit ──▶ 반환
//!   └─ miss ─▶ BreadthAnalyzer.analyze ─▶ PriceStore 읽기
//!                    │
//!                    └─▶ BreadthResultCache.save
//! ```

use crate::breadth_history::{load_breadth_history, HistoryParams};
use crate::error::Result;
use crate::market_breadth::{BreadthAnalyzer, BreadthParams};
use crate::provider::PriceSource;
use crate::storage::{BreadthResultCache, CacheStats, IntegrityStatus, PriceStore};
use crate::updater::{IncrementalUpdater, Pacing, UpdateOutcome, UpdatePolicy, UpdateSummary};
use chrono::Duration;
use std::sync::Arc;
use tracing::{info, warn};
use vnmarket_core::{BreadthPoint, BreadthSnapshot, BreadthStats, Clock, Resolution};

/// 캐시에서 가져왔는지 새로 계산했는지 구분한 breadth 결과.
#[derive(Debug, Clone)]
pub struct BreadthResponse {
    pub snapshot: BreadthSnapshot,
    pub from_cache: bool,
}

/// 시장 데이터 서비스.
#[derive(Clone)]
pub struct MarketDataService {
    store: PriceStore,
    updater: IncrementalUpdater,
    analyzer: BreadthAnalyzer,
    result_cache: BreadthResultCache,
    clock: Arc<dyn Clock>,
}

impl MarketDataService {
    pub fn new(
        store: PriceStore,
        source: Arc<dyn PriceSource>,
        result_cache: BreadthResultCache,
        clock: Arc<dyn Clock>,
        policy: UpdatePolicy,
    ) -> Self {
        let updater = IncrementalUpdater::new(store.clone(), source, clock.clone(), policy);
        let analyzer = BreadthAnalyzer::new(Arc::new(store.clone()), clock.clone());
        Self {
            store,
            updater,
            analyzer,
            result_cache,
            clock,
        }
    }

    pub fn store(&self) -> &PriceStore {
        &self.store
    }

    pub fn result_cache(&self) -> &BreadthResultCache {
        &self.result_cache
    }

    // =========================================================================
    // 업데이트
    // =========================================================================

    pub async fn update_symbol(&self, symbol: &str) -> UpdateOutcome {
        self.updater.update_symbol(symbol).await
    }

    pub async fn update_symbol_forced(&self, symbol: &str) -> UpdateOutcome {
        self.updater.update_symbol_forced(symbol).await
    }

    pub async fn update_all(&self, symbols: &[String], pacing: Pacing) -> UpdateSummary {
        let summary = self.updater.update_all(symbols, pacing).await;
        summary.log_summary("OHLCV 업데이트");
        summary
    }

    pub async fn update_all_forced(&self, symbols: &[String], pacing: Pacing) -> UpdateSummary {
        let summary = self.updater.update_all_forced(symbols, pacing).await;
        summary.log_summary("OHLCV 전체 재수집");
        summary
    }

    // =========================================================================
    // Breadth
    // =========================================================================

    /// breadth를 새로 계산하고 결과 캐시에 저장합니다.
    ///
    /// 결과 캐시 저장 실패는 경고만 남기고 계산 결과는 그대로 반환합니다.
    pub async fn analyze_breadth(
        &self,
        symbols: &[String],
        params: &BreadthParams,
    ) -> BreadthSnapshot {
        self.analyze_breadth_with_progress(symbols, params, |_, _| {})
            .await
    }

    pub async fn analyze_breadth_with_progress<F>(
        &self,
        symbols: &[String],
        params: &BreadthParams,
        on_progress: F,
    ) -> BreadthSnapshot
    where
        F: FnMut(usize, usize),
    {
        let stats = self
            .analyzer
            .analyze_with_progress(symbols, params, on_progress)
            .await;
        self.store_snapshot(stats).await
    }

    async fn store_snapshot(&self, stats: BreadthStats) -> BreadthSnapshot {
        match self.result_cache.save(stats.clone()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "breadth 결과 캐시 저장 실패");
                BreadthSnapshot::new(self.clock.now(), stats)
            }
        }
    }

    /// `max_age` 이내의 캐시된 breadth 결과.
    pub async fn get_cached_breadth(&self, max_age: Duration) -> Result<Option<BreadthSnapshot>> {
        self.result_cache.load(max_age).await
    }

    /// 캐시 우선 breadth 조회. 캐시가 없거나 만료되었으면 새로 계산합니다.
    pub async fn get_or_analyze_breadth(
        &self,
        symbols: &[String],
        params: &BreadthParams,
        max_age: Duration,
    ) -> BreadthResponse {
        self.get_or_analyze_breadth_with_progress(symbols, params, max_age, |_, _| {})
            .await
    }

    /// 캐시 우선 조회. 새로 계산할 때만 진행률 콜백이 호출됩니다.
    pub async fn get_or_analyze_breadth_with_progress<F>(
        &self,
        symbols: &[String],
        params: &BreadthParams,
        max_age: Duration,
        on_progress: F,
    ) -> BreadthResponse
    where
        F: FnMut(usize, usize),
    {
        match self.get_cached_breadth(max_age).await {
            Ok(Some(snapshot)) => {
                info!(created_at = %snapshot.created_at, "캐시된 breadth 결과 사용");
                return BreadthResponse {
                    snapshot,
                    from_cache: true,
                };
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "breadth 결과 캐시 읽기 실패, 새로 계산"),
        }

        BreadthResponse {
            snapshot: self
                .analyze_breadth_with_progress(symbols, params, on_progress)
                .await,
            from_cache: false,
        }
    }

    /// 오래된 종목을 먼저 업데이트한 뒤 breadth를 계산합니다.
    pub async fn refresh_and_analyze(
        &self,
        symbols: &[String],
        pacing: Pacing,
        params: &BreadthParams,
    ) -> (UpdateSummary, BreadthSnapshot) {
        let summary = self.update_all(symbols, pacing).await;
        let snapshot = self.analyze_breadth(symbols, params).await;
        (summary, snapshot)
    }

    /// 일자별 breadth 이력.
    pub async fn breadth_history(&self, params: &HistoryParams) -> Result<Vec<BreadthPoint>> {
        load_breadth_history(&self.store, self.clock.today(), params).await
    }

    // =========================================================================
    // 캐시 관리
    // =========================================================================

    pub async fn cached_symbols(&self) -> Result<Vec<String>> {
        self.store.list_cached_symbols(Resolution::Daily).await
    }

    pub async fn cache_stats(&self, recent_limit: usize) -> Result<CacheStats> {
        self.store.cache_stats(recent_limit).await
    }

    pub async fn verify_integrity(&self, symbol: &str) -> Result<IntegrityStatus> {
        self.store.verify_integrity(symbol, Resolution::Daily).await
    }

    /// 가격 캐시 삭제. 전체 삭제 시 breadth 결과 캐시도 지웁니다.
    pub async fn clear_cache(&self, symbol: Option<&str>) -> Result<u64> {
        let deleted = self.store.clear(symbol).await?;
        if symbol.is_none() {
            self.result_cache.clear().await?;
        }
        Ok(deleted)
    }
}
