//! Market Breadth 분석기.
//!
//! 종목 집합에 대해 최신 종가가 MA20/50/200 위에 있는지, EMA9 > EMA21인지를
//! 병렬로 판정하고 시장 전체 비율로 집계합니다.
//!
//! # 종목별 처리 순서
//!
//! 1. 캐시에서 봉 조회
//! 2. 봉 수 < `min_history` → 이력 부족 (제외, 실패 아님)
//! 3. 최신 거래대금 < `min_trading_value` → 유동성 필터 (제외, 별도 목록)
//! 4. MA/EMA 판정 (정의되지 않은 지표는 `false`, `close == MA`는 상회 아님)
//!
//! 한 종목의 오류/패닉/타임아웃은 그 종목만 실패로 기록하고 나머지는 계속
//! 진행합니다. 집계는 단순 카운트이므로 완료 순서와 무관합니다.

use crate::error::{DataError, Result};
use crate::indicators::{last_ema, last_sma};
use crate::storage::PriceStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use vnmarket_core::{
    BreadthConfig, BreadthStats, Clock, FilteredSymbol, OhlcvBar, Resolution, SymbolBreadth,
    SymbolFailure,
};

/// 분석기가 봉을 읽는 경로.
///
/// 분석기는 읽기만 하며 저장된 봉을 변경하지 않습니다.
#[async_trait]
pub trait BarReader: Send + Sync {
    /// 날짜 오름차순 전체 봉.
    async fn read_bars(&self, symbol: &str, resolution: Resolution) -> Result<Vec<OhlcvBar>>;
}

#[async_trait]
impl BarReader for PriceStore {
    async fn read_bars(&self, symbol: &str, resolution: Resolution) -> Result<Vec<OhlcvBar>> {
        self.get(symbol, None, None, resolution).await
    }
}

/// 분석 파라미터.
#[derive(Debug, Clone)]
pub struct BreadthParams {
    /// 최소 거래대금 (VND)
    pub min_trading_value: Decimal,
    /// 동시 분석 종목 수
    pub concurrency: usize,
    /// 종목당 타임아웃
    pub symbol_timeout: Duration,
    /// 최소 봉 수
    pub min_history: usize,
    pub resolution: Resolution,
}

impl Default for BreadthParams {
    fn default() -> Self {
        Self::from_config(&BreadthConfig::default())
    }
}

impl BreadthParams {
    pub fn from_config(config: &BreadthConfig) -> Self {
        Self {
            min_trading_value: config.min_trading_value(),
            concurrency: config.concurrency,
            symbol_timeout: config.symbol_timeout(),
            min_history: config.min_history,
            resolution: Resolution::Daily,
        }
    }

    pub fn with_min_trading_value(mut self, value: Decimal) -> Self {
        self.min_trading_value = value;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_symbol_timeout(mut self, timeout: Duration) -> Self {
        self.symbol_timeout = timeout;
        self
    }
}

/// 종목 하나의 분류 결과 (실패 제외).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolOutcome {
    Analyzed(SymbolBreadth),
    /// 봉 수 부족
    InsufficientHistory { symbol: String, bars: usize },
    /// 거래대금 미달
    FilteredOut(FilteredSymbol),
}

/// 종목 하나의 결과. 실패는 `Err`.
pub type SymbolResult = std::result::Result<SymbolOutcome, SymbolFailure>;

/// 이미 읽은 봉으로 종목 하나를 판정합니다 (순수 함수).
///
/// `bars`는 날짜 오름차순이어야 합니다.
pub fn evaluate_symbol(
    symbol: &str,
    bars: &[OhlcvBar],
    min_trading_value: Decimal,
    min_history: usize,
) -> Result<SymbolOutcome> {
    let Some(latest) = bars.last().filter(|_| bars.len() >= min_history) else {
        return Ok(SymbolOutcome::InsufficientHistory {
            symbol: symbol.to_string(),
            bars: bars.len(),
        });
    };

    let trading_value = latest.trading_value().ok_or_else(|| {
        DataError::InvalidData(format!(
            "{} 거래대금 계산 overflow (close={}, volume={})",
            symbol, latest.close, latest.volume
        ))
    })?;

    if trading_value < min_trading_value {
        return Ok(SymbolOutcome::FilteredOut(FilteredSymbol {
            symbol: symbol.to_string(),
            trading_value,
        }));
    }

    let closes: Vec<Decimal> = bars.iter().map(|b| b.close).collect();
    let close = latest.close;

    let ma20 = last_sma(&closes, 20);
    let ma50 = last_sma(&closes, 50);
    let ma200 = last_sma(&closes, 200);
    let ema9 = last_ema(&closes, 9);
    let ema21 = last_ema(&closes, 21);

    let above = |ma: Option<Decimal>| ma.is_some_and(|ma| close > ma);

    Ok(SymbolOutcome::Analyzed(SymbolBreadth {
        symbol: symbol.to_string(),
        latest_date: latest.date,
        close,
        prev_close: bars.len().checked_sub(2).map(|i| bars[i].close),
        trading_value,
        above_ma20: above(ma20),
        above_ma50: above(ma50),
        above_ma200: above(ma200),
        ema_bullish: matches!((ema9, ema21), (Some(fast), Some(slow)) if fast > slow),
        ma20,
        ma50,
        ma200,
        ema9,
        ema21,
    }))
}

/// 종목별 결과를 집계합니다 (순수 함수, 순서 무관).
pub fn reduce_outcomes(
    results: Vec<SymbolResult>,
    min_trading_value: Decimal,
    calculated_at: DateTime<Utc>,
) -> BreadthStats {
    let mut analyzed = Vec::new();
    let mut filtered = Vec::new();
    let mut excluded = Vec::new();
    let mut failed = Vec::new();

    for result in results {
        match result {
            Ok(SymbolOutcome::Analyzed(row)) => analyzed.push(row),
            Ok(SymbolOutcome::FilteredOut(f)) => filtered.push(f),
            Ok(SymbolOutcome::InsufficientHistory { symbol, .. }) => excluded.push(symbol),
            Err(failure) => failed.push(failure),
        }
    }

    BreadthStats::aggregate(
        analyzed,
        filtered,
        excluded,
        failed,
        min_trading_value,
        calculated_at,
    )
}

/// 병렬 breadth 분석기.
#[derive(Clone)]
pub struct BreadthAnalyzer {
    reader: Arc<dyn BarReader>,
    clock: Arc<dyn Clock>,
}

impl BreadthAnalyzer {
    pub fn new(reader: Arc<dyn BarReader>, clock: Arc<dyn Clock>) -> Self {
        Self { reader, clock }
    }

    /// breadth 분석.
    pub async fn analyze(&self, symbols: &[String], params: &BreadthParams) -> BreadthStats {
        self.analyze_with_progress(symbols, params, |_, _| {}).await
    }

    /// 진행률 콜백과 함께 분석합니다. 콜백은 종목 하나가 끝날 때마다
    /// `(완료 수, 전체 수)`로 호출됩니다.
    #[instrument(skip_all, fields(symbols = symbols.len(), concurrency = params.concurrency))]
    pub async fn analyze_with_progress<F>(
        &self,
        symbols: &[String],
        params: &BreadthParams,
        mut on_progress: F,
    ) -> BreadthStats
    where
        F: FnMut(usize, usize),
    {
        let mut seen = HashSet::new();
        let unique: Vec<String> = symbols
            .iter()
            .filter(|s| seen.insert(s.as_str()))
            .cloned()
            .collect();

        let total = unique.len();
        let concurrency = params.concurrency.max(1);

        let mut stream = stream::iter(unique.into_iter().map(|symbol| {
            let reader = Arc::clone(&self.reader);
            let params = params.clone();
            async move { analyze_one(reader, symbol, params).await }
        }))
        .buffer_unordered(concurrency);

        let mut results = Vec::with_capacity(total);
        while let Some(result) = stream.next().await {
            results.push(result);
            on_progress(results.len(), total);
        }

        let stats = reduce_outcomes(results, params.min_trading_value, self.clock.now());

        info!(
            requested = stats.total_requested,
            analyzed = stats.total_analyzed,
            filtered = stats.filtered_out_count,
            excluded = stats.excluded_count,
            failed = stats.failed_count,
            pct_above_ma20 = %stats.pct_above_ma20.round_dp(1),
            "Market Breadth 계산 완료"
        );
        if stats.insufficient_data {
            warn!("분석 가능한 종목이 없습니다");
        }

        stats
    }
}

/// 종목 하나를 별도 task에서 분석합니다.
///
/// 타임아웃이 나면 task는 분리된 채 끝까지 실행되고 결과는 버려집니다.
async fn analyze_one(reader: Arc<dyn BarReader>, symbol: String, params: BreadthParams) -> SymbolResult {
    let task = {
        let symbol = symbol.clone();
        let params = params.clone();
        tokio::spawn(async move {
            let bars = reader.read_bars(&symbol, params.resolution).await?;
            evaluate_symbol(
                &symbol,
                &bars,
                params.min_trading_value,
                params.min_history,
            )
        })
    };

    let failure = |reason: String| {
        debug!(symbol = %symbol, reason = %reason, "종목 분석 실패");
        Err(SymbolFailure {
            symbol: symbol.clone(),
            reason,
        })
    };

    match tokio::time::timeout(params.symbol_timeout, task).await {
        Ok(Ok(Ok(outcome))) => Ok(outcome),
        Ok(Ok(Err(e))) => failure(e.to_string()),
        Ok(Err(join_err)) => failure(format!("task 실패: {}", join_err)),
        Err(_) => failure(format!(
            "timeout ({}ms)",
            params.symbol_timeout.as_millis()
        )),
    }
}
