//! 일자별 Market Breadth 이력.
//!
//! 기간 안의 각 거래일마다, 그날 거래대금이 기준 이상인 종목 중 종가가
//! MA20/MA50 위에 있는 비율을 계산합니다. 종목 수가 `min_stocks` 미만인
//! 날짜는 결과에서 뺍니다.

use crate::error::Result;
use crate::indicators::sma;
use crate::storage::PriceStore;
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::info;
use vnmarket_core::{BreadthConfig, BreadthPoint, OhlcvBar, Resolution};

/// MA50 워밍업에 필요한 추가 조회 기간 (달력 일수).
const WARMUP_DAYS: i64 = 90;

/// 이력 계산 파라미터.
#[derive(Debug, Clone)]
pub struct HistoryParams {
    /// 기간 (일)
    pub days: i64,
    pub min_trading_value: Decimal,
    /// 일자별 최소 종목 수
    pub min_stocks: usize,
}

impl HistoryParams {
    pub fn from_config(config: &BreadthConfig) -> Self {
        Self {
            days: config.history_days,
            min_trading_value: config.min_trading_value(),
            min_stocks: config.history_min_stocks,
        }
    }
}

#[derive(Default)]
struct DayCount {
    total: usize,
    above_ma20: usize,
    above_ma50: usize,
}

/// 봉 목록으로 이력을 계산합니다 (순수 함수).
///
/// `bars`는 종목별로 날짜 오름차순이어야 합니다(종목 간 순서는 무관).
/// `start` 이전의 봉은 이동평균 워밍업에만 사용됩니다.
pub fn compute_breadth_history(
    bars: &[OhlcvBar],
    start: NaiveDate,
    params: &HistoryParams,
) -> Vec<BreadthPoint> {
    let mut by_symbol: BTreeMap<&str, Vec<&OhlcvBar>> = BTreeMap::new();
    for bar in bars {
        by_symbol.entry(bar.symbol.as_str()).or_default().push(bar);
    }

    let mut days: BTreeMap<NaiveDate, DayCount> = BTreeMap::new();

    for series in by_symbol.values() {
        let closes: Vec<Decimal> = series.iter().map(|b| b.close).collect();
        let ma20 = sma(&closes, 20);
        let ma50 = sma(&closes, 50);

        for (i, bar) in series.iter().enumerate() {
            if bar.date < start {
                continue;
            }
            let liquid = bar
                .trading_value()
                .is_some_and(|tv| tv >= params.min_trading_value);
            if !liquid {
                continue;
            }

            let day = days.entry(bar.date).or_default();
            day.total += 1;
            if ma20[i].is_some_and(|ma| bar.close > ma) {
                day.above_ma20 += 1;
            }
            if ma50[i].is_some_and(|ma| bar.close > ma) {
                day.above_ma50 += 1;
            }
        }
    }

    days.into_iter()
        .filter(|(_, c)| c.total >= params.min_stocks)
        .map(|(date, c)| BreadthPoint::new(date, c.total, c.above_ma20, c.above_ma50))
        .collect()
}

/// 저장소에서 봉을 읽어 `today`까지의 이력을 계산합니다.
pub async fn load_breadth_history(
    store: &PriceStore,
    today: NaiveDate,
    params: &HistoryParams,
) -> Result<Vec<BreadthPoint>> {
    let start = today - Duration::days(params.days);
    let bars = store
        .get_all_since(Resolution::Daily, start - Duration::days(WARMUP_DAYS))
        .await?;

    let points = compute_breadth_history(&bars, start, params);
    info!(
        bars = bars.len(),
        points = points.len(),
        start = %start,
        "breadth 이력 계산 완료"
    );
    Ok(points)
}
