//! Market Breadth - 시장 폭 지표.
//!
//! 분석 대상 종목 중 이동평균선(20/50/200일) 위에 있는 종목 비율과
//! EMA(9/21) 정배열 비율로 시장 전체 건강 상태를 측정합니다. 전일 대비
//! 상승/하락 종목 수(A/D)와 이를 함께 본 시장 심리도 제공합니다.
//!
//! 이 모듈은 순수 데이터 타입만 정의합니다. 실제 계산은
//! `vnmarket-data`의 분석기가 담당합니다.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{percentage, Percentage, Price};
use std::cmp::Ordering;

/// 시장 온도 (Market Temperature).
///
/// 20일선 상회 종목 비율로 시장 과열/냉각 상태를 판단합니다.
///
/// # 기준
///
/// - **Overheat**: >= 65% 🔥 (과열)
/// - **Neutral**: 35~65% 🌤 (중립)
/// - **Cold**: <= 35% 🧊 (냉각)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketTemperature {
    /// 과열 (>= 65%)
    ///
    /// 신규 진입보다는 보유 종목 관리에 집중해야 합니다.
    Overheat,

    /// 중립 (35~65%)
    Neutral,

    /// 냉각 (<= 35%)
    ///
    /// 시장이 약세이거나 조정 중입니다.
    Cold,
}

impl MarketTemperature {
    /// 20일선 상회 백분율(0 ~ 100)로부터 시장 온도 판단.
    ///
    /// ```
    /// use vnmarket_core::domain::MarketTemperature;
    /// use rust_decimal_macros::dec;
    ///
    /// assert_eq!(MarketTemperature::from_percentage(dec!(70)), MarketTemperature::Overheat);
    /// assert_eq!(MarketTemperature::from_percentage(dec!(50)), MarketTemperature::Neutral);
    /// assert_eq!(MarketTemperature::from_percentage(dec!(30)), MarketTemperature::Cold);
    /// ```
    pub fn from_percentage(pct: Percentage) -> Self {
        if pct >= Decimal::from(65) {
            Self::Overheat
        } else if pct > Decimal::from(35) {
            Self::Neutral
        } else {
            Self::Cold
        }
    }

    /// 아이콘 (CLI 출력용).
    pub fn icon(self) -> &'static str {
        match self {
            Self::Overheat => "🔥",
            Self::Neutral => "🌤",
            Self::Cold => "🧊",
        }
    }

    /// 설명 문자열.
    pub fn description(self) -> &'static str {
        match self {
            Self::Overheat => "과열",
            Self::Neutral => "중립",
            Self::Cold => "냉각",
        }
    }
}

impl fmt::Display for MarketTemperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Overheat => "OVERHEAT",
            Self::Neutral => "NEUTRAL",
            Self::Cold => "COLD",
        };
        write!(f, "{}", s)
    }
}

impl Default for MarketTemperature {
    fn default() -> Self {
        Self::Neutral
    }
}

/// 시장 심리 (Market Sentiment).
///
/// MA20/MA50 상회 비율과 상승/하락 비율(A/D ratio)을 함께 봅니다.
/// 위에서부터 처음 만족하는 단계가 선택됩니다.
///
/// | 단계 | MA20 % | MA50 % | A/D |
/// |------|--------|--------|-----|
/// | StronglyBullish | > 70 | > 60 | > 1.5 |
/// | Bullish | > 60 | > 50 | > 1.2 |
/// | SlightlyBullish | > 45 | > 40 | > 0.8 |
/// | StronglyBearish | < 30 | < 40 | < 0.5 |
/// | Bearish | < 40 | < 50 | < 0.8 |
/// | SlightlyBearish | < 55 | < 60 | < 1.2 |
/// | Neutral | 그 외 | | |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketSentiment {
    StronglyBullish,
    Bullish,
    SlightlyBullish,
    Neutral,
    SlightlyBearish,
    Bearish,
    StronglyBearish,
}

impl MarketSentiment {
    /// 비율들로부터 시장 심리 판단.
    ///
    /// `ad_ratio`가 `None`(하락 종목 없음)이면 무한대로 취급합니다.
    pub fn classify(
        pct_above_ma20: Percentage,
        pct_above_ma50: Percentage,
        ad_ratio: Option<Decimal>,
    ) -> Self {
        let ad_above = |x: Decimal| ad_ratio.map_or(true, |r| r > x);
        let ad_below = |x: Decimal| ad_ratio.is_some_and(|r| r < x);
        let ma20 = pct_above_ma20;
        let ma50 = pct_above_ma50;

        if ma20 > pct(70) && ma50 > pct(60) && ad_above(Decimal::new(15, 1)) {
            Self::StronglyBullish
        } else if ma20 > pct(60) && ma50 > pct(50) && ad_above(Decimal::new(12, 1)) {
            Self::Bullish
        } else if ma20 > pct(45) && ma50 > pct(40) && ad_above(Decimal::new(8, 1)) {
            Self::SlightlyBullish
        } else if ma20 < pct(30) && ma50 < pct(40) && ad_below(Decimal::new(5, 1)) {
            Self::StronglyBearish
        } else if ma20 < pct(40) && ma50 < pct(50) && ad_below(Decimal::new(8, 1)) {
            Self::Bearish
        } else if ma20 < pct(55) && ma50 < pct(60) && ad_below(Decimal::new(12, 1)) {
            Self::SlightlyBearish
        } else {
            Self::Neutral
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::StronglyBullish => "🚀",
            Self::Bullish => "📈",
            Self::SlightlyBullish | Self::SlightlyBearish => "📊",
            Self::Neutral => "↔",
            Self::Bearish => "📉",
            Self::StronglyBearish => "🔻",
        }
    }
}

impl fmt::Display for MarketSentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::StronglyBullish => "Strongly Bullish",
            Self::Bullish => "Bullish",
            Self::SlightlyBullish => "Slightly Bullish",
            Self::Neutral => "Neutral",
            Self::SlightlyBearish => "Slightly Bearish",
            Self::Bearish => "Bearish",
            Self::StronglyBearish => "Strongly Bearish",
        };
        write!(f, "{}", s)
    }
}

fn pct(n: i64) -> Decimal {
    Decimal::from(n)
}

/// 종목별 breadth 판정 결과.
///
/// 이동평균이 정의되지 않은 경우(봉 수 부족) 해당 판정은 `false`입니다.
/// 비교는 엄격한 부등호(`close > MA`)만 "상회"로 봅니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolBreadth {
    /// 종목 코드
    pub symbol: String,
    /// 최신 봉 날짜
    pub latest_date: NaiveDate,
    /// 최신 종가
    pub close: Price,
    /// 직전 봉 종가 (봉이 하나뿐이면 `None`)
    pub prev_close: Option<Price>,
    /// 최신 거래대금 (종가 × 거래량)
    pub trading_value: Decimal,
    pub ma20: Option<Decimal>,
    pub ma50: Option<Decimal>,
    pub ma200: Option<Decimal>,
    pub ema9: Option<Decimal>,
    pub ema21: Option<Decimal>,
    pub above_ma20: bool,
    pub above_ma50: bool,
    pub above_ma200: bool,
    /// EMA9 > EMA21
    pub ema_bullish: bool,
}

impl SymbolBreadth {
    /// 전일 대비 등락 방향. 직전 종가가 없으면 `None`.
    pub fn change_direction(&self) -> Option<Ordering> {
        self.prev_close.map(|prev| self.close.cmp(&prev))
    }
}

/// 유동성 필터로 제외된 종목.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredSymbol {
    pub symbol: String,
    pub trading_value: Decimal,
}

/// 분석 중 실패한 종목 (데이터 오류, 타임아웃 등).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub reason: String,
}

/// breadth 지표 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreadthIndicator {
    AboveMa20,
    AboveMa50,
    AboveMa200,
    EmaBullish,
}

impl BreadthIndicator {
    /// 요약표 순서.
    pub const ALL: [BreadthIndicator; 4] = [
        BreadthIndicator::AboveMa20,
        BreadthIndicator::AboveMa50,
        BreadthIndicator::AboveMa200,
        BreadthIndicator::EmaBullish,
    ];

    /// 표시용 이름.
    pub fn label(self) -> &'static str {
        match self {
            Self::AboveMa20 => "Close > MA20",
            Self::AboveMa50 => "Close > MA50",
            Self::AboveMa200 => "Close > MA200",
            Self::EmaBullish => "EMA9 > EMA21",
        }
    }

    /// 종목 결과에서 해당 지표 판정 값.
    pub fn matches(self, row: &SymbolBreadth) -> bool {
        match self {
            Self::AboveMa20 => row.above_ma20,
            Self::AboveMa50 => row.above_ma50,
            Self::AboveMa200 => row.above_ma200,
            Self::EmaBullish => row.ema_bullish,
        }
    }
}

/// 요약표 한 줄.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreadthSummaryRow {
    pub indicator: BreadthIndicator,
    pub above: usize,
    pub below: usize,
    pub percentage: Percentage,
}

/// 시장 전체 breadth 집계.
///
/// `total_analyzed = total_requested - excluded_count - filtered_out_count - failed_count`
/// 가 항상 성립합니다. `total_analyzed == 0`이면 모든 비율은 0이고
/// `insufficient_data`가 `true`입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreadthStats {
    /// 요청 종목 수 (중복 제거 후)
    pub total_requested: usize,
    pub total_analyzed: usize,

    pub above_ma20: usize,
    pub above_ma50: usize,
    pub above_ma200: usize,
    pub ema9_above_ema21: usize,

    pub pct_above_ma20: Percentage,
    pub pct_above_ma50: Percentage,
    pub pct_above_ma200: Percentage,
    pub pct_ema_bullish: Percentage,

    /// 전일 대비 상승 종목 수
    pub advancers: usize,
    /// 전일 대비 하락 종목 수
    pub decliners: usize,
    /// 전일 대비 보합 종목 수
    pub unchanged: usize,
    /// `advancers / decliners`. 하락 종목이 없으면 `None`.
    pub advance_decline_ratio: Option<Decimal>,

    /// 분석 완료 종목 (종목 코드 순)
    pub analyzed: Vec<SymbolBreadth>,
    /// 거래대금 미달로 제외된 종목
    pub filtered_symbols: Vec<FilteredSymbol>,
    /// 이력 부족으로 제외된 종목
    pub excluded_symbols: Vec<String>,
    /// 실패 종목
    pub failed_symbols: Vec<SymbolFailure>,

    pub filtered_out_count: usize,
    pub excluded_count: usize,
    pub failed_count: usize,

    /// 적용된 최소 거래대금 (VND)
    pub min_trading_value: Decimal,

    /// 분석 가능한 종목이 하나도 없음
    pub insufficient_data: bool,
    /// 20일선 기준 시장 온도 (분석 종목이 없으면 `None`)
    pub temperature: Option<MarketTemperature>,
    /// MA20/MA50 + A/D 기준 시장 심리 (분석 종목이 없으면 `None`)
    pub sentiment: Option<MarketSentiment>,

    pub calculated_at: DateTime<Utc>,
}

impl BreadthStats {
    /// 분류된 종목 결과로부터 집계를 만듭니다.
    ///
    /// 입력 순서와 무관하게 같은 결과가 나오도록 모든 목록을 종목 코드로
    /// 정렬합니다.
    pub fn aggregate(
        mut analyzed: Vec<SymbolBreadth>,
        mut filtered_symbols: Vec<FilteredSymbol>,
        mut excluded_symbols: Vec<String>,
        mut failed_symbols: Vec<SymbolFailure>,
        min_trading_value: Decimal,
        calculated_at: DateTime<Utc>,
    ) -> Self {
        analyzed.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        filtered_symbols.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        excluded_symbols.sort();
        failed_symbols.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        let total = analyzed.len();
        let count = |ind: BreadthIndicator| analyzed.iter().filter(|r| ind.matches(r)).count();

        let above_ma20 = count(BreadthIndicator::AboveMa20);
        let above_ma50 = count(BreadthIndicator::AboveMa50);
        let above_ma200 = count(BreadthIndicator::AboveMa200);
        let ema9_above_ema21 = count(BreadthIndicator::EmaBullish);

        let pct_above_ma20 = percentage(above_ma20, total);
        let pct_above_ma50 = percentage(above_ma50, total);
        let temperature = (total > 0).then(|| MarketTemperature::from_percentage(pct_above_ma20));

        let direction = |ord: Ordering| {
            analyzed
                .iter()
                .filter(|r| r.change_direction() == Some(ord))
                .count()
        };
        let advancers = direction(Ordering::Greater);
        let decliners = direction(Ordering::Less);
        let unchanged = direction(Ordering::Equal);
        let advance_decline_ratio =
            (decliners > 0).then(|| Decimal::from(advancers) / Decimal::from(decliners));
        let sentiment = (total > 0).then(|| {
            MarketSentiment::classify(pct_above_ma20, pct_above_ma50, advance_decline_ratio)
        });

        Self {
            total_requested: total
                + filtered_symbols.len()
                + excluded_symbols.len()
                + failed_symbols.len(),
            total_analyzed: total,
            above_ma20,
            above_ma50,
            above_ma200,
            ema9_above_ema21,
            pct_above_ma20,
            pct_above_ma50,
            pct_above_ma200: percentage(above_ma200, total),
            pct_ema_bullish: percentage(ema9_above_ema21, total),
            advancers,
            decliners,
            unchanged,
            advance_decline_ratio,
            filtered_out_count: filtered_symbols.len(),
            excluded_count: excluded_symbols.len(),
            failed_count: failed_symbols.len(),
            analyzed,
            filtered_symbols,
            excluded_symbols,
            failed_symbols,
            min_trading_value,
            insufficient_data: total == 0,
            temperature,
            sentiment,
            calculated_at,
        }
    }

    /// 분석 완료 종목 코드 목록.
    pub fn analyzed_symbols(&self) -> Vec<&str> {
        self.analyzed.iter().map(|r| r.symbol.as_str()).collect()
    }

    /// 실패 종목 코드 목록.
    pub fn failed_symbol_names(&self) -> Vec<&str> {
        self.failed_symbols.iter().map(|f| f.symbol.as_str()).collect()
    }

    /// 지표별 상회/하회 요약표.
    pub fn summary_rows(&self) -> Vec<BreadthSummaryRow> {
        BreadthIndicator::ALL
            .iter()
            .map(|&indicator| {
                let (above, pct) = match indicator {
                    BreadthIndicator::AboveMa20 => (self.above_ma20, self.pct_above_ma20),
                    BreadthIndicator::AboveMa50 => (self.above_ma50, self.pct_above_ma50),
                    BreadthIndicator::AboveMa200 => (self.above_ma200, self.pct_above_ma200),
                    BreadthIndicator::EmaBullish => (self.ema9_above_ema21, self.pct_ema_bullish),
                };
                BreadthSummaryRow {
                    indicator,
                    above,
                    below: self.total_analyzed - above,
                    percentage: pct,
                }
            })
            .collect()
    }
}

/// 단일 슬롯 breadth 결과 캐시 레코드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreadthSnapshot {
    /// 저장 시각
    pub created_at: DateTime<Utc>,
    pub stats: BreadthStats,
}

impl BreadthSnapshot {
    pub fn new(created_at: DateTime<Utc>, stats: BreadthStats) -> Self {
        Self { created_at, stats }
    }

    /// 스냅샷 경과 시간.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    /// `now - created_at > max_age`이면 만료.
    pub fn is_expired(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age(now) > max_age
    }
}

/// 일자별 breadth 이력 포인트.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreadthPoint {
    pub date: NaiveDate,
    /// 해당 일자 거래대금 기준을 통과한 종목 수
    pub total: usize,
    pub above_ma20: usize,
    pub above_ma50: usize,
    pub pct_above_ma20: Percentage,
    pub pct_above_ma50: Percentage,
}

impl BreadthPoint {
    pub fn new(date: NaiveDate, total: usize, above_ma20: usize, above_ma50: usize) -> Self {
        Self {
            date,
            total,
            above_ma20,
            above_ma50,
            pct_above_ma20: percentage(above_ma20, total),
            pct_above_ma50: percentage(above_ma50, total),
        }
    }
}
