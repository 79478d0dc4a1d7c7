//! 시장 데이터 타입.
//!
//! - `OhlcvBar` - 종목 하나의 한 기간(일/주/월) OHLCV 봉
//! - `CacheMetadata` - (종목, 해상도)별 캐시 메타데이터

use crate::error::{CoreError, CoreResult};
use crate::types::{Price, Resolution};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// OHLCV 봉.
///
/// (symbol, date, resolution) 조합당 최대 하나만 존재합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OhlcvBar {
    /// 종목 코드
    pub symbol: String,
    /// 거래일 (주봉/월봉은 기간 시작일)
    pub date: NaiveDate,
    /// 해상도
    pub resolution: Resolution,
    /// 시가
    pub open: Price,
    /// 고가
    pub high: Price,
    /// 저가
    pub low: Price,
    /// 종가
    pub close: Price,
    /// 거래량 (주)
    pub volume: u64,
}

impl OhlcvBar {
    /// 일봉 생성.
    pub fn daily(
        symbol: impl Into<String>,
        date: NaiveDate,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: u64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            resolution: Resolution::Daily,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// 거래대금 (종가 × 거래량, VND).
    ///
    /// Decimal 범위를 넘으면 `None`.
    pub fn trading_value(&self) -> Option<Decimal> {
        self.close.checked_mul(Decimal::from(self.volume))
    }

    /// 가격 필드 기본 검증.
    ///
    /// 음수 가격, 고가 < 저가는 잘못된 데이터입니다.
    pub fn validate(&self) -> CoreResult<()> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| p.is_sign_negative()) {
            return Err(CoreError::InvalidInput(format!(
                "{} {}: 음수 가격",
                self.symbol, self.date
            )));
        }
        if self.high < self.low {
            return Err(CoreError::InvalidInput(format!(
                "{} {}: 고가({}) < 저가({})",
                self.symbol, self.date, self.high, self.low
            )));
        }
        Ok(())
    }
}

/// 캐시 메타데이터.
///
/// `record_count`는 실제 저장된 봉 수와 같아야 합니다. 다르면 병합이
/// 손상된 것으로 보고 전체 재수집 대상이 됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// 종목 코드
    pub symbol: String,
    /// 해상도
    pub resolution: Resolution,
    /// 마지막 갱신 시각
    pub last_update: DateTime<Utc>,
    /// 캐시 구간 시작일
    pub start_date: NaiveDate,
    /// 캐시 구간 종료일 (마지막 캐시 거래일)
    pub end_date: NaiveDate,
    /// 저장된 봉 수
    pub record_count: u64,
}

impl CacheMetadata {
    /// 마지막 갱신 이후 경과 시간.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_update
    }

    /// `max_age` 이내에 갱신되었는지 여부.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        self.age(now) <= max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_trading_value() {
        let bar = OhlcvBar::daily(
            "HPG",
            date(2024, 5, 2),
            dec!(100),
            dec!(101),
            dec!(99),
            dec!(100),
            1_000_000,
        );
        assert_eq!(bar.trading_value(), Some(dec!(100_000_000)));
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let bar = OhlcvBar::daily(
            "VNM",
            date(2024, 5, 2),
            dec!(70),
            dec!(69),
            dec!(71),
            dec!(70),
            10,
        );
        assert!(bar.validate().is_err());
    }

    #[test]
    fn test_metadata_freshness() {
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 10, 0, 0).unwrap();
        let meta = CacheMetadata {
            symbol: "FPT".to_string(),
            resolution: Resolution::Daily,
            last_update: now - Duration::minutes(30),
            start_date: date(2024, 1, 2),
            end_date: date(2024, 5, 2),
            record_count: 85,
        };
        assert!(meta.is_fresh(now, Duration::hours(1)));
        assert!(!meta.is_fresh(now, Duration::hours(0)));
    }
}
