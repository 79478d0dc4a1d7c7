//! 가격/거래대금 Decimal 유틸리티.

use rust_decimal::Decimal;

/// 가격 타입 (VND).
pub type Price = Decimal;

/// 백분율 타입 (55.5 = 55.5%).
pub type Percentage = Decimal;

/// `count / total * 100` 백분율을 계산합니다.
///
/// `total`이 0이면 0을 반환합니다.
pub fn percentage(count: usize, total: usize) -> Percentage {
    if total == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(count) * Decimal::ONE_HUNDRED / Decimal::from(total)
}

/// 거래대금을 십억 VND 단위로 변환합니다 (표시용).
pub fn to_billion_vnd(value: Decimal) -> Decimal {
    (value / Decimal::from(1_000_000_000u64)).round_dp(2)
}
