//! 이동평균 지표.
//!
//! - SMA: 최근 `period`개 종가의 단순 평균
//! - EMA: `alpha = 2 / (span + 1)` 지수 가중 평균
//!
//! 데이터가 부족하면 에러 대신 `None`(정의되지 않음)을 반환합니다.

use rust_decimal::Decimal;

/// 각 시점의 SMA. 처음 `period - 1`개는 `None`.
///
/// `period == 0`이면 전부 `None`.
pub fn sma(prices: &[Decimal], period: usize) -> Vec<Option<Decimal>> {
    if period == 0 {
        return vec![None; prices.len()];
    }

    let period_decimal = Decimal::from(period);
    let mut result = Vec::with_capacity(prices.len());
    let mut window_sum = Decimal::ZERO;

    for (i, price) in prices.iter().enumerate() {
        window_sum += *price;
        if i >= period {
            window_sum -= prices[i - period];
        }
        if i + 1 >= period {
            result.push(Some(window_sum / period_decimal));
        } else {
            result.push(None);
        }
    }

    result
}

/// 마지막 시점의 SMA (최근 `period`개 종가 평균).
pub fn last_sma(prices: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || prices.len() < period {
        return None;
    }
    let sum: Decimal = prices[prices.len() - period..].iter().sum();
    Some(sum / Decimal::from(period))
}

/// 각 시점의 EMA.
///
/// 첫 종가를 시작값으로 하는 재귀식
/// `EMA_t = alpha * P_t + (1 - alpha) * EMA_{t-1}` 을 전체 종가에 적용합니다.
/// Decimal 반올림 오차를 줄이기 위해 `EMA_{t-1} + alpha * (P_t - EMA_{t-1})`로 계산합니다.
/// 값은 `span`개 이상의 종가가 쌓인 시점(인덱스 `span - 1`)부터 정의됩니다.
pub fn ema(prices: &[Decimal], span: usize) -> Vec<Option<Decimal>> {
    if span == 0 {
        return vec![None; prices.len()];
    }

    let alpha = Decimal::TWO / Decimal::from(span + 1);
    let mut result = Vec::with_capacity(prices.len());
    let mut prev: Option<Decimal> = None;

    for (i, price) in prices.iter().enumerate() {
        let value = match prev {
            None => *price,
            Some(p) => p + alpha * (*price - p),
        };
        prev = Some(value);
        result.push((i + 1 >= span).then_some(value));
    }

    result
}

/// 마지막 시점의 EMA.
pub fn last_ema(prices: &[Decimal], span: usize) -> Option<Decimal> {
    ema(prices, span).last().copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn prices(values: &[i64]) -> Vec<Decimal> {
        values.iter().map(|v| Decimal::from(*v)).collect()
    }

    #[test]
    fn test_sma_series() {
        let result = sma(&prices(&[1, 2, 3, 4, 5]), 3);
        assert_eq!(result, vec![None, None, Some(dec!(2)), Some(dec!(3)), Some(dec!(4))]);
    }

    #[test]
    fn test_last_sma_undefined_when_short() {
        assert_eq!(last_sma(&prices(&[1, 2]), 3), None);
        assert_eq!(last_sma(&prices(&[1, 2, 3, 10]), 2), Some(dec!(6.5)));
        assert_eq!(last_sma(&prices(&[1]), 0), None);
    }

    #[test]
    fn test_ema_seeded_with_first_close() {
        // alpha = 2/4 = 0.5
        let result = ema(&prices(&[10, 20, 30]), 3);
        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        // 10 -> 15 -> 22.5
        assert_eq!(result[2], Some(dec!(22.5)));
    }

    #[test]
    fn test_ema_requires_span_bars() {
        assert_eq!(last_ema(&prices(&[1, 2, 3, 4, 5, 6, 7, 8]), 9), None);
        assert!(last_ema(&prices(&[1, 2, 3, 4, 5, 6, 7, 8, 9]), 9).is_some());
    }

    #[test]
    fn test_ema_of_constant_series_is_constant() {
        let flat = vec![dec!(42.5); 30];
        assert_eq!(last_ema(&flat, 21), Some(dec!(42.5)));
    }

    proptest! {
        #[test]
        fn prop_last_sma_matches_series(values in prop::collection::vec(1i64..1_000_000, 1..300), period in 1usize..60) {
            let p = prices(&values);
            let series = sma(&p, period);
            prop_assert_eq!(series.last().copied().flatten(), last_sma(&p, period));
        }

        #[test]
        fn prop_ema_stays_within_price_range(values in prop::collection::vec(1i64..1_000_000, 21..200)) {
            let p = prices(&values);
            let min = *p.iter().min().unwrap();
            let max = *p.iter().max().unwrap();
            let value = last_ema(&p, 21).unwrap();
            prop_assert!(value >= min && value <= max);
        }
    }
}
