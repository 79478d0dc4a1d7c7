//! 주/보조 소스 조합.

use super::PriceSource;
use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, warn};
use vnmarket_core::{OhlcvBar, Resolution};

/// 주 소스가 실패하거나 빈 결과를 주면 보조 소스를 사용합니다.
///
/// 두 소스 모두 실패하면 보조 소스의 에러를 반환합니다. 주 소스가 실패하고
/// 보조 소스가 빈 결과를 주면 주 소스의 에러를 반환합니다.
pub struct FallbackSource {
    name: String,
    primary: Arc<dyn PriceSource>,
    fallback: Arc<dyn PriceSource>,
}

impl FallbackSource {
    pub fn new(primary: Arc<dyn PriceSource>, fallback: Arc<dyn PriceSource>) -> Self {
        Self {
            name: format!("{}+{}", primary.name(), fallback.name()),
            primary,
            fallback,
        }
    }
}

#[async_trait]
impl PriceSource for FallbackSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> Result<Vec<OhlcvBar>> {
        let primary_err = match self.primary.fetch(symbol, start, end, resolution).await {
            Ok(bars) if !bars.is_empty() => return Ok(bars),
            Ok(_) => {
                debug!(symbol = symbol, source = self.primary.name(), "주 소스 빈 결과, 보조 소스 시도");
                None
            }
            Err(e) => {
                warn!(
                    symbol = symbol,
                    source = self.primary.name(),
                    error = %e,
                    "주 소스 실패, 보조 소스 시도"
                );
                Some(e)
            }
        };

        match (self.fallback.fetch(symbol, start, end, resolution).await, primary_err) {
            (Ok(bars), Some(err)) if bars.is_empty() => Err(err),
            (result, _) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;
    use rust_decimal::Decimal;

    struct Fixed {
        name: &'static str,
        result: fn() -> Result<Vec<OhlcvBar>>,
    }

    #[async_trait]
    impl PriceSource for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(
            &self,
            _symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
            _resolution: Resolution,
        ) -> Result<Vec<OhlcvBar>> {
            (self.result)()
        }
    }

    fn one_bar() -> Result<Vec<OhlcvBar>> {
        let d = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let p = Decimal::from(10);
        Ok(vec![OhlcvBar::daily("VNM", d, p, p, p, p, 100)])
    }

    fn empty() -> Result<Vec<OhlcvBar>> {
        Ok(vec![])
    }

    fn failing() -> Result<Vec<OhlcvBar>> {
        Err(DataError::FetchError("503".into()))
    }

    fn source(primary: fn() -> Result<Vec<OhlcvBar>>, fallback: fn() -> Result<Vec<OhlcvBar>>) -> FallbackSource {
        FallbackSource::new(
            Arc::new(Fixed { name: "primary", result: primary }),
            Arc::new(Fixed { name: "fallback", result: fallback }),
        )
    }

    async fn run(src: &FallbackSource) -> Result<Vec<OhlcvBar>> {
        let d = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        src.fetch("VNM", d, d, Resolution::Daily).await
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let src = source(one_bar, failing);
        assert_eq!(run(&src).await.unwrap().len(), 1);
        assert_eq!(src.name(), "primary+fallback");
    }

    #[tokio::test]
    async fn test_primary_error_uses_fallback() {
        let src = source(failing, one_bar);
        assert_eq!(run(&src).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_primary_empty_uses_fallback() {
        let src = source(empty, one_bar);
        assert_eq!(run(&src).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_primary_error_fallback_empty_keeps_error() {
        let src = source(failing, empty);
        assert!(run(&src).await.unwrap_err().is_transient());
    }

    #[tokio::test]
    async fn test_both_empty_is_empty() {
        let src = source(empty, empty);
        assert!(run(&src).await.unwrap().is_empty());
    }
}
