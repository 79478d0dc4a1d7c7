//! 호출 간격 제한.

use super::PriceSource;
use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use vnmarket_core::{OhlcvBar, Resolution};

/// 연속 호출 사이에 최소 `min_interval`을 보장하는 래퍼.
///
/// 벤더 요청 한도를 지키기 위한 것으로, 동시 호출도 순서대로 간격을 둡니다.
pub struct ThrottledSource<S> {
    inner: S,
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl<S: PriceSource> ThrottledSource<S> {
    pub fn new(inner: S, min_interval: Duration) -> Self {
        Self {
            inner,
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    async fn wait_turn(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl<S: PriceSource> PriceSource for ThrottledSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> Result<Vec<OhlcvBar>> {
        self.wait_turn().await;
        self.inner.fetch(symbol, start, end, resolution).await
    }
}
