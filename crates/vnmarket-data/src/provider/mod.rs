//! 가격 데이터 소스 (Price Source Gateway).
//!
//! 외부 벤더에서 과거 봉을 가져오는 계약만 정의합니다. 구현체는 상태가 없고
//! 재시도하지 않으며, 실패/빈 결과 처리는 호출자(증분 업데이터) 책임입니다.
//!
//! - `CsvDirSource`: `<dir>/<SYMBOL>.csv` 내보내기 파일
//! - `FallbackSource`: 주 소스 실패/빈 결과 시 보조 소스 사용
//! - `ThrottledSource`: 호출 간 최소 간격 보장

pub mod csv_dir;
pub mod fallback;
pub mod throttle;

pub use csv_dir::CsvDirSource;
pub use fallback::FallbackSource;
pub use throttle::ThrottledSource;

use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use vnmarket_core::{OhlcvBar, Resolution};

/// 과거 가격 데이터 소스.
///
/// - 잘못된 종목은 에러가 아니라 빈 Vec을 반환할 수 있습니다.
/// - 네트워크/요청 한도 오류는 `DataError::is_transient()`가 `true`인 에러로 반환합니다.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// 로그용 소스 이름.
    fn name(&self) -> &str;

    /// `[start, end]` 구간(양 끝 포함)의 봉을 가져옵니다.
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> Result<Vec<OhlcvBar>>;
}

#[async_trait]
impl<T: PriceSource + ?Sized> PriceSource for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> Result<Vec<OhlcvBar>> {
        (**self).fetch(symbol, start, end, resolution).await
    }
}
