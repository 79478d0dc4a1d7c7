//! 가격 소스 구성.
//!
//! CSV 내보내기 디렉터리를 주 소스로 쓰고, 보조 디렉터리가 있으면
//! fallback으로 묶은 뒤 호출 간격 제한을 씌웁니다.

use crate::config::SourceConfig;
use std::sync::Arc;
use tracing::info;
use vnmarket_data::{CsvDirSource, FallbackSource, PriceSource, ThrottledSource};

/// 업데이터에 넘길 소스와 종목 목록 조회용 주 디렉터리.
pub struct PriceSources {
    pub source: Arc<dyn PriceSource>,
    pub listing: CsvDirSource,
}

/// 설정으로 가격 소스를 만듭니다.
pub fn build_source(config: &SourceConfig) -> PriceSources {
    let primary = CsvDirSource::new(&config.csv_dir);

    let combined: Arc<dyn PriceSource> = match &config.fallback_dir {
        Some(dir) => {
            info!(
                primary = %config.csv_dir.display(),
                fallback = %dir.display(),
                "fallback 가격 소스 사용"
            );
            Arc::new(FallbackSource::new(
                Arc::new(primary.clone()),
                Arc::new(CsvDirSource::new(dir)),
            ))
        }
        None => Arc::new(primary.clone()),
    };

    let source: Arc<dyn PriceSource> = if config.min_interval_ms > 0 {
        Arc::new(ThrottledSource::new(combined, config.min_interval()))
    } else {
        combined
    };

    PriceSources {
        source,
        listing: primary,
    }
}
