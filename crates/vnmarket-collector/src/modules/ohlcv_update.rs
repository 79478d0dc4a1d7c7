//! OHLCV 업데이트 모듈.

use crate::{CollectionStats, CollectorError, Result};
use std::collections::BTreeSet;
use std::time::Instant;
use vnmarket_core::parse_symbol_list;
use vnmarket_data::{CsvDirSource, MarketDataService, Pacing};

/// 업데이트 대상 종목 결정.
///
/// - `symbols`가 있으면 쉼표 목록 그대로
/// - `all`이면 소스 디렉터리 종목과 이미 캐시된 종목의 합집합
/// - 둘 다 없으면 캐시된 종목
pub async fn resolve_symbols(
    service: &MarketDataService,
    listing: &CsvDirSource,
    symbols: Option<&str>,
    all: bool,
) -> Result<Vec<String>> {
    if let Some(raw) = symbols {
        let parsed = parse_symbol_list(raw)?;
        tracing::info!(count = parsed.len(), "지정 종목 사용");
        return Ok(parsed);
    }

    let mut target: BTreeSet<String> = service.cached_symbols().await?.into_iter().collect();

    if all {
        let listed = listing
            .list_symbols()
            .await
            .map_err(|e| CollectorError::DataSource(e.to_string()))?;
        tracing::info!(listed = listed.len(), cached = target.len(), "소스 종목 목록 조회 완료");
        target.extend(listed);
    }

    Ok(target.into_iter().collect())
}

/// 종목 목록 업데이트 실행.
pub async fn run_update(
    service: &MarketDataService,
    symbols: &[String],
    force: bool,
    pacing: Pacing,
) -> CollectionStats {
    let start = Instant::now();
    let mut stats = CollectionStats::new();

    if symbols.is_empty() {
        tracing::warn!("업데이트할 종목이 없습니다");
        stats.elapsed = start.elapsed();
        return stats;
    }

    tracing::info!(symbols = symbols.len(), force = force, "OHLCV 업데이트 시작");

    let summary = if force {
        service.update_all_forced(symbols, pacing).await
    } else {
        service.update_all(symbols, pacing).await
    };

    for failure in &summary.failed {
        tracing::error!(symbol = %failure.symbol, reason = %failure.reason, "업데이트 실패");
    }

    stats.record_update(&summary);
    stats.elapsed = start.elapsed();
    stats
}
