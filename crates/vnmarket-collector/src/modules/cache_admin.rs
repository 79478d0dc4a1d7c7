//! 캐시 통계/이력 출력.

use std::fmt::Write;
use vnmarket_core::BreadthPoint;
use vnmarket_data::CacheStats;

/// 캐시 통계 표.
pub fn render_cache_stats(stats: &CacheStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "캐시 종목 수: {}", stats.symbol_count);
    let _ = writeln!(out, "전체 봉 수: {}", stats.total_bars);
    let _ = writeln!(
        out,
        "최신 봉 날짜: {}",
        stats
            .latest_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string())
    );

    if stats.recent.is_empty() {
        return out;
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:<10} {:<4} {:<20} {:<10} {:<10} {:>6}",
        "종목", "해상도", "마지막 갱신", "시작", "종료", "봉 수"
    );
    for meta in &stats.recent {
        let _ = writeln!(
            out,
            "{:<10} {:<4} {:<20} {:<10} {:<10} {:>6}",
            meta.symbol,
            meta.resolution,
            meta.last_update.format("%Y-%m-%d %H:%M:%S"),
            meta.start_date,
            meta.end_date,
            meta.record_count
        );
    }
    out
}

/// 일자별 breadth 이력 표 (날짜 오름차순).
pub fn render_history(points: &[BreadthPoint]) -> String {
    let mut out = String::new();
    if points.is_empty() {
        let _ = writeln!(out, "이력 데이터가 없습니다");
        return out;
    }

    let _ = writeln!(
        out,
        "{:<10} {:>6} {:>10} {:>10}",
        "날짜", "종목", "MA20 %", "MA50 %"
    );
    for p in points {
        let _ = writeln!(
            out,
            "{:<10} {:>6} {:>10} {:>10}",
            p.date,
            p.total,
            p.pct_above_ma20.round_dp(1),
            p.pct_above_ma50.round_dp(1)
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use vnmarket_core::{CacheMetadata, Resolution};

    #[test]
    fn test_render_cache_stats() {
        let stats = CacheStats {
            symbol_count: 1,
            total_bars: 250,
            latest_date: NaiveDate::from_ymd_opt(2024, 6, 4),
            recent: vec![CacheMetadata {
                symbol: "VNM".to_string(),
                resolution: Resolution::Daily,
                last_update: Utc.with_ymd_and_hms(2024, 6, 5, 3, 0, 0).unwrap(),
                start_date: NaiveDate::from_ymd_opt(2023, 6, 5).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(),
                record_count: 250,
            }],
        };

        let out = render_cache_stats(&stats);
        assert!(out.contains("전체 봉 수: 250"));
        assert!(out.contains("2024-06-04"));
        assert!(out.contains("VNM"));
    }

    #[test]
    fn test_render_empty_history() {
        assert!(render_history(&[]).contains("이력 데이터가 없습니다"));
    }

    #[test]
    fn test_render_history_rows() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
        let out = render_history(&[BreadthPoint::new(day, 40, 30, 10)]);
        assert!(out.contains("2024-06-04"));
        assert!(out.contains("75"));
        assert!(out.contains("25"));
    }
}
