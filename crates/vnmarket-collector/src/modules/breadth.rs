//! Market Breadth 계산/조회 모듈.

use chrono::Duration;
use std::fmt::Write;
use vnmarket_core::{to_billion_vnd, BreadthSnapshot};
use vnmarket_data::{BreadthParams, BreadthResponse, MarketDataService, Pacing};

/// breadth 명령 옵션.
#[derive(Debug, Clone)]
pub struct BreadthOptions {
    pub params: BreadthParams,
    /// 결과 캐시 허용 나이
    pub max_age: Duration,
    /// 가격을 먼저 업데이트하고 다시 계산
    pub refresh: bool,
    pub pacing: Pacing,
}

/// breadth 조회. `refresh`가 아니면 결과 캐시를 먼저 봅니다.
pub async fn run_breadth(
    service: &MarketDataService,
    symbols: &[String],
    options: &BreadthOptions,
) -> BreadthResponse {
    if options.refresh {
        let (summary, snapshot) = service
            .refresh_and_analyze(symbols, options.pacing, &options.params)
            .await;
        tracing::info!(
            updated = summary.updated,
            failed = summary.failed.len(),
            "가격 업데이트 후 breadth 재계산"
        );
        return BreadthResponse {
            snapshot,
            from_cache: false,
        };
    }

    // 대략 10% 단위로 진행률 로그
    let step = (symbols.len() / 10).max(1);
    service
        .get_or_analyze_breadth_with_progress(
            symbols,
            &options.params,
            options.max_age,
            |done, total| {
                if done % step == 0 || done == total {
                    tracing::info!(progress = format!("{}/{}", done, total), "breadth 분석 중");
                }
            },
        )
        .await
}

/// 터미널 출력용 breadth 보고서.
pub fn render_breadth_report(snapshot: &BreadthSnapshot, from_cache: bool) -> String {
    let stats = &snapshot.stats;
    let mut out = String::new();

    let source = if from_cache { "캐시" } else { "새로 계산" };
    let _ = writeln!(
        out,
        "Market Breadth ({}, {})",
        snapshot.created_at.format("%Y-%m-%d %H:%M UTC"),
        source
    );
    let _ = writeln!(
        out,
        "요청 {} | 분석 {} | 거래대금 미달 {} | 이력 부족 {} | 실패 {}",
        stats.total_requested,
        stats.total_analyzed,
        stats.filtered_out_count,
        stats.excluded_count,
        stats.failed_count
    );
    let _ = writeln!(
        out,
        "최소 거래대금: {}십억 VND",
        to_billion_vnd(stats.min_trading_value)
    );

    if stats.insufficient_data {
        let _ = writeln!(out, "분석 가능한 종목이 없습니다");
        return out;
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{:<16} {:>6} {:>6} {:>8}", "지표", "상회", "하회", "비율");
    for row in stats.summary_rows() {
        let _ = writeln!(
            out,
            "{:<16} {:>6} {:>6} {:>7}%",
            row.indicator.label(),
            row.above,
            row.below,
            row.percentage.round_dp(1)
        );
    }

    let _ = writeln!(out);
    let ad_ratio = stats
        .advance_decline_ratio
        .map(|r| r.round_dp(2).to_string())
        .unwrap_or_else(|| "-".to_string());
    let _ = writeln!(
        out,
        "상승 {} | 하락 {} | 보합 {} | A/D {}",
        stats.advancers, stats.decliners, stats.unchanged, ad_ratio
    );

    if let Some(temp) = stats.temperature {
        let _ = writeln!(out, "시장 온도: {} {} ({})", temp.icon(), temp, temp.description());
    }
    if let Some(sentiment) = stats.sentiment {
        let _ = writeln!(out, "시장 심리: {} {}", sentiment.icon(), sentiment);
    }

    if !stats.failed_symbols.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "실패 종목:");
        for failure in &stats.failed_symbols {
            let _ = writeln!(out, "  {} - {}", failure.symbol, failure.reason);
        }
    }

    out
}
