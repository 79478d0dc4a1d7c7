//! 수집 통계 구조체.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vnmarket_core::BreadthSnapshot;
use vnmarket_data::UpdateSummary;

/// 한 번의 워크플로우(업데이트 + breadth) 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionStats {
    /// 총 시도 종목 수
    pub total: usize,
    /// 병합 성공 종목 수
    pub updated: usize,
    /// 건너뛴 종목 수 (이미 최신 데이터)
    pub skipped: usize,
    /// 실패 종목 수
    pub errors: usize,
    /// 가져온 봉 수
    pub new_bars: usize,
    /// breadth 분석 종목 수 (계산하지 않았으면 None)
    pub breadth_analyzed: Option<usize>,
    /// MA20 상회 비율
    pub pct_above_ma20: Option<Decimal>,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CollectionStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 업데이트 요약 반영
    pub fn record_update(&mut self, summary: &UpdateSummary) {
        self.total += summary.total;
        self.updated += summary.updated;
        self.skipped += summary.up_to_date;
        self.errors += summary.failed.len();
        self.new_bars += summary.new_records;
    }

    /// breadth 결과 반영
    pub fn record_breadth(&mut self, snapshot: &BreadthSnapshot) {
        self.breadth_analyzed = Some(snapshot.stats.total_analyzed);
        self.pct_above_ma20 = Some(snapshot.stats.pct_above_ma20);
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            ((self.updated + self.skipped) as f64 / self.total as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            updated = self.updated,
            skipped = self.skipped,
            errors = self.errors,
            new_bars = self.new_bars,
            breadth_analyzed = ?self.breadth_analyzed,
            pct_above_ma20 = ?self.pct_above_ma20.map(|p| p.round_dp(1)),
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "워크플로우 완료"
        );
    }
}
