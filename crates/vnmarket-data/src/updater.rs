//! 증분 업데이터.
//!
//! 캐시가 이미 가진 데이터를 보고 종목별로 요청을 생략할지, 어느 구간만
//! 요청할지 결정한 뒤 가져온 봉을 저장소에 병합합니다.
//!
//! ```text
//! metadata 조회
//!     │
//!     ├─ 없음 ─────────────────────▶ 전체 구간 (today - lookback .. today)
//!     ├─ record_count 불일치 ───────▶ 전체 구간 (재동기화)
//!     ├─ last_update가 fresh_within 이내 ─▶ SkippedFresh
//!     └─ 그 외 ────────────────────▶ (end_date - overlap) .. today
//! ```
//!
//! 소스 오류는 재시도하지 않고 `UpdateOutcome::Failed`로 보고하며
//! 기존 캐시는 건드리지 않습니다.

use crate::error::Result;
use crate::locks::KeyedLocks;
use crate::provider::PriceSource;
use crate::storage::{IntegrityStatus, PriceStore};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use vnmarket_core::{CacheMetadata, Clock, Resolution, SymbolFailure, UpdaterConfig};

/// 업데이트 판단 기준.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatePolicy {
    /// 캐시가 없을 때 가져올 기간
    pub lookback: Duration,
    /// 마지막 캐시 날짜 이전으로 겹쳐 받을 기간
    pub overlap: Duration,
    /// 이 시간 이내에 갱신되었으면 생략
    pub fresh_within: Duration,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self::from_config(&UpdaterConfig::default())
    }
}

impl UpdatePolicy {
    pub fn from_config(config: &UpdaterConfig) -> Self {
        Self {
            lookback: Duration::days(config.lookback_days),
            overlap: Duration::days(config.overlap_days),
            fresh_within: Duration::hours(config.fresh_within_hours),
        }
    }
}

/// 요청 구간 (양 끝 포함).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// 전체 구간을 요청하는 이유.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullReason {
    NotCached,
    IntegrityMismatch,
    Forced,
}

/// 종목 하나에 대한 업데이트 계획.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePlan {
    SkipFresh,
    Full { window: DateWindow, reason: FullReason },
    Incremental { window: DateWindow },
}

/// 업데이트 계획을 세웁니다 (순수 함수).
///
/// `actual_count`는 저장소의 실제 봉 수입니다. 메타데이터의 `record_count`와
/// 다르면 신선도와 무관하게 전체 재수집합니다.
pub fn plan_update(
    metadata: Option<&CacheMetadata>,
    actual_count: u64,
    now: DateTime<Utc>,
    today: NaiveDate,
    policy: &UpdatePolicy,
    force: bool,
) -> UpdatePlan {
    let full = |reason| UpdatePlan::Full {
        window: DateWindow {
            start: today - policy.lookback,
            end: today,
        },
        reason,
    };

    if force {
        return full(FullReason::Forced);
    }
    let Some(meta) = metadata else {
        return full(FullReason::NotCached);
    };
    if meta.record_count != actual_count {
        return full(FullReason::IntegrityMismatch);
    }
    if meta.is_fresh(now, policy.fresh_within) {
        return UpdatePlan::SkipFresh;
    }

    let start = (meta.end_date - policy.overlap).min(today);
    UpdatePlan::Incremental {
        window: DateWindow { start, end: today },
    }
}

/// 종목 하나의 업데이트 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// 가져온 봉을 병합함 (0개일 수 있음)
    Merged {
        fetched: usize,
        record_count: u64,
        window: DateWindow,
        full: bool,
    },
    /// 캐시가 신선하여 요청 생략
    SkippedFresh,
    /// 소스 오류 또는 저장 오류 (기존 캐시 유지)
    Failed { reason: String },
}

impl UpdateOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, UpdateOutcome::Failed { .. })
    }
}

/// 일괄 업데이트 요약.
#[derive(Debug, Clone, Default)]
pub struct UpdateSummary {
    pub total: usize,
    /// 병합한 종목 수
    pub updated: usize,
    /// 신선하여 생략한 종목 수
    pub up_to_date: usize,
    pub failed: Vec<SymbolFailure>,
    /// 가져온 봉 수 합계
    pub new_records: usize,
    pub elapsed_ms: u128,
}

impl UpdateSummary {
    fn record(&mut self, symbol: &str, outcome: &UpdateOutcome) {
        self.total += 1;
        match outcome {
            UpdateOutcome::Merged { fetched, .. } => {
                self.updated += 1;
                self.new_records += fetched;
            }
            UpdateOutcome::SkippedFresh => self.up_to_date += 1,
            UpdateOutcome::Failed { reason } => self.failed.push(SymbolFailure {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            }),
        }
    }

    /// 요약 로그 출력.
    pub fn log_summary(&self, task_name: &str) {
        info!(
            task = task_name,
            total = self.total,
            updated = self.updated,
            up_to_date = self.up_to_date,
            failed = self.failed.len(),
            new_records = self.new_records,
            elapsed_ms = self.elapsed_ms as u64,
            "작업 완료"
        );
    }
}

/// 일괄 업데이트 속도 조절.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    /// 배치 크기 (0이면 배치 휴지 없음)
    pub batch_size: usize,
    /// 실제 요청 후 지연
    pub delay: std::time::Duration,
    /// 배치 사이 휴지
    pub batch_pause: std::time::Duration,
}

impl Pacing {
    pub fn from_config(config: &UpdaterConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            delay: config.request_delay(),
            batch_pause: config.batch_pause(),
        }
    }

    /// 지연 없음 (테스트/로컬 소스용).
    pub fn none() -> Self {
        Self {
            batch_size: 0,
            delay: std::time::Duration::ZERO,
            batch_pause: std::time::Duration::ZERO,
        }
    }

    /// `index`번째(0부터) 종목을 처리한 뒤 쉴 시간.
    ///
    /// 마지막 종목 뒤에는 쉬지 않습니다. 배치 경계에서는 `batch_pause`,
    /// 그 외에는 소스를 실제로 호출한 종목 뒤에만 `delay`를 씁니다.
    pub fn pause_after(
        &self,
        index: usize,
        total: usize,
        outcome: &UpdateOutcome,
    ) -> Option<std::time::Duration> {
        if index + 1 >= total {
            return None;
        }
        let pause = if self.batch_size > 0 && (index + 1) % self.batch_size == 0 {
            self.batch_pause
        } else if matches!(outcome, UpdateOutcome::SkippedFresh) {
            return None;
        } else {
            self.delay
        };
        (!pause.is_zero()).then_some(pause)
    }
}

/// 증분 업데이터.
#[derive(Clone)]
pub struct IncrementalUpdater {
    store: PriceStore,
    source: Arc<dyn PriceSource>,
    clock: Arc<dyn Clock>,
    policy: UpdatePolicy,
    resolution: Resolution,
    locks: KeyedLocks,
}

impl IncrementalUpdater {
    pub fn new(
        store: PriceStore,
        source: Arc<dyn PriceSource>,
        clock: Arc<dyn Clock>,
        policy: UpdatePolicy,
    ) -> Self {
        Self {
            store,
            source,
            clock,
            policy,
            resolution: Resolution::Daily,
            locks: KeyedLocks::new(),
        }
    }

    pub fn policy(&self) -> &UpdatePolicy {
        &self.policy
    }

    pub fn store(&self) -> &PriceStore {
        &self.store
    }

    /// 종목 하나 업데이트.
    pub async fn update_symbol(&self, symbol: &str) -> UpdateOutcome {
        self.run(symbol, false).await
    }

    /// 신선도를 무시하고 전체 구간을 다시 가져옵니다.
    pub async fn update_symbol_forced(&self, symbol: &str) -> UpdateOutcome {
        self.run(symbol, true).await
    }

    #[instrument(skip(self), fields(source = self.source.name()))]
    async fn run(&self, symbol: &str, force: bool) -> UpdateOutcome {
        // 같은 종목에 대한 계획-요청-병합은 한 번에 하나만
        let _guard = self.locks.acquire(symbol, self.resolution).await;

        match self.try_run(symbol, force).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(symbol = symbol, error = %e, transient = e.is_transient(), "업데이트 실패");
                UpdateOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_run(&self, symbol: &str, force: bool) -> Result<UpdateOutcome> {
        let metadata = self.store.metadata(symbol, self.resolution).await?;
        let actual = match self.store.verify_integrity(symbol, self.resolution).await? {
            IntegrityStatus::Consistent { count } => count,
            IntegrityStatus::Mismatch { actual, .. } => actual,
            IntegrityStatus::Missing => 0,
        };

        let plan = plan_update(
            metadata.as_ref(),
            actual,
            self.clock.now(),
            self.clock.today(),
            &self.policy,
            force,
        );

        let (window, full) = match plan {
            UpdatePlan::SkipFresh => {
                debug!(symbol = symbol, "캐시 신선, 요청 생략");
                return Ok(UpdateOutcome::SkippedFresh);
            }
            UpdatePlan::Full { window, reason } => {
                info!(
                    symbol = symbol,
                    reason = ?reason,
                    start = %window.start,
                    end = %window.end,
                    "전체 구간 요청"
                );
                (window, true)
            }
            UpdatePlan::Incremental { window } => {
                debug!(
                    symbol = symbol,
                    start = %window.start,
                    end = %window.end,
                    "증분 구간 요청"
                );
                (window, false)
            }
        };

        let bars = self
            .source
            .fetch(symbol, window.start, window.end, self.resolution)
            .await?;

        if bars.is_empty() {
            // 잘못된 종목 또는 휴장. 캐시가 없으면 실패로 보고합니다.
            if metadata.is_none() {
                return Ok(UpdateOutcome::Failed {
                    reason: format!("{}: 소스에 데이터 없음", symbol),
                });
            }
            self.store.touch(symbol, self.resolution).await?;
            return Ok(UpdateOutcome::Merged {
                fetched: 0,
                record_count: actual,
                window,
                full,
            });
        }

        let fetched = bars.len();
        let record_count = self.store.put(symbol, self.resolution, &bars).await?;

        info!(
            symbol = symbol,
            fetched = fetched,
            record_count = record_count,
            full = full,
            "봉 병합 완료"
        );

        Ok(UpdateOutcome::Merged {
            fetched,
            record_count,
            window,
            full,
        })
    }

    /// 여러 종목을 순서대로 업데이트합니다.
    ///
    /// 실제 요청을 보낸 뒤에만 `delay`만큼 쉬고, `batch_size`개마다
    /// `batch_pause`만큼 쉽니다. 종목별 실패는 요약에 모이며 중단하지 않습니다.
    pub async fn update_all(&self, symbols: &[String], pacing: Pacing) -> UpdateSummary {
        self.update_all_with_progress(symbols, pacing, |_, _| {}).await
    }

    pub async fn update_all_with_progress<F>(
        &self,
        symbols: &[String],
        pacing: Pacing,
        on_progress: F,
    ) -> UpdateSummary
    where
        F: FnMut(usize, usize),
    {
        self.run_all(symbols, pacing, false, on_progress).await
    }

    /// 모든 종목을 신선도와 무관하게 전체 구간으로 다시 가져옵니다.
    pub async fn update_all_forced(&self, symbols: &[String], pacing: Pacing) -> UpdateSummary {
        self.run_all(symbols, pacing, true, |_, _| {}).await
    }

    async fn run_all<F>(
        &self,
        symbols: &[String],
        pacing: Pacing,
        force: bool,
        mut on_progress: F,
    ) -> UpdateSummary
    where
        F: FnMut(usize, usize),
    {
        let started = Instant::now();
        let total = symbols.len();
        let mut summary = UpdateSummary::default();

        info!(
            total = total,
            batch_size = pacing.batch_size,
            force = force,
            "일괄 업데이트 시작"
        );

        for (i, symbol) in symbols.iter().enumerate() {
            let outcome = self.run(symbol, force).await;
            summary.record(symbol, &outcome);
            on_progress(i + 1, total);

            if let Some(pause) = pacing.pause_after(i, total, &outcome) {
                debug!(
                    completed = i + 1,
                    total = total,
                    pause_ms = pause.as_millis() as u64,
                    "요청 간 휴지"
                );
                tokio::time::sleep(pause).await;
            }
        }

        summary.elapsed_ms = started.elapsed().as_millis();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration as StdDuration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 5, 3, 0, 0).unwrap()
    }

    fn meta(last_update: DateTime<Utc>, end: NaiveDate, count: u64) -> CacheMetadata {
        CacheMetadata {
            symbol: "VNM".to_string(),
            resolution: Resolution::Daily,
            last_update,
            start_date: date(2019, 6, 5),
            end_date: end,
            record_count: count,
        }
    }

    #[test]
    fn test_plan_not_cached_requests_full_window() {
        let plan = plan_update(None, 0, now(), date(2024, 6, 5), &UpdatePolicy::default(), false);
        assert_eq!(
            plan,
            UpdatePlan::Full {
                window: DateWindow {
                    start: date(2024, 6, 5) - Duration::days(1825),
                    end: date(2024, 6, 5),
                },
                reason: FullReason::NotCached,
            }
        );
    }

    #[test]
    fn test_plan_fresh_within_one_day_skips() {
        let m = meta(now() - Duration::hours(20), date(2024, 6, 4), 100);
        let plan = plan_update(Some(&m), 100, now(), date(2024, 6, 5), &UpdatePolicy::default(), false);
        assert_eq!(plan, UpdatePlan::SkipFresh);
    }

    #[test]
    fn test_plan_stale_requests_overlap_window() {
        let m = meta(now() - Duration::hours(49), date(2024, 6, 3), 100);
        let plan = plan_update(Some(&m), 100, now(), date(2024, 6, 5), &UpdatePolicy::default(), false);
        assert_eq!(
            plan,
            UpdatePlan::Incremental {
                window: DateWindow {
                    start: date(2024, 5, 29),
                    end: date(2024, 6, 5),
                }
            }
        );
    }

    #[test]
    fn test_plan_integrity_mismatch_beats_freshness() {
        let m = meta(now() - Duration::minutes(5), date(2024, 6, 4), 100);
        let plan = plan_update(Some(&m), 97, now(), date(2024, 6, 5), &UpdatePolicy::default(), false);
        assert!(matches!(
            plan,
            UpdatePlan::Full {
                reason: FullReason::IntegrityMismatch,
                ..
            }
        ));
    }

    #[test]
    fn test_plan_forced() {
        let m = meta(now(), date(2024, 6, 5), 100);
        let plan = plan_update(Some(&m), 100, now(), date(2024, 6, 5), &UpdatePolicy::default(), true);
        assert!(matches!(plan, UpdatePlan::Full { reason: FullReason::Forced, .. }));
    }

    #[test]
    fn test_plan_custom_policy() {
        let policy = UpdatePolicy {
            lookback: Duration::days(30),
            overlap: Duration::days(10),
            fresh_within: Duration::hours(1),
        };
        let m = meta(now() - Duration::hours(2), date(2024, 6, 4), 10);
        let plan = plan_update(Some(&m), 10, now(), date(2024, 6, 5), &policy, false);
        assert_eq!(
            plan,
            UpdatePlan::Incremental {
                window: DateWindow {
                    start: date(2024, 5, 25),
                    end: date(2024, 6, 5),
                }
            }
        );
    }

    #[test]
    fn test_summary_record() {
        let mut summary = UpdateSummary::default();
        let window = DateWindow {
            start: date(2024, 6, 1),
            end: date(2024, 6, 5),
        };
        summary.record(
            "VNM",
            &UpdateOutcome::Merged {
                fetched: 4,
                record_count: 10,
                window,
                full: false,
            },
        );
        summary.record("HPG", &UpdateOutcome::SkippedFresh);
        summary.record(
            "BAD",
            &UpdateOutcome::Failed {
                reason: "503".to_string(),
            },
        );

        assert_eq!(summary.total, 3);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.up_to_date, 1);
        assert_eq!(summary.new_records, 4);
        assert_eq!(summary.failed[0].symbol, "BAD");
        assert_eq!(window.days(), 5);
    }

    #[test]
    fn test_pacing_schedule() {
        let pacing = Pacing {
            batch_size: 2,
            delay: StdDuration::from_millis(50),
            batch_pause: StdDuration::from_secs(2),
        };
        let merged = UpdateOutcome::Merged {
            fetched: 5,
            record_count: 5,
            window: DateWindow {
                start: date(2024, 5, 30),
                end: date(2024, 6, 5),
            },
            full: false,
        };
        let failed = UpdateOutcome::Failed {
            reason: "HTTP 503".to_string(),
        };
        let fresh = UpdateOutcome::SkippedFresh;

        // 신선한 종목 뒤에는 지연 없음
        assert_eq!(pacing.pause_after(0, 5, &fresh), None);
        // 배치 경계에서는 결과와 무관하게 배치 휴지
        assert_eq!(pacing.pause_after(1, 5, &merged), Some(StdDuration::from_secs(2)));
        assert_eq!(pacing.pause_after(3, 5, &fresh), Some(StdDuration::from_secs(2)));
        // 소스를 호출한 종목 뒤에는 요청 지연
        assert_eq!(pacing.pause_after(2, 5, &merged), Some(StdDuration::from_millis(50)));
        assert_eq!(pacing.pause_after(2, 5, &failed), Some(StdDuration::from_millis(50)));
        // 마지막 종목 뒤에는 쉬지 않음
        assert_eq!(pacing.pause_after(4, 5, &merged), None);
        assert_eq!(pacing.pause_after(3, 4, &fresh), None);

        assert_eq!(Pacing::none().pause_after(0, 3, &merged), None);
    }
}
