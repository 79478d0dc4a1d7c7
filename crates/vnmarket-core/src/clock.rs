//! 주입 가능한 시계.
//!
//! 캐시 신선도, TTL 만료, 증분 업데이트 구간 계산은 모두 "현재 시각"에
//! 의존합니다. 실제 시간 대기 없이 테스트할 수 있도록 시계를 trait으로 분리합니다.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::atomic::{AtomicI64, Ordering};

/// 베트남 시장 시간대 (HOSE/HNX/UPCOM).
pub const VN_TZ: Tz = chrono_tz::Asia::Ho_Chi_Minh;

/// 현재 시각 제공자.
pub trait Clock: Send + Sync {
    /// 현재 UTC 시각.
    fn now(&self) -> DateTime<Utc>;

    /// 베트남 시장 기준 오늘 날짜.
    ///
    /// UTC 자정과 현지 자정 사이(07:00 ICT 이전)에도 거래일이 올바르게 잡힙니다.
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&VN_TZ).date_naive()
    }
}

/// 시스템 시계.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 고정 시계 (테스트 및 재현용).
///
/// 내부 값은 밀리초 타임스탬프로 보관하며 `advance`로 전진시킬 수 있습니다.
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    /// 지정 시각으로 고정된 시계 생성.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(at.timestamp_millis()),
        }
    }

    /// 시각 변경.
    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }

    /// 시각 전진.
    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_clock_advance() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 2, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::minutes(30));
        assert_eq!(clock.now(), start + Duration::minutes(30));
    }

    #[test]
    fn test_today_uses_vietnam_timezone() {
        // 2024-03-01 18:30 UTC = 2024-03-02 01:30 ICT
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 18, 30, 0).unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
    }
}
