use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, DurationRound, Utc};

pub const WINDOW_HOURS: i64 = 5;

/// Reset instant of the window that starts at the top of `now`'s hour.
pub fn window_reset_at(now: DateTime<Utc>) -> DateTime<Utc> {
    let hour_start = now
        .duration_trunc(Duration::hours(1))
        .unwrap_or(now);
    hour_start + Duration::hours(WINDOW_HOURS)
}

pub fn is_expired(reset_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= reset_at
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock, millisecond precision.
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(now.timestamp_millis()),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.millis.store(now.timestamp_millis(), Ordering::SeqCst);
    }

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

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    #[test]
    fn reset_is_truncated_hour_plus_five() {
        assert_eq!(window_reset_at(at(14, 23)), at(19, 0));
        assert_eq!(window_reset_at(at(14, 0)), at(19, 0));
        let late = Utc.with_ymd_and_hms(2025, 3, 10, 19, 5, 42).unwrap();
        assert_eq!(
            window_reset_at(late),
            Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn expiry_is_inclusive_at_reset() {
        assert!(!is_expired(at(19, 0), at(18, 59)));
        assert!(is_expired(at(19, 0), at(19, 0)));
        assert!(is_expired(at(19, 0), at(19, 5)));
    }

    #[test]
    fn fixed_clock_advances() {
        let clock = FixedClock::new(at(14, 23));
        clock.advance(Duration::minutes(10));
        assert_eq!(clock.now(), at(14, 33));
        clock.set(at(19, 5));
        assert_eq!(clock.now(), at(19, 5));
    }
}
