//! Clock abstraction so lifecycle decisions are testable without waiting on
//! wall-clock time.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};

/// Source of "now" for every expiry decision the ledger makes.
///
/// All timestamps are normalized to whole-second UTC; sub-second precision
/// buys nothing at hour-scale TTLs and whole seconds keep the stored TEXT
/// timestamps uniformly comparable.
pub trait Clock: std::fmt::Debug + Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

pub(crate) fn truncate_to_second(ts: OffsetDateTime) -> OffsetDateTime {
    ts.replace_nanosecond(0).unwrap_or(ts)
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        truncate_to_second(OffsetDateTime::now_utc())
    }
}

/// A manually advanced clock for tests.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<parking_lot::Mutex<OffsetDateTime>>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Arc::new(parking_lot::Mutex::new(truncate_to_second(start))),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    pub fn set(&self, to: OffsetDateTime) {
        *self.now.lock() = truncate_to_second(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let start = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::hours(2));
        assert_eq!(clock.now(), start + Duration::hours(2));
    }

    #[test]
    fn test_system_clock_whole_seconds() {
        let now = SystemClock.now();
        assert_eq!(now.nanosecond(), 0);
    }
}
