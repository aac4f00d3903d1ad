//! Time source for the circulation workflows
//!
//! Every date-dependent rule (due dates, overdue detection, late fees) reads
//! "today" through a [`Clock`] so the same service code runs against the
//! system time in production and a pinned date in tests.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::Mutex;

#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    /// Current instant, used for audit stamps
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar day (midnight-truncated), used for circulation dates
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a given day that can be moved forward by hand
#[derive(Debug)]
pub struct FixedClock {
    today: Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    pub fn set(&self, day: NaiveDate) {
        if let Ok(mut today) = self.today.lock() {
            *today = day;
        }
    }

    pub fn advance_days(&self, days: i64) {
        if let Ok(mut today) = self.today.lock() {
            *today += Duration::days(days);
        }
    }

    fn current(&self) -> NaiveDate {
        match self.today.lock() {
            Ok(today) => *today,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.current().and_time(chrono::NaiveTime::MIN).and_utc() + Duration::hours(12)
    }

    fn today(&self) -> NaiveDate {
        self.current()
    }
}
