use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Source of "now" for lifecycle calls. Both readings are UTC.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar date used for guarantee windows and date validation; the UTC date of `now`.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for demos and tests.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(today: NaiveDate) -> Self {
        let noon = today
            .and_hms_opt(12, 0, 0)
            .unwrap_or_default()
            .and_utc();
        Self {
            now: Mutex::new(noon),
        }
    }

    /// Moves the clock; a step past chrono's calendar range leaves it where it was.
    pub fn advance_days(&self, days: i64) {
        let Some(step) = Duration::try_days(days) else {
            return;
        };
        if let Ok(mut now) = self.now.lock() {
            if let Some(next) = now.checked_add_signed(step) {
                *now = next;
            }
        }
    }

    pub fn set_today(&self, today: NaiveDate) {
        if let Ok(mut now) = self.now.lock() {
            *now = today.and_time(now.time()).and_utc();
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
            .lock()
            .map(|now| *now)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}
