//! Wall-clock abstraction used for timestamps and calendar-day quotas.

use chrono::{DateTime, Local, NaiveDate, Utc};
use std::sync::Mutex;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar date for daily quotas.
    fn today(&self) -> NaiveDate;
}

/// The system clock; calendar days follow the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock whose date can be set by tests.
#[derive(Debug)]
pub struct FixedClock {
    today: Mutex<NaiveDate>,
}

impl FixedClock {
    /// Creates a clock pinned to `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    /// Moves the clock to another date.
    pub fn set_today(&self, today: NaiveDate) {
        if let Ok(mut guard) = self.today.lock() {
            *guard = today;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        self.today
            .lock()
            .map(|d| *d)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}
