//! Daily send quota, backed by the durable send counter.

use chrono::NaiveDate;
use outreach_core::{AccountId, Clock, SendCounter};
use std::sync::Arc;

/// Tracks how many messages the account sent today against its cap.
///
/// The durable counter is the source of truth at run start and at every
/// calendar-date change; in between, the tracker counts locally so a
/// flaky store never lets the run exceed the cap.
pub struct QuotaTracker {
    account: AccountId,
    cap: u32,
    day: NaiveDate,
    count: u32,
    counter: Arc<dyn SendCounter>,
    clock: Arc<dyn Clock>,
}

impl QuotaTracker {
    /// Loads today's count for `account`.
    ///
    /// `fallback` is the last count this process saw, used if the store
    /// cannot be read and it belongs to the same day.
    pub async fn load(
        account: AccountId,
        cap: u32,
        counter: Arc<dyn SendCounter>,
        clock: Arc<dyn Clock>,
        fallback: Option<(NaiveDate, u32)>,
    ) -> Self {
        let day = clock.today();
        let remembered = fallback
            .filter(|(d, _)| *d == day)
            .map(|(_, c)| c)
            .unwrap_or(0);
        let count = match counter.count(&account, day).await {
            Ok(stored) => stored.max(remembered),
            Err(e) => {
                tracing::warn!(account = %account, error = %e, "Could not read daily send count");
                remembered
            }
        };
        tracing::debug!(account = %account, %day, count, cap, "Daily quota loaded");
        Self {
            account,
            cap,
            day,
            count,
            counter,
            clock,
        }
    }

    /// Re-reads the durable counter if the calendar date changed.
    pub async fn refresh_day(&mut self) {
        let today = self.clock.today();
        if today == self.day {
            return;
        }
        self.day = today;
        self.count = match self.counter.count(&self.account, today).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(account = %self.account, error = %e, "Could not read daily send count");
                0
            }
        };
        tracing::info!(account = %self.account, day = %today, count = self.count, "Daily quota rolled over");
    }

    /// Returns `true` once the cap is reached.
    pub fn exhausted(&self) -> bool {
        self.count >= self.cap
    }

    /// Records one delivered message.
    pub async fn record_send(&mut self) {
        self.count += 1;
        match self.counter.increment(&self.account, self.day).await {
            Ok(stored) => self.count = self.count.max(stored),
            Err(e) => {
                tracing::warn!(account = %self.account, error = %e, "Could not persist daily send count");
            }
        }
    }

    /// Messages sent today.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Daily cap.
    pub fn cap(&self) -> u32 {
        self.cap
    }

    /// Calendar day being counted.
    pub fn day(&self) -> NaiveDate {
        self.day
    }
}
