//! Time source used for default dates, row timestamps and the "current month"
//! of the metrics series.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

/// Single source of "now" for the engine. Operations never read system time
/// directly.
pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a given instant. Used by tests and replays.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock {
    at: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { at }
    }

    /// Frozen at noon UTC of `date`.
    pub fn on(date: NaiveDate) -> Self {
        let at = date
            .and_hms_opt(12, 0, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or_default();
        Self { at }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.at
    }
}
