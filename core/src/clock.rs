//! Evaluation context: the anchor date and wall-clock instant for one run.
//!
//! RULE: Nothing in the engine reads the system clock.
//! Every call receives an EvalContext, so tests can freeze time.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvalContext {
    /// Windows end the day before this date.
    pub anchor_date: NaiveDate,
    /// Stamped on computed records and used for cache freshness.
    pub now:         DateTime<Utc>,
}

impl EvalContext {
    pub fn new(anchor_date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self { anchor_date, now }
    }

    /// Context whose `now` is midnight UTC at the start of the anchor date.
    pub fn at_anchor(anchor_date: NaiveDate) -> Self {
        let now = anchor_date.and_time(chrono::NaiveTime::MIN).and_utc();
        Self { anchor_date, now }
    }

    /// The only place the wall clock is consulted. Long-running binaries call
    /// this per request so the anchor follows the calendar.
    pub fn today() -> Self {
        let now = Utc::now();
        Self { anchor_date: now.date_naive(), now }
    }

    /// Same anchor date, `now` moved forward by `hours`.
    pub fn later_by_hours(&self, hours: i64) -> Self {
        Self {
            anchor_date: self.anchor_date,
            now:         self.now + Duration::hours(hours),
        }
    }

    /// Next calendar day: anchor and `now` both shift by one day.
    pub fn next_day(&self) -> Self {
        Self {
            anchor_date: self.anchor_date + Duration::days(1),
            now:         self.now + Duration::days(1),
        }
    }
}
