//! Stored usage plans.
//!
//! A plan declares the intent to use the field; it is not a reservation.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{ClockTime, TimeRange};
use crate::error::ClockError;

/// Opaque identifier assigned by the persistence store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(pub String);

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored plan, shaped like the persisted record:
/// `{ id, date, start_time, end_time, created_at }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    /// Local civil date, `YYYY-MM-DD`.
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    /// Informational only.
    pub created_at: DateTime<Utc>,
}

impl Plan {
    /// The plan's `[start_time, end_time)` range.
    pub fn range(&self) -> Result<TimeRange, ClockError> {
        TimeRange::new(self.start_time, self.end_time)
    }
}

/// The fields a client supplies when declaring a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPlan {
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

impl NewPlan {
    pub fn new(date: NaiveDate, range: TimeRange) -> Self {
        Self {
            date,
            start_time: range.start,
            end_time: range.end,
        }
    }
}
