//! Decide whether a proposed plan fits among the ranges already declared for a date.
//!
//! Pure interval logic with no I/O. Two ranges overlap when
//! `a.start < b.end && b.start < a.end`; adjacent ranges (one ends exactly when
//! the other starts) are NOT conflicts.
//!
//! The free functions use [`SlotPolicy::default`]; the same operations exist as
//! methods on [`SlotPolicy`] for a configured policy.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::clock::{ClockTime, TimeRange};
use crate::error::ValidationError;
use crate::policy::SlotPolicy;

/// One candidate start time and the end time it implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CandidateSlot {
    pub start: ClockTime,
    /// `None` when `start + duration` would pass `24:00`.
    pub end: Option<ClockTime>,
}

impl CandidateSlot {
    pub fn range(self) -> Option<TimeRange> {
        self.end.and_then(|end| TimeRange::new(self.start, end).ok())
    }
}

/// Why a candidate can or cannot be chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "range", rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    /// The candidate would run past midnight.
    ExceedsDay,
    /// Someone already declared exactly this range.
    Declared(TimeRange),
    /// The candidate overlaps a different declared range.
    Overlaps(TimeRange),
}

impl SlotStatus {
    pub fn is_available(self) -> bool {
        self == Self::Available
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => f.write_str("available"),
            Self::ExceedsDay => f.write_str("unavailable (runs past midnight)"),
            Self::Declared(range) => write!(f, "declared ({range})"),
            Self::Overlaps(range) => write!(f, "unavailable (overlaps {range})"),
        }
    }
}

/// A candidate slot together with its availability on some date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub slot: CandidateSlot,
    #[serde(flatten)]
    pub status: SlotStatus,
}

impl Availability {
    pub fn is_available(&self) -> bool {
        self.status.is_available()
    }
}

/// Half-open interval overlap. Symmetric; abutting ranges never overlap.
pub fn overlaps(proposed: TimeRange, existing: TimeRange) -> bool {
    proposed.overlaps(existing)
}

/// `start` plus the default two-hour duration, or `None` past `24:00`.
pub fn candidate_end_time(start: ClockTime) -> Option<ClockTime> {
    SlotPolicy::default().candidate_end_time(start)
}

/// Whether a plan starting at `start` fits among `existing` under the default policy.
pub fn is_available(start: ClockTime, existing: &[TimeRange]) -> bool {
    SlotPolicy::default().is_available(start, existing)
}

/// Availability of every default candidate start time, in ascending order.
pub fn list_availability(existing: &[TimeRange]) -> Vec<Availability> {
    SlotPolicy::default().list_availability(existing)
}

/// Full pre-write check of a proposal under the default policy.
pub fn check_proposal(
    date: NaiveDate,
    start: ClockTime,
    existing: &[TimeRange],
    today: NaiveDate,
) -> Result<TimeRange, ValidationError> {
    SlotPolicy::default().check_proposal(date, start, existing, today)
}

impl SlotPolicy {
    pub fn candidate_end_time(&self, start: ClockTime) -> Option<ClockTime> {
        start.checked_add_minutes(self.duration_minutes)
    }

    pub fn candidate(&self, start: ClockTime) -> CandidateSlot {
        CandidateSlot {
            start,
            end: self.candidate_end_time(start),
        }
    }

    /// Classify a candidate start against the declared ranges of one date.
    ///
    /// An exact match with a declared range is reported as [`SlotStatus::Declared`]
    /// even if another declared range also overlaps.
    pub fn slot_status(&self, start: ClockTime, existing: &[TimeRange]) -> SlotStatus {
        let Some(proposed) = self.candidate(start).range() else {
            return SlotStatus::ExceedsDay;
        };
        if let Some(&declared) = existing.iter().find(|&&range| range == proposed) {
            return SlotStatus::Declared(declared);
        }
        match existing.iter().find(|&&range| overlaps(proposed, range)) {
            Some(&range) => SlotStatus::Overlaps(range),
            None => SlotStatus::Available,
        }
    }

    pub fn is_available(&self, start: ClockTime, existing: &[TimeRange]) -> bool {
        self.slot_status(start, existing).is_available()
    }

    pub fn list_availability(&self, existing: &[TimeRange]) -> Vec<Availability> {
        self.candidate_starts()
            .map(|start| Availability {
                slot: self.candidate(start),
                status: self.slot_status(start, existing),
            })
            .collect()
    }

    /// Validate a proposed plan before anything is written.
    ///
    /// # Errors
    /// - [`ValidationError::PastDate`] if `date` is before `today`.
    /// - [`ValidationError::ExceedsDay`] if the plan would run past midnight,
    ///   whether or not `start` is a candidate.
    /// - [`ValidationError::NotACandidate`] if `start` is not offered by this policy.
    /// - [`ValidationError::Overlaps`] with the first conflicting declared range.
    pub fn check_proposal(
        &self,
        date: NaiveDate,
        start: ClockTime,
        existing: &[TimeRange],
        today: NaiveDate,
    ) -> Result<TimeRange, ValidationError> {
        if date < today {
            return Err(ValidationError::PastDate { date });
        }
        let proposed = self
            .candidate(start)
            .range()
            .ok_or(ValidationError::ExceedsDay { start })?;
        if !self.is_candidate(start) {
            return Err(ValidationError::NotACandidate { start });
        }

        match existing.iter().find(|&&range| overlaps(proposed, range)) {
            Some(&existing) => Err(ValidationError::Overlaps { proposed, existing }),
            None => Ok(proposed),
        }
    }
}
