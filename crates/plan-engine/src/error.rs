//! Error types for plan-engine operations.

use chrono::NaiveDate;
use thiserror::Error;

use crate::clock::{ClockTime, TimeRange};

/// Malformed clock times and ranges.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClockError {
    #[error("Invalid clock time: '{0}' (expected HH:MM or HH:MM:SS)")]
    Parse(String),

    #[error("Clock time out of range: {hour:02}:{minute:02}")]
    OutOfRange { hour: u16, minute: u16 },

    #[error("Empty time range: {start} - {end}")]
    EmptyRange { start: ClockTime, end: ClockTime },
}

/// A proposed plan was rejected before reaching the persistence store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `start + duration` passes `24:00`.
    #[error("A plan starting at {start} would run past the end of the day")]
    ExceedsDay { start: ClockTime },

    /// The start is not one of the policy's candidate start times.
    #[error("{start} is not an allowed start time")]
    NotACandidate { start: ClockTime },

    #[error("{proposed} overlaps the declared plan {existing}")]
    Overlaps {
        proposed: TimeRange,
        existing: TimeRange,
    },

    #[error("{date} is in the past")]
    PastDate { date: NaiveDate },
}

/// Invalid slot policy configuration.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Failed to read slot policy: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse slot policy: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid slot policy: {0}")]
    Invalid(String),
}

/// The persistence store's insert or fetch failed.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Persistence store is unavailable: {0}")]
    Unavailable(String),

    #[error("Persistence backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl PersistenceError {
    pub fn backend(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(cause))
    }
}

/// Failure of the write path: either rejected locally or failed remotely.
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

pub type Result<T, E = PlannerError> = std::result::Result<T, E>;
