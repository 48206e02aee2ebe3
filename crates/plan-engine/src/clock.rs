//! Local clock times and half-open time ranges within a single day.
//!
//! `chrono::NaiveTime` cannot represent `24:00`, which is the exclusive end of
//! the last slot in a day, so clock times are stored as whole minutes since
//! local midnight in `0..=1440`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ClockError;

/// Minutes in a day; `ClockTime::END_OF_DAY` is `24:00`.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// A local wall-clock time with minute precision, `00:00` through `24:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    pub const MIDNIGHT: Self = Self(0);
    pub const END_OF_DAY: Self = Self(MINUTES_PER_DAY);

    /// Build a clock time from hours and minutes. `24:00` is accepted, `24:01` is not.
    pub fn from_hm(hour: u16, minute: u16) -> Result<Self, ClockError> {
        if minute >= 60 || hour > 24 {
            return Err(ClockError::OutOfRange { hour, minute });
        }
        Self::from_minutes(hour * 60 + minute).ok_or(ClockError::OutOfRange { hour, minute })
    }

    /// Build a clock time from minutes since midnight, `None` past `24:00`.
    pub const fn from_minutes(minutes: u16) -> Option<Self> {
        if minutes > MINUTES_PER_DAY {
            None
        } else {
            Some(Self(minutes))
        }
    }

    pub const fn minutes(self) -> u16 {
        self.0
    }

    pub const fn hour(self) -> u16 {
        self.0 / 60
    }

    pub const fn minute(self) -> u16 {
        self.0 % 60
    }

    /// Add minutes, returning `None` if the result would pass `24:00`.
    pub fn checked_add_minutes(self, minutes: u16) -> Option<Self> {
        self.0.checked_add(minutes).and_then(Self::from_minutes)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// Accepts `HH:MM` and `HH:MM:SS`. Seconds are truncated but must be zero,
/// since stored times are always minute-aligned.
impl FromStr for ClockTime {
    type Err = ClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ClockError::Parse(s.to_string());

        let mut parts = s.trim().split(':');
        let hour = parts.next().ok_or_else(invalid)?;
        let minute = parts.next().ok_or_else(invalid)?;
        let second = parts.next();
        if parts.next().is_some() {
            return Err(invalid());
        }

        let field = |raw: &str| -> Result<u16, ClockError> {
            if raw.len() != 2 || !raw.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            raw.parse().map_err(|_| invalid())
        };

        let hour = field(hour)?;
        let minute = field(minute)?;
        if let Some(second) = second {
            if field(second)? != 0 {
                return Err(invalid());
            }
        }
        Self::from_hm(hour, minute)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A half-open interval `[start, end)` of clock times on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct TimeRange {
    /// Inclusive.
    pub start: ClockTime,
    /// Exclusive.
    pub end: ClockTime,
}

impl TimeRange {
    /// Build a range, rejecting empty and reversed ranges.
    pub fn new(start: ClockTime, end: ClockTime) -> Result<Self, ClockError> {
        if start >= end {
            return Err(ClockError::EmptyRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn duration_minutes(self) -> u16 {
        self.end.minutes() - self.start.minutes()
    }

    /// Half-open overlap: abutting ranges do not overlap.
    pub fn overlaps(self, other: Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

#[derive(Deserialize)]
struct RawRange {
    start: ClockTime,
    end: ClockTime,
}

impl TryFrom<RawRange> for TimeRange {
    type Error = ClockError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}
