//! Slot policy: which start times may be offered and how long each plan lasts.
//!
//! The default policy offers every whole hour from `00:00` to `22:00`, each
//! lasting two hours. A policy can be loaded from TOML:
//!
//! ```toml
//! duration_minutes = 120
//! first_start = "00:00"
//! last_start = "22:00"
//! step_minutes = 60
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::clock::ClockTime;
use crate::error::PolicyError;

/// Fixed plan length and the enumerable set of candidate start times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlotPolicy {
    /// Length of every plan. Not user-selectable.
    pub duration_minutes: u16,
    /// Earliest candidate start time.
    pub first_start: ClockTime,
    /// Latest candidate start time (inclusive).
    pub last_start: ClockTime,
    /// Spacing between candidate start times.
    pub step_minutes: u16,
}

impl Default for SlotPolicy {
    fn default() -> Self {
        Self {
            duration_minutes: 120,
            first_start: ClockTime::MIDNIGHT,
            last_start: ClockTime::from_minutes(22 * 60).unwrap_or(ClockTime::END_OF_DAY),
            step_minutes: 60,
        }
    }
}

impl SlotPolicy {
    /// Parse and validate a policy from a TOML document. Missing keys fall back to defaults.
    pub fn from_toml(source: &str) -> Result<Self, PolicyError> {
        let policy: Self = toml::from_str(source)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml(&source)
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.duration_minutes == 0 {
            return Err(PolicyError::Invalid("duration_minutes must be positive".into()));
        }
        if self.step_minutes == 0 {
            return Err(PolicyError::Invalid("step_minutes must be positive".into()));
        }
        if self.first_start > self.last_start {
            return Err(PolicyError::Invalid(format!(
                "first_start {} is after last_start {}",
                self.first_start, self.last_start
            )));
        }
        Ok(())
    }

    /// Every candidate start time in ascending order. Recomputed on each call.
    pub fn candidate_starts(&self) -> impl Iterator<Item = ClockTime> + '_ {
        std::iter::successors(Some(self.first_start), move |start| {
            start.checked_add_minutes(self.step_minutes)
        })
        .take_while(move |start| *start <= self.last_start)
    }

    pub fn is_candidate(&self, start: ClockTime) -> bool {
        self.candidate_starts().any(|candidate| candidate == start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_offers_every_hour_until_22() {
        let starts: Vec<String> = SlotPolicy::default()
            .candidate_starts()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(starts.len(), 23);
        assert_eq!(starts.first().map(String::as_str), Some("00:00"));
        assert_eq!(starts.last().map(String::as_str), Some("22:00"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let policy = SlotPolicy::from_toml("duration_minutes = 90").unwrap();
        assert_eq!(policy.duration_minutes, 90);
        assert_eq!(policy.step_minutes, 60);
    }

    #[test]
    fn zero_step_is_rejected() {
        assert!(SlotPolicy::from_toml("step_minutes = 0").is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(SlotPolicy::from_toml("slot_length = 3").is_err());
    }
}
