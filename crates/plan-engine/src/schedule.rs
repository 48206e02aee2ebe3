//! The local, fast-readable view of every declared plan, keyed by date.
//!
//! The index is always rebuilt wholesale from the full plan list; there is no
//! incremental patching apart from [`ScheduleStore::record_locally`], which
//! bridges the gap between a successful write and the next rebuild.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use tracing::{debug, instrument, warn};

use crate::clock::{ClockTime, TimeRange};
use crate::plan::{Plan, PlanId};
use crate::policy::SlotPolicy;
use crate::validator::Availability;

/// Per-date declared ranges, each list sorted by start time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleIndex(BTreeMap<NaiveDate, Vec<TimeRange>>);

impl ScheduleIndex {
    /// Group plans by date and project each to its range.
    ///
    /// Plans with an empty or reversed range are skipped; they can never have
    /// passed validation and would poison every overlap check on their date.
    pub fn from_plans(plans: &[Plan]) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Vec<TimeRange>> = BTreeMap::new();
        for plan in plans {
            match plan.range() {
                Ok(range) => by_date.entry(plan.date).or_default().push(range),
                Err(error) => warn!(id = %plan.id, %error, "skipping plan with an invalid range"),
            }
        }
        for ranges in by_date.values_mut() {
            ranges.sort_unstable();
        }
        Self(by_date)
    }

    pub fn ranges_for(&self, date: NaiveDate) -> &[TimeRange] {
        self.0.get(&date).map(Vec::as_slice).unwrap_or_default()
    }

    fn insert(&mut self, date: NaiveDate, range: TimeRange) {
        let ranges = self.0.entry(date).or_default();
        let at = ranges.partition_point(|existing| *existing <= range);
        ranges.insert(at, range);
    }

    /// Every date with its sorted ranges, ascending by date.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &[TimeRange])> + '_ {
        self.0.iter().map(|(date, ranges)| (*date, ranges.as_slice()))
    }

    /// Dates with at least one declared range, ascending.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.0
            .iter()
            .filter(|(_, ranges)| !ranges.is_empty())
            .map(|(date, _)| *date)
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Whether the store has ever been populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreState {
    /// No rebuild has happened yet.
    #[default]
    Stale,
    /// At least one rebuild succeeded. There is no way back to `Stale`.
    Ready,
}

/// Owner of the [`ScheduleIndex`].
///
/// Calls must not overlap; share it behind a mutex (see [`crate::Planner`]).
#[derive(Debug, Clone, Default)]
pub struct ScheduleStore {
    index: ScheduleIndex,
    plan_ids: BTreeSet<PlanId>,
    state: StoreState,
    policy: SlotPolicy,
}

impl ScheduleStore {
    pub fn new(policy: SlotPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn policy(&self) -> &SlotPolicy {
        &self.policy
    }

    pub fn index(&self) -> &ScheduleIndex {
        &self.index
    }

    /// Replace the whole index with one built from `plans`. Idempotent.
    #[instrument(skip_all, fields(n_plans = plans.len()))]
    pub fn rebuild(&mut self, plans: &[Plan]) -> &ScheduleIndex {
        self.index = ScheduleIndex::from_plans(plans);
        self.plan_ids = plans.iter().map(|plan| plan.id.clone()).collect();
        self.state = StoreState::Ready;
        debug!(n_dates = self.index.0.len(), "rebuilt schedule index");
        &self.index
    }

    /// Declared ranges for `date` sorted by start, empty for unknown dates.
    pub fn ranges_for(&self, date: NaiveDate) -> &[TimeRange] {
        self.index.ranges_for(date)
    }

    /// Optimistically append a range that was just persisted. Does not re-validate.
    #[instrument(skip(self))]
    pub fn record_locally(&mut self, date: NaiveDate, start: ClockTime, end: ClockTime) {
        match TimeRange::new(start, end) {
            Ok(range) => self.index.insert(date, range),
            Err(error) => warn!(%error, "not recording an invalid range"),
        }
    }

    /// Record a stored plan unless a rebuild already brought it in.
    ///
    /// Returns `false` if the plan's id is already known. Another plan with the
    /// same range is still recorded.
    pub fn record_plan(&mut self, plan: &Plan) -> bool {
        if !self.plan_ids.insert(plan.id.clone()) {
            return false;
        }
        self.record_locally(plan.date, plan.start_time, plan.end_time);
        true
    }

    /// Whether a plan with this id is reflected in the index.
    pub fn knows_plan(&self, id: &PlanId) -> bool {
        self.plan_ids.contains(id)
    }

    pub fn has_plans(&self, date: NaiveDate) -> bool {
        !self.ranges_for(date).is_empty()
    }

    /// Availability of every candidate start time on `date`.
    pub fn availability(&self, date: NaiveDate) -> Vec<Availability> {
        self.policy.list_availability(self.ranges_for(date))
    }

    /// Dates within the given month that have declared plans, for calendar markers.
    pub fn dates_in_month(&self, year: i32, month: u32) -> Vec<NaiveDate> {
        self.index
            .dates()
            .filter(|date| date.year() == year && date.month() == month)
            .collect()
    }
}
