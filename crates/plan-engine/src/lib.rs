//! # plan-engine
//!
//! Slot conflict checks and a live schedule index for shared-field usage plans.
//!
//! Members of a shared sports facility post non-binding plans (date + time range)
//! so other teams can see who intends to use the field. A plan is not a
//! reservation: this crate only shares intent. It decides whether a proposed
//! range fits among the ranges already declared for a date, and keeps a local
//! per-date index of declared ranges that follows the durable store.
//!
//! ## Modules
//!
//! - [`clock`]: Minute-precision clock times (`00:00`..=`24:00`) and half-open ranges
//! - [`policy`]: Plan duration and candidate start times, loadable from TOML
//! - [`validator`]: Overlap checks and per-candidate availability
//! - [`plan`]: The stored plan record
//! - [`schedule`]: The per-date schedule index and its owning store
//! - [`persistence`]: Repository contract plus an in-memory implementation
//! - [`bridge`]: Refresh the schedule whenever the repository reports a change
//! - [`planner`]: The validate → insert → record-locally write path
//! - [`error`]: Error types

pub mod bridge;
pub mod clock;
pub mod error;
pub mod persistence;
pub mod plan;
pub mod planner;
pub mod policy;
pub mod schedule;
pub mod validator;

pub use bridge::{refresh, spawn_refresher, SharedStore, Subscription};
pub use clock::{ClockTime, TimeRange};
pub use error::{ClockError, PersistenceError, PlannerError, PolicyError, ValidationError};
pub use persistence::{ChangeFeed, ChangeSignal, InMemoryRepository, PlanRepository};
pub use plan::{NewPlan, Plan, PlanId};
pub use planner::Planner;
pub use policy::SlotPolicy;
pub use schedule::{ScheduleIndex, ScheduleStore, StoreState};
pub use validator::{
    candidate_end_time, check_proposal, is_available, list_availability, overlaps, Availability,
    CandidateSlot, SlotStatus,
};
