//! The write path: validate, persist, then update the local schedule.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::bridge::{self, SharedStore, Subscription};
use crate::clock::{ClockTime, TimeRange};
use crate::error::{PersistenceError, Result};
use crate::persistence::PlanRepository;
use crate::plan::{NewPlan, Plan};
use crate::policy::SlotPolicy;
use crate::schedule::ScheduleStore;
use crate::validator::Availability;

/// Ties a repository to the schedule store it feeds.
///
/// The store lock is never held across repository I/O, so two clients can still
/// validate against the same schedule and both insert overlapping plans.
pub struct Planner<R: ?Sized> {
    repo: Arc<R>,
    store: SharedStore,
}

impl<R: ?Sized> Clone for Planner<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            store: Arc::clone(&self.store),
        }
    }
}

impl<R> Planner<R>
where
    R: PlanRepository + ?Sized + 'static,
{
    pub fn new(repo: Arc<R>, policy: SlotPolicy) -> Self {
        Self {
            repo,
            store: Arc::new(Mutex::new(ScheduleStore::new(policy))),
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    pub fn store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }

    /// Initial (or manual) full refresh from the repository.
    pub async fn load(&self) -> Result<usize, PersistenceError> {
        bridge::refresh(self.repo.as_ref(), &self.store).await
    }

    /// Keep the store refreshed on every change notification.
    pub fn watch(&self) -> Subscription {
        bridge::spawn_refresher(Arc::clone(&self.repo), self.store())
    }

    pub async fn ranges_for(&self, date: NaiveDate) -> Vec<TimeRange> {
        self.store.lock().await.ranges_for(date).to_vec()
    }

    pub async fn availability(&self, date: NaiveDate) -> Vec<Availability> {
        self.store.lock().await.availability(date)
    }

    pub async fn dates_in_month(&self, year: i32, month: u32) -> Vec<NaiveDate> {
        self.store.lock().await.dates_in_month(year, month)
    }

    /// Declare a plan on `date` starting at `start`.
    ///
    /// The proposal is validated against the local schedule before any I/O.
    /// Only after the repository accepts it is the range recorded locally; a
    /// failed insert leaves the schedule untouched.
    ///
    /// # Errors
    /// [`crate::PlannerError::Validation`] if the proposal is rejected locally,
    /// [`crate::PlannerError::Persistence`] if the insert fails.
    #[instrument(skip(self))]
    pub async fn declare(&self, date: NaiveDate, start: ClockTime, today: NaiveDate) -> Result<Plan> {
        let range = {
            let store = self.store.lock().await;
            store
                .policy()
                .check_proposal(date, start, store.ranges_for(date), today)?
        };

        let plan = match self.repo.insert(NewPlan::new(date, range)).await {
            Ok(plan) => plan,
            Err(error) => {
                warn!(%error, "failed to store plan");
                return Err(error.into());
            }
        };

        // The refresher may already have picked up our own insert.
        if !self.store.lock().await.record_plan(&plan) {
            debug!(id = %plan.id, "plan already reflected by a refresh");
        }
        info!(id = %plan.id, %range, "plan declared");
        Ok(plan)
    }
}
