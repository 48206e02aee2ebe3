//! The durable plan store the schedule is rebuilt from.
//!
//! [`PlanRepository`] is the contract; [`InMemoryRepository`] is a complete
//! implementation backed by process memory, used by tests and by the CLI's
//! file-backed store.
//!
//! Repositories do not reject overlapping plans. Two clients that validate
//! against the same stale schedule can both insert overlapping ranges, and that
//! is accepted: plans share intent, they are not reservations.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, instrument};

use crate::error::PersistenceError;
use crate::plan::{NewPlan, Plan, PlanId};

/// A plan was created somewhere. Carries no payload: receivers re-fetch everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeSignal;

/// Receiving end of a repository's change notifications.
pub type ChangeFeed = broadcast::Receiver<ChangeSignal>;

const CHANGE_FEED_CAPACITY: usize = 64;

#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Store a new plan, assigning its id and creation time.
    async fn insert(&self, plan: NewPlan) -> Result<Plan, PersistenceError>;

    /// Plans on `date`, ordered by start time.
    async fn fetch_by_date(&self, date: NaiveDate) -> Result<Vec<Plan>, PersistenceError>;

    /// Every plan, ordered by date and then start time.
    async fn fetch_all(&self) -> Result<Vec<Plan>, PersistenceError>;

    /// Subscribe to change notifications for plans created by any client.
    fn subscribe(&self) -> ChangeFeed;
}

/// Plans kept in memory, with broadcast change notifications.
#[derive(Debug)]
pub struct InMemoryRepository {
    plans: RwLock<Vec<Plan>>,
    next_id: AtomicU64,
    failing: AtomicBool,
    changes: broadcast::Sender<ChangeSignal>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::seeded(Vec::new())
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from previously stored plans. New ids continue after the highest
    /// `plan-N` id already present.
    pub fn seeded(plans: Vec<Plan>) -> Self {
        let last_id = plans
            .iter()
            .filter_map(|plan| plan.id.0.strip_prefix("plan-")?.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            plans: RwLock::new(plans),
            next_id: AtomicU64::new(last_id + 1),
            failing: AtomicBool::new(false),
            changes,
        }
    }

    /// Make every subsequent call fail with [`PersistenceError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), PersistenceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("in-memory store is offline".into()));
        }
        Ok(())
    }

    /// Insert a plan, committing it only once `persist` accepts the full plan
    /// list that would result.
    ///
    /// `persist` runs under the write lock. If it fails, nothing is stored and
    /// no change signal is sent.
    #[instrument(skip(self, persist))]
    pub async fn insert_with<F>(&self, plan: NewPlan, persist: F) -> Result<Plan, PersistenceError>
    where
        F: FnOnce(&[Plan]) -> Result<(), PersistenceError> + Send,
    {
        self.ensure_available()?;
        let stored = Plan {
            id: PlanId(format!("plan-{}", self.next_id.fetch_add(1, Ordering::SeqCst))),
            date: plan.date,
            start_time: plan.start_time,
            end_time: plan.end_time,
            created_at: Utc::now(),
        };

        {
            let mut plans = self.plans.write().await;
            let mut candidate = plans.clone();
            candidate.push(stored.clone());
            persist(&candidate)?;
            *plans = candidate;
        }

        // No subscribers is not an error.
        let n_receivers = self.changes.send(ChangeSignal).unwrap_or(0);
        debug!(id = %stored.id, n_receivers, "inserted plan");
        Ok(stored)
    }
}

fn sort_plans(plans: &mut [Plan]) {
    plans.sort_by(|a, b| {
        (a.date, a.start_time, a.end_time).cmp(&(b.date, b.start_time, b.end_time))
    });
}

#[async_trait]
impl PlanRepository for InMemoryRepository {
    async fn insert(&self, plan: NewPlan) -> Result<Plan, PersistenceError> {
        self.insert_with(plan, |_| Ok(())).await
    }

    async fn fetch_by_date(&self, date: NaiveDate) -> Result<Vec<Plan>, PersistenceError> {
        self.ensure_available()?;
        let mut plans: Vec<Plan> = self
            .plans
            .read()
            .await
            .iter()
            .filter(|plan| plan.date == date)
            .cloned()
            .collect();
        sort_plans(&mut plans);
        Ok(plans)
    }

    async fn fetch_all(&self) -> Result<Vec<Plan>, PersistenceError> {
        self.ensure_available()?;
        let mut plans = self.plans.read().await.clone();
        sort_plans(&mut plans);
        Ok(plans)
    }

    fn subscribe(&self) -> ChangeFeed {
        self.changes.subscribe()
    }
}
