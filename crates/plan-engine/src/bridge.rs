//! Keep a [`ScheduleStore`] in step with its repository.
//!
//! A change signal is only a trigger. Whatever it carries, the response is the
//! same: fetch every plan and rebuild the index.

use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::PersistenceError;
use crate::persistence::{ChangeFeed, PlanRepository};
use crate::schedule::ScheduleStore;

/// A schedule store shared between the write path and the refresher task.
pub type SharedStore = Arc<Mutex<ScheduleStore>>;

/// Fetch all plans and rebuild `store`. Returns the number of plans loaded.
///
/// On failure the previous index stays in place: stale data is preferred over
/// an empty schedule.
#[instrument(skip_all)]
pub async fn refresh<R>(repo: &R, store: &Mutex<ScheduleStore>) -> Result<usize, PersistenceError>
where
    R: PlanRepository + ?Sized,
{
    match repo.fetch_all().await {
        Ok(plans) => {
            store.lock().await.rebuild(&plans);
            info!(n_plans = plans.len(), "schedule refreshed");
            Ok(plans.len())
        }
        Err(error) => {
            warn!(%error, "refresh failed, keeping the previous schedule");
            Err(error)
        }
    }
}

/// Handle to a running refresher. Dropping it also stops the refresher.
#[derive(Debug)]
pub struct Subscription {
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("refresher stopped");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Refresh `store` every time `repo` reports a change, until unsubscribed.
///
/// Must be called from within a tokio runtime.
pub fn spawn_refresher<R>(repo: Arc<R>, store: SharedStore) -> Subscription
where
    R: PlanRepository + ?Sized + 'static,
{
    // Subscribe before spawning so no signal between now and the first poll is missed.
    let feed = repo.subscribe();
    let handle = tokio::spawn(async move { run_refresher(repo, store, feed).await });
    Subscription {
        handle: Some(handle),
    }
}

async fn run_refresher<R>(repo: Arc<R>, store: SharedStore, mut feed: ChangeFeed)
where
    R: PlanRepository + ?Sized,
{
    loop {
        match feed.recv().await {
            Ok(_) => {}
            Err(RecvError::Lagged(n_missed)) => debug!(n_missed, "change feed lagged"),
            Err(RecvError::Closed) => {
                debug!("change feed closed");
                return;
            }
        }
        // A single full refresh covers every signal queued so far.
        loop {
            match feed.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        // Errors are already logged and the previous schedule is kept.
        refresh(repo.as_ref(), &store).await.ok();
    }
}
