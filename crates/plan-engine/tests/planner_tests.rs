//! Tests for the write path, the in-memory repository, and change-driven refreshes.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use plan_engine::{
    refresh, ChangeFeed, ClockTime, InMemoryRepository, NewPlan, PersistenceError, Plan,
    PlanRepository, Planner, PlannerError, ScheduleStore, SharedStore, SlotPolicy, StoreState,
    TimeRange, ValidationError,
};
use tokio::sync::Mutex;

// ── Helpers ─────────────────────────────────────────────────────────────────

fn t(s: &str) -> ClockTime {
    s.parse().unwrap()
}

fn range(start: &str, end: &str) -> TimeRange {
    TimeRange::new(t(start), t(end)).unwrap()
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn today() -> NaiveDate {
    date("2025-06-01")
}

fn new_plan(on: &str, start: &str, end: &str) -> NewPlan {
    NewPlan::new(date(on), range(start, end))
}

fn planner() -> Planner<InMemoryRepository> {
    Planner::new(Arc::new(InMemoryRepository::new()), SlotPolicy::default())
}

/// Poll `check` until it holds, yielding to the refresher task in between.
async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within one second");
}

/// Lets another client store the same range, and refreshes the schedule,
/// while our own insert is in flight.
struct RacingRepository {
    inner: InMemoryRepository,
    store: OnceLock<SharedStore>,
}

#[async_trait]
impl PlanRepository for RacingRepository {
    async fn insert(&self, plan: NewPlan) -> Result<Plan, PersistenceError> {
        self.inner.insert(plan).await?;
        if let Some(store) = self.store.get() {
            refresh(&self.inner, store).await?;
        }
        self.inner.insert(plan).await
    }

    async fn fetch_by_date(&self, date: NaiveDate) -> Result<Vec<Plan>, PersistenceError> {
        self.inner.fetch_by_date(date).await
    }

    async fn fetch_all(&self) -> Result<Vec<Plan>, PersistenceError> {
        self.inner.fetch_all().await
    }

    fn subscribe(&self) -> ChangeFeed {
        self.inner.subscribe()
    }
}

// ── Repository ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn repository_assigns_ids_and_orders_results() {
    let repo = InMemoryRepository::new();
    let a = repo.insert(new_plan("2025-06-02", "14:00", "16:00")).await.unwrap();
    let b = repo.insert(new_plan("2025-06-01", "08:00", "10:00")).await.unwrap();
    let c = repo.insert(new_plan("2025-06-02", "08:00", "10:00")).await.unwrap();
    assert_ne!(a.id, b.id);
    assert_ne!(b.id, c.id);

    let all = repo.fetch_all().await.unwrap();
    let ids: Vec<_> = all.iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids, vec![b.id, c.id.clone(), a.id.clone()]);

    let on_date = repo.fetch_by_date(date("2025-06-02")).await.unwrap();
    let ids: Vec<_> = on_date.iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids, vec![c.id, a.id]);
}

#[tokio::test]
async fn seeded_repository_continues_ids() {
    let seed = InMemoryRepository::new();
    let first = seed.insert(new_plan("2025-06-01", "08:00", "10:00")).await.unwrap();
    let plans = seed.fetch_all().await.unwrap();

    let repo = InMemoryRepository::seeded(plans);
    let next = repo.insert(new_plan("2025-06-01", "10:00", "12:00")).await.unwrap();
    assert_ne!(first.id, next.id);
}

#[tokio::test]
async fn repository_accepts_overlapping_plans() {
    // Nothing below the validator rejects overlaps.
    let repo = InMemoryRepository::new();
    repo.insert(new_plan("2025-06-01", "08:00", "10:00")).await.unwrap();
    repo.insert(new_plan("2025-06-01", "09:00", "11:00")).await.unwrap();
    assert_eq!(repo.fetch_by_date(date("2025-06-01")).await.unwrap().len(), 2);
}

#[tokio::test]
async fn rejected_persist_stores_nothing_and_stays_silent() {
    let repo = InMemoryRepository::new();
    let mut feed = repo.subscribe();

    let err = repo
        .insert_with(new_plan("2025-06-01", "08:00", "10:00"), |_| {
            Err(PersistenceError::Unavailable("disk full".into()))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::Unavailable(_)));
    assert!(feed.try_recv().is_err());
    assert!(repo.fetch_all().await.unwrap().is_empty());

    repo.insert(new_plan("2025-06-01", "08:00", "10:00")).await.unwrap();
    assert_eq!(repo.fetch_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn persist_sees_the_full_resulting_plan_list() {
    let repo = InMemoryRepository::new();
    repo.insert(new_plan("2025-06-01", "08:00", "10:00")).await.unwrap();

    let plan = repo
        .insert_with(new_plan("2025-06-02", "08:00", "10:00"), |plans| {
            assert_eq!(plans.len(), 2);
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(repo.fetch_by_date(plan.date).await.unwrap(), vec![plan]);
}

#[tokio::test]
async fn repository_notifies_subscribers() {
    let repo = InMemoryRepository::new();
    let mut feed = repo.subscribe();
    repo.insert(new_plan("2025-06-01", "08:00", "10:00")).await.unwrap();
    assert!(feed.try_recv().is_ok());
}

// ── refresh ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_refresh_keeps_previous_schedule() {
    let repo = InMemoryRepository::new();
    repo.insert(new_plan("2025-06-01", "08:00", "10:00")).await.unwrap();
    let store = Mutex::new(ScheduleStore::default());

    assert_eq!(refresh(&repo, &store).await.unwrap(), 1);

    repo.set_failing(true);
    let err = refresh(&repo, &store).await.unwrap_err();
    assert!(matches!(err, PersistenceError::Unavailable(_)));

    let store = store.lock().await;
    assert_eq!(store.state(), StoreState::Ready);
    assert_eq!(store.ranges_for(date("2025-06-01")), &[range("08:00", "10:00")]);
}

#[tokio::test]
async fn failed_first_refresh_leaves_store_stale() {
    let repo = InMemoryRepository::new();
    repo.set_failing(true);
    let store = Mutex::new(ScheduleStore::default());
    assert!(refresh(&repo, &store).await.is_err());
    assert_eq!(store.lock().await.state(), StoreState::Stale);
}

// ── declare ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn declare_persists_and_records_locally() {
    let planner = planner();
    planner.load().await.unwrap();

    let plan = planner.declare(today(), t("08:00"), today()).await.unwrap();
    assert_eq!(plan.start_time, t("08:00"));
    assert_eq!(plan.end_time, t("10:00"));

    assert_eq!(planner.ranges_for(today()).await, vec![range("08:00", "10:00")]);
    assert_eq!(planner.repository().fetch_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn declare_adjacent_plans_lists_both_sorted() {
    let planner = planner();
    planner.load().await.unwrap();

    planner.declare(today(), t("10:00"), today()).await.unwrap();
    planner.declare(today(), t("08:00"), today()).await.unwrap();

    assert_eq!(
        planner.ranges_for(today()).await,
        vec![range("08:00", "10:00"), range("10:00", "12:00")]
    );
}

#[tokio::test]
async fn overlapping_declaration_never_reaches_the_repository() {
    let planner = planner();
    planner.load().await.unwrap();
    planner.declare(today(), t("08:00"), today()).await.unwrap();

    let err = planner.declare(today(), t("09:00"), today()).await.unwrap_err();
    assert!(matches!(
        err,
        PlannerError::Validation(ValidationError::Overlaps { .. })
    ));
    assert_eq!(planner.repository().fetch_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_insert_records_nothing_locally() {
    let planner = planner();
    planner.load().await.unwrap();
    planner.repository().set_failing(true);

    let err = planner.declare(today(), t("08:00"), today()).await.unwrap_err();
    assert!(matches!(err, PlannerError::Persistence(_)));
    assert!(planner.ranges_for(today()).await.is_empty());
}

#[tokio::test]
async fn declaration_uses_the_configured_policy() {
    let policy = SlotPolicy {
        duration_minutes: 90,
        step_minutes: 30,
        ..SlotPolicy::default()
    };
    let planner = Planner::new(Arc::new(InMemoryRepository::new()), policy);
    let plan = planner.declare(today(), t("08:30"), today()).await.unwrap();
    assert_eq!(plan.end_time, t("10:00"));
}

// ── watch ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn watcher_picks_up_plans_from_other_clients() {
    let repo = Arc::new(InMemoryRepository::new());
    let ours = Planner::new(Arc::clone(&repo), SlotPolicy::default());
    let theirs = Planner::new(Arc::clone(&repo), SlotPolicy::default());
    ours.load().await.unwrap();
    let _subscription = ours.watch();

    theirs.declare(today(), t("18:00"), today()).await.unwrap();

    let ours = &ours;
    eventually(move || async move { ours.ranges_for(today()).await == vec![range("18:00", "20:00")] })
        .await;
}

#[tokio::test]
async fn own_declaration_is_not_duplicated_by_the_watcher() {
    let planner = planner();
    planner.load().await.unwrap();
    let _subscription = planner.watch();

    planner.declare(today(), t("08:00"), today()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(planner.ranges_for(today()).await, vec![range("08:00", "10:00")]);
}

#[tokio::test]
async fn identical_range_from_another_client_is_kept_alongside_ours() {
    let repo = Arc::new(RacingRepository {
        inner: InMemoryRepository::new(),
        store: OnceLock::new(),
    });
    let planner = Planner::new(Arc::clone(&repo), SlotPolicy::default());
    planner.load().await.unwrap();
    repo.store.set(planner.store()).ok();

    let plan = planner.declare(today(), t("08:00"), today()).await.unwrap();

    assert!(planner.store().lock().await.knows_plan(&plan.id));
    assert_eq!(
        planner.ranges_for(today()).await,
        vec![range("08:00", "10:00"), range("08:00", "10:00")]
    );
    assert_eq!(repo.fetch_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn unsubscribed_watcher_stops_refreshing() {
    let repo = Arc::new(InMemoryRepository::new());
    let planner = Planner::new(Arc::clone(&repo), SlotPolicy::default());
    planner.load().await.unwrap();

    let subscription = planner.watch();
    assert!(subscription.is_active());
    subscription.unsubscribe();

    repo.insert(new_plan("2025-06-01", "08:00", "10:00")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(planner.ranges_for(today()).await.is_empty());
}

#[tokio::test]
async fn concurrent_clients_can_both_declare_overlapping_plans() {
    // Both clients validate against the same schedule before either insert lands.
    let repo = Arc::new(InMemoryRepository::new());
    let a = Planner::new(Arc::clone(&repo), SlotPolicy::default());
    let b = Planner::new(Arc::clone(&repo), SlotPolicy::default());
    a.load().await.unwrap();
    b.load().await.unwrap();

    a.declare(today(), t("08:00"), today()).await.unwrap();
    b.declare(today(), t("09:00"), today()).await.unwrap();

    assert_eq!(repo.fetch_by_date(today()).await.unwrap().len(), 2);
}
