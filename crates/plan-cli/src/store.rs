//! A plan repository persisted as a JSON array of plan records in one file.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use plan_engine::{ChangeFeed, InMemoryRepository, NewPlan, PersistenceError, Plan, PlanRepository};
use tracing::{debug, instrument};

/// Loads every plan from `path` up front and rewrites the file after each insert.
pub struct JsonFileRepository {
    path: PathBuf,
    plans: InMemoryRepository,
}

impl JsonFileRepository {
    /// Open the store at `path`. A missing file is an empty store.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        let plans: Vec<Plan> = match std::fs::read_to_string(path) {
            Ok(raw) if raw.trim().is_empty() => Vec::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(PersistenceError::backend)?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(error) => return Err(PersistenceError::backend(error)),
        };
        debug!(n_plans = plans.len(), "opened plan store");
        Ok(Self {
            path: path.to_path_buf(),
            plans: InMemoryRepository::seeded(plans),
        })
    }
}

fn write_plans(path: &Path, plans: &[Plan]) -> Result<(), PersistenceError> {
    let json = serde_json::to_string_pretty(plans).map_err(PersistenceError::backend)?;
    std::fs::write(path, json).map_err(PersistenceError::backend)
}

#[async_trait]
impl PlanRepository for JsonFileRepository {
    async fn insert(&self, plan: NewPlan) -> Result<Plan, PersistenceError> {
        // The file is written before the plan becomes visible or anyone is notified.
        self.plans
            .insert_with(plan, |plans| write_plans(&self.path, plans))
            .await
    }

    async fn fetch_by_date(&self, date: NaiveDate) -> Result<Vec<Plan>, PersistenceError> {
        self.plans.fetch_by_date(date).await
    }

    async fn fetch_all(&self) -> Result<Vec<Plan>, PersistenceError> {
        self.plans.fetch_all().await
    }

    fn subscribe(&self) -> ChangeFeed {
        self.plans.subscribe()
    }
}
