//! `fieldplan` CLI: declare and browse usage plans for a shared field.
//!
//! Plans share intent only; they are not reservations.
//!
//! ## Usage
//!
//! ```sh
//! # Which start times are still free on a date
//! fieldplan --store plans.json availability --date 2025-06-01
//!
//! # Declared ranges on a date, sorted by start
//! fieldplan --store plans.json ranges --date 2025-06-01
//!
//! # Declare a two-hour plan starting at 18:00
//! fieldplan --store plans.json declare --date 2025-06-01 --start 18:00
//!
//! # Days in a month that already have plans
//! fieldplan --store plans.json calendar --month 2025-06
//! ```
//!
//! Set `RUST_LOG=debug` to see what the engine is doing.

mod store;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use plan_engine::{ClockTime, Planner, SlotPolicy};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::store::JsonFileRepository;

#[derive(Parser)]
#[command(
    name = "fieldplan",
    version,
    about = "Share when you intend to use the field (not a reservation)"
)]
struct Cli {
    /// JSON file holding every declared plan (created on first declaration)
    #[arg(long, env = "FIELDPLAN_STORE", default_value = "plans.json")]
    store: PathBuf,

    /// TOML file overriding the slot policy (duration and candidate start times)
    #[arg(long, env = "FIELDPLAN_POLICY")]
    policy: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every candidate start time on a date and whether it is free
    Availability {
        /// Date as YYYY-MM-DD
        #[arg(short, long)]
        date: NaiveDate,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List the ranges already declared on a date
    Ranges {
        /// Date as YYYY-MM-DD
        #[arg(short, long)]
        date: NaiveDate,
        /// Print JSON instead of one range per line
        #[arg(long)]
        json: bool,
    },
    /// Declare a plan starting at the given time
    Declare {
        /// Date as YYYY-MM-DD
        #[arg(short, long)]
        date: NaiveDate,
        /// Start time as HH:MM
        #[arg(short, long)]
        start: ClockTime,
        /// Treat this date as today when rejecting past dates (defaults to the local date)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// List the days of a month that have declared plans
    Calendar {
        /// Month as YYYY-MM
        #[arg(short, long)]
        month: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let policy = match &cli.policy {
        Some(path) => SlotPolicy::from_file(path)
            .with_context(|| format!("Failed to load slot policy: {}", path.display()))?,
        None => SlotPolicy::default(),
    };
    let repo = JsonFileRepository::open(&cli.store)
        .with_context(|| format!("Failed to open plan store: {}", cli.store.display()))?;
    let planner = Planner::new(Arc::new(repo), policy);
    planner.load().await.context("Failed to load plans")?;

    match cli.command {
        Commands::Availability { date, json } => {
            let listing = planner.availability(date).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                for entry in listing {
                    let end = entry
                        .slot
                        .end
                        .map_or_else(|| "--:--".to_string(), |end| end.to_string());
                    println!("{} - {}  {}", entry.slot.start, end, entry.status);
                }
            }
        }
        Commands::Ranges { date, json } => {
            let ranges = planner.ranges_for(date).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&ranges)?);
            } else if ranges.is_empty() {
                println!("No plans declared on {date}");
            } else {
                for range in ranges {
                    println!("{range}");
                }
            }
        }
        Commands::Declare { date, start, today } => {
            let today = today.unwrap_or_else(|| Local::now().date_naive());
            let plan = planner
                .declare(date, start, today)
                .await
                .context("Failed to declare plan")?;
            println!(
                "Declared {} - {} on {} ({})",
                plan.start_time, plan.end_time, plan.date, plan.id
            );
        }
        Commands::Calendar { month } => {
            let first = parse_month(&month)?;
            for date in planner.dates_in_month(first.year(), first.month()).await {
                println!("{date}");
            }
        }
    }

    Ok(())
}

/// Parse `YYYY-MM` into the first day of that month.
fn parse_month(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d")
        .with_context(|| format!("Invalid month: '{raw}' (expected YYYY-MM)"))
}
