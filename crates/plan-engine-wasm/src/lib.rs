//! WASM bindings for plan-engine.
//!
//! Exposes candidate availability, proposal checks, and the per-date schedule
//! index to the browser front end via `wasm-bindgen`. All complex types are
//! passed as JSON strings; clock times are `HH:MM` (or `HH:MM:SS` on input)
//! and dates are `YYYY-MM-DD`.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p plan-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir web/pkg/ \
//!   target/wasm32-unknown-unknown/release/plan_engine_wasm.wasm
//! ```

use std::collections::BTreeMap;

use chrono::NaiveDate;
use plan_engine::{ClockTime, Plan, ScheduleIndex, SlotPolicy, TimeRange};
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    s.parse()
        .map_err(|e| format!("Invalid date '{}': {} (expected YYYY-MM-DD)", s, e))
}

fn parse_time(s: &str) -> Result<ClockTime, String> {
    s.parse().map_err(|e: plan_engine::ClockError| e.to_string())
}

/// Convert a JSON array of `{start, end}` objects into ranges.
fn parse_ranges_json(json: &str) -> Result<Vec<TimeRange>, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid ranges JSON: {}", e))
}

fn parse_policy(policy_toml: Option<&str>) -> Result<SlotPolicy, String> {
    match policy_toml {
        Some(source) => SlotPolicy::from_toml(source).map_err(|e| e.to_string()),
        None => Ok(SlotPolicy::default()),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization error: {}", e))
}

// ---------------------------------------------------------------------------
// Implementations (native-testable; the exports below only convert errors)
// ---------------------------------------------------------------------------

fn list_availability_impl(ranges_json: &str, policy_toml: Option<&str>) -> Result<String, String> {
    let ranges = parse_ranges_json(ranges_json)?;
    let policy = parse_policy(policy_toml)?;
    to_json(&policy.list_availability(&ranges))
}

fn check_proposal_impl(
    date: &str,
    start: &str,
    ranges_json: &str,
    today: &str,
    policy_toml: Option<&str>,
) -> Result<String, String> {
    let policy = parse_policy(policy_toml)?;
    let range = policy
        .check_proposal(
            parse_date(date)?,
            parse_time(start)?,
            &parse_ranges_json(ranges_json)?,
            parse_date(today)?,
        )
        .map_err(|e| e.to_string())?;
    to_json(&range)
}

fn rebuild_index_impl(plans_json: &str) -> Result<String, String> {
    let plans: Vec<Plan> =
        serde_json::from_str(plans_json).map_err(|e| format!("Invalid plans JSON: {}", e))?;
    let index = ScheduleIndex::from_plans(&plans);
    let by_date: BTreeMap<String, &[TimeRange]> = index
        .iter()
        .map(|(date, ranges)| (date.to_string(), ranges))
        .collect();
    to_json(&by_date)
}

fn candidate_end_time_impl(start: &str, policy_toml: Option<&str>) -> Result<Option<String>, String> {
    let policy = parse_policy(policy_toml)?;
    Ok(policy
        .candidate_end_time(parse_time(start)?)
        .map(|end| end.to_string()))
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Availability of every candidate start time, given the ranges already declared
/// on a date.
///
/// `ranges_json` is a JSON array of `{start, end}` objects. Returns a JSON array
/// of `{slot: {start, end}, status, range?}` objects in ascending start order;
/// `status` is one of `available`, `exceeds_day`, `declared`, `overlaps`.
#[wasm_bindgen(js_name = "listAvailability")]
pub fn list_availability(ranges_json: &str, policy_toml: Option<String>) -> Result<String, JsValue> {
    list_availability_impl(ranges_json, policy_toml.as_deref()).map_err(|e| JsValue::from_str(&e))
}

/// Validate a proposed plan before submitting it.
///
/// Returns the `{start, end}` range to store, or throws the reason it was rejected.
#[wasm_bindgen(js_name = "checkProposal")]
pub fn check_proposal(
    date: &str,
    start: &str,
    ranges_json: &str,
    today: &str,
    policy_toml: Option<String>,
) -> Result<String, JsValue> {
    check_proposal_impl(date, start, ranges_json, today, policy_toml.as_deref())
        .map_err(|e| JsValue::from_str(&e))
}

/// Group stored plan records by date.
///
/// `plans_json` is a JSON array of `{id, date, start_time, end_time, created_at}`
/// records. Returns a JSON object mapping each date to its ranges sorted by start.
#[wasm_bindgen(js_name = "rebuildIndex")]
pub fn rebuild_index(plans_json: &str) -> Result<String, JsValue> {
    rebuild_index_impl(plans_json).map_err(|e| JsValue::from_str(&e))
}

/// The end time implied by a start time, or `undefined` past midnight.
#[wasm_bindgen(js_name = "candidateEndTime")]
pub fn candidate_end_time(start: &str, policy_toml: Option<String>) -> Result<Option<String>, JsValue> {
    candidate_end_time_impl(start, policy_toml.as_deref()).map_err(|e| JsValue::from_str(&e))
}
