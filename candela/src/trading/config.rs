//! Job list loaded from JSON.
//!
//! ```json
//! { "ma_cross": [1, "upbit", 500000, "08:00"],
//!   "weekly":   ["monday", "upbit", 100000, "09:30"] }
//! ```
//!
//! Each entry maps a registered strategy name to
//! `[cycle, market, budget, "HH:MM"]`, where the cycle is a day count or a
//! weekday name.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use candela_core::CandelaError;

use super::schedule::{Cycle, Schedule};

/// One scheduled strategy run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    /// Registered strategy name.
    pub strategy: String,
    /// Market whose executor places the order, e.g. `upbit`.
    pub market: String,
    /// Quote amount allotted to the job; zero means no cap.
    pub budget: Decimal,
    /// When the job runs.
    pub schedule: Schedule,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCycle {
    Days(u32),
    Named(String),
}

#[derive(Deserialize)]
struct RawJob(RawCycle, String, serde_json::Number, String);

/// Parse a JSON job list.
///
/// # Errors
/// `InvalidArg` for malformed JSON, unknown cycles, bad times or negative budgets.
pub fn parse_jobs(json: &str) -> Result<Vec<JobConfig>, CandelaError> {
    let raw: BTreeMap<String, RawJob> = serde_json::from_str(json)
        .map_err(|e| CandelaError::InvalidArg(format!("job config: {e}")))?;
    raw.into_iter()
        .map(|(strategy, RawJob(cycle, market, budget, at))| -> Result<JobConfig, CandelaError> {
            let cycle = match cycle {
                RawCycle::Days(n) => Cycle::every_days(n)?,
                RawCycle::Named(s) => s.parse::<Cycle>()?,
            };
            let budget = Decimal::from_str(&budget.to_string())
                .or_else(|_| Decimal::from_scientific(&budget.to_string()))
                .map_err(|e| CandelaError::InvalidArg(format!("{strategy} budget: {e}")))?;
            if budget.is_sign_negative() {
                return Err(CandelaError::InvalidArg(format!(
                    "{strategy} budget is negative"
                )));
            }
            Ok(JobConfig {
                schedule: Schedule::parse(cycle, &at)?,
                strategy,
                market: market.to_ascii_lowercase(),
                budget,
            })
        })
        .collect()
}

/// Read and parse a JSON job list from `path`.
///
/// # Errors
/// `Io` when the file cannot be read, otherwise see [`parse_jobs`].
pub fn load_jobs(path: impl AsRef<Path>) -> Result<Vec<JobConfig>, CandelaError> {
    let text = std::fs::read_to_string(path)?;
    parse_jobs(&text)
}
