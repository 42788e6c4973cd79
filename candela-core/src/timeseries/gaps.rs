use chrono::{DateTime, Months, TimeDelta, Utc};

use candela_types::{CandelaError, Cadence};

use super::TimeSeries;

/// Ascending timestamps that the cadence expects but the series lacks.
pub type GapSet = Vec<DateTime<Utc>>;

/// Missing timestamps between the first and last row of `series`.
///
/// The expected grid starts at the oldest row and steps by `cadence` up to
/// the newest row. Rows that sit off the grid are ignored.
///
/// # Errors
/// Returns `InsufficientData` for an empty series.
pub fn detect(series: &TimeSeries, cadence: Cadence) -> Result<GapSet, CandelaError> {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return Err(CandelaError::InsufficientData {
            rows: 0,
            required: 1,
        });
    };
    Ok(walk_grid(series, cadence, first.ts, |t| t <= last.ts))
}

/// Missing timestamps in `[start, end)`.
///
/// The grid is aligned to the oldest row when the series is non-empty, and
/// to `start` otherwise, so leading and trailing gaps are reported too.
///
/// # Errors
/// Returns `InvalidArg` when `start >= end`.
pub fn detect_in(
    series: &TimeSeries,
    cadence: Cadence,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<GapSet, CandelaError> {
    if start >= end {
        return Err(CandelaError::InvalidArg(format!(
            "empty detection range {start}..{end}"
        )));
    }
    let origin = series.first().map_or(start, |c| c.ts);
    let Some(first) = first_grid_point_at_or_after(cadence, origin, start) else {
        return Ok(Vec::new());
    };
    Ok(walk_grid(series, cadence, first, |t| t < end))
}

fn walk_grid<F>(series: &TimeSeries, cadence: Cadence, origin: DateTime<Utc>, keep: F) -> GapSet
where
    F: Fn(DateTime<Utc>) -> bool,
{
    let mut gaps = Vec::new();
    let mut k: u32 = 0;
    while let Some(t) = cadence.nth(origin, k) {
        if !keep(t) {
            break;
        }
        if !series.contains(&t) {
            gaps.push(t);
        }
        let Some(next) = k.checked_add(1) else { break };
        k = next;
    }
    gaps
}

/// Smallest point of the grid through `origin` that is `>= start`.
fn first_grid_point_at_or_after(
    cadence: Cadence,
    origin: DateTime<Utc>,
    start: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match cadence {
        Cadence::Fixed(step) => {
            let step_ms = step.num_milliseconds();
            if step_ms <= 0 {
                return None;
            }
            let diff = (start - origin).num_milliseconds();
            let k = diff.div_euclid(step_ms) + i64::from(diff.rem_euclid(step_ms) != 0);
            origin.checked_add_signed(TimeDelta::milliseconds(k.checked_mul(step_ms)?))
        }
        Cadence::Monthly => {
            if start >= origin {
                return (0u32..)
                    .map_while(|k| cadence.nth(origin, k))
                    .find(|t| *t >= start);
            }
            let mut best = origin;
            for k in 1u32.. {
                match origin.checked_sub_months(Months::new(k)) {
                    Some(p) if p >= start => best = p,
                    _ => break,
                }
            }
            Some(best)
        }
    }
}
