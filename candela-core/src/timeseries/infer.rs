use chrono::TimeDelta;

use candela_types::{CandelaError, Cadence, Interval};

use super::TimeSeries;

/// Shortest and longest calendar month, in seconds.
const MONTH_MIN_SECS: i64 = 28 * 86_400;
const MONTH_MAX_SECS: i64 = 31 * 86_400;

/// Estimate a representative step (in seconds) from positive adjacent timestamp
/// deltas in the input series.
///
/// Returns the mode (most frequent delta). When several deltas are equally
/// frequent, the smallest of them wins, so a series with as many doubled
/// steps as regular ones still resolves to the regular step.
///
/// ```
/// use candela_core::{estimate_step_seconds, Candle, Decimal, TimeSeries};
/// use chrono::DateTime;
///
/// let mk = |s: i64| Candle::flat(DateTime::from_timestamp(s, 0).unwrap(), Decimal::ONE, false);
/// // Adjacent deltas: 60,60,120,120 => tie between 60 and 120, smallest wins
/// let series: TimeSeries = vec![mk(0), mk(60), mk(120), mk(240), mk(360)].into();
/// assert_eq!(estimate_step_seconds(&series), Some(60));
/// ```
///
/// Returns `None` if fewer than two rows are present.
#[must_use]
pub fn estimate_step_seconds(series: &TimeSeries) -> Option<i64> {
    let mut deltas: Vec<i64> = series
        .timestamps()
        .zip(series.timestamps().skip(1))
        .map(|(a, b)| (*b - *a).num_seconds())
        .filter(|d| *d > 0)
        .collect();
    if deltas.is_empty() {
        return None;
    }
    deltas.sort_unstable();

    // Runs are visited smallest-first, so a strict `>` keeps the smallest on ties.
    let mut best = (deltas[0], 0usize);
    let mut cur = (deltas[0], 0usize);
    for &d in &deltas {
        if d == cur.0 {
            cur.1 += 1;
        } else {
            if cur.1 > best.1 {
                best = cur;
            }
            cur = (d, 1);
        }
    }
    if cur.1 > best.1 {
        best = cur;
    }
    Some(best.0)
}

/// Infer the cadence of a series from its timestamps.
///
/// A dominant step between 28 and 31 days is treated as calendar-monthly.
///
/// # Errors
/// Returns `InsufficientData` when the series has fewer than two rows.
pub fn infer_cadence(series: &TimeSeries) -> Result<Cadence, CandelaError> {
    let secs = estimate_step_seconds(series).ok_or(CandelaError::InsufficientData {
        rows: series.len(),
        required: 2,
    })?;
    if (MONTH_MIN_SECS..=MONTH_MAX_SECS).contains(&secs) {
        return Ok(Cadence::Monthly);
    }
    Ok(Cadence::Fixed(TimeDelta::seconds(secs)))
}

/// Pick the cadence used for gap detection.
///
/// A declared interval always wins over inference; inference only runs when
/// nothing was declared.
///
/// # Errors
/// Returns `InsufficientData` when inference is needed and the series has
/// fewer than two rows.
pub fn resolve_cadence(
    series: &TimeSeries,
    declared: Option<Interval>,
) -> Result<Cadence, CandelaError> {
    match declared {
        Some(iv) => Ok(iv.cadence()),
        None => infer_cadence(series),
    }
}

/// Map an inferred cadence back to a known interval, if one matches.
#[must_use]
pub fn interval_for(cadence: Cadence) -> Option<Interval> {
    Interval::ALL.into_iter().find(|iv| iv.cadence() == cadence)
}
