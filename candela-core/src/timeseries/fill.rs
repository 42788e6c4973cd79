use chrono::{DateTime, Utc};

use candela_types::{CandelaError, Cadence, Candle, FillReport, Interval};

use super::TimeSeries;
use super::gaps::detect;
use crate::connector::PointProvider;

/// A gap-filled series together with what was done to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filled {
    /// Series with every fillable gap repaired.
    pub series: TimeSeries,
    /// Per-row accounting of the fill.
    pub report: FillReport,
}

/// Carry the last known close forward into each timestamp of `gaps`.
///
/// Gaps are processed in ascending order so a synthesized row can anchor the
/// next one. Timestamps without any earlier row are reported as unfillable
/// and left absent.
#[must_use]
pub fn carry_forward(series: &TimeSeries, gaps: &[DateTime<Utc>]) -> Filled {
    let mut out = series.clone();
    let mut report = FillReport::default();
    let with_adj = series.has_adjclose();
    for &t in gaps {
        if out.contains(&t) {
            continue;
        }
        if push_carry(&mut out, t, with_adj) {
            report.filled.push(t);
        } else {
            report.missing_unfilled.push(t);
            report.warnings.push(CandelaError::UnfillableGap { ts: t });
        }
    }
    #[cfg(feature = "tracing")]
    {
        if !report.missing_unfilled.is_empty() {
            tracing::warn!(
                unfilled = report.missing_unfilled.len(),
                "gaps without an anchor candle were left unfilled"
            );
        }
    }
    Filled {
        series: out,
        report,
    }
}

/// Detect gaps at `cadence` and fill them by carrying the close forward.
///
/// Filled rows have `open = high = low = close` equal to the previous close,
/// zero volume, and the same price as adjusted close when the series carries
/// one.
///
/// # Errors
/// Returns `InsufficientData` for an empty series.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(name = "candela_core::fill_carry_forward", skip(series), fields(rows = series.len()))
)]
pub fn fill_carry_forward(series: &TimeSeries, cadence: Cadence) -> Result<Filled, CandelaError> {
    let gaps = detect(series, cadence)?;
    Ok(carry_forward(series, &gaps))
}

/// Detect gaps and ask `provider` for each missing candle.
///
/// A row the provider cannot supply (error, no data, or a candle stamped at a
/// different time) falls back to carry-forward and is recorded in the report
/// warnings. One failed row never aborts the batch.
///
/// Requests go out one at a time in gap order, so a provider that paces or
/// guards its calls controls the request rate of the whole fill.
///
/// # Errors
/// Returns `InsufficientData` for an empty series. A `Cancelled` or
/// `RequestTimeout` from the provider stops the fill and is returned as is.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        name = "candela_core::fill_with_refetch",
        skip(series, provider),
        fields(rows = series.len(), symbol = %symbol, interval = %interval)
    )
)]
pub async fn fill_with_refetch(
    series: &TimeSeries,
    cadence: Cadence,
    provider: &dyn PointProvider,
    symbol: &str,
    interval: Interval,
) -> Result<Filled, CandelaError> {
    let gaps = detect(series, cadence)?;
    let mut out = series.clone();
    let mut report = FillReport::default();
    let with_adj = series.has_adjclose();

    for t in gaps {
        let failure = match provider.candle_at(symbol, interval, t).await {
            Ok(Some(c)) if c.ts == t => {
                out.insert(c);
                report.refetched.push(t);
                continue;
            }
            Ok(Some(c)) => CandelaError::Data(format!(
                "point fetch for {t} returned candle stamped {}",
                c.ts
            )),
            Ok(None) => CandelaError::not_found(format!("candle for {symbol} at {t}")),
            Err(e) if e.is_interrupt() => return Err(e),
            Err(e) => e,
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(ts = %t, error = %failure, "refetch failed; carrying forward");
        report.warnings.push(failure);
        if push_carry(&mut out, t, with_adj) {
            report.filled.push(t);
        } else {
            report.missing_unfilled.push(t);
            report.warnings.push(CandelaError::UnfillableGap { ts: t });
        }
    }

    Ok(Filled {
        series: out,
        report,
    })
}

fn push_carry(series: &mut TimeSeries, t: DateTime<Utc>, with_adj: bool) -> bool {
    let Some(price) = series.last_at_or_before(t).map(|c| c.close) else {
        return false;
    };
    series.insert(Candle::flat(t, price, with_adj));
    true
}
