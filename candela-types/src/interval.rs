//! Sampling intervals and their step arithmetic.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Months, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::CandelaError;

/// Nominal sampling period of a candle series.
///
/// Serialized as its canonical short label (`"1m"`, `"1d"`, `"1wk"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[non_exhaustive]
pub enum Interval {
    /// One minute.
    I1m,
    /// Three minutes.
    I3m,
    /// Five minutes.
    I5m,
    /// Ten minutes.
    I10m,
    /// Fifteen minutes.
    I15m,
    /// Thirty minutes.
    I30m,
    /// Sixty minutes.
    I1h,
    /// Four hours.
    I4h,
    /// One day.
    D1,
    /// One week.
    W1,
    /// One calendar month.
    Mo1,
}

impl Interval {
    /// Every interval, finest first.
    pub const ALL: [Self; 11] = [
        Self::I1m,
        Self::I3m,
        Self::I5m,
        Self::I10m,
        Self::I15m,
        Self::I30m,
        Self::I1h,
        Self::I4h,
        Self::D1,
        Self::W1,
        Self::Mo1,
    ];

    /// Minutes per candle for intraday intervals, `None` otherwise.
    #[must_use]
    pub const fn minutes(self) -> Option<i64> {
        match self {
            Self::I1m => Some(1),
            Self::I3m => Some(3),
            Self::I5m => Some(5),
            Self::I10m => Some(10),
            Self::I15m => Some(15),
            Self::I30m => Some(30),
            Self::I1h => Some(60),
            Self::I4h => Some(240),
            Self::D1 | Self::W1 | Self::Mo1 => None,
        }
    }

    /// Step arithmetic for this interval.
    #[must_use]
    pub fn cadence(self) -> Cadence {
        match self {
            Self::D1 => Cadence::Fixed(TimeDelta::days(1)),
            Self::W1 => Cadence::Fixed(TimeDelta::weeks(1)),
            Self::Mo1 => Cadence::Monthly,
            intraday => Cadence::Fixed(TimeDelta::minutes(intraday.minutes().unwrap_or(1))),
        }
    }

    /// Canonical short label used in file names and configs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::I1m => "1m",
            Self::I3m => "3m",
            Self::I5m => "5m",
            Self::I10m => "10m",
            Self::I15m => "15m",
            Self::I30m => "30m",
            Self::I1h => "60m",
            Self::I4h => "240m",
            Self::D1 => "1d",
            Self::W1 => "1wk",
            Self::Mo1 => "1mo",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = CandelaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let iv = match s.trim().to_ascii_lowercase().as_str() {
            "1m" => Self::I1m,
            "3m" => Self::I3m,
            "5m" => Self::I5m,
            "10m" => Self::I10m,
            "15m" => Self::I15m,
            "30m" => Self::I30m,
            "60m" | "1h" => Self::I1h,
            "240m" | "4h" => Self::I4h,
            "1d" | "day" | "days" => Self::D1,
            "1wk" | "1w" | "week" | "weeks" => Self::W1,
            "1mo" | "month" | "months" => Self::Mo1,
            other => {
                return Err(CandelaError::InvalidArg(format!(
                    "unknown interval '{other}'"
                )));
            }
        };
        Ok(iv)
    }
}

impl TryFrom<String> for Interval {
    type Error = CandelaError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Interval> for String {
    fn from(iv: Interval) -> Self {
        iv.as_str().to_string()
    }
}

/// How consecutive timestamps of a series are spaced.
///
/// Calendar months have no fixed length, so they are stepped with calendar
/// arithmetic rather than a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// A constant, strictly positive duration.
    Fixed(TimeDelta),
    /// One calendar month.
    Monthly,
}

impl Cadence {
    /// Build a fixed cadence from a positive number of seconds.
    ///
    /// # Errors
    /// Returns `InvalidArg` when `secs` is not strictly positive.
    pub fn from_seconds(secs: i64) -> Result<Self, CandelaError> {
        if secs <= 0 {
            return Err(CandelaError::InvalidArg(format!(
                "cadence must be positive, got {secs}s"
            )));
        }
        Ok(Self::Fixed(TimeDelta::seconds(secs)))
    }

    /// The `k`-th grid point after `origin` (`k = 0` is `origin` itself).
    ///
    /// Monthly steps are computed from the origin each time so day-of-month
    /// clamping does not accumulate.
    #[must_use]
    pub fn nth(self, origin: DateTime<Utc>, k: u32) -> Option<DateTime<Utc>> {
        match self {
            Self::Fixed(step) => step
                .checked_mul(i32::try_from(k).ok()?)
                .and_then(|d| origin.checked_add_signed(d)),
            Self::Monthly => origin.checked_add_months(Months::new(k)),
        }
    }

    /// The grid point immediately before `ts`.
    #[must_use]
    pub fn prev(self, ts: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Fixed(step) => ts.checked_sub_signed(step),
            Self::Monthly => ts.checked_sub_months(Months::new(1)),
        }
    }

    /// Approximate length of one step, used for page-span estimates.
    #[must_use]
    pub fn approx(self) -> TimeDelta {
        match self {
            Self::Fixed(step) => step,
            Self::Monthly => TimeDelta::days(30),
        }
    }
}
