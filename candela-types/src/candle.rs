//! The canonical OHLCV row.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One OHLCV candle for a fixed time bucket starting at `ts`.
///
/// `adjclose` is only populated by sources that publish an adjusted close
/// (Yahoo Finance); crypto exchanges leave it `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket start, UTC.
    pub ts: DateTime<Utc>,
    /// Opening price.
    pub open: Decimal,
    /// Highest traded price.
    pub high: Decimal,
    /// Lowest traded price.
    pub low: Decimal,
    /// Closing price.
    pub close: Decimal,
    /// Traded volume, never negative.
    pub volume: Decimal,
    /// Adjusted close, if the source carries one.
    #[serde(default)]
    pub adjclose: Option<Decimal>,
}

impl Candle {
    /// Build a candle without an adjusted close.
    #[must_use]
    pub const fn new(
        ts: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            ts,
            open,
            high,
            low,
            close,
            volume,
            adjclose: None,
        }
    }

    /// Attach an adjusted close.
    #[must_use]
    pub const fn with_adjclose(mut self, adjclose: Decimal) -> Self {
        self.adjclose = Some(adjclose);
        self
    }

    /// A zero-volume candle whose four prices all equal `price`.
    ///
    /// This is the shape of a carry-forward fill row. When `with_adjclose`
    /// is set the adjusted close is the same price.
    #[must_use]
    pub fn flat(ts: DateTime<Utc>, price: Decimal, with_adjclose: bool) -> Self {
        Self {
            ts,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: Decimal::ZERO,
            adjclose: with_adjclose.then_some(price),
        }
    }

    /// Same candle re-stamped at `ts`.
    #[must_use]
    pub fn at(mut self, ts: DateTime<Utc>) -> Self {
        self.ts = ts;
        self
    }
}
