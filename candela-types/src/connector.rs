//! Connector and series identity types usable across crates.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CandelaError, Interval};

/// Typed key for identifying connectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceKey(pub &'static str);

impl SourceKey {
    /// Construct a new typed source key from a static name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the inner static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl From<SourceKey> for &'static str {
    fn from(k: SourceKey) -> Self {
        k.0
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Identity of one persisted series: `(ticker, interval, source)`.
///
/// Each key owns exactly one store file and has at most one writer at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    /// Exchange-native ticker, e.g. `KRW-BTC`, `BTCUSDT`, `AAPL`.
    pub ticker: String,
    /// Sampling interval.
    pub interval: Interval,
    /// Short source label used in file names, e.g. `upbit`.
    pub source: String,
}

impl SeriesKey {
    /// Build a key, rejecting empty tickers and source labels.
    ///
    /// # Errors
    /// Returns `InvalidArg` when `ticker` or `source` is blank.
    pub fn new(
        ticker: impl Into<String>,
        interval: Interval,
        source: impl Into<String>,
    ) -> Result<Self, CandelaError> {
        let ticker = ticker.into();
        let source = source.into();
        if ticker.trim().is_empty() {
            return Err(CandelaError::InvalidArg("empty ticker".into()));
        }
        if source.trim().is_empty() {
            return Err(CandelaError::InvalidArg("empty source label".into()));
        }
        Ok(Self {
            ticker,
            interval,
            source,
        })
    }

    /// File stem `{ticker}_{interval}_ohlcv_{source}`.
    ///
    /// Path separators in the ticker are replaced with `-`.
    #[must_use]
    pub fn file_stem(&self) -> String {
        let ticker: String = self
            .ticker
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '-' } else { c })
            .collect();
        format!("{ticker}_{}_ohlcv_{}", self.interval, self.source)
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.source, self.ticker, self.interval)
    }
}
