//! candela-binance
//!
//! Public connector for Binance spot market data. History is paged forward
//! with `startTime`, up to 1000 klines per request; symbols come from
//! `exchangeInfo`.
#![warn(missing_docs)]

mod wire;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use url::Url;

use candela_core::connector::{
    CandleConnector, HistoryProvider, PageCursor, PageDirection, Pagination, PointProvider,
    SourceKey, SymbolProvider,
};
use candela_core::{CandelaError, Candle, Interval};

use wire::{ExchangeInfo, RawKline, get_json};

pub(crate) const NAME: &str = "candela-binance";

/// Public REST origin.
pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

const SUPPORTED: &[Interval] = &[
    Interval::I1m,
    Interval::I3m,
    Interval::I5m,
    Interval::I15m,
    Interval::I30m,
    Interval::I1h,
    Interval::I4h,
    Interval::D1,
    Interval::W1,
    Interval::Mo1,
];

/// Binance kline interval label, `None` for intervals Binance lacks (10m).
#[must_use]
pub const fn interval_label(interval: Interval) -> Option<&'static str> {
    Some(match interval {
        Interval::I1m => "1m",
        Interval::I3m => "3m",
        Interval::I5m => "5m",
        Interval::I15m => "15m",
        Interval::I30m => "30m",
        Interval::I1h => "1h",
        Interval::I4h => "4h",
        Interval::D1 => "1d",
        Interval::W1 => "1w",
        Interval::Mo1 => "1M",
        _ => return None,
    })
}

/// Public-data connector for Binance spot.
pub struct BinanceConnector {
    http: reqwest::Client,
    base: String,
}

impl BinanceConnector {
    /// Static connector key.
    pub const KEY: SourceKey = SourceKey::new(NAME);

    /// Maximum klines per request.
    pub const PAGE_SIZE: usize = 1000;

    /// Spacing that keeps kline requests well inside the request-weight budget.
    pub const MIN_DELAY: Duration = Duration::from_millis(100);

    /// Connector against the public API.
    ///
    /// # Errors
    /// Propagates base URL validation failures.
    pub fn new() -> Result<Self, CandelaError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Connector against another origin (tests, regional mirrors).
    ///
    /// # Errors
    /// Returns `InvalidArg` when `base` is not an absolute URL.
    pub fn with_base_url(base: &str) -> Result<Self, CandelaError> {
        Self::with_client(reqwest::Client::new(), base)
    }

    /// Connector over an existing HTTP client.
    ///
    /// # Errors
    /// Returns `InvalidArg` when `base` is not an absolute URL.
    pub fn with_client(http: reqwest::Client, base: &str) -> Result<Self, CandelaError> {
        Url::parse(base).map_err(|e| CandelaError::InvalidArg(format!("base url {base}: {e}")))?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, CandelaError> {
        Url::parse(&format!("{}{path}", self.base))
            .map_err(|e| CandelaError::InvalidArg(format!("{path}: {e}")))
    }

    async fn klines(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
        start: Option<DateTime<Utc>>,
        end_exclusive: Option<DateTime<Utc>>,
    ) -> Result<Vec<Candle>, CandelaError> {
        let label = interval_label(interval)
            .ok_or_else(|| CandelaError::unsupported(format!("history/{interval}")))?;
        let mut url = self.endpoint("/api/v3/klines")?;
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("symbol", symbol)
                .append_pair("interval", label)
                .append_pair("limit", &limit.to_string());
            if let Some(start) = start {
                q.append_pair("startTime", &start.timestamp_millis().to_string());
            }
            if let Some(end) = end_exclusive {
                // endTime is inclusive on Binance
                let end = end - TimeDelta::milliseconds(1);
                q.append_pair("endTime", &end.timestamp_millis().to_string());
            }
        }
        let rows: Vec<RawKline> =
            get_json(self.http.get(url), &format!("klines for {symbol}")).await?;
        rows.into_iter().map(RawKline::into_candle).collect()
    }
}

impl CandleConnector for BinanceConnector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "binance"
    }

    fn as_history_provider(&self) -> Option<&dyn HistoryProvider> {
        Some(self as &dyn HistoryProvider)
    }

    fn as_symbol_provider(&self) -> Option<&dyn SymbolProvider> {
        Some(self as &dyn SymbolProvider)
    }

    fn as_point_provider(&self) -> Option<&dyn PointProvider> {
        Some(self as &dyn PointProvider)
    }
}

#[async_trait]
impl HistoryProvider for BinanceConnector {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela_binance::fetch_page",
            skip(self, symbol, interval),
            fields(symbol = %symbol, interval = %interval),
        )
    )]
    async fn fetch_page(
        &self,
        symbol: &str,
        interval: Interval,
        cursor: PageCursor,
    ) -> Result<Vec<Candle>, CandelaError> {
        let (start, end) = match cursor {
            PageCursor::Since(t) => (Some(t), None),
            PageCursor::Before(t) => (None, Some(t)),
            PageCursor::Range { start, end } => (Some(start), Some(end)),
        };
        self.klines(symbol, interval, Self::PAGE_SIZE, start, end).await
    }

    fn pagination(&self, _interval: Interval) -> Pagination {
        Pagination {
            direction: PageDirection::Forward,
            page_size: Some(Self::PAGE_SIZE),
            min_delay: Self::MIN_DELAY,
        }
    }

    fn supported_intervals(&self) -> &'static [Interval] {
        SUPPORTED
    }
}

#[async_trait]
impl SymbolProvider for BinanceConnector {
    /// Symbols currently in `TRADING` status.
    async fn list_symbols(&self) -> Result<Vec<String>, CandelaError> {
        let url = self.endpoint("/api/v3/exchangeInfo")?;
        let info: ExchangeInfo = get_json(self.http.get(url), "exchangeInfo").await?;
        let mut symbols: Vec<String> = info
            .symbols
            .into_iter()
            .filter(|s| s.status == "TRADING")
            .map(|s| s.symbol)
            .collect();
        symbols.sort();
        Ok(symbols)
    }
}

#[async_trait]
impl PointProvider for BinanceConnector {
    async fn candle_at(
        &self,
        symbol: &str,
        interval: Interval,
        ts: DateTime<Utc>,
    ) -> Result<Option<Candle>, CandelaError> {
        let rows = self.klines(symbol, interval, 1, Some(ts), None).await?;
        Ok(rows.into_iter().find(|c| c.ts == ts))
    }
}
