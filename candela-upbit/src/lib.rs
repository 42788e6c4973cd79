//! candela-upbit
//!
//! Connector for the Upbit exchange.
//!
//! - [`UpbitConnector`] serves public data: candles paged backwards with the
//!   `to` cursor, the KRW market list, and single-candle lookups used by the
//!   refetch gap filler.
//! - [`UpbitExchange`] signs private requests (JWT HS256 with a SHA-512
//!   query hash) to submit orders and read account balances.
#![warn(missing_docs)]

mod auth;
mod client;
mod exchange;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use candela_core::connector::{
    CandleConnector, HistoryProvider, PageCursor, PageDirection, Pagination, PointProvider,
    SourceKey, SymbolProvider,
};
use candela_core::{CandelaError, Candle, Interval};

pub use auth::{Credentials, query_hash};
pub use client::{DEFAULT_BASE_URL, UpbitClient, candle_path};
pub use exchange::UpbitExchange;

pub(crate) const NAME: &str = "candela-upbit";

/// Public-data connector for Upbit.
pub struct UpbitConnector {
    client: UpbitClient,
}

impl UpbitConnector {
    /// Static connector key.
    pub const KEY: SourceKey = SourceKey::new(NAME);

    /// Maximum candles per request.
    pub const PAGE_SIZE: usize = 200;

    /// Spacing the public quotation API tolerates between requests.
    pub const MIN_DELAY: Duration = Duration::from_millis(100);

    /// Connector against the public API.
    ///
    /// # Errors
    /// Propagates client construction failures.
    pub fn new() -> Result<Self, CandelaError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Connector against another origin (tests, proxies).
    ///
    /// # Errors
    /// Returns `InvalidArg` when `base` is not an absolute URL.
    pub fn with_base_url(base: &str) -> Result<Self, CandelaError> {
        Ok(Self::with_client(UpbitClient::new(reqwest::Client::new(), base)?))
    }

    /// Connector over an existing client.
    #[must_use]
    pub const fn with_client(client: UpbitClient) -> Self {
        Self { client }
    }
}

impl CandleConnector for UpbitConnector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "upbit"
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
impl HistoryProvider for UpbitConnector {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela_upbit::fetch_page",
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
        match cursor {
            PageCursor::Before(to) => {
                self.client
                    .candles(symbol, interval, Self::PAGE_SIZE, to)
                    .await
            }
            PageCursor::Range { start, end } => {
                let mut rows = self
                    .client
                    .candles(symbol, interval, Self::PAGE_SIZE, end)
                    .await?;
                rows.retain(|c| c.ts >= start);
                Ok(rows)
            }
            PageCursor::Since(_) => Err(CandelaError::unsupported("history/since")),
        }
    }

    fn pagination(&self, _interval: Interval) -> Pagination {
        Pagination {
            direction: PageDirection::Backward,
            page_size: Some(Self::PAGE_SIZE),
            min_delay: Self::MIN_DELAY,
        }
    }

    fn supported_intervals(&self) -> &'static [Interval] {
        &Interval::ALL
    }
}

#[async_trait]
impl SymbolProvider for UpbitConnector {
    /// KRW-quoted markets only.
    async fn list_symbols(&self) -> Result<Vec<String>, CandelaError> {
        let mut markets: Vec<String> = self
            .client
            .markets()
            .await?
            .into_iter()
            .filter(|m| m.starts_with("KRW-"))
            .collect();
        markets.sort();
        Ok(markets)
    }
}

#[async_trait]
impl PointProvider for UpbitConnector {
    /// Asks for the single candle before `ts + step`; anything other than a
    /// candle starting at `ts` means the exchange has no row there.
    async fn candle_at(
        &self,
        symbol: &str,
        interval: Interval,
        ts: DateTime<Utc>,
    ) -> Result<Option<Candle>, CandelaError> {
        let to = interval
            .cadence()
            .nth(ts, 1)
            .ok_or_else(|| CandelaError::InvalidArg(format!("{ts} out of range")))?;
        let rows = self.client.candles(symbol, interval, 1, to).await?;
        Ok(rows.into_iter().find(|c| c.ts == ts))
    }
}
