use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use candela_types::{CandelaError, Candle, Interval, OrderAck, OrderRequest};
pub use candela_types::SourceKey;

/// Order in which a source walks through history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    /// Newest page first; each request asks for candles before a cursor.
    Backward,
    /// Oldest page first; each request asks for candles since a cursor.
    Forward,
    /// One request covers the whole range.
    Single,
}

/// Static paging characteristics of a source for one interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// How the cursor moves.
    pub direction: PageDirection,
    /// Maximum rows per page, `None` when unbounded.
    pub page_size: Option<usize>,
    /// Minimum spacing the source requires between requests.
    pub min_delay: Duration,
}

/// Position of the page to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCursor {
    /// Candles strictly before this instant, newest first up to the page size.
    Before(DateTime<Utc>),
    /// Candles at or after this instant, oldest first up to the page size.
    Since(DateTime<Utc>),
    /// Every candle in `[start, end)`.
    Range {
        /// Inclusive lower bound.
        start: DateTime<Utc>,
        /// Exclusive upper bound.
        end: DateTime<Utc>,
    },
}

/// Focused role trait for connectors that serve paged OHLCV history.
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Fetch one page of candles for `symbol` at `interval`.
    ///
    /// Rows may come back in any order; callers normalize them. An empty page
    /// means there is no more history in the cursor's direction.
    async fn fetch_page(
        &self,
        symbol: &str,
        interval: Interval,
        cursor: PageCursor,
    ) -> Result<Vec<Candle>, CandelaError>;

    /// Paging characteristics for `interval`.
    fn pagination(&self, interval: Interval) -> Pagination;

    /// REQUIRED: exact intervals this connector can natively serve.
    fn supported_intervals(&self) -> &'static [Interval];
}

/// Focused role trait for connectors that can enumerate tradable symbols.
#[async_trait]
pub trait SymbolProvider: Send + Sync {
    /// List the symbols this source serves.
    async fn list_symbols(&self) -> Result<Vec<String>, CandelaError>;
}

/// Focused role trait for connectors that can fetch one candle by timestamp.
#[async_trait]
pub trait PointProvider: Send + Sync {
    /// Fetch the candle that starts exactly at `ts`, if the source has it.
    async fn candle_at(
        &self,
        symbol: &str,
        interval: Interval,
        ts: DateTime<Utc>,
    ) -> Result<Option<Candle>, CandelaError>;
}

/// Focused role trait for exchange account access.
#[async_trait]
pub trait OrderProvider: Send + Sync {
    /// Submit an order and return the exchange acknowledgement.
    async fn submit_order(&self, req: &OrderRequest) -> Result<OrderAck, CandelaError>;

    /// Available (unlocked) balance of `currency`, zero when not held.
    async fn balance(&self, currency: &str) -> Result<Decimal, CandelaError>;
}

/// Master connector trait advertising capabilities through accessors.
pub trait CandleConnector: Send + Sync {
    /// A stable identifier, e.g. `candela-upbit`.
    fn name(&self) -> &'static str;

    /// Canonical connector key constructed from the static name.
    fn key(&self) -> SourceKey {
        SourceKey::new(self.name())
    }

    /// Short source label used in store file names, e.g. `upbit`.
    fn label(&self) -> &'static str;

    /// Advertise history capability.
    fn as_history_provider(&self) -> Option<&dyn HistoryProvider> {
        None
    }

    /// Advertise symbol listing capability.
    fn as_symbol_provider(&self) -> Option<&dyn SymbolProvider> {
        None
    }

    /// Advertise single-candle lookup capability.
    fn as_point_provider(&self) -> Option<&dyn PointProvider> {
        None
    }

    /// Advertise order submission capability.
    fn as_order_provider(&self) -> Option<&dyn OrderProvider> {
        None
    }
}
