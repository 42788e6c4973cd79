//! candela-mock
//!
//! Deterministic in-memory connectors for tests and demos.
//!
//! - [`MockConnector`] serves static fixtures and fails or hangs for the
//!   reserved symbols `FAIL` and `TIMEOUT`.
//! - [`DynamicMockConnector`] is driven from a [`DynamicMockController`]:
//!   tests load series, script per-page failures and hangs, hide rows from
//!   paged history and inspect the request log.
use std::time::Duration;

use async_trait::async_trait;
use candela_core::connector::{
    CandleConnector, HistoryProvider, PageCursor, PageDirection, Pagination, PointProvider,
    SymbolProvider,
};
use candela_core::{CandelaError, Candle, Interval, TimeSeries};
use chrono::{DateTime, Utc};

mod dynamic;
pub mod fixtures;

pub use dynamic::{DynamicMockConnector, DynamicMockController, PageStep};

/// Rows of `series` that a paged source would return for `cursor`.
///
/// `Before` pages come back newest first, the way exchanges that page
/// backwards return them.
#[must_use]
pub fn serve_page(series: &TimeSeries, cursor: PageCursor, page_size: Option<usize>) -> Vec<Candle> {
    let limit = page_size.unwrap_or(usize::MAX);
    match cursor {
        PageCursor::Before(t) => series.range(..t).rev().take(limit).cloned().collect(),
        PageCursor::Since(t) => series.range(t..).take(limit).cloned().collect(),
        PageCursor::Range { start, end } => series.range(start..end).take(limit).cloned().collect(),
    }
}

/// Mock connector backed by static fixtures.
pub struct MockConnector {
    pagination: Pagination,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    /// Backward paging, three rows per page, no source delay.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pagination: Pagination {
                direction: PageDirection::Backward,
                page_size: Some(3),
                min_delay: Duration::ZERO,
            },
        }
    }

    /// Override the advertised pagination.
    #[must_use]
    pub const fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    async fn maybe_fail_or_timeout(symbol: &str, capability: &str) -> Result<(), CandelaError> {
        match symbol {
            "FAIL" => Err(CandelaError::connector(
                "candela-mock",
                format!("forced failure: {capability}"),
            )),
            "TIMEOUT" => {
                std::future::pending::<()>().await;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn series(symbol: &str) -> Result<TimeSeries, CandelaError> {
        fixtures::by_symbol(symbol).ok_or_else(|| CandelaError::not_found(format!("symbol {symbol}")))
    }
}

impl CandleConnector for MockConnector {
    fn name(&self) -> &'static str {
        "candela-mock"
    }

    fn label(&self) -> &'static str {
        "mock"
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
impl HistoryProvider for MockConnector {
    async fn fetch_page(
        &self,
        symbol: &str,
        _interval: Interval,
        cursor: PageCursor,
    ) -> Result<Vec<Candle>, CandelaError> {
        Self::maybe_fail_or_timeout(symbol, "history").await?;
        let series = Self::series(symbol)?;
        Ok(serve_page(&series, cursor, self.pagination.page_size))
    }

    fn pagination(&self, _interval: Interval) -> Pagination {
        self.pagination
    }

    fn supported_intervals(&self) -> &'static [Interval] {
        &Interval::ALL
    }
}

#[async_trait]
impl SymbolProvider for MockConnector {
    async fn list_symbols(&self) -> Result<Vec<String>, CandelaError> {
        Ok(["KRW-BTC", "BTCUSDT", "AAPL"].map(String::from).to_vec())
    }
}

#[async_trait]
impl PointProvider for MockConnector {
    async fn candle_at(
        &self,
        symbol: &str,
        _interval: Interval,
        ts: DateTime<Utc>,
    ) -> Result<Option<Candle>, CandelaError> {
        Self::maybe_fail_or_timeout(symbol, "point").await?;
        Ok(Self::series(symbol)?.get(&ts).cloned())
    }
}
