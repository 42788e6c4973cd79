//! Request-spacing connector wrapper.
//!
//! Every call through a [`ThrottledConnector`] reserves the next free slot
//! on a shared timeline, so pipelines that share one wrapped connector never
//! hit the exchange faster than the configured spacing combined.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::time::Instant;

use candela_core::connector::{
    CandleConnector, HistoryProvider, OrderProvider, PageCursor, PageDirection, Pagination,
    PointProvider, SymbolProvider,
};
use candela_core::{CandelaError, Candle, Interval, Middleware, OrderAck, OrderRequest};

/// Wrapper that spaces out requests to the inner connector.
pub struct ThrottledConnector {
    inner: Arc<dyn CandleConnector>,
    spacing: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl ThrottledConnector {
    /// Wrap `inner` so consecutive requests start at least `spacing` apart.
    pub fn new(inner: Arc<dyn CandleConnector>, spacing: Duration) -> Self {
        Self {
            inner,
            spacing,
            next_slot: Mutex::new(None),
        }
    }

    /// Access the inner connector.
    pub fn inner(&self) -> &Arc<dyn CandleConnector> {
        &self.inner
    }

    /// Configured spacing between requests.
    #[must_use]
    pub const fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Wait for this caller's slot on the shared timeline.
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let slot = next.map_or(now, |n| n.max(now));
            *next = Some(slot + self.spacing);
            slot
        };
        if slot > Instant::now() {
            #[cfg(feature = "tracing")]
            tracing::trace!(
                connector = self.inner.name(),
                wait_ms = (slot - Instant::now()).as_millis(),
                "throttling request"
            );
            tokio::time::sleep_until(slot).await;
        }
    }

    fn history(&self) -> Result<&dyn HistoryProvider, CandelaError> {
        self.inner
            .as_history_provider()
            .ok_or_else(|| CandelaError::unsupported("history"))
    }
}

impl CandleConnector for ThrottledConnector {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn label(&self) -> &'static str {
        self.inner.label()
    }

    fn as_history_provider(&self) -> Option<&dyn HistoryProvider> {
        self.inner
            .as_history_provider()
            .map(|_| self as &dyn HistoryProvider)
    }

    fn as_symbol_provider(&self) -> Option<&dyn SymbolProvider> {
        self.inner
            .as_symbol_provider()
            .map(|_| self as &dyn SymbolProvider)
    }

    fn as_point_provider(&self) -> Option<&dyn PointProvider> {
        self.inner
            .as_point_provider()
            .map(|_| self as &dyn PointProvider)
    }

    fn as_order_provider(&self) -> Option<&dyn OrderProvider> {
        self.inner
            .as_order_provider()
            .map(|_| self as &dyn OrderProvider)
    }
}

#[async_trait]
impl HistoryProvider for ThrottledConnector {
    async fn fetch_page(
        &self,
        symbol: &str,
        interval: Interval,
        cursor: PageCursor,
    ) -> Result<Vec<Candle>, CandelaError> {
        let inner = self.history()?;
        self.acquire().await;
        inner.fetch_page(symbol, interval, cursor).await
    }

    fn pagination(&self, interval: Interval) -> Pagination {
        self.history().map_or(
            Pagination {
                direction: PageDirection::Single,
                page_size: None,
                min_delay: Duration::ZERO,
            },
            |h| h.pagination(interval),
        )
    }

    fn supported_intervals(&self) -> &'static [Interval] {
        match self.history() {
            Ok(h) => h.supported_intervals(),
            Err(_) => &[],
        }
    }
}

#[async_trait]
impl SymbolProvider for ThrottledConnector {
    async fn list_symbols(&self) -> Result<Vec<String>, CandelaError> {
        let inner = self
            .inner
            .as_symbol_provider()
            .ok_or_else(|| CandelaError::unsupported("symbols"))?;
        self.acquire().await;
        inner.list_symbols().await
    }
}

#[async_trait]
impl PointProvider for ThrottledConnector {
    async fn candle_at(
        &self,
        symbol: &str,
        interval: Interval,
        ts: DateTime<Utc>,
    ) -> Result<Option<Candle>, CandelaError> {
        let inner = self
            .inner
            .as_point_provider()
            .ok_or_else(|| CandelaError::unsupported("point"))?;
        self.acquire().await;
        inner.candle_at(symbol, interval, ts).await
    }
}

#[async_trait]
impl OrderProvider for ThrottledConnector {
    async fn submit_order(&self, req: &OrderRequest) -> Result<OrderAck, CandelaError> {
        let inner = self
            .inner
            .as_order_provider()
            .ok_or_else(|| CandelaError::unsupported("orders"))?;
        self.acquire().await;
        inner.submit_order(req).await
    }

    async fn balance(&self, currency: &str) -> Result<Decimal, CandelaError> {
        let inner = self
            .inner
            .as_order_provider()
            .ok_or_else(|| CandelaError::unsupported("orders"))?;
        self.acquire().await;
        inner.balance(currency).await
    }
}

/// Middleware config for constructing a [`ThrottledConnector`].
pub struct ThrottleMiddleware {
    /// Minimum spacing between requests.
    pub spacing: Duration,
}

impl ThrottleMiddleware {
    /// Space requests at least `spacing` apart.
    #[must_use]
    pub const fn new(spacing: Duration) -> Self {
        Self { spacing }
    }
}

impl Middleware for ThrottleMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn CandleConnector>) -> Arc<dyn CandleConnector> {
        Arc::new(ThrottledConnector::new(inner, self.spacing))
    }

    fn name(&self) -> &'static str {
        "ThrottledConnector"
    }

    fn config_json(&self) -> serde_json::Value {
        serde_json::json!({
            "spacing_ms": self.spacing.as_millis(),
        })
    }
}
