use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use candela_core::connector::{
    CandleConnector, HistoryProvider, OrderProvider, PageCursor, Pagination, PointProvider,
    SymbolProvider,
};
use candela_core::{CandelaError, Candle, Interval, OrderAck, OrderRequest, TimeSeries};

use crate::serve_page;

/// Instruction for how the next `fetch_page` call behaves.
#[derive(Debug, Clone)]
pub enum PageStep {
    /// Serve the page from the loaded series.
    Serve,
    /// Return these rows verbatim.
    Return(Vec<Candle>),
    /// Fail immediately with the provided error.
    Fail(CandelaError),
    /// Hang indefinitely (simulate a stalled request).
    Hang,
}

#[derive(Default)]
struct InternalState {
    series: HashMap<String, TimeSeries>,
    hidden: HashMap<String, BTreeSet<DateTime<Utc>>>,
    script: VecDeque<PageStep>,
    page_requests: Vec<(String, PageCursor)>,
    point_requests: Vec<(String, DateTime<Utc>)>,
    hang_points: bool,
    balances: HashMap<String, Decimal>,
    orders: Vec<OrderRequest>,
}

/// Controller handle used by tests to drive the dynamic mock from the outside.
pub struct DynamicMockController {
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockController {
    /// Load the full history of `symbol`.
    pub async fn set_series(&self, symbol: &str, series: TimeSeries) {
        let mut guard = self.state.lock().await;
        guard.series.insert(symbol.to_string(), series);
    }

    /// Omit these timestamps from paged history while still serving them as points.
    pub async fn hide_from_pages(&self, symbol: &str, ts: impl IntoIterator<Item = DateTime<Utc>>) {
        let mut guard = self.state.lock().await;
        guard.hidden.entry(symbol.to_string()).or_default().extend(ts);
    }

    /// Queue behaviors for the next page requests, in order. Once the queue
    /// is drained every request is served normally.
    pub async fn push_steps(&self, steps: impl IntoIterator<Item = PageStep>) {
        let mut guard = self.state.lock().await;
        guard.script.extend(steps);
    }

    /// Make every later point request stall forever.
    pub async fn hang_points(&self) {
        self.state.lock().await.hang_points = true;
    }

    /// Set the available balance of `currency`.
    pub async fn set_balance(&self, currency: &str, amount: Decimal) {
        let mut guard = self.state.lock().await;
        guard.balances.insert(currency.to_string(), amount);
    }

    /// Cursors of every page request, in call order.
    pub async fn page_requests(&self) -> Vec<(String, PageCursor)> {
        self.state.lock().await.page_requests.clone()
    }

    /// Timestamps of every point request, in call order.
    pub async fn point_requests(&self) -> Vec<(String, DateTime<Utc>)> {
        self.state.lock().await.point_requests.clone()
    }

    /// Orders submitted so far.
    pub async fn orders(&self) -> Vec<OrderRequest> {
        self.state.lock().await.orders.clone()
    }
}

/// A connector whose data and failures are controlled from a test.
pub struct DynamicMockConnector {
    name: &'static str,
    pagination: Pagination,
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockConnector {
    /// Create a new dynamic mock connector and its controller.
    #[must_use]
    pub fn new_with_controller(
        name: &'static str,
        pagination: Pagination,
    ) -> (Arc<Self>, DynamicMockController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let controller = DynamicMockController {
            state: Arc::clone(&state),
        };
        (
            Arc::new(Self {
                name,
                pagination,
                state,
            }),
            controller,
        )
    }
}

impl CandleConnector for DynamicMockConnector {
    fn name(&self) -> &'static str {
        self.name
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

    fn as_order_provider(&self) -> Option<&dyn OrderProvider> {
        Some(self as &dyn OrderProvider)
    }
}

#[async_trait]
impl HistoryProvider for DynamicMockConnector {
    async fn fetch_page(
        &self,
        symbol: &str,
        _interval: Interval,
        cursor: PageCursor,
    ) -> Result<Vec<Candle>, CandelaError> {
        // Resolve the page without holding the lock across the hang
        let outcome = {
            let mut guard = self.state.lock().await;
            guard.page_requests.push((symbol.to_string(), cursor));
            match guard.script.pop_front().unwrap_or(PageStep::Serve) {
                PageStep::Serve => {
                    let Some(series) = guard.series.get(symbol) else {
                        return Err(CandelaError::not_found(format!("symbol {symbol}")));
                    };
                    let visible: TimeSeries = match guard.hidden.get(symbol) {
                        Some(hidden) => series
                            .iter()
                            .filter(|c| !hidden.contains(&c.ts))
                            .cloned()
                            .collect(),
                        None => series.clone(),
                    };
                    PageStep::Return(serve_page(&visible, cursor, self.pagination.page_size))
                }
                other => other,
            }
        };

        match outcome {
            PageStep::Return(rows) => Ok(rows),
            PageStep::Fail(e) => Err(e),
            PageStep::Hang | PageStep::Serve => {
                std::future::pending::<()>().await;
                Err(CandelaError::request_timeout("history"))
            }
        }
    }

    fn pagination(&self, _interval: Interval) -> Pagination {
        self.pagination
    }

    fn supported_intervals(&self) -> &'static [Interval] {
        &Interval::ALL
    }
}

#[async_trait]
impl SymbolProvider for DynamicMockConnector {
    async fn list_symbols(&self) -> Result<Vec<String>, CandelaError> {
        let guard = self.state.lock().await;
        let mut symbols: Vec<String> = guard.series.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

#[async_trait]
impl PointProvider for DynamicMockConnector {
    async fn candle_at(
        &self,
        symbol: &str,
        _interval: Interval,
        ts: DateTime<Utc>,
    ) -> Result<Option<Candle>, CandelaError> {
        {
            let mut guard = self.state.lock().await;
            guard.point_requests.push((symbol.to_string(), ts));
            if !guard.hang_points {
                return Ok(guard.series.get(symbol).and_then(|s| s.get(&ts)).cloned());
            }
        }
        std::future::pending::<()>().await;
        Err(CandelaError::request_timeout("point"))
    }
}

#[async_trait]
impl OrderProvider for DynamicMockConnector {
    async fn submit_order(&self, req: &OrderRequest) -> Result<OrderAck, CandelaError> {
        req.validate()?;
        let mut guard = self.state.lock().await;
        guard.orders.push(req.clone());
        Ok(OrderAck {
            id: format!("mock-{}", guard.orders.len()),
            ticker: req.ticker.clone(),
            side: req.side,
            state: "wait".to_string(),
        })
    }

    async fn balance(&self, currency: &str) -> Result<Decimal, CandelaError> {
        let guard = self.state.lock().await;
        Ok(guard.balances.get(currency).copied().unwrap_or(Decimal::ZERO))
    }
}
