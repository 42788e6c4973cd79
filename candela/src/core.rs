use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use candela_core::{
    CandelaConfig, CandelaError, CandleConnector, FetchConfig, FillPolicy, Middleware,
    SeriesKey, StoreFormat, TimeSeries,
};

use crate::fetcher::{FetchRequest, fetch_history};
use crate::store::{FileStore, KeyedLocks};

/// Default store directory, relative to the working directory.
pub const DEFAULT_STORE_DIR: &str = "data";

/// Orchestrator that owns the registered sources, the store and the per-series locks.
pub struct Candela {
    pub(crate) connectors: Vec<Arc<dyn CandleConnector>>,
    pub(crate) cfg: CandelaConfig,
    pub(crate) store: FileStore,
    pub(crate) locks: KeyedLocks,
    layers: Vec<(&'static str, serde_json::Value)>,
}

/// Builder for constructing a `Candela` orchestrator with custom configuration.
pub struct CandelaBuilder {
    connectors: Vec<Arc<dyn CandleConnector>>,
    middleware: Vec<Box<dyn Fn() -> Box<dyn Middleware> + Send + Sync>>,
    cfg: CandelaConfig,
    store_dir: PathBuf,
}

impl Default for CandelaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CandelaBuilder {
    /// Create a builder with default configuration and no sources.
    ///
    /// Defaults: carry-forward gap filling on, binary store under `./data`,
    /// 100 ms page delay, three retries per page, a checkpoint every 50 pages.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connectors: vec![],
            middleware: vec![],
            cfg: CandelaConfig::default(),
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
        }
    }

    /// Register a source. Sources are addressed by their label (`upbit`,
    /// `binance`, `yf`) or their connector name.
    #[must_use]
    pub fn with_connector(mut self, c: Arc<dyn CandleConnector>) -> Self {
        self.connectors.push(c);
        self
    }

    /// Wrap every registered source with a middleware built by `make`.
    ///
    /// Layers apply in registration order, so the last one added is outermost.
    #[must_use]
    pub fn with_middleware<F>(mut self, make: F) -> Self
    where
        F: Fn() -> Box<dyn Middleware> + Send + Sync + 'static,
    {
        self.middleware.push(Box::new(make));
        self
    }

    /// Directory holding the persisted series.
    #[must_use]
    pub fn store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store_dir = dir.into();
        self
    }

    /// Encoding for persisted series.
    #[must_use]
    pub const fn store_format(mut self, format: StoreFormat) -> Self {
        self.cfg.store_format = format;
        self
    }

    /// Replace the pagination, retry and deadline settings.
    #[must_use]
    pub fn fetch_config(mut self, cfg: FetchConfig) -> Self {
        self.cfg.fetch = cfg;
        self
    }

    /// Minimum spacing between page requests of one backfill.
    #[must_use]
    pub const fn page_delay(mut self, delay: Duration) -> Self {
        self.cfg.fetch.page_delay = delay;
        self
    }

    /// Overall deadline for a single backfill.
    #[must_use]
    pub const fn deadline(mut self, deadline: Duration) -> Self {
        self.cfg.fetch.deadline = Some(deadline);
        self
    }

    /// Merge and persist after every `pages` pages instead of once at the end.
    #[must_use]
    pub const fn checkpoint_every(mut self, pages: usize) -> Self {
        self.cfg.fetch.checkpoint_pages = Some(pages);
        self
    }

    /// Toggle gap filling before merge.
    #[must_use]
    pub const fn fill_gaps(mut self, yes: bool) -> Self {
        self.cfg.fill_gaps = yes;
        self
    }

    /// Gap-filling policy used when filling is enabled.
    #[must_use]
    pub const fn fill_policy(mut self, policy: FillPolicy) -> Self {
        self.cfg.fill_policy = policy;
        self
    }

    /// Maximum number of series downloaded concurrently.
    #[must_use]
    pub const fn concurrency(mut self, n: usize) -> Self {
        self.cfg.concurrency = n;
        self
    }

    /// Build the `Candela` orchestrator.
    ///
    /// # Errors
    /// Returns `InvalidArg` if no sources were registered, two sources share a
    /// label, or the concurrency or checkpoint interval is zero.
    pub fn build(self) -> Result<Candela, CandelaError> {
        if self.connectors.is_empty() {
            return Err(CandelaError::InvalidArg(
                "no connectors registered; add at least one via with_connector(...)".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for c in &self.connectors {
            if !seen.insert(c.label()) {
                return Err(CandelaError::InvalidArg(format!(
                    "duplicate source label '{}'",
                    c.label()
                )));
            }
        }
        if self.cfg.concurrency == 0 {
            return Err(CandelaError::InvalidArg("concurrency must be at least 1".into()));
        }
        if self.cfg.fetch.checkpoint_pages == Some(0) {
            return Err(CandelaError::InvalidArg(
                "checkpoint interval must be at least one page".into(),
            ));
        }

        let layers: Vec<_> = self
            .middleware
            .iter()
            .map(|make| {
                let mw = make();
                (mw.name(), mw.config_json())
            })
            .collect();
        #[cfg(feature = "tracing")]
        {
            for (name, config) in &layers {
                tracing::info!(middleware = %name, config = %config, "middleware layer");
            }
        }

        let connectors = self
            .connectors
            .into_iter()
            .map(|c| {
                self.middleware
                    .iter()
                    .fold(c, |inner, make| make().apply(inner))
            })
            .collect();

        Ok(Candela {
            connectors,
            store: FileStore::new(self.store_dir, self.cfg.store_format),
            cfg: self.cfg,
            locks: KeyedLocks::new(),
            layers,
        })
    }
}

impl Candela {
    /// Start building a new `Candela` instance.
    ///
    /// ```rust,ignore
    /// use std::sync::Arc;
    /// use candela::{Candela, FillPolicy};
    ///
    /// let upbit = Arc::new(candela_upbit::UpbitConnector::new()?);
    /// let candela = Candela::builder()
    ///     .with_connector(upbit)
    ///     .store_dir("./data/upbit")
    ///     .fill_policy(FillPolicy::Refetch)
    ///     .build()?;
    /// ```
    #[must_use]
    pub fn builder() -> CandelaBuilder {
        CandelaBuilder::new()
    }

    /// Effective configuration.
    #[must_use]
    pub const fn config(&self) -> &CandelaConfig {
        &self.cfg
    }

    /// Name and configuration of each middleware layer, innermost first.
    #[must_use]
    pub fn middleware(&self) -> &[(&'static str, serde_json::Value)] {
        &self.layers
    }

    /// Store the orchestrator persists into.
    #[must_use]
    pub const fn store(&self) -> &FileStore {
        &self.store
    }

    /// Registered source by label or connector name.
    ///
    /// # Errors
    /// Returns `NotFound` when no registered source matches.
    pub fn connector(&self, source: &str) -> Result<Arc<dyn CandleConnector>, CandelaError> {
        self.connectors
            .iter()
            .find(|c| c.label() == source || c.name() == source)
            .cloned()
            .ok_or_else(|| CandelaError::not_found(format!("source {source}")))
    }

    /// Labels of the registered sources, in registration order.
    #[must_use]
    pub fn sources(&self) -> Vec<&'static str> {
        self.connectors.iter().map(|c| c.label()).collect()
    }

    /// Build a series key for one of the registered sources.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown source and `InvalidArg` for a blank ticker.
    pub fn key(
        &self,
        source: &str,
        ticker: &str,
        interval: candela_core::Interval,
    ) -> Result<SeriesKey, CandelaError> {
        let c = self.connector(source)?;
        SeriesKey::new(ticker, interval, c.label())
    }

    /// Load the persisted series for `key`; empty when nothing was stored yet.
    ///
    /// # Errors
    /// `StoreCorrupt` or `Io` from the store.
    pub async fn load(&self, key: &SeriesKey) -> Result<TimeSeries, CandelaError> {
        let store = self.store.clone();
        let key = key.clone();
        tokio::task::spawn_blocking(move || store.load(&key))
            .await
            .map_err(|e| CandelaError::Io(format!("store task: {e}")))?
    }

    /// Fetch `[start, end)` for `key` without touching the store.
    ///
    /// # Errors
    /// See [`crate::Paginator::next_page`].
    pub async fn fetch(
        &self,
        key: &SeriesKey,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<TimeSeries, CandelaError> {
        let c = self.connector(&key.source)?;
        let history = c
            .as_history_provider()
            .ok_or_else(|| CandelaError::unsupported("history"))?;
        let req = FetchRequest::new(&key.ticker, key.interval, start, end)?;
        fetch_history(history, c.name(), req, &self.cfg.fetch, CancellationToken::new()).await
    }

    /// Symbols served by `source`.
    ///
    /// # Errors
    /// `NotFound` for an unknown source, `Unsupported` when it cannot list
    /// symbols, or the provider error.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "candela::core::list_symbols", skip(self), fields(source = %source)),
    )]
    pub async fn list_symbols(&self, source: &str) -> Result<Vec<String>, CandelaError> {
        let c = self.connector(source)?;
        let provider = c
            .as_symbol_provider()
            .ok_or_else(|| CandelaError::unsupported("symbols"))?;
        Self::provider_call_with_timeout(
            c.name(),
            "symbols",
            self.cfg.fetch.page_timeout,
            provider.list_symbols(),
        )
        .await
    }

    /// Wrap a provider future with a timeout and standardized timeout error mapping.
    pub(crate) async fn provider_call_with_timeout<T, Fut>(
        connector_name: &'static str,
        capability: &'static str,
        timeout: Duration,
        fut: Fut,
    ) -> Result<T, CandelaError>
    where
        Fut: std::future::Future<Output = Result<T, CandelaError>>,
    {
        (tokio::time::timeout(timeout, fut).await)
            .unwrap_or_else(|_| Err(CandelaError::provider_timeout(connector_name, capability)))
    }
}
