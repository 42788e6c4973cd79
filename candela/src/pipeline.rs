//! Backfill pipeline: fetch → fill → merge → persist for one series.
//!
//! The store lock for the series is held for the whole run. Pages are
//! accumulated into a window; every `checkpoint_pages` pages the window is
//! gap-filled, merged newer-wins into the stored series and persisted
//! atomically. If the walk fails, is cancelled or hits its deadline, windows
//! already checkpointed stay on disk and the in-flight window is discarded.
//! Point lookups made while refetching gaps share the walk's pacing, request
//! timeout, cancellation token and deadline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use candela_core::{
    BackfillReport, CandelaError, Candle, CandleConnector, FillPolicy, Interval, MergeStats,
    PageDirection, PointProvider, SeriesKey, TimeSeries, fill_carry_forward, fill_with_refetch,
    merge_newer_wins,
};

use crate::Candela;
use crate::fetcher::{FetchRequest, Paginator};

/// Mutable state of one backfill run.
struct Run<'a> {
    connector: &'a dyn CandleConnector,
    key: &'a SeriesKey,
    direction: PageDirection,
    stored: TimeSeries,
    /// Edge row of the previously checkpointed window, used as fill anchor.
    seam: Option<Candle>,
    report: BackfillReport,
}

/// Point lookups spaced like pages and raced against the walk's guards.
struct PacedPoints<'p, 'a> {
    inner: &'p dyn PointProvider,
    pager: &'p Paginator<'a>,
    next_at: Mutex<Instant>,
}

impl<'p, 'a> PacedPoints<'p, 'a> {
    /// The first lookup waits one delay, since a page request has just gone out.
    fn new(inner: &'p dyn PointProvider, pager: &'p Paginator<'a>) -> Self {
        Self {
            inner,
            pager,
            next_at: Mutex::new(Instant::now() + pager.delay()),
        }
    }
}

#[async_trait]
impl<'p, 'a> PointProvider for PacedPoints<'p, 'a> {
    async fn candle_at(
        &self,
        symbol: &str,
        interval: Interval,
        ts: DateTime<Utc>,
    ) -> Result<Option<Candle>, CandelaError> {
        let mut next_at = self.next_at.lock().await;
        self.pager.guarded(tokio::time::sleep_until(*next_at)).await?;
        let call = tokio::time::timeout(
            self.pager.request_timeout(),
            self.inner.candle_at(symbol, interval, ts),
        );
        let out = self.pager.guarded(call).await?;
        *next_at = Instant::now() + self.pager.delay();
        out.unwrap_or_else(|_| Err(CandelaError::provider_timeout(self.pager.source(), "point")))
    }
}

impl Candela {
    /// Backfill `[start, end)` of `key` into the store.
    ///
    /// # Errors
    /// See [`Candela::backfill_with_cancel`].
    pub async fn backfill(
        &self,
        key: &SeriesKey,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BackfillReport, CandelaError> {
        self.backfill_with_cancel(key, start, end, CancellationToken::new())
            .await
    }

    /// Backfill `[start, end)` of `key` into the store, stopping when `cancel` fires.
    ///
    /// # Errors
    /// - `NotFound` / `Unsupported` when the source is unknown or lacks history.
    /// - `StoreCorrupt` when the existing file cannot be decoded; it is left as is.
    /// - `Fetch`, `Cancelled` or `RequestTimeout` from the page walk.
    /// - `Io` when a checkpoint cannot be persisted.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela::pipeline::backfill",
            skip(self, key, cancel),
            fields(key = %key, start = %start, end = %end),
        )
    )]
    pub async fn backfill_with_cancel(
        &self,
        key: &SeriesKey,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: CancellationToken,
    ) -> Result<BackfillReport, CandelaError> {
        let connector = self.connector(&key.source)?;
        let history = connector
            .as_history_provider()
            .ok_or_else(|| CandelaError::unsupported("history"))?;
        let req = FetchRequest::new(&key.ticker, key.interval, start, end)?;
        let mut pager = Paginator::new(history, connector.name(), req, &self.cfg.fetch, cancel)?;

        let _guard = self.locks.lock(key).await;
        let stored = self.load(key).await?;
        let mut run = Run {
            connector: connector.as_ref(),
            key,
            direction: pager.direction(),
            report: BackfillReport {
                key: key.clone(),
                pages: 0,
                rows_fetched: 0,
                checkpoints: 0,
                merge: MergeStats::default(),
                fill: Default::default(),
                store_rows: stored.len(),
            },
            stored,
            seam: None,
        };

        let mut window = TimeSeries::new();
        let mut window_pages = 0usize;
        let walked = loop {
            match pager.next_page().await {
                Ok(Some(page)) => {
                    run.report.rows_fetched += page.rows.len();
                    window.extend(page.rows);
                    window_pages += 1;
                    if self
                        .cfg
                        .fetch
                        .checkpoint_pages
                        .is_some_and(|n| window_pages >= n)
                    {
                        self.checkpoint(&mut run, &pager, std::mem::take(&mut window))
                            .await?;
                        window_pages = 0;
                    }
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        run.report.pages = pager.pages();

        if let Err(e) = walked {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                error = %e,
                checkpoints = run.report.checkpoints,
                discarded_rows = window.len(),
                "backfill stopped; discarding unmerged window"
            );
            return Err(e);
        }
        if !window.is_empty() {
            self.checkpoint(&mut run, &pager, window).await?;
        }
        run.report.store_rows = run.stored.len();
        Ok(run.report)
    }

    /// Fill, merge and persist one window.
    ///
    /// A fill interrupted by cancellation or the deadline returns before the
    /// merge, so the window never reaches the store.
    async fn checkpoint(
        &self,
        run: &mut Run<'_>,
        pager: &Paginator<'_>,
        window: TimeSeries,
    ) -> Result<(), CandelaError> {
        if window.is_empty() {
            return Ok(());
        }
        // The anchor for the next window sits on the edge facing it
        let edge = match run.direction {
            PageDirection::Backward => window.first(),
            PageDirection::Forward | PageDirection::Single => window.last(),
        }
        .cloned();

        let window = if self.cfg.fill_gaps {
            self.fill_window(run, pager, window).await?
        } else {
            window
        };
        run.seam = edge;

        let (merged, stats) = merge_newer_wins(std::mem::take(&mut run.stored), window);
        run.stored = self.persist(run.key, merged).await?;
        run.report.merge.absorb(stats);
        run.report.checkpoints += 1;
        run.report.store_rows = run.stored.len();
        #[cfg(feature = "tracing")]
        tracing::info!(
            key = %run.key,
            inserted = stats.inserted,
            replaced = stats.replaced,
            rows = run.report.store_rows,
            "checkpoint persisted"
        );
        Ok(())
    }

    /// Repair gaps in `window`, bridging to the previous window through its seam row.
    async fn fill_window(
        &self,
        run: &mut Run<'_>,
        pager: &Paginator<'_>,
        mut window: TimeSeries,
    ) -> Result<TimeSeries, CandelaError> {
        let anchor = run
            .seam
            .clone()
            .filter(|c| !window.contains(&c.ts))
            .map(|c| {
                let ts = c.ts;
                window.insert(c);
                ts
            });
        let cadence = run.key.interval.cadence();
        let filled = match self.cfg.fill_policy {
            FillPolicy::Refetch => match run.connector.as_point_provider() {
                Some(points) => {
                    let points = PacedPoints::new(points, pager);
                    fill_with_refetch(&window, cadence, &points, &run.key.ticker, run.key.interval)
                        .await?
                }
                None => {
                    let mut filled = fill_carry_forward(&window, cadence)?;
                    filled
                        .report
                        .warnings
                        .push(CandelaError::unsupported("point"));
                    filled
                }
            },
            _ => fill_carry_forward(&window, cadence)?,
        };
        let mut series = filled.series;
        if let Some(ts) = anchor {
            series.remove(&ts);
        }
        #[cfg(feature = "tracing")]
        {
            if !filled.report.is_complete() {
                tracing::warn!(
                    key = %run.key,
                    unfilled = filled.report.missing_unfilled.len(),
                    "gaps left unfilled"
                );
            }
        }
        run.report.fill.absorb(filled.report);
        Ok(series)
    }

    /// Persist `series` for `key` off the async runtime and hand it back.
    async fn persist(&self, key: &SeriesKey, series: TimeSeries) -> Result<TimeSeries, CandelaError> {
        let store = self.store.clone();
        let key = key.clone();
        tokio::task::spawn_blocking(move || store.persist(&key, &series).map(|()| series))
            .await
            .map_err(|e| CandelaError::Io(format!("store task: {e}")))?
    }
}
