use std::collections::HashSet;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use candela_core::{CandelaError, DownloadReport, Interval, SeriesKey};

use crate::Candela;

/// Builder to backfill many series with bounded concurrency.
pub struct DownloadBuilder<'a> {
    pub(crate) candela: &'a Candela,
    pub(crate) keys: Vec<SeriesKey>,
    pub(crate) start: Option<DateTime<Utc>>,
    pub(crate) end: Option<DateTime<Utc>>,
    pub(crate) cancel: CancellationToken,
}

impl<'a> DownloadBuilder<'a> {
    /// Create a new builder bound to a `Candela` instance.
    ///
    /// Starts with no series and an open window: from the Unix epoch (the
    /// walk stops at the source's oldest candle) up to now.
    #[must_use]
    pub fn new(candela: &'a Candela) -> Self {
        Self {
            candela,
            keys: Vec::new(),
            start: None,
            end: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the series list.
    ///
    /// # Errors
    /// Returns `InvalidArg` if the same series appears twice.
    pub fn keys(mut self, keys: &[SeriesKey]) -> Result<Self, CandelaError> {
        let mut seen = HashSet::new();
        for key in keys {
            if !seen.insert(key) {
                return Err(CandelaError::InvalidArg(format!(
                    "duplicate series '{key}' in download list"
                )));
            }
        }
        self.keys = keys.to_vec();
        Ok(self)
    }

    /// Add a single series.
    ///
    /// # Errors
    /// Returns `InvalidArg` if the series is already listed.
    pub fn add_key(mut self, key: SeriesKey) -> Result<Self, CandelaError> {
        if self.keys.contains(&key) {
            return Err(CandelaError::InvalidArg(format!(
                "duplicate series '{key}' already in download list"
            )));
        }
        self.keys.push(key);
        Ok(self)
    }

    /// Add `tickers` of `source` at `interval`.
    ///
    /// # Errors
    /// `NotFound` for an unknown source, `InvalidArg` for blank or duplicate tickers.
    pub fn tickers(
        mut self,
        source: &str,
        tickers: &[&str],
        interval: Interval,
    ) -> Result<Self, CandelaError> {
        for t in tickers {
            let key = self.candela.key(source, t, interval)?;
            self = self.add_key(key)?;
        }
        Ok(self)
    }

    /// Add every symbol `source` lists, at `interval`. Symbols already in
    /// the list are skipped.
    ///
    /// # Errors
    /// Propagates the symbol listing failure.
    pub async fn all_symbols(mut self, source: &str, interval: Interval) -> Result<Self, CandelaError> {
        let symbols = self.candela.list_symbols(source).await?;
        for s in symbols {
            let key = self.candela.key(source, &s, interval)?;
            if !self.keys.contains(&key) {
                self.keys.push(key);
            }
        }
        Ok(self)
    }

    /// Set an explicit window `[start, end)`.
    #[must_use]
    pub const fn period(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Fetch from `start` up to now.
    #[must_use]
    pub const fn since(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = None;
        self
    }

    /// Stop every pending and running backfill when `token` fires.
    #[must_use]
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run one backfill per series, at most `concurrency` at a time.
    ///
    /// A failing series never aborts the others; its error lands in
    /// [`DownloadReport::failed`] under the series' display key.
    ///
    /// # Errors
    /// Returns `InvalidArg` only when no series were listed or the window is empty.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "candela::download::run", skip(self), fields(series = self.keys.len())),
    )]
    pub async fn run(self) -> Result<DownloadReport, CandelaError> {
        if self.keys.is_empty() {
            return Err(CandelaError::InvalidArg("no series specified for download".into()));
        }
        let start = self.start.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let end = self.end.unwrap_or_else(Utc::now);
        if start >= end {
            return Err(CandelaError::InvalidArg(format!(
                "empty download window {start}..{end}"
            )));
        }

        let candela = self.candela;
        let cancel = self.cancel;
        let results: Vec<_> = stream::iter(self.keys)
            .map(|key| {
                let cancel = cancel.clone();
                async move {
                    let res = candela
                        .backfill_with_cancel(&key, start, end, cancel)
                        .await;
                    (key, res)
                }
            })
            .buffer_unordered(candela.cfg.concurrency)
            .collect()
            .await;

        let mut report = DownloadReport::default();
        for (key, res) in results {
            match res {
                Ok(r) => report.completed.push(r),
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(key = %key, error = %e, "series download failed");
                    report.failed.insert(key.to_string(), e);
                }
            }
        }
        report.completed.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(report)
    }
}

impl Candela {
    /// Begin building a multi-series download.
    ///
    /// Typical usage: chain `tickers`/`period` then call `run()`.
    #[must_use]
    pub fn download(&self) -> DownloadBuilder<'_> {
        DownloadBuilder::new(self)
    }
}
