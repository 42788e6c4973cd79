//! Paginated history fetch.
//!
//! A [`Paginator`] walks a source page by page in whichever direction the
//! source pages (backwards from `end`, forwards from `start`, or one bulk
//! request), keeping only rows inside the half-open window `[start, end)`.
//! Every page request is paced, bounded by a timeout, retried with jittered
//! exponential backoff, and raced against a cancellation token and an
//! optional overall deadline.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use candela_core::connector::{HistoryProvider, PageCursor, PageDirection, Pagination};
use candela_core::{CandelaError, Candle, FetchConfig, Interval, TimeSeries, validate_candle};

use crate::backoff::retry_delay;

/// What to fetch: one symbol at one interval over `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Exchange-native symbol.
    pub symbol: String,
    /// Candle interval.
    pub interval: Interval,
    /// Inclusive lower bound.
    pub start: DateTime<Utc>,
    /// Exclusive upper bound.
    pub end: DateTime<Utc>,
}

impl FetchRequest {
    /// Validate and build a request.
    ///
    /// # Errors
    /// Returns `InvalidArg` when the symbol is blank or `start >= end`.
    pub fn new(
        symbol: impl Into<String>,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, CandelaError> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(CandelaError::InvalidArg("empty symbol".into()));
        }
        if start >= end {
            return Err(CandelaError::InvalidArg(format!(
                "empty fetch window {start}..{end}"
            )));
        }
        Ok(Self {
            symbol,
            interval,
            start,
            end,
        })
    }
}

/// One page of history, already filtered to the request window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Rows inside the window, ascending.
    pub rows: TimeSeries,
    /// Number of rows the source returned before filtering.
    pub raw_len: usize,
}

/// Page-at-a-time history walker over one [`HistoryProvider`].
pub struct Paginator<'a> {
    provider: &'a dyn HistoryProvider,
    source: String,
    req: FetchRequest,
    pagination: Pagination,
    cfg: FetchConfig,
    cancel: CancellationToken,
    deadline: Option<Instant>,
    cursor: Option<PageCursor>,
    pages: usize,
    resume_from: Option<DateTime<Utc>>,
}

impl<'a> Paginator<'a> {
    /// Prepare a walk over `req`. No request is sent until [`next_page`](Self::next_page).
    ///
    /// The overall deadline, when configured, starts counting now.
    ///
    /// # Errors
    /// Returns `Unsupported` when the provider does not serve `req.interval`.
    pub fn new(
        provider: &'a dyn HistoryProvider,
        source: impl Into<String>,
        req: FetchRequest,
        cfg: &FetchConfig,
        cancel: CancellationToken,
    ) -> Result<Self, CandelaError> {
        if !provider.supported_intervals().contains(&req.interval) {
            return Err(CandelaError::unsupported(format!("history/{}", req.interval)));
        }
        let pagination = provider.pagination(req.interval);
        let cursor = match pagination.direction {
            PageDirection::Backward => PageCursor::Before(req.end),
            PageDirection::Forward => PageCursor::Since(req.start),
            PageDirection::Single => PageCursor::Range {
                start: req.start,
                end: req.end,
            },
        };
        Ok(Self {
            provider,
            source: source.into(),
            deadline: cfg.deadline.map(|d| Instant::now() + d),
            cfg: cfg.clone(),
            pagination,
            req,
            cancel,
            cursor: Some(cursor),
            pages: 0,
            resume_from: None,
        })
    }

    /// Direction the walk moves in.
    #[must_use]
    pub const fn direction(&self) -> PageDirection {
        self.pagination.direction
    }

    /// Pages fetched so far.
    #[must_use]
    pub const fn pages(&self) -> usize {
        self.pages
    }

    /// Boundary of the last successful page.
    ///
    /// Walking backwards everything in `[resume_from, end)` has been fetched;
    /// walking forwards everything in `[start, resume_from)` has.
    #[must_use]
    pub const fn resume_from(&self) -> Option<DateTime<Utc>> {
        self.resume_from
    }

    /// True once the walk has terminated.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.cursor.is_none()
    }

    /// Spacing between consecutive requests: the configured delay or the
    /// source minimum, whichever is larger.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.cfg.page_delay.max(self.pagination.min_delay)
    }

    /// Source name used in error reports.
    pub(crate) fn source(&self) -> &str {
        &self.source
    }

    /// Timeout applied to each individual request.
    pub(crate) const fn request_timeout(&self) -> Duration {
        self.cfg.page_timeout
    }

    /// Fetch the next page, or `None` once the walk is complete.
    ///
    /// # Errors
    /// - `Fetch` (carrying [`resume_from`](Self::resume_from)) when a page
    ///   keeps failing with retryable errors.
    /// - Non-retryable provider errors such as `NotFound` as-is.
    /// - `Cancelled` or `RequestTimeout` when the token fires or the deadline
    ///   passes.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela::fetcher::next_page",
            skip(self),
            fields(source = %self.source, symbol = %self.req.symbol, page = self.pages + 1),
        )
    )]
    pub async fn next_page(&mut self) -> Result<Option<Page>, CandelaError> {
        let Some(cursor) = self.cursor else {
            return Ok(None);
        };
        if self.cfg.max_pages.is_some_and(|max| self.pages >= max) {
            #[cfg(feature = "tracing")]
            tracing::debug!(pages = self.pages, "page cap reached");
            self.cursor = None;
            return Ok(None);
        }
        if self.pages > 0 {
            self.guarded(tokio::time::sleep(self.delay())).await?;
        }

        let raw = self.fetch_with_retry(cursor).await?;
        self.pages += 1;
        let raw_len = raw.len();
        let mut rows: TimeSeries = raw.into_iter().collect();
        self.cursor = self.advance(cursor, &rows, raw_len);
        rows.retain_range(self.req.start, self.req.end);

        #[cfg(feature = "tracing")]
        tracing::debug!(raw = raw_len, kept = rows.len(), done = self.cursor.is_none(), "page fetched");
        Ok(Some(Page { rows, raw_len }))
    }

    /// Next cursor after a page, updating the resume boundary.
    fn advance(&mut self, cursor: PageCursor, rows: &TimeSeries, raw_len: usize) -> Option<PageCursor> {
        let (Some(oldest), Some(newest)) = (rows.first().map(|c| c.ts), rows.last().map(|c| c.ts))
        else {
            return None;
        };
        let short = self.pagination.page_size.is_some_and(|n| raw_len < n);
        match cursor {
            PageCursor::Before(t) => {
                if oldest >= t {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(cursor = %t, oldest = %oldest, "backward cursor did not advance");
                    return None;
                }
                self.resume_from = Some(oldest);
                (oldest > self.req.start && !short).then_some(PageCursor::Before(oldest))
            }
            PageCursor::Since(t) => {
                if newest < t {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(cursor = %t, newest = %newest, "forward cursor did not advance");
                    return None;
                }
                let next = newest + TimeDelta::milliseconds(1);
                self.resume_from = Some(next);
                (next < self.req.end && !short).then_some(PageCursor::Since(next))
            }
            PageCursor::Range { .. } => None,
        }
    }

    async fn fetch_with_retry(&self, cursor: PageCursor) -> Result<Vec<Candle>, CandelaError> {
        let mut attempt: u32 = 0;
        loop {
            let call = async {
                let rows = tokio::time::timeout(
                    self.cfg.page_timeout,
                    self.provider
                        .fetch_page(&self.req.symbol, self.req.interval, cursor),
                )
                .await
                .unwrap_or_else(|_| {
                    Err(CandelaError::provider_timeout(self.source.clone(), "history"))
                })?;
                rows.iter().try_for_each(validate_candle)?;
                Ok::<_, CandelaError>(rows)
            };
            match self.guarded(call).await? {
                Ok(rows) => return Ok(rows),
                Err(e) if e.is_retryable() && attempt < self.cfg.max_retries => {
                    let wait = retry_delay(&self.cfg.backoff, attempt);
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        error = %e,
                        attempt = attempt + 1,
                        wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                        "page request failed; retrying"
                    );
                    self.guarded(tokio::time::sleep(wait)).await?;
                    attempt += 1;
                }
                Err(e) if e.is_retryable() => {
                    return Err(CandelaError::fetch(
                        self.source.clone(),
                        format!(
                            "{} {}: {e} (after {} attempts)",
                            self.req.symbol,
                            self.req.interval,
                            attempt + 1
                        ),
                        self.resume_from,
                    ));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Race `fut` against cancellation and the overall deadline.
    pub(crate) async fn guarded<T>(&self, fut: impl Future<Output = T>) -> Result<T, CandelaError> {
        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(CandelaError::Cancelled(format!(
                "history {} {}",
                self.req.symbol, self.req.interval
            ))),
            () = deadline => Err(CandelaError::request_timeout("history")),
            v = fut => Ok(v),
        }
    }
}

/// Fetch every row of `req` from `provider`, ascending and de-duplicated.
///
/// # Errors
/// See [`Paginator::next_page`].
pub async fn fetch_history(
    provider: &dyn HistoryProvider,
    source: &str,
    req: FetchRequest,
    cfg: &FetchConfig,
    cancel: CancellationToken,
) -> Result<TimeSeries, CandelaError> {
    let mut pager = Paginator::new(provider, source, req, cfg, cancel)?;
    let mut out = TimeSeries::new();
    while let Some(page) = pager.next_page().await? {
        out.extend(page.rows);
    }
    Ok(out)
}
