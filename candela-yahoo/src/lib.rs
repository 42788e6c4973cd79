//! candela-yahoo
//!
//! Connector for the Yahoo Finance history download. One request covers the
//! whole range (`period1`/`period2`, Unix seconds) and returns a CSV with
//! adjusted closes.
#![warn(missing_docs)]

mod parse;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use url::Url;

use candela_core::connector::{
    CandleConnector, HistoryProvider, PageCursor, PageDirection, Pagination, PointProvider,
    SourceKey,
};
use candela_core::{CandelaError, Candle, Interval};

const NAME: &str = "candela-yahoo";

/// Download API origin.
pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Largest `period2` the download endpoint accepts.
const OPEN_END: i64 = 9_999_999_999;

const SUPPORTED: &[Interval] = &[
    Interval::I1m,
    Interval::I5m,
    Interval::I15m,
    Interval::I30m,
    Interval::I1h,
    Interval::D1,
    Interval::W1,
    Interval::Mo1,
];

/// Yahoo interval label, `None` for intervals Yahoo lacks.
#[must_use]
pub const fn interval_label(interval: Interval) -> Option<&'static str> {
    Some(match interval {
        Interval::I1m => "1m",
        Interval::I5m => "5m",
        Interval::I15m => "15m",
        Interval::I30m => "30m",
        Interval::I1h => "60m",
        Interval::D1 => "1d",
        Interval::W1 => "1wk",
        Interval::Mo1 => "1mo",
        _ => return None,
    })
}

/// Yahoo Finance history connector.
pub struct YahooConnector {
    http: reqwest::Client,
    base: String,
}

impl YahooConnector {
    /// Static connector key.
    pub const KEY: SourceKey = SourceKey::new(NAME);

    /// Spacing between downloads.
    pub const MIN_DELAY: Duration = Duration::from_millis(500);

    /// Connector against the public download API.
    ///
    /// # Errors
    /// Propagates base URL validation failures.
    pub fn new() -> Result<Self, CandelaError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Connector against another origin.
    ///
    /// # Errors
    /// Returns `InvalidArg` when `base` is not an absolute URL.
    pub fn with_base_url(base: &str) -> Result<Self, CandelaError> {
        Self::with_client(reqwest::Client::new(), base)
    }

    /// Connector over an existing HTTP client.
    ///
    /// Yahoo rejects requests without a browser-like user agent, so a
    /// supplied client should set one.
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

    async fn download(
        &self,
        ticker: &str,
        interval: Interval,
        period1: i64,
        period2: i64,
    ) -> Result<Vec<Candle>, CandelaError> {
        let label = interval_label(interval)
            .ok_or_else(|| CandelaError::unsupported(format!("history/{interval}")))?;
        let mut url = Url::parse(&format!("{}/v7/finance/download/{ticker}", self.base))
            .map_err(|e| CandelaError::InvalidArg(format!("ticker {ticker}: {e}")))?;
        url.query_pairs_mut()
            .append_pair("interval", label)
            .append_pair("period1", &period1.to_string())
            .append_pair("period2", &period2.to_string())
            .append_pair("events", "history")
            .append_pair("includeAdjustedClose", "true");

        let what = format!("history for {ticker}");
        let resp = self.http.get(url).send().await.map_err(transport_error)?;
        let status = resp.status();
        let body = resp.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(status_error(status, &body, &what));
        }
        let rows = parse::parse_download(&body)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(ticker, rows = rows.len(), "yahoo download parsed");
        Ok(rows)
    }
}

fn transport_error(e: reqwest::Error) -> CandelaError {
    if e.is_timeout() {
        CandelaError::provider_timeout(NAME, "http")
    } else {
        CandelaError::connector(NAME, e.to_string())
    }
}

fn status_error(status: StatusCode, body: &str, what: &str) -> CandelaError {
    if status == StatusCode::NOT_FOUND {
        return CandelaError::not_found(what.to_string());
    }
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::UNAUTHORIZED
        || status.is_server_error()
    {
        return CandelaError::connector(NAME, format!("HTTP {status}: {body}"));
    }
    CandelaError::InvalidArg(format!("{what}: HTTP {status}: {body}"))
}

impl CandleConnector for YahooConnector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "yf"
    }

    fn as_history_provider(&self) -> Option<&dyn HistoryProvider> {
        Some(self as &dyn HistoryProvider)
    }

    fn as_point_provider(&self) -> Option<&dyn PointProvider> {
        Some(self as &dyn PointProvider)
    }
}

#[async_trait]
impl HistoryProvider for YahooConnector {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela_yahoo::fetch_page",
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
            PageCursor::Range { start, end } => (Some(start), Some(end)),
            PageCursor::Since(t) => (Some(t), None),
            PageCursor::Before(t) => (None, Some(t)),
        };
        let period1 = start.map_or(0, |t| t.timestamp());
        let period2 = end.map_or(OPEN_END, |t| t.timestamp());
        let mut rows = self.download(symbol, interval, period1, period2).await?;
        rows.retain(|c| start.is_none_or(|s| c.ts >= s) && end.is_none_or(|e| c.ts < e));
        Ok(rows)
    }

    fn pagination(&self, _interval: Interval) -> Pagination {
        Pagination {
            direction: PageDirection::Single,
            page_size: None,
            min_delay: Self::MIN_DELAY,
        }
    }

    fn supported_intervals(&self) -> &'static [Interval] {
        SUPPORTED
    }
}

#[async_trait]
impl PointProvider for YahooConnector {
    async fn candle_at(
        &self,
        symbol: &str,
        interval: Interval,
        ts: DateTime<Utc>,
    ) -> Result<Option<Candle>, CandelaError> {
        let end = interval
            .cadence()
            .nth(ts, 1)
            .ok_or_else(|| CandelaError::InvalidArg(format!("{ts} out of range")))?;
        let rows = self
            .download(symbol, interval, ts.timestamp(), end.timestamp())
            .await?;
        Ok(rows.into_iter().find(|c| c.ts == ts))
    }
}
