//! Candela backfills OHLCV candles from exchanges into local files.
//!
//! Overview
//! - Pages through a source's history (backwards, forwards or in one bulk
//!   request) with pacing, per-page timeouts, jittered retries, cancellation
//!   and an optional overall deadline.
//! - Repairs gaps on the interval grid, by carrying the last close forward or
//!   by asking the source for each missing candle.
//! - Merges each fetched window into the stored series with newer-wins
//!   precedence and persists it atomically, one writer per series.
//! - Downloads many series concurrently and runs scheduled trading strategies
//!   against the stored data.
//!
//! Examples
//! Backfilling a day of Upbit minute candles:
//! ```rust,ignore
//! use std::sync::Arc;
//! use candela::{Candela, FillPolicy, Interval};
//!
//! let upbit = Arc::new(candela_upbit::UpbitConnector::new()?);
//! let candela = Candela::builder()
//!     .with_connector(upbit)
//!     .store_dir("./data/upbit")
//!     .fill_policy(FillPolicy::Refetch)
//!     .build()?;
//! let key = candela.key("upbit", "KRW-BTC", Interval::I1m)?;
//! let report = candela.backfill(&key, start, end).await?;
//! println!("{} rows stored, {} gaps filled", report.store_rows, report.fill.rows_added());
//! ```
//!
//! Downloading several tickers at once:
//! ```rust,ignore
//! let report = candela
//!     .download()
//!     .tickers("binance", &["BTCUSDT", "ETHUSDT"], Interval::I1h)?
//!     .since(start)
//!     .run()
//!     .await?;
//! for (key, err) in &report.failed {
//!     eprintln!("{key}: {err}");
//! }
//! ```
#![warn(missing_docs)]

mod backoff;
pub(crate) mod core;
mod download;
pub mod fetcher;
mod pipeline;
pub mod store;
pub mod trading;

pub use backoff::{jitter_wait, retry_delay};
pub use crate::core::{Candela, CandelaBuilder, DEFAULT_STORE_DIR};
pub use download::DownloadBuilder;
pub use fetcher::{FetchRequest, Page, Paginator, fetch_history};
pub use store::{FileStore, KeyedLocks};

pub use candela_middleware::{ThrottleMiddleware, ThrottledConnector};

// Re-export core types for convenience
pub use candela_core::{
    BackfillReport, BackoffConfig, Cadence, CandelaConfig, CandelaError, Candle, CandleConnector,
    Decimal, DownloadReport, FetchConfig, FillPolicy, FillReport, Filled, GapSet, HistoryProvider,
    Interval, MergeStats, Middleware, OrderAck, OrderProvider, OrderRequest, OrderSide, OrderType,
    PageCursor, PageDirection, Pagination, PointProvider, SeriesKey, SourceKey, StoreFormat,
    SymbolProvider, TimeSeries, carry_forward, detect, detect_in, fill_carry_forward,
    fill_with_refetch, infer_cadence, merge_newer_wins, resolve_cadence,
};
