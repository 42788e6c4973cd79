#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use candela::{Candela, CandelaBuilder};
use candela_core::connector::{PageDirection, Pagination};
use candela_core::{BackoffConfig, Candle, FetchConfig, Interval, SeriesKey};
use candela_mock::{DynamicMockConnector, DynamicMockController};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;

pub const TICKER: &str = "KRW-BTC";
pub const SOURCE: &str = "mock";

pub fn dt(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|day| day.and_hms_opt(hh, mm, ss))
        .unwrap()
        .and_utc()
}

/// `i` minutes after 2024-01-02 09:00 UTC.
pub fn minute(i: i64) -> DateTime<Utc> {
    dt(2024, 1, 2, 9, 0, 0) + TimeDelta::minutes(i)
}

pub fn bar(i: i64, close: i64) -> Candle {
    Candle::flat(minute(i), Decimal::from(close), false)
}

pub fn key() -> SeriesKey {
    SeriesKey::new(TICKER, Interval::I1m, SOURCE).unwrap()
}

pub fn paged(
    direction: PageDirection,
    page_size: Option<usize>,
) -> (Arc<DynamicMockConnector>, DynamicMockController) {
    DynamicMockConnector::new_with_controller(
        "dynamic",
        Pagination {
            direction,
            page_size,
            min_delay: Duration::ZERO,
        },
    )
}

/// No pacing, short timeouts and small fixed backoff.
pub fn quick_fetch() -> FetchConfig {
    FetchConfig {
        page_delay: Duration::ZERO,
        page_timeout: Duration::from_secs(5),
        max_retries: 2,
        backoff: BackoffConfig {
            min_backoff_ms: 10,
            max_backoff_ms: 100,
            factor: 2,
            jitter_percent: 0,
        },
        deadline: None,
        checkpoint_pages: None,
        max_pages: None,
    }
}

pub fn builder(conn: Arc<DynamicMockConnector>, dir: &TempDir) -> CandelaBuilder {
    Candela::builder()
        .with_connector(conn)
        .store_dir(dir.path())
        .fetch_config(quick_fetch())
}
