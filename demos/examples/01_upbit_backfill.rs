use std::time::Duration;

use candela::{Candela, ThrottleMiddleware};
use candela_core::{Interval, Middleware};
use candela_demos::common::{connector_or_mock, init_tracing};
use candela_upbit::UpbitConnector;
use chrono::{TimeDelta, Utc};

const TICKERS: &[&str] = &["KRW-BTC", "KRW-ETH", "KRW-XRP"];
const INTERVAL: Interval = Interval::I1m;
const DAYS: i64 = 2;
const STORE_DIR: &str = "./data/upbit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Suggested: RUST_LOG=info,candela=debug
    init_tracing();

    let connector = connector_or_mock(UpbitConnector::new)?;
    let source = connector.label();
    let candela = Candela::builder()
        .with_connector(connector)
        .with_middleware(|| {
            Box::new(ThrottleMiddleware::new(Duration::from_millis(120))) as Box<dyn Middleware>
        })
        .store_dir(STORE_DIR)
        .checkpoint_every(20)
        .build()?;

    let end = Utc::now();
    let report = candela
        .download()
        .tickers(source, TICKERS, INTERVAL)?
        .period(end - TimeDelta::days(DAYS), end)
        .run()
        .await?;

    for r in &report.completed {
        println!(
            "{}: {} pages, {} rows stored, {} filled",
            r.key,
            r.pages,
            r.store_rows,
            r.fill.filled.len()
        );
    }
    for (key, err) in &report.failed {
        eprintln!("{key}: {err}");
    }
    Ok(())
}
