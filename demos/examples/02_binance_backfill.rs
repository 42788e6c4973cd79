use candela::Candela;
use candela_binance::BinanceConnector;
use candela_core::{FillPolicy, Interval, StoreFormat};
use candela_demos::common::{connector_or_mock, init_tracing};
use chrono::{TimeDelta, Utc};

const TICKERS: &[&str] = &["BTCUSDT", "ETHUSDT"];
const INTERVAL: Interval = Interval::I1h;
const DAYS: i64 = 30;
const STORE_DIR: &str = "./data/binance";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let connector = connector_or_mock(BinanceConnector::new)?;
    let source = connector.label();
    let candela = Candela::builder()
        .with_connector(connector)
        .store_dir(STORE_DIR)
        .store_format(StoreFormat::Csv)
        .fill_policy(FillPolicy::Refetch)
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
            "{}: {} rows fetched, {} refetched, {} stored",
            r.key,
            r.rows_fetched,
            r.fill.refetched.len(),
            r.store_rows
        );
    }
    for (key, err) in &report.failed {
        eprintln!("{key}: {err}");
    }
    Ok(())
}
