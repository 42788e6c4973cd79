use candela::Candela;
use candela_core::Interval;
use candela_demos::common::{connector_or_mock, init_tracing};
use candela_yahoo::YahooConnector;
use chrono::{NaiveDate, Utc};

const TICKERS: &[&str] = &["AAPL", "MSFT", "005930.KS"];
const INTERVAL: Interval = Interval::D1;
const SINCE: (i32, u32, u32) = (2020, 1, 1);
const STORE_DIR: &str = "./data/yahoo";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let connector = connector_or_mock(YahooConnector::new)?;
    let source = connector.label();
    let candela = Candela::builder()
        .with_connector(connector)
        .store_dir(STORE_DIR)
        .fill_gaps(false)
        .build()?;

    let (y, m, d) = SINCE;
    let start = NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .ok_or("invalid start date")?
        .and_utc();
    let report = candela
        .download()
        .tickers(source, TICKERS, INTERVAL)?
        .period(start, Utc::now())
        .run()
        .await?;

    for r in &report.completed {
        let stored = candela.load(&r.key).await?;
        let last = stored.last().map(|c| c.close.to_string()).unwrap_or_default();
        println!("{}: {} rows, last close {last}", r.key, r.store_rows);
    }
    for (key, err) in &report.failed {
        eprintln!("{key}: {err}");
    }
    Ok(())
}
