use std::sync::Arc;

use candela::Candela;
use candela::trading::{MovingAverageCross, OrderExecutor, StrategyRegistry, TradingRunner, parse_jobs};
use candela_demos::common::{connector_or_mock, init_tracing};
use candela_upbit::{Credentials, UpbitConnector, UpbitExchange};
use chrono::{FixedOffset, TimeDelta};
use tokio_util::sync::CancellationToken;

/// `{strategy: [cycle, market, budget, "HH:MM"]}`
const JOBS: &str = r#"{"ma_cross": [1, "upbit", 100000, "09:00"]}"#;
const TICKER: &str = "KRW-BTC";
const UTC_OFFSET_HOURS: i32 = 9;
const LOOKBACK_DAYS: i64 = 60;
const STORE_DIR: &str = "./data/upbit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Suggested: RUST_LOG=info,candela=debug
    init_tracing();

    let data = connector_or_mock(UpbitConnector::new)?;
    let source = data.label();
    let candela = Arc::new(
        Candela::builder()
            .with_connector(data)
            .store_dir(STORE_DIR)
            .build()?,
    );

    let strategy =
        MovingAverageCross::daily(TICKER, source)?.with_refresh(TimeDelta::days(LOOKBACK_DAYS));
    let registry = StrategyRegistry::new().with(Arc::new(strategy))?;

    let offset = FixedOffset::east_opt(UTC_OFFSET_HOURS * 3600).ok_or("invalid UTC offset")?;
    let mut jobs = parse_jobs(JOBS)?;
    for job in &mut jobs {
        job.schedule = job.schedule.in_offset(offset);
        tracing::info!(strategy = %job.strategy, market = %job.market, schedule = %job.schedule, "job scheduled");
    }

    let mut runner = TradingRunner::new(candela, registry);
    match Credentials::from_env() {
        Ok(creds) => {
            let exchange = Arc::new(UpbitExchange::new(creds)?);
            runner = runner.with_executor("upbit", OrderExecutor::new(exchange));
        }
        Err(e) => tracing::warn!(error = %e, "no exchange credentials; decisions are logged only"),
    }
    let mut runner = runner.with_jobs(jobs)?;

    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        stop.cancel();
    });
    runner.run(cancel).await?;
    Ok(())
}
