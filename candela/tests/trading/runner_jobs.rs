use std::sync::Arc;

use candela::Candela;
use candela::trading::{
    Action, MovingAverageCross, OrderExecutor, StrategyRegistry, TradingRunner, load_jobs,
};
use candela_core::connector::{OrderProvider, PageDirection};
use candela_core::{Candle, Interval, OrderRequest, SeriesKey, TimeSeries};
use chrono::TimeDelta;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::helpers::{SOURCE, TICKER, builder, dt, paged};

fn daily(closes: &[i64]) -> TimeSeries {
    let first = dt(2024, 1, 1, 0, 0, 0);
    closes
        .iter()
        .zip(0i64..)
        .map(|(c, i)| Candle::flat(first + TimeDelta::days(i), Decimal::from(*c), false))
        .collect()
}

struct Desk {
    runner: TradingRunner,
    ctl: candela_mock::DynamicMockController,
    _dir: tempfile::TempDir,
}

async fn desk(jobs_json: &str, with_executor: bool) -> Desk {
    let dir = tempfile::tempdir().unwrap();
    let (conn, ctl) = paged(PageDirection::Backward, Some(200));
    ctl.set_balance("KRW", dec!(1_000_000)).await;
    let candela = builder(conn.clone(), &dir).build().unwrap();

    let key = SeriesKey::new(TICKER, Interval::D1, SOURCE).unwrap();
    candela
        .store()
        .persist(&key, &daily(&[10, 10, 10, 10, 20]))
        .unwrap();
    let strategy = MovingAverageCross::new(key, 2, 4, Decimal::ONE).unwrap();
    let registry = StrategyRegistry::new().with(Arc::new(strategy)).unwrap();

    let path = dir.path().join("jobs.json");
    std::fs::write(&path, jobs_json).unwrap();
    let jobs = load_jobs(&path).unwrap();

    let mut runner = TradingRunner::new(Arc::new(candela), registry);
    if with_executor {
        let orders: Arc<dyn OrderProvider> = conn;
        runner = runner.with_executor(SOURCE, OrderExecutor::new(orders));
    }
    let runner = runner.with_jobs(jobs).unwrap();
    Desk {
        runner,
        ctl,
        _dir: dir,
    }
}

#[tokio::test]
async fn scheduled_job_buys_on_a_cross() {
    let mut d = desk(r#"{"ma_cross": [1, "Mock", 300000, "08:00"]}"#, true).await;

    assert!(d.runner.run_due(dt(2024, 1, 10, 7, 0, 0)).await.is_empty());
    assert_eq!(d.runner.next_due(), Some(dt(2024, 1, 10, 8, 0, 0)));
    assert!(d.ctl.orders().await.is_empty());

    let out = d.runner.run_due(dt(2024, 1, 10, 8, 0, 5)).await;

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].due, dt(2024, 1, 10, 8, 0, 0));
    let (decision, ack) = out[0].result.clone().unwrap();
    assert_eq!(decision.action, Action::Buy);
    assert_eq!(ack.unwrap().id, "mock-1");
    assert_eq!(
        d.ctl.orders().await,
        vec![OrderRequest::market_buy(TICKER, dec!(299_850))]
    );
    assert_eq!(d.runner.next_due(), Some(dt(2024, 1, 11, 8, 0, 0)));
}

#[tokio::test]
async fn markets_without_an_executor_only_evaluate() {
    let mut d = desk(r#"{"ma_cross": [1, "mock", 0, "08:00"]}"#, false).await;
    d.runner.run_due(dt(2024, 1, 10, 7, 0, 0)).await;

    let out = d.runner.run_due(dt(2024, 1, 10, 8, 0, 0)).await;

    let (decision, ack) = out[0].result.clone().unwrap();
    assert_eq!(decision.action, Action::Buy);
    assert!(ack.is_none());
    assert!(d.ctl.orders().await.is_empty());
}

#[test]
fn unknown_strategies_in_the_job_file_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (conn, _ctl) = paged(PageDirection::Backward, Some(10));
    let candela = Candela::builder()
        .with_connector(conn)
        .store_dir(dir.path())
        .build()
        .unwrap();
    let jobs = candela::trading::parse_jobs(r#"{"momentum": [1, "mock", 0, "08:00"]}"#).unwrap();

    let res = TradingRunner::new(Arc::new(candela), StrategyRegistry::new()).with_jobs(jobs);

    assert!(res.is_err());
}

#[tokio::test]
async fn refreshing_strategies_backfill_before_deciding() {
    let dir = tempfile::tempdir().unwrap();
    let (conn, ctl) = paged(PageDirection::Backward, Some(200));
    ctl.set_series(TICKER, daily(&[10, 10, 10, 10, 1])).await;
    let candela = Arc::new(builder(conn, &dir).build().unwrap());
    let key = SeriesKey::new(TICKER, Interval::D1, SOURCE).unwrap();
    let strategy = MovingAverageCross::new(key.clone(), 2, 4, Decimal::ONE)
        .unwrap()
        .with_refresh(TimeDelta::days(30));
    let registry = StrategyRegistry::new().with(Arc::new(strategy)).unwrap();
    let runner = TradingRunner::new(Arc::clone(&candela), registry);
    let job = candela::trading::parse_jobs(r#"{"ma_cross": [1, "mock", 0, "08:00"]}"#)
        .unwrap()
        .remove(0);

    let (decision, ack) = runner.run_job(&job, dt(2024, 1, 6, 8, 0, 0)).await.unwrap();

    assert_eq!(decision.action, Action::Sell);
    assert!(ack.is_none());
    assert_eq!(candela.load(&key).await.unwrap().len(), 5);
    assert_eq!(ctl.page_requests().await.len(), 1);
}
