use candela_core::connector::PageDirection;
use candela_core::{CandelaError, Interval, SeriesKey, TimeSeries};
use tokio_util::sync::CancellationToken;

use crate::helpers::{SOURCE, bar, builder, minute, paged};

fn ten() -> TimeSeries {
    (0..10).map(|i| bar(i, 200 + i)).collect()
}

#[tokio::test]
async fn failing_series_do_not_abort_the_others() {
    let dir = tempfile::tempdir().unwrap();
    let (conn, ctl) = paged(PageDirection::Forward, Some(4));
    ctl.set_series("KRW-ETH", ten()).await;
    ctl.set_series("KRW-BTC", ten()).await;
    let candela = builder(conn, &dir).concurrency(2).build().unwrap();

    let report = candela
        .download()
        .tickers(SOURCE, &["KRW-ETH", "KRW-XRP", "KRW-BTC"], Interval::I1m)
        .unwrap()
        .period(minute(0), minute(10))
        .run()
        .await
        .unwrap();

    assert!(!report.is_success());
    let done: Vec<&str> = report.completed.iter().map(|r| r.key.ticker.as_str()).collect();
    assert_eq!(done, vec!["KRW-BTC", "KRW-ETH"]);
    assert!(report.completed.iter().all(|r| r.store_rows == 10));
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(
        report.failed.get("mock/KRW-XRP/1m"),
        Some(CandelaError::NotFound { .. })
    ));
}

#[tokio::test]
async fn all_symbols_expands_to_every_listed_ticker() {
    let dir = tempfile::tempdir().unwrap();
    let (conn, ctl) = paged(PageDirection::Backward, Some(4));
    ctl.set_series("KRW-ETH", ten()).await;
    ctl.set_series("KRW-BTC", ten()).await;
    let candela = builder(conn, &dir).build().unwrap();

    let report = candela
        .download()
        .all_symbols(SOURCE, Interval::I1m)
        .await
        .unwrap()
        .period(minute(0), minute(10))
        .run()
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.completed.len(), 2);
    let key = SeriesKey::new("KRW-ETH", Interval::I1m, SOURCE).unwrap();
    assert_eq!(candela.load(&key).await.unwrap(), ten());
}

#[tokio::test]
async fn duplicate_series_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (conn, _ctl) = paged(PageDirection::Backward, Some(4));
    let candela = builder(conn, &dir).build().unwrap();

    let res = candela
        .download()
        .tickers(SOURCE, &["KRW-BTC", "KRW-BTC"], Interval::I1m);

    assert!(matches!(res, Err(CandelaError::InvalidArg(_))));
}

#[tokio::test]
async fn empty_requests_are_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let (conn, _ctl) = paged(PageDirection::Backward, Some(4));
    let candela = builder(conn, &dir).build().unwrap();

    assert!(matches!(
        candela.download().run().await,
        Err(CandelaError::InvalidArg(_))
    ));
    let backwards = candela
        .download()
        .tickers(SOURCE, &["KRW-BTC"], Interval::I1m)
        .unwrap()
        .period(minute(5), minute(5))
        .run()
        .await;
    assert!(matches!(backwards, Err(CandelaError::InvalidArg(_))));
}

#[tokio::test]
async fn cancelled_download_reports_every_series() {
    let dir = tempfile::tempdir().unwrap();
    let (conn, ctl) = paged(PageDirection::Backward, Some(4));
    ctl.set_series("KRW-BTC", ten()).await;
    ctl.set_series("KRW-ETH", ten()).await;
    let candela = builder(conn, &dir).build().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = candela
        .download()
        .tickers(SOURCE, &["KRW-BTC", "KRW-ETH"], Interval::I1m)
        .unwrap()
        .period(minute(0), minute(10))
        .cancel_token(cancel)
        .run()
        .await
        .unwrap();

    assert!(report.completed.is_empty());
    assert!(report.failed.values().all(|e| matches!(e, CandelaError::Cancelled(_))));
    assert!(ctl.page_requests().await.is_empty());
}
