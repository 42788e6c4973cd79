use candela_core::connector::PageDirection;
use candela_core::{CandelaError, FillPolicy, TimeSeries};
use candela_mock::PageStep;
use rust_decimal::Decimal;

use crate::helpers::{TICKER, bar, builder, key, minute, paged};

fn closes(series: &TimeSeries) -> Vec<Decimal> {
    series.iter().map(|c| c.close).collect()
}

#[tokio::test]
async fn newer_fetch_overwrites_overlap_and_keeps_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let (conn, ctl) = paged(PageDirection::Backward, Some(10));
    ctl.set_series(TICKER, vec![bar(1, 105), bar(2, 103)].into()).await;
    let candela = builder(conn, &dir).build().unwrap();
    let existing: TimeSeries = vec![bar(0, 100), bar(1, 101)].into();
    candela.store().persist(&key(), &existing).unwrap();

    let report = candela.backfill(&key(), minute(1), minute(3)).await.unwrap();

    assert_eq!(report.merge.inserted, 1);
    assert_eq!(report.merge.replaced, 1);
    assert_eq!(report.merge.preserved, 1);
    assert_eq!(report.store_rows, 3);
    let stored = candela.load(&key()).await.unwrap();
    assert_eq!(
        closes(&stored),
        vec![Decimal::from(100), Decimal::from(105), Decimal::from(103)]
    );
}

#[tokio::test]
async fn corrupt_store_is_reported_and_left_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let (conn, ctl) = paged(PageDirection::Backward, Some(10));
    ctl.set_series(TICKER, vec![bar(0, 100), bar(1, 101)].into()).await;
    let candela = builder(conn, &dir).build().unwrap();
    let path = candela.store().path(&key());
    std::fs::write(&path, b"definitely not a candle store").unwrap();

    let err = candela.backfill(&key(), minute(0), minute(2)).await.unwrap_err();

    assert!(matches!(err, CandelaError::StoreCorrupt { .. }));
    assert_eq!(std::fs::read(&path).unwrap(), b"definitely not a candle store");
    assert!(ctl.page_requests().await.is_empty());
}

#[tokio::test]
async fn missing_rows_are_carried_forward() {
    let dir = tempfile::tempdir().unwrap();
    let (conn, ctl) = paged(PageDirection::Backward, Some(10));
    ctl.set_series(TICKER, (0..6).map(|i| bar(i, 100 + i)).collect()).await;
    ctl.hide_from_pages(TICKER, [minute(3)]).await;
    let candela = builder(conn, &dir).build().unwrap();

    let report = candela.backfill(&key(), minute(0), minute(6)).await.unwrap();

    assert_eq!(report.fill.filled, vec![minute(3)]);
    let stored = candela.load(&key()).await.unwrap();
    assert_eq!(stored.len(), 6);
    let filled = stored.get(&minute(3)).unwrap();
    assert_eq!(filled.close, Decimal::from(102));
    assert_eq!(filled.volume, Decimal::ZERO);
    assert!(ctl.point_requests().await.is_empty());
}

#[tokio::test]
async fn refetch_policy_recovers_the_real_candle() {
    let dir = tempfile::tempdir().unwrap();
    let (conn, ctl) = paged(PageDirection::Forward, Some(10));
    ctl.set_series(TICKER, (0..6).map(|i| bar(i, 100 + i)).collect()).await;
    ctl.hide_from_pages(TICKER, [minute(3)]).await;
    let candela = builder(conn, &dir)
        .fill_policy(FillPolicy::Refetch)
        .build()
        .unwrap();

    let report = candela.backfill(&key(), minute(0), minute(6)).await.unwrap();

    assert_eq!(report.fill.refetched, vec![minute(3)]);
    assert!(report.fill.filled.is_empty());
    let stored = candela.load(&key()).await.unwrap();
    assert_eq!(stored.get(&minute(3)).unwrap().close, Decimal::from(103));
    assert_eq!(ctl.point_requests().await, vec![(TICKER.to_string(), minute(3))]);
}

#[tokio::test]
async fn failed_backfill_resumes_from_the_reported_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let (conn, ctl) = paged(PageDirection::Backward, Some(2));
    ctl.set_series(TICKER, (0..6).map(|i| bar(i, 100 + i)).collect()).await;
    ctl.push_steps([
        PageStep::Serve,
        PageStep::Fail(CandelaError::connector("dynamic", "503 service unavailable")),
        PageStep::Fail(CandelaError::connector("dynamic", "503 service unavailable")),
        PageStep::Fail(CandelaError::connector("dynamic", "503 service unavailable")),
    ])
    .await;
    let candela = builder(conn, &dir).checkpoint_every(1).build().unwrap();

    let err = candela.backfill(&key(), minute(0), minute(6)).await.unwrap_err();
    let CandelaError::Fetch { resume_from: Some(resume), .. } = err else {
        panic!("expected Fetch with a resume point, got {err:?}");
    };
    assert_eq!(resume, minute(4));
    assert_eq!(candela.load(&key()).await.unwrap().len(), 2);

    let report = candela.backfill(&key(), minute(0), resume).await.unwrap();

    assert_eq!(report.store_rows, 6);
    let stored = candela.load(&key()).await.unwrap();
    assert_eq!(stored.first().unwrap().ts, minute(0));
    assert_eq!(stored.last().unwrap().ts, minute(5));
}

#[tokio::test]
async fn loading_an_unknown_series_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (conn, _ctl) = paged(PageDirection::Backward, Some(2));
    let candela = builder(conn, &dir).build().unwrap();

    assert!(candela.load(&key()).await.unwrap().is_empty());
}
