use std::time::Duration;

use candela_core::connector::{PageDirection, Pagination};
use candela_core::{CandelaError, FillPolicy};
use candela_mock::DynamicMockConnector;
use rust_decimal::Decimal;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::helpers::{TICKER, bar, builder, key, minute, paged, quick_fetch};

#[tokio::test(start_paused = true)]
async fn hanging_point_lookup_hits_the_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let (conn, ctl) = paged(PageDirection::Forward, Some(10));
    ctl.set_series(TICKER, (0..6).map(|i| bar(i, 100 + i)).collect()).await;
    ctl.hide_from_pages(TICKER, [minute(3)]).await;
    ctl.hang_points().await;
    // Requests may stall longer than the deadline, so only the deadline can end the lookup
    let mut fetch = quick_fetch();
    fetch.page_timeout = Duration::from_secs(60);
    fetch.deadline = Some(Duration::from_secs(5));
    let candela = builder(conn, &dir)
        .fetch_config(fetch)
        .fill_policy(FillPolicy::Refetch)
        .build()
        .unwrap();

    let started = Instant::now();
    let outcome = tokio::time::timeout(
        Duration::from_secs(3600),
        candela.backfill(&key(), minute(0), minute(6)),
    )
    .await
    .expect("backfill must end at its deadline");

    assert!(matches!(outcome, Err(CandelaError::RequestTimeout { .. })));
    assert!(started.elapsed() < Duration::from_secs(60));
    assert_eq!(ctl.point_requests().await.len(), 1);
    // The in-flight window never reached the store
    assert!(candela.load(&key()).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancelling_during_refetch_discards_the_window() {
    let dir = tempfile::tempdir().unwrap();
    let (conn, ctl) = paged(PageDirection::Forward, Some(10));
    ctl.set_series(TICKER, (0..6).map(|i| bar(i, 100 + i)).collect()).await;
    ctl.hide_from_pages(TICKER, [minute(3)]).await;
    ctl.hang_points().await;
    let candela = builder(conn, &dir)
        .fill_policy(FillPolicy::Refetch)
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });
    let err = candela
        .backfill_with_cancel(&key(), minute(0), minute(6), cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, CandelaError::Cancelled(_)));
    assert!(candela.load(&key()).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stalled_point_lookup_times_out_and_carries_forward() {
    let dir = tempfile::tempdir().unwrap();
    let (conn, ctl) = paged(PageDirection::Forward, Some(10));
    ctl.set_series(TICKER, (0..6).map(|i| bar(i, 100 + i)).collect()).await;
    ctl.hide_from_pages(TICKER, [minute(3)]).await;
    ctl.hang_points().await;
    let candela = builder(conn, &dir)
        .fill_policy(FillPolicy::Refetch)
        .build()
        .unwrap();

    let report = candela.backfill(&key(), minute(0), minute(6)).await.unwrap();

    assert!(report.fill.refetched.is_empty());
    assert_eq!(report.fill.filled, vec![minute(3)]);
    assert!(
        report
            .fill
            .warnings
            .iter()
            .any(|w| matches!(w, CandelaError::ProviderTimeout { .. }))
    );
    let stored = candela.load(&key()).await.unwrap();
    assert_eq!(stored.get(&minute(3)).unwrap().close, Decimal::from(102));
}

#[tokio::test(start_paused = true)]
async fn point_lookups_respect_the_source_minimum_delay() {
    let dir = tempfile::tempdir().unwrap();
    let (conn, ctl) = DynamicMockConnector::new_with_controller(
        "dynamic",
        Pagination {
            direction: PageDirection::Forward,
            page_size: Some(10),
            min_delay: Duration::from_millis(100),
        },
    );
    ctl.set_series(TICKER, (0..8).map(|i| bar(i, 100 + i)).collect()).await;
    ctl.hide_from_pages(TICKER, (1..=6).map(minute)).await;
    let candela = builder(conn, &dir)
        .fill_policy(FillPolicy::Refetch)
        .build()
        .unwrap();

    let started = Instant::now();
    let report = candela.backfill(&key(), minute(0), minute(8)).await.unwrap();

    assert_eq!(report.pages, 1);
    assert_eq!(report.fill.refetched.len(), 6);
    assert_eq!(ctl.point_requests().await.len(), 6);
    // One spacing after the page and between each pair of lookups
    assert!(started.elapsed() >= Duration::from_millis(600));
}
