use std::collections::BTreeSet;
use std::time::Duration;

use candela::{FetchRequest, fetch_history};
use candela_core::connector::PageDirection;
use candela_core::{CandelaError, FetchConfig, Interval, TimeSeries};
use candela_mock::PageStep;
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::helpers::{TICKER, bar, minute, paged, quick_fetch};

fn ramp(n: i64) -> TimeSeries {
    (0..n).map(|i| bar(i, 100 + i)).collect()
}

fn request(lo: i64, hi: i64) -> FetchRequest {
    FetchRequest::new(TICKER, Interval::I1m, minute(lo), minute(hi)).unwrap()
}

/// Walk `[lo, hi)` over a source holding `offsets`; returns (fetched, expected).
fn walk(
    direction: PageDirection,
    page_size: Option<usize>,
    offsets: &BTreeSet<i64>,
    lo: i64,
    hi: i64,
) -> (TimeSeries, TimeSeries) {
    tokio_test::block_on(async {
        let (conn, ctl) = paged(direction, page_size);
        let series: TimeSeries = offsets.iter().map(|&i| bar(i, 1_000 + i)).collect();
        ctl.set_series(TICKER, series.clone()).await;
        let got = fetch_history(
            conn.as_ref(),
            "dynamic",
            request(lo, hi),
            &quick_fetch(),
            CancellationToken::new(),
        )
        .await
        .unwrap();
        let expected: TimeSeries = series.range(minute(lo)..minute(hi)).cloned().collect();
        (got, expected)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn backward_walk_returns_exactly_the_window(
        offsets in prop::collection::btree_set(0i64..400, 0..80),
        page_size in 1usize..12,
        lo in 0i64..200,
        len in 1i64..300,
    ) {
        let (got, expected) = walk(PageDirection::Backward, Some(page_size), &offsets, lo, lo + len);
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn forward_walk_returns_exactly_the_window(
        offsets in prop::collection::btree_set(0i64..400, 0..80),
        page_size in 1usize..12,
        lo in 0i64..200,
        len in 1i64..300,
    ) {
        let (got, expected) = walk(PageDirection::Forward, Some(page_size), &offsets, lo, lo + len);
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn single_request_returns_exactly_the_window(
        offsets in prop::collection::btree_set(0i64..400, 0..80),
        lo in 0i64..200,
        len in 1i64..300,
    ) {
        let (got, expected) = walk(PageDirection::Single, None, &offsets, lo, lo + len);
        prop_assert_eq!(got, expected);
    }
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried() {
    let (conn, ctl) = paged(PageDirection::Backward, Some(2));
    ctl.set_series(TICKER, ramp(6)).await;
    ctl.push_steps([
        PageStep::Fail(CandelaError::connector("dynamic", "502 bad gateway")),
        PageStep::Fail(CandelaError::Data("truncated body".into())),
    ])
    .await;

    let got = fetch_history(conn.as_ref(), "dynamic", request(0, 6), &quick_fetch(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(got, ramp(6));
    // two failed attempts, then three pages
    assert_eq!(ctl.page_requests().await.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_report_where_to_resume() {
    let (conn, ctl) = paged(PageDirection::Backward, Some(2));
    ctl.set_series(TICKER, ramp(6)).await;
    let down = || PageStep::Fail(CandelaError::connector("dynamic", "connection reset"));
    ctl.push_steps([PageStep::Serve, down(), down(), down()]).await;

    let err = fetch_history(conn.as_ref(), "dynamic", request(0, 6), &quick_fetch(), CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        CandelaError::Fetch { resume_from, .. } => assert_eq!(resume_from, Some(minute(4))),
        other => panic!("expected Fetch, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn missing_symbols_are_not_retried() {
    let (conn, ctl) = paged(PageDirection::Forward, Some(10));

    let err = fetch_history(conn.as_ref(), "dynamic", request(0, 6), &quick_fetch(), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CandelaError::NotFound { .. }));
    assert_eq!(ctl.page_requests().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn stalled_pages_time_out_and_are_retried() {
    let (conn, ctl) = paged(PageDirection::Forward, Some(10));
    ctl.set_series(TICKER, ramp(4)).await;
    ctl.push_steps([PageStep::Hang]).await;
    let cfg = FetchConfig {
        page_timeout: Duration::from_secs(2),
        ..quick_fetch()
    };

    let got = fetch_history(conn.as_ref(), "dynamic", request(0, 4), &cfg, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(got.len(), 4);
    assert_eq!(ctl.page_requests().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_a_stalled_page() {
    let (conn, ctl) = paged(PageDirection::Backward, Some(2));
    ctl.set_series(TICKER, ramp(6)).await;
    ctl.push_steps([PageStep::Hang]).await;
    let cfg = FetchConfig {
        page_timeout: Duration::from_secs(60),
        ..quick_fetch()
    };
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let err = fetch_history(conn.as_ref(), "dynamic", request(0, 6), &cfg, cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, CandelaError::Cancelled(_)));
}

#[tokio::test(start_paused = true)]
async fn overall_deadline_bounds_the_walk() {
    let (conn, ctl) = paged(PageDirection::Backward, Some(2));
    ctl.set_series(TICKER, ramp(6)).await;
    ctl.push_steps([PageStep::Serve, PageStep::Hang]).await;
    let cfg = FetchConfig {
        page_timeout: Duration::from_secs(60),
        deadline: Some(Duration::from_secs(5)),
        ..quick_fetch()
    };

    let err = fetch_history(conn.as_ref(), "dynamic", request(0, 6), &cfg, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CandelaError::RequestTimeout { .. }));
}

#[tokio::test(start_paused = true)]
async fn pages_are_spaced_by_the_configured_delay() {
    let (conn, ctl) = paged(PageDirection::Backward, Some(2));
    ctl.set_series(TICKER, ramp(6)).await;
    let cfg = FetchConfig {
        page_delay: Duration::from_millis(250),
        ..quick_fetch()
    };

    let started = tokio::time::Instant::now();
    let got = fetch_history(conn.as_ref(), "dynamic", request(0, 6), &cfg, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(got.len(), 6);
    assert_eq!(ctl.page_requests().await.len(), 3);
    assert!(started.elapsed() >= Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn page_cap_stops_early() {
    let (conn, ctl) = paged(PageDirection::Forward, Some(2));
    ctl.set_series(TICKER, ramp(10)).await;
    let cfg = FetchConfig {
        max_pages: Some(2),
        ..quick_fetch()
    };

    let got = fetch_history(conn.as_ref(), "dynamic", request(0, 10), &cfg, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(got, ramp(4));
}
