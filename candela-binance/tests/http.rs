use std::str::FromStr;

use candela_binance::BinanceConnector;
use candela_core::connector::{CandleConnector, PageCursor, PageDirection};
use candela_core::{CandelaError, Decimal, Interval};
use chrono::{DateTime, Utc};
use httpmock::prelude::*;
use serde_json::json;

fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn kline(open_ms: i64, close: &str) -> serde_json::Value {
    json!([
        open_ms, "42000.00", "42100.00", "41900.00", close, "3.5",
        open_ms + 3_599_999, "147000.0", 42, "1.2", "50400.0", "0"
    ])
}

#[tokio::test]
async fn since_cursor_sends_start_time_in_millis() {
    let server = MockServer::start_async().await;
    let t0 = ts("2024-01-01T00:00:00Z");
    let ms = t0.timestamp_millis();
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v3/klines")
                .query_param("symbol", "BTCUSDT")
                .query_param("interval", "1h")
                .query_param("limit", "1000")
                .query_param("startTime", ms.to_string());
            then.status(200).json_body(json!([
                kline(ms, "42010.5"),
                kline(ms + 3_600_000, "42020.0"),
            ]));
        })
        .await;

    let binance = BinanceConnector::with_base_url(&server.base_url()).unwrap();
    let history = binance.as_history_provider().unwrap();
    assert_eq!(history.pagination(Interval::I1h).direction, PageDirection::Forward);

    let rows = history
        .fetch_page("BTCUSDT", Interval::I1h, PageCursor::Since(t0))
        .await
        .unwrap();
    mock.assert_async().await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].ts, t0);
    assert_eq!(rows[0].close, Decimal::from_str("42010.5").unwrap());
    assert_eq!(rows[1].ts, ts("2024-01-01T01:00:00Z"));
}

#[tokio::test]
async fn range_cursor_makes_end_time_inclusive() {
    let server = MockServer::start_async().await;
    let start = ts("2024-01-01T00:00:00Z");
    let end = ts("2024-01-02T00:00:00Z");
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v3/klines")
                .query_param("endTime", (end.timestamp_millis() - 1).to_string());
            then.status(200).json_body(json!([]));
        })
        .await;

    let binance = BinanceConnector::with_base_url(&server.base_url()).unwrap();
    let rows = binance
        .as_history_provider()
        .unwrap()
        .fetch_page("BTCUSDT", Interval::I1h, PageCursor::Range { start, end })
        .await
        .unwrap();
    mock.assert_async().await;
    assert!(rows.is_empty());
}

#[tokio::test]
async fn ten_minute_interval_is_unsupported() {
    let binance = BinanceConnector::with_base_url("http://127.0.0.1:9").unwrap();
    let err = binance
        .as_history_provider()
        .unwrap()
        .fetch_page("BTCUSDT", Interval::I10m, PageCursor::Since(ts("2024-01-01T00:00:00Z")))
        .await
        .unwrap_err();
    assert!(matches!(err, CandelaError::Unsupported { .. }));
}

#[tokio::test]
async fn list_symbols_keeps_trading_pairs() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v3/exchangeInfo");
            then.status(200).json_body(json!({
                "timezone": "UTC",
                "serverTime": 1_704_067_200_000_i64,
                "symbols": [
                    {"symbol": "SEIUSDT", "status": "TRADING", "baseAsset": "SEI", "quoteAsset": "USDT"},
                    {"symbol": "OLDBTC", "status": "BREAK", "baseAsset": "OLD", "quoteAsset": "BTC"},
                    {"symbol": "BTCUSDT", "status": "TRADING", "baseAsset": "BTC", "quoteAsset": "USDT"}
                ]
            }));
        })
        .await;

    let binance = BinanceConnector::with_base_url(&server.base_url()).unwrap();
    let symbols = binance.as_symbol_provider().unwrap().list_symbols().await.unwrap();
    assert_eq!(symbols, vec!["BTCUSDT".to_string(), "SEIUSDT".to_string()]);
}

#[tokio::test]
async fn invalid_symbol_maps_to_not_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v3/klines");
            then.status(400)
                .json_body(json!({"code": -1121, "msg": "Invalid symbol."}));
        })
        .await;

    let binance = BinanceConnector::with_base_url(&server.base_url()).unwrap();
    let err = binance
        .as_point_provider()
        .unwrap()
        .candle_at("NOPE", Interval::I1m, ts("2024-01-01T00:00:00Z"))
        .await
        .unwrap_err();
    assert!(matches!(err, CandelaError::NotFound { .. }));
}
