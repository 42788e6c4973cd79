//! Response shapes and error mapping for the Binance spot REST API.

use chrono::DateTime;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};

use candela_core::{CandelaError, Candle};

use crate::NAME;

/// Error code Binance returns for an unknown symbol.
const INVALID_SYMBOL: i64 = -1121;

/// One kline row: `[open_time, open, high, low, close, volume, close_time, ...]`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawKline(
    i64,
    Decimal,
    Decimal,
    Decimal,
    Decimal,
    Decimal,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
);

impl RawKline {
    pub(crate) fn into_candle(self) -> Result<Candle, CandelaError> {
        let ts = DateTime::from_timestamp_millis(self.0)
            .ok_or_else(|| CandelaError::Data(format!("kline open time {} out of range", self.0)))?;
        Ok(Candle::new(ts, self.1, self.2, self.3, self.4, self.5))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExchangeInfo {
    pub(crate) symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SymbolInfo {
    pub(crate) symbol: String,
    pub(crate) status: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

pub(crate) async fn get_json<T: DeserializeOwned>(
    req: reqwest::RequestBuilder,
    what: &str,
) -> Result<T, CandelaError> {
    let resp = req.send().await.map_err(transport_error)?;
    let status = resp.status();
    let body = resp.text().await.map_err(transport_error)?;
    if !status.is_success() {
        return Err(status_error(status, &body, what));
    }
    serde_json::from_str(&body).map_err(|e| CandelaError::Data(format!("{what}: {e}")))
}

fn transport_error(e: reqwest::Error) -> CandelaError {
    if e.is_timeout() {
        CandelaError::provider_timeout(NAME, "http")
    } else {
        CandelaError::connector(NAME, e.to_string())
    }
}

/// Map a failed response. 418 is Binance's IP ban after ignored 429s; both
/// stay retryable so the fetcher backs off.
pub(crate) fn status_error(status: StatusCode, body: &str, what: &str) -> CandelaError {
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::IM_A_TEAPOT
        || status.is_server_error()
    {
        return CandelaError::connector(NAME, format!("HTTP {status}: {body}"));
    }
    match serde_json::from_str::<ApiError>(body) {
        Ok(e) if e.code == INVALID_SYMBOL => CandelaError::not_found(what.to_string()),
        Ok(e) => CandelaError::InvalidArg(format!("{what}: {} ({})", e.msg, e.code)),
        Err(_) if status == StatusCode::NOT_FOUND => CandelaError::not_found(what.to_string()),
        Err(_) => CandelaError::InvalidArg(format!("{what}: HTTP {status}: {body}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn kline_row_parses_string_prices() {
        let row = r#"[1704186000000,"42000.10","42100.00","41950.5","42050.00","12.345",1704186059999,"518000.1",120,"6.1","256000.0","0"]"#;
        let k: RawKline = serde_json::from_str(row).unwrap();
        let c = k.into_candle().unwrap();
        assert_eq!(c.ts.timestamp_millis(), 1_704_186_000_000);
        assert_eq!(c.low, Decimal::from_str("41950.5").unwrap());
        assert_eq!(c.volume, Decimal::from_str("12.345").unwrap());
    }

    #[test]
    fn invalid_symbol_is_not_found() {
        let err = status_error(
            StatusCode::BAD_REQUEST,
            r#"{"code":-1121,"msg":"Invalid symbol."}"#,
            "klines for NOPE",
        );
        assert!(matches!(err, CandelaError::NotFound { .. }));
    }

    #[test]
    fn ban_is_retryable() {
        assert!(status_error(StatusCode::IM_A_TEAPOT, "", "x").is_retryable());
        assert!(!status_error(StatusCode::BAD_REQUEST, r#"{"code":-1100,"msg":"bad"}"#, "x").is_retryable());
    }
}
