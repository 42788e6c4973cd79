use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;
use url::Url;

use candela_core::{CandelaError, Candle, Interval};

use crate::NAME;

/// Public REST origin.
pub const DEFAULT_BASE_URL: &str = "https://api.upbit.com";

const UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Thin HTTP client over the Upbit REST API.
#[derive(Clone)]
pub struct UpbitClient {
    http: reqwest::Client,
    base: String,
}

impl UpbitClient {
    /// Client against `base` (an origin such as `https://api.upbit.com`).
    ///
    /// # Errors
    /// Returns `InvalidArg` when `base` is not an absolute URL.
    pub fn new(http: reqwest::Client, base: &str) -> Result<Self, CandelaError> {
        let parsed =
            Url::parse(base).map_err(|e| CandelaError::InvalidArg(format!("base url {base}: {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(CandelaError::InvalidArg(format!("base url {base} is not a base")));
        }
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, CandelaError> {
        Url::parse(&format!("{}{path}", self.base))
            .map_err(|e| CandelaError::InvalidArg(format!("{path}: {e}")))
    }

    pub(crate) const fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Up to `count` candles strictly before `to`, newest first.
    pub(crate) async fn candles(
        &self,
        market: &str,
        interval: Interval,
        count: usize,
        to: DateTime<Utc>,
    ) -> Result<Vec<Candle>, CandelaError> {
        let path = candle_path(interval)
            .ok_or_else(|| CandelaError::unsupported(format!("history/{interval}")))?;
        let mut url = self.endpoint(&format!("/v1/candles/{path}"))?;
        url.query_pairs_mut()
            .append_pair("market", market)
            .append_pair("count", &count.to_string())
            .append_pair("to", &format!("{}Z", to.format(UTC_FORMAT)));

        let what = format!("candles for {market}");
        let rows: Vec<RawCandle> = get_json(self.http.get(url), &what).await?;
        rows.into_iter().map(RawCandle::into_candle).collect()
    }

    /// Every listed market code.
    pub(crate) async fn markets(&self) -> Result<Vec<String>, CandelaError> {
        let mut url = self.endpoint("/v1/market/all")?;
        url.query_pairs_mut().append_pair("isDetails", "false");
        let rows: Vec<RawMarket> = get_json(self.http.get(url), "markets").await?;
        Ok(rows.into_iter().map(|m| m.market).collect())
    }
}

/// Path segment under `/v1/candles/` for an interval.
#[must_use]
pub const fn candle_path(interval: Interval) -> Option<&'static str> {
    Some(match interval {
        Interval::I1m => "minutes/1",
        Interval::I3m => "minutes/3",
        Interval::I5m => "minutes/5",
        Interval::I10m => "minutes/10",
        Interval::I15m => "minutes/15",
        Interval::I30m => "minutes/30",
        Interval::I1h => "minutes/60",
        Interval::I4h => "minutes/240",
        Interval::D1 => "days",
        Interval::W1 => "weeks",
        Interval::Mo1 => "months",
        _ => return None,
    })
}

#[derive(Deserialize)]
struct RawCandle {
    candle_date_time_utc: String,
    opening_price: Box<RawValue>,
    high_price: Box<RawValue>,
    low_price: Box<RawValue>,
    trade_price: Box<RawValue>,
    candle_acc_trade_volume: Box<RawValue>,
}

impl RawCandle {
    fn into_candle(self) -> Result<Candle, CandelaError> {
        let ts = NaiveDateTime::parse_from_str(&self.candle_date_time_utc, UTC_FORMAT)
            .map_err(|e| {
                CandelaError::Data(format!(
                    "bad candle_date_time_utc {:?}: {e}",
                    self.candle_date_time_utc
                ))
            })?
            .and_utc();
        Ok(Candle::new(
            ts,
            number(&self.opening_price)?,
            number(&self.high_price)?,
            number(&self.low_price)?,
            number(&self.trade_price)?,
            number(&self.candle_acc_trade_volume)?,
        ))
    }
}

#[derive(Deserialize)]
struct RawMarket {
    market: String,
}

/// Parse the literal text of a JSON number (or numeric string) into a
/// decimal, so every digit the exchange sent survives.
pub(crate) fn number(raw: &RawValue) -> Result<Decimal, CandelaError> {
    let s = raw.get().trim_matches('"');
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map_err(|e| CandelaError::Data(format!("bad number {s}: {e}")))
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

pub(crate) fn transport_error(e: reqwest::Error) -> CandelaError {
    if e.is_timeout() {
        CandelaError::provider_timeout(NAME, "http")
    } else {
        CandelaError::connector(NAME, e.to_string())
    }
}

/// Map a non-success status to an error. Throttling and server errors stay
/// retryable; other client errors are the caller's fault.
pub(crate) fn status_error(status: StatusCode, body: &str, what: &str) -> CandelaError {
    if status == StatusCode::NOT_FOUND {
        return CandelaError::not_found(what.to_string());
    }
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return CandelaError::connector(NAME, format!("HTTP {status}: {body}"));
    }
    if status == StatusCode::UNAUTHORIZED {
        return CandelaError::connector(NAME, format!("unauthorized: {body}"));
    }
    CandelaError::InvalidArg(format!("{what}: HTTP {status}: {body}"))
}
