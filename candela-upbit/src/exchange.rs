use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;

use candela_core::connector::{CandleConnector, OrderProvider};
use candela_core::{CandelaError, OrderAck, OrderRequest, OrderSide, OrderType};

use crate::auth::Credentials;
use crate::client::{DEFAULT_BASE_URL, UpbitClient, get_json};

/// Decimal places Upbit accepts for order volume.
const VOLUME_SCALE: u32 = 8;

/// Account-scoped Upbit client that submits orders and reads balances.
///
/// Holds its own credentials; nothing is read from process-wide state after
/// construction.
pub struct UpbitExchange {
    client: UpbitClient,
    creds: Credentials,
}

impl UpbitExchange {
    /// Exchange client against the public API.
    ///
    /// # Errors
    /// Propagates client construction failures.
    pub fn new(creds: Credentials) -> Result<Self, CandelaError> {
        Self::with_base_url(creds, DEFAULT_BASE_URL)
    }

    /// Exchange client against another origin (tests, proxies).
    ///
    /// # Errors
    /// Returns `InvalidArg` when `base` is not an absolute URL.
    pub fn with_base_url(creds: Credentials, base: &str) -> Result<Self, CandelaError> {
        Ok(Self {
            client: UpbitClient::new(reqwest::Client::new(), base)?,
            creds,
        })
    }

    /// Request parameters for an order, keyed in the order they are signed.
    ///
    /// Market buys are sent as `ord_type=price` with the total spend, market
    /// sells as `ord_type=market` with the volume.
    ///
    /// # Errors
    /// Returns `InvalidArg` when the request fails validation.
    pub fn order_params(req: &OrderRequest) -> Result<BTreeMap<&'static str, String>, CandelaError> {
        req.validate()?;
        let mut params = BTreeMap::new();
        params.insert("market", req.ticker.clone());
        params.insert(
            "side",
            match req.side {
                OrderSide::Buy => "bid",
                OrderSide::Sell => "ask",
            }
            .to_string(),
        );
        let ord_type = match (req.order_type, req.side) {
            (OrderType::Limit, _) => "limit",
            (OrderType::Market, OrderSide::Buy) => "price",
            (OrderType::Market, OrderSide::Sell) => "market",
        };
        params.insert("ord_type", ord_type.to_string());
        if let Some(price) = req.price {
            params.insert("price", price.normalize().to_string());
        }
        if let Some(volume) = req.volume {
            let volume = volume.round_dp_with_strategy(VOLUME_SCALE, RoundingStrategy::ToZero);
            if volume.is_zero() {
                return Err(CandelaError::InvalidArg(format!(
                    "volume rounds to zero for {}",
                    req.ticker
                )));
            }
            params.insert("volume", volume.normalize().to_string());
        }
        Ok(params)
    }

    /// Orders on `market` that are still waiting to fill, newest first.
    ///
    /// # Errors
    /// Transport, authorization and decoding failures.
    pub async fn open_orders(&self, market: &str) -> Result<Vec<OrderAck>, CandelaError> {
        let mut params = BTreeMap::new();
        params.insert("market", market.to_string());
        params.insert("state", "wait".to_string());
        let auth = self.creds.authorization(&encode_query(&params))?;
        let mut url = self.client.endpoint("/v1/orders")?;
        for (k, v) in &params {
            url.query_pairs_mut().append_pair(k, v);
        }
        let rows: Vec<RawOrder> = get_json(
            self.client.http().get(url).header(AUTHORIZATION, auth),
            &format!("open orders on {market}"),
        )
        .await?;
        rows.into_iter().map(RawOrder::into_ack).collect()
    }

    /// Cancel the order identified by `uuid`.
    ///
    /// # Errors
    /// `NotFound` for an unknown order, `Order` when the exchange refuses the
    /// cancellation (for example because the order already filled).
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "candela_upbit::cancel_order", skip(self), fields(uuid = %uuid))
    )]
    pub async fn cancel_order(&self, uuid: &str) -> Result<OrderAck, CandelaError> {
        let mut params = BTreeMap::new();
        params.insert("uuid", uuid.to_string());
        let auth = self.creds.authorization(&encode_query(&params))?;
        let mut url = self.client.endpoint("/v1/order")?;
        for (k, v) in &params {
            url.query_pairs_mut().append_pair(k, v);
        }
        let raw: RawOrder = get_json(
            self.client.http().delete(url).header(AUTHORIZATION, auth),
            &format!("order {uuid}"),
        )
        .await
        .map_err(order_rejected)?;
        #[cfg(feature = "tracing")]
        tracing::info!(state = %raw.state, "order cancel requested");
        raw.into_ack()
    }
}

/// Unescaped `k=v&...` string the query hash is computed over.
fn encode_query(params: &BTreeMap<&'static str, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[derive(Deserialize)]
struct RawOrder {
    uuid: String,
    side: String,
    market: String,
    state: String,
}

impl RawOrder {
    fn into_ack(self) -> Result<OrderAck, CandelaError> {
        let side = match self.side.as_str() {
            "bid" => OrderSide::Buy,
            "ask" => OrderSide::Sell,
            other => return Err(CandelaError::Data(format!("unknown order side {other}"))),
        };
        Ok(OrderAck {
            id: self.uuid,
            ticker: self.market,
            side,
            state: self.state,
        })
    }
}

#[derive(Deserialize)]
struct RawAccount {
    currency: String,
    balance: String,
}

fn order_rejected(e: CandelaError) -> CandelaError {
    match e {
        CandelaError::InvalidArg(msg) => CandelaError::Order(msg),
        other => other,
    }
}

impl CandleConnector for UpbitExchange {
    fn name(&self) -> &'static str {
        "candela-upbit-exchange"
    }

    fn label(&self) -> &'static str {
        "upbit"
    }

    fn as_order_provider(&self) -> Option<&dyn OrderProvider> {
        Some(self as &dyn OrderProvider)
    }
}

#[async_trait]
impl OrderProvider for UpbitExchange {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela_upbit::submit_order",
            skip(self, req),
            fields(ticker = %req.ticker, side = %req.side),
        )
    )]
    async fn submit_order(&self, req: &OrderRequest) -> Result<OrderAck, CandelaError> {
        let params = Self::order_params(req)?;
        let auth = self.creds.authorization(&encode_query(&params))?;
        let url = self.client.endpoint("/v1/orders")?;
        let raw: RawOrder = get_json(
            self.client
                .http()
                .post(url)
                .header(AUTHORIZATION, auth)
                .json(&params),
            &format!("order on {}", req.ticker),
        )
        .await
        .map_err(order_rejected)?;

        #[cfg(feature = "tracing")]
        tracing::info!(id = %raw.uuid, state = %raw.state, "order accepted");
        raw.into_ack()
    }

    async fn balance(&self, currency: &str) -> Result<Decimal, CandelaError> {
        let auth = self.creds.authorization("")?;
        let url = self.client.endpoint("/v1/accounts")?;
        let accounts: Vec<RawAccount> = get_json(
            self.client.http().get(url).header(AUTHORIZATION, auth),
            "accounts",
        )
        .await?;
        accounts
            .into_iter()
            .find(|a| a.currency.eq_ignore_ascii_case(currency))
            .map_or(Ok(Decimal::ZERO), |a| {
                Decimal::from_str(&a.balance)
                    .map_err(|e| CandelaError::Data(format!("balance {:?}: {e}", a.balance)))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_buy_spends_price() {
        let req = OrderRequest::market_buy("KRW-BTC", Decimal::from(10_000));
        let params = UpbitExchange::order_params(&req).unwrap();
        assert_eq!(
            encode_query(&params),
            "market=KRW-BTC&ord_type=price&price=10000&side=bid"
        );
    }

    #[test]
    fn market_sell_truncates_volume() {
        let req = OrderRequest::market_sell("KRW-ETH", Decimal::from_str("0.123456789").unwrap());
        let params = UpbitExchange::order_params(&req).unwrap();
        assert_eq!(params["ord_type"], "market");
        assert_eq!(params["volume"], "0.12345678");
        assert!(!params.contains_key("price"));
    }

    #[test]
    fn limit_carries_both() {
        let req = OrderRequest::limit(
            "KRW-BTC",
            OrderSide::Sell,
            Decimal::from_str("0.5").unwrap(),
            Decimal::from(60_000_000),
        );
        let params = UpbitExchange::order_params(&req).unwrap();
        assert_eq!(params["side"], "ask");
        assert_eq!(params["ord_type"], "limit");
        assert_eq!(params["price"], "60000000");
    }

    #[test]
    fn dust_volume_is_rejected() {
        let req = OrderRequest::market_sell("KRW-BTC", Decimal::from_str("0.000000001").unwrap());
        assert!(UpbitExchange::order_params(&req).is_err());
    }
}
