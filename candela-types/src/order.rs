//! Order request and acknowledgement types for exchange account APIs.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::CandelaError;

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Buy the base asset.
    Buy,
    /// Sell the base asset.
    Sell,
}

/// Limit or market execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Rest at `price` for `volume` units.
    Limit,
    /// Execute immediately. Market buys are sized in quote currency
    /// (`price`), market sells in base units (`volume`).
    Market,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        })
    }
}

/// A single order to submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Exchange market code, e.g. `KRW-BTC`.
    pub ticker: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Limit or market.
    pub order_type: OrderType,
    /// Base-asset quantity.
    pub volume: Option<Decimal>,
    /// Unit price for limit orders, total spend for market buys.
    pub price: Option<Decimal>,
}

impl OrderRequest {
    /// Limit order for `volume` units at `price`.
    pub fn limit(ticker: impl Into<String>, side: OrderSide, volume: Decimal, price: Decimal) -> Self {
        Self {
            ticker: ticker.into(),
            side,
            order_type: OrderType::Limit,
            volume: Some(volume),
            price: Some(price),
        }
    }

    /// Market buy spending `total` of the quote currency.
    pub fn market_buy(ticker: impl Into<String>, total: Decimal) -> Self {
        Self {
            ticker: ticker.into(),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            volume: None,
            price: Some(total),
        }
    }

    /// Market sell of `volume` base units.
    pub fn market_sell(ticker: impl Into<String>, volume: Decimal) -> Self {
        Self {
            ticker: ticker.into(),
            side: OrderSide::Sell,
            order_type: OrderType::Market,
            volume: Some(volume),
            price: None,
        }
    }

    /// Check that the populated fields match the side and order type.
    ///
    /// # Errors
    /// Returns `InvalidArg` for missing, extra or non-positive amounts.
    pub fn validate(&self) -> Result<(), CandelaError> {
        let positive = |v: Option<Decimal>| v.is_some_and(|d| d > Decimal::ZERO);
        let ok = match (self.order_type, self.side) {
            (OrderType::Limit, _) => positive(self.volume) && positive(self.price),
            (OrderType::Market, OrderSide::Buy) => positive(self.price) && self.volume.is_none(),
            (OrderType::Market, OrderSide::Sell) => positive(self.volume) && self.price.is_none(),
        };
        if ok {
            Ok(())
        } else {
            Err(CandelaError::InvalidArg(format!(
                "malformed {:?} {} order for {}: volume={:?} price={:?}",
                self.order_type, self.side, self.ticker, self.volume, self.price
            )))
        }
    }
}

/// Exchange acknowledgement of a submitted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    /// Exchange-assigned order id.
    pub id: String,
    /// Market code echoed by the exchange.
    pub ticker: String,
    /// Side echoed by the exchange.
    pub side: OrderSide,
    /// Exchange order state, e.g. `wait` or `done`.
    pub state: String,
}
