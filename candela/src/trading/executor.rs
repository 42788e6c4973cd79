//! Turns a [`Decision`] into an exchange order.

use std::sync::Arc;

use rust_decimal::Decimal;

use candela_core::{CandelaError, OrderAck, OrderProvider, OrderRequest, OrderSide};

use super::strategy::{Action, Decision};

/// Share of a buy that reaches the order after exchange fees (0.05 %).
pub const DEFAULT_FEE_FACTOR: Decimal = Decimal::from_parts(9995, 0, 0, false, 4);

/// Split `QUOTE-ASSET` into its currencies.
///
/// # Errors
/// `InvalidArg` when the market code has no `-` separator.
pub fn split_market(ticker: &str) -> Result<(&str, &str), CandelaError> {
    match ticker.split_once('-') {
        Some((quote, asset)) if !quote.is_empty() && !asset.is_empty() => Ok((quote, asset)),
        _ => Err(CandelaError::InvalidArg(format!(
            "market code {ticker} is not QUOTE-ASSET"
        ))),
    }
}

/// Sizes and submits orders through an exchange account.
#[derive(Clone)]
pub struct OrderExecutor {
    orders: Arc<dyn OrderProvider>,
    fee_factor: Decimal,
}

impl OrderExecutor {
    /// Executor over `orders` with the default fee allowance.
    pub fn new(orders: Arc<dyn OrderProvider>) -> Self {
        Self {
            orders,
            fee_factor: DEFAULT_FEE_FACTOR,
        }
    }

    /// Override the share of a buy left after fees.
    #[must_use]
    pub const fn with_fee_factor(mut self, fee_factor: Decimal) -> Self {
        self.fee_factor = fee_factor;
        self
    }

    /// Build the order `decision` calls for, or `None` for a hold.
    ///
    /// Buys spend `fraction` of the quote balance (capped at `budget` when
    /// given) scaled by the fee factor; limit buys convert that spend into a
    /// volume at the limit price. Sells commit `fraction` of the asset balance.
    ///
    /// # Errors
    /// `InvalidArg` for a malformed decision, `Order` when there is nothing to
    /// spend or sell, or the balance lookup error.
    pub async fn plan(
        &self,
        decision: &Decision,
        budget: Option<Decimal>,
    ) -> Result<Option<OrderRequest>, CandelaError> {
        decision.validate()?;
        let (quote, asset) = split_market(&decision.ticker)?;
        let ticker = decision.ticker.as_str();
        let req = match decision.action {
            Action::Hold => return Ok(None),
            Action::Buy => {
                let mut available = self.orders.balance(quote).await?;
                if let Some(cap) = budget.filter(|b| *b > Decimal::ZERO) {
                    available = available.min(cap);
                }
                let spend = available * decision.fraction * self.fee_factor;
                if spend <= Decimal::ZERO {
                    return Err(CandelaError::Order(format!(
                        "no {quote} balance to buy {ticker}"
                    )));
                }
                match decision.price {
                    Some(price) => OrderRequest::limit(ticker, OrderSide::Buy, spend / price, price),
                    None => OrderRequest::market_buy(ticker, spend),
                }
            }
            Action::Sell => {
                let volume = self.orders.balance(asset).await? * decision.fraction;
                if volume <= Decimal::ZERO {
                    return Err(CandelaError::Order(format!(
                        "no {asset} balance to sell on {ticker}"
                    )));
                }
                match decision.price {
                    Some(price) => OrderRequest::limit(ticker, OrderSide::Sell, volume, price),
                    None => OrderRequest::market_sell(ticker, volume),
                }
            }
        };
        Ok(Some(req))
    }

    /// Plan and submit the order for `decision`.
    ///
    /// # Errors
    /// See [`plan`](Self::plan); submission failures come back as reported by the exchange.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela::trading::execute",
            skip(self, decision, budget),
            fields(ticker = %decision.ticker, action = ?decision.action),
        )
    )]
    pub async fn execute(
        &self,
        decision: &Decision,
        budget: Option<Decimal>,
    ) -> Result<Option<OrderAck>, CandelaError> {
        let Some(req) = self.plan(decision, budget).await? else {
            return Ok(None);
        };
        let ack = self.orders.submit_order(&req).await?;
        #[cfg(feature = "tracing")]
        tracing::info!(id = %ack.id, state = %ack.state, "order accepted");
        Ok(Some(ack))
    }
}
