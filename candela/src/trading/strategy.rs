//! Strategy trait, decisions and the name → strategy registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use candela_core::CandelaError;

use crate::Candela;

/// What a strategy wants done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Spend part of the quote balance on the asset.
    Buy,
    /// Sell part of the asset balance.
    Sell,
    /// Do nothing this round.
    Hold,
}

/// Output of one strategy evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Market code, e.g. `KRW-BTC`.
    pub ticker: String,
    /// Buy, sell or hold.
    pub action: Action,
    /// Share of the available balance to commit, in `(0, 1]`.
    pub fraction: Decimal,
    /// Limit price; `None` means a market order.
    pub price: Option<Decimal>,
}

impl Decision {
    /// No order this round.
    pub fn hold(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            action: Action::Hold,
            fraction: Decimal::ZERO,
            price: None,
        }
    }

    /// Market buy with `fraction` of the quote balance.
    pub fn buy(ticker: impl Into<String>, fraction: Decimal) -> Self {
        Self {
            ticker: ticker.into(),
            action: Action::Buy,
            fraction,
            price: None,
        }
    }

    /// Market sell of `fraction` of the asset balance.
    pub fn sell(ticker: impl Into<String>, fraction: Decimal) -> Self {
        Self {
            ticker: ticker.into(),
            action: Action::Sell,
            fraction,
            price: None,
        }
    }

    /// Turn the order into a limit order at `price`.
    #[must_use]
    pub fn at_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    /// Check the fraction and price of a buy or sell.
    ///
    /// # Errors
    /// `InvalidArg` when the fraction is outside `(0, 1]` or the price is not positive.
    pub fn validate(&self) -> Result<(), CandelaError> {
        if self.action == Action::Hold {
            return Ok(());
        }
        if self.fraction <= Decimal::ZERO || self.fraction > Decimal::ONE {
            return Err(CandelaError::InvalidArg(format!(
                "{:?} fraction {} for {} outside (0, 1]",
                self.action, self.fraction, self.ticker
            )));
        }
        if self.price.is_some_and(|p| p <= Decimal::ZERO) {
            return Err(CandelaError::InvalidArg(format!(
                "non-positive limit price for {}",
                self.ticker
            )));
        }
        Ok(())
    }
}

/// Inputs available to a strategy when it runs.
pub struct StrategyContext<'a> {
    /// Evaluation time.
    pub now: DateTime<Utc>,
    /// Market the job trades on, e.g. `upbit`.
    pub market: &'a str,
    /// Quote amount allotted to the job.
    pub budget: Decimal,
    /// Orchestrator for reading stored series or fetching fresh ones.
    pub candela: &'a Candela,
}

/// A trading strategy producing one decision per run.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Registry name, as used in the job config.
    fn name(&self) -> &str;

    /// Decide what to do now.
    async fn evaluate(&self, ctx: &StrategyContext<'_>) -> Result<Decision, CandelaError>;
}

/// Strategies addressable by name.
#[derive(Default, Clone)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `strategy` under its own name.
    ///
    /// # Errors
    /// `InvalidArg` when the name is blank or already taken.
    pub fn register(&mut self, strategy: Arc<dyn Strategy>) -> Result<(), CandelaError> {
        let name = strategy.name().to_string();
        if name.trim().is_empty() {
            return Err(CandelaError::InvalidArg("empty strategy name".into()));
        }
        if self.strategies.contains_key(&name) {
            return Err(CandelaError::InvalidArg(format!(
                "strategy '{name}' registered twice"
            )));
        }
        self.strategies.insert(name, strategy);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    ///
    /// # Errors
    /// See [`register`](Self::register).
    pub fn with(mut self, strategy: Arc<dyn Strategy>) -> Result<Self, CandelaError> {
        self.register(strategy)?;
        Ok(self)
    }

    /// Strategy registered as `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Strategy>> {
        self.strategies.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(String::as_str)
    }

    /// Number of registered strategies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
