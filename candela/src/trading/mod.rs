//! Scheduled trading on top of the stored series.
//!
//! Strategies are registered by name in a [`StrategyRegistry`]; a job list
//! (see [`parse_jobs`]) says which strategy runs when, on which market and
//! with what budget. The [`TradingRunner`] evaluates due jobs and hands each
//! [`Decision`] to the market's [`OrderExecutor`], which sizes the order from
//! the account balance and submits it through an [`OrderProvider`].
//!
//! [`OrderProvider`]: candela_core::OrderProvider

mod config;
mod executor;
mod ma_cross;
mod runner;
mod schedule;
mod strategy;

pub use config::{JobConfig, load_jobs, parse_jobs};
pub use executor::{DEFAULT_FEE_FACTOR, OrderExecutor, split_market};
pub use ma_cross::MovingAverageCross;
pub use runner::{DEFAULT_POLL, JobOutcome, TradingRunner};
pub use schedule::{Cycle, Schedule};
pub use strategy::{Action, Decision, Strategy, StrategyContext, StrategyRegistry};
