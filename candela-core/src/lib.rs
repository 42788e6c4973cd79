//! candela-core
//!
//! Core traits and the time-series engine shared across the candela workspace.
//!
//! - `connector`: the `CandleConnector` trait and capability provider traits.
//! - `middleware`: the `Middleware` trait for connector wrappers.
//! - `timeseries`: the `TimeSeries` container, gap detection, gap filling
//!   and the newer-wins merge.
//!
//! Everything in `timeseries` is a pure transformation: each stage takes a
//! series and returns a new one, so fetch, fill and merge can be chained
//! without shared mutable state.
#![warn(missing_docs)]

/// Connector capability traits and the primary `CandleConnector` interface.
pub mod connector;
/// Middleware trait implemented by connector wrappers.
pub mod middleware;
/// Time-series utilities for gap repair and merging.
pub mod timeseries;

pub use candela_types::*;
pub use connector::{
    CandleConnector, HistoryProvider, OrderProvider, PageCursor, PageDirection, Pagination,
    PointProvider, SymbolProvider,
};
pub use middleware::Middleware;
pub use timeseries::TimeSeries;
pub use timeseries::fill::{Filled, carry_forward, fill_carry_forward, fill_with_refetch};
pub use timeseries::gaps::{GapSet, detect, detect_in};
pub use timeseries::infer::{estimate_step_seconds, infer_cadence, interval_for, resolve_cadence};
pub use timeseries::merge::merge_newer_wins;
pub use timeseries::util::{normalize_rows, validate_candle};
