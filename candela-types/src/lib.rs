//! Candle, interval, error and configuration types shared by every candela crate.
#![warn(missing_docs)]

mod candle;
mod config;
mod connector;
mod error;
mod interval;
mod order;
mod reports;

pub use candle::Candle;
pub use config::{BackoffConfig, CandelaConfig, FetchConfig, FillPolicy, StoreFormat};
pub use connector::{SeriesKey, SourceKey};
pub use error::CandelaError;
pub use interval::{Cadence, Interval};
pub use order::{OrderAck, OrderRequest, OrderSide, OrderType};
pub use reports::{BackfillReport, DownloadReport, FillReport, MergeStats};

pub use rust_decimal::Decimal;
