//! Time-series engine shared by connectors and orchestrator.
//!
//! Modules include:
//! - `series`: the ordered, de-duplicated candle container
//! - `infer`: cadence inference from timestamps
//! - `gaps`: detection of expected-but-missing timestamps
//! - `fill`: carry-forward and refetch gap filling
//! - `merge`: newer-wins merge into a stored series
/// Gap filling policies.
pub mod fill;
/// Gap detection against an expected cadence grid.
pub mod gaps;
/// Cadence inference helpers.
pub mod infer;
/// Newer-wins merge.
pub mod merge;
mod series;
/// Candle validation and page normalization.
pub mod util;

pub use series::TimeSeries;
