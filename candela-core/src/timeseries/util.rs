//! Shared helpers for normalizing upstream candles.

use candela_types::{CandelaError, Candle};
use rust_decimal::Decimal;

use super::TimeSeries;

/// Ensure a candle from an upstream source is internally consistent.
///
/// # Errors
/// Returns `Err(CandelaError::Data)` for negative prices or volume, or when
/// `high` is below `low`.
pub fn validate_candle(c: &Candle) -> Result<(), CandelaError> {
    if c.volume < Decimal::ZERO {
        return Err(CandelaError::Data(format!("negative volume at {}", c.ts)));
    }
    if [c.open, c.high, c.low, c.close].iter().any(|p| *p < Decimal::ZERO) {
        return Err(CandelaError::Data(format!("negative price at {}", c.ts)));
    }
    if c.high < c.low {
        return Err(CandelaError::Data(format!(
            "high {} below low {} at {}",
            c.high, c.low, c.ts
        )));
    }
    Ok(())
}

/// Validate raw page rows and collect them into an ascending series.
///
/// # Errors
/// Returns the first validation failure.
pub fn normalize_rows(rows: Vec<Candle>) -> Result<TimeSeries, CandelaError> {
    rows.iter().try_for_each(validate_candle)?;
    Ok(rows.into_iter().collect())
}
