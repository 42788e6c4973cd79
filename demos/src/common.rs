use std::sync::Arc;

use candela_core::{CandelaError, CandleConnector};
use tracing_subscriber::EnvFilter;

/// Set to run the demos against the fixture mock instead of the network.
pub const USE_MOCK_ENV: &str = "CANDELA_DEMOS_USE_MOCK";

/// Install a human-friendly subscriber filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// The connector built by `make`, or the fixture mock when
/// `CANDELA_DEMOS_USE_MOCK` is set.
///
/// # Errors
/// Propagates connector construction failures.
pub fn connector_or_mock<C, F>(make: F) -> Result<Arc<dyn CandleConnector>, CandelaError>
where
    C: CandleConnector + 'static,
    F: FnOnce() -> Result<C, CandelaError>,
{
    if std::env::var_os(USE_MOCK_ENV).is_some() {
        println!("--- (using mock connector) ---");
        return Ok(Arc::new(candela_mock::MockConnector::new()));
    }
    Ok(Arc::new(make()?))
}
