//! candela-middleware
//!
//! Re-exports for middleware wrappers.

mod throttle;

pub use crate::throttle::{ThrottleMiddleware, ThrottledConnector};
