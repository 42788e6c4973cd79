use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the candela workspace.
///
/// Covers the series-level conditions raised by the time-series engine
/// (too little data, unfillable gaps), upstream fetch failures carrying a
/// resume cursor, store corruption, and connector/trading failures.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CandelaError {
    /// The series is too short to determine its sampling period.
    #[error("insufficient data: {rows} row(s), need at least {required}")]
    InsufficientData {
        /// Number of rows available.
        rows: usize,
        /// Minimum number of rows required by the operation.
        required: usize,
    },

    /// The upstream source failed (unreachable or malformed) after retries.
    ///
    /// `resume_from` is the boundary of the last page that was fetched
    /// successfully, so a caller can resume the backfill from there.
    #[error("fetch from {source_name} failed: {msg}")]
    Fetch {
        /// Source that failed.
        source_name: String,
        /// Human-readable failure description.
        msg: String,
        /// Boundary of the last successful page, if any.
        resume_from: Option<DateTime<Utc>>,
    },

    /// A gap at the series boundary with no anchor candle to fill from.
    ///
    /// Reported inside fill results rather than returned as a hard error.
    #[error("unfillable gap at {ts}")]
    UnfillableGap {
        /// Missing timestamp.
        ts: DateTime<Utc>,
    },

    /// A persisted store exists but cannot be decoded.
    #[error("store {path} is corrupt: {msg}")]
    StoreCorrupt {
        /// Path of the offending store file.
        path: String,
        /// Decoder diagnostic.
        msg: String,
    },

    /// Filesystem failure while reading or writing a store.
    #[error("io error: {0}")]
    Io(String),

    /// Issues with the returned or expected data (missing fields, etc.).
    #[error("data issue: {0}")]
    Data(String),

    /// Invalid input argument.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// The requested capability is not implemented by the target connector.
    #[error("unsupported capability: {capability}")]
    Unsupported {
        /// A capability string describing what was requested (e.g. "history/1mo").
        capability: String,
    },

    /// An individual connector returned an error.
    #[error("{connector} failed: {msg}")]
    Connector {
        /// Connector name that failed.
        connector: String,
        /// Human-readable error message.
        msg: String,
    },

    /// A resource or symbol could not be found.
    #[error("not found: {what}")]
    NotFound {
        /// Description of missing resource, e.g. "candles for KRW-BTC".
        what: String,
    },

    /// An individual provider call exceeded the configured timeout.
    #[error("provider timed out: {capability} via {connector}")]
    ProviderTimeout {
        /// Connector name that timed out.
        connector: String,
        /// Capability label (e.g. "history", "point").
        capability: String,
    },

    /// The overall request exceeded the configured deadline.
    #[error("request timed out: {capability}")]
    RequestTimeout {
        /// Capability label for which the request timed out.
        capability: String,
    },

    /// The operation was cancelled by the caller.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// A trading strategy failed to produce a decision.
    #[error("strategy {name} failed: {msg}")]
    Strategy {
        /// Registered strategy name.
        name: String,
        /// Failure description.
        msg: String,
    },

    /// An order was rejected or could not be submitted.
    #[error("order failed: {0}")]
    Order(String),
}

impl CandelaError {
    /// Helper: build an `Unsupported` error for a capability string.
    #[must_use]
    pub fn unsupported(cap: impl Into<String>) -> Self {
        Self::Unsupported {
            capability: cap.into(),
        }
    }

    /// Helper: build a `Connector` error with the connector name and message.
    pub fn connector(connector: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Connector {
            connector: connector.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `NotFound` error for a description of the missing resource.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Helper: build a `ProviderTimeout` error.
    pub fn provider_timeout(connector: impl Into<String>, capability: impl Into<String>) -> Self {
        Self::ProviderTimeout {
            connector: connector.into(),
            capability: capability.into(),
        }
    }

    /// Helper: build a `RequestTimeout` error.
    #[must_use]
    pub fn request_timeout(capability: impl Into<String>) -> Self {
        Self::RequestTimeout {
            capability: capability.into(),
        }
    }

    /// Helper: build a `Fetch` error.
    pub fn fetch(
        source_name: impl Into<String>,
        msg: impl Into<String>,
        resume_from: Option<DateTime<Utc>>,
    ) -> Self {
        Self::Fetch {
            source_name: source_name.into(),
            msg: msg.into(),
            resume_from,
        }
    }

    /// Helper: build a `StoreCorrupt` error.
    pub fn store_corrupt(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::StoreCorrupt {
            path: path.into(),
            msg: msg.into(),
        }
    }

    /// Returns true if retrying the same request may succeed.
    ///
    /// Transport failures and timeouts are transient; capability, argument and
    /// not-found conditions are not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connector { .. } | Self::ProviderTimeout { .. } | Self::Data(_) | Self::Io(_)
        )
    }

    /// Returns true when the whole operation was stopped by cancellation or
    /// its overall deadline, as opposed to a single request failing.
    #[must_use]
    pub const fn is_interrupt(&self) -> bool {
        matches!(self, Self::Cancelled(_) | Self::RequestTimeout { .. })
    }
}

impl From<std::io::Error> for CandelaError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
