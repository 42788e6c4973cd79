//! Configuration types shared across the orchestrator and connectors.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How expected-but-missing candles are synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub enum FillPolicy {
    /// Repeat the last known close with zero volume. Works offline.
    #[default]
    CarryForward,
    /// Ask the source for the exact missing candle, falling back to
    /// carry-forward for rows the source cannot provide.
    Refetch,
}

/// On-disk encoding of a persisted series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub enum StoreFormat {
    /// Compact binary envelope (`.bin`).
    #[default]
    Binary,
    /// Plain CSV with a header row (`.csv`).
    Csv,
}

impl StoreFormat {
    /// File extension without the leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Binary => "bin",
            Self::Csv => "csv",
        }
    }
}

/// Exponential backoff configuration for retrying failed page requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Minimum backoff delay in milliseconds.
    pub min_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds.
    pub max_backoff_ms: u64,
    /// Exponential factor to increase delay after each failure (>= 1).
    pub factor: u32,
    /// Random jitter percentage [0, 100] added to each delay.
    pub jitter_percent: u8,
}

impl BackoffConfig {
    /// Base delay before retry number `attempt` (0-based), without jitter.
    #[must_use]
    pub fn base_delay_ms(&self, attempt: u32) -> u64 {
        let factor = u64::from(self.factor.max(1));
        let mut delay = self.min_backoff_ms;
        for _ in 0..attempt {
            delay = delay.saturating_mul(factor);
            if delay >= self.max_backoff_ms {
                return self.max_backoff_ms;
            }
        }
        delay.min(self.max_backoff_ms)
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_backoff_ms: 500,
            max_backoff_ms: 30_000,
            factor: 2,
            jitter_percent: 20,
        }
    }
}

/// Settings for the paginated historical fetch loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Minimum spacing between consecutive page requests. The effective
    /// delay is the larger of this and the source's own minimum.
    pub page_delay: Duration,
    /// Timeout for a single page request.
    pub page_timeout: Duration,
    /// Retries per page after the first attempt.
    pub max_retries: u32,
    /// Backoff applied between retries of the same page.
    pub backoff: BackoffConfig,
    /// Optional overall deadline for one backfill.
    pub deadline: Option<Duration>,
    /// Merge and persist after this many pages. `None` merges once at the end.
    pub checkpoint_pages: Option<usize>,
    /// Hard cap on pages per backfill.
    pub max_pages: Option<usize>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_delay: Duration::from_millis(100),
            page_timeout: Duration::from_secs(10),
            max_retries: 3,
            backoff: BackoffConfig::default(),
            deadline: None,
            checkpoint_pages: Some(50),
            max_pages: None,
        }
    }
}

/// Global configuration for the `Candela` orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandelaConfig {
    /// Pagination, retry and deadline settings.
    pub fetch: FetchConfig,
    /// Whether backfills fill gaps before merging.
    pub fill_gaps: bool,
    /// Gap-filling policy when `fill_gaps` is set.
    pub fill_policy: FillPolicy,
    /// Encoding for persisted series.
    pub store_format: StoreFormat,
    /// Maximum number of series downloaded concurrently.
    pub concurrency: usize,
}

impl Default for CandelaConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            fill_gaps: true,
            fill_policy: FillPolicy::default(),
            store_format: StoreFormat::default(),
            concurrency: 4,
        }
    }
}
