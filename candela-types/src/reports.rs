//! Report envelopes produced by the engine and orchestrator.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CandelaError, SeriesKey};

/// Outcome of a gap-filling pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FillReport {
    /// Timestamps synthesized by carry-forward.
    pub filled: Vec<DateTime<Utc>>,
    /// Timestamps recovered from the source.
    pub refetched: Vec<DateTime<Utc>>,
    /// Timestamps with no anchor candle; still absent from the series.
    pub missing_unfilled: Vec<DateTime<Utc>>,
    /// Non-fatal issues, e.g. failed point fetches that fell back.
    pub warnings: Vec<CandelaError>,
}

impl FillReport {
    /// True when every detected gap was repaired.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_unfilled.is_empty()
    }

    /// Total rows added to the series.
    #[must_use]
    pub fn rows_added(&self) -> usize {
        self.filled.len() + self.refetched.len()
    }

    /// Fold another report into this one.
    pub fn absorb(&mut self, other: Self) {
        self.filled.extend(other.filled);
        self.refetched.extend(other.refetched);
        self.missing_unfilled.extend(other.missing_unfilled);
        self.warnings.extend(other.warnings);
    }
}

/// Row accounting for one newer-wins merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MergeStats {
    /// Rows whose timestamp was not in the existing series.
    pub inserted: usize,
    /// Existing rows overwritten by the newer fetch.
    pub replaced: usize,
    /// Existing rows outside the newer fetch, kept as-is.
    pub preserved: usize,
}

impl MergeStats {
    /// Fold a later merge's counts into this one; `preserved` tracks the latest merge.
    pub fn absorb(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.replaced += other.replaced;
        self.preserved = other.preserved;
    }
}

/// Summary of one backfill of a single series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillReport {
    /// Series that was updated.
    pub key: SeriesKey,
    /// Pages fetched from the source.
    pub pages: usize,
    /// Rows returned by the source (after range filtering).
    pub rows_fetched: usize,
    /// Number of checkpoint merges persisted.
    pub checkpoints: usize,
    /// Cumulative merge accounting.
    pub merge: MergeStats,
    /// Gap-filling outcome across all checkpoints.
    pub fill: FillReport,
    /// Rows in the store after the last persist.
    pub store_rows: usize,
}

/// Summary of a multi-series download.
///
/// Successful backfills are reported individually; failed series are keyed
/// by their `SeriesKey` display string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DownloadReport {
    /// Completed backfills.
    pub completed: Vec<BackfillReport>,
    /// Series that failed, with their error.
    pub failed: BTreeMap<String, CandelaError>,
}

impl DownloadReport {
    /// True when no series failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}
