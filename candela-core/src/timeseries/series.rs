use std::collections::BTreeMap;
use std::collections::btree_map;
use std::ops::RangeBounds;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use candela_types::Candle;

/// An OHLCV series keyed by timestamp.
///
/// Timestamps are unique and iteration is strictly ascending. Building a
/// series from rows with duplicate timestamps keeps the row seen last.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Candle>", into = "Vec<Candle>")]
pub struct TimeSeries {
    rows: BTreeMap<DateTime<Utc>, Candle>,
}

impl TimeSeries {
    /// An empty series.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the series has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Oldest row.
    #[must_use]
    pub fn first(&self) -> Option<&Candle> {
        self.rows.values().next()
    }

    /// Newest row.
    #[must_use]
    pub fn last(&self) -> Option<&Candle> {
        self.rows.values().next_back()
    }

    /// Row starting exactly at `ts`.
    #[must_use]
    pub fn get(&self, ts: &DateTime<Utc>) -> Option<&Candle> {
        self.rows.get(ts)
    }

    /// Whether a row starts exactly at `ts`.
    #[must_use]
    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        self.rows.contains_key(ts)
    }

    /// Latest row at or before `ts`.
    #[must_use]
    pub fn last_at_or_before(&self, ts: DateTime<Utc>) -> Option<&Candle> {
        self.rows.range(..=ts).next_back().map(|(_, c)| c)
    }

    /// Insert or replace the row at `candle.ts`, returning the replaced row.
    pub fn insert(&mut self, candle: Candle) -> Option<Candle> {
        self.rows.insert(candle.ts, candle)
    }

    /// Remove the row at `ts`.
    pub fn remove(&mut self, ts: &DateTime<Utc>) -> Option<Candle> {
        self.rows.remove(ts)
    }

    /// Rows in ascending order.
    pub fn iter(&self) -> btree_map::Values<'_, DateTime<Utc>, Candle> {
        self.rows.values()
    }

    /// Timestamps in ascending order.
    pub fn timestamps(&self) -> btree_map::Keys<'_, DateTime<Utc>, Candle> {
        self.rows.keys()
    }

    /// Rows whose timestamp falls in `range`, ascending.
    pub fn range<R>(&self, range: R) -> impl DoubleEndedIterator<Item = &Candle>
    where
        R: RangeBounds<DateTime<Utc>>,
    {
        self.rows.range(range).map(|(_, c)| c)
    }

    /// Keep only rows with `start <= ts < end`.
    pub fn retain_range(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.rows.retain(|ts, _| *ts >= start && *ts < end);
    }

    /// True when any row carries an adjusted close.
    #[must_use]
    pub fn has_adjclose(&self) -> bool {
        self.rows.values().any(|c| c.adjclose.is_some())
    }

    /// Consume the series into ascending rows.
    #[must_use]
    pub fn into_vec(self) -> Vec<Candle> {
        self.rows.into_values().collect()
    }

    pub(crate) fn into_rows(self) -> BTreeMap<DateTime<Utc>, Candle> {
        self.rows
    }

    pub(crate) const fn from_rows(rows: BTreeMap<DateTime<Utc>, Candle>) -> Self {
        Self { rows }
    }
}

impl FromIterator<Candle> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = Candle>>(iter: I) -> Self {
        let mut s = Self::new();
        s.extend(iter);
        s
    }
}

impl Extend<Candle> for TimeSeries {
    fn extend<I: IntoIterator<Item = Candle>>(&mut self, iter: I) {
        for c in iter {
            self.rows.insert(c.ts, c);
        }
    }
}

impl From<Vec<Candle>> for TimeSeries {
    fn from(rows: Vec<Candle>) -> Self {
        rows.into_iter().collect()
    }
}

impl From<TimeSeries> for Vec<Candle> {
    fn from(s: TimeSeries) -> Self {
        s.into_vec()
    }
}

impl IntoIterator for TimeSeries {
    type Item = Candle;
    type IntoIter = btree_map::IntoValues<DateTime<Utc>, Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_values()
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = &'a Candle;
    type IntoIter = btree_map::Values<'a, DateTime<Utc>, Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.values()
    }
}
