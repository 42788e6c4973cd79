//! File-backed series store.
//!
//! One file per [`SeriesKey`], named `{ticker}_{interval}_ohlcv_{source}.{ext}`.
//! Writes go to a temporary file in the store directory which is synced and
//! renamed over the target, so readers see either the old or the new file.
//! A missing file loads as an empty series; a file that exists but cannot be
//! decoded is reported as `StoreCorrupt` and is never overwritten.

mod binary;
mod csv;
mod locks;

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use candela_core::{CandelaError, SeriesKey, StoreFormat, TimeSeries};

pub use locks::KeyedLocks;

/// Directory of persisted series in one encoding.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    format: StoreFormat,
}

impl FileStore {
    /// Store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>, format: StoreFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    /// Root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Encoding used for new writes.
    #[must_use]
    pub const fn format(&self) -> StoreFormat {
        self.format
    }

    /// File holding `key`.
    #[must_use]
    pub fn path(&self, key: &SeriesKey) -> PathBuf {
        self.dir
            .join(format!("{}.{}", key.file_stem(), self.format.extension()))
    }

    /// Load the series for `key`, empty when nothing was stored yet.
    ///
    /// # Errors
    /// `StoreCorrupt` when the file cannot be decoded, `Io` on read failures.
    pub fn load(&self, key: &SeriesKey) -> Result<TimeSeries, CandelaError> {
        let path = self.path(key);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(TimeSeries::new()),
            Err(e) => return Err(e.into()),
        };
        let decoded = match self.format {
            StoreFormat::Binary => binary::decode(&bytes, key),
            StoreFormat::Csv => csv::decode(&bytes),
            other => Err(format!("unsupported store format {other:?}")),
        };
        decoded.map_err(|msg| CandelaError::store_corrupt(path.display().to_string(), msg))
    }

    /// Atomically replace the stored series for `key`.
    ///
    /// # Errors
    /// `Io` when the temporary file cannot be written, synced or renamed;
    /// the previous file is left untouched in that case.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela::store::persist",
            skip(self, series),
            fields(key = %key, rows = series.len()),
        )
    )]
    pub fn persist(&self, key: &SeriesKey, series: &TimeSeries) -> Result<(), CandelaError> {
        fs::create_dir_all(&self.dir)?;
        let target = self.path(key);
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}.", key.file_stem()))
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;
        {
            let mut w = BufWriter::new(tmp.as_file_mut());
            match self.format {
                StoreFormat::Binary => binary::encode(&mut w, key, series)?,
                StoreFormat::Csv => csv::encode(&mut w, series)?,
                other => {
                    return Err(CandelaError::unsupported(format!("store format {other:?}")));
                }
            }
            w.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| CandelaError::from(e.error))?;
        #[cfg(feature = "tracing")]
        tracing::debug!(path = %target.display(), "series persisted");
        Ok(())
    }
}
