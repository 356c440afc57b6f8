//! Bar and signal loading from CSV.
//!
//! One row per bar, signal alongside the bar it was computed on:
//!
//! ```text
//! timestamp,open,high,low,close,volume,signal
//! 2024-01-01T00:00:00Z,42000.0,42500.0,41800.0,42300.0,1250.5,1
//! ```
//!
//! Timestamps are RFC 3339 or plain `YYYY-MM-DD` dates (midnight UTC). Rows
//! are kept in file order; ordering problems are left for the pipeline to
//! report, so a loaded file replays exactly as written.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use quantpipe_core::domain::Bar;
use quantpipe_core::fingerprint::dataset_hash;
use quantpipe_core::signal::{Signal, SignalEvent, VecSignalSource};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open { path: PathBuf, source: csv::Error },

    #[error("row {row}: {source}")]
    Csv { row: usize, source: csv::Error },

    #[error("row {row}: unparseable timestamp '{value}'")]
    Timestamp { row: usize, value: String },

    #[error("row {row}: signal must be one of -1, 0, 1 (got {value})")]
    Signal { row: usize, value: i64 },

    #[error("no rows in input")]
    Empty,
}

/// Bars and their signals, index-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedData {
    pub bars: Vec<Bar>,
    pub signals: Vec<SignalEvent>,
    /// BLAKE3 over the bar series.
    pub dataset_hash: String,
}

impl LoadedData {
    pub fn new(bars: Vec<Bar>, signals: Vec<SignalEvent>) -> Self {
        let dataset_hash = dataset_hash(&bars);
        Self {
            bars,
            signals,
            dataset_hash,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn signal_source(&self) -> VecSignalSource {
        VecSignalSource::new(self.signals.clone())
    }
}

#[derive(Debug, Deserialize)]
struct Row {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
    signal: i64,
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Load bars and signals from a CSV file.
pub fn load_csv(path: &Path) -> Result<LoadedData, LoadError> {
    let reader = csv::Reader::from_path(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let data = read_rows(reader)?;
    info!(
        path = %path.display(),
        bars = data.len(),
        dataset_hash = %data.dataset_hash,
        "loaded bars"
    );
    Ok(data)
}

/// Load from any reader with a header row.
pub fn parse_csv<R: Read>(input: R) -> Result<LoadedData, LoadError> {
    read_rows(csv::Reader::from_reader(input))
}

fn read_rows<R: Read>(mut reader: csv::Reader<R>) -> Result<LoadedData, LoadError> {
    let mut bars = Vec::new();
    let mut signals = Vec::new();

    for (i, record) in reader.deserialize::<Row>().enumerate() {
        // Header is row 1
        let row = i + 2;
        let r = record.map_err(|source| LoadError::Csv { row, source })?;
        let timestamp = parse_timestamp(r.timestamp.trim()).ok_or_else(|| LoadError::Timestamp {
            row,
            value: r.timestamp.clone(),
        })?;
        let signal = Signal::try_from(r.signal).map_err(|e| LoadError::Signal { row, value: e.0 })?;

        bars.push(Bar::new(timestamp, r.open, r.high, r.low, r.close, r.volume));
        signals.push(SignalEvent::new(timestamp, signal));
    }

    if bars.is_empty() {
        return Err(LoadError::Empty);
    }
    debug!(rows = bars.len(), "parsed csv rows");
    Ok(LoadedData::new(bars, signals))
}
