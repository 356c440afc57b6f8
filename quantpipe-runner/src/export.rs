//! Artifact export: CSV logs and JSON manifests for a finished run.
//!
//! A run directory holds:
//! - `trades.csv`: executed trades
//! - `equity.csv`: one row per equity point
//! - `attempts.json`: every candidate trade and its outcome
//! - `manifest.json`: summary, risk state and fingerprint
//!
//! The manifest carries a `schema_version`; newer versions are rejected on load.

use std::io::Read;
use std::path::{Path, PathBuf};

use quantpipe_core::domain::{EquityPoint, TradeAttempt, TradeRecord};
use quantpipe_core::fingerprint::RunFingerprint;
use quantpipe_core::performance::PerformanceSummary;
use quantpipe_core::risk::RiskState;
use quantpipe_core::{ExecutionFailure, RunResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Current schema version for persisted manifests.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported schema version {found} (max supported: {supported})")]
    SchemaVersion { found: u32, supported: u32 },

    #[error("csv output is not valid UTF-8")]
    Utf8,
}

/// Everything about a run except its per-bar logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub fingerprint: RunFingerprint,
    pub dataset_hash: Option<String>,
    pub summary: PerformanceSummary,
    pub risk: RiskState,
    pub final_position: f64,
    pub bars_processed: usize,
    pub close_out_failure: Option<ExecutionFailure>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl RunManifest {
    pub fn from_result(result: &RunResult, dataset_hash: Option<&str>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            fingerprint: result.fingerprint.clone(),
            dataset_hash: dataset_hash.map(str::to_string),
            summary: result.summary.clone(),
            risk: result.risk.clone(),
            final_position: result.final_position,
            bars_processed: result.bars_processed,
            close_out_failure: result.close_out_failure.clone(),
        }
    }
}

// ─── CSV ────────────────────────────────────────────────────────────

fn to_csv<T: Serialize>(rows: &[T]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in rows {
        wtr.serialize(row)?;
    }
    let data = wtr
        .into_inner()
        .map_err(|e| ExportError::Csv(csv::Error::from(e.into_error())))?;
    String::from_utf8(data).map_err(|_| ExportError::Utf8)
}

fn from_csv<T: for<'de> Deserialize<'de>, R: Read>(input: R) -> Result<Vec<T>, ExportError> {
    let mut rdr = csv::Reader::from_reader(input);
    let rows = rdr.deserialize().collect::<Result<Vec<T>, _>>()?;
    Ok(rows)
}

/// Trade log as CSV, one header row plus one row per trade.
pub fn trades_csv(trades: &[TradeRecord]) -> Result<String, ExportError> {
    to_csv(trades)
}

pub fn equity_csv(points: &[EquityPoint]) -> Result<String, ExportError> {
    to_csv(points)
}

pub fn read_trades_csv<R: Read>(input: R) -> Result<Vec<TradeRecord>, ExportError> {
    from_csv(input)
}

pub fn read_equity_csv<R: Read>(input: R) -> Result<Vec<EquityPoint>, ExportError> {
    from_csv(input)
}

// ─── JSON ───────────────────────────────────────────────────────────

pub fn attempts_json(attempts: &[TradeAttempt]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(attempts)?)
}

pub fn manifest_json(manifest: &RunManifest) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(manifest)?)
}

/// Parse a manifest, rejecting schema versions newer than this build.
pub fn import_manifest(json: &str) -> Result<RunManifest, ExportError> {
    let manifest: RunManifest = serde_json::from_str(json)?;
    if manifest.schema_version > SCHEMA_VERSION {
        return Err(ExportError::SchemaVersion {
            found: manifest.schema_version,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(manifest)
}

// ─── Artifact bundle ────────────────────────────────────────────────

fn write_file(path: PathBuf, contents: &str) -> Result<(), ExportError> {
    std::fs::write(&path, contents).map_err(|source| ExportError::Io { path, source })
}

/// Write the full artifact set under `output_dir/run_<hash prefix>/`.
///
/// The directory name comes from the run hash, so re-exporting the same run
/// overwrites the same files. Returns the run directory.
pub fn save_artifacts(
    result: &RunResult,
    dataset_hash: Option<&str>,
    output_dir: &Path,
) -> Result<PathBuf, ExportError> {
    let prefix: String = result.fingerprint.run_hash.chars().take(12).collect();
    let run_dir = output_dir.join(format!("run_{prefix}"));
    std::fs::create_dir_all(&run_dir).map_err(|source| ExportError::Io {
        path: run_dir.clone(),
        source,
    })?;

    write_file(run_dir.join("trades.csv"), &trades_csv(&result.log.trades)?)?;
    write_file(run_dir.join("equity.csv"), &equity_csv(&result.log.equity)?)?;
    write_file(run_dir.join("attempts.json"), &attempts_json(&result.log.attempts)?)?;
    let manifest = RunManifest::from_result(result, dataset_hash);
    write_file(run_dir.join("manifest.json"), &manifest_json(&manifest)?)?;

    info!(dir = %run_dir.display(), trades = result.log.trades.len(), "artifacts saved");
    Ok(run_dir)
}

/// Load `manifest.json` from a run directory.
pub fn load_manifest(dir: &Path) -> Result<RunManifest, ExportError> {
    let path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&path).map_err(|source| ExportError::Io { path, source })?;
    import_manifest(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use quantpipe_core::costs::TransactionCostModel;
    use quantpipe_core::domain::{Bar, TradeKind};
    use quantpipe_core::signal::VecSignalSource;
    use quantpipe_core::{BacktestEngine, PipelineConfig};

    fn sample_result() -> RunResult {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let prices = [100.0, 101.0, 99.5, 102.25, 103.0];
        let bars: Vec<Bar> = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| Bar::flat(t0 + Duration::days(i as i64), p))
            .collect();
        let mut source =
            VecSignalSource::from_values(bars.iter().map(|b| b.timestamp), [1, 1, 0, 1, 1]).unwrap();
        let mut config = PipelineConfig::default();
        config.sizing.units = 1.0;
        config.costs = TransactionCostModel::fixed_plus_proportional(0.5, 0.001);
        BacktestEngine::new(config).unwrap().run(&bars, &mut source).unwrap()
    }

    #[test]
    fn trades_csv_round_trip() {
        let result = sample_result();
        let csv = trades_csv(&result.log.trades).unwrap();
        assert!(csv.starts_with("seq,bar_index,timestamp"));
        let back = read_trades_csv(csv.as_bytes()).unwrap();
        assert_eq!(back, result.log.trades);
        assert_eq!(back.last().unwrap().kind, TradeKind::CloseOut);
    }

    #[test]
    fn equity_csv_round_trip() {
        let result = sample_result();
        let csv = equity_csv(&result.log.equity).unwrap();
        let back = read_equity_csv(csv.as_bytes()).unwrap();
        assert_eq!(back, result.log.equity);
    }

    #[test]
    fn save_and_load_artifacts() {
        let result = sample_result();
        let dir = tempfile::tempdir().unwrap();
        let run_dir = save_artifacts(&result, Some("abc123"), dir.path()).unwrap();

        for name in ["trades.csv", "equity.csv", "attempts.json", "manifest.json"] {
            assert!(run_dir.join(name).exists(), "{name} missing");
        }
        let manifest = load_manifest(&run_dir).unwrap();
        assert_eq!(manifest.fingerprint, result.fingerprint);
        assert_eq!(manifest.summary, result.summary);
        assert_eq!(manifest.dataset_hash.as_deref(), Some("abc123"));

        let attempts: Vec<TradeAttempt> =
            serde_json::from_str(&std::fs::read_to_string(run_dir.join("attempts.json")).unwrap()).unwrap();
        assert_eq!(attempts, result.log.attempts);
    }

    #[test]
    fn same_run_exports_to_same_directory() {
        let result = sample_result();
        let dir = tempfile::tempdir().unwrap();
        let a = save_artifacts(&result, None, dir.path()).unwrap();
        let b = save_artifacts(&result, None, dir.path()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn newer_schema_rejected() {
        let result = sample_result();
        let mut manifest = RunManifest::from_result(&result, None);
        manifest.schema_version = SCHEMA_VERSION + 1;
        let json = manifest_json(&manifest).unwrap();
        assert!(matches!(
            import_manifest(&json),
            Err(ExportError::SchemaVersion { .. })
        ));
    }
}
