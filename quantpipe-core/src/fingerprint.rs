//! Run fingerprinting: deterministic identification of runs and datasets.
//!
//! All hashes are BLAKE3 over canonical JSON, stable across builds and platforms.

use crate::config::PipelineConfig;
use crate::domain::{Bar, RunLog};
use serde::{Deserialize, Serialize};

/// Identity of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub config_id: String,
    pub log_hash: String,
    /// Hash of `config_id` and `log_hash` together.
    pub run_hash: String,
}

impl RunFingerprint {
    pub fn compute(config: &PipelineConfig, log: &RunLog) -> Self {
        let config_id = config.config_id();
        let log_hash = log.content_hash();
        let canonical = serde_json::json!({
            "config_id": &config_id,
            "log_hash": &log_hash,
        });
        let run_hash = blake3::hash(canonical.to_string().as_bytes()).to_hex().to_string();
        Self {
            config_id,
            log_hash,
            run_hash,
        }
    }
}

/// Content hash of a bar series.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        let line = serde_json::to_string(bar).unwrap_or_default();
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}
