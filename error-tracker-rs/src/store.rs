//! # Flat-file Persistence
//!
//! `errors.json` holds the full event array and `metrics.json` the aggregate
//! counters. Both are rewritten completely on every tracked event, so a write
//! costs O(n) in the number of stored events. That is fine for low-volume
//! diagnostic logging; a high-throughput deployment would need an append-only
//! log with periodic snapshots instead.
//!
//! Each rewrite goes to a temporary file that is then renamed over the
//! target, so a failed write leaves the previous snapshot readable.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::aggregate::ErrorMetrics;
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::types::ErrorEvent;

#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
    errors_path: PathBuf,
    metrics_path: PathBuf,
}

/// Events read from disk, with the number of records that had to be skipped
/// and the number that were stored without an id and got a new one.
#[derive(Debug, Default)]
pub struct LoadedEvents {
    pub events: Vec<ErrorEvent>,
    pub skipped: usize,
    pub assigned_ids: usize,
}

impl JsonStore {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            dir: config.log_dir.clone(),
            errors_path: config.errors_path(),
            metrics_path: config.metrics_path(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn errors_path(&self) -> &Path {
        &self.errors_path
    }

    pub fn metrics_path(&self) -> &Path {
        &self.metrics_path
    }

    /// Creates the storage directory if it does not exist yet.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| TrackerError::io(&self.dir, e))
    }

    /// Loads the event list. A missing file is an empty list; individual
    /// records that fail to parse are skipped.
    pub fn load_events(&self) -> Result<LoadedEvents> {
        let Some(raw) = self.read_if_exists(&self.errors_path)? else {
            return Ok(LoadedEvents::default());
        };

        let records: Vec<serde_json::Value> = serde_json::from_str(&raw)
            .map_err(|e| TrackerError::json(&self.errors_path, e))?;

        let mut loaded = LoadedEvents::default();
        for record in records {
            let has_id = record.get("id").is_some();
            match serde_json::from_value::<ErrorEvent>(record) {
                Ok(event) => {
                    if !has_id {
                        loaded.assigned_ids += 1;
                    }
                    loaded.events.push(event);
                }
                Err(e) => {
                    tracing::warn!(
                        "Skipping malformed event in {}: {}",
                        self.errors_path.display(),
                        e
                    );
                    loaded.skipped += 1;
                }
            }
        }
        Ok(loaded)
    }

    /// Loads the aggregate counters, `None` if the file does not exist.
    pub fn load_metrics(&self) -> Result<Option<ErrorMetrics>> {
        let Some(raw) = self.read_if_exists(&self.metrics_path)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| TrackerError::json(&self.metrics_path, e))
    }

    pub fn save_events(&self, events: &[ErrorEvent]) -> Result<()> {
        write_json_atomic(&self.errors_path, events)
    }

    pub fn save_metrics(&self, metrics: &ErrorMetrics) -> Result<()> {
        write_json_atomic(&self.metrics_path, metrics)
    }

    fn read_if_exists(&self, path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TrackerError::io(path, e)),
        }
    }
}

fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_vec_pretty(value).map_err(|e| TrackerError::json(path, e))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, body).map_err(|e| TrackerError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        TrackerError::io(path, e)
    })
}
