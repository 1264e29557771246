//! # Tracker Configuration
//!
//! Settings for where the tracker keeps its files and how it logs. Values come
//! from defaults, `ERROR_TRACKER_*` environment variables, or the
//! `error_tracker.*` section of a `config::Config`.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

pub const DEFAULT_LOG_DIR: &str = "monitoring/logs";
pub const DEFAULT_LOGGER_NAME: &str = "error-tracker";
pub const DEFAULT_TOP_ERROR_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Directory holding `errors.json`, `metrics.json` and `system.log`
    pub log_dir: PathBuf,
    /// Name printed in every log line
    pub logger_name: String,
    /// Whether tracked events are echoed to stderr
    pub console_output: bool,
    /// Minimum level for the console sink
    pub console_level: String,
    /// Minimum level for `system.log`
    pub file_level: String,
    /// How many error types a summary lists
    pub top_error_limit: usize,
    /// Whether to record `metrics` counters and gauges
    pub record_metrics: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            logger_name: DEFAULT_LOGGER_NAME.to_string(),
            console_output: true,
            console_level: "warn".to_string(),
            file_level: "info".to_string(),
            top_error_limit: DEFAULT_TOP_ERROR_LIMIT,
            record_metrics: true,
        }
    }
}

impl TrackerConfig {
    /// Default settings rooted at `log_dir`.
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            ..Default::default()
        }
    }

    pub fn from_env() -> Self {
        let mut base = Self::default();

        if let Ok(dir) = std::env::var("ERROR_TRACKER_LOG_DIR") {
            base.log_dir = PathBuf::from(dir);
        }
        if let Ok(name) = std::env::var("ERROR_TRACKER_LOGGER_NAME") {
            base.logger_name = name;
        }
        if let Ok(v) = std::env::var("ERROR_TRACKER_CONSOLE_OUTPUT") {
            base.console_output =
                matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Ok(level) = std::env::var("ERROR_TRACKER_CONSOLE_LEVEL") {
            base.console_level = level;
        }
        if let Ok(level) = std::env::var("ERROR_TRACKER_FILE_LEVEL") {
            base.file_level = level;
        }
        if let Some(limit) = std::env::var("ERROR_TRACKER_TOP_ERROR_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            base.top_error_limit = limit;
        }
        if let Ok(v) = std::env::var("ERROR_TRACKER_RECORD_METRICS") {
            base.record_metrics =
                matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }

        base
    }

    pub fn console_filter(&self) -> LevelFilter {
        parse_level(&self.console_level).unwrap_or(LevelFilter::WARN)
    }

    pub fn file_filter(&self) -> LevelFilter {
        parse_level(&self.file_level).unwrap_or(LevelFilter::INFO)
    }

    /// Level settings that did not parse and fell back to their default, as
    /// `(setting, value)` pairs.
    pub fn invalid_levels(&self) -> Vec<(&'static str, &str)> {
        [
            ("console_level", self.console_level.as_str()),
            ("file_level", self.file_level.as_str()),
        ]
        .into_iter()
        .filter(|(_, raw)| parse_level(raw).is_none())
        .collect()
    }

    pub fn errors_path(&self) -> PathBuf {
        self.log_dir.join("errors.json")
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.log_dir.join("metrics.json")
    }
}

fn parse_level(raw: &str) -> Option<LevelFilter> {
    // Accept the WARNING spelling used in the log lines
    let normalized = match raw.trim().to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    };
    LevelFilter::from_str(&normalized).ok()
}

impl TryFrom<config::Config> for TrackerConfig {
    type Error = config::ConfigError;

    fn try_from(cfg: config::Config) -> std::result::Result<Self, Self::Error> {
        // Start from defaults and selectively override from the provided config.
        let mut base = TrackerConfig::default();

        if let Ok(log_dir) = cfg.get::<String>("error_tracker.log_dir") {
            base.log_dir = PathBuf::from(log_dir);
        }
        if let Ok(name) = cfg.get::<String>("error_tracker.logger_name") {
            base.logger_name = name;
        }
        if let Ok(console_output) = cfg.get::<bool>("error_tracker.console_output") {
            base.console_output = console_output;
        }
        if let Ok(level) = cfg.get::<String>("error_tracker.console_level") {
            base.console_level = level;
        }
        if let Ok(level) = cfg.get::<String>("error_tracker.file_level") {
            base.file_level = level;
        }
        if let Ok(limit) = cfg.get::<usize>("error_tracker.top_error_limit") {
            base.top_error_limit = limit;
        }
        if let Ok(record_metrics) = cfg.get::<bool>("error_tracker.record_metrics") {
            base.record_metrics = record_metrics;
        }

        Ok(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = TrackerConfig::default();
        assert_eq!(cfg.log_dir, PathBuf::from("monitoring/logs"));
        assert_eq!(cfg.console_filter(), LevelFilter::WARN);
        assert_eq!(cfg.file_filter(), LevelFilter::INFO);
        assert_eq!(cfg.top_error_limit, 5);
        assert_eq!(cfg.errors_path(), PathBuf::from("monitoring/logs/errors.json"));
    }

    #[test]
    fn test_level_spellings() {
        assert_eq!(parse_level("WARNING"), Some(LevelFilter::WARN));
        assert_eq!(parse_level("critical"), Some(LevelFilter::ERROR));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_invalid_levels_fall_back() {
        let mut cfg = TrackerConfig::default();
        cfg.file_level = "loud".to_string();

        assert_eq!(cfg.file_filter(), LevelFilter::INFO);
        assert_eq!(cfg.invalid_levels(), vec![("file_level", "loud")]);
        assert!(TrackerConfig::default().invalid_levels().is_empty());
    }

    #[test]
    fn test_try_from_config_overrides() {
        let cfg = config::Config::builder()
            .set_override("error_tracker.log_dir", "/var/tmp/tracker")
            .unwrap()
            .set_override("error_tracker.console_output", false)
            .unwrap()
            .set_override("error_tracker.top_error_limit", 3)
            .unwrap()
            .build()
            .unwrap();

        let tracker_cfg = TrackerConfig::try_from(cfg).unwrap();
        assert_eq!(tracker_cfg.log_dir, PathBuf::from("/var/tmp/tracker"));
        assert!(!tracker_cfg.console_output);
        assert_eq!(tracker_cfg.top_error_limit, 3);
        assert_eq!(tracker_cfg.logger_name, DEFAULT_LOGGER_NAME);
    }
}
