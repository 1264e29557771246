//! Process-wide aggregate counters persisted to `metrics.json`.

use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::types::{timestamp, ErrorEvent};

/// Date format used for `daily_error_count` keys.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetrics {
    pub total_errors: u64,
    #[serde(default)]
    pub errors_by_type: BTreeMap<String, u64>,
    #[serde(default)]
    pub errors_by_component: BTreeMap<String, u64>,
    #[serde(default)]
    pub errors_by_severity: BTreeMap<String, u64>,
    #[serde(default)]
    pub daily_error_count: BTreeMap<String, u64>,
    #[serde(with = "timestamp")]
    pub last_updated: DateTime<Local>,
}

impl ErrorMetrics {
    pub fn empty(now: DateTime<Local>) -> Self {
        Self {
            total_errors: 0,
            errors_by_type: BTreeMap::new(),
            errors_by_component: BTreeMap::new(),
            errors_by_severity: BTreeMap::new(),
            daily_error_count: BTreeMap::new(),
            last_updated: now,
        }
    }

    /// Recomputes every counter from an event list.
    pub fn rebuild(events: &[ErrorEvent], now: DateTime<Local>) -> Self {
        let mut metrics = Self::empty(now);
        for event in events {
            metrics.record(event, now);
        }
        metrics
    }

    /// Counts one event. Buckets are created on first use; the day bucket is
    /// the event's local calendar date.
    pub fn record(&mut self, event: &ErrorEvent, now: DateTime<Local>) {
        self.total_errors += 1;
        *self
            .errors_by_type
            .entry(event.error_type.to_string())
            .or_insert(0) += 1;
        *self
            .errors_by_component
            .entry(event.component.to_string())
            .or_insert(0) += 1;
        *self
            .errors_by_severity
            .entry(event.severity.to_string())
            .or_insert(0) += 1;
        *self
            .daily_error_count
            .entry(event.timestamp.format(DAY_FORMAT).to_string())
            .or_insert(0) += 1;
        self.last_updated = now;
    }

    /// True when the counters can describe `events` without orphans.
    pub fn is_consistent_with(&self, events: &[ErrorEvent]) -> bool {
        self.total_errors == events.len() as u64
            && self.errors_by_severity.values().sum::<u64>() == self.total_errors
    }
}
