//! # Error Tracker
//!
//! Durable, queryable log of error events with rolling aggregate metrics and
//! a composite health score.
//!
//! Every write goes through [`ErrorTracker::record_event`], which appends the
//! event, updates the aggregates, logs it and rewrites both JSON files while
//! holding one lock. Readers take the same lock, so a tracker can be shared
//! behind an `Arc` without losing updates. Separate processes writing the same
//! directory are not coordinated; the last full rewrite wins.
//!
//! No public operation returns an error or panics on storage problems. Failures
//! are logged and the tracker carries on with its in-memory state.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::Dispatch;

use crate::aggregate::ErrorMetrics;
use crate::clock::{Clock, SystemClock};
use crate::config::TrackerConfig;
use crate::health::HealthReport;
use crate::logging;
use crate::monitoring;
use crate::store::JsonStore;
use crate::summary::{self, ErrorSummary, Trend, DEFAULT_SUMMARY_DAYS};
use crate::types::{
    components, error_types, Component, ErrorEvent, ErrorReport, ErrorType, EventId, Severity,
    UserImpact,
};

struct TrackerState {
    events: Vec<ErrorEvent>,
    metrics: ErrorMetrics,
}

pub struct ErrorTracker {
    config: TrackerConfig,
    store: JsonStore,
    dispatch: Dispatch,
    clock: Arc<dyn Clock>,
    state: Mutex<TrackerState>,
}

impl fmt::Debug for ErrorTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorTracker")
            .field("log_dir", &self.config.log_dir)
            .field(
                "total_tracked_errors",
                &self.state.try_lock().map(|s| s.events.len()).ok(),
            )
            .finish()
    }
}

/// Severity for an HTTP status: 5xx critical, 4xx high, anything else medium.
pub fn severity_for_status(status_code: u16) -> Severity {
    if status_code >= 500 {
        Severity::Critical
    } else if status_code >= 400 {
        Severity::High
    } else {
        Severity::Medium
    }
}

/// User impact for an HTTP status: 5xx high, anything else medium.
pub fn impact_for_status(status_code: u16) -> UserImpact {
    if status_code >= 500 {
        UserImpact::High
    } else {
        UserImpact::Medium
    }
}

impl ErrorTracker {
    /// Opens a tracker on the configured directory using the system clock.
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Opens a tracker with default settings rooted at `log_dir`.
    pub fn open(log_dir: impl Into<PathBuf>) -> Self {
        Self::new(TrackerConfig::new(log_dir))
    }

    /// Opens a tracker that reads time from `clock`.
    ///
    /// Creates the directory if needed and loads `errors.json` and
    /// `metrics.json`. Unreadable files are logged and replaced by empty state.
    pub fn with_clock(config: TrackerConfig, clock: Arc<dyn Clock>) -> Self {
        let store = JsonStore::new(&config);
        let dir_result = store.ensure_dir();
        let dispatch = logging::build_dispatch(&config);
        let now = clock.now();

        let state = tracing::dispatcher::with_default(&dispatch, || {
            if let Err(e) = dir_result {
                tracing::error!("Failed to create log directory: {}", e);
            }
            load_state(&store, now)
        });

        Self {
            config,
            store,
            dispatch,
            clock,
            state: Mutex::new(state),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    fn lock_state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn in_dispatch<R>(&self, f: impl FnOnce() -> R) -> R {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Records a fully built event: append, count, log, persist.
    pub fn record_event(&self, event: ErrorEvent) -> EventId {
        let id = event.id;
        let now = self.clock.now();

        let mut state = self.lock_state();
        state.metrics.record(&event, now);

        self.in_dispatch(|| logging::log_tracked_event(&event));
        if self.config.record_metrics {
            monitoring::record_event_metrics(&event);
        }

        state.events.push(event);
        self.persist(&state);

        id
    }

    fn persist(&self, state: &TrackerState) {
        self.in_dispatch(|| {
            if let Err(e) = self.store.save_events(&state.events) {
                tracing::error!("Failed to save errors: {}", e);
            }
            if let Err(e) = self.store.save_metrics(&state.metrics) {
                tracing::error!("Failed to save metrics: {}", e);
            }
        });
    }

    /// Tracks an error described by `report`, stamped with the current time.
    pub fn track(&self, report: ErrorReport) -> EventId {
        let event = ErrorEvent::from_report(report, self.clock.now());
        self.record_event(event)
    }

    /// Tracks a new error event.
    pub fn track_error(
        &self,
        error_type: impl Into<ErrorType>,
        component: impl Into<Component>,
        message: impl Into<String>,
        severity: Severity,
        details: Option<serde_json::Map<String, serde_json::Value>>,
        user_impact: UserImpact,
    ) -> EventId {
        let report = ErrorReport::new(error_type, component, message)
            .severity(severity)
            .details(details.unwrap_or_default())
            .user_impact(user_impact);
        self.track(report)
    }

    /// Tracks a failed API call; severity and impact follow the status code.
    pub fn track_api_error(
        &self,
        endpoint: &str,
        status_code: u16,
        error_message: &str,
        response_time: Option<f64>,
    ) -> EventId {
        let report = ErrorReport::new(
            error_types::API,
            components::API,
            format!("API error on {}: {}", endpoint, error_message),
        )
        .severity(severity_for_status(status_code))
        .user_impact(impact_for_status(status_code))
        .detail("endpoint", endpoint)
        .detail("status_code", status_code)
        .detail("response_time", response_time);
        self.track(report)
    }

    /// Tracks a problem found in a documentation file.
    pub fn track_documentation_error(
        &self,
        file_path: &str,
        doc_error_type: &str,
        message: &str,
    ) -> EventId {
        let report = ErrorReport::new(
            error_types::DOCUMENTATION,
            components::DOCUMENTATION,
            format!("Documentation error in {}: {}", file_path, message),
        )
        .severity(Severity::Medium)
        .user_impact(UserImpact::Low)
        .detail("file_path", file_path)
        .detail("doc_error_type", doc_error_type);
        self.track(report)
    }

    /// Tracks a failed validation, optionally with the offending data.
    pub fn track_validation_error(
        &self,
        validation_type: &str,
        message: &str,
        data: Option<serde_json::Value>,
    ) -> EventId {
        let report = ErrorReport::new(
            error_types::VALIDATION,
            components::VALIDATION,
            format!("Validation error ({}): {}", validation_type, message),
        )
        .severity(Severity::Medium)
        .user_impact(UserImpact::Medium)
        .detail("validation_type", validation_type)
        .detail("validation_data", data);
        self.track(report)
    }

    /// Summary of the last `days` days.
    pub fn get_error_summary(&self, days: u32) -> ErrorSummary {
        let now = self.clock.now();
        let state = self.lock_state();
        summary::summarize(&state.events, now, days, self.config.top_error_limit)
    }

    /// Summary of the default 7-day window.
    pub fn get_weekly_summary(&self) -> ErrorSummary {
        self.get_error_summary(DEFAULT_SUMMARY_DAYS)
    }

    pub fn calculate_error_trend(&self, days: u32) -> Trend {
        let now = self.clock.now();
        let state = self.lock_state();
        summary::calculate_error_trend(&state.events, now, days)
    }

    /// Scores the last 24 hours and 7 days.
    pub fn generate_health_report(&self) -> HealthReport {
        let now = self.clock.now();
        let report = {
            let state = self.lock_state();
            let limit = self.config.top_error_limit;
            HealthReport::new(
                now,
                summary::summarize(&state.events, now, 1, limit),
                summary::summarize(&state.events, now, 7, limit),
                state.events.len(),
            )
        };

        if self.config.record_metrics {
            monitoring::record_health_metrics(&report);
        }
        self.in_dispatch(|| {
            tracing::debug!(
                "Health report: {} ({})",
                report.health_score,
                report.health_status
            )
        });

        report
    }

    /// Snapshot of every tracked event, oldest first.
    pub fn events(&self) -> Vec<ErrorEvent> {
        self.lock_state().events.clone()
    }

    /// Snapshot of the aggregate counters.
    pub fn metrics(&self) -> ErrorMetrics {
        self.lock_state().metrics.clone()
    }

    pub fn total_tracked_errors(&self) -> usize {
        self.lock_state().events.len()
    }
}

fn load_state(store: &JsonStore, now: chrono::DateTime<chrono::Local>) -> TrackerState {
    let events = match store.load_events() {
        Ok(loaded) => {
            if loaded.skipped > 0 {
                tracing::warn!(
                    "Skipped {} malformed events while loading {}",
                    loaded.skipped,
                    store.errors_path().display()
                );
            }
            if loaded.assigned_ids > 0 {
                // Keep the new ids stable across reopens
                match store.save_events(&loaded.events) {
                    Ok(()) => tracing::info!(
                        "Assigned ids to {} stored events in {}",
                        loaded.assigned_ids,
                        store.errors_path().display()
                    ),
                    Err(e) => tracing::error!("Failed to save errors: {}", e),
                }
            }
            loaded.events
        }
        Err(e) => {
            tracing::error!("Failed to load errors: {}", e);
            Vec::new()
        }
    };

    let metrics = match store.load_metrics() {
        Ok(Some(metrics)) if metrics.is_consistent_with(&events) => metrics,
        Ok(Some(_)) => {
            tracing::warn!(
                "Stored metrics do not match {} stored events, rebuilding",
                events.len()
            );
            ErrorMetrics::rebuild(&events, now)
        }
        Ok(None) => ErrorMetrics::rebuild(&events, now),
        Err(e) => {
            tracing::error!("Failed to load metrics: {}", e);
            ErrorMetrics::rebuild(&events, now)
        }
    };

    TrackerState { events, metrics }
}
