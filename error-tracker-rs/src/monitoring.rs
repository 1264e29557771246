//! Metrics emitted through the `metrics` facade.
//!
//! Nothing is exported unless the host process installs a recorder.

use metrics::{counter, gauge};

use crate::health::HealthReport;
use crate::types::ErrorEvent;

pub fn record_event_metrics(event: &ErrorEvent) {
    counter!("error_tracker.events.total", 1);
    counter!(
        "error_tracker.events.by_severity",
        1,
        "severity" => event.severity.as_str()
    );
    counter!(
        "error_tracker.events.by_component",
        1,
        "component" => event.component.to_string()
    );
    counter!(
        "error_tracker.events.by_type",
        1,
        "error_type" => event.error_type.to_string()
    );
}

pub fn record_health_metrics(report: &HealthReport) {
    gauge!("error_tracker.health.score", f64::from(report.health_score));
    gauge!("error_tracker.errors.24h", report.summary_24h.total_errors as f64);
    gauge!("error_tracker.errors.7d", report.summary_7d.total_errors as f64);
    gauge!(
        "error_tracker.errors.tracked",
        report.total_tracked_errors as f64
    );
}
