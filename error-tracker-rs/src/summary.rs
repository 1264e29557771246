//! # Window Summaries
//!
//! Read-side statistics over the event history: per-window counts, trend
//! direction, most frequent error types and recommendations. Everything here
//! is computed on demand from the event list; nothing is cached.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Local};
use serde::{Serialize, Serializer};

use crate::types::{components, timestamp, ErrorEvent, ErrorType, Severity};

pub const DEFAULT_SUMMARY_DAYS: u32 = 7;

/// Newer/older ratio above which errors are increasing
pub const TREND_INCREASE_RATIO: f64 = 1.2;
/// Newer/older ratio below which errors are decreasing
pub const TREND_DECREASE_RATIO: f64 = 0.8;

/// More errors than this in a window is a high error rate
pub const HIGH_ERROR_RATE_THRESHOLD: usize = 10;
/// More API-component errors than this calls for a connectivity check
pub const API_ERROR_THRESHOLD: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
            Trend::InsufficientData => "insufficient_data",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopErrorType {
    pub error_type: ErrorType,
    pub count: usize,
    #[serde(with = "timestamp")]
    pub latest_occurrence: DateTime<Local>,
}

/// Advice derived from a window of events. Serialized as its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    NoErrors,
    HighErrorRate,
    CriticalErrors(usize),
    ApiErrors,
    DocumentationErrors,
    ValidationErrors,
    WithinAcceptableRange,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::NoErrors => {
                write!(f, "✅ No errors detected in the specified period")
            }
            Recommendation::HighErrorRate => {
                write!(f, "🚨 High error rate detected - investigate root causes")
            }
            Recommendation::CriticalErrors(count) => {
                write!(f, "🔴 {} critical errors require immediate attention", count)
            }
            Recommendation::ApiErrors => write!(
                f,
                "🌐 Multiple API errors - check API connectivity and authentication"
            ),
            Recommendation::DocumentationErrors => write!(
                f,
                "📚 Documentation errors detected - review and update documentation"
            ),
            Recommendation::ValidationErrors => write!(
                f,
                "✅ Validation errors detected - review data quality and validation rules"
            ),
            Recommendation::WithinAcceptableRange => {
                write!(f, "💡 Error levels are within acceptable ranges")
            }
        }
    }
}

impl Serialize for Recommendation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Statistics for the events of the last `period_days` days.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorSummary {
    pub period_days: u32,
    pub total_errors: usize,
    pub errors_by_severity: BTreeMap<Severity, usize>,
    pub errors_by_component: BTreeMap<String, usize>,
    pub errors_by_type: BTreeMap<String, usize>,
    pub critical_errors: Vec<ErrorEvent>,
    pub error_rate_trend: Trend,
    pub top_error_types: Vec<TopErrorType>,
    pub recommendations: Vec<Recommendation>,
}

/// Events strictly newer than `now - days`.
pub fn window_events(events: &[ErrorEvent], now: DateTime<Local>, days: u32) -> Vec<&ErrorEvent> {
    let cutoff = now - Duration::days(i64::from(days));
    events.iter().filter(|e| e.timestamp > cutoff).collect()
}

/// Compares error counts in the older and newer halves of the window.
///
/// The window is split at `now - days / 2` (whole days). The older half is
/// `(now - days, mid]`, the newer half everything after `mid`. Both halves are
/// counted over the full history.
pub fn calculate_error_trend(events: &[ErrorEvent], now: DateTime<Local>, days: u32) -> Trend {
    if days < 2 {
        return Trend::InsufficientData;
    }

    let cutoff = now - Duration::days(i64::from(days));
    let mid = now - Duration::days(i64::from(days / 2));

    let older = events
        .iter()
        .filter(|e| e.timestamp > cutoff && e.timestamp <= mid)
        .count();
    let newer = events.iter().filter(|e| e.timestamp > mid).count();

    match (older, newer) {
        (0, 0) => Trend::Stable,
        (0, _) => Trend::Increasing,
        (_, 0) => Trend::Decreasing,
        (older, newer) => {
            let ratio = newer as f64 / older as f64;
            if ratio > TREND_INCREASE_RATIO {
                Trend::Increasing
            } else if ratio < TREND_DECREASE_RATIO {
                Trend::Decreasing
            } else {
                Trend::Stable
            }
        }
    }
}

/// Most frequent error types, highest count first. Ties keep the order in
/// which the types first appear.
pub fn get_top_error_types(events: &[&ErrorEvent], limit: usize) -> Vec<TopErrorType> {
    let mut tally: Vec<TopErrorType> = Vec::new();

    for event in events {
        match tally.iter_mut().find(|t| t.error_type == event.error_type) {
            Some(entry) => {
                entry.count += 1;
                if event.timestamp > entry.latest_occurrence {
                    entry.latest_occurrence = event.timestamp;
                }
            }
            None => tally.push(TopErrorType {
                error_type: event.error_type.clone(),
                count: 1,
                latest_occurrence: event.timestamp,
            }),
        }
    }

    tally.sort_by(|a, b| b.count.cmp(&a.count));
    tally.truncate(limit);
    tally
}

/// Applies the recommendation rules to one window of events.
pub fn generate_recommendations(events: &[&ErrorEvent]) -> Vec<Recommendation> {
    if events.is_empty() {
        return vec![Recommendation::NoErrors];
    }

    let count_component = |component: &str| {
        events
            .iter()
            .filter(|e| e.component.as_str() == component)
            .count()
    };

    let mut recommendations = Vec::new();

    if events.len() > HIGH_ERROR_RATE_THRESHOLD {
        recommendations.push(Recommendation::HighErrorRate);
    }

    let critical = events
        .iter()
        .filter(|e| e.severity == Severity::Critical)
        .count();
    if critical > 0 {
        recommendations.push(Recommendation::CriticalErrors(critical));
    }

    if count_component(components::API) > API_ERROR_THRESHOLD {
        recommendations.push(Recommendation::ApiErrors);
    }
    if count_component(components::DOCUMENTATION) > 0 {
        recommendations.push(Recommendation::DocumentationErrors);
    }
    if count_component(components::VALIDATION) > 0 {
        recommendations.push(Recommendation::ValidationErrors);
    }

    if recommendations.is_empty() {
        recommendations.push(Recommendation::WithinAcceptableRange);
    }

    recommendations
}

/// Builds the summary for the last `days` days.
pub fn summarize(
    events: &[ErrorEvent],
    now: DateTime<Local>,
    days: u32,
    top_limit: usize,
) -> ErrorSummary {
    let recent = window_events(events, now, days);

    let mut errors_by_severity = BTreeMap::new();
    let mut errors_by_component = BTreeMap::new();
    let mut errors_by_type = BTreeMap::new();
    let mut critical_errors = Vec::new();

    for event in &recent {
        *errors_by_severity.entry(event.severity).or_insert(0) += 1;
        *errors_by_component
            .entry(event.component.to_string())
            .or_insert(0) += 1;
        *errors_by_type
            .entry(event.error_type.to_string())
            .or_insert(0) += 1;

        if event.severity == Severity::Critical {
            critical_errors.push((*event).clone());
        }
    }

    ErrorSummary {
        period_days: days,
        total_errors: recent.len(),
        errors_by_severity,
        errors_by_component,
        errors_by_type,
        critical_errors,
        error_rate_trend: calculate_error_trend(events, now, days),
        top_error_types: get_top_error_types(&recent, top_limit),
        recommendations: generate_recommendations(&recent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorReport;
    use chrono::TimeZone;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap()
    }

    fn event(error_type: &str, component: &str, severity: Severity, age: Duration) -> ErrorEvent {
        ErrorEvent::from_report(
            ErrorReport::new(error_type, component, "boom").severity(severity),
            now() - age,
        )
    }

    #[test]
    fn test_trend_needs_two_days() {
        let events = vec![event("x", "other", Severity::Low, Duration::hours(1))];
        assert_eq!(calculate_error_trend(&events, now(), 0), Trend::InsufficientData);
        assert_eq!(calculate_error_trend(&events, now(), 1), Trend::InsufficientData);
    }

    #[test]
    fn test_trend_classification() {
        assert_eq!(calculate_error_trend(&[], now(), 7), Trend::Stable);

        // mid for 7 days is 3 days ago
        let newer_only = vec![event("x", "other", Severity::Low, Duration::days(1))];
        assert_eq!(calculate_error_trend(&newer_only, now(), 7), Trend::Increasing);

        let older_only = vec![event("x", "other", Severity::Low, Duration::days(5))];
        assert_eq!(calculate_error_trend(&older_only, now(), 7), Trend::Decreasing);

        let balanced = vec![
            event("x", "other", Severity::Low, Duration::days(5)),
            event("x", "other", Severity::Low, Duration::days(4)),
            event("x", "other", Severity::Low, Duration::days(1)),
            event("x", "other", Severity::Low, Duration::hours(2)),
        ];
        assert_eq!(calculate_error_trend(&balanced, now(), 7), Trend::Stable);

        let rising = vec![
            event("x", "other", Severity::Low, Duration::days(5)),
            event("x", "other", Severity::Low, Duration::days(1)),
            event("x", "other", Severity::Low, Duration::hours(2)),
        ];
        assert_eq!(calculate_error_trend(&rising, now(), 7), Trend::Increasing);
    }

    #[test]
    fn test_trend_ignores_events_before_window() {
        let events = vec![
            event("x", "other", Severity::Low, Duration::days(30)),
            event("x", "other", Severity::Low, Duration::days(20)),
        ];
        assert_eq!(calculate_error_trend(&events, now(), 7), Trend::Stable);
    }

    #[test]
    fn test_top_error_types_orders_by_count_then_first_seen() {
        let events = vec![
            event("timeout", "api", Severity::High, Duration::hours(5)),
            event("schema", "validation", Severity::Low, Duration::hours(4)),
            event("schema", "validation", Severity::Low, Duration::hours(1)),
            event("missing_example", "documentation", Severity::Medium, Duration::hours(3)),
        ];
        let refs: Vec<&ErrorEvent> = events.iter().collect();

        let top = get_top_error_types(&refs, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].error_type, "schema");
        assert_eq!(top[0].count, 2);
        assert_eq!(top[0].latest_occurrence, now() - Duration::hours(1));
        assert_eq!(top[1].error_type, "timeout");
    }

    #[test]
    fn test_recommendations_rules() {
        assert_eq!(generate_recommendations(&[]), vec![Recommendation::NoErrors]);

        let quiet = vec![event("x", "other", Severity::Low, Duration::hours(1))];
        let refs: Vec<&ErrorEvent> = quiet.iter().collect();
        assert_eq!(
            generate_recommendations(&refs),
            vec![Recommendation::WithinAcceptableRange]
        );

        let mut busy: Vec<ErrorEvent> = (0..6)
            .map(|_| event("api_error", "api", Severity::Critical, Duration::hours(1)))
            .collect();
        busy.push(event("doc", "documentation", Severity::Medium, Duration::hours(1)));
        busy.push(event("val", "validation", Severity::Medium, Duration::hours(1)));
        let refs: Vec<&ErrorEvent> = busy.iter().collect();
        assert_eq!(
            generate_recommendations(&refs),
            vec![
                Recommendation::CriticalErrors(6),
                Recommendation::ApiErrors,
                Recommendation::DocumentationErrors,
                Recommendation::ValidationErrors,
            ]
        );
    }

    #[test]
    fn test_summary_window_and_groups() {
        let events = vec![
            event("api_error", "api", Severity::Critical, Duration::hours(2)),
            event("schema", "validation", Severity::Medium, Duration::days(3)),
            event("stale", "other", Severity::Low, Duration::days(8)),
        ];

        let summary = summarize(&events, now(), 7, 5);
        assert_eq!(summary.total_errors, 2);
        assert_eq!(summary.errors_by_severity[&Severity::Critical], 1);
        assert_eq!(summary.errors_by_component["validation"], 1);
        assert!(!summary.errors_by_type.contains_key("stale"));
        assert_eq!(summary.critical_errors.len(), 1);
        assert_eq!(summary.critical_errors[0].id, events[0].id);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["errors_by_severity"]["critical"], 1);
        assert_eq!(json["error_rate_trend"], "stable");
        assert_eq!(
            json["recommendations"][0],
            "🔴 1 critical errors require immediate attention"
        );
    }
}
