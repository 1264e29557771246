//! # Error Event Model
//!
//! The event record persisted to `errors.json`, the closed enumerations that
//! classify it, and the open string tags used for error types and components.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{Result, TrackerError};

/// Opaque identifier returned for every tracked event.
pub type EventId = Uuid;

/// Ordinal importance of an error event.
///
/// Ordering follows importance, so `Severity::Critical > Severity::Low`.
/// Stored values outside the four levels load as `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Parses a severity, mapping anything unrecognised to `Medium`.
    ///
    /// `Medium` logs at WARNING, the same level an unknown severity fell back
    /// to before severities were a closed set.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|_| {
            tracing::debug!(severity = %raw, "Unrecognised severity, using medium");
            Severity::Medium
        })
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Medium
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            _ => Err(TrackerError::InvalidSeverity(s.to_string())),
        }
    }
}

/// How much an error affects end users. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserImpact {
    High,
    Medium,
    Low,
    None,
    Unknown,
}

impl Default for UserImpact {
    fn default() -> Self {
        UserImpact::Unknown
    }
}

impl FromStr for UserImpact {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(UserImpact::High),
            "medium" => Ok(UserImpact::Medium),
            "low" => Ok(UserImpact::Low),
            "none" => Ok(UserImpact::None),
            "unknown" => Ok(UserImpact::Unknown),
            _ => Err(TrackerError::InvalidUserImpact(s.to_string())),
        }
    }
}

impl UserImpact {
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or(UserImpact::Unknown)
    }
}

/// Lifecycle flag carried on every event. No transitions are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStatus {
    Open,
    Investigating,
    Resolved,
}

impl Default for ResolutionStatus {
    fn default() -> Self {
        ResolutionStatus::Open
    }
}

impl ResolutionStatus {
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "investigating" => ResolutionStatus::Investigating,
            "resolved" => ResolutionStatus::Resolved,
            _ => ResolutionStatus::Open,
        }
    }
}

// Unrecognised stored values load leniently so the record survives the next rewrite.
macro_rules! lenient_deserialize {
    ($($name:ident),+) => {
        $(
            impl<'de> Deserialize<'de> for $name {
                fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
                    let raw = String::deserialize(d)?;
                    Ok($name::parse_lenient(&raw))
                }
            }
        )+
    };
}

lenient_deserialize!(Severity, UserImpact, ResolutionStatus);

// Tags start with an alphanumeric and contain no whitespace.
static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.:/-]*$").unwrap());

const UNKNOWN_TAG: &str = "unknown";

/// Declares an open string tag with strict (`FromStr`) and lenient (`From`)
/// constructors.
macro_rules! string_tag {
    ($(#[$meta:meta])* $name:ident, builtins = $builtins:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True for the values this crate emits itself.
            pub fn is_builtin(&self) -> bool {
                $builtins.contains(&self.0.as_str())
            }
        }

        impl FromStr for $name {
            type Err = TrackerError;

            fn from_str(s: &str) -> Result<Self> {
                if TAG_PATTERN.is_match(s) {
                    Ok(Self(s.to_string()))
                } else {
                    Err(TrackerError::InvalidTag(s.to_string()))
                }
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    Self(UNKNOWN_TAG.to_string())
                } else {
                    Self(trimmed.to_string())
                }
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self::from(raw.as_str())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

/// Built-in error type values.
pub mod error_types {
    pub const API: &str = "api_error";
    pub const DOCUMENTATION: &str = "documentation_error";
    pub const VALIDATION: &str = "validation_error";

    pub const BUILTIN: [&str; 3] = [API, DOCUMENTATION, VALIDATION];
}

/// Built-in component values.
pub mod components {
    pub const API: &str = "api";
    pub const DOCUMENTATION: &str = "documentation";
    pub const VALIDATION: &str = "validation";

    pub const BUILTIN: [&str; 3] = [API, DOCUMENTATION, VALIDATION];
}

string_tag!(
    /// Free-form category of an error, e.g. `api_error`.
    ErrorType,
    builtins = error_types::BUILTIN
);

string_tag!(
    /// Free-form origin of an error, e.g. `api`.
    Component,
    builtins = components::BUILTIN
);

/// Serde helpers for event timestamps.
///
/// Written as RFC 3339 with the local offset. Offset-less timestamps from older
/// files are read as local time.
pub(crate) mod timestamp {
    use chrono::{DateTime, Duration, Local, LocalResult, NaiveDateTime, TimeZone};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Local>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Local>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Local>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Local));
        }
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
        resolve_local(&Local, naive)
    }

    /// Places a wall-clock time in `tz`. Ambiguous times take the earlier
    /// instant; times skipped by a DST jump move forward by the usual hour.
    pub fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(ts) => Some(ts),
            LocalResult::Ambiguous(earliest, _) => Some(earliest),
            LocalResult::None => tz
                .from_local_datetime(&(naive + Duration::hours(1)))
                .earliest()
                .or_else(|| Some(tz.from_utc_datetime(&naive))),
        }
    }
}

/// One observed failure. Created once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// Older files carry no id; one is assigned on load and written back.
    #[serde(default = "Uuid::new_v4")]
    pub id: EventId,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Local>,
    pub error_type: ErrorType,
    pub severity: Severity,
    pub component: Component,
    pub message: String,
    #[serde(default)]
    pub details: serde_json::Map<String, serde_json::Value>,
    pub stack_trace: Option<String>,
    #[serde(default)]
    pub user_impact: UserImpact,
    #[serde(default)]
    pub resolution_status: ResolutionStatus,
}

impl ErrorEvent {
    /// Builds an open event from a report, stamped with `timestamp`.
    pub fn from_report(report: ErrorReport, timestamp: DateTime<Local>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            error_type: report.error_type,
            severity: report.severity,
            component: report.component,
            message: report.message,
            details: report.details,
            stack_trace: report.stack_trace,
            user_impact: report.user_impact,
            resolution_status: ResolutionStatus::Open,
        }
    }
}

/// Caller-side description of an error, turned into an [`ErrorEvent`] when tracked.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub error_type: ErrorType,
    pub component: Component,
    pub message: String,
    pub severity: Severity,
    pub details: serde_json::Map<String, serde_json::Value>,
    pub user_impact: UserImpact,
    pub stack_trace: Option<String>,
}

impl ErrorReport {
    /// Creates a medium-severity report with unknown user impact
    pub fn new(
        error_type: impl Into<ErrorType>,
        component: impl Into<Component>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error_type: error_type.into(),
            component: component.into(),
            message: message.into(),
            severity: Severity::default(),
            details: serde_json::Map::new(),
            user_impact: UserImpact::default(),
            stack_trace: None,
        }
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn user_impact(mut self, user_impact: UserImpact) -> Self {
        self.user_impact = user_impact;
        self
    }

    /// Adds one detail entry. Values that fail to serialize are dropped.
    pub fn detail<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Serialize,
    {
        if let Ok(value) = serde_json::to_value(value) {
            self.details.insert(key.into(), value);
        }
        self
    }

    /// Replaces all details.
    pub fn details(mut self, details: serde_json::Map<String, serde_json::Value>) -> Self {
        self.details = details;
        self
    }

    pub fn stack_trace(mut self, trace: impl Into<String>) -> Self {
        self.stack_trace = Some(trace.into());
        self
    }

    /// Captures a backtrace at the call site.
    ///
    /// Leaves the trace unset when backtraces are disabled
    /// (`RUST_BACKTRACE`/`RUST_LIB_BACKTRACE` not set).
    pub fn capture_backtrace(mut self) -> Self {
        let backtrace = Backtrace::capture();
        if backtrace.status() == BacktraceStatus::Captured {
            self.stack_trace = Some(backtrace.to_string());
        }
        self
    }

    /// Records an error and its `source()` chain as the stack trace.
    pub fn error_source(mut self, err: &dyn StdError) -> Self {
        let mut trace = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            trace.push_str("\nCaused by: ");
            trace.push_str(&cause.to_string());
            source = cause.source();
        }
        self.stack_trace = Some(trace);
        self
    }
}
