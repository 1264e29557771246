//! # Error Tracker
//!
//! Error tracking and health monitoring for the API documentation toolchain.
//! Scripts report failures (API calls, documentation problems, validation
//! errors) to an [`ErrorTracker`], which keeps a durable JSON log, rolling
//! aggregate counters and a derived health report.
//!
//! ## Features
//!
//! - Typed error events with open error-type and component tags
//! - Write-through flat-file persistence (`errors.json`, `metrics.json`)
//! - Per-tracker logging to `system.log` and the console
//! - Window summaries with trend detection and recommendations
//! - A bounded 0-100 health score
//! - Optional export through the `metrics` facade
//!
//! Tracking never fails from the caller's point of view: storage problems are
//! logged and the tracker keeps working from memory.

pub mod aggregate;
pub mod clock;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod monitoring;
pub mod store;
pub mod summary;
pub mod tracker;
pub mod types;

// Re-export commonly used types
pub use aggregate::ErrorMetrics;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TrackerConfig;
pub use error::{Result, TrackerError};
pub use health::{HealthReport, HealthStatus};
pub use summary::{ErrorSummary, Recommendation, TopErrorType, Trend};
pub use tracker::ErrorTracker;
pub use types::{
    Component, ErrorEvent, ErrorReport, ErrorType, EventId, ResolutionStatus, Severity,
    UserImpact,
};
