//! # Health Scoring
//!
//! A 0-100 score built from additive penalties on recent error volume and
//! critical errors, mapped to a coarse status label.

use std::fmt;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::summary::{ErrorSummary, Recommendation};
use crate::types::timestamp;

pub const MAX_HEALTH_SCORE: u32 = 100;

/// Penalty per error in the last 24 hours, capped at `DAY_PENALTY_CAP`
pub const DAY_PENALTY_PER_ERROR: i64 = 5;
pub const DAY_PENALTY_CAP: i64 = 30;
/// Penalty per error in the last 7 days, capped at `WEEK_PENALTY_CAP`
pub const WEEK_PENALTY_PER_ERROR: i64 = 2;
pub const WEEK_PENALTY_CAP: i64 = 40;
/// Uncapped penalty per critical error in the last 24 hours
pub const CRITICAL_PENALTY: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Critical,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl HealthStatus {
    pub fn from_score(score: u32) -> Self {
        match score {
            90.. => HealthStatus::Excellent,
            75..=89 => HealthStatus::Good,
            60..=74 => HealthStatus::Fair,
            40..=59 => HealthStatus::Poor,
            _ => HealthStatus::Critical,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthStatus::Excellent => "excellent",
            HealthStatus::Good => "good",
            HealthStatus::Fair => "fair",
            HealthStatus::Poor => "poor",
            HealthStatus::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Score from error counts. Never below zero.
pub fn health_score(errors_24h: usize, errors_7d: usize, critical_24h: usize) -> u32 {
    let errors_24h = i64::try_from(errors_24h).unwrap_or(i64::MAX);
    let errors_7d = i64::try_from(errors_7d).unwrap_or(i64::MAX);
    let critical_24h = i64::try_from(critical_24h).unwrap_or(i64::MAX);

    let score = i64::from(MAX_HEALTH_SCORE)
        - errors_24h
            .saturating_mul(DAY_PENALTY_PER_ERROR)
            .min(DAY_PENALTY_CAP)
        - errors_7d
            .saturating_mul(WEEK_PENALTY_PER_ERROR)
            .min(WEEK_PENALTY_CAP);
    let score = score.saturating_sub(critical_24h.saturating_mul(CRITICAL_PENALTY));

    score.max(0) as u32
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Local>,
    pub health_score: u32,
    pub health_status: HealthStatus,
    pub summary_24h: ErrorSummary,
    pub summary_7d: ErrorSummary,
    pub total_tracked_errors: usize,
    pub monitoring_active: bool,
    pub recommendations: Vec<Recommendation>,
}

impl HealthReport {
    /// Assembles a report from the 24-hour and 7-day summaries.
    pub fn new(
        timestamp: DateTime<Local>,
        summary_24h: ErrorSummary,
        summary_7d: ErrorSummary,
        total_tracked_errors: usize,
    ) -> Self {
        let health_score = health_score(
            summary_24h.total_errors,
            summary_7d.total_errors,
            summary_24h.critical_errors.len(),
        );
        let recommendations = summary_7d.recommendations.clone();

        Self {
            timestamp,
            health_score,
            health_status: HealthStatus::from_score(health_score),
            summary_24h,
            summary_7d,
            total_tracked_errors,
            monitoring_active: true,
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_without_errors() {
        assert_eq!(health_score(0, 0, 0), 100);
        assert_eq!(HealthStatus::from_score(100), HealthStatus::Excellent);
    }

    #[test]
    fn test_penalties_are_capped() {
        // 1 error in 24h (also in 7d): 100 - 5 - 2
        assert_eq!(health_score(1, 1, 0), 93);
        // 10 errors: 100 - 30 - 20
        assert_eq!(health_score(10, 10, 0), 50);
        // volume penalties top out at 70
        assert_eq!(health_score(500, 500, 0), 30);
        // one critical in 24h: 100 - 5 - 2 - 10
        assert_eq!(health_score(1, 1, 1), 83);
    }

    #[test]
    fn test_score_clamps_at_zero() {
        assert_eq!(health_score(1000, 1000, 1000), 0);
        assert_eq!(health_score(usize::MAX, usize::MAX, usize::MAX), 0);
    }

    #[test]
    fn test_status_breakpoints() {
        assert_eq!(HealthStatus::from_score(90), HealthStatus::Excellent);
        assert_eq!(HealthStatus::from_score(89), HealthStatus::Good);
        assert_eq!(HealthStatus::from_score(75), HealthStatus::Good);
        assert_eq!(HealthStatus::from_score(74), HealthStatus::Fair);
        assert_eq!(HealthStatus::from_score(60), HealthStatus::Fair);
        assert_eq!(HealthStatus::from_score(59), HealthStatus::Poor);
        assert_eq!(HealthStatus::from_score(40), HealthStatus::Poor);
        assert_eq!(HealthStatus::from_score(39), HealthStatus::Critical);
        assert_eq!(HealthStatus::from_score(0), HealthStatus::Critical);
    }
}
