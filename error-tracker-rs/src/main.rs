//! Error tracker CLI.
//!
//! # Examples
//!
//! ```bash
//! # record a failed API call
//! error-tracker api --endpoint /info/offer --status 500 --message "Internal server error"
//!
//! # 7-day summary and full health report
//! error-tracker summary --days 7
//! error-tracker report
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use error_tracker::{ErrorReport, ErrorTracker, Severity, TrackerConfig, UserImpact};

#[derive(Parser)]
#[command(name = "error-tracker")]
#[command(about = "Track errors and report system health", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory for errors.json, metrics.json and system.log
    #[arg(long, global = true, env = "ERROR_TRACKER_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Do not echo tracked events to stderr
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track a generic error
    Track {
        #[arg(long = "type")]
        error_type: String,

        #[arg(long)]
        component: String,

        #[arg(long)]
        message: String,

        /// critical, high, medium or low
        #[arg(long, default_value = "medium")]
        severity: String,

        /// high, medium, low, none or unknown
        #[arg(long, default_value = "unknown")]
        impact: String,

        /// JSON object with extra details
        #[arg(long)]
        details: Option<String>,
    },

    /// Track a failed API call
    Api {
        #[arg(long)]
        endpoint: String,

        #[arg(long)]
        status: u16,

        #[arg(long)]
        message: String,

        /// Response time in seconds
        #[arg(long)]
        response_time: Option<f64>,
    },

    /// Track a documentation problem
    Doc {
        #[arg(long)]
        file: String,

        /// Kind of documentation problem, e.g. missing_example
        #[arg(long)]
        kind: String,

        #[arg(long)]
        message: String,
    },

    /// Track a validation failure
    Validation {
        #[arg(long)]
        kind: String,

        #[arg(long)]
        message: String,

        /// JSON value with the offending data
        #[arg(long)]
        data: Option<String>,
    },

    /// Print the error summary for the last N days
    Summary {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },

    /// Print the health report
    Report,

    /// Track one sample error of each kind, then print the health report
    Demo,
}

#[derive(Serialize)]
struct Tracked {
    id: error_tracker::EventId,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = TrackerConfig::from_env();
    if let Some(dir) = cli.log_dir {
        config.log_dir = dir;
    }
    if cli.quiet {
        config.console_output = false;
    }

    let tracker = ErrorTracker::new(config);

    match cli.command {
        Commands::Track {
            error_type,
            component,
            message,
            severity,
            impact,
            details,
        } => {
            let details = match details {
                Some(raw) => serde_json::from_str(&raw).context("--details must be a JSON object")?,
                None => serde_json::Map::new(),
            };
            let impact: UserImpact = impact.parse()?;
            let report = ErrorReport::new(error_type, component, message)
                .severity(Severity::parse_lenient(&severity))
                .user_impact(impact)
                .details(details);
            print_json(&Tracked {
                id: tracker.track(report),
            })?;
        }
        Commands::Api {
            endpoint,
            status,
            message,
            response_time,
        } => {
            let id = tracker.track_api_error(&endpoint, status, &message, response_time);
            print_json(&Tracked { id })?;
        }
        Commands::Doc {
            file,
            kind,
            message,
        } => {
            let id = tracker.track_documentation_error(&file, &kind, &message);
            print_json(&Tracked { id })?;
        }
        Commands::Validation {
            kind,
            message,
            data,
        } => {
            let data = data
                .map(|raw| serde_json::from_str(&raw))
                .transpose()
                .context("--data must be valid JSON")?;
            let id = tracker.track_validation_error(&kind, &message, data);
            print_json(&Tracked { id })?;
        }
        Commands::Summary { days } => {
            print_json(&tracker.get_error_summary(days))?;
        }
        Commands::Report => {
            print_json(&tracker.generate_health_report())?;
        }
        Commands::Demo => {
            tracker.track_api_error("/info/offer", 500, "Internal server error", Some(2.5));
            tracker.track_documentation_error(
                "docs/endpoints/offer.md",
                "missing_example",
                "No response example provided",
            );
            tracker.track_validation_error(
                "schema_validation",
                "Invalid JSON schema",
                Some(serde_json::json!({"field": "datePreset"})),
            );

            let report = tracker.generate_health_report();
            eprintln!(
                "Health Score: {}/100 ({})",
                report.health_score, report.health_status
            );
            eprintln!("24h Errors: {}", report.summary_24h.total_errors);
            eprintln!("7d Errors: {}", report.summary_7d.total_errors);
            print_json(&report)?;
        }
    }

    Ok(())
}
