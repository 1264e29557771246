//! # Tracker Logging
//!
//! Every tracker owns a `tracing` dispatcher with two sinks: `system.log` in
//! the tracker's directory, and an optional stderr console sink. Both print
//! one line per event as `timestamp - logger_name - LEVEL - message`.

use std::fmt;

use chrono::Local;
use tracing::field::{Field, Visit};
use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::TrackerConfig;
use crate::types::{ErrorEvent, Severity};

pub const SYSTEM_LOG_FILE: &str = "system.log";

/// Extra `EnvFilter` directives for `system.log`, e.g. `error_tracker::store=debug`.
pub const LOG_FILTER_ENV: &str = "ERROR_TRACKER_LOG";

/// Field carrying a level name `tracing` has no level for (e.g. `CRITICAL`).
const LEVEL_LABEL_FIELD: &str = "level_label";

/// Line format shared by the file and console sinks.
#[derive(Debug, Clone)]
pub struct LineFormat {
    logger_name: String,
}

impl LineFormat {
    pub fn new(logger_name: impl Into<String>) -> Self {
        Self {
            logger_name: logger_name.into(),
        }
    }
}

fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARNING",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    level_label: Option<String>,
    fields: Vec<(&'static str, String)>,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            LEVEL_LABEL_FIELD => self.level_label = Some(value.to_string()),
            name => self.fields.push((name, value.to_string())),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{:?}", value),
            LEVEL_LABEL_FIELD => self.level_label = Some(format!("{:?}", value)),
            name => self.fields.push((name, format!("{:?}", value))),
        }
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);

        let level = visitor
            .level_label
            .as_deref()
            .unwrap_or_else(|| level_name(event.metadata().level()));

        write!(
            writer,
            "{} - {} - {} - {}",
            Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            self.logger_name,
            level,
            visitor.message
        )?;
        for (name, value) in &visitor.fields {
            write!(writer, " {}={}", name, value)?;
        }
        writeln!(writer)
    }
}

fn file_env_filter(config: &TrackerConfig) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(config.file_filter().into())
        .with_env_var(LOG_FILTER_ENV)
        .from_env_lossy()
}

fn console_env_filter(config: &TrackerConfig) -> EnvFilter {
    EnvFilter::default().add_directive(config.console_filter().into())
}

/// Builds the dispatcher for one tracker.
///
/// If `system.log` cannot be opened the tracker still logs to the console.
/// Level settings that do not parse are reported through the new dispatcher.
pub fn build_dispatch(config: &TrackerConfig) -> Dispatch {
    let format = LineFormat::new(config.logger_name.clone());

    let (file_writer, file_error) = match RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(SYSTEM_LOG_FILE)
        .build(&config.log_dir)
    {
        Ok(appender) => (Some(appender), None),
        Err(e) => (None, Some(e.to_string())),
    };

    let file_layer = file_writer.map(|writer| {
        tracing_subscriber::fmt::layer()
            .event_format(format.clone())
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(file_env_filter(config))
    });

    let console_layer = config.console_output.then(|| {
        tracing_subscriber::fmt::layer()
            .event_format(format.clone())
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_filter(console_env_filter(config))
    });

    let dispatch = Dispatch::new(Registry::default().with(file_layer).with(console_layer));

    for (setting, value) in config.invalid_levels() {
        tracing::dispatcher::with_default(&dispatch, || {
            tracing::warn!("Invalid {} '{}', using the default level", setting, value);
        });
    }

    if let Some(error) = file_error {
        tracing::dispatcher::with_default(&dispatch, || {
            tracing::error!(
                "Failed to open {} in {}: {}",
                SYSTEM_LOG_FILE,
                config.log_dir.display(),
                error
            );
        });
    }

    dispatch
}

/// Logs a tracked event at the level its severity maps to.
///
/// critical → ERROR labelled `CRITICAL`, high → ERROR, medium → WARNING,
/// low → INFO.
pub fn log_tracked_event(event: &ErrorEvent) {
    let line = format!("[{}] {}: {}", event.component, event.error_type, event.message);

    match event.severity {
        Severity::Critical => {
            tracing::error!(level_label = "CRITICAL", "{}", line)
        }
        Severity::High => tracing::error!("{}", line),
        Severity::Medium => tracing::warn!("{}", line),
        Severity::Low => tracing::info!("{}", line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorReport;

    fn read_log(dir: &std::path::Path) -> String {
        std::fs::read_to_string(dir.join(SYSTEM_LOG_FILE)).unwrap_or_default()
    }

    #[test]
    fn test_file_sink_line_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TrackerConfig::new(dir.path());
        config.console_output = false;
        config.logger_name = "TestTracker".to_string();

        let dispatch = build_dispatch(&config);
        let event = ErrorEvent::from_report(
            ErrorReport::new("api_error", "api", "API error on /x: down")
                .severity(Severity::Critical),
            Local::now(),
        );
        tracing::dispatcher::with_default(&dispatch, || log_tracked_event(&event));

        let log = read_log(dir.path());
        assert!(log.contains(" - TestTracker - CRITICAL - [api] api_error: API error on /x: down"));
    }

    #[test]
    fn test_file_filter_drops_debug() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TrackerConfig::new(dir.path());
        config.console_output = false;

        let dispatch = build_dispatch(&config);
        tracing::dispatcher::with_default(&dispatch, || {
            tracing::debug!("not written");
            tracing::warn!("written");
        });

        let log = read_log(dir.path());
        assert!(!log.contains("not written"));
        assert!(log.contains("WARNING - written"));
    }

    #[test]
    fn test_invalid_level_is_logged_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TrackerConfig::new(dir.path());
        config.console_output = false;
        config.file_level = "loud".to_string();

        let dispatch = build_dispatch(&config);
        tracing::dispatcher::with_default(&dispatch, || tracing::info!("still at info"));

        let log = read_log(dir.path());
        assert!(log.contains("WARNING - Invalid file_level 'loud', using the default level"));
        assert!(log.contains("INFO - still at info"));
    }
}
