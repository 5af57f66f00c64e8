//! Structured logging for the latency tester
//!
//! This module provides:
//! - Structured logging with multiple levels and contexts
//! - Debug mode detailed tracing with source locations
//! - Phase timing and statistics logging
//! - Error event logging with correlation IDs
//! - JSON structured output for integration with log aggregators
//!
//! When the report itself is JSON on stdout, every log line goes to stderr.

use crate::error::{AppError, Result};
use crate::executor::PhaseConfig;
use crate::models::{Config, Statistics};
use crate::types::{IpFamily, ProbeKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level - most detailed
    Trace = 0,
    /// Debug level - detailed information for debugging
    Debug = 1,
    /// Info level - general application information
    Info = 2,
    /// Warning level - potentially harmful situations
    Warn = 3,
    /// Error level - error events but application can continue
    Error = 4,
    /// Fatal level - severe error events that cause application termination
    Fatal = 5,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",
            LogLevel::Debug => "\x1b[36m",
            LogLevel::Info => "\x1b[32m",
            LogLevel::Warn => "\x1b[33m",
            LogLevel::Error => "\x1b[31m",
            LogLevel::Fatal => "\x1b[35m",
        }
    }

    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Correlation ID for tracking related events
    pub correlation_id: Option<String>,
    pub fields: HashMap<String, serde_json::Value>,
    pub thread_id: Option<String>,
    pub location: Option<LogLocation>,
}

/// Source code location information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLocation {
    pub file: String,
    pub line: u32,
    pub module: Option<String>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
    /// Compact single-line format
    Compact,
}

/// How and where log lines are written
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub min_level: LogLevel,
    pub use_color: bool,
    pub include_location: bool,
    pub format: LogFormat,
    /// Send every line to stderr, keeping stdout for the report
    pub stderr_only: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Warn,
            use_color: true,
            include_location: false,
            format: LogFormat::Console,
            stderr_only: false,
        }
    }
}

impl LogSettings {
    /// `--debug` logs everything as JSON with locations, `--verbose` logs
    /// info and above, otherwise only warnings and errors.
    pub fn from_config(config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            include_location: config.debug,
            format: if config.debug { LogFormat::Json } else { LogFormat::Console },
            stderr_only: config.json_output,
        }
    }
}

/// Shared logging context for correlation and session tracking
#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
    current_correlation_id: Option<String>,
}

/// Logger implementation with multiple output formats
pub struct Logger {
    settings: LogSettings,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    /// Logger with info level, console format
    pub fn new(name: String) -> Self {
        Self::with_settings(
            name,
            LogSettings {
                min_level: LogLevel::Info,
                ..LogSettings::default()
            },
        )
    }

    pub fn with_settings(name: String, settings: LogSettings) -> Self {
        Self {
            settings,
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    pub fn with_config(name: String, config: &Config) -> Self {
        Self::with_settings(name, LogSettings::from_config(config))
    }

    fn with_session(name: &str, settings: &LogSettings, session_id: &str) -> Self {
        Self {
            settings: settings.clone(),
            name: name.to_string(),
            context: Arc::new(RwLock::new(LogContext {
                session_id: Some(session_id.to_string()),
                ..LogContext::default()
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start a correlated operation
    pub async fn start_operation(&self, operation_name: &str) -> String {
        let correlation_id = Uuid::new_v4().to_string();
        {
            let mut context = self.context.write().await;
            context.current_correlation_id = Some(correlation_id.clone());
        }

        self.debug(&format!("Started operation: {}", operation_name))
            .correlation_id(&correlation_id)
            .field("operation", operation_name)
            .field("operation_type", "start")
            .log()
            .await;

        correlation_id
    }

    pub async fn end_operation(&self, correlation_id: &str, operation_name: &str, success: bool) {
        self.debug(&format!("Completed operation: {} (success: {})", operation_name, success))
            .correlation_id(correlation_id)
            .field("operation", operation_name)
            .field("operation_type", "end")
            .field("success", success)
            .log()
            .await;

        let mut context = self.context.write().await;
        if context.current_correlation_id.as_deref() == Some(correlation_id) {
            context.current_correlation_id = None;
        }
    }

    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.settings.min_level
    }

    async fn write_entry(&self, entry: LogEntry) {
        let to_stderr = self.settings.stderr_only || entry.level >= LogLevel::Warn;
        let Some(output) = self.render(entry).await else {
            return;
        };

        if to_stderr {
            let _ = writeln!(io::stderr(), "{}", output);
        } else {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }

    /// The line `entry` produces, or `None` below the minimum level
    async fn render(&self, mut entry: LogEntry) -> Option<String> {
        if !self.would_log(entry.level) {
            return None;
        }

        let context = self.context.read().await;
        if let Some(session_id) = &context.session_id {
            entry.fields.insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
        }
        if entry.correlation_id.is_none() {
            entry.correlation_id = context.current_correlation_id.clone();
        }
        drop(context);

        if !self.settings.include_location {
            entry.location = None;
        }

        Some(match self.settings.format {
            LogFormat::Console => self.format_console(&entry),
            LogFormat::Json => self.format_json(&entry),
            LogFormat::Compact => self.format_compact(&entry),
        })
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.settings.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}", timestamp, formatted_level, entry.logger, entry.message);

        if let Some(correlation_id) = &entry.correlation_id {
            let short = correlation_id.get(..8).unwrap_or(correlation_id);
            output.push_str(&format!(" [{}]", short));
        }

        if !entry.fields.is_empty() {
            let mut fields_str: Vec<String> = entry.fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            fields_str.sort();
            output.push_str(&format!(" {{{}}}", fields_str.join(", ")));
        }

        if let Some(location) = &entry.location {
            output.push_str(&format!(" @ {}:{}", location.file, location.line));
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => serde_json::json!({
                "error": "Failed to serialize log entry",
                "message": entry.message,
            })
            .to_string(),
        }
    }

    fn format_compact(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S");
        format!(
            "{} {} {}: {}",
            timestamp,
            entry.level.as_str().chars().next().unwrap_or('?'),
            entry.logger,
            entry.message
        )
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: HashMap::new(),
                thread_id: std::thread::current().name().map(String::from),
                location: None,
            },
        }
    }

    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    pub fn location(mut self, file: &str, line: u32, module: Option<&str>) -> Self {
        self.entry.location = Some(LogLocation {
            file: file.to_string(),
            line,
            module: module.map(String::from),
        });
        self
    }

    /// Identify the probe this entry belongs to
    pub fn probe(self, kind: ProbeKind, family: IpFamily, target: &IpAddr, seq: u32) -> Self {
        self.field("protocol", kind.as_str())
            .field("family", family.label())
            .field("target", target.to_string())
            .field("seq", seq)
    }

    /// Attach the summary values of a statistics reduction
    pub fn statistics(self, stats: &Statistics) -> Self {
        self.field("sent", stats.sent)
            .field("received", stats.received)
            .field("lost", stats.lost)
            .field("success_rate", stats.success_rate)
            .field("min_ms", ms(stats.min))
            .field("avg_ms", ms(stats.avg))
            .field("max_ms", ms(stats.max))
            .field("stddev_ms", ms(stats.stddev))
            .field("jitter_ms", ms(stats.jitter))
    }

    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
            .field("error_exit_code", error.exit_code())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

fn ms(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1e6
}

/// Phase timing and statistics
pub struct PerformanceLogger {
    logger: Logger,
}

impl PerformanceLogger {
    pub fn new(config: &Config) -> Self {
        Self::with_settings(&LogSettings::from_config(config))
    }

    pub fn with_settings(settings: &LogSettings) -> Self {
        Self {
            logger: Logger::with_settings("PERF".to_string(), settings.clone()),
        }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// One family/protocol phase finished
    pub async fn log_phase_complete(&self, phase: &PhaseConfig, elapsed: Duration, stats: &Statistics) {
        let message = format!(
            "{} {} phase against {} completed in {:.3}s: {}/{} successful, avg {:.3}ms",
            phase.kind,
            phase.family,
            phase.target,
            elapsed.as_secs_f64(),
            stats.received,
            stats.sent,
            stats.avg_ms()
        );

        self.logger
            .info(&message)
            .field("protocol", phase.kind.as_str())
            .field("family", phase.family.label())
            .field("target", phase.target.to_string())
            .field("port", phase.port)
            .field("duration_ms", ms(elapsed))
            .statistics(stats)
            .log()
            .await;
    }

    /// Completion of a whole run with a performance summary
    pub async fn log_operation_complete(&self, operation_name: &str, duration: Duration, probe_count: usize) {
        let message = format!(
            "Operation '{}' completed: {} probes in {:.3}s",
            operation_name,
            probe_count,
            duration.as_secs_f64()
        );

        self.logger
            .info(&message)
            .field("operation", operation_name)
            .field("duration_ms", ms(duration))
            .field("probe_count", probe_count)
            .field("operation_type", "completed")
            .log()
            .await;
    }
}

/// Resolution, probe outcomes and ICMP privilege escalation
pub struct NetworkLogger {
    logger: Logger,
}

impl NetworkLogger {
    /// Logger with default settings (warnings and errors only)
    pub fn new() -> Self {
        Self::with_settings(&LogSettings::default())
    }

    pub fn with_settings(settings: &LogSettings) -> Self {
        Self {
            logger: Logger::with_settings("NET".to_string(), settings.clone()),
        }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub async fn log_resolution(&self, host: &str, addrs: &[IpAddr], duration: Duration) {
        let rendered: Vec<String> = addrs.iter().map(|a| a.to_string()).collect();
        self.logger
            .info(&format!("Resolved {} to [{}]", host, rendered.join(", ")))
            .field("host", host)
            .field("addresses", &rendered)
            .field("duration_ms", ms(duration))
            .log()
            .await;
    }

    pub async fn log_resolution_failure(&self, host: &str, error: &AppError) {
        self.logger
            .warn(&format!("Resolution of {} failed: {}", host, error))
            .field("host", host)
            .error_info(error)
            .log()
            .await;
    }

    /// A permission error moved the ICMP probe one step down the chain
    pub async fn log_icmp_fallback(&self, family: IpFamily, from: &str, to: &str, cause: &AppError) {
        self.logger
            .info(&format!("{} {} not permitted, falling back to {}", family, from, to))
            .field("family", family.label())
            .field("from", from)
            .field("to", to)
            .field("cause", cause.to_string())
            .log()
            .await;
    }
}

impl Default for NetworkLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// Error event logger with enhanced context
pub struct ErrorEventLogger {
    logger: Logger,
}

impl ErrorEventLogger {
    pub fn new(config: &Config) -> Self {
        Self::with_settings(&LogSettings::from_config(config))
    }

    pub fn with_settings(settings: &LogSettings) -> Self {
        Self {
            logger: Logger::with_settings("ERR".to_string(), settings.clone()),
        }
    }

    /// Log an application error with full context
    pub async fn log_error(&self, error: &AppError, context: Option<&str>, correlation_id: Option<&str>) {
        let message = match context {
            Some(ctx) => format!("{}: {}", ctx, error),
            None => error.to_string(),
        };

        let mut builder = self.logger.error(&message).error_info(error);

        if let Some(id) = correlation_id {
            builder = builder.correlation_id(id);
        }
        if let Some(ctx) = context {
            builder = builder.field("context", ctx);
        }

        builder.log().await;
    }
}

/// Creates loggers that share one settings value and session id
#[derive(Debug, Clone)]
pub struct LoggerFactory {
    settings: LogSettings,
    session_id: String,
}

impl LoggerFactory {
    /// Factory with default settings
    pub fn new() -> Self {
        Self::with_settings(LogSettings::default())
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_settings(LogSettings::from_config(config))
    }

    pub fn with_settings(settings: LogSettings) -> Self {
        Self {
            settings,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn create_logger(&self, name: &str) -> Logger {
        Logger::with_session(name, &self.settings, &self.session_id)
    }

    pub fn create_performance_logger(&self) -> PerformanceLogger {
        PerformanceLogger {
            logger: self.create_logger("PERF"),
        }
    }

    pub fn create_network_logger(&self) -> NetworkLogger {
        NetworkLogger {
            logger: self.create_logger("NET"),
        }
    }

    pub fn create_error_logger(&self) -> ErrorEventLogger {
        ErrorEventLogger {
            logger: self.create_logger("ERR"),
        }
    }

    pub fn settings(&self) -> &LogSettings {
        &self.settings
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Default for LoggerFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Start an entry on `$logger` stamped with the caller's file and line.
///
/// Evaluates to a [`LogEntryBuilder`] so fields can still be chained before
/// `.log().await`. The location is dropped unless `include_location` is set.
#[macro_export]
macro_rules! log_at {
    ($logger:expr, $level:expr, $($arg:tt)*) => {
        $logger
            .log($level, &format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $crate::log_at!($logger, $crate::logging::LogLevel::Debug, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $crate::log_at!($logger, $crate::logging::LogLevel::Info, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $crate::log_at!($logger, $crate::logging::LogLevel::Warn, $($arg)*)
    };
}
