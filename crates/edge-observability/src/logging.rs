//! Structured logging with request context.
//!
//! Log lines are emitted as `tracing` events. [`init_logging`] installs a
//! subscriber that writes them to stderr, which Spin captures.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use edge_core::{LogConfig, RequestId};
use tracing_subscriber::EnvFilter;

use crate::metrics::RequestMetrics;

/// Log level for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a level name (case-insensitive).
    pub fn parse(level: &str) -> Option<Self> {
        match level.to_ascii_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    fn as_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Output format for logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON format (for production/log aggregation).
    #[default]
    Json,
    /// Human-readable format (for development).
    Human,
}

impl LogFormat {
    /// Parse a format name. Unknown names give JSON.
    pub fn parse(format: &str) -> Self {
        match format.to_ascii_lowercase().as_str() {
            "human" => Self::Human,
            _ => Self::Json,
        }
    }
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed, which is expected
/// when a component instance serves more than one request.
pub fn init_logging(format: LogFormat, level: LogLevel) -> bool {
    let filter = EnvFilter::new(level.as_directive());
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(filter);

    match format {
        LogFormat::Json => builder.json().flatten_event(true).try_init().is_ok(),
        LogFormat::Human => builder.compact().try_init().is_ok(),
    }
}

/// Install the global subscriber from workload configuration.
pub fn init_logging_from_config(config: &LogConfig) -> bool {
    init_logging(
        LogFormat::parse(&config.format),
        LogLevel::parse(&config.level).unwrap_or(LogLevel::Info),
    )
}

/// A structured log entry.
#[derive(Debug, Clone)]
struct LogEntry {
    level: LogLevel,
    message: String,
    request_id: String,
    workload: Option<String>,
    route: Option<String>,
    fields: BTreeMap<String, serde_json::Value>,
    elapsed_us: u64,
}

impl LogEntry {
    /// Format the extra fields as a JSON object.
    fn fields_json(&self) -> String {
        serde_json::to_string(&self.fields).unwrap_or_default()
    }
}

/// Structured logger with request context.
///
/// Every line carries the request ID, workload and route so a request can
/// be followed across log aggregation.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    request_id: RequestId,
    workload: Option<String>,
    route: Option<String>,
    start_time: Instant,
}

impl StructuredLogger {
    /// Create a new logger with request context.
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            workload: None,
            route: None,
            start_time: Instant::now(),
        }
    }

    /// Set the workload name.
    pub fn with_workload(mut self, workload: impl Into<String>) -> Self {
        self.workload = Some(workload.into());
        self
    }

    /// Set the route path.
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Log at info level.
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message, BTreeMap::new());
    }

    /// Emit the completion line for a request.
    ///
    /// The message is the one-line summary; the `metrics` field holds the
    /// same data as JSON for aggregation.
    pub fn log_metrics(&self, metrics: &RequestMetrics) {
        tracing::info!(
            request_id = %self.request_id,
            workload = self.workload.as_deref().unwrap_or_default(),
            route = self.route.as_deref().unwrap_or_default(),
            elapsed_us = self.elapsed_us(),
            metrics = %metrics.to_json(),
            "Request complete: {}",
            metrics.to_summary()
        );
    }

    fn entry(
        &self,
        level: LogLevel,
        message: &str,
        fields: BTreeMap<String, serde_json::Value>,
    ) -> LogEntry {
        LogEntry {
            level,
            message: message.to_string(),
            request_id: self.request_id.to_string(),
            workload: self.workload.clone(),
            route: self.route.clone(),
            fields,
            elapsed_us: self.elapsed_us(),
        }
    }

    fn log(&self, level: LogLevel, message: &str, fields: BTreeMap<String, serde_json::Value>) {
        let entry = self.entry(level, message, fields);

        macro_rules! emit {
            ($level:expr) => {
                tracing::event!(
                    $level,
                    request_id = %entry.request_id,
                    workload = entry.workload.as_deref().unwrap_or_default(),
                    route = entry.route.as_deref().unwrap_or_default(),
                    elapsed_us = entry.elapsed_us,
                    fields = %entry.fields_json(),
                    "{}",
                    entry.message
                )
            };
        }

        match entry.level {
            LogLevel::Trace => emit!(tracing::Level::TRACE),
            LogLevel::Debug => emit!(tracing::Level::DEBUG),
            LogLevel::Info => emit!(tracing::Level::INFO),
            LogLevel::Warn => emit!(tracing::Level::WARN),
            LogLevel::Error => emit!(tracing::Level::ERROR),
        }
    }

    /// Microseconds since the logger was created.
    pub fn elapsed_us(&self) -> u64 {
        micros(self.start_time.elapsed())
    }
}

/// Whole microseconds in `duration`, saturating.
pub(crate) fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// Builder for log entries with fluent API.
pub struct LogBuilder<'a> {
    logger: &'a StructuredLogger,
    level: LogLevel,
    message: String,
    fields: BTreeMap<String, serde_json::Value>,
}

impl<'a> LogBuilder<'a> {
    /// Create a new log builder.
    pub fn new(logger: &'a StructuredLogger, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            logger,
            level,
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Add a string field.
    pub fn field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields
            .insert(key.to_string(), serde_json::json!(value.into()));
        self
    }

    /// Add an integer field.
    pub fn field_i64(mut self, key: &str, value: i64) -> Self {
        self.fields.insert(key.to_string(), serde_json::json!(value));
        self
    }

    /// Add a duration field (in milliseconds).
    pub fn duration_ms(mut self, key: &str, duration: Duration) -> Self {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.fields.insert(key.to_string(), serde_json::json!(millis));
        self
    }

    /// Emit the log entry.
    pub fn emit(self) {
        self.logger.log(self.level, &self.message, self.fields);
    }
}

impl StructuredLogger {
    /// Start building an info log entry.
    pub fn info_builder(&self, message: impl Into<String>) -> LogBuilder<'_> {
        LogBuilder::new(self, LogLevel::Info, message)
    }

    /// Start building an error log entry.
    pub fn error_builder(&self, message: impl Into<String>) -> LogBuilder<'_> {
        LogBuilder::new(self, LogLevel::Error, message)
    }

    /// Start building a debug log entry.
    pub fn debug_builder(&self, message: impl Into<String>) -> LogBuilder<'_> {
        LogBuilder::new(self, LogLevel::Debug, message)
    }
}
