use crate::request::RequestContext;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Color used for any rank that has no explicit entry.
pub const URGENT_COLOR: &str = "#ff1100";

/// The eight syslog-style severities, ranked like Monolog levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl Severity {
    pub const ALL: [Severity; 8] = [
        Severity::Emergency,
        Severity::Alert,
        Severity::Critical,
        Severity::Error,
        Severity::Warning,
        Severity::Notice,
        Severity::Info,
        Severity::Debug,
    ];

    /// Numeric rank; higher is more severe.
    pub fn rank(self) -> u16 {
        match self {
            Severity::Debug => 100,
            Severity::Info => 200,
            Severity::Notice => 250,
            Severity::Warning => 300,
            Severity::Error => 400,
            Severity::Critical => 500,
            Severity::Alert => 550,
            Severity::Emergency => 600,
        }
    }

    pub fn from_rank(rank: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.rank() == rank)
    }

    /// Display name, e.g. `"Warning"`.
    pub fn name(self) -> &'static str {
        match self {
            Severity::Debug => "Debug",
            Severity::Info => "Info",
            Severity::Notice => "Notice",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Critical => "Critical",
            Severity::Alert => "Alert",
            Severity::Emergency => "Emergency",
        }
    }

    pub fn color(self) -> &'static str {
        level_color(self.rank())
    }
}

/// Badge color for a severity rank. Unknown ranks get [`URGENT_COLOR`].
pub fn level_color(rank: u16) -> &'static str {
    match Severity::from_rank(rank) {
        Some(Severity::Emergency | Severity::Alert | Severity::Critical | Severity::Error) => {
            URGENT_COLOR
        }
        Some(Severity::Warning) => "#ffc400",
        Some(Severity::Notice) => "#00aeff",
        Some(Severity::Info) => "#48d62f",
        Some(Severity::Debug) => "#000000",
        None => URGENT_COLOR,
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown severity: {0}")]
pub struct ParseSeverityError(pub String);

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "emergency" | "emerg" => Ok(Severity::Emergency),
            "alert" => Ok(Severity::Alert),
            "critical" | "crit" => Ok(Severity::Critical),
            "error" | "err" => Ok(Severity::Error),
            "warning" | "warn" => Ok(Severity::Warning),
            "notice" => Ok(Severity::Notice),
            "info" => Ok(Severity::Info),
            "debug" | "trace" => Ok(Severity::Debug),
            _ => Err(ParseSeverityError(s.to_string())),
        }
    }
}

impl From<tracing::Level> for Severity {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::ERROR => Severity::Error,
            tracing::Level::WARN => Severity::Warning,
            tracing::Level::INFO => Severity::Info,
            _ => Severity::Debug,
        }
    }
}

/// A log event ready to be formatted.
///
/// `formatted` is the pre-rendered full line (timestamp, target, fields)
/// and `message` the bare message used in the card title. The ambient
/// request is captured at event time because delivery happens on a
/// different task.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
    pub formatted: String,
    pub target: String,
    pub fields: BTreeMap<String, serde_json::Value>,
    pub request: Option<RequestContext>,
}

impl LogRecord {
    /// Build a record stamped with the current time. `formatted` starts
    /// out equal to `message`.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            timestamp: Utc::now(),
            severity,
            formatted: message.clone(),
            message,
            target: String::new(),
            fields: BTreeMap::new(),
            request: None,
        }
    }

    pub fn with_formatted(mut self, formatted: impl Into<String>) -> Self {
        self.formatted = formatted.into();
        self
    }

    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = Some(request);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
