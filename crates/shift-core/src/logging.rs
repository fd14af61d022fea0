//! Tracing setup for runner processes
//!
//! Engine internals log through `tracing`; operator-facing run output
//! (header, status blocks, summary) goes to stdout separately. Hosts call
//! [`init_logging`] once at startup.

use crate::error::{Result, ShiftError};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Severity used across the engine's log surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ShiftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(ShiftError::config(format!("unknown log level '{other}'"))),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output shape of the tracing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ShiftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(ShiftError::config(format!("unknown log format '{other}'"))),
        }
    }
}

/// How the tracing subscriber is wired up.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Extra filter directives, e.g. "rusqlite=warn,shift_core=debug"
    pub filter_directives: Option<String>,
}

impl LogConfig {
    /// Read `LOG_LEVEL`, `LOG_FORMAT`, and `LOG_FILTER`; defaults for
    /// anything unset.
    pub fn from_env() -> Result<Self> {
        let level = match std::env::var("LOG_LEVEL") {
            Ok(raw) => raw.parse()?,
            Err(_) => LogLevel::default(),
        };
        let format = match std::env::var("LOG_FORMAT") {
            Ok(raw) => raw.parse()?,
            Err(_) => LogFormat::default(),
        };
        let filter_directives = std::env::var("LOG_FILTER").ok();

        Ok(Self {
            level,
            format,
            filter_directives,
        })
    }
}

/// Set the global tracing subscriber; call once at process startup.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let mut filter =
        EnvFilter::from_default_env().add_directive(config.level.to_tracing_level().into());
    if let Some(directives) = &config.filter_directives {
        for directive in directives.split(',') {
            let parsed = directive.trim().parse().map_err(|e| {
                ShiftError::config(format!("bad log filter directive '{directive}': {e}"))
            })?;
            filter = filter.add_directive(parsed);
        }
    }

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Text => registry.with(fmt_layer).try_init(),
        LogFormat::Json => registry.with(fmt_layer.json()).try_init(),
    }
    .map_err(|e| ShiftError::config(format!("logging already initialized: {e}")))
}
