//! Engine configuration
//!
//! Process-wide defaults for a shift runner: globally allowed external
//! hosts, log deduplication, progress rendering, and the status interval.
//! The config is built once at startup and passed explicitly into the
//! engine; nothing here is global state.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Engine Configuration Constants
// ============================================================================

/// Default cap on distinct messages tracked by the log deduplicator.
pub const DEFAULT_DEDUP_CAP: usize = 500;

/// Default operator-confirmation delay before a live run in `None`
/// transaction mode proceeds.
pub const DEFAULT_UNSAFE_MODE_DELAY: Duration = Duration::from_secs(10);

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hosts every shift may call during a dry run (exact or `*.` patterns)
    pub allowed_hosts: Vec<String>,

    /// Forward repeated log lines once and count the rest
    pub suppress_repeated_logs: bool,

    /// Maximum distinct messages the deduplicator tracks
    pub dedup_cap: usize,

    /// Render a progress bar by default (shifts may override)
    pub progress: bool,

    /// Print an interim status block every interval, if set
    pub status_interval: Option<Duration>,

    /// Wrap even `None`-mode dry runs in a rollback transaction
    pub strict_unwrapped_dry_run: bool,

    /// Delay before a live `None`-mode run proceeds
    #[serde(skip, default = "default_unsafe_delay")]
    pub unsafe_mode_delay: Duration,
}

fn default_unsafe_delay() -> Duration {
    DEFAULT_UNSAFE_MODE_DELAY
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: Vec::new(),
            suppress_repeated_logs: true,
            dedup_cap: DEFAULT_DEDUP_CAP,
            progress: true,
            status_interval: None,
            strict_unwrapped_dry_run: false,
            unsafe_mode_delay: DEFAULT_UNSAFE_MODE_DELAY,
        }
    }
}

impl EngineConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `SHIFT_ALLOWED_HOSTS`: comma-separated host allow-list
    /// - `SHIFT_SUPPRESS_REPEATED_LOGS`: true/false
    /// - `SHIFT_DEDUP_CAP`: maximum tracked messages
    /// - `SHIFT_PROGRESS`: true/false
    /// - `SHIFT_STATUS_INTERVAL`: seconds between interim status blocks
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(hosts) = std::env::var("SHIFT_ALLOWED_HOSTS") {
            config.allowed_hosts = hosts
                .split(',')
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .collect();
        }

        if let Ok(val) = std::env::var("SHIFT_SUPPRESS_REPEATED_LOGS") {
            config.suppress_repeated_logs = val.parse().unwrap_or(true);
        }

        if let Ok(val) = std::env::var("SHIFT_DEDUP_CAP") {
            if let Ok(cap) = val.parse() {
                config.dedup_cap = cap;
            }
        }

        if let Ok(val) = std::env::var("SHIFT_PROGRESS") {
            config.progress = val.parse().unwrap_or(true);
        }

        if let Ok(val) = std::env::var("SHIFT_STATUS_INTERVAL") {
            if let Ok(secs) = val.parse::<u64>() {
                config.status_interval = Some(Duration::from_secs(secs));
            }
        }

        Ok(config)
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

/// Builder for EngineConfig
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn allowed_hosts(mut self, hosts: Vec<String>) -> Self {
        self.config.allowed_hosts = hosts;
        self
    }

    pub fn suppress_repeated_logs(mut self, suppress: bool) -> Self {
        self.config.suppress_repeated_logs = suppress;
        self
    }

    pub fn dedup_cap(mut self, cap: usize) -> Self {
        self.config.dedup_cap = cap;
        self
    }

    pub fn progress(mut self, progress: bool) -> Self {
        self.config.progress = progress;
        self
    }

    pub fn status_interval(mut self, interval: Duration) -> Self {
        self.config.status_interval = Some(interval);
        self
    }

    pub fn strict_unwrapped_dry_run(mut self, strict: bool) -> Self {
        self.config.strict_unwrapped_dry_run = strict;
        self
    }

    pub fn unsafe_mode_delay(mut self, delay: Duration) -> Self {
        self.config.unsafe_mode_delay = delay;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}
