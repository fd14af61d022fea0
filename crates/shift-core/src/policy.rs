//! Per-shift declarative policy
//!
//! Everything a shift definition declares up front: description,
//! transaction mode, progress preference, throttle, allow-listed hosts,
//! log suppression. Built once when the definition is registered and passed
//! by value into every run; never mutated afterward.

use crate::error::Result;
use crate::transaction::TransactionMode;
use std::time::Duration;

/// Immutable declaration attached to one shift definition.
#[derive(Debug, Clone, Default)]
pub struct ShiftPolicy {
    /// Human-readable label for headers and logs
    pub description: String,

    /// How transactions wrap the run
    pub transaction: TransactionMode,

    /// Progress bar preference; `None` defers to the engine config
    pub progress: Option<bool>,

    /// Fixed delay between records
    pub throttle: Option<Duration>,

    /// Hosts this shift may call during a dry run
    pub allowed_hosts: Vec<String>,

    /// Log dedup preference; `None` defers to the engine config
    pub suppress_repeated_logs: Option<bool>,

    /// Operator has acknowledged `None` mode; skips the forced delay
    pub acknowledge_unsafe: bool,
}

impl ShiftPolicy {
    pub fn builder() -> ShiftPolicyBuilder {
        ShiftPolicyBuilder::default()
    }

    /// Label for operator output; falls back when no description was given.
    pub fn label(&self) -> &str {
        if self.description.is_empty() {
            "unnamed shift"
        } else {
            &self.description
        }
    }
}

/// Builder mirroring the declarative surface of a shift definition.
#[derive(Debug, Default)]
pub struct ShiftPolicyBuilder {
    policy: ShiftPolicy,
}

impl ShiftPolicyBuilder {
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.policy.description = text.into();
        self
    }

    pub fn transaction(mut self, mode: TransactionMode) -> Self {
        self.policy.transaction = mode;
        self
    }

    /// Parse a declared mode string; invalid values are a configuration
    /// error raised at definition time, before any run starts.
    pub fn transaction_str(mut self, mode: &str) -> Result<Self> {
        self.policy.transaction = mode.parse()?;
        Ok(self)
    }

    pub fn progress(mut self, enabled: bool) -> Self {
        self.policy.progress = Some(enabled);
        self
    }

    pub fn throttle(mut self, delay: Duration) -> Self {
        self.policy.throttle = Some(delay);
        self
    }

    pub fn allow_external_requests(mut self, hosts: Vec<String>) -> Self {
        self.policy.allowed_hosts = hosts;
        self
    }

    pub fn suppress_repeated_logs(mut self, suppress: bool) -> Self {
        self.policy.suppress_repeated_logs = Some(suppress);
        self
    }

    pub fn acknowledge_unsafe(mut self, acknowledged: bool) -> Self {
        self.policy.acknowledge_unsafe = acknowledged;
        self
    }

    pub fn build(self) -> ShiftPolicy {
        self.policy
    }
}
