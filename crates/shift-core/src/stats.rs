//! Run-local bookkeeping: counters, recorded errors, checkpoint
//!
//! A `RunContext` is owned exclusively by one in-flight run. It is created
//! at run start, mutated record by record, and discarded after the summary
//! prints. Nothing here is shared across runs.

use crate::transaction::TransactionMode;
use chrono::{DateTime, Utc};
use std::time::Instant;

/// Per-run counters.
///
/// A record counts as exactly one of succeeded, failed, or skipped, so
/// `processed == succeeded + failed + skipped` at all times (and
/// `processed == succeeded + failed` whenever nothing was skipped).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl Stats {
    pub fn record_success(&mut self) {
        self.processed += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self) {
        self.processed += 1;
        self.failed += 1;
    }

    pub fn record_skip(&mut self) {
        self.processed += 1;
        self.skipped += 1;
    }

    /// Counter consistency check, asserted before every summary print.
    pub fn is_consistent(&self) -> bool {
        self.processed == self.succeeded + self.failed + self.skipped
    }
}

/// One recorded per-record failure. Appended in occurrence order, never
/// mutated afterward.
#[derive(Debug, Clone)]
pub struct ErrorEntry {
    /// Identifier of the record that failed
    pub record_id: String,
    /// Top-level error message
    pub message: String,
    /// Cause chain, truncated to at most three frames
    pub frames: Vec<String>,
}

/// Maximum cause-chain frames kept per recorded error.
pub const MAX_ERROR_FRAMES: usize = 3;

impl ErrorEntry {
    /// Build an entry from a record id and an engine error, walking the
    /// error's source chain for up to [`MAX_ERROR_FRAMES`] frames.
    pub fn from_error(record_id: impl Into<String>, error: &dyn std::error::Error) -> Self {
        let mut frames = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            if frames.len() >= MAX_ERROR_FRAMES {
                break;
            }
            frames.push(cause.to_string());
            source = cause.source();
        }

        Self {
            record_id: record_id.into(),
            message: error.to_string(),
            frames,
        }
    }
}

/// Mutable state of one in-flight run.
#[derive(Debug)]
pub struct RunContext {
    /// True when no changes should persist and side effects are guarded
    pub dry_run: bool,
    /// Declared transaction mode for this run
    pub mode: TransactionMode,
    /// Per-run counters
    pub stats: Stats,
    /// Recorded per-record failures, in occurrence order
    pub errors: Vec<ErrorEntry>,
    /// Monotonic start of the run, for durations
    pub started_at: Instant,
    /// Wall-clock start of the run, for the summary
    pub started_at_utc: DateTime<Utc>,
    /// Last time an interim status block was printed
    pub last_status_at: Instant,
    /// Set when the operator interrupted the run
    pub interrupted: bool,
    /// Identifier of the last successfully processed record
    pub checkpoint: Option<String>,
}

impl RunContext {
    pub fn new(dry_run: bool, mode: TransactionMode) -> Self {
        let now = Instant::now();
        Self {
            dry_run,
            mode,
            stats: Stats::default(),
            errors: Vec::new(),
            started_at: now,
            started_at_utc: Utc::now(),
            last_status_at: now,
            interrupted: false,
            checkpoint: None,
        }
    }

    /// Record a failed record: bump counters and append an error entry.
    pub fn record_failure(&mut self, record_id: impl Into<String>, error: &dyn std::error::Error) {
        self.stats.record_failure();
        self.errors.push(ErrorEntry::from_error(record_id, error));
    }

    /// Seconds elapsed since the run started.
    pub fn elapsed_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
