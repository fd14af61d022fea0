//! Transaction strategy
//!
//! Two independent layers meet here: an outer "make dry runs harmless"
//! rollback wrapper, and an inner policy for how commit-mode failures are
//! isolated. The declared mode picks the inner policy; the dry-run flag
//! picks whether the outer wrapper applies.

use crate::error::{Result, ShiftError};

/// How database transactions wrap a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionMode {
    /// One transaction around the whole run. Any record failure aborts and
    /// rolls back everything; a dry run rolls back on success too.
    #[default]
    Single,
    /// Each record commits independently on live runs; failures are
    /// absorbed and iteration continues. Dry runs fall back to one
    /// rollback-at-end transaction.
    PerRecord,
    /// No automatic wrapping at all. User code must guard persistence with
    /// `ctx.dry_run()`; live runs get a warning and a forced delay.
    None,
}

impl TransactionMode {
    /// Whether a dry run in this mode gets the rollback-at-end wrapper.
    ///
    /// `None` mode is unwrapped by default; `strict` opts it in for
    /// operators who want the safety net even there.
    pub fn wraps_dry_run(self, strict: bool) -> bool {
        match self {
            TransactionMode::Single | TransactionMode::PerRecord => true,
            TransactionMode::None => strict,
        }
    }

    /// Whether a live run opens one transaction spanning the whole body.
    pub fn single_live_transaction(self) -> bool {
        matches!(self, TransactionMode::Single)
    }

    /// Whether a live run wraps each record in its own transaction.
    pub fn per_record_transactions(self) -> bool {
        matches!(self, TransactionMode::PerRecord)
    }

    /// Whether a record failure aborts the whole run.
    pub fn aborts_on_record_failure(self) -> bool {
        matches!(self, TransactionMode::Single)
    }
}

impl std::str::FromStr for TransactionMode {
    type Err = ShiftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "single" => Ok(TransactionMode::Single),
            "per_record" | "per-record" => Ok(TransactionMode::PerRecord),
            "none" => Ok(TransactionMode::None),
            other => Err(ShiftError::InvalidTransactionMode(other.to_string())),
        }
    }
}

impl std::fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionMode::Single => write!(f, "single"),
            TransactionMode::PerRecord => write!(f, "per_record"),
            TransactionMode::None => write!(f, "none"),
        }
    }
}

/// A transactional session the engine can bracket work with.
///
/// The engine never implements storage itself; it drives whatever session
/// the shift's datastore provides. `begin` after `begin` and `commit` or
/// `rollback` without an open transaction are implementation errors and
/// should surface as `ShiftError::Database`.
pub trait Session {
    fn begin(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;
}
