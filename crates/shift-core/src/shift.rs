//! The shift definition surface
//!
//! A shift is one declared unit of bulk record processing: a collection,
//! per-record logic, and a policy. Definitions implement [`Shift`]; the
//! required trait methods are the two override points the engine cannot
//! default (so forgetting one is a compile error rather than a silent
//! no-op).

use crate::error::Result;
use crate::guard::GuardedClient;
use crate::logging::LogLevel;
use crate::policy::ShiftPolicy;
use crate::report::DedupLogger;
use crate::source::{Collection, ShiftRecord};
use crate::transaction::Session;

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Record processed and counted as succeeded
    Done,
    /// Record deliberately skipped; counted as skipped, never as failed
    Skipped(String),
}

/// Per-record context handed to `process_record`.
///
/// Gives user code the session, the dry-run flag (for manually guarding
/// side effects the engine cannot roll back), the guarded HTTP client, and
/// the deduplicating logger.
pub struct RunCtx<'a, S: Session> {
    pub(crate) session: &'a mut S,
    pub(crate) dry_run: bool,
    pub(crate) http: &'a GuardedClient,
    pub(crate) logger: &'a mut DedupLogger,
    pub(crate) label: &'a str,
}

impl<'a, S: Session> RunCtx<'a, S> {
    /// The run's transactional session.
    pub fn session(&mut self) -> &mut S {
        self.session
    }

    /// True when nothing should persist and side effects are guarded.
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// HTTP client subject to the run's network policy.
    pub fn http(&self) -> &GuardedClient {
        self.http
    }

    /// Mark the current record skipped. Use as `return Ok(ctx.skip("why"))`
    /// so no later code in the record's processing executes.
    pub fn skip(&self, reason: impl Into<String>) -> Outcome {
        Outcome::Skipped(reason.into())
    }

    /// Log through the run's deduplicating logger.
    pub fn log(&mut self, level: LogLevel, message: &str) {
        self.logger.log(level, self.label, message);
    }
}

/// One shift definition.
pub trait Shift {
    type Session: Session;
    type Record: ShiftRecord;

    /// The shift's declared policy. Built once; the engine copies it per
    /// run.
    fn policy(&self) -> ShiftPolicy {
        ShiftPolicy::default()
    }

    /// Resolve the records this shift processes.
    fn collection(&mut self, session: &mut Self::Session) -> Result<Collection<Self::Record>>;

    /// Process one record. Return `Ok(Outcome::Done)` on success,
    /// `Ok(ctx.skip(..))` to skip, or an error to record a failure.
    fn process_record(
        &mut self,
        record: &mut Self::Record,
        ctx: &mut RunCtx<'_, Self::Session>,
    ) -> Result<Outcome>;
}
