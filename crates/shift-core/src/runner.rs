//! Run orchestration
//!
//! Composes the guard, transaction strategy, record iteration, and
//! observability around a shift definition. Hook order is fixed: reset
//! tracking, enter the side-effect guard when dry running, enter the
//! transaction scope, iterate, print the summary on every exit path, and
//! restore guard and transaction state unconditionally.

use crate::config::EngineConfig;
use crate::error::{Result, ShiftError};
use crate::guard::{
    AllowList, Capability, CapabilityRegistry, GuardScope, GuardedClient, NetworkCapability,
    NetworkSwitch,
};
use crate::logging::LogLevel;
use crate::policy::ShiftPolicy;
use crate::report::{maybe_progress_bar, DedupLogger, StatusReporter, TracingSink};
use crate::report::render::{format_header, format_status, format_summary};
use crate::shift::{Outcome, RunCtx, Shift};
use crate::source::{RecordDrain, ShiftRecord};
use crate::stats::{ErrorEntry, RunContext, Stats};
use crate::transaction::{Session, TransactionMode};
use colored::Colorize;
use indicatif::ProgressBar;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How one run is invoked.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Safe by default: nothing persists unless this is flipped off
    pub dry_run: bool,
    /// Resume cursor for streaming collections (keys strictly greater)
    pub continue_from: Option<String>,
    /// Operator pre-confirmed the run; skips the unwrapped-mode delay
    pub assume_yes: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: true,
            continue_from: None,
            assume_yes: false,
        }
    }
}

impl RunOptions {
    pub fn dry_run() -> Self {
        Self::default()
    }

    pub fn live() -> Self {
        Self {
            dry_run: false,
            ..Self::default()
        }
    }

    pub fn continue_from(mut self, key: impl Into<String>) -> Self {
        self.continue_from = Some(key.into());
        self
    }

    pub fn yes(mut self) -> Self {
        self.assume_yes = true;
        self
    }
}

/// What a finished run reports back to its caller.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub stats: Stats,
    pub errors: Vec<ErrorEntry>,
    pub checkpoint: Option<String>,
    pub interrupted: bool,
    pub duration: Duration,
}

/// The shift runner: one engine configuration, one session, and whatever
/// side-effect capabilities the host process registered.
pub struct Runner<S: Session> {
    config: EngineConfig,
    session: S,
    registry: CapabilityRegistry,
    switch: Arc<NetworkSwitch>,
    http: GuardedClient,
    reporter_override: Option<StatusReporter>,
}

impl<S: Session> Runner<S> {
    pub fn new(config: EngineConfig, session: S) -> Self {
        let switch = NetworkSwitch::new();
        let http = GuardedClient::new(Arc::clone(&switch));
        Self {
            config,
            session,
            registry: CapabilityRegistry::new(),
            switch,
            http,
            reporter_override: None,
        }
    }

    /// Use a pre-built status reporter for the next run instead of
    /// installing signal handlers, for host processes that manage signals
    /// themselves.
    pub fn set_status_reporter(&mut self, reporter: StatusReporter) {
        self.reporter_override = Some(reporter);
    }

    /// Register a side-effect capability present in this process.
    pub fn register_capability(&mut self, cap: Box<dyn Capability>) {
        self.registry.register(cap);
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute one shift.
    ///
    /// Returns `Ok` with the run report when every record succeeded (or was
    /// skipped); otherwise an error: the aggregate per-record failure, the
    /// interruption marker, or whatever configuration or datastore error
    /// stopped the run.
    pub fn run<D>(&mut self, shift: &mut D, options: RunOptions) -> Result<RunReport>
    where
        D: Shift<Session = S>,
    {
        let policy = shift.policy();
        let mut ctx = RunContext::new(options.dry_run, policy.transaction);

        if policy.transaction == TransactionMode::None {
            warn_unwrapped_mode(&self.config, &policy, ctx.dry_run, options.assume_yes);
        }

        let reporter = match self.reporter_override.take() {
            Some(reporter) => reporter,
            None => StatusReporter::install(self.config.status_interval)?,
        };
        let progress_enabled = policy.progress.unwrap_or(self.config.progress);
        let suppress = policy
            .suppress_repeated_logs
            .unwrap_or(self.config.suppress_repeated_logs);
        let mut logger =
            DedupLogger::new(Box::new(TracingSink), suppress, self.config.dedup_cap);

        let mut run_guard = CapabilityRegistry::new();
        if ctx.dry_run {
            let allowlist = AllowList::union(&self.config.allowed_hosts, &policy.allowed_hosts);
            run_guard.register(Box::new(NetworkCapability::new(
                Arc::clone(&self.switch),
                allowlist,
            )));
        }

        let body = {
            // Scopes open before the collection resolves: datastore work a
            // shift does while resolving its collection stays inside the
            // dry-run rollback, and guard state is restored on every exit
            // path.
            let _network_scope = if ctx.dry_run {
                Some(GuardScope::enter(&mut run_guard)?)
            } else {
                None
            };
            let _subsystem_scope = if ctx.dry_run {
                Some(GuardScope::enter(&mut self.registry)?)
            } else {
                None
            };

            execute(
                &mut self.session,
                shift,
                &mut ctx,
                &options,
                &reporter,
                &mut logger,
                &policy,
                &self.http,
                self.config.strict_unwrapped_dry_run,
                progress_enabled,
            )
        };

        logger.flush_summary();
        println!("{}", format_summary(&ctx));
        tracing::info!(
            shift = policy.label(),
            processed = ctx.stats.processed,
            succeeded = ctx.stats.succeeded,
            failed = ctx.stats.failed,
            skipped = ctx.stats.skipped,
            interrupted = ctx.interrupted,
            "run finished"
        );

        if ctx.interrupted {
            return Err(ShiftError::Interrupted);
        }
        if !ctx.errors.is_empty() {
            return Err(ShiftError::RecordsFailed(ctx.errors.len()));
        }
        body?;

        Ok(RunReport {
            stats: ctx.stats,
            errors: ctx.errors,
            checkpoint: ctx.checkpoint,
            interrupted: ctx.interrupted,
            duration: ctx.started_at.elapsed(),
        })
    }
}

/// Prominent warning (and forced delay, on live runs) for the unwrapped
/// transaction mode.
fn warn_unwrapped_mode(config: &EngineConfig, policy: &ShiftPolicy, dry_run: bool, assume_yes: bool) {
    println!(
        "{}",
        "WARNING: transaction mode 'none': no automatic transaction wrapping or rollback. \
         Persistence must be guarded with ctx.dry_run() in the shift itself."
            .red()
            .bold()
    );
    tracing::warn!(shift = policy.label(), "running without transaction wrapping");

    if !dry_run && !policy.acknowledge_unsafe && !assume_yes {
        let delay = config.unsafe_mode_delay;
        println!(
            "Proceeding with a LIVE unwrapped run in {}s (Ctrl-C to abort)...",
            delay.as_secs()
        );
        std::thread::sleep(delay);
    }
}

/// Transaction-strategy scope around the run body.
///
/// Dry runs in wrapping modes get one rollback-at-end transaction; live
/// `Single` runs get one commit-at-end transaction that any error unwinds.
/// The transaction opens before the collection resolves so staging work is
/// covered too.
#[allow(clippy::too_many_arguments)]
fn execute<S, D>(
    session: &mut S,
    shift: &mut D,
    ctx: &mut RunContext,
    options: &RunOptions,
    reporter: &StatusReporter,
    logger: &mut DedupLogger,
    policy: &ShiftPolicy,
    http: &GuardedClient,
    strict: bool,
    progress_enabled: bool,
) -> Result<()>
where
    S: Session,
    D: Shift<Session = S>,
{
    let mode = policy.transaction;
    let outer_tx = if ctx.dry_run {
        mode.wraps_dry_run(strict)
    } else {
        mode.single_live_transaction()
    };

    if outer_tx {
        session.begin()?;
    }

    let body = run_body(
        session,
        shift,
        ctx,
        options,
        reporter,
        logger,
        policy,
        http,
        progress_enabled,
    );

    if outer_tx {
        match &body {
            Ok(()) if ctx.dry_run => session.rollback()?,
            Ok(()) => session.commit()?,
            Err(_) => {
                // The body error is the one worth reporting.
                if let Err(rollback_err) = session.rollback() {
                    tracing::error!(error = %rollback_err, "rollback failed after run error");
                }
            },
        }
    }

    body
}

/// Resolve the collection, print the header, then iterate.
#[allow(clippy::too_many_arguments)]
fn run_body<S, D>(
    session: &mut S,
    shift: &mut D,
    ctx: &mut RunContext,
    options: &RunOptions,
    reporter: &StatusReporter,
    logger: &mut DedupLogger,
    policy: &ShiftPolicy,
    http: &GuardedClient,
    progress_enabled: bool,
) -> Result<()>
where
    S: Session,
    D: Shift<Session = S>,
{
    let mut collection = shift.collection(&mut *session)?;
    if options.continue_from.is_some() && !collection.supports_resume() {
        return Err(ShiftError::ResumeUnsupported);
    }
    let size = collection.size(options.continue_from.as_deref())?;
    let drain = collection.into_drain(options.continue_from.clone())?;
    let pb = maybe_progress_bar(progress_enabled, size);

    println!(
        "{}",
        format_header(
            policy.label(),
            size,
            ctx.dry_run,
            policy.transaction,
            &reporter.trigger_hint()
        )
    );
    tracing::info!(
        shift = policy.label(),
        dry_run = ctx.dry_run,
        records = size,
        mode = %policy.transaction,
        "run started"
    );

    iterate(session, shift, ctx, drain, pb, reporter, logger, policy, http)
}

/// The record loop: interrupt checks, per-record transactions where the
/// mode calls for them, stats, checkpointing, throttle, and status ticks.
#[allow(clippy::too_many_arguments)]
fn iterate<S, D>(
    session: &mut S,
    shift: &mut D,
    ctx: &mut RunContext,
    mut drain: RecordDrain<D::Record>,
    pb: Option<ProgressBar>,
    reporter: &StatusReporter,
    logger: &mut DedupLogger,
    policy: &ShiftPolicy,
    http: &GuardedClient,
) -> Result<()>
where
    S: Session,
    D: Shift<Session = S>,
{
    let mode = policy.transaction;
    let label = policy.label();

    loop {
        if reporter.interrupted() {
            ctx.interrupted = true;
            tracing::warn!(shift = label, "interrupt received, unwinding");
            return Err(ShiftError::Interrupted);
        }

        let Some(mut record) = drain.next_record()? else {
            break;
        };
        let record_id = record.id();

        let per_record_tx = !ctx.dry_run && mode.per_record_transactions();
        if per_record_tx {
            session.begin()?;
        }

        let outcome = {
            let mut rctx = RunCtx {
                session: &mut *session,
                dry_run: ctx.dry_run,
                http,
                logger: &mut *logger,
                label,
            };
            shift.process_record(&mut record, &mut rctx)
        };

        match outcome {
            Ok(Outcome::Done) => {
                if per_record_tx {
                    session.commit()?;
                }
                ctx.stats.record_success();
                ctx.checkpoint = Some(record_id);
            },
            Ok(Outcome::Skipped(reason)) => {
                if per_record_tx {
                    session.commit()?;
                }
                ctx.stats.record_skip();
                logger.log(
                    LogLevel::Debug,
                    label,
                    &format!("skipped record {record_id}: {reason}"),
                );
            },
            Err(error) => {
                if per_record_tx {
                    if let Err(rollback_err) = session.rollback() {
                        tracing::error!(
                            record = %record_id,
                            error = %rollback_err,
                            "rollback failed after record error"
                        );
                    }
                }
                logger.log(
                    LogLevel::Error,
                    label,
                    &format!("record {record_id} failed: {error}"),
                );
                ctx.record_failure(record_id.as_str(), &error);
                if mode.aborts_on_record_failure() {
                    return Err(error);
                }
            },
        }

        if let Some(bar) = &pb {
            bar.inc(1);
        }

        if let Some(delay) = policy.throttle {
            std::thread::sleep(delay);
        }

        if reporter.status_due(ctx.last_status_at) {
            println!("{}", format_status(ctx));
            ctx.last_status_at = Instant::now();
        }
    }

    if let Some(bar) = pb {
        bar.finish_and_clear();
    }
    Ok(())
}
