//! Operator-facing run output
//!
//! Renders the run header, interim status blocks, and the end-of-run
//! summary as strings; the runner prints them to stdout. Rendering is kept
//! separate from the run loop so output can be asserted on in tests.

use crate::stats::RunContext;
use crate::transaction::TransactionMode;
use colored::Colorize;

/// Header printed before iteration starts.
pub fn format_header(
    label: &str,
    size: u64,
    dry_run: bool,
    mode: TransactionMode,
    status_hint: &str,
) -> String {
    let run_mode = if dry_run {
        "DRY RUN".yellow().bold().to_string()
    } else {
        "LIVE".red().bold().to_string()
    };

    let mut out = String::new();
    out.push_str(&format!("{}\n", label.cyan().bold()));
    out.push_str(&format!("  Mode:        {run_mode}\n"));
    out.push_str(&format!("  Records:     {size}\n"));
    out.push_str(&format!("  Transaction: {mode}\n"));
    out.push_str(&format!("  {status_hint}\n"));
    out
}

/// Interim status block, triggered by interval or signal.
pub fn format_status(ctx: &RunContext) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", "Status".cyan().bold()));
    out.push_str(&format!("  Duration:  {:.1}s\n", ctx.elapsed_secs()));
    out.push_str(&counters_block(ctx));
    if !ctx.errors.is_empty() {
        out.push_str(&format!("  Errors so far: {}\n", ctx.errors.len()));
    }
    out
}

/// Final summary block; printed on every exit path.
pub fn format_summary(ctx: &RunContext) -> String {
    debug_assert!(ctx.stats.is_consistent());

    let mut out = String::new();
    out.push_str(&format!("{}\n", "Summary".cyan().bold()));
    if ctx.interrupted {
        out.push_str(&format!("  {}\n", "INTERRUPTED".red().bold()));
    }
    if ctx.dry_run {
        out.push_str(&format!(
            "  {}\n",
            "Dry run: no changes were persisted".yellow()
        ));
    }
    out.push_str(&format!(
        "  Started:   {}\n",
        ctx.started_at_utc.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("  Duration:  {:.1}s\n", ctx.elapsed_secs()));
    out.push_str(&counters_block(ctx));

    if !ctx.errors.is_empty() {
        out.push_str(&format!("  {}\n", "Errors:".red().bold()));
        for entry in &ctx.errors {
            out.push_str(&format!("    [{}] {}\n", entry.record_id, entry.message));
            for frame in &entry.frames {
                out.push_str(&format!("      caused by: {frame}\n"));
            }
        }
    }

    if let Some(hint) = resume_hint(ctx) {
        out.push_str(&format!("  {hint}\n"));
    }

    out
}

fn counters_block(ctx: &RunContext) -> String {
    format!(
        "  Processed: {}\n  Succeeded: {}\n  Failed:    {}\n  Skipped:   {}\n",
        ctx.stats.processed, ctx.stats.succeeded, ctx.stats.failed, ctx.stats.skipped
    )
}

/// A partially applied live run in a mode that keeps per-record commits can
/// be resumed from the last successful key.
fn resume_hint(ctx: &RunContext) -> Option<String> {
    if ctx.dry_run || ctx.mode == TransactionMode::Single {
        return None;
    }
    if ctx.stats.failed == 0 && !ctx.interrupted {
        return None;
    }
    ctx.checkpoint
        .as_ref()
        .map(|key| format!("Resume with --continue-from {key}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::stats::ErrorEntry;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_header_reports_mode_and_size() {
        plain();
        let header = format_header("backfill emails", 42, true, TransactionMode::Single, "status: kill -USR1 1");
        assert!(header.contains("backfill emails"));
        assert!(header.contains("DRY RUN"));
        assert!(header.contains("42"));
        assert!(header.contains("single"));
        assert!(header.contains("USR1"));
    }

    #[test]
    fn test_summary_includes_counters_and_errors() {
        plain();
        let mut ctx = RunContext::new(false, TransactionMode::PerRecord);
        ctx.stats.record_success();
        ctx.stats.record_failure();
        ctx.errors.push(ErrorEntry {
            record_id: "7".to_string(),
            message: "boom".to_string(),
            frames: vec!["root".to_string()],
        });

        let summary = format_summary(&ctx);
        assert!(summary.contains("Processed: 2"));
        assert!(summary.contains("Succeeded: 1"));
        assert!(summary.contains("Failed:    1"));
        assert!(summary.contains("[7] boom"));
        assert!(summary.contains("caused by: root"));
    }

    #[test]
    fn test_summary_resume_hint_for_per_record_failures() {
        plain();
        let mut ctx = RunContext::new(false, TransactionMode::PerRecord);
        ctx.stats.record_failure();
        ctx.checkpoint = Some("31".to_string());

        let summary = format_summary(&ctx);
        assert!(summary.contains("--continue-from 31"));
    }

    #[test]
    fn test_summary_no_resume_hint_in_single_mode_or_dry_run() {
        plain();
        let mut ctx = RunContext::new(false, TransactionMode::Single);
        ctx.stats.record_failure();
        ctx.checkpoint = Some("31".to_string());
        assert!(!format_summary(&ctx).contains("--continue-from"));

        let mut ctx = RunContext::new(true, TransactionMode::PerRecord);
        ctx.stats.record_failure();
        ctx.checkpoint = Some("31".to_string());
        assert!(!format_summary(&ctx).contains("--continue-from"));
    }

    #[test]
    fn test_summary_annotations() {
        plain();
        let mut ctx = RunContext::new(true, TransactionMode::Single);
        ctx.interrupted = true;
        let summary = format_summary(&ctx);
        assert!(summary.contains("INTERRUPTED"));
        assert!(summary.contains("no changes were persisted"));
    }
}
