//! Shift runner - Main entry point
//!
//! Deployments register their shift definitions against the registry here;
//! each one becomes runnable as `shift run <name>`.

use clap::Parser;
use shift_cli::{execute, Cli, ShiftRegistry};
use shift_core::logging::{init_logging, LogConfig, LogLevel};
use std::process;

fn main() {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env().unwrap_or_default();
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }

    // The CLI should still work if logging can't initialize.
    let _ = init_logging(&log_config);

    let mut registry = ShiftRegistry::new();
    register_shifts(&mut registry);

    process::exit(execute(&cli, &mut registry));
}

/// Register this deployment's shift definitions.
fn register_shifts(_registry: &mut ShiftRegistry) {
    // Definitions live with the application embedding this runner, e.g.:
    //
    // registry.register("backfill-emails", "normalize user emails", Box::new(|options| {
    //     let session = SqliteSession::open("app.db")?;
    //     let mut runner = Runner::new(EngineConfig::from_env()?, session);
    //     runner.run(&mut BackfillEmails, options)
    // }));
}
