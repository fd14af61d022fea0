//! Shift runner CLI
//!
//! Thin invocation surface over the engine: one task per registered shift
//! definition, a `--commit` flag to leave the default dry-run mode, and a
//! Result-to-exit-code mapping (0 ok, 1 failure, 130 interrupted).

use clap::{Parser, Subcommand};
use colored::Colorize;
use shift_core::{Result, RunOptions, RunReport, ShiftError};
use std::collections::BTreeMap;

/// Exit code for a clean run.
pub const EXIT_OK: i32 = 0;
/// Exit code for any run failure.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code when the operator interrupted the run.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Shift runner
#[derive(Parser, Debug)]
#[command(name = "shift")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered shift definitions
    List,

    /// Run one shift (dry run unless --commit is given)
    Run {
        /// Registered shift name
        name: String,

        /// Persist changes and fire side effects; default is a dry run
        #[arg(long)]
        commit: bool,

        /// Resume a streaming collection from keys after this value
        #[arg(long)]
        continue_from: Option<String>,

        /// Skip the confirmation delay before an unwrapped live run
        #[arg(long)]
        yes: bool,
    },
}

/// One run entry point: takes the invocation options, executes the shift.
pub type RunEntry = Box<dyn FnMut(RunOptions) -> Result<RunReport>>;

struct RegisteredShift {
    description: String,
    entry: RunEntry,
}

/// Registry mapping one task name to each shift definition.
///
/// A deployment registers its definitions at startup and hands the registry
/// to [`execute`].
#[derive(Default)]
pub struct ShiftRegistry {
    entries: BTreeMap<String, RegisteredShift>,
}

impl ShiftRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        entry: RunEntry,
    ) {
        self.entries.insert(
            name.into(),
            RegisteredShift {
                description: description.into(),
                entry,
            },
        );
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered (name, description) pairs, sorted by name.
    pub fn list(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .map(|(name, shift)| (name.as_str(), shift.description.as_str()))
            .collect()
    }

    /// Run one registered shift by name.
    pub fn run(&mut self, name: &str, options: RunOptions) -> Result<RunReport> {
        let shift = self.entries.get_mut(name).ok_or_else(|| {
            ShiftError::config(format!(
                "no shift registered as '{name}'; run 'shift list' to see what exists"
            ))
        })?;
        (shift.entry)(options)
    }
}

/// Map a run result to a process exit code.
pub fn exit_code(result: &Result<RunReport>) -> i32 {
    match result {
        Ok(_) => EXIT_OK,
        Err(ShiftError::Interrupted) => EXIT_INTERRUPTED,
        Err(_) => EXIT_FAILURE,
    }
}

/// Execute a parsed CLI invocation against a registry; returns the exit
/// code for the process.
pub fn execute(cli: &Cli, registry: &mut ShiftRegistry) -> i32 {
    match &cli.command {
        Commands::List => {
            if registry.is_empty() {
                println!("No shifts registered.");
                return EXIT_OK;
            }
            println!("{}", "Registered shifts:".cyan().bold());
            for (name, description) in registry.list() {
                println!("  {}  {}", name.green(), description);
            }
            EXIT_OK
        },
        Commands::Run {
            name,
            commit,
            continue_from,
            yes,
        } => {
            let mut options = if *commit {
                RunOptions::live()
            } else {
                RunOptions::dry_run()
            };
            if let Some(key) = continue_from {
                options = options.continue_from(key.clone());
            }
            if *yes {
                options = options.yes();
            }

            let result = registry.run(name, options);
            if let Err(e) = &result {
                tracing::error!(shift = name.as_str(), error = %e, "run failed");
                eprintln!("{} {e}", "Error:".red().bold());
            }
            exit_code(&result)
        },
    }
}
