//! Shift Engine Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! One-off, safety-checked bulk data corrections ("shifts") against a live
//! datastore. A shift declares a collection and per-record mutation logic;
//! the engine runs it dry by default (all persistence rolled back, external
//! side effects intercepted) and only becomes destructive on explicit
//! opt-in, while reporting progress, answering status signals, and leaving
//! enough state behind to resume an interrupted run.
//!
//! # Overview
//!
//! - **Orchestration**: [`Runner`] drives the run lifecycle around a
//!   [`Shift`] definition
//! - **Transactions**: [`TransactionMode`] picks how commits wrap the run
//! - **Collections**: [`Collection`] covers in-memory and streaming
//!   (resumable) record sources
//! - **Side-effect guard**: dry runs deny outbound calls and sandbox
//!   adjacent subsystems via the capability registry in [`guard`]
//! - **Observability**: progress bars, interval/SIGUSR1 status blocks, and
//!   log deduplication in [`report`]
//!
//! # Example
//!
//! ```no_run
//! use shift_core::{
//!     Collection, EngineConfig, Outcome, Result, RunCtx, RunOptions, Runner, Shift,
//!     ShiftPolicy, ShiftRecord, SqliteSession,
//! };
//!
//! struct FixEmails;
//!
//! #[derive(Clone)]
//! struct User { id: i64, email: String }
//!
//! impl ShiftRecord for User {
//!     fn id(&self) -> String { self.id.to_string() }
//! }
//!
//! impl Shift for FixEmails {
//!     type Session = SqliteSession;
//!     type Record = User;
//!
//!     fn policy(&self) -> ShiftPolicy {
//!         ShiftPolicy::builder().description("normalize user emails").build()
//!     }
//!
//!     fn collection(&mut self, session: &mut SqliteSession) -> Result<Collection<User>> {
//!         let mut users = Vec::new();
//!         session.with_conn(|conn| {
//!             let mut stmt = conn.prepare("SELECT id, email FROM users")?;
//!             let rows = stmt.query_map([], |row| {
//!                 Ok(User { id: row.get(0)?, email: row.get(1)? })
//!             })?;
//!             for row in rows {
//!                 users.push(row?);
//!             }
//!             Ok(())
//!         })?;
//!         Ok(Collection::Memory(users))
//!     }
//!
//!     fn process_record(
//!         &mut self,
//!         record: &mut User,
//!         ctx: &mut RunCtx<'_, SqliteSession>,
//!     ) -> Result<Outcome> {
//!         let fixed = record.email.trim().to_lowercase();
//!         if fixed == record.email {
//!             return Ok(ctx.skip("already normalized"));
//!         }
//!         let id = record.id;
//!         ctx.session().with_conn(|conn| {
//!             conn.execute(
//!                 "UPDATE users SET email = ?1 WHERE id = ?2",
//!                 rusqlite::params![fixed, id],
//!             )
//!             .map(|_| ())
//!         })?;
//!         Ok(Outcome::Done)
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let session = SqliteSession::open("app.db")?;
//!     let mut runner = Runner::new(EngineConfig::from_env()?, session);
//!     runner.run(&mut FixEmails, RunOptions::dry_run())?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod guard;
pub mod logging;
pub mod policy;
pub mod report;
pub mod runner;
pub mod shift;
pub mod source;
pub mod sqlite;
pub mod stats;
pub mod transaction;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::{Result, ShiftError};
pub use guard::{Capability, CapabilityRegistry, GuardedClient};
pub use policy::ShiftPolicy;
pub use runner::{RunOptions, RunReport, Runner};
pub use shift::{Outcome, RunCtx, Shift};
pub use source::{find_exactly, Collection, RecordLookup, RecordStream, ShiftRecord};
pub use sqlite::{SqliteKeysetSource, SqliteSession};
pub use stats::{ErrorEntry, RunContext, Stats};
pub use transaction::{Session, TransactionMode};
