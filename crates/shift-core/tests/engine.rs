//! End-to-end engine scenarios against in-memory SQLite.

use shift_core::{
    Collection, EngineConfig, Outcome, Result, RunCtx, RunOptions, Runner, Shift, ShiftError,
    ShiftPolicy, ShiftRecord, SqliteKeysetSource, SqliteSession, TransactionMode,
};

#[derive(Debug, Clone)]
struct User {
    id: i64,
    email: String,
}

impl ShiftRecord for User {
    fn id(&self) -> String {
        self.id.to_string()
    }
}

fn user_mapper() -> shift_core::sqlite::RowMapper<User> {
    Box::new(|row| {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
        })
    })
}

fn seeded_runner(emails: &[&str]) -> Runner<SqliteSession> {
    let session = SqliteSession::open_in_memory().unwrap();
    session
        .with_conn(|conn| {
            conn.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT)")?;
            for (i, email) in emails.iter().enumerate() {
                conn.execute(
                    "INSERT INTO users (id, email) VALUES (?1, ?2)",
                    rusqlite::params![i as i64 + 1, email],
                )?;
            }
            Ok(())
        })
        .unwrap();

    let config = EngineConfig::builder().progress(false).build();
    Runner::new(config, session)
}

fn emails(runner: &mut Runner<SqliteSession>) -> Vec<String> {
    runner
        .session_mut()
        .with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT email FROM users ORDER BY id")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect()
        })
        .unwrap()
}

/// Uppercases every email; configurable to fail or skip specific ids.
struct UppercaseEmails {
    mode: TransactionMode,
    fail_on: Option<i64>,
    skip_on: Option<i64>,
    after_skip_ran: bool,
}

impl UppercaseEmails {
    fn new(mode: TransactionMode) -> Self {
        Self {
            mode,
            fail_on: None,
            skip_on: None,
            after_skip_ran: false,
        }
    }
}

impl Shift for UppercaseEmails {
    type Session = SqliteSession;
    type Record = User;

    fn policy(&self) -> ShiftPolicy {
        ShiftPolicy::builder()
            .description("uppercase emails")
            .transaction(self.mode)
            .progress(false)
            .acknowledge_unsafe(true)
            .build()
    }

    fn collection(&mut self, session: &mut SqliteSession) -> Result<Collection<User>> {
        Ok(Collection::Stream(Box::new(SqliteKeysetSource::new(
            session.handle(),
            "users",
            "id",
            user_mapper(),
        ))))
    }

    fn process_record(
        &mut self,
        record: &mut User,
        ctx: &mut RunCtx<'_, SqliteSession>,
    ) -> Result<Outcome> {
        if self.skip_on == Some(record.id) {
            return Ok(ctx.skip("excluded"));
        }
        if self.skip_on.is_some() {
            self.after_skip_ran = true;
        }
        if self.fail_on == Some(record.id) {
            return Err(ShiftError::config("email rejected"));
        }

        let upper = record.email.to_uppercase();
        let id = record.id;
        ctx.session().with_conn(|conn| {
            conn.execute(
                "UPDATE users SET email = ?1 WHERE id = ?2",
                rusqlite::params![upper, id],
            )
            .map(|_| ())
        })?;
        Ok(Outcome::Done)
    }
}

#[test]
fn dry_run_single_mode_persists_nothing_and_succeeds() {
    let mut runner = seeded_runner(&["a@x.test", "b@x.test", "c@x.test"]);
    let mut shift = UppercaseEmails::new(TransactionMode::Single);

    let report = runner.run(&mut shift, RunOptions::dry_run()).unwrap();

    assert_eq!(report.stats.processed, 3);
    assert_eq!(report.stats.succeeded, 3);
    assert_eq!(
        emails(&mut runner),
        vec!["a@x.test", "b@x.test", "c@x.test"]
    );
}

#[test]
fn dry_run_per_record_mode_persists_nothing() {
    let mut runner = seeded_runner(&["a@x.test", "b@x.test"]);
    let mut shift = UppercaseEmails::new(TransactionMode::PerRecord);

    runner.run(&mut shift, RunOptions::dry_run()).unwrap();
    assert_eq!(emails(&mut runner), vec!["a@x.test", "b@x.test"]);
}

#[test]
fn live_single_mode_persists_everything() {
    let mut runner = seeded_runner(&["a@x.test", "b@x.test"]);
    let mut shift = UppercaseEmails::new(TransactionMode::Single);

    runner.run(&mut shift, RunOptions::live()).unwrap();
    assert_eq!(emails(&mut runner), vec!["A@X.TEST", "B@X.TEST"]);
}

#[test]
fn live_single_mode_failure_rolls_back_everything() {
    let mut runner = seeded_runner(&["a@x.test", "b@x.test", "c@x.test"]);
    let mut shift = UppercaseEmails::new(TransactionMode::Single);
    shift.fail_on = Some(2);

    let err = runner.run(&mut shift, RunOptions::live()).unwrap_err();
    assert!(matches!(err, ShiftError::RecordsFailed(1)));
    assert_eq!(
        emails(&mut runner),
        vec!["a@x.test", "b@x.test", "c@x.test"]
    );
}

#[test]
fn live_per_record_mode_keeps_committed_records_on_failure() {
    let mut runner = seeded_runner(&["a@x.test", "b@x.test", "c@x.test"]);
    let mut shift = UppercaseEmails::new(TransactionMode::PerRecord);
    shift.fail_on = Some(2);

    let err = runner.run(&mut shift, RunOptions::live()).unwrap_err();
    assert_eq!(err.to_string(), "1 record(s) failed");
    assert_eq!(
        emails(&mut runner),
        vec!["A@X.TEST", "b@x.test", "C@X.TEST"]
    );
}

#[test]
fn skip_short_circuits_and_counts_separately() {
    let mut runner = seeded_runner(&["a@x.test", "b@x.test", "c@x.test"]);
    let mut shift = UppercaseEmails::new(TransactionMode::PerRecord);
    shift.skip_on = Some(2);

    let report = runner.run(&mut shift, RunOptions::live()).unwrap();

    assert_eq!(report.stats.processed, 3);
    assert_eq!(report.stats.succeeded, 2);
    assert_eq!(report.stats.skipped, 1);
    assert_eq!(report.stats.failed, 0);
    // Non-skipped records still ran their full body.
    assert!(shift.after_skip_ran);
    // The skipped record's email was never touched.
    assert_eq!(
        emails(&mut runner),
        vec!["A@X.TEST", "b@x.test", "C@X.TEST"]
    );
}

#[test]
fn dry_run_rolls_back_writes_made_while_resolving_collection() {
    struct SeedsWhileResolving;

    impl Shift for SeedsWhileResolving {
        type Session = SqliteSession;
        type Record = User;

        fn policy(&self) -> ShiftPolicy {
            ShiftPolicy::builder()
                .description("seeds while resolving")
                .progress(false)
                .build()
        }

        fn collection(&mut self, session: &mut SqliteSession) -> Result<Collection<User>> {
            // Staging work done while resolving the collection must stay
            // inside the dry-run transaction.
            session.with_conn(|conn| {
                conn.execute(
                    "INSERT INTO users (id, email) VALUES (99, 'staged@x.test')",
                    [],
                )
                .map(|_| ())
            })?;
            Ok(Collection::Stream(Box::new(SqliteKeysetSource::new(
                session.handle(),
                "users",
                "id",
                user_mapper(),
            ))))
        }

        fn process_record(
            &mut self,
            _record: &mut User,
            _ctx: &mut RunCtx<'_, SqliteSession>,
        ) -> Result<Outcome> {
            Ok(Outcome::Done)
        }
    }

    let mut runner = seeded_runner(&[]);
    let report = runner
        .run(&mut SeedsWhileResolving, RunOptions::dry_run())
        .unwrap();

    // The staged row was visible to the run itself...
    assert_eq!(report.stats.processed, 1);
    // ...but nothing survived the rollback.
    assert!(emails(&mut runner).is_empty());
}

#[test]
fn resume_processes_only_keys_after_cursor() {
    let mut runner = seeded_runner(&["a@x.test", "b@x.test", "c@x.test", "d@x.test"]);
    let mut shift = UppercaseEmails::new(TransactionMode::PerRecord);

    let report = runner
        .run(&mut shift, RunOptions::live().continue_from("2"))
        .unwrap();

    assert_eq!(report.stats.processed, 2);
    assert_eq!(
        emails(&mut runner),
        vec!["a@x.test", "b@x.test", "C@X.TEST", "D@X.TEST"]
    );
    assert_eq!(report.checkpoint, Some("4".to_string()));
}

#[test]
fn dry_run_network_call_to_unlisted_host_is_blocked() {
    struct CallsOut;

    impl Shift for CallsOut {
        type Session = SqliteSession;
        type Record = User;

        fn policy(&self) -> ShiftPolicy {
            ShiftPolicy::builder()
                .description("calls out")
                .progress(false)
                .allow_external_requests(vec!["api.allowed.test".to_string()])
                .build()
        }

        fn collection(&mut self, _session: &mut SqliteSession) -> Result<Collection<User>> {
            Ok(Collection::Memory(vec![User {
                id: 1,
                email: "a@x.test".to_string(),
            }]))
        }

        fn process_record(
            &mut self,
            _record: &mut User,
            ctx: &mut RunCtx<'_, SqliteSession>,
        ) -> Result<Outcome> {
            // Allow-listed host passes the policy check.
            ctx.http().check_allowed("https://api.allowed.test/v1")?;
            // Anything else is denied while the guard is up.
            ctx.http().check_allowed("https://api.other.test/v1")?;
            Ok(Outcome::Done)
        }
    }

    let mut runner = seeded_runner(&[]);
    let err = runner.run(&mut CallsOut, RunOptions::dry_run()).unwrap_err();
    assert_eq!(err.to_string(), "1 record(s) failed");

    // The same calls pass once the run is live and the guard is down.
    runner.run(&mut CallsOut, RunOptions::live()).unwrap();
}

#[test]
fn blocked_request_error_names_the_host() {
    struct OneCall {
        denial: Option<String>,
    }

    impl Shift for OneCall {
        type Session = SqliteSession;
        type Record = User;

        fn policy(&self) -> ShiftPolicy {
            ShiftPolicy::builder().description("one call").progress(false).build()
        }

        fn collection(&mut self, _session: &mut SqliteSession) -> Result<Collection<User>> {
            Ok(Collection::Memory(vec![User {
                id: 1,
                email: "a@x.test".to_string(),
            }]))
        }

        fn process_record(
            &mut self,
            _record: &mut User,
            ctx: &mut RunCtx<'_, SqliteSession>,
        ) -> Result<Outcome> {
            if let Err(err) = ctx.http().check_allowed("https://forbidden.test/x") {
                self.denial = Some(err.to_string());
                return Err(err);
            }
            Ok(Outcome::Done)
        }
    }

    let mut runner = seeded_runner(&[]);
    let mut shift = OneCall { denial: None };
    let err = runner.run(&mut shift, RunOptions::dry_run()).unwrap_err();
    // Aggregate failure at the run level...
    assert!(matches!(err, ShiftError::RecordsFailed(1)));

    // ...while the record-level denial names the host and the remedy.
    let denial = shift.denial.unwrap();
    assert!(denial.contains("forbidden.test"));
    assert!(denial.contains("allow_external_requests"));
}

#[test]
fn counters_are_consistent_before_summary() {
    let mut runner = seeded_runner(&["a@x.test", "b@x.test", "c@x.test"]);
    let mut shift = UppercaseEmails::new(TransactionMode::PerRecord);
    shift.fail_on = Some(1);
    shift.skip_on = Some(3);

    let _ = runner.run(&mut shift, RunOptions::live());
    // The engine debug-asserts consistency internally; verify persisted
    // effects line up with the counters here.
    assert_eq!(
        emails(&mut runner),
        vec!["a@x.test", "B@X.TEST", "c@x.test"]
    );
}

#[test]
fn find_exactly_round_trip() {
    let mut runner = seeded_runner(&["a@x.test", "b@x.test", "c@x.test"]);
    let mut source = SqliteKeysetSource::new(
        runner.session_mut().handle(),
        "users",
        "id",
        user_mapper(),
    );

    let found =
        shift_core::find_exactly(&mut source, "user", &["1".to_string(), "3".to_string()])
            .unwrap();
    assert_eq!(found.len(), 2);

    let err = shift_core::find_exactly(&mut source, "user", &["8".to_string()]).unwrap_err();
    assert!(err.to_string().contains('8'));

    let empty: Vec<User> = shift_core::find_exactly(&mut source, "user", &[]).unwrap();
    assert!(empty.is_empty());
}
