//! SQLite binding
//!
//! The engine only needs a transactional session and an enumerable of
//! records; this module provides both over rusqlite. The connection is
//! shared behind `Arc<Mutex<..>>` so a streaming source and the session can
//! read and write through the same handle.

use crate::error::{Result, ShiftError};
use crate::source::{RecordLookup, RecordStream, ShiftRecord};
use crate::transaction::Session;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Shared connection handle.
pub type DbHandle = Arc<Mutex<Connection>>;

/// Transactional session over a SQLite connection.
pub struct SqliteSession {
    db: DbHandle,
}

impl SqliteSession {
    /// Open a session on a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a session on an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// Wrap an existing connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    /// Clone the underlying handle, e.g. for a streaming source.
    pub fn handle(&self) -> DbHandle {
        Arc::clone(&self.db)
    }

    /// Run a closure against the connection.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let conn = lock(&self.db)?;
        f(&conn).map_err(ShiftError::from)
    }
}

fn lock(db: &DbHandle) -> Result<std::sync::MutexGuard<'_, Connection>> {
    db.lock()
        .map_err(|_| ShiftError::config("database connection mutex poisoned"))
}

impl Session for SqliteSession {
    fn begin(&mut self) -> Result<()> {
        lock(&self.db)?.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        lock(&self.db)?.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        lock(&self.db)?.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

/// Row mapper from a SQLite row to a shift record.
pub type RowMapper<R> = Box<dyn Fn(&rusqlite::Row<'_>) -> rusqlite::Result<R> + Send>;

/// Streaming source doing keyset pagination over one table.
///
/// The key column must carry a stable ascending ordering, typically the
/// integer primary key.
pub struct SqliteKeysetSource<R: ShiftRecord> {
    db: DbHandle,
    table: String,
    key_column: String,
    map_row: RowMapper<R>,
}

impl<R: ShiftRecord> SqliteKeysetSource<R> {
    pub fn new(
        db: DbHandle,
        table: impl Into<String>,
        key_column: impl Into<String>,
        map_row: RowMapper<R>,
    ) -> Self {
        Self {
            db,
            table: table.into(),
            key_column: key_column.into(),
            map_row,
        }
    }
}

impl<R: ShiftRecord> RecordStream<R> for SqliteKeysetSource<R> {
    fn count(&mut self, after: Option<&str>) -> Result<u64> {
        let conn = lock(&self.db)?;
        let count: u64 = match after {
            Some(cursor) => {
                let sql = format!(
                    "SELECT COUNT(*) FROM {} WHERE {} > ?1",
                    self.table, self.key_column
                );
                conn.query_row(&sql, [cursor], |row| row.get(0))?
            },
            None => {
                let sql = format!("SELECT COUNT(*) FROM {}", self.table);
                conn.query_row(&sql, [], |row| row.get(0))?
            },
        };
        Ok(count)
    }

    fn fetch_after(&mut self, after: Option<&str>, limit: usize) -> Result<Vec<R>> {
        let conn = lock(&self.db)?;
        let mut records = Vec::new();
        match after {
            Some(cursor) => {
                let sql = format!(
                    "SELECT * FROM {t} WHERE {k} > ?1 ORDER BY {k} LIMIT ?2",
                    t = self.table,
                    k = self.key_column
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows =
                    stmt.query_map(rusqlite::params![cursor, limit as i64], &self.map_row)?;
                for row in rows {
                    records.push(row?);
                }
            },
            None => {
                let sql = format!(
                    "SELECT * FROM {t} ORDER BY {k} LIMIT ?1",
                    t = self.table,
                    k = self.key_column
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(rusqlite::params![limit as i64], &self.map_row)?;
                for row in rows {
                    records.push(row?);
                }
            },
        }
        Ok(records)
    }
}

impl<R: ShiftRecord> RecordLookup<R> for SqliteKeysetSource<R> {
    fn fetch_by_ids(&mut self, ids: &[String]) -> Result<Vec<R>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = lock(&self.db)?;
        let placeholders = (1..=ids.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT * FROM {t} WHERE {k} IN ({placeholders}) ORDER BY {k}",
            t = self.table,
            k = self.key_column
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(ids.iter()), &self.map_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}
