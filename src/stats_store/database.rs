use super::schema::STATS_VERSIONED_SCHEMAS;
use crate::sqlite_persistence::open_versioned_db;
use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

/// Handle to the stats SQLite database. Cloning shares the same connection.
#[derive(Clone)]
pub struct StatsDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl StatsDatabase {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned_db(db_path.as_ref(), STATS_VERSIONED_SCHEMAS, "stats")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Starts a write unit of work. The connection stays locked until the unit of work
    /// is committed, rolled back or dropped.
    pub fn begin(&self) -> Result<UnitOfWork<'_>> {
        UnitOfWork::start(self.lock(), "BEGIN IMMEDIATE")
    }

    /// Starts a read-only unit of work, giving queries a consistent snapshot.
    pub fn begin_read(&self) -> Result<UnitOfWork<'_>> {
        UnitOfWork::start(self.lock(), "BEGIN DEFERRED")
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves at most an open transaction behind, which
        // the next BEGIN would reject; UnitOfWork::start clears it.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A single transaction on the stats database, created fresh for every logical operation
/// and passed explicitly into each repository call. Dropping it without calling
/// [`UnitOfWork::commit`] rolls the transaction back.
pub struct UnitOfWork<'a> {
    conn: MutexGuard<'a, Connection>,
    finished: bool,
}

impl<'a> UnitOfWork<'a> {
    fn start(conn: MutexGuard<'a, Connection>, begin_sql: &str) -> Result<Self> {
        if !conn.is_autocommit() {
            warn!("Found a dangling stats transaction, rolling it back");
            conn.execute_batch("ROLLBACK")
                .context("Failed to roll back dangling transaction")?;
        }
        conn.execute_batch(begin_sql)
            .context("Failed to begin stats transaction")?;
        Ok(Self {
            conn,
            finished: false,
        })
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        self.conn
            .execute_batch("COMMIT")
            .context("Failed to commit stats transaction")
    }

    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.conn
            .execute_batch("ROLLBACK")
            .context("Failed to roll back stats transaction")
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!("Failed to roll back abandoned unit of work: {}", e);
            }
        }
    }
}
