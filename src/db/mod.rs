//! SQLite storage context for projects, profiles and instances.
//!
//! [`Database`] owns the connection and hands out transaction scopes. Every
//! store operation in this crate is written against a plain
//! `&rusqlite::Connection`, which a `Transaction` derefs to, so the same
//! function can run inside [`Database::read`], [`Database::write`], or a
//! larger transaction composed by the caller.
//!
//! # Location
//!
//! ```text
//! ~/.local/share/profiled/
//! └── profiles.db
//! ```

mod rows;
mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info, instrument};

use crate::error::{Error, Result, SqlContext};

pub(crate) use rows::{INSTANCE_TABLES, PROFILE_TABLES, insert_config, insert_devices, load_config, load_devices};
pub use schema::{DEFAULT_PROJECT, PROFILES_FEATURE};

/// Database wrapper for profile storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens or creates a database at the standard location.
    ///
    /// Location: `~/.local/share/profiled/profiles.db`
    #[instrument]
    pub fn open_default() -> Result<Self> {
        let path = default_db_path()?;
        Self::open(&path)
    }

    /// Opens or creates a database at the given path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        debug!(path = %path.display(), "Opening profile database");
        let conn = Connection::open(path).context("Failed to open database")?;

        let db = Self { conn };
        db.init_schema()?;
        info!(path = %path.display(), "Profile database ready");
        Ok(db)
    }

    /// Creates an in-memory database (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to create in-memory database")?;

        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Sets how long a writer waits on a locked database before failing.
    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<()> {
        self.conn
            .busy_timeout(timeout)
            .context("Failed to set busy timeout")
    }

    /// Initializes the database schema.
    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute("PRAGMA foreign_keys = ON", [])
            .context("Failed to enable foreign keys")?;

        self.conn
            .execute_batch(schema::SCHEMA_SQL)
            .context("Failed to initialize schema")?;
        Ok(())
    }

    /// Runs `f` inside a deferred transaction so every query it makes sees
    /// one consistent snapshot.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to start read transaction")?;
        let value = f(&tx)?;
        tx.commit().context("Failed to finish read transaction")?;
        Ok(value)
    }

    /// Runs `f` inside an immediate (write-locked) transaction.
    ///
    /// The transaction commits when `f` returns `Ok` and rolls back when it
    /// returns `Err`, so a failed multi-statement write leaves no trace.
    pub fn write<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("Failed to start transaction")?;
        let value = f(&tx)?;
        tx.commit().context("Failed to commit transaction")?;
        Ok(value)
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Returns the default database path.
///
/// Location: `~/.local/share/profiled/profiles.db`
pub fn default_db_path() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir().ok_or_else(|| {
        Error::InvalidArgument("Could not determine local data directory".to_string())
    })?;
    Ok(data_dir.join("profiled").join("profiles.db"))
}
