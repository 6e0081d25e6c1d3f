// =============================================================================
// Credential Store — SQLite `users` table
// =============================================================================
//
// One table, one file:
//
//   users(id INTEGER PRIMARY KEY AUTOINCREMENT, username TEXT UNIQUE, password TEXT)
//
// Every operation opens its own connection and releases it before
// returning; nothing is held between calls.  Registration performs the
// uniqueness check and the insert inside a single IMMEDIATE transaction so
// two concurrent registrations of the same name cannot both succeed.
//
// Passwords are stored and compared verbatim.
// =============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE,
    password TEXT
);
";

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the credential table.  Cheap to clone; holds only the path.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)
            .with_context(|| format!("failed to open user database {}", self.path.display()))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .context("failed to set busy timeout")?;
        Ok(conn)
    }

    /// Create the `users` table if it does not exist yet.  Safe to call any
    /// number of times.
    pub fn ensure_schema(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let conn = self.connect()?;
        conn.execute_batch(SCHEMA_SQL)
            .context("failed to create users table")?;

        info!(path = %self.path.display(), "user table ready");
        Ok(())
    }

    /// Insert a new user.
    ///
    /// Returns `Ok(false)` and leaves the table untouched when `username` is
    /// already taken.  Errors are reserved for database failures.
    pub fn register(&self, username: &str, password: &str) -> Result<bool> {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("failed to begin registration transaction")?;

        let exists: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
                params![username],
                |row| row.get(0),
            )
            .context("failed to check username")?;

        if exists {
            debug!(username, "registration rejected: username taken");
            return Ok(false);
        }

        match tx.execute(
            "INSERT INTO users (username, password) VALUES (?1, ?2)",
            params![username, password],
        ) {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                debug!(username, "registration rejected by unique constraint");
                return Ok(false);
            }
            Err(e) => return Err(e).context("failed to insert user"),
        }

        tx.commit().context("failed to commit registration")?;
        info!(username, "user registered");
        Ok(true)
    }

    /// `true` iff a row matches both `username` and `password` exactly.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<bool> {
        let conn = self.connect()?;
        let found = conn
            .query_row(
                "SELECT id FROM users WHERE username = ?1 AND password = ?2",
                params![username, password],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .context("failed to look up credentials")?;
        Ok(found.is_some())
    }

    /// Number of registered users.
    pub fn user_count(&self) -> Result<u64> {
        let conn = self.connect()?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .context("failed to count users")?;
        Ok(n.max(0) as u64)
    }

    #[cfg(test)]
    fn stored_password(&self, username: &str) -> Result<Option<String>> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT password FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )
        .optional()
        .context("failed to read password")
    }
}
