// Database connection management for users, practice history and inventory

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Database location
#[derive(Debug, Clone)]
pub enum DbLocation {
    /// User mode: $XDG_DATA_HOME/practice/practice.db or ~/.local/share/practice/practice.db
    User,
    /// Explicit path (config, CLI, tests)
    Custom(PathBuf),
}

impl DbLocation {
    pub fn path(&self) -> Result<PathBuf> {
        match self {
            DbLocation::User => {
                // Try XDG_DATA_HOME first, fall back to ~/.local/share
                let base_dir = if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
                    PathBuf::from(xdg_data)
                } else if let Ok(home) = std::env::var("HOME") {
                    PathBuf::from(home).join(".local/share")
                } else {
                    anyhow::bail!("Could not determine user data directory");
                };
                Ok(base_dir.join("practice").join("practice.db"))
            }
            DbLocation::Custom(path) => Ok(path.clone()),
        }
    }

    /// Pick the configured path, or the per-user default
    pub fn from_config(db_path: Option<&PathBuf>) -> Self {
        match db_path {
            Some(path) => DbLocation::Custom(path.clone()),
            None => DbLocation::User,
        }
    }
}

/// Single SQLite connection shared behind an async mutex.
///
/// Cloning is cheap; every clone talks to the same connection.
#[derive(Clone)]
pub struct PracticeDb {
    conn: Arc<Mutex<Connection>>,
    location: DbLocation,
}

impl PracticeDb {
    /// Open or create the database at the specified location
    pub async fn open(location: DbLocation) -> Result<Self> {
        let db_path = location.path()?;

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .context("Failed to create database directory")?;
            }
        }

        info!("Opening practice database at: {}", db_path.display());

        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            let conn = Connection::open(&db_path).context("Failed to open SQLite database")?;

            // WAL lets readers proceed while another session writes
            conn.pragma_update(None, "journal_mode", "WAL")
                .context("Failed to enable WAL mode")?;
            conn.pragma_update(None, "synchronous", "NORMAL")
                .context("Failed to set synchronous mode")?;

            Ok(conn)
        })
        .await??;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            location,
        };

        db.initialize_schema().await?;

        Ok(db)
    }

    /// Create the three tables if they are missing
    async fn initialize_schema(&self) -> Result<()> {
        self.execute(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS users (
                    username TEXT PRIMARY KEY,
                    password TEXT NOT NULL
                )",
                [],
            )?;

            conn.execute(
                "CREATE TABLE IF NOT EXISTS subtraction_practice (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT NOT NULL,
                    question TEXT NOT NULL,
                    user_answer INTEGER NOT NULL,
                    correct_answer INTEGER NOT NULL,
                    is_correct BOOLEAN NOT NULL,
                    date DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
                )",
                [],
            )?;

            conn.execute(
                "CREATE TABLE IF NOT EXISTS inventory (
                    username TEXT NOT NULL,
                    item TEXT NOT NULL
                )",
                [],
            )?;

            Ok(())
        })
        .await
        .context("Failed to initialize schema")
    }

    /// Run a closure against the connection on the blocking pool
    pub async fn execute<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await?
    }

    /// Get database location
    pub fn location(&self) -> &DbLocation {
        &self.location
    }
}
