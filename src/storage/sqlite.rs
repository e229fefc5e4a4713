use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::info;

use super::RouteStore;

/// SQLite-backed route store.
///
/// Same contract as the in-memory backend, but routes survive process
/// restarts. IO failures are surfaced to the caller, not retried.
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // journal_mode PRAGMA returns the resulting mode, so use query_row
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;

        Self::run_migrations(&conn)?;

        info!("Route store initialized at: {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS routes (
                from_chat INTEGER NOT NULL,
                from_msg  INTEGER NOT NULL,
                to_chat   INTEGER NOT NULL,
                to_msg    INTEGER NOT NULL,
                PRIMARY KEY (from_chat, from_msg)
            );
            ",
        )?;
        Ok(())
    }
}

#[async_trait]
impl RouteStore for SqliteStorage {
    async fn set(&self, from_chat: i64, from_msg: i32, to_chat: i64, to_msg: i32) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO routes (from_chat, from_msg, to_chat, to_msg)
             VALUES (?1, ?2, ?3, ?4)",
            params![from_chat, from_msg, to_chat, to_msg],
        )
        .context("Failed to store route")?;
        Ok(())
    }

    async fn get(&self, from_chat: i64, from_msg: i32) -> Result<Option<(i64, i32)>> {
        let conn = self.conn.lock().await;
        let route = conn
            .query_row(
                "SELECT to_chat, to_msg FROM routes WHERE from_chat = ?1 AND from_msg = ?2",
                params![from_chat, from_msg],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("Failed to look up route")?;
        Ok(route)
    }
}
