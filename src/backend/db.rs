use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use super::models::*;

pub const DEFAULT_PROJECT_ID: i64 = 1;
pub const DEFAULT_PROJECT_NAME: &str = "Default Project";

/// Async-safe handle to the chat database.
///
/// Wraps `ChatDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O
/// never ties up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<ChatDb>>,
}

impl DbHandle {
    pub fn new(db: ChatDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&ChatDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db
                .lock()
                .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }
}

pub struct ChatDb {
    conn: Connection,
}

impl ChatDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        self.seed_default_project()
            .context("Failed to seed default project")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS projects (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    description TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS messages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    sender TEXT NOT NULL CHECK (sender IN ('user', 'ai')),
                    text TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE INDEX IF NOT EXISTS idx_messages_project ON messages(project_id);
                ",
            )
            .context("Failed to create tables")?;

        // Databases created before descriptions existed lack the column.
        // Only "duplicate column" errors are ignored.
        match self
            .conn
            .execute("ALTER TABLE projects ADD COLUMN description TEXT", [])
        {
            Ok(_) => {}
            Err(e) if e.to_string().contains("duplicate column") => {}
            Err(e) => return Err(anyhow::anyhow!("Failed to add description column: {}", e)),
        }

        Ok(())
    }

    fn seed_default_project(&self) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO projects (id, name) VALUES (?1, ?2)",
            params![DEFAULT_PROJECT_ID, DEFAULT_PROJECT_NAME],
        )?;
        Ok(())
    }

    // ── Project CRUD ──────────────────────────────────────────────────

    pub fn create_project(&self, name: &str, description: Option<&str>) -> Result<Project> {
        self.conn
            .execute(
                "INSERT INTO projects (name, description) VALUES (?1, ?2)",
                params![name, description],
            )
            .context("Failed to insert project")?;
        let id = self.conn.last_insert_rowid();
        self.get_project(id)?
            .context("Project not found after insert")
    }

    /// All projects, newest first.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, description, created_at FROM projects
                 ORDER BY created_at DESC, id DESC",
            )
            .context("Failed to prepare list_projects")?;
        let rows = stmt
            .query_map([], project_from_row)
            .context("Failed to query projects")?;
        let mut projects = Vec::new();
        for row in rows {
            projects.push(row.context("Failed to read project row")?);
        }
        Ok(projects)
    }

    pub fn get_project(&self, id: i64) -> Result<Option<Project>> {
        self.conn
            .query_row(
                "SELECT id, name, description, created_at FROM projects WHERE id = ?1",
                params![id],
                project_from_row,
            )
            .optional()
            .context("Failed to query project")
    }

    /// Replace a project's name and description. `None` if it does not exist.
    pub fn update_project(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
    ) -> Result<Option<Project>> {
        let count = self
            .conn
            .execute(
                "UPDATE projects SET name = ?1, description = ?2 WHERE id = ?3",
                params![name, description, id],
            )
            .context("Failed to update project")?;
        if count == 0 {
            return Ok(None);
        }
        self.get_project(id)
    }

    /// Delete a project and its messages. Returns `false` if it did not exist.
    pub fn delete_project(&self, id: i64) -> Result<bool> {
        // Safety: DbHandle's Mutex already guarantees single-threaded access.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        tx.execute("DELETE FROM messages WHERE project_id = ?1", params![id])
            .context("Failed to delete project messages")?;
        let count = tx
            .execute("DELETE FROM projects WHERE id = ?1", params![id])
            .context("Failed to delete project")?;
        tx.commit().context("Failed to commit project delete")?;
        Ok(count > 0)
    }

    // ── Messages ──────────────────────────────────────────────────────

    pub fn insert_message(&self, project_id: i64, sender: Sender, text: &str) -> Result<Message> {
        self.conn
            .execute(
                "INSERT INTO messages (project_id, sender, text) VALUES (?1, ?2, ?3)",
                params![project_id, sender.as_str(), text],
            )
            .context("Failed to insert message")?;
        let id = self.conn.last_insert_rowid();
        self.get_message(id)?
            .context("Message not found after insert")
    }

    pub fn get_message(&self, id: i64) -> Result<Option<Message>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, project_id, sender, text, created_at FROM messages WHERE id = ?1",
                params![id],
                message_row_from_row,
            )
            .optional()
            .context("Failed to query message")?;
        row.map(MessageRow::into_message).transpose()
    }

    /// Messages of a project, oldest first.
    pub fn list_messages(&self, project_id: i64) -> Result<Vec<Message>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, project_id, sender, text, created_at FROM messages
                 WHERE project_id = ?1 ORDER BY created_at ASC, id ASC",
            )
            .context("Failed to prepare list_messages")?;
        let rows = stmt
            .query_map(params![project_id], message_row_from_row)
            .context("Failed to query messages")?;
        let mut messages = Vec::new();
        for row in rows {
            let r = row.context("Failed to read message row")?;
            messages.push(r.into_message()?);
        }
        Ok(messages)
    }
}

fn project_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Raw row before the sender column is parsed.
struct MessageRow {
    id: i64,
    project_id: i64,
    sender: String,
    text: String,
    created_at: String,
}

fn message_row_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        sender: row.get(2)?,
        text: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl MessageRow {
    fn into_message(self) -> Result<Message> {
        let sender = Sender::from_str(&self.sender).map_err(|e| anyhow::anyhow!(e))?;
        Ok(Message {
            id: self.id,
            project_id: self.project_id,
            sender,
            text: self.text,
            created_at: self.created_at,
        })
    }
}
