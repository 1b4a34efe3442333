//! SQLite persistence for tasks.
//!
//! # Design
//! `TaskStore` wraps a single `rusqlite::Connection` behind `Arc<Mutex<_>>`
//! and is handed to the router as state; clones share the connection and the
//! database closes when the last clone drops. Every public method moves its
//! SQLite work onto tokio's blocking pool so request handlers never block the
//! reactor.
//!
//! Creation and update run inside an `IMMEDIATE` transaction: the write lock
//! is taken before the duplicate check, so two writers can never both observe
//! "no pending task with this title" and both write one. Listing reads the count and
//! the page inside one transaction so both reflect the same snapshot.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use thiserror::Error;
use uuid::Uuid;

use crate::task::{NewTask, Task, TaskChanges, TaskStatus};

const MEMORY_PATH: &str = ":memory:";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA_TASKS: &str = "CREATE TABLE IF NOT EXISTS tasks (
    id TEXT NOT NULL PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'Todo' CHECK (status IN ('Todo', 'In_Progress', 'Done')),
    deadline TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS tasks_created_at ON tasks (created_at);
CREATE INDEX IF NOT EXISTS tasks_title_status ON tasks (title, status);";

const TASK_COLUMNS: &str = "id, title, description, status, deadline, created_at";
const COUNT_TASKS: &str = "SELECT COUNT(*) FROM tasks";
const SELECT_STATE_BY_ID: &str = "SELECT title, status FROM tasks WHERE id = ?1";
// `id IS NOT NULL` holds for every row, so a NULL `?2` excludes nothing.
const SELECT_PENDING_BY_TITLE: &str =
    "SELECT id FROM tasks WHERE title = ?1 AND status = 'Todo' AND id IS NOT ?2 LIMIT 1";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("a pending task titled {title:?} already exists")]
    DuplicatePending { title: String },

    #[error("task not found")]
    NotFound,

    #[error("database connection lock poisoned")]
    Poisoned,

    #[error("database worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl StoreError {
    /// SQLite primary error code name, when the failure came from SQLite.
    pub fn code(&self) -> Option<String> {
        match self {
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => {
                Some(format!("{:?}", err.code))
            }
            _ => None,
        }
    }
}

impl ToSql for TaskStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TaskStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        TaskStatus::parse(raw).ok_or_else(|| FromSqlError::Other(format!("unknown status {raw:?}").into()))
    }
}

/// True when a `Todo` task titled `title` exists, ignoring the row `except`.
fn pending_title_taken(conn: &Connection, title: &str, except: Option<&str>) -> rusqlite::Result<bool> {
    conn.query_row(SELECT_PENDING_BY_TITLE, params![title, except], |row| row.get::<_, String>(0))
        .optional()
        .map(|existing| existing.is_some())
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let id: String = row.get(0)?;
    let id = Uuid::parse_str(&id)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;
    Ok(Task {
        id,
        title: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        deadline: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[derive(Debug, Clone)]
pub struct TaskStore {
    conn: Arc<Mutex<Connection>>,
}

impl TaskStore {
    /// Open (or create) the database at `path`. `":memory:"` opens a private
    /// in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if path == Path::new(MEMORY_PATH) {
            return Self::open_in_memory();
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(path = %path.display(), journal_mode = %mode, "opened task database");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA_TASKS)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn call<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut conn)
        })
        .await?
    }

    /// Total row count plus one page of tasks, newest first, read from a
    /// single snapshot.
    pub async fn list_page(&self, offset: u64, limit: u32) -> Result<(u64, Vec<Task>), StoreError> {
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let total: i64 = tx.query_row(COUNT_TASKS, [], |row| row.get(0))?;
            let tasks = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at DESC, rowid DESC LIMIT ?1 OFFSET ?2"
                ))?;
                let rows = stmt.query_map(params![limit, offset], task_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            };
            tx.commit()?;
            Ok((total.max(0) as u64, tasks))
        })
        .await
    }

    /// Insert a task. A `Todo` task is refused when another `Todo` task with
    /// the same title exists.
    pub async fn create(&self, new: NewTask) -> Result<Task, StoreError> {
        self.call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if new.status == TaskStatus::Todo && pending_title_taken(&tx, &new.title, None)? {
                return Err(StoreError::DuplicatePending { title: new.title });
            }
            let task = tx.query_row(
                &format!(
                    "INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING {TASK_COLUMNS}"
                ),
                params![
                    Uuid::new_v4().to_string(),
                    new.title,
                    new.description,
                    new.status,
                    new.deadline,
                    Utc::now(),
                ],
                task_from_row,
            )?;
            tx.commit()?;
            Ok(task)
        })
        .await
    }

    pub async fn get(&self, id: Uuid) -> Result<Task, StoreError> {
        self.call(move |conn| {
            conn.query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id.to_string()],
                task_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound)
        })
        .await
    }

    /// Apply the supplied fields to the task with `id` and return the new row.
    /// Refused when the resulting row would be a second `Todo` task with the
    /// same title.
    pub async fn update(&self, id: Uuid, changes: TaskChanges) -> Result<Task, StoreError> {
        self.call(move |conn| {
            let id = id.to_string();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let (title, status): (String, TaskStatus) = tx
                .query_row(SELECT_STATE_BY_ID, params![id], |row| Ok((row.get(0)?, row.get(1)?)))
                .optional()?
                .ok_or(StoreError::NotFound)?;

            let title = changes.title.clone().unwrap_or(title);
            let status = changes.status.unwrap_or(status);
            if status == TaskStatus::Todo && pending_title_taken(&tx, &title, Some(id.as_str()))? {
                return Err(StoreError::DuplicatePending { title });
            }

            let task = tx.query_row(
                &format!(
                    "UPDATE tasks SET
                        title = COALESCE(?2, title),
                        description = COALESCE(?3, description),
                        status = COALESCE(?4, status),
                        deadline = COALESCE(?5, deadline)
                     WHERE id = ?1
                     RETURNING {TASK_COLUMNS}"
                ),
                params![id, changes.title, changes.description, changes.status, changes.deadline],
                task_from_row,
            )?;
            tx.commit()?;
            Ok(task)
        })
        .await
    }

    /// Delete the task with `id`, returning the row as it was.
    pub async fn delete(&self, id: Uuid) -> Result<Task, StoreError> {
        self.call(move |conn| {
            conn.query_row(
                &format!("DELETE FROM tasks WHERE id = ?1 RETURNING {TASK_COLUMNS}"),
                params![id.to_string()],
                task_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound)
        })
        .await
    }
}
