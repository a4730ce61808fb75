//! SQLite-backed task store.

use super::{StoreError, TaskStore, TaskWriter, UserDirectory};
use crate::task::{NewTask, Task, TaskId, TaskPriority, TaskStatus, TaskUpdate, User, UserId};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    username TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    priority TEXT NOT NULL DEFAULT 'MEDIUM',
    status TEXT NOT NULL DEFAULT 'PENDING',
    due_date TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    reminder_sent INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_tasks_user_created ON tasks(user_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_tasks_user_status ON tasks(user_id, status, reminder_sent);
"#;

const TASK_COLUMNS: &str = "id, user_id, title, description, priority, status, due_date, \
                            created_at, updated_at, reminder_sent";

const NEWEST_FIRST: &str = "ORDER BY created_at DESC, id DESC";

pub struct SqliteTaskStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTaskStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub async fn open(path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let db_path = path.clone();
        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute_batch(SCHEMA)?;
            Ok::<_, StoreError>(conn)
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))??;

        tracing::info!("Opened task database at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            f(&mut *conn)
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }
}

fn get_task(conn: &Connection, id: TaskId, user_id: UserId) -> Result<Option<Task>, StoreError> {
    let sql = format!(
        "SELECT {} FROM tasks WHERE id = ?1 AND user_id = ?2",
        TASK_COLUMNS
    );
    let task = conn
        .query_row(&sql, params![id.0, user_id.0], task_from_row)
        .optional()?;
    Ok(task)
}

fn query_tasks(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<Task>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let tasks = stmt
        .query_map(params, task_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tasks)
}

/// Timestamps are stored with fixed microsecond precision so that text
/// ordering matches chronological ordering.
fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn bad_value(idx: usize, what: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unknown {} '{}'", what, value).into(),
    )
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let priority: String = row.get(4)?;
    let status: String = row.get(5)?;
    let due_date: Option<String> = row.get(6)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(Task {
        id: TaskId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        title: row.get(2)?,
        description: row.get(3)?,
        priority: TaskPriority::parse(&priority)
            .ok_or_else(|| bad_value(4, "priority", &priority))?,
        status: TaskStatus::parse(&status).ok_or_else(|| bad_value(5, "status", &status))?,
        due_date: due_date.as_deref().map(|d| parse_time(6, d)).transpose()?,
        created_at: parse_time(7, &created_at)?,
        updated_at: parse_time(8, &updated_at)?,
        reminder_sent: row.get(9)?,
    })
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Task>, StoreError> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {} FROM tasks WHERE user_id = ?1 {}",
                TASK_COLUMNS, NEWEST_FIRST
            );
            query_tasks(conn, &sql, params![user_id.0])
        })
        .await
    }

    async fn list_by_status(
        &self,
        user_id: UserId,
        status: TaskStatus,
    ) -> Result<Vec<Task>, StoreError> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {} FROM tasks WHERE user_id = ?1 AND status = ?2 {}",
                TASK_COLUMNS, NEWEST_FIRST
            );
            query_tasks(conn, &sql, params![user_id.0, status.as_str()])
        })
        .await
    }

    async fn list_by_status_and_reminder(
        &self,
        user_id: UserId,
        status: TaskStatus,
        reminder_sent: bool,
    ) -> Result<Vec<Task>, StoreError> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {} FROM tasks WHERE user_id = ?1 AND status = ?2 AND reminder_sent = ?3 {}",
                TASK_COLUMNS, NEWEST_FIRST
            );
            query_tasks(conn, &sql, params![user_id.0, status.as_str(), reminder_sent])
        })
        .await
    }

    async fn get_for_user(&self, id: TaskId, user_id: UserId) -> Result<Option<Task>, StoreError> {
        self.with_conn(move |conn| get_task(conn, id, user_id)).await
    }

    async fn count_by_status(&self, user_id: UserId, status: TaskStatus) -> Result<u64, StoreError> {
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM tasks WHERE user_id = ?1 AND status = ?2",
                params![user_id.0, status.as_str()],
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
        .await
    }
}

#[async_trait]
impl UserDirectory for SqliteTaskStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.to_string();
        self.with_conn(move |conn| {
            let user = conn
                .query_row(
                    "SELECT id, email, username FROM users WHERE email = ?1",
                    params![email],
                    |row| {
                        Ok(User {
                            id: UserId(row.get(0)?),
                            email: row.get(1)?,
                            username: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(user)
        })
        .await
    }
}

#[async_trait]
impl TaskWriter for SqliteTaskStore {
    async fn insert_user(&self, email: &str, username: &str) -> Result<User, StoreError> {
        let email = email.to_string();
        let username = username.to_string();
        self.with_conn(move |conn| {
            let exists = conn
                .prepare("SELECT 1 FROM users WHERE email = ?1")?
                .exists(params![email])?;
            if exists {
                return Err(StoreError::DuplicateEmail(email));
            }
            conn.execute(
                "INSERT INTO users (email, username) VALUES (?1, ?2)",
                params![email, username],
            )?;
            Ok(User {
                id: UserId(conn.last_insert_rowid()),
                email,
                username,
            })
        })
        .await
    }

    async fn insert_task(&self, user_id: UserId, task: NewTask) -> Result<Task, StoreError> {
        self.with_conn(move |conn| {
            let owner_exists = conn
                .prepare("SELECT 1 FROM users WHERE id = ?1")?
                .exists(params![user_id.0])?;
            if !owner_exists {
                return Err(StoreError::UnknownUser(user_id));
            }

            // Truncate so the returned record matches what a later read yields.
            let now = Utc::now().trunc_subsecs(6);
            let created_at = task.created_at.map(|t| t.trunc_subsecs(6)).unwrap_or(now);
            let due_date = task.due_date.map(|t| t.trunc_subsecs(6));

            conn.execute(
                "INSERT INTO tasks (user_id, title, description, priority, status, due_date, \
                 created_at, updated_at, reminder_sent) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)",
                params![
                    user_id.0,
                    task.title,
                    task.description,
                    task.priority.as_str(),
                    TaskStatus::Pending.as_str(),
                    due_date.as_ref().map(format_time),
                    format_time(&created_at),
                    format_time(&now),
                ],
            )?;

            Ok(Task {
                id: TaskId(conn.last_insert_rowid()),
                user_id,
                title: task.title,
                description: task.description,
                priority: task.priority,
                status: TaskStatus::Pending,
                due_date,
                created_at,
                updated_at: now,
                reminder_sent: false,
            })
        })
        .await
    }

    async fn mark_reminder_sent(&self, id: TaskId, user_id: UserId) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE tasks SET reminder_sent = 1, updated_at = ?1 WHERE id = ?2 AND user_id = ?3",
                params![format_time(&Utc::now()), id.0, user_id.0],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn set_status(
        &self,
        id: TaskId,
        user_id: UserId,
        status: TaskStatus,
    ) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE tasks SET status = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
                params![status.as_str(), format_time(&Utc::now()), id.0, user_id.0],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn update_task(
        &self,
        id: TaskId,
        user_id: UserId,
        mut update: TaskUpdate,
    ) -> Result<Option<Task>, StoreError> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let Some(mut task) = get_task(&tx, id, user_id)? else {
                return Ok(None);
            };

            update.due_date = update.due_date.map(|t| t.trunc_subsecs(6));
            update.apply(&mut task, Utc::now().trunc_subsecs(6));

            tx.execute(
                "UPDATE tasks SET title = ?1, description = ?2, priority = ?3, status = ?4, \
                 due_date = ?5, updated_at = ?6, reminder_sent = ?7 \
                 WHERE id = ?8 AND user_id = ?9",
                params![
                    task.title,
                    task.description,
                    task.priority.as_str(),
                    task.status.as_str(),
                    task.due_date.as_ref().map(format_time),
                    format_time(&task.updated_at),
                    task.reminder_sent,
                    id.0,
                    user_id.0,
                ],
            )?;
            tx.commit()?;
            Ok(Some(task))
        })
        .await
    }

    async fn delete_task(&self, id: TaskId, user_id: UserId) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
                params![id.0, user_id.0],
            )?;
            Ok(changed > 0)
        })
        .await
    }
}
