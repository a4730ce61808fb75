//! Task storage with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing and demos)
//! - `sqlite`: SQLite database file
//!
//! Reads are split from writes: the notifier and the HTTP layer only need
//! [`TaskStore`] and [`UserDirectory`], while [`TaskWriter`] belongs to the
//! surrounding application.

mod memory;
mod sqlite;

pub use memory::InMemoryTaskStore;
pub use sqlite::SqliteTaskStore;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::task::{NewTask, Task, TaskId, TaskStatus, TaskUpdate, User, UserId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage task failed: {0}")]
    Join(String),

    #[error("User {0} not found")]
    UnknownUser(UserId),

    #[error("Email already registered: {0}")]
    DuplicateEmail(String),
}

/// Read-only task queries, always scoped to one owner.
///
/// Every list is ordered newest first by `created_at`; equal timestamps are
/// ordered by descending id.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// All tasks owned by `user_id`.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Task>, StoreError>;

    /// Tasks owned by `user_id` with the given status.
    async fn list_by_status(
        &self,
        user_id: UserId,
        status: TaskStatus,
    ) -> Result<Vec<Task>, StoreError>;

    /// Tasks owned by `user_id` with the given status and reminder flag.
    async fn list_by_status_and_reminder(
        &self,
        user_id: UserId,
        status: TaskStatus,
        reminder_sent: bool,
    ) -> Result<Vec<Task>, StoreError>;

    /// A single task, only if it belongs to `user_id`.
    async fn get_for_user(&self, id: TaskId, user_id: UserId) -> Result<Option<Task>, StoreError>;

    /// Number of tasks owned by `user_id` with the given status.
    async fn count_by_status(&self, user_id: UserId, status: TaskStatus) -> Result<u64, StoreError>;
}

/// User lookup by email address.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

/// Mutations performed by the surrounding application.
#[async_trait]
pub trait TaskWriter: Send + Sync {
    async fn insert_user(&self, email: &str, username: &str) -> Result<User, StoreError>;

    async fn insert_task(&self, user_id: UserId, task: NewTask) -> Result<Task, StoreError>;

    /// Set the reminder flag. Returns `false` if the task does not exist for
    /// this owner.
    async fn mark_reminder_sent(&self, id: TaskId, user_id: UserId) -> Result<bool, StoreError>;

    /// Move a task to `status`. Returns `false` if the task does not exist
    /// for this owner.
    async fn set_status(
        &self,
        id: TaskId,
        user_id: UserId,
        status: TaskStatus,
    ) -> Result<bool, StoreError>;

    /// Replace the editable fields. `None` if the task does not exist for
    /// this owner.
    async fn update_task(
        &self,
        id: TaskId,
        user_id: UserId,
        update: TaskUpdate,
    ) -> Result<Option<Task>, StoreError>;

    /// Remove a task. Returns `false` if the task does not exist for this
    /// owner.
    async fn delete_task(&self, id: TaskId, user_id: UserId) -> Result<bool, StoreError>;
}

/// A full storage backend.
pub trait Storage: TaskStore + UserDirectory + TaskWriter {
    /// View this backend as a plain user directory (for the notifier).
    fn into_user_directory(self: Arc<Self>) -> Arc<dyn UserDirectory>;
}

impl<T> Storage for T
where
    T: TaskStore + UserDirectory + TaskWriter + 'static,
{
    fn into_user_directory(self: Arc<Self>) -> Arc<dyn UserDirectory> {
        self
    }
}

/// Shared storage backend.
pub type SharedStorage = Arc<dyn Storage>;

/// Order tasks newest first, breaking ties by descending id.
pub(crate) fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// Store type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreType {
    Memory,
    #[default]
    Sqlite,
}

impl StoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
        }
    }

    /// Parse from environment variable value.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" => Self::Memory,
            "sqlite" | "db" => Self::Sqlite,
            _ => Self::default(),
        }
    }
}

/// Create a store based on type and configuration.
pub async fn create_store(
    store_type: StoreType,
    database_path: PathBuf,
) -> Result<SharedStorage, StoreError> {
    match store_type {
        StoreType::Memory => Ok(Arc::new(InMemoryTaskStore::new())),
        StoreType::Sqlite => {
            let store = SqliteTaskStore::open(database_path).await?;
            Ok(Arc::new(store))
        }
    }
}
