//! In-memory task store (non-persistent).

use super::{sort_newest_first, StoreError, TaskStore, TaskWriter, UserDirectory};
use crate::task::{NewTask, Task, TaskId, TaskStatus, TaskUpdate, User, UserId};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    tasks: HashMap<TaskId, Task>,
    next_user_id: i64,
    next_task_id: i64,
}

#[derive(Clone)]
pub struct InMemoryTaskStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
        }
    }

    async fn select<F>(&self, user_id: UserId, keep: F) -> Vec<Task>
    where
        F: Fn(&Task) -> bool,
    {
        let tables = self.tables.read().await;
        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|t| t.user_id == user_id && keep(t))
            .cloned()
            .collect();
        sort_newest_first(&mut tasks);
        tasks
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Task>, StoreError> {
        Ok(self.select(user_id, |_| true).await)
    }

    async fn list_by_status(
        &self,
        user_id: UserId,
        status: TaskStatus,
    ) -> Result<Vec<Task>, StoreError> {
        Ok(self.select(user_id, |t| t.status == status).await)
    }

    async fn list_by_status_and_reminder(
        &self,
        user_id: UserId,
        status: TaskStatus,
        reminder_sent: bool,
    ) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .select(user_id, |t| {
                t.status == status && t.reminder_sent == reminder_sent
            })
            .await)
    }

    async fn get_for_user(&self, id: TaskId, user_id: UserId) -> Result<Option<Task>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .tasks
            .get(&id)
            .filter(|t| t.user_id == user_id)
            .cloned())
    }

    async fn count_by_status(&self, user_id: UserId, status: TaskStatus) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        let count = tables
            .tasks
            .values()
            .filter(|t| t.user_id == user_id && t.status == status)
            .count();
        Ok(count as u64)
    }
}

#[async_trait]
impl UserDirectory for InMemoryTaskStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}

#[async_trait]
impl TaskWriter for InMemoryTaskStore {
    async fn insert_user(&self, email: &str, username: &str) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail(email.to_string()));
        }
        tables.next_user_id += 1;
        let user = User {
            id: UserId(tables.next_user_id),
            email: email.to_string(),
            username: username.to_string(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn insert_task(&self, user_id: UserId, task: NewTask) -> Result<Task, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::UnknownUser(user_id));
        }
        tables.next_task_id += 1;
        let now = Utc::now();
        let task = Task {
            id: TaskId(tables.next_task_id),
            user_id,
            title: task.title,
            description: task.description,
            priority: task.priority,
            status: TaskStatus::Pending,
            due_date: task.due_date,
            created_at: task.created_at.unwrap_or(now),
            updated_at: now,
            reminder_sent: false,
        };
        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn mark_reminder_sent(&self, id: TaskId, user_id: UserId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.tasks.get_mut(&id) {
            Some(task) if task.user_id == user_id => {
                task.reminder_sent = true;
                task.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_status(
        &self,
        id: TaskId,
        user_id: UserId,
        status: TaskStatus,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.tasks.get_mut(&id) {
            Some(task) if task.user_id == user_id => {
                task.status = status;
                task.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_task(
        &self,
        id: TaskId,
        user_id: UserId,
        update: TaskUpdate,
    ) -> Result<Option<Task>, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.tasks.get_mut(&id) {
            Some(task) if task.user_id == user_id => {
                update.apply(task, Utc::now());
                Ok(Some(task.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_task(&self, id: TaskId, user_id: UserId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .tasks
            .get(&id)
            .is_some_and(|task| task.user_id == user_id);
        if owned {
            tables.tasks.remove(&id);
        }
        Ok(owned)
    }
}
