//! API request and response types.

use serde::{Deserialize, Serialize};

use crate::notify::{DispatchOutcome, TaskReminder};
use crate::task::{TaskId, User};

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Whether notifications go out over SMTP or only to the log
    pub mail_configured: bool,
    /// Configured store backend (`memory` or `sqlite`)
    pub store: String,
    /// Whether stored data survives a restart
    pub persistent: bool,
}

/// Body of `POST /api/users`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
}

/// A registered user and how the verification email was handled.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user: User,
    pub verification: DispatchStatus,
}

/// Per-status task counts for the principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub pending: u64,
    pub completed: u64,
    pub total: u64,
}

/// Body of `POST /api/tasks/send-reminder`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReminderRequest {
    /// Task to flag as reminded once the email is handled
    pub task_id: Option<TaskId>,
    pub task_title: String,
    #[serde(default)]
    pub task_description: String,
    pub due_date: String,
    pub hours_until_due: i64,
}

impl SendReminderRequest {
    pub fn reminder(&self) -> TaskReminder {
        TaskReminder {
            title: self.task_title.clone(),
            description: self.task_description.clone(),
            due_date: self.due_date.clone(),
            hours_until_due: self.hours_until_due,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Sent,
    Skipped,
    Failed,
}

impl DispatchStatus {
    pub fn of(outcome: &DispatchOutcome) -> Self {
        match outcome {
            DispatchOutcome::Sent { .. } => DispatchStatus::Sent,
            DispatchOutcome::Skipped { .. } => DispatchStatus::Skipped,
            DispatchOutcome::Failed { .. } => DispatchStatus::Failed,
        }
    }
}

/// Result of a reminder dispatch as reported to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReminderResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    pub status: DispatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub reminder_marked: bool,
}

impl SendReminderResponse {
    pub fn from_outcome(
        task_id: Option<TaskId>,
        outcome: &DispatchOutcome,
        reminder_marked: bool,
    ) -> Self {
        let error = match outcome {
            DispatchOutcome::Failed { error, .. } => Some(error.to_string()),
            _ => None,
        };
        Self {
            task_id,
            status: DispatchStatus::of(outcome),
            recipient: outcome.recipient().map(str::to_string),
            error,
            reminder_marked,
        }
    }
}
