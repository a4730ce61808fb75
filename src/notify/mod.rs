//! Best-effort email notifications.
//!
//! Two templates exist: account verification and task reminders. Each
//! dispatch either delivers through a [`MailTransport`], or, when mail is not
//! configured, logs what would have been sent. Failures are logged and
//! reported in the [`DispatchOutcome`]; they never surface as errors.

mod dispatcher;
pub mod templates;
mod transport;

pub use dispatcher::NotificationDispatcher;
pub use transport::{MailMessage, MailTransport, SmtpMailer, TransportError};

use chrono::SecondsFormat;

use crate::task::{DueReminder, Task};

/// Fields of a task reminder email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReminder {
    pub title: String,
    pub description: String,
    /// Display form of the due date, passed through as given.
    pub due_date: String,
    /// May be zero or negative; not validated.
    pub hours_until_due: i64,
}

impl TaskReminder {
    pub fn from_task(task: &Task, hours_until_due: i64) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task
                .due_date
                .map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_else(|| "not set".to_string()),
            hours_until_due,
        }
    }
}

impl From<&DueReminder> for TaskReminder {
    fn from(due: &DueReminder) -> Self {
        Self::from_task(&due.task, due.hours_until_due)
    }
}

/// Template selection plus template-specific fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateKind {
    Verification { code: String },
    Reminder(TaskReminder),
}

impl TemplateKind {
    /// Short name used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            TemplateKind::Verification { .. } => "verification",
            TemplateKind::Reminder(_) => "task reminder",
        }
    }
}

/// One notification to one recipient. Built per call and discarded after
/// the dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub recipient: String,
    pub username: String,
    pub kind: TemplateKind,
}

impl NotificationRequest {
    pub fn verification(recipient: &str, username: &str, code: &str) -> Self {
        Self {
            recipient: recipient.to_string(),
            username: username.to_string(),
            kind: TemplateKind::Verification {
                code: code.to_string(),
            },
        }
    }

    pub fn reminder(recipient: &str, username: &str, reminder: TaskReminder) -> Self {
        Self {
            recipient: recipient.to_string(),
            username: username.to_string(),
            kind: TemplateKind::Reminder(reminder),
        }
    }

    pub fn subject(&self) -> String {
        match &self.kind {
            TemplateKind::Verification { .. } => templates::VERIFICATION_SUBJECT.to_string(),
            TemplateKind::Reminder(r) => templates::reminder_subject(&r.title),
        }
    }

    pub fn body(&self) -> String {
        match &self.kind {
            TemplateKind::Verification { code } => {
                templates::verification_body(&self.username, code)
            }
            TemplateKind::Reminder(r) => templates::reminder_body(
                &self.username,
                &r.title,
                &r.description,
                &r.due_date,
                r.hours_until_due,
            ),
        }
    }

    /// Render into a message sent from `sender`.
    pub fn render(&self, sender: &str) -> MailMessage {
        MailMessage {
            from: sender.to_string(),
            to: self.recipient.clone(),
            subject: self.subject(),
            body: self.body(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("No authenticated principal")]
    MissingPrincipal,

    #[error("User not found for {0}")]
    UserNotFound(String),

    #[error("User lookup failed: {0}")]
    Lookup(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result of a best-effort dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The transport accepted the message.
    Sent { recipient: String },
    /// Mail is not configured; the message was logged instead.
    Skipped { recipient: String },
    /// Nothing was delivered. `recipient` is absent when no principal was given.
    Failed {
        recipient: Option<String>,
        error: DispatchError,
    },
}

impl DispatchOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, DispatchOutcome::Failed { .. })
    }

    pub fn recipient(&self) -> Option<&str> {
        match self {
            DispatchOutcome::Sent { recipient } | DispatchOutcome::Skipped { recipient } => {
                Some(recipient)
            }
            DispatchOutcome::Failed { recipient, .. } => recipient.as_deref(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{TaskId, TaskPriority, TaskStatus, UserId};
    use chrono::{TimeZone, Utc};

    #[test]
    fn verification_request_renders_fixed_subject() {
        let message = NotificationRequest::verification("alice@example.com", "alice", "123456")
            .render("smtp-configured@example.com");
        assert_eq!(message.from, "smtp-configured@example.com");
        assert_eq!(message.to, "alice@example.com");
        assert_eq!(message.subject, "TaskManager Pro - Verify Your Email");
        assert!(message.body.contains("alice"));
        assert!(message.body.contains("123456"));
    }

    #[test]
    fn reminder_from_task_formats_due_date() {
        let due = Utc.with_ymd_and_hms(2026, 6, 1, 14, 0, 0).unwrap();
        let task = Task {
            id: TaskId(1),
            user_id: UserId(1),
            title: "Pay rent".to_string(),
            description: "Transfer to landlord".to_string(),
            priority: TaskPriority::High,
            status: TaskStatus::Pending,
            due_date: Some(due),
            created_at: due,
            updated_at: due,
            reminder_sent: false,
        };
        let reminder = TaskReminder::from_task(&task, 2);
        assert_eq!(reminder.due_date, "2026-06-01T14:00:00Z");
        assert_eq!(reminder.hours_until_due, 2);

        let undated = TaskReminder::from_task(
            &Task {
                due_date: None,
                ..task
            },
            0,
        );
        assert_eq!(undated.due_date, "not set");
    }

    #[test]
    fn outcome_exposes_recipient() {
        let sent = DispatchOutcome::Sent {
            recipient: "a@example.com".to_string(),
        };
        assert_eq!(sent.recipient(), Some("a@example.com"));
        assert!(!sent.is_failed());

        let failed = DispatchOutcome::Failed {
            recipient: None,
            error: DispatchError::MissingPrincipal,
        };
        assert_eq!(failed.recipient(), None);
        assert!(failed.is_failed());
    }
}
