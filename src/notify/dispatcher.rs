//! Notification dispatcher: configuration gate, template rendering and a
//! single delivery attempt per call.

use std::sync::Arc;

use super::{
    DispatchError, DispatchOutcome, MailTransport, NotificationRequest, TaskReminder,
};
use crate::config::MailConfig;
use crate::store::UserDirectory;
use crate::task::User;

/// Sends verification and reminder emails.
///
/// Holds no mutable state; share it behind an `Arc` across request handlers.
pub struct NotificationDispatcher {
    mail: MailConfig,
    transport: Arc<dyn MailTransport>,
    users: Arc<dyn UserDirectory>,
}

impl NotificationDispatcher {
    pub fn new(
        mail: MailConfig,
        transport: Arc<dyn MailTransport>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        if mail.is_configured() {
            tracing::info!("Email delivery enabled (sender: {})", mail.sender.trim());
        } else {
            tracing::warn!("Email not configured; notifications will be logged to the console");
        }
        Self {
            mail,
            transport,
            users,
        }
    }

    /// Whether a dispatch would reach the transport.
    pub fn is_configured(&self) -> bool {
        self.mail.is_configured()
    }

    /// Send the account verification code to `to_email`.
    ///
    /// Never fails the caller: registration continues whatever the outcome.
    pub async fn send_verification(
        &self,
        to_email: &str,
        verification_code: &str,
        username: &str,
    ) -> DispatchOutcome {
        if !self.mail.is_configured() {
            tracing::info!(
                recipient = %to_email,
                username = %username,
                verification_code = %verification_code,
                "Email not configured, logging verification code instead of sending"
            );
            return DispatchOutcome::Skipped {
                recipient: to_email.to_string(),
            };
        }

        let request = NotificationRequest::verification(to_email, username, verification_code);
        self.deliver(&request).await
    }

    /// Remind the principal identified by `principal_email` about a task.
    ///
    /// The caller resolves the principal; the dispatcher looks up the owning
    /// user for the greeting and aborts quietly if there is none.
    pub async fn send_task_reminder(
        &self,
        principal_email: Option<&str>,
        reminder: &TaskReminder,
    ) -> DispatchOutcome {
        match self.resolve_recipient(principal_email, &reminder.title).await {
            Ok(user) => self.send_reminder_to(&user, reminder).await,
            Err(outcome) => outcome,
        }
    }

    /// Look up the user behind `principal_email`.
    ///
    /// On failure the error is logged and returned as the `Failed` outcome to
    /// report. `task_title` only feeds the log line.
    pub async fn resolve_recipient(
        &self,
        principal_email: Option<&str>,
        task_title: &str,
    ) -> Result<User, DispatchOutcome> {
        let Some(email) = principal_email else {
            tracing::error!("No principal for task reminder '{}'", task_title);
            return Err(DispatchOutcome::Failed {
                recipient: None,
                error: DispatchError::MissingPrincipal,
            });
        };

        match self.users.find_by_email(email).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                tracing::error!(recipient = %email, "User not found for task reminder");
                Err(DispatchOutcome::Failed {
                    recipient: Some(email.to_string()),
                    error: DispatchError::UserNotFound(email.to_string()),
                })
            }
            Err(e) => {
                tracing::error!(recipient = %email, "User lookup failed for task reminder: {}", e);
                Err(DispatchOutcome::Failed {
                    recipient: Some(email.to_string()),
                    error: DispatchError::Lookup(e.to_string()),
                })
            }
        }
    }

    /// Remind an already resolved user.
    pub async fn send_reminder_to(&self, user: &User, reminder: &TaskReminder) -> DispatchOutcome {
        if !self.mail.is_configured() {
            tracing::info!(
                recipient = %user.email,
                task = %reminder.title,
                hours_until_due = reminder.hours_until_due,
                "Email not configured, logging task reminder instead of sending"
            );
            return DispatchOutcome::Skipped {
                recipient: user.email.clone(),
            };
        }

        let request = NotificationRequest::reminder(&user.email, &user.username, reminder.clone());
        self.deliver(&request).await
    }

    async fn deliver(&self, request: &NotificationRequest) -> DispatchOutcome {
        let message = request.render(self.mail.sender.trim());
        let label = request.kind.label();

        match self.transport.send(&message).await {
            Ok(()) => {
                tracing::info!("{} email sent successfully to: {}", label, request.recipient);
                DispatchOutcome::Sent {
                    recipient: request.recipient.clone(),
                }
            }
            Err(e) => {
                tracing::error!(
                    recipient = %request.recipient,
                    "Failed to send {} email: {}",
                    label,
                    e
                );
                DispatchOutcome::Failed {
                    recipient: Some(request.recipient.clone()),
                    error: DispatchError::Transport(e),
                }
            }
        }
    }
}
