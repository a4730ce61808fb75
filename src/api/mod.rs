//! HTTP API for the task service.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `POST /api/users` - Register a user and send the verification email
//! - `GET /api/tasks` - All tasks of the principal, newest first
//! - `POST /api/tasks` - Create a task
//! - `GET /api/tasks/pending` - Pending tasks
//! - `GET /api/tasks/completed` - Completed tasks
//! - `GET /api/tasks/stats` - Pending/completed counts
//! - `GET /api/tasks/reminders/due` - Tasks due within the reminder window
//! - `POST /api/tasks/reminders/send-due` - Remind the principal of every due task
//! - `GET /api/tasks/{id}` - A single task owned by the principal
//! - `PUT /api/tasks/{id}` - Replace a task's editable fields
//! - `DELETE /api/tasks/{id}` - Delete a task
//! - `PATCH /api/tasks/{id}/complete` - Mark a task completed
//! - `PATCH /api/tasks/{id}/pending` - Reopen a task
//! - `POST /api/tasks/send-reminder` - Email a task reminder to the principal
//!
//! The principal is taken from the `X-Principal-Email` header, which the
//! fronting authentication layer sets.

mod principal;
mod routes;
mod tasks;
mod users;
pub mod types;

pub use principal::{Principal, PRINCIPAL_HEADER};
pub use routes::{build_router, serve, AppState};
pub use types::*;
