//! # taskmail
//!
//! Per-user task storage with best-effort email notifications.
//!
//! This library provides:
//! - A task store with owner-scoped reads (in-memory and SQLite backends)
//! - Reminder selection for pending tasks due within the next day
//! - A notification dispatcher for verification and reminder emails that
//!   falls back to logging when mail is not configured
//! - An HTTP API over the above
//!
//! ## Reminder Flow
//! 1. `due_reminders` picks pending, unreminded tasks due soon
//! 2. The dispatcher resolves the principal and renders the reminder
//! 3. The mail transport delivers it, or the dispatcher logs it
//! 4. The task is flagged so it is not reminded twice

pub mod api;
pub mod config;
pub mod notify;
pub mod store;
pub mod task;

pub use config::Config;
pub use notify::{DispatchOutcome, NotificationDispatcher};
pub use store::{SharedStorage, StoreType};
