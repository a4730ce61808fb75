//! Task module - task and user records plus reminder selection.
//!
//! Pure functions are kept separate from IO: `reminder` decides which tasks
//! need a reminder, the store and notifier do the rest.

pub mod reminder;
pub mod task;

pub use reminder::{
    due_reminders, hours_until_due, is_due_for_reminder, DueReminder, REMINDER_WINDOW_HOURS,
};
pub use task::{NewTask, Task, TaskId, TaskPriority, TaskStatus, TaskUpdate, User, UserId};
