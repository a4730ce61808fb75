//! Reminder selection.
//!
//! Decides which tasks are close enough to their due date to warrant a
//! reminder. Nothing here sends mail or runs on a timer; callers decide when
//! to evaluate and hand the result to the notifier.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::task::{Task, TaskStatus, UserId};
use crate::store::{StoreError, TaskStore};

/// A pending task is due for a reminder once its due date is this close.
pub const REMINDER_WINDOW_HOURS: i64 = 24;

const MILLIS_PER_HOUR: i64 = 60 * 60 * 1000;

/// Whole hours until `due`, rounded up. Past due dates yield zero or a
/// negative count.
pub fn hours_until_due(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (due - now).num_milliseconds();
    let hours = millis.div_euclid(MILLIS_PER_HOUR);
    if millis.rem_euclid(MILLIS_PER_HOUR) == 0 {
        hours
    } else {
        hours + 1
    }
}

/// Pending, not yet reminded, and due within the next
/// [`REMINDER_WINDOW_HOURS`] (exclusive of `now`, inclusive of the edge).
pub fn is_due_for_reminder(task: &Task, now: DateTime<Utc>) -> bool {
    if task.status != TaskStatus::Pending || task.reminder_sent {
        return false;
    }
    match task.due_date {
        Some(due) => due > now && due <= now + Duration::hours(REMINDER_WINDOW_HOURS),
        None => false,
    }
}

/// A task selected for a reminder, with the hour count to put in the email.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueReminder {
    pub task: Task,
    pub hours_until_due: i64,
}

/// Tasks of `user_id` that should get a reminder at `now`, newest first.
pub async fn due_reminders<S>(
    store: &S,
    user_id: UserId,
    now: DateTime<Utc>,
) -> Result<Vec<DueReminder>, StoreError>
where
    S: TaskStore + ?Sized,
{
    let candidates = store
        .list_by_status_and_reminder(user_id, TaskStatus::Pending, false)
        .await?;

    Ok(candidates
        .into_iter()
        .filter(|task| is_due_for_reminder(task, now))
        .filter_map(|task| {
            let due = task.due_date?;
            Some(DueReminder {
                hours_until_due: hours_until_due(due, now),
                task,
            })
        })
        .collect())
}
