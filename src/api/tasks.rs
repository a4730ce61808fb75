//! Task endpoints and reminder triggers.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::Json,
    routing::{get, patch, post},
    Router,
};
use chrono::Utc;

use crate::notify::TaskReminder;
use crate::task::{
    due_reminders, DueReminder, NewTask, Task, TaskId, TaskStatus, TaskUpdate, User, UserId,
};

use super::principal::{principal_from_headers, require_principal, Principal};
use super::routes::AppState;
use super::types::{SendReminderRequest, SendReminderResponse, StatsResponse};

/// Create the task API routes.
///
/// Everything but the reminder trigger requires a principal. The trigger
/// accepts requests without one and reports the failed dispatch instead.
pub fn routes() -> Router<Arc<AppState>> {
    let owned = Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/pending", get(list_pending))
        .route("/completed", get(list_completed))
        .route("/stats", get(get_stats))
        .route("/reminders/due", get(list_due_reminders))
        .route("/reminders/send-due", post(send_due_reminders))
        .route(
            "/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/:id/complete", patch(complete_task))
        .route("/:id/pending", patch(reopen_task))
        .route_layer(middleware::from_fn(require_principal));

    Router::new()
        .merge(owned)
        .route("/send-reminder", post(send_reminder))
}

fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

async fn resolve_user(
    state: &AppState,
    principal: &Principal,
) -> Result<User, (StatusCode, String)> {
    state
        .storage
        .find_by_email(&principal.email)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                format!("User not found: {}", principal.email),
            )
        })
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<Task>>, (StatusCode, String)> {
    let user = resolve_user(&state, &principal).await?;
    let tasks = state
        .storage
        .list_for_user(user.id)
        .await
        .map_err(internal_error)?;
    Ok(Json(tasks))
}

async fn list_with_status(
    state: &AppState,
    principal: &Principal,
    status: TaskStatus,
) -> Result<Json<Vec<Task>>, (StatusCode, String)> {
    let user = resolve_user(state, principal).await?;
    let tasks = state
        .storage
        .list_by_status(user.id, status)
        .await
        .map_err(internal_error)?;
    Ok(Json(tasks))
}

async fn list_pending(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<Task>>, (StatusCode, String)> {
    list_with_status(&state, &principal, TaskStatus::Pending).await
}

async fn list_completed(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<Task>>, (StatusCode, String)> {
    list_with_status(&state, &principal, TaskStatus::Completed).await
}

async fn get_stats(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<StatsResponse>, (StatusCode, String)> {
    let user = resolve_user(&state, &principal).await?;
    let pending = state
        .storage
        .count_by_status(user.id, TaskStatus::Pending)
        .await
        .map_err(internal_error)?;
    let completed = state
        .storage
        .count_by_status(user.id, TaskStatus::Completed)
        .await
        .map_err(internal_error)?;
    Ok(Json(StatsResponse {
        pending,
        completed,
        total: pending + completed,
    }))
}

async fn list_due_reminders(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<DueReminder>>, (StatusCode, String)> {
    let user = resolve_user(&state, &principal).await?;
    let due = due_reminders(state.storage.as_ref(), user.id, Utc::now())
        .await
        .map_err(internal_error)?;
    Ok(Json(due))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<Task>, (StatusCode, String)> {
    let user = resolve_user(&state, &principal).await?;
    state
        .storage
        .get_for_user(TaskId(id), user.id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Task {} not found", id)))
}

async fn update_status(
    state: &AppState,
    principal: &Principal,
    id: i64,
    status: TaskStatus,
) -> Result<Json<Task>, (StatusCode, String)> {
    let user = resolve_user(state, principal).await?;
    let not_found = || (StatusCode::NOT_FOUND, format!("Task {} not found", id));

    let updated = state
        .storage
        .set_status(TaskId(id), user.id, status)
        .await
        .map_err(internal_error)?;
    if !updated {
        return Err(not_found());
    }

    tracing::debug!("Task {} set to {:?} by {}", id, status, principal.email);
    state
        .storage
        .get_for_user(TaskId(id), user.id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(not_found)
}

async fn complete_task(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<Task>, (StatusCode, String)> {
    update_status(&state, &principal, id, TaskStatus::Completed).await
}

async fn reopen_task(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<Task>, (StatusCode, String)> {
    update_status(&state, &principal, id, TaskStatus::Pending).await
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), (StatusCode, String)> {
    if req.title.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Title is required".to_string()));
    }
    let user = resolve_user(&state, &principal).await?;
    let task = state
        .storage
        .insert_task(user.id, req)
        .await
        .map_err(internal_error)?;
    tracing::debug!("Task {} created for {}", task.id, principal.email);
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    Json(req): Json<TaskUpdate>,
) -> Result<Json<Task>, (StatusCode, String)> {
    if req.title.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Title is required".to_string()));
    }
    let user = resolve_user(&state, &principal).await?;
    state
        .storage
        .update_task(TaskId(id), user.id, req)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Task {} not found", id)))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    let user = resolve_user(&state, &principal).await?;
    let deleted = state
        .storage
        .delete_task(TaskId(id), user.id)
        .await
        .map_err(internal_error)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, format!("Task {} not found", id)))
    }
}

/// Dispatch a reminder to the principal. Always answers 200 with the outcome.
async fn send_reminder(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SendReminderRequest>,
) -> Json<SendReminderResponse> {
    let principal = principal_from_headers(&headers);
    let reminder = req.reminder();

    let (outcome, marked) = match state
        .dispatcher
        .resolve_recipient(principal.as_deref(), &reminder.title)
        .await
    {
        Ok(user) => {
            let outcome = state.dispatcher.send_reminder_to(&user, &reminder).await;
            let marked = match req.task_id {
                Some(task_id) if !outcome.is_failed() => {
                    mark_reminded(&state, user.id, task_id).await
                }
                _ => false,
            };
            (outcome, marked)
        }
        Err(outcome) => (outcome, false),
    };

    Json(SendReminderResponse::from_outcome(req.task_id, &outcome, marked))
}

/// Remind the principal of every task currently inside the reminder window.
async fn send_due_reminders(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<SendReminderResponse>>, (StatusCode, String)> {
    let user = resolve_user(&state, &principal).await?;
    let due = due_reminders(state.storage.as_ref(), user.id, Utc::now())
        .await
        .map_err(internal_error)?;

    let mut results = Vec::with_capacity(due.len());
    for item in &due {
        let outcome = state
            .dispatcher
            .send_reminder_to(&user, &TaskReminder::from(item))
            .await;
        let marked = !outcome.is_failed() && mark_reminded(&state, user.id, item.task.id).await;
        results.push(SendReminderResponse::from_outcome(
            Some(item.task.id),
            &outcome,
            marked,
        ));
    }

    tracing::info!("Processed {} due reminder(s) for {}", results.len(), principal.email);
    Ok(Json(results))
}

async fn mark_reminded(state: &AppState, user_id: UserId, task_id: TaskId) -> bool {
    match state.storage.mark_reminder_sent(task_id, user_id).await {
        Ok(marked) => {
            if !marked {
                tracing::debug!("Task {} not flagged as reminded for user {}", task_id, user_id);
            }
            marked
        }
        Err(e) => {
            tracing::warn!("Failed to flag task {} as reminded: {}", task_id, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::DispatchStatus;
    use crate::config::{Config, MailConfig, DEFAULT_PLACEHOLDER_SENDER};
    use crate::notify::testing::RecordingTransport;
    use crate::notify::NotificationDispatcher;
    use crate::store::{InMemoryTaskStore, StoreType, TaskStore, TaskWriter};
    use axum::http::HeaderValue;
    use chrono::Duration;

    struct Fixture {
        state: Arc<AppState>,
        store: Arc<InMemoryTaskStore>,
        transport: Arc<RecordingTransport>,
        alice: UserId,
    }

    async fn fixture(sender: &str) -> Fixture {
        let store = Arc::new(InMemoryTaskStore::new());
        let alice = store
            .insert_user("alice@example.com", "alice")
            .await
            .unwrap()
            .id;
        let transport = Arc::new(RecordingTransport::new());
        let mail = MailConfig::with_sender(sender);
        let dispatcher = Arc::new(NotificationDispatcher::new(
            mail.clone(),
            transport.clone(),
            store.clone(),
        ));
        let state = Arc::new(AppState {
            config: Config::new(StoreType::Memory, mail),
            storage: store.clone(),
            dispatcher,
        });
        Fixture {
            state,
            store,
            transport,
            alice,
        }
    }

    fn alice() -> Extension<Principal> {
        Extension(Principal {
            email: "alice@example.com".to_string(),
        })
    }

    fn principal_headers(email: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            crate::api::PRINCIPAL_HEADER,
            HeaderValue::from_str(email).unwrap(),
        );
        headers
    }

    fn rent_request(task_id: Option<TaskId>) -> SendReminderRequest {
        SendReminderRequest {
            task_id,
            task_title: "Pay rent".to_string(),
            task_description: "Transfer to landlord".to_string(),
            due_date: "2026-06-01T14:00:00Z".to_string(),
            hours_until_due: 2,
        }
    }

    #[tokio::test]
    async fn lists_and_counts_by_status() {
        let f = fixture("smtp-configured@example.com").await;
        let now = Utc::now();
        f.store
            .insert_task(f.alice, NewTask::new("Old").created(now - Duration::hours(2)))
            .await
            .unwrap();
        let done = f
            .store
            .insert_task(f.alice, NewTask::new("Done").created(now - Duration::hours(1)))
            .await
            .unwrap();
        f.store
            .set_status(done.id, f.alice, TaskStatus::Completed)
            .await
            .unwrap();

        let Json(all) = list_tasks(State(f.state.clone()), alice()).await.unwrap();
        assert_eq!(
            all.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(),
            vec!["Done", "Old"]
        );

        let Json(pending) = list_pending(State(f.state.clone()), alice()).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].title, "Old");

        let Json(completed) = list_completed(State(f.state.clone()), alice()).await.unwrap();
        assert_eq!(completed.len(), 1);

        let Json(stats) = get_stats(State(f.state.clone()), alice()).await.unwrap();
        assert_eq!(
            stats,
            StatsResponse {
                pending: 1,
                completed: 1,
                total: 2
            }
        );
    }

    #[tokio::test]
    async fn unknown_principal_is_not_found() {
        let f = fixture("smtp-configured@example.com").await;
        let ghost = Extension(Principal {
            email: "ghost@example.com".to_string(),
        });
        let (status, _) = list_tasks(State(f.state.clone()), ghost).await.unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn foreign_task_is_not_found() {
        let f = fixture("smtp-configured@example.com").await;
        let bob = f.store.insert_user("bob@example.com", "bob").await.unwrap();
        let task = f.store.insert_task(bob.id, NewTask::new("Bob's")).await.unwrap();

        let (status, _) = get_task(State(f.state.clone()), alice(), Path(task.id.0))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);

        let own = f.store.insert_task(f.alice, NewTask::new("Mine")).await.unwrap();
        let Json(found) = get_task(State(f.state.clone()), alice(), Path(own.id.0))
            .await
            .unwrap();
        assert_eq!(found.title, "Mine");
    }

    #[tokio::test]
    async fn complete_and_reopen_toggle_status() {
        let f = fixture("smtp-configured@example.com").await;
        let task = f.store.insert_task(f.alice, NewTask::new("Laundry")).await.unwrap();

        let Json(done) = complete_task(State(f.state.clone()), alice(), Path(task.id.0))
            .await
            .unwrap();
        assert_eq!(done.status, TaskStatus::Completed);

        let Json(again) = reopen_task(State(f.state.clone()), alice(), Path(task.id.0))
            .await
            .unwrap();
        assert_eq!(again.status, TaskStatus::Pending);

        let bob = f.store.insert_user("bob@example.com", "bob").await.unwrap();
        let foreign = f.store.insert_task(bob.id, NewTask::new("Bob's")).await.unwrap();
        let (status, _) = complete_task(State(f.state.clone()), alice(), Path(foreign.id.0))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn due_reminders_endpoint_selects_window() {
        let f = fixture("smtp-configured@example.com").await;
        let now = Utc::now();
        f.store
            .insert_task(f.alice, NewTask::new("Soon").due(now + Duration::minutes(90)))
            .await
            .unwrap();
        f.store
            .insert_task(f.alice, NewTask::new("Later").due(now + Duration::days(3)))
            .await
            .unwrap();

        let Json(due) = list_due_reminders(State(f.state.clone()), alice())
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].task.title, "Soon");
        assert_eq!(due[0].hours_until_due, 2);
    }

    #[tokio::test]
    async fn send_reminder_delivers_and_flags_task() {
        let f = fixture("smtp-configured@example.com").await;
        let task = f
            .store
            .insert_task(f.alice, NewTask::new("Pay rent"))
            .await
            .unwrap();

        let Json(response) = send_reminder(
            State(f.state.clone()),
            principal_headers("alice@example.com"),
            Json(rent_request(Some(task.id))),
        )
        .await;

        assert_eq!(response.status, DispatchStatus::Sent);
        assert!(response.reminder_marked);
        assert_eq!(f.transport.calls().len(), 1);
        let stored = f
            .store
            .get_for_user(task.id, f.alice)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.reminder_sent);
    }

    #[tokio::test]
    async fn skipped_reminder_still_flags_task() {
        let f = fixture(DEFAULT_PLACEHOLDER_SENDER).await;
        let task = f
            .store
            .insert_task(f.alice, NewTask::new("Pay rent"))
            .await
            .unwrap();

        let Json(response) = send_reminder(
            State(f.state.clone()),
            principal_headers("alice@example.com"),
            Json(rent_request(Some(task.id))),
        )
        .await;

        assert_eq!(response.status, DispatchStatus::Skipped);
        assert!(response.reminder_marked);
        assert!(f.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn send_reminder_without_principal_reports_failure() {
        let f = fixture("smtp-configured@example.com").await;

        let Json(response) = send_reminder(
            State(f.state.clone()),
            HeaderMap::new(),
            Json(rent_request(None)),
        )
        .await;

        assert_eq!(response.status, DispatchStatus::Failed);
        assert!(!response.reminder_marked);
        assert!(f.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn create_update_delete_round() {
        let f = fixture("smtp-configured@example.com").await;

        let (status, Json(created)) = create_task(
            State(f.state.clone()),
            alice(),
            Json(NewTask::new("Water plants").description("Balcony")),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.user_id, f.alice);
        assert_eq!(created.status, TaskStatus::Pending);

        let Json(updated) = update_task(
            State(f.state.clone()),
            alice(),
            Path(created.id.0),
            Json(TaskUpdate::new("Water all plants").status(TaskStatus::Completed)),
        )
        .await
        .unwrap();
        assert_eq!(updated.title, "Water all plants");
        assert_eq!(updated.status, TaskStatus::Completed);

        let status = delete_task(State(f.state.clone()), alice(), Path(created.id.0))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = delete_task(State(f.state.clone()), alice(), Path(created.id.0))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let f = fixture("smtp-configured@example.com").await;
        let (status, _) = create_task(State(f.state.clone()), alice(), Json(NewTask::new("  ")))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(f.store.list_for_user(f.alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn foreign_task_cannot_be_updated_or_deleted() {
        let f = fixture("smtp-configured@example.com").await;
        let bob = f.store.insert_user("bob@example.com", "bob").await.unwrap();
        let task = f.store.insert_task(bob.id, NewTask::new("Bob's")).await.unwrap();

        let (status, _) = update_task(
            State(f.state.clone()),
            alice(),
            Path(task.id.0),
            Json(TaskUpdate::new("Mine now")),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = delete_task(State(f.state.clone()), alice(), Path(task.id.0))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            f.store.get_for_user(task.id, bob.id).await.unwrap().unwrap().title,
            "Bob's"
        );
    }

    #[tokio::test]
    async fn send_due_reminders_mails_each_due_task_once() {
        let f = fixture("smtp-configured@example.com").await;
        let now = Utc::now();
        let soon = f
            .store
            .insert_task(
                f.alice,
                NewTask::new("Pay rent")
                    .description("Transfer to landlord")
                    .due(now + Duration::minutes(90)),
            )
            .await
            .unwrap();
        f.store
            .insert_task(f.alice, NewTask::new("Later").due(now + Duration::days(3)))
            .await
            .unwrap();

        let Json(results) = send_due_reminders(State(f.state.clone()), alice())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].task_id, Some(soon.id));
        assert_eq!(results[0].status, DispatchStatus::Sent);
        assert!(results[0].reminder_marked);

        let calls = f.transport.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].subject.contains("Pay rent"));
        assert!(calls[0].body.contains("Time Remaining: 2 hour(s)"));

        let Json(again) = send_due_reminders(State(f.state.clone()), alice())
            .await
            .unwrap();
        assert!(again.is_empty());
        assert_eq!(f.transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn send_reminder_for_unknown_user_marks_nothing() {
        let f = fixture("smtp-configured@example.com").await;
        let task = f
            .store
            .insert_task(f.alice, NewTask::new("Pay rent"))
            .await
            .unwrap();

        let Json(response) = send_reminder(
            State(f.state.clone()),
            principal_headers("ghost@example.com"),
            Json(rent_request(Some(task.id))),
        )
        .await;

        assert_eq!(response.status, DispatchStatus::Failed);
        assert_eq!(response.task_id, Some(task.id));
        assert!(!response.reminder_marked);
        assert!(f.transport.calls().is_empty());
        assert!(!f.store.get_for_user(task.id, f.alice).await.unwrap().unwrap().reminder_sent);
    }
}
