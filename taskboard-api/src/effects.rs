/// Post-commit side effects of task mutations
///
/// Every successful task write is followed by three independent,
/// best-effort side effects, always in the same order:
///
/// 1. cache invalidation of the task list key space
/// 2. broadcast emit of a typed `task:*` event
/// 3. notification dispatch to the affected assignee
///
/// Each effect has its own error boundary: a failure is logged and
/// swallowed, and can never roll back or fail the committed write.
/// Invalidation completes before the HTTP response is sent; broadcast is
/// local and non-blocking; notification dispatch runs on a spawned task
/// with its own timeout.

use crate::app::AppState;
use crate::broadcast::{TaskEvent, TaskEventKind};
use crate::middleware::cache::TASK_LIST_CACHE_PREFIX;
use crate::notify::NotificationType;
use serde_json::json;
use taskboard_shared::models::task::Task;
use uuid::Uuid;

/// A committed task mutation
#[derive(Debug, Clone)]
pub enum TaskChange {
    /// A new task was persisted
    Created(Task),

    /// An existing task was partially updated
    Updated {
        task: Task,
        /// Whether the update moved the task to a different assignee
        assignment_changed: bool,
    },

    /// A task was reassigned via the dedicated assign operation
    Assigned(Task),

    /// A task was removed; only the id and prior assignee survive
    Deleted { task_id: Uuid, assignee: Uuid },
}

impl TaskChange {
    /// The broadcast event announcing this change
    pub fn event(&self) -> TaskEvent {
        match self {
            TaskChange::Created(task) => {
                TaskEvent::new(TaskEventKind::Created, json!({ "task": task }))
            }
            TaskChange::Updated { task, .. } => {
                TaskEvent::new(TaskEventKind::Updated, json!({ "task": task }))
            }
            TaskChange::Assigned(task) => {
                TaskEvent::new(TaskEventKind::Assigned, json!({ "task": task }))
            }
            TaskChange::Deleted { task_id, .. } => {
                TaskEvent::new(TaskEventKind::Deleted, json!({ "taskId": task_id }))
            }
        }
    }

    /// The notification this change owes the affected assignee
    ///
    /// Returns (type, task id, title if still known, recipient). An update
    /// that moved the assignment notifies the new assignee as an
    /// assignment; any other update is a status notification.
    pub fn notification(&self) -> (NotificationType, Uuid, Option<&str>, Uuid) {
        match self {
            TaskChange::Created(task) => (
                NotificationType::TaskCreated,
                task.id,
                Some(task.title.as_str()),
                task.assigned_to,
            ),
            TaskChange::Updated {
                task,
                assignment_changed,
            } => {
                let kind = if *assignment_changed {
                    NotificationType::TaskAssigned
                } else {
                    NotificationType::TaskStatusUpdate
                };
                (kind, task.id, Some(task.title.as_str()), task.assigned_to)
            }
            TaskChange::Assigned(task) => (
                NotificationType::TaskAssigned,
                task.id,
                Some(task.title.as_str()),
                task.assigned_to,
            ),
            TaskChange::Deleted { task_id, assignee } => {
                (NotificationType::TaskDeleted, *task_id, None, *assignee)
            }
        }
    }
}

/// Runs the post-commit hooks for a committed task mutation
///
/// Called by every mutating handler after its store write succeeds and
/// before the response is returned. Never fails.
pub async fn after_commit(state: &AppState, change: TaskChange) {
    // 1. Coarse invalidation: every cached list under the /tasks prefix.
    if let Err(e) = state.cache.delete_by_prefix(TASK_LIST_CACHE_PREFIX).await {
        tracing::warn!(error = %e, "Task cache invalidation failed");
    }

    // 2. Announce to live subscribers.
    state.broadcaster.emit(change.event());

    // 3. Notify the affected assignee in the background.
    let (kind, task_id, title, recipient) = change.notification();
    state.notifier.dispatch(kind, task_id, title, recipient);
}
