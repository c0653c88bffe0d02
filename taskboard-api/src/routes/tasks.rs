/// Task CRUD and assignment endpoints
///
/// # Endpoints
///
/// - `POST /tasks` - Create a task (any authenticated user)
/// - `GET /tasks` - Role-filtered list with filtering and sorting
/// - `PUT /tasks/:id` - Partial update (Admin, assignee, or creator)
/// - `DELETE /tasks/:id` - Delete (Admin or creator)
/// - `PUT /tasks/:id/assign` - Reassign (Admin or Manager)
///
/// Every mutation follows the same shape: permission checks and the store
/// write first, then the post-commit hooks (cache invalidation, broadcast,
/// notification) via `effects::after_commit`. Side effects never alter the
/// response.
///
/// A nonexistent id surfaces as 404 before any permission check: the
/// permission requires the loaded record, so existence is necessarily
/// revealed first. Denials are a generic 403.

use crate::{
    app::AppState,
    effects::{self, TaskChange},
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use taskboard_shared::auth::context::AuthContext;
use taskboard_shared::models::task::{
    CreateTask, Task, TaskFilters, TaskPriority, TaskStatus, TaskView, UpdateTask,
};
use taskboard_shared::policy::{self, Mutation};
use uuid::Uuid;
use validator::Validate;

/// Create task request
///
/// There is no status field: a task always starts `Pending`, and a status
/// smuggled into the body is ignored.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// Task title
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Optional due date (RFC 3339)
    pub due_date: Option<DateTime<Utc>>,

    /// Priority (defaults to Medium)
    pub priority: Option<TaskPriority>,

    /// User the task is assigned to; arrives as a string so a malformed
    /// value is a clean 400 rather than a generic body rejection
    pub assigned_to: String,
}

/// Partial update request; absent fields keep their stored value
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<Uuid>,
}

/// List query parameters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
    pub due_date_from: Option<DateTime<Utc>>,
    pub due_date_to: Option<DateTime<Utc>>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// Assign request body
///
/// The id arrives as a string so a malformed value can be reported as 400
/// rather than a generic body rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub user_id: String,
}

/// Create a new task
///
/// The creator is the authenticated user; status is forced to `Pending`.
///
/// # Errors
///
/// - `400 Bad Request`: missing title, malformed assignee id, or the
///   assignee does not exist
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let assigned_to = Uuid::parse_str(&req.assigned_to)
        .map_err(|_| ApiError::BadRequest("Assigned user ID must be a valid user ID".to_string()))?;

    let task = Task::create(
        &state.db,
        CreateTask {
            title: req.title,
            description: req.description,
            due_date: req.due_date,
            priority: req.priority,
            assigned_to,
            created_by: auth.user_id,
        },
    )
    .await?;

    effects::after_commit(&state, TaskChange::Created(task.clone())).await;

    Ok((StatusCode::CREATED, Json(task)))
}

/// List tasks visible to the caller
///
/// The role scope is ANDed with every caller filter; results carry both
/// user references resolved. Responses are cached for 300 seconds by the
/// cache middleware, keyed by the full path and query string.
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Vec<TaskView>>> {
    let scope = policy::task_scope(auth.user_id, auth.role);

    let filters = TaskFilters {
        status: query.status,
        priority: query.priority,
        search: query.search,
        due_date_from: query.due_date_from,
        due_date_to: query.due_date_to,
        sort_by: query.sort_by,
        sort_order: query.sort_order,
    };

    let tasks = Task::search(&state.db, &scope, &filters).await?;

    Ok(Json(tasks))
}

/// Partially update a task
///
/// Permission is evaluated against the stored record before the merge, so
/// an update that reassigns the task away from the caller still succeeds.
/// If the update changes the assignee, the notification is an assignment;
/// otherwise a status update.
///
/// # Errors
///
/// - `404 Not Found`: unknown or malformed id
/// - `403 Forbidden`: caller is not Admin, assignee, or creator
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let task_id = parse_task_id(&id)?;

    let task = Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if !policy::can_mutate(auth.role, auth.user_id, &task, Mutation::Update) {
        return Err(ApiError::Forbidden(
            "Forbidden: You do not have permission to update this task.".to_string(),
        ));
    }

    // Decided against the pre-update state, like the permission check.
    let assignment_changed = req
        .assigned_to
        .is_some_and(|assignee| assignee != task.assigned_to);

    let updated = Task::update(
        &state.db,
        task_id,
        UpdateTask {
            title: req.title,
            description: req.description,
            due_date: req.due_date,
            priority: req.priority,
            status: req.status,
            assigned_to: req.assigned_to,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    effects::after_commit(
        &state,
        TaskChange::Updated {
            task: updated.clone(),
            assignment_changed,
        },
    )
    .await;

    Ok(Json(updated))
}

/// Delete a task
///
/// # Errors
///
/// - `404 Not Found`: unknown or malformed id
/// - `403 Forbidden`: caller is not Admin or the creator
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<JsonValue>> {
    let task_id = parse_task_id(&id)?;

    let task = Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if !policy::can_mutate(auth.role, auth.user_id, &task, Mutation::Delete) {
        return Err(ApiError::Forbidden(
            "Forbidden: You do not have permission to delete this task.".to_string(),
        ));
    }

    // The record is about to disappear; keep what the notification needs.
    let assignee = task.assigned_to;

    let deleted = Task::delete(&state.db, task_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    effects::after_commit(
        &state,
        TaskChange::Deleted {
            task_id,
            assignee,
        },
    )
    .await;

    Ok(Json(json!({ "msg": "Task removed" })))
}

/// Reassign a task to a different user
///
/// # Errors
///
/// - `400 Bad Request`: malformed task or user id, or unknown target user
/// - `404 Not Found`: unknown task
/// - `403 Forbidden`: caller is neither Admin nor Manager
pub async fn assign_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<AssignRequest>,
) -> ApiResult<Json<Task>> {
    // Both ids must be well-formed before anything is looked up.
    let (Ok(task_id), Ok(assignee)) = (Uuid::parse_str(&id), Uuid::parse_str(&req.user_id))
    else {
        return Err(ApiError::BadRequest("Invalid Task ID or User ID".to_string()));
    };

    let task = Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if !policy::can_mutate(auth.role, auth.user_id, &task, Mutation::Assign) {
        return Err(ApiError::Forbidden(
            "Access denied: Insufficient privileges.".to_string(),
        ));
    }

    let updated = Task::reassign(&state.db, task_id, assignee)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    effects::after_commit(&state, TaskChange::Assigned(updated.clone())).await;

    Ok(Json(updated))
}

/// Parses a task id from the path, reporting malformed ids as 404
///
/// A malformed id can't name any task, so it gets the same answer as an
/// unknown one.
fn parse_task_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::NotFound("Task not found".to_string()))
}
