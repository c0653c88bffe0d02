/// Task analytics endpoint
///
/// # Endpoint
///
/// ```text
/// GET /analytics/tasks
/// ```
///
/// Aggregates the caller's visible task set (same role scope as the list
/// endpoint) into totals, status and priority breakdowns, overdue and
/// due-soon counts, and, for Admin and Manager, a per-username
/// leaderboard. The leaderboard field is omitted entirely for plain users,
/// not returned empty.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use chrono::Utc;
use taskboard_shared::analytics::{self, TaskAnalytics};
use taskboard_shared::auth::context::AuthContext;
use taskboard_shared::models::user::Role;
use taskboard_shared::policy;

/// Task analytics handler
pub async fn task_analytics(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<TaskAnalytics>> {
    let scope = policy::task_scope(auth.user_id, auth.role);

    let rows = analytics::load_rows(&state.db, &scope).await?;

    let include_leaderboard = matches!(auth.role, Role::Admin | Role::Manager);
    let stats = analytics::aggregate(&rows, Utc::now(), include_leaderboard);

    Ok(Json(stats))
}
