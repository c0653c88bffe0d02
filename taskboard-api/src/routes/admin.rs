/// User role administration
///
/// # Endpoint
///
/// ```text
/// PUT /admin/users/:id/role
/// Content-Type: application/json
///
/// { "role": "Manager" }
/// ```
///
/// Admin only. Changing a role does not invalidate outstanding tokens;
/// the new role takes effect when the user next obtains one.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use taskboard_shared::auth::context::AuthContext;
use taskboard_shared::models::user::{Role, User};
use uuid::Uuid;

/// Role update request
///
/// The role arrives as a string so an unknown value maps to a clean 400.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

/// Update a user's role (Admin only)
///
/// # Errors
///
/// - `400 Bad Request`: malformed user id or unknown role
/// - `403 Forbidden`: caller is not an Admin
/// - `404 Not Found`: unknown user
pub async fn update_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<UpdateRoleRequest>,
) -> ApiResult<Json<JsonValue>> {
    if !auth.is_admin() {
        return Err(ApiError::Forbidden(
            "Access denied: Insufficient privileges.".to_string(),
        ));
    }

    let user_id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::BadRequest("Invalid user ID".to_string()))?;

    let role = Role::from_str(&req.role)
        .ok_or_else(|| ApiError::BadRequest("Invalid role provided".to_string()))?;

    let user = User::update_role(&state.db, user_id, role)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(
        admin = %auth.user_id,
        user = %user.id,
        role = role.as_str(),
        "User role updated"
    );

    Ok(Json(json!({
        "msg": format!("Role for user {} updated to {}", user.username, role.as_str()),
        "user": user,
    })))
}
