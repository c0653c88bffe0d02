/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /auth/register` - Register and receive a token
/// - `POST /auth/login` - Authenticate and receive a token
/// - `GET /auth/profile` - Fetch the authenticated user's profile
/// - `POST /auth/logout` - Acknowledge logout (tokens are stateless)
///
/// Registration and login return the same shape: `{"token": "..."}`.
/// Invalid credentials are always reported with the same message and
/// status, regardless of whether the email or the password was wrong.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use taskboard_shared::auth::context::AuthContext;
use taskboard_shared::auth::{jwt, password};
use taskboard_shared::models::user::{CreateUser, Role, User};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display/login name
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    /// Email address
    #[validate(email(message = "Please include a valid email"))]
    pub email: String,

    /// Password (length enforced, hashed before storage)
    #[validate(length(min = 6, message = "Please enter a password with 6 or more characters"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Please include a valid email"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Token response for register and login
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Signed identity token, valid for 24 hours
    pub token: String,
}

/// Register a new user
///
/// Creates the account with the default `User` role and returns a token,
/// so registration doubles as the first login.
///
/// # Errors
///
/// - `400 Bad Request`: validation failed, or the email is already taken
///   (`{"msg": "User already exists"}`)
/// - `500 Internal Server Error`: store failure
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    req.validate()?;

    // Pre-check for a friendly duplicate message; the unique constraint
    // still backstops the race with a concurrent registration.
    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            email: req.email,
            password_hash,
        },
    )
    .await?;

    let role = user.get_role().unwrap_or(Role::User);
    let claims = jwt::Claims::new(user.id, role);
    let token = jwt::create_token(&claims, state.jwt_secret())?;

    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

/// Authenticate a user
///
/// # Errors
///
/// - `400 Bad Request`: validation failed, or `{"msg": "Invalid
///   Credentials"}` for an unknown email or wrong password
/// - `429 Too Many Requests`: more than 5 attempts in 5 minutes from the
///   same client (enforced by middleware before this handler runs)
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid Credentials".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::BadRequest("Invalid Credentials".to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    let role = user.get_role().unwrap_or(Role::User);
    let claims = jwt::Claims::new(user.id, role);
    let token = jwt::create_token(&claims, state.jwt_secret())?;

    Ok(Json(TokenResponse { token }))
}

/// Fetch the authenticated user's profile
///
/// The password hash is never serialized.
pub async fn profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<User>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Acknowledge logout
///
/// Tokens are stateless with a fixed 24-hour window and there is no
/// revocation list, so logout is an acknowledgement only; the client
/// discards its token.
pub async fn logout(Extension(auth): Extension<AuthContext>) -> Json<JsonValue> {
    tracing::debug!(user_id = %auth.user_id, "User logged out");
    Json(json!({ "msg": "Logged out successfully" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_validation() {
        let ok = RegisterRequest {
            username: "jdoe".to_string(),
            email: "jdoe@example.com".to_string(),
            password: "secret1".to_string(),
        };
        assert!(ok.validate().is_ok());

        let no_username = RegisterRequest {
            username: "".to_string(),
            email: "jdoe@example.com".to_string(),
            password: "secret1".to_string(),
        };
        assert!(no_username.validate().is_err());

        let bad_email = RegisterRequest {
            username: "jdoe".to_string(),
            email: "not-an-email".to_string(),
            password: "secret1".to_string(),
        };
        assert!(bad_email.validate().is_err());

        let short_password = RegisterRequest {
            username: "jdoe".to_string(),
            email: "jdoe@example.com".to_string(),
            password: "12345".to_string(),
        };
        assert!(short_password.validate().is_err());
    }

    #[test]
    fn test_login_validation() {
        let ok = LoginRequest {
            email: "jdoe@example.com".to_string(),
            password: "whatever".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = LoginRequest {
            email: "nope".to_string(),
            password: "whatever".to_string(),
        };
        assert!(bad.validate().is_err());
    }
}
