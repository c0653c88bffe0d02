/// Application state and router builder
///
/// This module defines the shared application state and provides a
/// function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use taskboard_api::{app::{AppState, build_router}, config::Config};
/// use taskboard_api::broadcast::Broadcaster;
/// use taskboard_shared::redis::{RedisClient, RedisConfig};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let db = PgPool::connect(&std::env::var("DATABASE_URL")?).await?;
/// let cache = RedisClient::new(RedisConfig::from_env()?).await?;
/// let state = AppState::new(db, cache, Broadcaster::new(), config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::broadcast::Broadcaster;
use crate::config::Config;
use crate::error::ApiError;
use crate::middleware as mw;
use crate::notify::Notifier;
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskboard_shared::auth::{context::AuthContext, jwt};
use taskboard_shared::redis::RedisClient;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor. Every
/// field is internally reference-counted, so cloning is cheap. All
/// collaborators are constructed up front and passed in; nothing here is
/// a lazily initialized global.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Redis client backing the response cache and rate limiting
    pub cache: RedisClient,

    /// Live event fan-out handle
    pub broadcaster: Broadcaster,

    /// Outbound notification sender
    pub notifier: Notifier,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    ///
    /// The notifier is built from the configuration's notifier section.
    pub fn new(db: PgPool, cache: RedisClient, broadcaster: Broadcaster, config: Config) -> Self {
        let notifier = Notifier::new(config.notifier.clone());
        Self {
            db,
            cache,
            broadcaster,
            notifier,
            config: Arc::new(config),
        }
    }

    /// Gets the secret used for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                      # Health check (public)
/// ├── /auth/
/// │   ├── POST /register           # Public
/// │   ├── POST /login              # Public, login rate limit
/// │   ├── GET  /profile            # Authenticated
/// │   └── POST /logout             # Authenticated
/// ├── /tasks                       # Authenticated, rate limited
/// │   ├── GET  /                   # Role-filtered list (cached, 300s)
/// │   ├── POST /                   # Create
/// │   ├── PUT    /:id              # Partial update
/// │   ├── DELETE /:id              # Delete
/// │   └── PUT  /:id/assign         # Reassign (Admin/Manager)
/// ├── /analytics/tasks             # Authenticated, rate limited
/// ├── /events                      # Authenticated, SSE live feed
/// └── /admin/users/:id/role        # Admin only
/// ```
///
/// # Middleware Stack
///
/// Per route group (inner to outer): response cache → rate limiting →
/// authentication. Globally: trace logging, CORS, security headers.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Public auth endpoints; login carries the brute-force limiter
    let register_routes = Router::new().route("/auth/register", post(routes::auth::register));

    let login_routes = Router::new()
        .route("/auth/login", post(routes::auth::login))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            mw::rate_limit::login_rate_limit,
        ));

    // Authenticated session endpoints
    let session_routes = Router::new()
        .route("/auth/profile", get(routes::auth::profile))
        .route("/auth/logout", post(routes::auth::logout))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Task CRUD + assign; reads cached, every route rate limited
    let task_routes = Router::new()
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            put(routes::tasks::update_task).delete(routes::tasks::delete_task),
        )
        .route("/tasks/:id/assign", put(routes::tasks::assign_task))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            mw::cache::list_cache,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            mw::rate_limit::task_rate_limit,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let analytics_routes = Router::new()
        .route("/analytics/tasks", get(routes::analytics::task_analytics))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            mw::rate_limit::role_rate_limit,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Live event feed over SSE
    let event_routes = Router::new()
        .route("/events", get(routes::events::stream_events))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Admin endpoints (role checked in the handler)
    let admin_routes = Router::new()
        .route("/admin/users/:id/role", put(routes::admin::update_role))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .merge(register_routes)
        .merge(login_routes)
        .merge(session_routes)
        .merge(task_routes)
        .merge(analytics_routes)
        .merge(event_routes)
        .merge(admin_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(axum::middleware::from_fn(mw::security::security_headers))
        .with_state(state)
}

/// Token authentication middleware layer
///
/// Extracts and validates the Bearer token from the Authorization header,
/// then injects an [`AuthContext`] into the request extensions.
pub async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("No token, authorization denied".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::BadRequest("Expected Bearer token".to_string()))?;

    let claims = jwt::validate_token(token, state.jwt_secret())?;

    req.extensions_mut().insert(AuthContext::from_claims(&claims));

    Ok(next.run(req).await)
}
