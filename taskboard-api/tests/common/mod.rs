/// Common test utilities for integration tests
///
/// Provides shared infrastructure for tests that exercise the full router
/// against live PostgreSQL and Redis:
/// - Test context with database, cache, and app
/// - User creation with a chosen role and a matching token
/// - A request helper that returns (status, parsed JSON body)
/// - Cleanup of everything a test created

use axum::body::Body;
use axum::http::{Request, StatusCode};
use taskboard_api::app::{build_router, AppState};
use taskboard_api::broadcast::Broadcaster;
use taskboard_api::config::Config;
use taskboard_shared::auth::jwt::{create_token, Claims};
use taskboard_shared::db::{migrations, pool};
use taskboard_shared::models::user::{CreateUser, Role, User};
use taskboard_shared::redis::{RedisClient, RedisConfig};
use tower::ServiceExt as _;
use uuid::Uuid;

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: sqlx::PgPool,
    pub cache: RedisClient,
    pub app: axum::Router,
    pub config: Config,
    created_users: Vec<Uuid>,
}

impl TestContext {
    /// Creates a new test context against the configured services
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_env()?;

        let db = pool::create_pool(pool::DatabaseConfig::from_env()?).await?;
        migrations::run_migrations(&db).await?;

        let cache = RedisClient::new(RedisConfig::from_env()?).await?;

        let state = AppState::new(db.clone(), cache.clone(), Broadcaster::new(), config.clone());
        let app = build_router(state);

        Ok(TestContext {
            db,
            cache,
            app,
            config,
            created_users: Vec::new(),
        })
    }

    /// Creates a user with the given role and returns it with a token
    pub async fn create_user(&mut self, role: Role) -> anyhow::Result<(User, String)> {
        let unique = Uuid::new_v4();
        let user = User::create(
            &self.db,
            CreateUser {
                username: format!("user-{}", unique),
                email: format!("test-{}@example.com", unique),
                // These users never log in with a password; tests that
                // exercise login go through /auth/register instead.
                password_hash: "unused".to_string(),
            },
        )
        .await?;

        let user = match role {
            Role::User => user,
            _ => User::update_role(&self.db, user.id, role)
                .await?
                .expect("user just created"),
        };

        let claims = Claims::new(user.id, role);
        let token = create_token(&claims, &self.config.jwt.secret)?;

        self.created_users.push(user.id);
        Ok((user, token))
    }

    /// Sends one request through the router and parses the JSON body
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };

        (status, json)
    }

    /// Removes every task and user this context created
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        if self.created_users.is_empty() {
            return Ok(());
        }

        sqlx::query("DELETE FROM tasks WHERE created_by = ANY($1) OR assigned_to = ANY($1)")
            .bind(&self.created_users)
            .execute(&self.db)
            .await?;

        sqlx::query("DELETE FROM users WHERE id = ANY($1)")
            .bind(&self.created_users)
            .execute(&self.db)
            .await?;

        // Drop any cached lists the tests populated.
        let _ = self.cache.delete_by_prefix("/tasks").await;

        Ok(())
    }
}
