/// Rate limiting middleware
///
/// Token bucket rate limiting with Redis-backed state, applied at three
/// tiers:
///
/// - **Role-based** (task and analytics reads): Admin 500, Manager 250,
///   User 100 requests per 15 minutes, keyed per user.
/// - **Sensitive** (task mutations): 50 requests per 15 minutes per user.
/// - **Login**: 5 attempts per 5 minutes per client address, enforced
///   before the credential check so a brute-force run is cut off at the
///   6th attempt.
///
/// # Algorithm
///
/// Token bucket evaluated atomically in a Redis Lua script: tokens refill
/// at `limit / window` per second, each request consumes one, and an empty
/// bucket rejects with the seconds until a token is available.
///
/// # Failure mode
///
/// Rate limiting fails open: if Redis is unreachable the request proceeds
/// and the failure is logged. Availability of the API is never coupled to
/// the limiter's backing store.
///
/// # Headers
///
/// Successful responses carry `X-RateLimit-Limit` and
/// `X-RateLimit-Remaining`; 429 responses carry `Retry-After`.

use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
    Extension,
};
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};
use taskboard_shared::auth::context::AuthContext;
use taskboard_shared::models::user::Role;
use taskboard_shared::redis::{RedisClient, RedisClientError};

/// Rate limit configuration for one tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Maximum requests per window (also the burst capacity)
    pub requests: u32,

    /// Window length in seconds
    pub window_secs: u32,
}

impl RateLimit {
    /// Gets the limit for a role (reads of tasks and analytics)
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => RateLimit {
                requests: 500,
                window_secs: 900,
            },
            Role::Manager => RateLimit {
                requests: 250,
                window_secs: 900,
            },
            Role::User => RateLimit {
                requests: 100,
                window_secs: 900,
            },
        }
    }

    /// Limit for mutating task endpoints
    pub const SENSITIVE: RateLimit = RateLimit {
        requests: 50,
        window_secs: 900,
    };

    /// Limit for login attempts, per client address
    pub const LOGIN: RateLimit = RateLimit {
        requests: 5,
        window_secs: 300,
    };

    /// Token refill rate in tokens per second
    pub fn refill_rate(&self) -> f64 {
        f64::from(self.requests) / f64::from(self.window_secs)
    }
}

/// Result of a rate limit check
#[derive(Debug)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub ok: bool,

    /// Tokens remaining
    pub remaining: u32,

    /// Seconds until a token is available (when blocked)
    pub reset_after: u64,
}

/// Checks a token bucket in Redis atomically
///
/// # Errors
///
/// Returns an error if Redis is unreachable; callers fail open.
pub async fn check_rate_limit(
    redis: &RedisClient,
    key: &str,
    limit: RateLimit,
) -> Result<RateLimitResult, RedisClientError> {
    let mut conn = redis.get_connection();
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let script = redis::Script::new(
        r#"
        local key = KEYS[1]
        local capacity = tonumber(ARGV[1])
        local refill_rate = tonumber(ARGV[2])
        local now = tonumber(ARGV[3])
        local ttl = tonumber(ARGV[4])

        local bucket = redis.call('HMGET', key, 'tokens', 'last_refill')
        local tokens = tonumber(bucket[1])
        local last_refill = tonumber(bucket[2])

        if not tokens then
            tokens = capacity
            last_refill = now
        end

        local elapsed = now - last_refill
        tokens = math.min(capacity, tokens + (elapsed * refill_rate))

        if tokens >= 1 then
            tokens = tokens - 1
            redis.call('HMSET', key, 'tokens', tokens, 'last_refill', now)
            redis.call('EXPIRE', key, ttl)
            return {1, math.floor(tokens), 0}
        else
            return {0, 0, math.ceil((1 - tokens) / refill_rate)}
        end
        "#,
    );

    // Keys expire a full window after last use.
    let result: Vec<i64> = script
        .key(key)
        .arg(limit.requests)
        .arg(limit.refill_rate())
        .arg(now)
        .arg(limit.window_secs * 2)
        .invoke_async(&mut conn)
        .await
        .map_err(RedisClientError::from)?;

    Ok(RateLimitResult {
        ok: result.first().copied().unwrap_or(1) == 1,
        remaining: result.get(1).copied().unwrap_or(0) as u32,
        reset_after: result.get(2).copied().unwrap_or(0) as u64,
    })
}

/// Applies a limit for one request, failing open on Redis errors
async fn enforce(
    state: &AppState,
    key: &str,
    limit: RateLimit,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let outcome = match check_rate_limit(&state.cache, key, limit).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Rate limit check failed, allowing request");
            return Ok(next.run(req).await);
        }
    };

    if !outcome.ok {
        return Err(ApiError::RateLimitExceeded {
            retry_after: outcome.reset_after,
            message: format!(
                "Too many requests, please try again in {} seconds",
                outcome.reset_after
            ),
        });
    }

    let mut response = next.run(req).await;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&limit.requests.to_string()) {
        headers.insert("X-RateLimit-Limit", value);
    }
    if let Ok(value) = HeaderValue::from_str(&outcome.remaining.to_string()) {
        headers.insert("X-RateLimit-Remaining", value);
    }

    Ok(response)
}

/// Role-based limiter for authenticated read endpoints
pub async fn role_rate_limit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let limit = RateLimit::for_role(auth.role);
    let key = format!("ratelimit:role:{}", auth.user_id);
    enforce(&state, &key, limit, req, next).await
}

/// Stricter limiter for mutating task endpoints
pub async fn sensitive_rate_limit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = format!("ratelimit:sensitive:{}", auth.user_id);
    enforce(&state, &key, RateLimit::SENSITIVE, req, next).await
}

/// Limiter for the task routes: reads go through the role tier, mutations
/// through the stricter sensitive tier
pub async fn task_rate_limit(
    state: State<AppState>,
    auth: Extension<AuthContext>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if req.method() == axum::http::Method::GET {
        role_rate_limit(state, auth, req, next).await
    } else {
        sensitive_rate_limit(state, auth, req, next).await
    }
}

/// Brute-force limiter for the login endpoint, keyed by client address
///
/// Runs before the credential check. The client address comes from
/// X-Forwarded-For when present (deployment behind a proxy), falling back
/// to the peer address.
pub async fn login_rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_address(&req);
    let key = format!("ratelimit:login:{}", client);
    enforce(&state, &key, RateLimit::LOGIN, req, next).await
}

/// Best-effort client address extraction
fn client_address(req: &Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_per_role() {
        assert_eq!(
            RateLimit::for_role(Role::Admin),
            RateLimit {
                requests: 500,
                window_secs: 900
            }
        );
        assert_eq!(RateLimit::for_role(Role::Manager).requests, 250);
        assert_eq!(RateLimit::for_role(Role::User).requests, 100);
    }

    #[test]
    fn test_login_limit_is_five_per_five_minutes() {
        assert_eq!(RateLimit::LOGIN.requests, 5);
        assert_eq!(RateLimit::LOGIN.window_secs, 300);
    }

    #[test]
    fn test_refill_rates() {
        let user = RateLimit::for_role(Role::User);
        assert!((user.refill_rate() - 100.0 / 900.0).abs() < 1e-9);

        let login = RateLimit::LOGIN;
        assert!((login.refill_rate() - 1.0 / 60.0).abs() < 1e-9);
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_bucket_blocks_after_capacity() {
        use taskboard_shared::redis::{RedisClient, RedisConfig};

        let client = RedisClient::new(RedisConfig {
            url: "redis://localhost:6379".to_string(),
            command_timeout_secs: 10,
        })
        .await
        .unwrap();
        let key = format!("ratelimit:test:{}", uuid::Uuid::new_v4());

        for _ in 0..RateLimit::LOGIN.requests {
            let outcome = check_rate_limit(&client, &key, RateLimit::LOGIN)
                .await
                .unwrap();
            assert!(outcome.ok);
        }

        // The bucket is dry: the next attempt is rejected.
        let outcome = check_rate_limit(&client, &key, RateLimit::LOGIN)
            .await
            .unwrap();
        assert!(!outcome.ok);
        assert!(outcome.reset_after > 0);
    }
}
