/// Response cache for the task list endpoint
///
/// Only GET responses are cached, keyed by the exact request path and query
/// string (so every distinct filter/sort combination caches separately),
/// with a 300-second TTL. Only 200 responses are stored. A cache hit
/// replays the stored body byte-for-byte; a repeat of the same GET inside
/// the TTL window therefore returns an identical response.
///
/// Any task mutation deletes every key under [`TASK_LIST_CACHE_PREFIX`]
/// (see `effects::after_commit`): invalidation is coarse on purpose,
/// trading precision for correctness, since tracking which cached filters
/// could match a mutated record would require indexing the filter space.
///
/// Cache failures in either direction are logged and swallowed; the
/// request proceeds against the store as if the cache were empty.

use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    body::Body,
    extract::{OriginalUri, Request, State},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Every task list cache key starts with this prefix
pub const TASK_LIST_CACHE_PREFIX: &str = "/tasks";

/// How long a cached list response lives
pub const CACHE_TTL_SECONDS: u64 = 300;

/// Caches GET responses keyed by request path+query
///
/// Layered on the task list route. Non-GET requests pass straight through.
pub async fn list_cache(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if req.method() != Method::GET {
        return Ok(next.run(req).await);
    }

    let key = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    match state.cache.get(&key).await {
        Ok(Some(body)) => {
            tracing::debug!(key = %key, "Cache hit");
            return Ok((
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                body,
            )
                .into_response());
        }
        Ok(None) => {
            tracing::debug!(key = %key, "Cache miss");
        }
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Cache read failed");
        }
    }

    let response = next.run(req).await;

    if response.status() != StatusCode::OK {
        return Ok(response);
    }

    // Buffer the response body so it can be both stored and returned.
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|e| ApiError::InternalError(format!("Failed to buffer response: {}", e)))?;

    if let Ok(text) = std::str::from_utf8(&bytes) {
        if let Err(e) = state.cache.set_ex(&key, text, CACHE_TTL_SECONDS).await {
            tracing::warn!(key = %key, error = %e, "Cache write failed");
        }
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}
