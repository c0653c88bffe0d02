/// Live task-event feed (SSE)
///
/// Streams every task mutation to connected clients as Server-Sent
/// Events. Each mutation arrives as one event named after the mutation
/// kind, with the broadcast payload as its data:
///
/// ```text
/// event: task:updated
/// data: {"task":{"id":"…","title":"…",…}}
/// ```
///
/// # Endpoint
///
/// `GET /events` (authenticated)
///
/// # Headers
///
/// - `Content-Type: text/event-stream`
///
/// A slow client that falls behind the broadcast backlog silently skips
/// the missed events and resumes with the live stream; the feed carries
/// no history.
///
/// # Example
///
/// ```bash
/// curl -N -H "Authorization: Bearer <token>" http://localhost:8080/events
/// ```

use crate::app::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Extension,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use taskboard_shared::auth::context::AuthContext;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

/// Live event stream handler
pub async fn stream_events(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!(user_id = %auth.user_id, "Client subscribed to live events");

    let rx = state.broadcaster.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|message| match message {
        Ok(event) => Some(Ok(Event::default()
            .event(event.kind.as_str())
            .data(event.payload.to_string()))),
        Err(BroadcastStreamRecvError::Lagged(missed)) => {
            tracing::warn!(missed, "SSE client lagged, skipping missed events");
            None
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(25))
            .text("keep-alive"),
    )
}
