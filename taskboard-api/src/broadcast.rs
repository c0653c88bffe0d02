/// Live task-event fan-out
///
/// A single broadcast channel carries every task mutation to all connected
/// live clients (served over SSE by `routes::events`). The handle is
/// constructed once at startup and held in `AppState`, so emitting can
/// never race initialization.
///
/// Emitting is local and non-blocking: with no subscribers the event is
/// simply dropped, and a slow subscriber only ever loses its own backlog
/// (the channel is lossy per-receiver, never a backpressure source).
///
/// # Example
///
/// ```
/// use taskboard_api::broadcast::{Broadcaster, TaskEvent, TaskEventKind};
/// use serde_json::json;
///
/// let broadcaster = Broadcaster::new();
/// let mut rx = broadcaster.subscribe();
///
/// broadcaster.emit(TaskEvent::new(TaskEventKind::Created, json!({"id": "..."})));
/// ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;

/// Capacity of the per-receiver event backlog
const CHANNEL_CAPACITY: usize = 256;

/// The kind of task mutation being announced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskEventKind {
    Created,
    Updated,
    Deleted,
    Assigned,
}

impl TaskEventKind {
    /// Wire name of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskEventKind::Created => "task:created",
            TaskEventKind::Updated => "task:updated",
            TaskEventKind::Deleted => "task:deleted",
            TaskEventKind::Assigned => "task:assigned",
        }
    }
}

/// A typed event carrying the mutated task (or, for deletes, its id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEvent {
    /// Event kind
    pub kind: TaskEventKind,

    /// Event payload, e.g. `{"task": {...}}` or `{"taskId": "..."}`
    pub payload: JsonValue,
}

impl TaskEvent {
    pub fn new(kind: TaskEventKind, payload: JsonValue) -> Self {
        Self { kind, payload }
    }
}

/// Fan-out handle held by the application state
///
/// Cloning shares the same underlying channel.
#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<TaskEvent>,
}

impl Broadcaster {
    /// Creates a broadcaster with the default backlog capacity
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Emits an event to every current subscriber
    ///
    /// Never blocks and never fails: an empty subscriber set is normal.
    pub fn emit(&self, event: TaskEvent) {
        let kind = event.kind;
        match self.tx.send(event) {
            Ok(receivers) => {
                tracing::debug!(event = kind.as_str(), receivers, "Broadcast task event");
            }
            Err(_) => {
                // No subscribers connected; nothing to deliver.
                tracing::trace!(event = kind.as_str(), "Broadcast with no subscribers");
            }
        }
    }

    /// Subscribes to the live event feed
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.tx.subscribe()
    }

    /// Number of currently connected subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_names() {
        assert_eq!(TaskEventKind::Created.as_str(), "task:created");
        assert_eq!(TaskEventKind::Updated.as_str(), "task:updated");
        assert_eq!(TaskEventKind::Deleted.as_str(), "task:deleted");
        assert_eq!(TaskEventKind::Assigned.as_str(), "task:assigned");
    }

    #[tokio::test]
    async fn test_emit_reaches_all_subscribers() {
        let broadcaster = Broadcaster::new();
        let mut rx1 = broadcaster.subscribe();
        let mut rx2 = broadcaster.subscribe();

        broadcaster.emit(TaskEvent::new(
            TaskEventKind::Created,
            json!({"task": {"id": "t1"}}),
        ));

        let e1 = rx1.recv().await.unwrap();
        let e2 = rx2.recv().await.unwrap();
        assert_eq!(e1.kind, TaskEventKind::Created);
        assert_eq!(e2.payload["task"]["id"], "t1");
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_is_a_noop() {
        let broadcaster = Broadcaster::new();
        // Must not panic or block.
        broadcaster.emit(TaskEvent::new(TaskEventKind::Deleted, json!({"taskId": "x"})));
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let broadcaster = Broadcaster::new();
        broadcaster.emit(TaskEvent::new(TaskEventKind::Updated, json!({})));

        let mut rx = broadcaster.subscribe();
        broadcaster.emit(TaskEvent::new(TaskEventKind::Assigned, json!({})));

        let e = rx.recv().await.unwrap();
        assert_eq!(e.kind, TaskEventKind::Assigned);
    }
}
