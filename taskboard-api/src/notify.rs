/// Outbound notification dispatch
///
/// Sends webhook-style notifications about task mutations to a configured
/// third-party endpoint. Dispatch is fire-and-forget: it runs on a spawned
/// task with a bounded timeout, and failures are logged and swallowed so a
/// slow or broken third party can never affect a request.
///
/// # Payload
///
/// ```json
/// {
///   "to": "<recipient user id>",
///   "type": "TASK_ASSIGNED",
///   "data": {
///     "subject": "Task update: TASK_ASSIGNED",
///     "message": "Task Ship release (…) was task_assigned",
///     "taskId": "…"
///   }
/// }
/// ```

use crate::config::NotifierConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Notification type sent to the third party
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    TaskCreated,
    TaskAssigned,
    TaskStatusUpdate,
    TaskDeleted,
}

impl NotificationType {
    /// Wire name of the notification type
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::TaskCreated => "TASK_CREATED",
            NotificationType::TaskAssigned => "TASK_ASSIGNED",
            NotificationType::TaskStatusUpdate => "TASK_STATUS_UPDATE",
            NotificationType::TaskDeleted => "TASK_DELETED",
        }
    }
}

/// Inner data block of the outbound payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationData {
    pub subject: String,
    pub message: String,
    #[serde(rename = "taskId")]
    pub task_id: String,
}

/// Outbound notification payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Recipient user id
    pub to: String,

    /// Notification type
    #[serde(rename = "type")]
    pub kind: NotificationType,

    pub data: NotificationData,
}

impl NotificationPayload {
    /// Builds the payload for a task notification
    ///
    /// `title` may be None for deletions, where the record no longer
    /// exists and only the id and prior assignee are known.
    pub fn build(
        kind: NotificationType,
        task_id: Uuid,
        title: Option<&str>,
        recipient: Uuid,
    ) -> Self {
        let subject = format!("Task update: {}", kind.as_str());
        let message = format!(
            "Task {} ({}) was {}",
            title.unwrap_or("<deleted>"),
            task_id,
            kind.as_str().to_lowercase()
        );

        Self {
            to: recipient.to_string(),
            kind,
            data: NotificationData {
                subject,
                message,
                task_id: task_id.to_string(),
            },
        }
    }
}

/// Fire-and-forget notification sender
///
/// Holds a reusable HTTP client; cloning is cheap.
#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    config: NotifierConfig,
}

impl Notifier {
    /// Creates a notifier from configuration
    ///
    /// The per-request timeout is baked into the HTTP client.
    pub fn new(config: NotifierConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self { client, config }
    }

    /// Whether a destination is configured
    pub fn is_configured(&self) -> bool {
        self.config.url.is_some() && self.config.api_key.is_some()
    }

    /// Dispatches a notification in the background
    ///
    /// Returns immediately; the send happens on a spawned task and its
    /// outcome is only ever logged.
    pub fn dispatch(
        &self,
        kind: NotificationType,
        task_id: Uuid,
        title: Option<&str>,
        recipient: Uuid,
    ) {
        if !self.is_configured() {
            tracing::warn!(
                kind = kind.as_str(),
                "Notification service is not configured, skipping notification"
            );
            return;
        }

        let payload = NotificationPayload::build(kind, task_id, title, recipient);
        let sender = self.clone();

        tokio::spawn(async move {
            sender.send(payload).await;
        });
    }

    /// Sends one notification, logging the outcome
    async fn send(&self, payload: NotificationPayload) {
        // is_configured was checked by dispatch
        let (Some(url), Some(api_key)) = (&self.config.url, &self.config.api_key) else {
            return;
        };

        tracing::debug!(
            kind = payload.kind.as_str(),
            to = %payload.to,
            "Sending notification"
        );

        let result = self
            .client
            .post(url)
            .header("X-API-Key", api_key)
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(task_id = %payload.data.task_id, "Notification sent successfully");
            }
            Ok(response) => {
                tracing::error!(
                    task_id = %payload.data.task_id,
                    status = %response.status(),
                    "Notification service returned an error"
                );
            }
            Err(e) => {
                tracing::error!(
                    task_id = %payload.data.task_id,
                    error = %e,
                    "Failed to send notification"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_wire_names() {
        assert_eq!(NotificationType::TaskCreated.as_str(), "TASK_CREATED");
        assert_eq!(NotificationType::TaskAssigned.as_str(), "TASK_ASSIGNED");
        assert_eq!(
            NotificationType::TaskStatusUpdate.as_str(),
            "TASK_STATUS_UPDATE"
        );
        assert_eq!(NotificationType::TaskDeleted.as_str(), "TASK_DELETED");

        // serde names match the manual wire names
        let json = serde_json::to_string(&NotificationType::TaskStatusUpdate).unwrap();
        assert_eq!(json, "\"TASK_STATUS_UPDATE\"");
    }

    #[test]
    fn test_payload_shape() {
        let task_id = Uuid::new_v4();
        let recipient = Uuid::new_v4();

        let payload = NotificationPayload::build(
            NotificationType::TaskAssigned,
            task_id,
            Some("Ship release"),
            recipient,
        );

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["to"], recipient.to_string());
        assert_eq!(json["type"], "TASK_ASSIGNED");
        assert_eq!(json["data"]["taskId"], task_id.to_string());
        assert_eq!(json["data"]["subject"], "Task update: TASK_ASSIGNED");
        assert!(json["data"]["message"]
            .as_str()
            .unwrap()
            .contains("Ship release"));
    }

    #[test]
    fn test_deleted_payload_without_title() {
        let payload = NotificationPayload::build(
            NotificationType::TaskDeleted,
            Uuid::new_v4(),
            None,
            Uuid::new_v4(),
        );
        assert!(payload.data.message.contains("<deleted>"));
    }

    #[test]
    fn test_unconfigured_notifier_skips() {
        let notifier = Notifier::new(crate::config::NotifierConfig {
            url: None,
            api_key: None,
            timeout_secs: 5,
        });
        assert!(!notifier.is_configured());

        // dispatch with no destination must be a quiet no-op
        notifier.dispatch(
            NotificationType::TaskCreated,
            Uuid::new_v4(),
            Some("t"),
            Uuid::new_v4(),
        );
    }
}
