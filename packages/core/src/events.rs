//! Event types for real-time updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{JobSummary, NotificationSummary, QueueName};

/// Payload of a queue mutation event: the whole queue after the mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueUpdate {
    pub queue: QueueName,
    pub jobs: Vec<JobSummary>,
}

/// Payload of a notification event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationUpdate {
    pub target_user: String,
    pub notification: NotificationSummary,
}

/// Events emitted by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A queue was pushed to, popped from, or had a job removed.
    QueueUpdated(QueueUpdate),
    /// A notification was pushed for one user.
    NotificationPushed(NotificationUpdate),
    /// Periodic wall-clock tick.
    TimeUpdate { timestamp: DateTime<Utc> },
}

impl PipelineEvent {
    pub fn queue_updated(queue: QueueName, jobs: Vec<JobSummary>) -> Self {
        PipelineEvent::QueueUpdated(QueueUpdate { queue, jobs })
    }

    /// Event name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEvent::QueueUpdated(update) => update.queue.event_name(),
            PipelineEvent::NotificationPushed(_) => "notification_update",
            PipelineEvent::TimeUpdate { .. } => "time_update",
        }
    }

    /// JSON payload on the wire.
    pub fn payload(&self) -> serde_json::Value {
        let payload = match self {
            PipelineEvent::QueueUpdated(update) => serde_json::to_value(update),
            PipelineEvent::NotificationPushed(update) => serde_json::to_value(update),
            PipelineEvent::TimeUpdate { timestamp } => Ok(serde_json::json!({
                "date": timestamp.format("%Y-%m-%d @ %H:%M").to_string(),
            })),
        };
        payload.unwrap_or(serde_json::Value::Null)
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            PipelineEvent::QueueUpdated(update) => {
                format!("Queue {} now holds {} jobs", update.queue, update.jobs.len())
            }
            PipelineEvent::NotificationPushed(update) => format!(
                "Notification {} for {}",
                update.notification.id, update.target_user
            ),
            PipelineEvent::TimeUpdate { timestamp } => format!("Clock tick {}", timestamp),
        }
    }
}

/// A named event with its JSON payload, as handed to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub event: String,
    pub payload: serde_json::Value,
}

impl WireMessage {
    pub fn new(event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }

    /// Flatten into `{"type": event, ...payload}`, the shape clients switch on.
    pub fn to_json(&self) -> serde_json::Value {
        let mut object = match &self.payload {
            serde_json::Value::Object(map) => map.clone(),
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other.clone());
                map
            }
        };
        object.insert(
            "type".to_string(),
            serde_json::Value::String(self.event.clone()),
        );
        serde_json::Value::Object(object)
    }
}

impl From<&PipelineEvent> for WireMessage {
    fn from(event: &PipelineEvent) -> Self {
        Self::new(event.name(), event.payload())
    }
}
