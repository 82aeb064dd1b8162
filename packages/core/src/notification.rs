//! User-addressed notifications. Independent of jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a notification, using ULID for chronological sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub Ulid);

impl NotificationId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    pub fn parse(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a notification is about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Task,
    Progress,
    Alert,
    #[default]
    Custom,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Task => "task",
            NotificationKind::Progress => "progress",
            NotificationKind::Alert => "alert",
            NotificationKind::Custom => "custom",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "task" => Ok(NotificationKind::Task),
            "progress" => Ok(NotificationKind::Progress),
            "alert" => Ok(NotificationKind::Alert),
            "custom" => Ok(NotificationKind::Custom),
            other => Err(format!("unknown notification type: {other}")),
        }
    }
}

/// How loudly a client should surface a notification.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low = 0,
    #[default]
    Medium = 1,
    High = 2,
    Urgent = 3,
}

impl std::fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationPriority::Low => write!(f, "low"),
            NotificationPriority::Medium => write!(f, "medium"),
            NotificationPriority::High => write!(f, "high"),
            NotificationPriority::Urgent => write!(f, "urgent"),
        }
    }
}

impl std::str::FromStr for NotificationPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(NotificationPriority::Low),
            "medium" => Ok(NotificationPriority::Medium),
            "high" => Ok(NotificationPriority::High),
            "urgent" => Ok(NotificationPriority::Urgent),
            other => Err(format!("unknown notification priority: {other}")),
        }
    }
}

/// A message addressed to one user, consumed once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub target_user: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub priority: NotificationPriority,
    pub created_at: DateTime<Utc>,
    /// A subscriber for `target_user` was reachable when it was pushed.
    pub delivered: bool,
}

impl Notification {
    pub fn new(
        target_user: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationKind,
        priority: NotificationPriority,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            target_user: target_user.into(),
            message: message.into(),
            kind,
            priority,
            created_at: Utc::now(),
            delivered: false,
        }
    }

    pub fn summary(&self) -> NotificationSummary {
        NotificationSummary {
            id: self.id,
            message: self.message.clone(),
            kind: self.kind,
            priority: self.priority,
            created_at: self.created_at,
        }
    }
}

/// The notification shape carried by `notification_update` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSummary {
    pub id: NotificationId,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub priority: NotificationPriority,
    pub created_at: DateTime<Utc>,
}
