//! User-addressed notifications, independent of job execution.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pipeline_core::{AdmissionError, Notification, NotificationKind, NotificationPriority};

use crate::emitter::Emitter;
use crate::sink::EventSink;

/// One ordered store of every pending notification.
///
/// Per-user FIFO is a filter over the global order, not a partition.
pub struct NotificationQueue {
    items: Mutex<VecDeque<Notification>>,
    emitter: Emitter,
    sink: Arc<dyn EventSink>,
}

impl NotificationQueue {
    pub fn new(emitter: Emitter, sink: Arc<dyn EventSink>) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            emitter,
            sink,
        }
    }

    /// Queue a notification and announce it to its target only.
    pub fn push_notification(
        &self,
        target_user: &str,
        message: &str,
        kind: NotificationKind,
        priority: NotificationPriority,
    ) -> Result<Notification, AdmissionError> {
        let target_user = user_key(target_user);
        if target_user.is_empty() {
            return Err(AdmissionError::EmptyTarget);
        }
        if message.trim().is_empty() {
            return Err(AdmissionError::EmptyMessage);
        }

        let mut notification = Notification::new(target_user, message, kind, priority);
        notification.delivered = self.sink.is_reachable(target_user);

        let mut items = self.lock();
        tracing::debug!(
            target_user = %notification.target_user,
            id = %notification.id,
            delivered = notification.delivered,
            "Notification queued"
        );
        items.push_back(notification.clone());
        self.emitter.notification_pushed(&notification);
        Ok(notification)
    }

    /// Remove and return the oldest notification for `target_user`.
    pub fn pop_for(&self, target_user: &str) -> Option<Notification> {
        let target_user = user_key(target_user);
        let mut items = self.lock();
        let index = items.iter().position(|n| n.target_user == target_user)?;
        items.remove(index)
    }

    /// Pending notifications for `target_user`, oldest first.
    pub fn list_for(&self, target_user: &str) -> Vec<Notification> {
        let target_user = user_key(target_user);
        self.lock()
            .iter()
            .filter(|n| n.target_user == target_user)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Notification>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Target users are matched without surrounding whitespace on every path.
fn user_key(target_user: &str) -> &str {
    target_user.trim()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_methods)]

    use super::*;
    use crate::sink::SessionHub;

    fn queue(hub: Arc<SessionHub>) -> NotificationQueue {
        NotificationQueue::new(Emitter::disabled(), hub)
    }

    #[test]
    fn pop_filters_by_user_in_order() -> Result<(), Box<dyn std::error::Error>> {
        let q = queue(Arc::new(SessionHub::new()));
        let kind = NotificationKind::Task;
        let priority = NotificationPriority::Medium;
        q.push_notification("u1", "first", kind, priority)?;
        q.push_notification("u2", "other", kind, priority)?;
        q.push_notification("u1", "second", kind, priority)?;

        let listed: Vec<String> = q.list_for("u1").into_iter().map(|n| n.message).collect();
        assert_eq!(listed, vec!["first", "second"]);

        assert_eq!(q.pop_for("u1").unwrap().message, "first");
        assert_eq!(q.pop_for("u1").unwrap().message, "second");
        assert!(q.pop_for("u1").is_none());
        assert_eq!(q.len(), 1);
        assert!(q.pop_for("nobody").is_none());
        Ok(())
    }

    #[test]
    fn padded_target_matches_on_every_path() -> Result<(), Box<dyn std::error::Error>> {
        let q = queue(Arc::new(SessionHub::new()));
        let kind = NotificationKind::Task;
        let priority = NotificationPriority::Low;
        let pushed = q.push_notification(" u1", "first", kind, priority)?;
        q.push_notification("u1 ", "second", kind, priority)?;
        assert_eq!(pushed.target_user, "u1");

        assert_eq!(q.list_for(" u1").len(), 2);
        assert_eq!(q.list_for("u1").len(), 2);
        assert_eq!(q.pop_for(" u1").map(|n| n.message).as_deref(), Some("first"));
        assert_eq!(q.pop_for("u1\t").map(|n| n.message).as_deref(), Some("second"));
        assert!(q.is_empty());
        Ok(())
    }

    #[test]
    fn delivered_reflects_reachability() -> Result<(), Box<dyn std::error::Error>> {
        let hub = Arc::new(SessionHub::new());
        let _rx = hub.connect("online");
        let q = queue(hub);

        let seen = q.push_notification("online", "hi", NotificationKind::Alert, NotificationPriority::High)?;
        let unseen = q.push_notification("offline", "hi", NotificationKind::Alert, NotificationPriority::High)?;
        assert!(seen.delivered);
        assert!(!unseen.delivered);
        Ok(())
    }

    #[test]
    fn rejects_empty_fields() {
        let q = queue(Arc::new(SessionHub::new()));
        let kind = NotificationKind::default();
        let priority = NotificationPriority::default();
        assert_eq!(
            q.push_notification(" ", "msg", kind, priority),
            Err(AdmissionError::EmptyTarget)
        );
        assert_eq!(
            q.push_notification("u1", "", kind, priority),
            Err(AdmissionError::EmptyMessage)
        );
        assert!(q.is_empty());
    }
}
