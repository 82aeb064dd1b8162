//! Emitter actor: the single delivery task between queue mutations and the
//! event sink.
//!
//! Mutations enqueue into the actor's mailbox and return immediately; the
//! actor hands each event to the sink in mailbox order.

use std::sync::Arc;
use std::time::Duration;

use pipeline_core::{
    JobSummary, Notification, NotificationUpdate, PipelineEvent, QueueName,
};
use ractor::{Actor, ActorProcessingErr, ActorRef};

use crate::messages::{EmitterMessage, Scope};
use crate::sink::EventSink;

/// Emitter actor that performs sink fan-out.
pub struct EmitterActor;

impl Actor for EmitterActor {
    type Msg = EmitterMessage;
    type State = Arc<dyn EventSink>;
    type Arguments = Arc<dyn EventSink>;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        sink: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting event emitter");
        Ok(sink)
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        sink: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            EmitterMessage::Deliver { scope, event } => {
                tracing::trace!("{}", event.description());
                let name = event.name();
                let payload = event.payload();
                match scope {
                    Scope::Broadcast => sink.emit_broadcast(name, payload).await,
                    Scope::Session(key) => {
                        if !sink.is_reachable(&key) {
                            tracing::debug!(scope = %key, event = name, "Scoped subscriber not reachable");
                        }
                        sink.emit_scoped(&key, name, payload).await;
                    }
                }
            }

            EmitterMessage::Flush { reply } => {
                let _ = reply.send(());
            }
        }

        Ok(())
    }
}

/// Cheap handle used by queues to enqueue emissions.
#[derive(Clone, Default)]
pub struct Emitter {
    actor: Option<ActorRef<EmitterMessage>>,
}

impl Emitter {
    pub fn new(actor: ActorRef<EmitterMessage>) -> Self {
        Self { actor: Some(actor) }
    }

    /// An emitter that drops everything.
    pub fn disabled() -> Self {
        Self { actor: None }
    }

    /// Announce the full contents of a queue after a mutation.
    pub fn queue_updated(&self, queue: QueueName, jobs: Vec<JobSummary>) {
        self.send(Scope::Broadcast, PipelineEvent::queue_updated(queue, jobs));
    }

    /// Announce a notification to its target user only.
    pub fn notification_pushed(&self, notification: &Notification) {
        let event = PipelineEvent::NotificationPushed(NotificationUpdate {
            target_user: notification.target_user.clone(),
            notification: notification.summary(),
        });
        self.send(Scope::Session(notification.target_user.clone()), event);
    }

    pub fn broadcast(&self, event: PipelineEvent) {
        self.send(Scope::Broadcast, event);
    }

    fn send(&self, scope: Scope, event: PipelineEvent) {
        let Some(actor) = &self.actor else {
            return;
        };
        if let Err(e) = actor.send_message(EmitterMessage::Deliver { scope, event }) {
            tracing::warn!("Failed to enqueue event: {}", e);
        }
    }

    /// Wait until every emission enqueued before this call reached the sink.
    /// Returns false on timeout or when the emitter is gone.
    pub async fn flush(&self, timeout: Duration) -> bool {
        let Some(actor) = &self.actor else {
            return true;
        };
        let result = ractor::rpc::call(
            actor,
            |reply| EmitterMessage::Flush { reply },
            Some(timeout),
        )
        .await;
        matches!(result, Ok(ractor::rpc::CallResult::Success(())))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_methods)]

    use super::*;
    use crate::sink::SessionHub;
    use pipeline_core::{Job, JobId, NotificationKind, NotificationPriority};

    #[tokio::test]
    async fn delivers_in_enqueue_order() -> Result<(), Box<dyn std::error::Error>> {
        let hub = Arc::new(SessionHub::new());
        let mut rx = hub.connect("u1");
        let (actor, handle) = Actor::spawn(None, EmitterActor, hub.clone() as Arc<dyn EventSink>).await?;
        let emitter = Emitter::new(actor.clone());

        let job = Job::new(JobId::from("brave-otter"), "2+2");
        emitter.queue_updated(QueueName::Todo, vec![job.summary()]);
        emitter.queue_updated(QueueName::Todo, vec![]);
        emitter.notification_pushed(&Notification::new(
            "u1",
            "hello",
            NotificationKind::Custom,
            NotificationPriority::Low,
        ));
        emitter.notification_pushed(&Notification::new(
            "u2",
            "not for u1",
            NotificationKind::Custom,
            NotificationPriority::Low,
        ));
        assert!(emitter.flush(Duration::from_secs(1)).await);

        let first = rx.try_recv()?;
        assert_eq!(first.event, "todo_update");
        assert_eq!(first.payload["jobs"].as_array().map(Vec::len), Some(1));
        assert_eq!(rx.try_recv()?.payload["jobs"].as_array().map(Vec::len), Some(0));
        assert_eq!(rx.try_recv()?.payload["notification"]["message"], "hello");
        assert!(rx.try_recv().is_err());

        actor.stop(None);
        handle.await?;
        Ok(())
    }

    #[tokio::test]
    async fn disabled_emitter_is_silent() {
        let emitter = Emitter::disabled();
        emitter.broadcast(PipelineEvent::TimeUpdate {
            timestamp: chrono::Utc::now(),
        });
        assert!(emitter.flush(Duration::from_millis(10)).await);
    }
}
