//! Application context: every queue and worker, built once at startup.

use std::sync::Arc;
use std::time::Duration;

use pipeline_core::{
    AdmissionError, Job, JobId, JobSummary, Notification, NotificationKind, NotificationPriority,
    PipelineConfig, PipelineSnapshot, QueueName, QueueStats, ShutdownError,
};
use ractor::{Actor, ActorRef};
use tokio::task::JoinHandle;

use crate::cache::{AnswerCache, MemoryAnswerCache};
use crate::clock::spawn_clock;
use crate::dispatcher::{Dispatcher, DispatcherState};
use crate::emitter::{Emitter, EmitterActor};
use crate::error::PipelineError;
use crate::executor::{AgentExecutor, TimeoutExecutor};
use crate::fifo::FifoQueue;
use crate::ids::{IdGenerator, TwoWordIdGenerator};
use crate::messages::EmitterMessage;
use crate::notification_queue::NotificationQueue;
use crate::running_queue::RunningQueue;
use crate::sink::EventSink;
use crate::todo_queue::TodoQueue;

/// External collaborators the pipeline is wired to.
pub struct Collaborators {
    pub executor: Arc<dyn AgentExecutor>,
    pub sink: Arc<dyn EventSink>,
    pub cache: Arc<dyn AnswerCache>,
    pub ids: Arc<dyn IdGenerator>,
}

impl Collaborators {
    /// In-memory cache and two-word ids.
    pub fn new(executor: Arc<dyn AgentExecutor>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            executor,
            sink,
            cache: Arc::new(MemoryAnswerCache::new()),
            ids: Arc::new(TwoWordIdGenerator::new()),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn AnswerCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }
}

/// The running pipeline.
///
/// Construct one with [`Pipeline::start`] and hand out references to it;
/// there is no global state. [`Pipeline::shutdown`] stops the dispatcher,
/// drains pending events and stops the emitter.
pub struct Pipeline {
    config: PipelineConfig,
    todo: Arc<TodoQueue>,
    running: Arc<RunningQueue>,
    done: Arc<FifoQueue>,
    dead: Arc<FifoQueue>,
    notifications: NotificationQueue,
    sink: Arc<dyn EventSink>,
    emitter: Emitter,
    emitter_actor: ActorRef<EmitterMessage>,
    emitter_handle: JoinHandle<()>,
    dispatcher: Dispatcher,
    clock: Option<JoinHandle<()>>,
}

impl Pipeline {
    pub async fn start(
        config: PipelineConfig,
        collaborators: Collaborators,
    ) -> Result<Self, PipelineError> {
        let Collaborators {
            executor,
            sink,
            cache,
            ids,
        } = collaborators;

        let (emitter_actor, emitter_handle) = Actor::spawn(None, EmitterActor, sink.clone())
            .await
            .map_err(|source| PipelineError::Spawn {
                actor: "emitter",
                source,
            })?;
        let emitter = Emitter::new(emitter_actor.clone());

        let done = Arc::new(FifoQueue::new(QueueName::Done, emitter.clone()));
        let dead = Arc::new(FifoQueue::new(QueueName::Dead, emitter.clone()));
        let running = Arc::new(RunningQueue::new(emitter.clone()));
        let todo = Arc::new(TodoQueue::new(
            emitter.clone(),
            done.clone(),
            cache,
            ids,
            config.max_question_len,
        ));

        let executor: Arc<dyn AgentExecutor> = match config.execution_timeout() {
            Some(limit) => Arc::new(TimeoutExecutor::new(executor, limit)),
            None => executor,
        };

        let dispatcher = match Dispatcher::spawn(DispatcherState {
            todo: todo.clone(),
            running: running.clone(),
            done: done.clone(),
            dead: dead.clone(),
            executor,
        })
        .await
        {
            Ok(dispatcher) => dispatcher,
            Err(e) => {
                emitter_actor.stop(None);
                return Err(e);
            }
        };
        todo.attach_dispatcher(dispatcher.actor());

        let notifications = NotificationQueue::new(emitter.clone(), sink.clone());
        let clock = config
            .clock_interval()
            .map(|interval| spawn_clock(emitter.clone(), interval));

        tracing::info!("Pipeline started");

        Ok(Self {
            config,
            todo,
            running,
            done,
            dead,
            notifications,
            sink,
            emitter,
            emitter_actor,
            emitter_handle,
            dispatcher,
            clock,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Admit a question. See [`TodoQueue::push_job`].
    pub async fn push_job(&self, question: &str) -> Result<Job, AdmissionError> {
        self.todo.push_job(question).await
    }

    /// Job summaries of one queue, oldest first.
    pub fn list(&self, queue: QueueName) -> Vec<JobSummary> {
        self.fifo(queue).snapshot()
    }

    /// Full jobs of one queue, oldest first.
    pub fn jobs(&self, queue: QueueName) -> Vec<Job> {
        self.fifo(queue).list()
    }

    /// Delete a job from a queue. Removing the running job does not stop its
    /// execution; the outcome is dropped when it arrives.
    pub fn remove(&self, queue: QueueName, id: &JobId) -> Option<Job> {
        let removed = self.fifo(queue).remove(id);
        if removed.is_some() {
            tracing::info!(queue = %queue, job_id = %id, "Job removed");
        }
        removed
    }

    /// All four queues at one instant.
    pub fn snapshot(&self) -> PipelineSnapshot {
        let todo = self.todo.fifo().lock();
        let running = self.running.fifo().lock();
        let done = self.done.lock();
        let dead = self.dead.lock();
        PipelineSnapshot {
            todo: todo.iter().map(Job::summary).collect(),
            running: running.iter().map(Job::summary).collect(),
            done: done.iter().map(Job::summary).collect(),
            dead: dead.iter().map(Job::summary).collect(),
        }
    }

    pub fn stats(&self) -> QueueStats {
        let snapshot = self.snapshot();
        QueueStats {
            todo: snapshot.todo.len() as u64,
            running: snapshot.running.len() as u64,
            done: snapshot.done.len() as u64,
            dead: snapshot.dead.len() as u64,
            notifications: self.notifications.len() as u64,
        }
    }

    pub fn push_notification(
        &self,
        target_user: &str,
        message: &str,
        kind: NotificationKind,
        priority: NotificationPriority,
    ) -> Result<Notification, AdmissionError> {
        self.notifications
            .push_notification(target_user, message, kind, priority)
    }

    pub fn list_notifications(&self, target_user: &str) -> Vec<Notification> {
        self.notifications.list_for(target_user)
    }

    pub fn pop_notification(&self, target_user: &str) -> Option<Notification> {
        self.notifications.pop_for(target_user)
    }

    /// Subscribers currently reachable through the sink.
    pub fn subscriber_count(&self) -> usize {
        self.sink.reachable_count()
    }

    /// Wait until every event emitted so far has reached the sink.
    pub async fn flush_events(&self, timeout: Duration) -> bool {
        self.emitter.flush(timeout).await
    }

    /// Stop the clock and the dispatcher, then deliver what is left and stop
    /// the emitter. A dispatcher that fails to stop in time is reported but
    /// does not prevent the rest of the shutdown.
    pub async fn shutdown(self) -> Result<(), ShutdownError> {
        let timeout = self.config.join_timeout();

        if let Some(clock) = self.clock {
            clock.abort();
        }

        let stopped = self.dispatcher.stop(timeout).await;

        if !self.emitter.flush(timeout).await {
            tracing::warn!("Pending events were not delivered before shutdown");
        }
        self.emitter_actor.stop(None);
        if tokio::time::timeout(timeout, self.emitter_handle).await.is_err() {
            tracing::warn!("Emitter did not stop within {:?}", timeout);
        }

        tracing::info!("Pipeline stopped");
        stopped
    }

    fn fifo(&self, queue: QueueName) -> &FifoQueue {
        match queue {
            QueueName::Todo => self.todo.fifo(),
            QueueName::Running => self.running.fifo(),
            QueueName::Done => &self.done,
            QueueName::Dead => &self.dead,
        }
    }
}
