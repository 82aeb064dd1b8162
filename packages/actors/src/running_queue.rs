//! The single in-flight slot and the execution step.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use chrono::Utc;
use futures_util::FutureExt;
use pipeline_core::{ExecutionError, Job, JobId, JobSummary, QueueName};

use crate::emitter::Emitter;
use crate::executor::{AgentExecutor, ExecutionResult};
use crate::fifo::{FifoQueue, Pick, transfer};
use crate::todo_queue::TodoQueue;

/// At most one job runs at a time.
pub const RUNNING_CAPACITY: usize = 1;

/// What one dispatch step did.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Nothing was waiting, or a job is already running.
    Idle,
    /// A job ran and landed in done or dead.
    Finished(Job),
    /// A job ran but was removed while running; its outcome was dropped.
    Discarded(JobId),
}

pub struct RunningQueue {
    queue: FifoQueue,
}

impl RunningQueue {
    pub fn new(emitter: Emitter) -> Self {
        Self {
            queue: FifoQueue::new(QueueName::Running, emitter),
        }
    }

    /// Move the head of `todo` into the running slot and mark it started.
    pub fn start_next(&self, todo: &TodoQueue) -> Option<Job> {
        let started = transfer(
            todo.fifo(),
            &self.queue,
            Pick::Head,
            Some(RUNNING_CAPACITY),
            |job| job.start(Utc::now()),
        );
        match started {
            Ok(job) => job,
            Err(e) => {
                tracing::error!("Cannot start job: {}", e);
                None
            }
        }
    }

    /// Start the next job, run it to completion and route the outcome.
    ///
    /// No lock is held while the agent runs. Errors and panics from the agent,
    /// including a panic while building its future, end up on the dead job
    /// and are never returned from here. A successful answer is recorded in
    /// the cache before the job becomes visible in done.
    pub async fn run_next(
        &self,
        todo: &TodoQueue,
        done: &FifoQueue,
        dead: &FifoQueue,
        executor: &dyn AgentExecutor,
    ) -> Dispatch {
        let Some(job) = self.start_next(todo) else {
            return Dispatch::Idle;
        };
        tracing::info!(job_id = %job.id, "Job started");

        let outcome = AssertUnwindSafe(async { executor.execute(&job.question).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(panic_error(panic)));

        if let Ok(result) = &outcome {
            todo.remember(&job.question, result).await;
        }

        self.finish(&job.id, outcome, done, dead)
    }

    /// Move a running job to done or dead according to `outcome`.
    pub fn finish(
        &self,
        id: &JobId,
        outcome: ExecutionResult,
        done: &FifoQueue,
        dead: &FifoQueue,
    ) -> Dispatch {
        let now = Utc::now();
        let moved = match outcome {
            Ok(result) => transfer(&self.queue, done, Pick::Id(id), None, |job| {
                job.complete(result, now)
            }),
            Err(error) => {
                tracing::warn!(job_id = %id, "Job failed: {}", error);
                transfer(&self.queue, dead, Pick::Id(id), None, |job| {
                    job.fail(error.into(), now)
                })
            }
        };

        match moved {
            Ok(Some(job)) => {
                tracing::info!(job_id = %job.id, status = %job.status, "Job finished");
                Dispatch::Finished(job)
            }
            Ok(None) => {
                tracing::info!(job_id = %id, "Job was removed while running, outcome discarded");
                Dispatch::Discarded(id.clone())
            }
            Err(e) => {
                tracing::error!(job_id = %id, "Cannot finish job: {}", e);
                Dispatch::Discarded(id.clone())
            }
        }
    }

    pub fn remove(&self, id: &JobId) -> Option<Job> {
        self.queue.remove(id)
    }

    pub fn current(&self) -> Option<Job> {
        self.queue.list().into_iter().next()
    }

    pub fn snapshot(&self) -> Vec<JobSummary> {
        self.queue.snapshot()
    }

    pub fn size(&self) -> usize {
        self.queue.size()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn fifo(&self) -> &FifoQueue {
        &self.queue
    }
}

fn panic_error(panic: Box<dyn Any + Send>) -> ExecutionError {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    ExecutionError::new(format!("agent panicked: {message}"))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_methods)]

    use std::sync::Arc;

    use super::*;
    use crate::cache::{AnswerCache, MemoryAnswerCache, NoCache};
    use crate::executor::FnExecutor;
    use crate::ids::TwoWordIdGenerator;
    use pipeline_core::{JobResult, JobStatus};

    struct Lanes {
        todo: TodoQueue,
        running: RunningQueue,
        done: Arc<FifoQueue>,
        dead: FifoQueue,
    }

    fn lanes() -> Lanes {
        let done = Arc::new(FifoQueue::new(QueueName::Done, Emitter::disabled()));
        Lanes {
            todo: TodoQueue::new(
                Emitter::disabled(),
                done.clone(),
                Arc::new(NoCache),
                Arc::new(TwoWordIdGenerator::new()),
                1024,
            ),
            running: RunningQueue::new(Emitter::disabled()),
            done,
            dead: FifoQueue::new(QueueName::Dead, Emitter::disabled()),
        }
    }

    fn arithmetic() -> FnExecutor<impl Fn(String) -> crate::ExecutionFuture + Send + Sync + 'static> {
        FnExecutor::new(|question: String| {
            Box::pin(async move {
                match question.as_str() {
                    "2+2" => Ok(JobResult::new("4")),
                    "boom" => panic!("kaboom"),
                    other => Err(ExecutionError::new(format!("cannot answer {other}"))),
                }
            })
        })
    }

    #[tokio::test]
    async fn success_lands_in_done() -> Result<(), Box<dyn std::error::Error>> {
        let l = lanes();
        let job = l.todo.push_job("2+2").await?;

        let Dispatch::Finished(finished) = l.running.run_next(&l.todo, &l.done, &l.dead, &arithmetic()).await else {
            panic!("expected a finished job");
        };
        assert_eq!(finished.id, job.id);
        assert_eq!(finished.status, JobStatus::Done);
        assert!(finished.started_at.is_some());
        assert!(l.running.is_empty());
        assert_eq!(l.done.size(), 1);
        assert!(l.dead.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn errors_and_panics_land_in_dead() -> Result<(), Box<dyn std::error::Error>> {
        let l = lanes();
        l.todo.push_job("fail-case").await?;
        l.todo.push_job("boom").await?;

        let agent = arithmetic();
        l.running.run_next(&l.todo, &l.done, &l.dead, &agent).await;
        l.running.run_next(&l.todo, &l.done, &l.dead, &agent).await;

        let dead = l.dead.list();
        assert_eq!(dead.len(), 2);
        assert_eq!(dead[0].error.as_ref().unwrap().message, "cannot answer fail-case");
        assert!(dead[1].error.as_ref().unwrap().message.contains("kaboom"));
        assert!(l.done.is_empty());
        Ok(())
    }

    /// Panics in `execute` itself, before any future exists.
    struct EagerPanic;

    impl AgentExecutor for EagerPanic {
        fn execute(&self, question: &str) -> crate::ExecutionFuture {
            if question == "explode" {
                panic!("refused to start");
            }
            let answer = JobResult::new(format!("ran {question}"));
            Box::pin(async move { Ok(answer) })
        }
    }

    #[tokio::test]
    async fn panic_before_the_future_lands_in_dead() -> Result<(), Box<dyn std::error::Error>> {
        let l = lanes();
        let exploded = l.todo.push_job("explode").await?;
        let after = l.todo.push_job("after").await?;

        l.running.run_next(&l.todo, &l.done, &l.dead, &EagerPanic).await;
        let dead = l.dead.list();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].id, exploded.id);
        assert!(dead[0].error.as_ref().unwrap().message.contains("refused to start"));
        assert!(l.running.is_empty());

        let Dispatch::Finished(finished) = l.running.run_next(&l.todo, &l.done, &l.dead, &EagerPanic).await else {
            panic!("expected the next job to run");
        };
        assert_eq!(finished.id, after.id);
        assert_eq!(finished.status, JobStatus::Done);
        Ok(())
    }

    #[tokio::test]
    async fn answer_is_cached_before_done_is_visible() -> Result<(), Box<dyn std::error::Error>> {
        let cache = Arc::new(MemoryAnswerCache::new());
        let mut l = lanes();
        l.todo = TodoQueue::new(
            Emitter::disabled(),
            l.done.clone(),
            cache.clone(),
            Arc::new(TwoWordIdGenerator::new()),
            1024,
        );
        l.todo.push_job("2+2").await?;
        l.todo.push_job("fail-case").await?;

        let agent = arithmetic();
        l.running.run_next(&l.todo, &l.done, &l.dead, &agent).await;
        l.running.run_next(&l.todo, &l.done, &l.dead, &agent).await;

        assert_eq!(cache.lookup("2+2").await, Some(JobResult::new("4")));
        assert_eq!(cache.lookup("fail-case").await, None);
        assert_eq!(cache.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn slot_holds_one_job() -> Result<(), Box<dyn std::error::Error>> {
        let l = lanes();
        l.todo.push_job("a").await?;
        l.todo.push_job("b").await?;

        let first = l.running.start_next(&l.todo).unwrap();
        assert!(l.running.start_next(&l.todo).is_none());
        assert_eq!(l.running.size(), 1);
        assert_eq!(l.todo.size(), 1);
        assert_eq!(l.running.current().unwrap().id, first.id);
        Ok(())
    }

    #[tokio::test]
    async fn removed_running_job_is_discarded() -> Result<(), Box<dyn std::error::Error>> {
        let l = lanes();
        l.todo.push_job("2+2").await?;
        let job = l.running.start_next(&l.todo).unwrap();
        l.running.remove(&job.id).unwrap();

        let outcome = l.running.finish(&job.id, Ok(JobResult::new("4")), &l.done, &l.dead);
        assert_eq!(outcome, Dispatch::Discarded(job.id));
        assert!(l.done.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn idle_when_nothing_waits() {
        let l = lanes();
        let outcome = l.running.run_next(&l.todo, &l.done, &l.dead, &arithmetic()).await;
        assert_eq!(outcome, Dispatch::Idle);
    }
}
