//! Admission queue.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use futures_util::FutureExt;
use pipeline_core::{
    AdmissionError, Job, JobId, JobResult, JobSummary, QueueName, cache_key, normalize_question,
};
use ractor::ActorRef;

use crate::cache::AnswerCache;
use crate::emitter::Emitter;
use crate::fifo::FifoQueue;
use crate::ids::IdGenerator;
use crate::messages::DispatcherMessage;

/// Entry point for new jobs.
///
/// Admission validates the question, then consults the answer cache. A hit
/// is resolved on the spot and lands directly in the done queue; a miss is
/// queued here and the dispatcher is woken.
pub struct TodoQueue {
    queue: FifoQueue,
    done: Arc<FifoQueue>,
    cache: Arc<dyn AnswerCache>,
    ids: Arc<dyn IdGenerator>,
    max_question_len: usize,
    dispatcher: RwLock<Option<ActorRef<DispatcherMessage>>>,
}

impl TodoQueue {
    pub fn new(
        emitter: Emitter,
        done: Arc<FifoQueue>,
        cache: Arc<dyn AnswerCache>,
        ids: Arc<dyn IdGenerator>,
        max_question_len: usize,
    ) -> Self {
        Self {
            queue: FifoQueue::new(QueueName::Todo, emitter),
            done,
            cache,
            ids,
            max_question_len,
            dispatcher: RwLock::new(None),
        }
    }

    /// Wake this dispatcher whenever a job is queued.
    pub fn attach_dispatcher(&self, dispatcher: ActorRef<DispatcherMessage>) {
        *self
            .dispatcher
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(dispatcher);
    }

    /// Admit a question.
    ///
    /// Every call yields a distinct job, even for a question that is already
    /// queued or running. Only completed answers are reused.
    pub async fn push_job(&self, question: &str) -> Result<Job, AdmissionError> {
        let question = normalize_question(question);
        if question.is_empty() {
            return Err(AdmissionError::EmptyQuestion);
        }
        let len = question.chars().count();
        if len > self.max_question_len {
            return Err(AdmissionError::QuestionTooLong {
                len,
                max: self.max_question_len,
            });
        }

        let mut job = Job::new(self.ids.next_id(), question);

        if let Some(cached) = self.cache.lookup(&cache_key(&job.question)).await {
            match job.resolve_cached(cached, Utc::now()) {
                Ok(()) => {
                    tracing::info!(job_id = %job.id, "Answered from cache");
                    self.done.push(job.clone());
                    return Ok(job);
                }
                Err(e) => tracing::warn!(job_id = %job.id, "Ignoring cached answer: {}", e),
            }
        }

        tracing::info!(job_id = %job.id, question = %job.question, "Job admitted");
        self.queue.push(job.clone());
        self.wake();
        Ok(job)
    }

    /// Record an answer so later admissions of the same question reuse it.
    ///
    /// A cache that panics is logged and skipped; the job still completes.
    pub async fn remember(&self, question: &str, result: &JobResult) {
        let key = cache_key(question);
        let recorded = AssertUnwindSafe(async { self.cache.record(&key, result).await })
            .catch_unwind()
            .await;
        if recorded.is_err() {
            tracing::error!(key = %key, "Answer cache panicked while recording");
        }
    }

    fn wake(&self) {
        let dispatcher = self.dispatcher.read().unwrap_or_else(PoisonError::into_inner);
        match dispatcher.as_ref() {
            Some(actor) => {
                if actor.send_message(DispatcherMessage::Drain).is_err() {
                    tracing::debug!("Dispatcher stopped, job stays queued");
                }
            }
            None => tracing::debug!("No dispatcher attached, job stays queued"),
        }
    }

    pub fn remove(&self, id: &JobId) -> Option<Job> {
        self.queue.remove(id)
    }

    pub fn list(&self) -> Vec<Job> {
        self.queue.list()
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

#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_methods)]

    use super::*;
    use crate::cache::{MemoryAnswerCache, NoCache};
    use crate::ids::TwoWordIdGenerator;
    use pipeline_core::JobStatus;

    fn todo_with(cache: Arc<dyn AnswerCache>) -> (TodoQueue, Arc<FifoQueue>) {
        let done = Arc::new(FifoQueue::new(QueueName::Done, Emitter::disabled()));
        let todo = TodoQueue::new(
            Emitter::disabled(),
            done.clone(),
            cache,
            Arc::new(TwoWordIdGenerator::new()),
            16,
        );
        (todo, done)
    }

    #[tokio::test]
    async fn rejects_bad_questions() {
        let (todo, _) = todo_with(Arc::new(NoCache));
        assert_eq!(todo.push_job("   \n ").await, Err(AdmissionError::EmptyQuestion));
        assert_eq!(
            todo.push_job("a question that is far too long").await,
            Err(AdmissionError::QuestionTooLong { len: 31, max: 16 })
        );
        assert!(todo.is_empty());
    }

    #[tokio::test]
    async fn duplicates_are_not_merged() -> Result<(), Box<dyn std::error::Error>> {
        let (todo, _) = todo_with(Arc::new(NoCache));
        let first = todo.push_job("2+2").await?;
        let second = todo.push_job("  2+2 ").await?;
        assert_ne!(first.id, second.id);
        assert_eq!(second.question, "2+2");
        assert_eq!(todo.size(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn cache_hit_goes_straight_to_done() -> Result<(), Box<dyn std::error::Error>> {
        let cache = Arc::new(MemoryAnswerCache::new());
        cache.record("2+2", &JobResult::new("4")).await;
        let (todo, done) = todo_with(cache);

        let job = todo.push_job("2+2?").await?;
        assert_eq!(job.status, JobStatus::Done);
        assert!(job.from_cache);
        assert!(job.started_at.is_none());
        assert!(todo.is_empty());
        assert_eq!(done.list(), vec![job]);
        Ok(())
    }

    #[tokio::test]
    async fn remembered_answer_serves_the_next_admission() -> Result<(), Box<dyn std::error::Error>> {
        let (todo, done) = todo_with(Arc::new(MemoryAnswerCache::new()));
        todo.remember("What is 2+2?", &JobResult::new("4")).await;

        let job = todo.push_job("what is 2+2").await?;
        assert!(job.from_cache);
        assert_eq!(job.result, Some(JobResult::new("4")));
        assert_eq!(done.size(), 1);
        Ok(())
    }
}
