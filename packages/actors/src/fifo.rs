//! Ordered, lock-protected job container shared by all four queues.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use pipeline_core::{Job, JobId, JobSummary, QueueName, TransitionError};

use crate::emitter::Emitter;

/// Insertion-ordered job queue.
///
/// Every successful push, pop or remove enqueues exactly one emission
/// carrying the post-mutation contents. The emission is enqueued before the
/// lock is released so that emissions leave in mutation order; the sink
/// itself is only called later by the emitter actor.
pub struct FifoQueue {
    name: QueueName,
    jobs: Mutex<VecDeque<Job>>,
    emitter: Emitter,
}

/// Which job a transfer takes from its source queue.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Pick<'a> {
    Head,
    Id(&'a JobId),
}

impl FifoQueue {
    pub fn new(name: QueueName, emitter: Emitter) -> Self {
        Self {
            name,
            jobs: Mutex::new(VecDeque::new()),
            emitter,
        }
    }

    pub fn name(&self) -> QueueName {
        self.name
    }

    pub fn push(&self, job: Job) {
        let mut jobs = self.lock();
        tracing::debug!(queue = %self.name, job_id = %job.id, "Job pushed");
        jobs.push_back(job);
        self.announce(&jobs);
    }

    /// Remove and return the oldest job.
    pub fn pop_head(&self) -> Option<Job> {
        let mut jobs = self.lock();
        let job = jobs.pop_front()?;
        self.announce(&jobs);
        Some(job)
    }

    /// Remove a job by id. `None` when absent.
    pub fn remove(&self, id: &JobId) -> Option<Job> {
        let mut jobs = self.lock();
        let index = jobs.iter().position(|job| &job.id == id)?;
        let job = jobs.remove(index)?;
        tracing::debug!(queue = %self.name, job_id = %id, "Job removed");
        self.announce(&jobs);
        Some(job)
    }

    pub fn get(&self, id: &JobId) -> Option<Job> {
        self.lock().iter().find(|job| &job.id == id).cloned()
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.lock().iter().any(|job| &job.id == id)
    }

    /// Copy of the jobs, oldest first.
    pub fn list(&self) -> Vec<Job> {
        self.lock().iter().cloned().collect()
    }

    /// Summaries of the jobs, oldest first.
    pub fn snapshot(&self) -> Vec<JobSummary> {
        summarize(&self.lock())
    }

    pub fn size(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, VecDeque<Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn announce(&self, jobs: &VecDeque<Job>) {
        self.emitter.queue_updated(self.name, summarize(jobs));
    }
}

fn summarize(jobs: &VecDeque<Job>) -> Vec<JobSummary> {
    jobs.iter().map(Job::summary).collect()
}

/// Move one job from `from` to `to` as a single step.
///
/// Both locks are held for the whole move, acquired in queue rank order, so
/// no observer can see the job in neither or both queues. `update` runs on
/// the job before it lands; if it fails nothing moves. A `capacity` on the
/// destination is checked before anything is taken from the source.
///
/// Returns the moved job, or `Ok(None)` when there was nothing to move or the
/// destination was full.
pub(crate) fn transfer(
    from: &FifoQueue,
    to: &FifoQueue,
    pick: Pick<'_>,
    capacity: Option<usize>,
    update: impl FnOnce(&mut Job) -> Result<(), TransitionError>,
) -> Result<Option<Job>, TransitionError> {
    if from.name == to.name {
        return Ok(None);
    }

    let (mut source, mut dest) = if from.name.rank() < to.name.rank() {
        let source = from.lock();
        let dest = to.lock();
        (source, dest)
    } else {
        let dest = to.lock();
        let source = from.lock();
        (source, dest)
    };

    if capacity.is_some_and(|cap| dest.len() >= cap) {
        return Ok(None);
    }

    let index = match pick {
        Pick::Head if source.is_empty() => return Ok(None),
        Pick::Head => 0,
        Pick::Id(id) => match source.iter().position(|job| &job.id == id) {
            Some(index) => index,
            None => return Ok(None),
        },
    };

    let mut job = source[index].clone();
    update(&mut job)?;

    source.remove(index);
    dest.push_back(job.clone());

    tracing::debug!(job_id = %job.id, from = %from.name, to = %to.name, "Job transferred");
    from.announce(&source);
    to.announce(&dest);

    Ok(Some(job))
}
