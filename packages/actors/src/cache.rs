//! Answer cache consulted at admission.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{PoisonError, RwLock};

use pipeline_core::JobResult;

/// Future type for cache operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Previously computed answers, keyed by [`pipeline_core::cache_key`].
pub trait AnswerCache: Send + Sync + 'static {
    /// Answer for `key`, or `None` on a miss.
    fn lookup<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<JobResult>>;

    /// Store the answer of a completed job.
    fn record<'a>(&'a self, key: &'a str, result: &'a JobResult) -> CacheFuture<'a, ()>;
}

/// Cache that never hits.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl AnswerCache for NoCache {
    fn lookup<'a>(&'a self, _key: &'a str) -> CacheFuture<'a, Option<JobResult>> {
        Box::pin(async { None })
    }

    fn record<'a>(&'a self, _key: &'a str, _result: &'a JobResult) -> CacheFuture<'a, ()> {
        Box::pin(async {})
    }
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct MemoryAnswerCache {
    answers: RwLock<HashMap<String, JobResult>>,
}

impl MemoryAnswerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.answers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AnswerCache for MemoryAnswerCache {
    fn lookup<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<JobResult>> {
        Box::pin(async move {
            self.answers
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(key)
                .cloned()
        })
    }

    fn record<'a>(&'a self, key: &'a str, result: &'a JobResult) -> CacheFuture<'a, ()> {
        Box::pin(async move {
            self.answers
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key.to_string(), result.clone());
        })
    }
}
