//! Agent executor trait and adapters.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use pipeline_core::{ExecutionError, JobResult};

/// Result type for agent executions.
pub type ExecutionResult = Result<JobResult, ExecutionError>;

/// Future type for async agent executions.
pub type ExecutionFuture = Pin<Box<dyn Future<Output = ExecutionResult> + Send>>;

/// Answers one question.
///
/// Implement this trait to plug an agent into the pipeline. Executions may
/// run for a long time; the dispatcher awaits them without holding any lock.
pub trait AgentExecutor: Send + Sync + 'static {
    fn execute(&self, question: &str) -> ExecutionFuture;
}

impl<E: AgentExecutor + ?Sized> AgentExecutor for Arc<E> {
    fn execute(&self, question: &str) -> ExecutionFuture {
        (**self).execute(question)
    }
}

/// A simple function-based executor.
pub struct FnExecutor<F>
where
    F: Fn(String) -> ExecutionFuture + Send + Sync + 'static,
{
    agent: F,
}

impl<F> FnExecutor<F>
where
    F: Fn(String) -> ExecutionFuture + Send + Sync + 'static,
{
    pub fn new(agent: F) -> Self {
        Self { agent }
    }
}

impl<F> AgentExecutor for FnExecutor<F>
where
    F: Fn(String) -> ExecutionFuture + Send + Sync + 'static,
{
    fn execute(&self, question: &str) -> ExecutionFuture {
        (self.agent)(question.to_string())
    }
}

/// Fails an execution that runs longer than `limit`.
pub struct TimeoutExecutor {
    inner: Arc<dyn AgentExecutor>,
    limit: Duration,
}

impl TimeoutExecutor {
    pub fn new(inner: Arc<dyn AgentExecutor>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

impl AgentExecutor for TimeoutExecutor {
    fn execute(&self, question: &str) -> ExecutionFuture {
        let execution = self.inner.execute(question);
        let limit = self.limit;
        Box::pin(async move {
            match tokio::time::timeout(limit, execution).await {
                Ok(result) => result,
                Err(_) => Err(ExecutionError::with_trace(
                    format!("agent timed out after {limit:?}"),
                    serde_json::json!({ "timeout_ms": limit.as_millis() as u64 }),
                )),
            }
        })
    }
}

/// Helper macro for creating executors from async closures.
#[macro_export]
macro_rules! agent {
    (|$question:ident| $body:expr) => {
        $crate::FnExecutor::new(|$question: String| {
            Box::pin(async move {
                let result: $crate::ExecutionResult = $body;
                result
            })
        })
    };
}
