//! Error taxonomy shared by the pipeline runtime and its callers.

use std::time::Duration;

use thiserror::Error;

use crate::JobStatus;

/// A request was rejected before anything was enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("question is empty")]
    EmptyQuestion,

    #[error("question is {len} characters long, the limit is {max}")]
    QuestionTooLong { len: usize, max: usize },

    #[error("notification target user is empty")]
    EmptyTarget,

    #[error("notification message is empty")]
    EmptyMessage,
}

/// The agent failed to answer. Becomes the `error` of a dead job and is
/// never returned to the caller that admitted the job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExecutionError {
    pub message: String,
    pub trace: Option<serde_json::Value>,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: None,
        }
    }

    pub fn with_trace(message: impl Into<String>, trace: serde_json::Value) -> Self {
        Self {
            message: message.into(),
            trace: Some(trace),
        }
    }
}

/// A status change that would move a job backwards or skip a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal job transition {from} -> {to}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// The dispatcher did not stop cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShutdownError {
    #[error("dispatcher did not stop within {waited:?}")]
    Timeout { waited: Duration },

    #[error("dispatcher task failed: {0}")]
    Join(String),

    #[error("dispatcher exited before shutdown")]
    Exited,
}
