//! Job domain types for questions flowing through the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ExecutionError, TransitionError};

/// Unique, human-readable identifier for a job (e.g. `brave-otter`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle position of a job. Advances `todo -> running -> done | dead`,
/// or `todo -> done` for answers served from the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Admitted, waiting for the dispatcher.
    #[default]
    Todo,
    /// Currently executing against the agent.
    Running,
    /// Finished with a result.
    Done,
    /// Finished with an error.
    Dead,
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Dead)
    }

    /// Whether `self -> next` is a legal forward transition.
    pub fn can_advance_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Todo, JobStatus::Running)
                | (JobStatus::Todo, JobStatus::Done)
                | (JobStatus::Running, JobStatus::Done)
                | (JobStatus::Running, JobStatus::Dead)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Todo => "todo",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Dead => "dead",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// The agent's answer, as text.
    pub answer: String,
    /// Optional structured output data as JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
}

impl JobResult {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            output: None,
        }
    }

    pub fn with_output(answer: impl Into<String>, output: serde_json::Value) -> Self {
        Self {
            answer: answer.into(),
            output: Some(output),
        }
    }
}

/// Failure recorded on a dead job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    /// Human-readable cause.
    pub message: String,
    /// Structured trace, when the agent provided one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<serde_json::Value>,
}

impl From<ExecutionError> for JobError {
    fn from(err: ExecutionError) -> Self {
        Self {
            message: err.message,
            trace: err.trace,
        }
    }
}

/// A job is one question travelling through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Normalized question text.
    pub question: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Set only when the job reaches `done`.
    pub result: Option<JobResult>,
    /// Set only when the job reaches `dead`.
    pub error: Option<JobError>,
    /// The answer came from the answer cache; the job never ran.
    #[serde(default)]
    pub from_cache: bool,
}

impl Job {
    /// Create a new job waiting in `todo`.
    pub fn new(id: JobId, question: impl Into<String>) -> Self {
        Self {
            id,
            question: question.into(),
            status: JobStatus::Todo,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            result: None,
            error: None,
            from_cache: false,
        }
    }

    fn advance(&mut self, next: JobStatus) -> Result<(), TransitionError> {
        if !self.status.can_advance_to(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// `todo -> running`.
    pub fn start(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.advance(JobStatus::Running)?;
        self.started_at = Some(at);
        Ok(())
    }

    /// `running -> done`.
    pub fn complete(&mut self, result: JobResult, at: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.status != JobStatus::Running {
            return Err(TransitionError {
                from: self.status,
                to: JobStatus::Done,
            });
        }
        self.advance(JobStatus::Done)?;
        self.result = Some(result);
        self.finished_at = Some(at);
        Ok(())
    }

    /// `running -> dead`.
    pub fn fail(&mut self, error: JobError, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.advance(JobStatus::Dead)?;
        self.error = Some(error);
        self.finished_at = Some(at);
        Ok(())
    }

    /// `todo -> done` with an answer taken from the cache.
    pub fn resolve_cached(
        &mut self,
        result: JobResult,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if self.status != JobStatus::Todo {
            return Err(TransitionError {
                from: self.status,
                to: JobStatus::Done,
            });
        }
        self.advance(JobStatus::Done)?;
        self.result = Some(result);
        self.finished_at = Some(at);
        self.from_cache = true;
        Ok(())
    }

    /// Point-in-time summary for observers.
    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id.clone(),
            question: self.question.clone(),
            status: self.status,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            result: self.result.clone(),
            error: self.error.clone(),
            from_cache: self.from_cache,
        }
    }
}

/// The job shape carried by queue events and listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: JobId,
    pub question: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub from_cache: bool,
}
