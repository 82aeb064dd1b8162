//! Core domain types for the job pipeline.
//!
//! This crate contains the types shared by the runtime and its front ends:
//! - Job, JobStatus and the summaries observers see
//! - QueueName, QueueStats and consistent snapshots
//! - Notification for user-addressed messages
//! - PipelineEvent for real-time updates
//! - PipelineConfig and the error taxonomy

mod config;
pub mod error;
mod events;
mod job;
mod notification;
mod question;
mod queue;

pub use config::PipelineConfig;
pub use error::{AdmissionError, ExecutionError, ShutdownError, TransitionError};
pub use events::{NotificationUpdate, PipelineEvent, QueueUpdate, WireMessage};
pub use job::{Job, JobError, JobId, JobResult, JobStatus, JobSummary};
pub use notification::{
    Notification, NotificationId, NotificationKind, NotificationPriority, NotificationSummary,
};
pub use question::{cache_key, normalize_question};
pub use queue::{PipelineSnapshot, QueueName, QueueStats};
