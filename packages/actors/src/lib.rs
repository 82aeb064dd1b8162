//! Runtime for the question pipeline.
//!
//! This crate wires the domain types from `pipeline_core` into a running
//! system: four job queues, a notification queue, and two Ractor actors.
//!
//! # Architecture
//!
//! - `TodoQueue` - admission; consults the answer cache and wakes the dispatcher
//! - `RunningQueue` - the single in-flight slot and the execution step
//! - `FifoQueue` - done and dead, and the storage behind every job queue
//! - `NotificationQueue` - user-addressed messages, independent of jobs
//! - `DispatcherActor` - pulls one job at a time from todo through running
//! - `EmitterActor` - delivers every emitted event to the `EventSink` in order
//! - `Pipeline` - owns all of the above; built once at startup
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use actors::{Collaborators, Pipeline, SessionHub, agent};
//! use pipeline_core::{JobResult, PipelineConfig};
//!
//! let hub = Arc::new(SessionHub::new());
//! let executor = Arc::new(agent!(|question| Ok(JobResult::new(question))));
//! let pipeline = Pipeline::start(PipelineConfig::default(), Collaborators::new(executor, hub)).await?;
//!
//! let job = pipeline.push_job("what is 2+2").await?;
//! pipeline.shutdown().await?;
//! ```

mod cache;
mod clock;
mod context;
mod dispatcher;
mod emitter;
mod error;
mod executor;
mod fifo;
mod ids;
mod messages;
mod notification_queue;
mod running_queue;
mod sink;
mod todo_queue;

pub use cache::{AnswerCache, CacheFuture, MemoryAnswerCache, NoCache};
pub use clock::spawn_clock;
pub use context::{Collaborators, Pipeline};
pub use dispatcher::{Dispatcher, DispatcherActor, DispatcherState};
pub use emitter::{Emitter, EmitterActor};
pub use error::PipelineError;
pub use executor::{AgentExecutor, ExecutionFuture, ExecutionResult, FnExecutor, TimeoutExecutor};
pub use fifo::FifoQueue;
pub use ids::{IdGenerator, TwoWordIdGenerator};
pub use messages::{DispatcherMessage, EmitterMessage, Scope};
pub use notification_queue::NotificationQueue;
pub use running_queue::{Dispatch, RUNNING_CAPACITY, RunningQueue};
pub use sink::{EventSink, SessionHub, SinkFuture};
pub use todo_queue::TodoQueue;

/// Re-export ractor types for convenience.
pub use ractor::{Actor, ActorRef, RpcReplyPort};
