//! Message types for actor communication.

use pipeline_core::PipelineEvent;
use ractor::RpcReplyPort;

/// Who an emission is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every connected subscriber.
    Broadcast,
    /// One session or user.
    Session(String),
}

/// Messages for the EmitterActor.
#[derive(Debug)]
pub enum EmitterMessage {
    /// Deliver one event to the sink.
    Deliver { scope: Scope, event: PipelineEvent },

    /// Reply once every earlier `Deliver` has been handed to the sink.
    Flush { reply: RpcReplyPort<()> },
}

/// Messages for the DispatcherActor.
#[derive(Debug)]
pub enum DispatcherMessage {
    /// Work may be available in the todo queue.
    Drain,
}
