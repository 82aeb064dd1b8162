//! Dispatcher actor: the one long-lived worker that moves jobs through the
//! running slot.
//!
//! Its mailbox is the "work available" channel. Each `Drain` runs at most one
//! job and re-arms itself while todo is non-empty, so a stop signal is always
//! seen between two jobs and never in the middle of one.

use std::sync::Arc;
use std::time::Duration;

use pipeline_core::ShutdownError;
use ractor::{Actor, ActorProcessingErr, ActorRef};

use crate::error::PipelineError;
use crate::executor::AgentExecutor;
use crate::fifo::FifoQueue;
use crate::messages::DispatcherMessage;
use crate::running_queue::{Dispatch, RunningQueue};
use crate::todo_queue::TodoQueue;

/// Everything the dispatcher touches.
pub struct DispatcherState {
    pub todo: Arc<TodoQueue>,
    pub running: Arc<RunningQueue>,
    pub done: Arc<FifoQueue>,
    pub dead: Arc<FifoQueue>,
    pub executor: Arc<dyn AgentExecutor>,
}

pub struct DispatcherActor;

impl Actor for DispatcherActor {
    type Msg = DispatcherMessage;
    type State = DispatcherState;
    type Arguments = DispatcherState;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        state: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting dispatcher");
        // Pick up anything admitted before the dispatcher existed.
        myself.send_message(DispatcherMessage::Drain)?;
        Ok(state)
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        _state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        tracing::info!("Dispatcher stopped");
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DispatcherMessage::Drain => {
                let dispatch = state
                    .running
                    .run_next(&state.todo, &state.done, &state.dead, state.executor.as_ref())
                    .await;

                if dispatch == Dispatch::Idle {
                    tracing::debug!("Nothing to dispatch");
                    return Ok(());
                }

                if !state.todo.is_empty() {
                    myself.send_message(DispatcherMessage::Drain)?;
                }
            }
        }

        Ok(())
    }
}

/// Handle to the running dispatcher.
pub struct Dispatcher {
    actor: ActorRef<DispatcherMessage>,
    handle: tokio::task::JoinHandle<()>,
}

impl Dispatcher {
    pub async fn spawn(state: DispatcherState) -> Result<Self, PipelineError> {
        let (actor, handle) = Actor::spawn(None, DispatcherActor, state)
            .await
            .map_err(|source| PipelineError::Spawn {
                actor: "dispatcher",
                source,
            })?;
        Ok(Self { actor, handle })
    }

    pub fn actor(&self) -> ActorRef<DispatcherMessage> {
        self.actor.clone()
    }

    /// Stop picking up new work and wait for the actor to exit.
    ///
    /// A job already running is allowed to finish; if that takes longer than
    /// `timeout` the dispatcher is left to finish in the background. A
    /// dispatcher that had already exited is reported as
    /// [`ShutdownError::Exited`].
    pub async fn stop(self, timeout: Duration) -> Result<(), ShutdownError> {
        if self.handle.is_finished() {
            tracing::error!("Dispatcher exited before shutdown");
            return Err(ShutdownError::Exited);
        }
        tracing::info!("Stopping dispatcher");
        self.actor.stop(Some("shutdown".to_string()));

        match tokio::time::timeout(timeout, self.handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                tracing::error!("Dispatcher task failed: {}", e);
                Err(ShutdownError::Join(e.to_string()))
            }
            Err(_) => {
                tracing::error!("Dispatcher did not stop within {:?}", timeout);
                Err(ShutdownError::Timeout { waited: timeout })
            }
        }
    }
}
