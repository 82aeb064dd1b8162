//! Periodic `time_update` broadcast.

use std::time::Duration;

use chrono::Utc;
use pipeline_core::PipelineEvent;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::emitter::Emitter;

/// Broadcast the wall-clock time every `interval` until the task is aborted.
pub fn spawn_clock(emitter: Emitter, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            emitter.broadcast(PipelineEvent::TimeUpdate {
                timestamp: Utc::now(),
            });
        }
    })
}
