//! Errors raised while assembling the pipeline.

use thiserror::Error;

/// Error type for pipeline startup.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to spawn {actor} actor: {source}")]
    Spawn {
        actor: &'static str,
        #[source]
        source: ractor::SpawnErr,
    },
}
