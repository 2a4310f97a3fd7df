//! Model error types.

use thiserror::Error;

use histolab_sim::{DistError, SimError};

/// Errors surfaced by world construction or a running replication.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// Scheduler invariant violation or process-body failure; fatal for the
    /// replication it occurred in, never for its siblings.
    #[error(transparent)]
    Sim(#[from] SimError),

    /// A distribution in the validated config could not be constructed.
    #[error(transparent)]
    Dist(#[from] DistError),
}
