//! Engine error types.
//!
//! Scheduler invariant violations are unrecoverable within a replication:
//! the scheduler halts and `Sim::run` returns the error with enough context
//! (actor name, resource name, simulated clock) to diagnose the process
//! graph. They never affect sibling replications, which own disjoint state.

use thiserror::Error;

use crate::dist::DistError;

/// Result alias used by actor bodies and the scheduler.
pub type SimResult<T> = Result<T, SimError>;

/// Fatal errors raised by the engine or by process bodies.
#[derive(Debug, Clone, Error)]
pub enum SimError {
    /// An actor released a resource it holds no claim on.
    #[error("release of unclaimed resource `{resource}` by `{actor}` at t={clock}")]
    ReleaseUnclaimed {
        actor: String,
        resource: String,
        clock: f64,
    },

    /// An actor body finished while still holding resource units.
    #[error("actor `{actor}` terminated at t={clock} still holding {units} unit(s) of `{resource}`")]
    TerminatedHoldingClaims {
        actor: String,
        resource: String,
        units: u32,
        clock: f64,
    },

    /// A collation process received a child whose parent has no expected
    /// count attribute recorded.
    #[error(
        "collation stall: no `{attr}` recorded on `{parent}` when `{child}` arrived at t={clock}"
    )]
    CollationStall {
        parent: String,
        child: String,
        attr: String,
        clock: f64,
    },

    /// A worker process pulled an entity of a kind its body cannot handle.
    #[error("process `{process}` received an unexpected entity kind at t={clock}")]
    UnexpectedEntity { process: String, clock: f64 },

    /// A distribution could not be constructed from its parameters.
    #[error(transparent)]
    Distribution(#[from] DistError),
}
