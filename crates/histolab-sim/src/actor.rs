//! Actor identity and lifecycle state.

/// Identifies an actor within one replication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorId(pub usize);

/// Observable actor lifecycle states.
///
/// `New → Scheduled → Running → {WaitingHold | WaitingSeize | WaitingStore |
/// Terminated}`; a wait state returns to `Scheduled` when its condition is
/// satisfied. An actor is in at most one wait structure at any time, which
/// the runtime guarantees structurally: each suspension primitive registers
/// exactly one resumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorState {
    New,
    Scheduled,
    Running,
    WaitingHold,
    WaitingSeize,
    WaitingStore,
    Terminated,
}
