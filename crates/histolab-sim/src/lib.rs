//! # histolab-sim: deterministic discrete-event simulation engine
//!
//! A time-ordered, priority-aware, cooperative process scheduler with
//! resource seize/release semantics, priority-ordered stores, scheduled
//! resource capacity, level monitors, and a seeded random source. One `Sim`
//! owns everything a replication touches; replications are embarrassingly
//! parallel because they share nothing.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        Sim (one replication)                  │
//! │  ┌──────────┐  ┌────────────┐  ┌──────────────────────────┐   │
//! │  │ Clock    │  │ Calendar   │  │ RandomSource / streams   │   │
//! │  │ (hours)  │  │ (t, p, n)  │  │ (seeded, deterministic)  │   │
//! │  └──────────┘  └────────────┘  └──────────────────────────┘   │
//! │  ┌─────────────────────────────────────────────────────────┐  │
//! │  │ Actors: async bodies suspending at hold / seize / pull  │  │
//! │  └─────────────────────────────────────────────────────────┘  │
//! │  ┌────────────────────┐  ┌─────────────┐  ┌───────────────┐   │
//! │  │ Resources (+mons)  │  │ Stores      │  │ Monitors      │   │
//! │  └────────────────────┘  └─────────────┘  └───────────────┘   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Actor bodies are plain `async fn`s over a [`Ctx`] handle:
//!
//! ```ignore
//! sim.spawn("worker", 0, |ctx| async move {
//!     let item = ctx.pull(in_store).await;
//!     ctx.seize_one(staff, 1, 0).await?;
//!     ctx.hold(&duration).await;
//!     ctx.release_all()?;
//!     ctx.push(out_store, item);
//!     Ok(())
//! });
//! ```

pub mod actor;
pub mod calendar;
pub mod clock;
pub mod dist;
pub mod error;
pub mod monitor;
pub mod random;
pub mod resource;
pub mod schedule;
pub mod sim;
pub mod store;

pub use actor::{ActorId, ActorState};
pub use clock::{Clock, DAY, MINUTE, SECOND, minutes, seconds};
pub use dist::{Dist, DistError, IntDist};
pub use error::{SimError, SimResult};
pub use monitor::Monitor;
pub use random::RandomSource;
pub use resource::ResourceId;
pub use schedule::{ALLOCATION_INTERVAL_HOURS, CapacitySchedule, capacity_scheduler};
pub use sim::{Ctx, HoldDuration, Model, ResourceSeries, SeizeReq, Sim, SimBuilder};
pub use store::StoreId;
