//! # histolab-config: simulation job configuration
//!
//! Serde schema, loading, and validation for the simulator's configuration
//! document. Validation runs before any replication starts and reports the
//! offending field path; a config error is fatal for the whole job.

mod error;
mod loader;
pub mod samples;
mod schema;

pub use error::ConfigError;
pub use schema::{
    ArrivalSchedule, ArrivalSchedules, BatchSizes, Config, DistKind, DistributionInfo, Globals,
    IntDistKind, IntDistributionInfo, ResourceInfo, ResourceKind, ResourceSchedule, ResourcesInfo,
    RunnerTimes, TaskDurations,
};
