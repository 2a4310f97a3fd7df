//! # histolab-model: the histopathology lab process model
//!
//! Builds the lab's process graph on the `histolab-sim` engine: specimen
//! arrivals, reception, cut-up, tissue processing, microtomy, staining,
//! labelling, scanning, QC and reporting, with batched runner deliveries
//! between stages and collation of blocks and slides back into whole
//! specimens. The replication driver runs many seeded replications in
//! parallel and emits one serialisable result document each.

pub mod entities;
mod error;
mod process;
pub mod results;
mod stages;
pub mod world;

mod driver;

pub use driver::{run_job, run_replication};
pub use process::RunnerDurations;
pub use entities::{
    AttrMap, AttrValue, Batch, Block, BlockId, BlockType, Entity, Priority, Slide, SlideId,
    SlideType, Source, Specimen, SpecimenId,
};
pub use error::ModelError;
pub use results::{ReplicationResult, ResourcesDump, Series};
pub use world::{Lab, LabSim, Resources, Wips};
