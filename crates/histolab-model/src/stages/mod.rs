//! The lab's stages, wired in process order.

pub(crate) mod cutup;
pub(crate) mod labelling;
pub(crate) mod microtomy;
pub(crate) mod processing;
pub(crate) mod qc;
pub(crate) mod reception;
pub(crate) mod reporting;
pub(crate) mod scanning;
pub(crate) mod staining;

use histolab_sim::Sim;

use crate::world::Lab;

/// Registers every stage's workers, batchers, collators and deliveries.
pub(crate) fn register_all(sim: &Sim<Lab>) {
    reception::register(sim);
    cutup::register(sim);
    processing::register(sim);
    microtomy::register(sim);
    staining::register(sim);
    labelling::register(sim);
    scanning::register(sim);
    qc::register(sim);
    reporting::register(sim);
}
