//! Replication driver.
//!
//! Replications are independent: each owns a private scheduler, calendar,
//! resources, stores, monitors and random stream, so the job fans them out
//! across CPU cores. A replication that aborts on a scheduler invariant
//! violation reports its error without affecting its siblings.

use histolab_config::Config;
use histolab_sim::RandomSource;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::ModelError;
use crate::results::ReplicationResult;
use crate::world::LabSim;

/// Runs one replication from its derived source and dumps the result.
pub fn run_replication(
    config: &Config,
    source: &RandomSource,
) -> Result<ReplicationResult, ModelError> {
    let lab = LabSim::build(config, source)?;
    lab.run()?;
    Ok(lab.dump())
}

/// Runs the whole job in parallel; one result (or error) per replication.
pub fn run_job(config: &Config, seed: u64) -> Vec<Result<ReplicationResult, ModelError>> {
    let root = RandomSource::new(seed);
    (0..config.num_reps)
        .into_par_iter()
        .map(|rep| {
            let source = root.replication(u64::from(rep));
            debug!(rep, "replication dispatched");
            let outcome = run_replication(config, &source);
            if let Err(err) = &outcome {
                warn!(rep, %err, "replication failed");
            }
            outcome
        })
        .collect()
}
