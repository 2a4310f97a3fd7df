//! Per-replication result documents.
//!
//! Series carry raw (time, value) pairs closed with a final sample at the
//! horizon; downstream KPI computation handles resampling and statistics.
//! Maps are ordered so that serialization is canonical: the same config and
//! seed produce byte-identical documents.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::AttrMap;
use crate::world::LabSim;

/// A raw (t, x) level series.
pub type Series = Vec<(f64, f64)>;

/// Per-resource series and horizon snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcesDump {
    pub n_claimed: BTreeMap<String, Series>,
    pub n_waiting: BTreeMap<String, Series>,
    pub capacity: BTreeMap<String, Series>,
    pub current_claimers: BTreeMap<String, Vec<String>>,
    pub current_requesters: BTreeMap<String, Vec<String>>,
}

/// The serialisable outcome of one replication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationResult {
    pub resources: ResourcesDump,
    pub wips: BTreeMap<String, Series>,
    pub specimen_data: BTreeMap<String, AttrMap>,
}

pub(crate) fn dump(lab: &LabSim) -> ReplicationResult {
    let sim = &lab.sim;
    let horizon = sim.horizon();
    let resources = sim.with(|l| l.res);

    let mut n_claimed = BTreeMap::new();
    let mut n_waiting = BTreeMap::new();
    let mut capacity = BTreeMap::new();
    let mut current_claimers = BTreeMap::new();
    let mut current_requesters = BTreeMap::new();
    for rid in resources.list() {
        let name = sim.resource_name(rid);
        let series = sim.resource_series(rid);
        n_claimed.insert(name.clone(), series.n_claimed);
        n_waiting.insert(name.clone(), series.n_waiting);
        capacity.insert(name.clone(), series.capacity);
        current_claimers.insert(name.clone(), sim.resource_claimers(rid));
        current_requesters.insert(name, sim.resource_requesters(rid));
    }

    let wips = sim.with(|l| {
        l.wips
            .list()
            .iter()
            .map(|m| (m.name().to_owned(), m.finalized(horizon)))
            .collect::<BTreeMap<_, _>>()
    });
    let specimen_data = sim.with(|l| l.specimen_data.clone());

    ReplicationResult {
        resources: ResourcesDump {
            n_claimed,
            n_waiting,
            capacity,
            current_claimers,
            current_requesters,
        },
        wips,
        specimen_data,
    }
}
