//! Per-replication world state and construction.
//!
//! `Lab` is the model state plugged into the engine: entity arenas, the
//! resource handles, sampled parameters, WIP monitors, and the process
//! registry mapping process names to their in-stores. `LabSim::build` wires
//! the whole process graph the way the lab runs: arrival generators,
//! capacity schedulers, and the nine stages.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use histolab_config::{
    Config, DistKind, DistributionInfo, IntDistKind, IntDistributionInfo, ResourcesInfo,
};
use histolab_sim::{
    CapacitySchedule, Dist, DistError, IntDist, Model, Monitor, RandomSource, ResourceId, Sim,
    SimBuilder, StoreId, capacity_scheduler, seconds,
};
use tracing::debug;

use crate::entities::{
    AttrMap, AttrValue, Block, BlockId, BlockType, Entity, Priority, Slide, SlideId, SlideType,
    Source, Specimen, SpecimenId,
};
use crate::error::ModelError;
use crate::process::RunnerDurations;
use crate::results::ReplicationResult;
use crate::stages;

/// Every process in the graph, in registration order. Each owns one
/// in-store named `<process>.in_queue`.
pub(crate) const PROCESS_NAMES: &[&str] = &[
    // Reception
    "arrive_reception",
    "booking_in",
    "batcher.reception_to_cutup",
    "reception_to_cutup",
    // Cut-up
    "cutup_start",
    "cutup_bms",
    "cutup_pool",
    "cutup_large",
    "batcher.cutup_bms_to_processing",
    "cutup_bms_to_processing",
    "batcher.cutup_pool_to_processing",
    "cutup_pool_to_processing",
    "batcher.cutup_large_to_processing",
    "cutup_large_to_processing",
    // Processing
    "processing_start",
    "batcher.decalc_bone_station",
    "decalc_bone_station",
    "decalc_oven",
    "processing_assign_queue",
    "batcher.processing_urgents",
    "processing_urgents",
    "batcher.processing_smalls",
    "processing_smalls",
    "batcher.processing_larges",
    "processing_larges",
    "batcher.processing_megas",
    "processing_megas",
    "embed_and_trim",
    "collate.processing",
    "post_processing",
    "batcher.processing_to_microtomy",
    "processing_to_microtomy",
    // Microtomy
    "microtomy",
    "batcher.microtomy_to_staining",
    "microtomy_to_staining",
    // Staining
    "staining_start",
    "batcher.staining_regular",
    "staining_regular",
    "batcher.staining_megas",
    "staining_megas",
    "collate.staining.slides",
    "collate.staining.blocks",
    "post_staining",
    "batcher.staining_to_labelling",
    "staining_to_labelling",
    // Labelling
    "labelling",
    "batcher.labelling_to_scanning",
    "labelling_to_scanning",
    // Scanning
    "scanning_start",
    "batcher.scanning_regular",
    "scanning_regular",
    "batcher.scanning_megas",
    "scanning_megas",
    "collate.scanning.slides",
    "collate.scanning.blocks",
    "post_scanning",
    "batcher.scanning_to_qc",
    "scanning_to_qc",
    // QC and reporting
    "qc",
    "assign_histopath",
    "report",
];

/// Handles for the lab's fifteen resources, in workbook order.
#[derive(Debug, Clone, Copy)]
pub struct Resources {
    pub booking_in_staff: ResourceId,
    pub bms: ResourceId,
    pub cut_up_assistant: ResourceId,
    pub processing_room_staff: ResourceId,
    pub microtomy_staff: ResourceId,
    pub staining_staff: ResourceId,
    pub scanning_staff: ResourceId,
    pub qc_staff: ResourceId,
    pub histopathologist: ResourceId,
    pub bone_station: ResourceId,
    pub processing_machine: ResourceId,
    pub staining_machine: ResourceId,
    pub coverslip_machine: ResourceId,
    pub scanning_machine_regular: ResourceId,
    pub scanning_machine_megas: ResourceId,
}

impl Resources {
    fn register(b: &mut SimBuilder, info: &ResourcesInfo) -> Self {
        Self {
            booking_in_staff: b.resource(&info.booking_in_staff.name),
            bms: b.resource(&info.bms.name),
            cut_up_assistant: b.resource(&info.cut_up_assistant.name),
            processing_room_staff: b.resource(&info.processing_room_staff.name),
            microtomy_staff: b.resource(&info.microtomy_staff.name),
            staining_staff: b.resource(&info.staining_staff.name),
            scanning_staff: b.resource(&info.scanning_staff.name),
            qc_staff: b.resource(&info.qc_staff.name),
            histopathologist: b.resource(&info.histopathologist.name),
            bone_station: b.resource(&info.bone_station.name),
            processing_machine: b.resource(&info.processing_machine.name),
            staining_machine: b.resource(&info.staining_machine.name),
            coverslip_machine: b.resource(&info.coverslip_machine.name),
            scanning_machine_regular: b.resource(&info.scanning_machine_regular.name),
            scanning_machine_megas: b.resource(&info.scanning_machine_megas.name),
        }
    }

    /// All resources, in workbook order.
    pub fn list(&self) -> [ResourceId; 15] {
        [
            self.booking_in_staff,
            self.bms,
            self.cut_up_assistant,
            self.processing_room_staff,
            self.microtomy_staff,
            self.staining_staff,
            self.scanning_staff,
            self.qc_staff,
            self.histopathologist,
            self.bone_station,
            self.processing_machine,
            self.staining_machine,
            self.coverslip_machine,
            self.scanning_machine_regular,
            self.scanning_machine_megas,
        ]
    }
}

/// Sampled task durations, in hours.
#[derive(Debug)]
pub struct TaskDurations {
    pub receive_and_sort: Dist,
    pub pre_booking_in_investigation: Dist,
    pub booking_in_internal: Dist,
    pub booking_in_external: Dist,
    pub booking_in_investigation_internal_easy: Dist,
    pub booking_in_investigation_internal_hard: Dist,
    pub booking_in_investigation_external: Dist,
    pub cut_up_bms: Dist,
    pub cut_up_pool: Dist,
    pub cut_up_large_specimens: Dist,
    pub load_bone_station: Dist,
    pub decalc: Dist,
    pub unload_bone_station: Dist,
    pub load_into_decalc_oven: Dist,
    pub unload_from_decalc_oven: Dist,
    pub load_processing_machine: Dist,
    pub unload_processing_machine: Dist,
    pub processing_urgent: Dist,
    pub processing_small_surgicals: Dist,
    pub processing_large_surgicals: Dist,
    pub processing_megas: Dist,
    pub embedding: Dist,
    pub embedding_cooldown: Dist,
    pub block_trimming: Dist,
    pub microtomy_serials: Dist,
    pub microtomy_levels: Dist,
    pub microtomy_larges: Dist,
    pub microtomy_megas: Dist,
    pub load_staining_machine_regular: Dist,
    pub load_staining_machine_megas: Dist,
    pub staining_regular: Dist,
    pub staining_megas: Dist,
    pub unload_staining_machine_regular: Dist,
    pub unload_staining_machine_megas: Dist,
    pub load_coverslip_machine_regular: Dist,
    pub coverslip_regular: Dist,
    pub coverslip_megas: Dist,
    pub unload_coverslip_machine_regular: Dist,
    pub labelling: Dist,
    pub load_scanning_machine_regular: Dist,
    pub load_scanning_machine_megas: Dist,
    pub scanning_regular: Dist,
    pub scanning_megas: Dist,
    pub unload_scanning_machine_regular: Dist,
    pub unload_scanning_machine_megas: Dist,
    pub block_and_quality_check: Dist,
    pub assign_histopathologist: Dist,
    pub write_report: Dist,
}

/// Builds an hours-scaled sampler from a config entry.
pub(crate) fn to_dist(info: &DistributionInfo) -> Result<Dist, DistError> {
    let f = info.unit_factor();
    match info.kind {
        DistKind::Constant => Ok(Dist::constant(info.mode * f)),
        DistKind::Triangular => Dist::triangular(info.low * f, info.mode * f, info.high * f),
        DistKind::Pert => Dist::pert(info.low * f, info.mode * f, info.high * f),
    }
}

pub(crate) fn to_int_dist(info: &IntDistributionInfo) -> Result<IntDist, DistError> {
    match info.kind {
        IntDistKind::Constant => Ok(IntDist::constant(info.mode)),
        IntDistKind::IntTriangular => IntDist::triangular(info.low, info.mode, info.high),
        IntDistKind::IntPert => IntDist::pert(info.low, info.mode, info.high),
    }
}

impl TaskDurations {
    fn from_config(c: &histolab_config::TaskDurations) -> Result<Self, DistError> {
        Ok(Self {
            receive_and_sort: to_dist(&c.receive_and_sort)?,
            pre_booking_in_investigation: to_dist(&c.pre_booking_in_investigation)?,
            booking_in_internal: to_dist(&c.booking_in_internal)?,
            booking_in_external: to_dist(&c.booking_in_external)?,
            booking_in_investigation_internal_easy: to_dist(
                &c.booking_in_investigation_internal_easy,
            )?,
            booking_in_investigation_internal_hard: to_dist(
                &c.booking_in_investigation_internal_hard,
            )?,
            booking_in_investigation_external: to_dist(&c.booking_in_investigation_external)?,
            cut_up_bms: to_dist(&c.cut_up_bms)?,
            cut_up_pool: to_dist(&c.cut_up_pool)?,
            cut_up_large_specimens: to_dist(&c.cut_up_large_specimens)?,
            load_bone_station: to_dist(&c.load_bone_station)?,
            decalc: to_dist(&c.decalc)?,
            unload_bone_station: to_dist(&c.unload_bone_station)?,
            load_into_decalc_oven: to_dist(&c.load_into_decalc_oven)?,
            unload_from_decalc_oven: to_dist(&c.unload_from_decalc_oven)?,
            load_processing_machine: to_dist(&c.load_processing_machine)?,
            unload_processing_machine: to_dist(&c.unload_processing_machine)?,
            processing_urgent: to_dist(&c.processing_urgent)?,
            processing_small_surgicals: to_dist(&c.processing_small_surgicals)?,
            processing_large_surgicals: to_dist(&c.processing_large_surgicals)?,
            processing_megas: to_dist(&c.processing_megas)?,
            embedding: to_dist(&c.embedding)?,
            embedding_cooldown: to_dist(&c.embedding_cooldown)?,
            block_trimming: to_dist(&c.block_trimming)?,
            microtomy_serials: to_dist(&c.microtomy_serials)?,
            microtomy_levels: to_dist(&c.microtomy_levels)?,
            microtomy_larges: to_dist(&c.microtomy_larges)?,
            microtomy_megas: to_dist(&c.microtomy_megas)?,
            load_staining_machine_regular: to_dist(&c.load_staining_machine_regular)?,
            load_staining_machine_megas: to_dist(&c.load_staining_machine_megas)?,
            staining_regular: to_dist(&c.staining_regular)?,
            staining_megas: to_dist(&c.staining_megas)?,
            unload_staining_machine_regular: to_dist(&c.unload_staining_machine_regular)?,
            unload_staining_machine_megas: to_dist(&c.unload_staining_machine_megas)?,
            load_coverslip_machine_regular: to_dist(&c.load_coverslip_machine_regular)?,
            coverslip_regular: to_dist(&c.coverslip_regular)?,
            coverslip_megas: to_dist(&c.coverslip_megas)?,
            unload_coverslip_machine_regular: to_dist(&c.unload_coverslip_machine_regular)?,
            labelling: to_dist(&c.labelling)?,
            load_scanning_machine_regular: to_dist(&c.load_scanning_machine_regular)?,
            load_scanning_machine_megas: to_dist(&c.load_scanning_machine_megas)?,
            scanning_regular: to_dist(&c.scanning_regular)?,
            scanning_megas: to_dist(&c.scanning_megas)?,
            unload_scanning_machine_regular: to_dist(&c.unload_scanning_machine_regular)?,
            unload_scanning_machine_megas: to_dist(&c.unload_scanning_machine_megas)?,
            block_and_quality_check: to_dist(&c.block_and_quality_check)?,
            assign_histopathologist: to_dist(&c.assign_histopathologist)?,
            write_report: to_dist(&c.write_report)?,
        })
    }
}

/// Branching probabilities and count distributions.
#[derive(Debug)]
pub struct Globals {
    pub prob_internal: f64,
    pub prob_urgent_cancer: f64,
    pub prob_urgent_non_cancer: f64,
    pub prob_priority_cancer: f64,
    pub prob_priority_non_cancer: f64,
    pub prob_prebook: f64,
    pub prob_invest_easy: f64,
    pub prob_invest_hard: f64,
    pub prob_invest_external: f64,
    pub prob_bms_cutup: f64,
    pub prob_bms_cutup_urgent: f64,
    pub prob_large_cutup: f64,
    pub prob_large_cutup_urgent: f64,
    pub prob_pool_cutup: f64,
    pub prob_pool_cutup_urgent: f64,
    pub prob_mega_blocks: f64,
    pub prob_decalc_bone: f64,
    pub prob_decalc_oven: f64,
    pub prob_microtomy_levels: f64,
    pub num_blocks_large_surgical: IntDist,
    pub num_blocks_mega: IntDist,
    pub num_slides_larges: IntDist,
    pub num_slides_levels: IntDist,
    pub num_slides_megas: IntDist,
    pub num_slides_serials: IntDist,
}

impl Globals {
    fn from_config(c: &histolab_config::Globals) -> Result<Self, DistError> {
        Ok(Self {
            prob_internal: c.prob_internal,
            prob_urgent_cancer: c.prob_urgent_cancer,
            prob_urgent_non_cancer: c.prob_urgent_non_cancer,
            prob_priority_cancer: c.prob_priority_cancer,
            prob_priority_non_cancer: c.prob_priority_non_cancer,
            prob_prebook: c.prob_prebook,
            prob_invest_easy: c.prob_invest_easy,
            prob_invest_hard: c.prob_invest_hard,
            prob_invest_external: c.prob_invest_external,
            prob_bms_cutup: c.prob_bms_cutup,
            prob_bms_cutup_urgent: c.prob_bms_cutup_urgent,
            prob_large_cutup: c.prob_large_cutup,
            prob_large_cutup_urgent: c.prob_large_cutup_urgent,
            prob_pool_cutup: c.prob_pool_cutup,
            prob_pool_cutup_urgent: c.prob_pool_cutup_urgent,
            prob_mega_blocks: c.prob_mega_blocks,
            prob_decalc_bone: c.prob_decalc_bone,
            prob_decalc_oven: c.prob_decalc_oven,
            prob_microtomy_levels: c.prob_microtomy_levels,
            num_blocks_large_surgical: to_int_dist(&c.num_blocks_large_surgical)?,
            num_blocks_mega: to_int_dist(&c.num_blocks_mega)?,
            num_slides_larges: to_int_dist(&c.num_slides_larges)?,
            num_slides_levels: to_int_dist(&c.num_slides_levels)?,
            num_slides_megas: to_int_dist(&c.num_slides_megas)?,
            num_slides_serials: to_int_dist(&c.num_slides_serials)?,
        })
    }
}

/// Runner travel and handling times, in hours.
#[derive(Debug)]
pub struct RunnerTimes {
    pub reception_cutup: f64,
    pub cutup_processing: f64,
    pub processing_microtomy: f64,
    pub microtomy_staining: f64,
    pub staining_labelling: f64,
    pub labelling_scanning: f64,
    pub scanning_qc: f64,
    pub extra_loading: f64,
    pub extra_unloading: f64,
}

impl RunnerTimes {
    fn from_config(c: &histolab_config::RunnerTimes) -> Self {
        let pair = |v: f64| seconds(v / c.speed);
        Self {
            reception_cutup: pair(c.reception_cutup),
            cutup_processing: pair(c.cutup_processing),
            processing_microtomy: pair(c.processing_microtomy),
            microtomy_staining: pair(c.microtomy_staining),
            staining_labelling: pair(c.staining_labelling),
            labelling_scanning: pair(c.labelling_scanning),
            scanning_qc: pair(c.scanning_qc),
            extra_loading: seconds(c.extra_loading),
            extra_unloading: seconds(c.extra_unloading),
        }
    }

    /// Outbound and return legs share the stage-pair time.
    pub fn durations_for(&self, stage_pair: f64) -> RunnerDurations {
        RunnerDurations {
            collect: self.extra_loading,
            outbound: stage_pair,
            unload: self.extra_unloading,
            ret: stage_pair,
        }
    }
}

/// Work-in-progress counters.
#[derive(Debug)]
pub struct Wips {
    pub total: Monitor,
    pub in_reception: Monitor,
    pub in_cut_up: Monitor,
    pub in_processing: Monitor,
    pub in_microtomy: Monitor,
    pub in_staining: Monitor,
    pub in_labelling: Monitor,
    pub in_scanning: Monitor,
    pub in_qc: Monitor,
    pub in_reporting: Monitor,
}

impl Wips {
    fn new() -> Self {
        Self {
            total: Monitor::new("Total WIP", 0.0),
            in_reception: Monitor::new("Reception", 0.0),
            in_cut_up: Monitor::new("Cut-up", 0.0),
            in_processing: Monitor::new("Processing", 0.0),
            in_microtomy: Monitor::new("Microtomy", 0.0),
            in_staining: Monitor::new("Staining", 0.0),
            in_labelling: Monitor::new("Labelling", 0.0),
            in_scanning: Monitor::new("Scanning", 0.0),
            in_qc: Monitor::new("QC", 0.0),
            in_reporting: Monitor::new("Reporting", 0.0),
        }
    }

    /// All monitors, in reporting order.
    pub fn list(&self) -> [&Monitor; 10] {
        [
            &self.total,
            &self.in_reception,
            &self.in_cut_up,
            &self.in_processing,
            &self.in_microtomy,
            &self.in_staining,
            &self.in_labelling,
            &self.in_scanning,
            &self.in_qc,
            &self.in_reporting,
        ]
    }
}

/// The model state for one replication.
pub struct Lab {
    pub specimens: Vec<Specimen>,
    pub blocks: Vec<Block>,
    pub slides: Vec<Slide>,
    /// Attributes of every specimen ever created, keyed by specimen name.
    pub specimen_data: BTreeMap<String, AttrMap>,
    pub res: Resources,
    pub wips: Wips,
    pub durations: Rc<TaskDurations>,
    pub globals: Rc<Globals>,
    pub batch_sizes: Rc<histolab_config::BatchSizes>,
    pub runner: Rc<RunnerTimes>,
    processes: HashMap<&'static str, StoreId>,
    next_specimen: u32,
    next_batch: u32,
}

impl Model for Lab {
    type Item = Entity;
}

impl Lab {
    /// The in-store of a named process. All process names are registered at
    /// build time; an unknown name is a wiring bug.
    pub fn store(&self, process: &str) -> StoreId {
        self.processes[process]
    }

    pub fn new_specimen(&mut self, prio: Priority, source: Source, cancer: bool) -> SpecimenId {
        self.next_specimen += 1;
        let name = format!("specimen.{}", self.next_specimen);
        let mut attrs = AttrMap::new();
        attrs.insert("source".into(), AttrValue::Text(source.as_str().into()));
        self.specimen_data.insert(name.clone(), attrs);
        self.specimens.push(Specimen {
            name,
            prio,
            source,
            cancer,
            blocks: Vec::new(),
        });
        SpecimenId(self.specimens.len() - 1)
    }

    pub fn new_block(&mut self, specimen: SpecimenId, block_type: BlockType) -> BlockId {
        let id = BlockId(self.blocks.len());
        let parent = &mut self.specimens[specimen.0];
        let name = format!("{}.{}", parent.name, parent.blocks.len() + 1);
        parent.blocks.push(id);
        self.blocks.push(Block {
            name,
            specimen,
            block_type,
            slides: Vec::new(),
            num_slides: None,
        });
        id
    }

    pub fn new_slide(&mut self, block: BlockId, slide_type: SlideType) -> SlideId {
        let id = SlideId(self.slides.len());
        let parent = &mut self.blocks[block.0];
        let name = format!("{}.{}", parent.name, parent.slides.len() + 1);
        parent.slides.push(id);
        self.slides.push(Slide {
            name,
            block,
            slide_type,
        });
        id
    }

    pub fn next_batch_name(&mut self) -> String {
        self.next_batch += 1;
        format!("batch.{}", self.next_batch)
    }

    /// Records a stage timestamp on a specimen.
    pub fn timestamp(&mut self, specimen: SpecimenId, key: &str, t: f64) {
        let name = &self.specimens[specimen.0].name;
        if let Some(attrs) = self.specimen_data.get_mut(name) {
            attrs.insert(key.to_owned(), AttrValue::Float(t));
        }
    }

    /// Records a non-timestamp attribute on a specimen.
    pub fn set_attr(&mut self, specimen: SpecimenId, key: &str, value: AttrValue) {
        let name = &self.specimens[specimen.0].name;
        if let Some(attrs) = self.specimen_data.get_mut(name) {
            attrs.insert(key.to_owned(), value);
        }
    }

    pub fn block_prio(&self, block: BlockId) -> Priority {
        self.specimens[self.blocks[block.0].specimen.0].prio
    }

    pub fn slide_prio(&self, slide: SlideId) -> Priority {
        self.block_prio(self.slides[slide.0].block)
    }

    /// An entity's priority; batches travel at ROUTINE.
    pub fn entity_prio(&self, entity: &Entity) -> Priority {
        match entity {
            Entity::Specimen(id) => self.specimens[id.0].prio,
            Entity::Block(id) => self.block_prio(*id),
            Entity::Slide(id) => self.slide_prio(*id),
            Entity::Batch(_) => Priority::Routine,
        }
    }

}

/// One replication's fully wired simulation.
pub struct LabSim {
    pub sim: Sim<Lab>,
    horizon: f64,
}

impl LabSim {
    /// Builds the world from a validated config and a replication source.
    pub fn build(config: &Config, source: &RandomSource) -> Result<Self, ModelError> {
        let mut b = SimBuilder::new();
        let res = Resources::register(&mut b, &config.resources);
        let mut processes = HashMap::new();
        for &name in PROCESS_NAMES {
            processes.insert(name, b.store(&format!("{name}.in_queue")));
        }

        let lab = Lab {
            specimens: Vec::new(),
            blocks: Vec::new(),
            slides: Vec::new(),
            specimen_data: BTreeMap::new(),
            res,
            wips: Wips::new(),
            durations: Rc::new(TaskDurations::from_config(&config.task_durations)?),
            globals: Rc::new(Globals::from_config(&config.global_vars)?),
            batch_sizes: Rc::new(config.batch_sizes.clone()),
            runner: Rc::new(RunnerTimes::from_config(&config.runner_times)),
            processes,
            next_specimen: 0,
            next_batch: 0,
        };
        let sim = b.finish(lab, source);

        crate::process::spawn_arrival_generator(
            &sim,
            "arrivals.cancer",
            config.arrivals.cancer.rates.clone(),
            true,
        );
        crate::process::spawn_arrival_generator(
            &sim,
            "arrivals.noncancer",
            config.arrivals.noncancer.rates.clone(),
            false,
        );

        for (rid, (_, info)) in res.list().into_iter().zip(config.resources.iter()) {
            let mut day_flags = [false; 7];
            for (flag, value) in day_flags.iter_mut().zip(&info.schedule.day_flags) {
                *flag = *value;
            }
            let schedule = CapacitySchedule {
                day_flags,
                allocation: info.schedule.allocation.clone(),
            };
            sim.spawn(format!("scheduler [{}]", info.name), 0, move |ctx| {
                capacity_scheduler(ctx, rid, schedule)
            });
        }

        stages::register_all(&sim);
        debug!(horizon = config.sim_hours, "lab world built");
        Ok(Self {
            sim,
            horizon: config.sim_hours,
        })
    }

    /// Runs the replication to its horizon.
    pub fn run(&self) -> Result<(), ModelError> {
        self.sim.run(self.horizon)?;
        Ok(())
    }

    /// Creates a specimen with fixed attributes at the current time and
    /// starts it through reception. Used to seed deterministic scenarios.
    pub fn inject_specimen(&self, prio: Priority, source: Source, cancer: bool) -> String {
        let id = self.sim.with(|lab| lab.new_specimen(prio, source, cancer));
        let name = self.sim.with(|lab| lab.specimens[id.0].name.clone());
        self.sim.spawn(name.clone(), prio.level(), move |ctx| async move {
            let store = ctx.with(|lab| lab.store("arrive_reception"));
            ctx.push(store, Entity::Specimen(id));
            Ok(())
        });
        name
    }

    /// Serialises the replication's state into the result document.
    pub fn dump(&self) -> ReplicationResult {
        crate::results::dump(self)
    }
}
