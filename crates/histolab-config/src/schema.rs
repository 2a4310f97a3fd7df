//! Configuration document schema.
//!
//! The document mirrors the lab's planning workbook: weekly arrival-rate
//! vectors, per-resource weekly capacity schedules, three-point task
//! duration distributions, batch sizes, runner times, and the global
//! branching probabilities and count distributions. Everything is plain
//! serde data; `Config::validate` checks the cross-field rules and reports
//! the offending field path.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_speed() -> f64 {
    1.0
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub arrivals: ArrivalSchedules,
    pub batch_sizes: BatchSizes,
    pub global_vars: Globals,
    pub resources: ResourcesInfo,
    pub runner_times: RunnerTimes,
    pub task_durations: TaskDurations,
    /// Simulation length in hours.
    pub sim_hours: f64,
    /// Number of replications.
    pub num_reps: u32,
}

/// Hourly arrival rates for one week (168 values, Mon 00:00 .. Sun 23:00).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrivalSchedule {
    pub rates: Vec<f64>,
}

/// Cancer and non-cancer pathway arrival schedules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrivalSchedules {
    pub cancer: ArrivalSchedule,
    pub noncancer: ArrivalSchedule,
}

/// A resource allocation schedule: one flag per day (Mon..Sun) and 48
/// half-hour allocation slots applied on flagged days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSchedule {
    pub day_flags: Vec<bool>,
    pub allocation: Vec<u32>,
}

/// Staff or machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Staff,
    Machine,
}

/// One named resource and its weekly schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceInfo {
    /// Display name, e.g. "Booking-in staff".
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub schedule: ResourceSchedule,
}

/// The lab's resources. Field order matches the planning workbook rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcesInfo {
    pub booking_in_staff: ResourceInfo,
    pub bms: ResourceInfo,
    pub cut_up_assistant: ResourceInfo,
    pub processing_room_staff: ResourceInfo,
    pub microtomy_staff: ResourceInfo,
    pub staining_staff: ResourceInfo,
    pub scanning_staff: ResourceInfo,
    pub qc_staff: ResourceInfo,
    pub histopathologist: ResourceInfo,
    pub bone_station: ResourceInfo,
    pub processing_machine: ResourceInfo,
    pub staining_machine: ResourceInfo,
    pub coverslip_machine: ResourceInfo,
    pub scanning_machine_regular: ResourceInfo,
    pub scanning_machine_megas: ResourceInfo,
}

impl ResourcesInfo {
    /// Field-name/value pairs, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ResourceInfo)> {
        [
            ("booking_in_staff", &self.booking_in_staff),
            ("bms", &self.bms),
            ("cut_up_assistant", &self.cut_up_assistant),
            ("processing_room_staff", &self.processing_room_staff),
            ("microtomy_staff", &self.microtomy_staff),
            ("staining_staff", &self.staining_staff),
            ("scanning_staff", &self.scanning_staff),
            ("qc_staff", &self.qc_staff),
            ("histopathologist", &self.histopathologist),
            ("bone_station", &self.bone_station),
            ("processing_machine", &self.processing_machine),
            ("staining_machine", &self.staining_machine),
            ("coverslip_machine", &self.coverslip_machine),
            ("scanning_machine_regular", &self.scanning_machine_regular),
            ("scanning_machine_megas", &self.scanning_machine_megas),
        ]
        .into_iter()
    }
}

/// Continuous three-point distribution families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistKind {
    Constant,
    Triangular,
    #[serde(rename = "PERT")]
    Pert,
}

/// A task duration: distribution family, three-point parameters, and a
/// time unit whose first character must be s, m, or h (any longer spelling
/// is accepted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionInfo {
    #[serde(rename = "type")]
    pub kind: DistKind,
    pub low: f64,
    pub mode: f64,
    pub high: f64,
    pub time_unit: String,
}

impl DistributionInfo {
    /// Hours per unit, valid after validation.
    pub fn unit_factor(&self) -> f64 {
        match self.time_unit.chars().next() {
            Some('s') => 1.0 / 3600.0,
            Some('m') => 1.0 / 60.0,
            _ => 1.0,
        }
    }
}

/// Discrete three-point distribution families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntDistKind {
    Constant,
    IntTriangular,
    #[serde(rename = "IntPERT")]
    IntPert,
}

/// A discretised three-point distribution for entity counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntDistributionInfo {
    #[serde(rename = "type")]
    pub kind: IntDistKind,
    pub low: u32,
    pub mode: u32,
    pub high: u32,
}

/// Task durations, keyed by task name. Field order follows the lab's
/// process order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDurations {
    pub receive_and_sort: DistributionInfo,
    pub pre_booking_in_investigation: DistributionInfo,
    pub booking_in_internal: DistributionInfo,
    pub booking_in_external: DistributionInfo,
    pub booking_in_investigation_internal_easy: DistributionInfo,
    pub booking_in_investigation_internal_hard: DistributionInfo,
    pub booking_in_investigation_external: DistributionInfo,
    pub cut_up_bms: DistributionInfo,
    pub cut_up_pool: DistributionInfo,
    pub cut_up_large_specimens: DistributionInfo,
    pub load_bone_station: DistributionInfo,
    pub decalc: DistributionInfo,
    pub unload_bone_station: DistributionInfo,
    pub load_into_decalc_oven: DistributionInfo,
    pub unload_from_decalc_oven: DistributionInfo,
    pub load_processing_machine: DistributionInfo,
    pub unload_processing_machine: DistributionInfo,
    pub processing_urgent: DistributionInfo,
    pub processing_small_surgicals: DistributionInfo,
    pub processing_large_surgicals: DistributionInfo,
    pub processing_megas: DistributionInfo,
    pub embedding: DistributionInfo,
    pub embedding_cooldown: DistributionInfo,
    pub block_trimming: DistributionInfo,
    pub microtomy_serials: DistributionInfo,
    pub microtomy_levels: DistributionInfo,
    pub microtomy_larges: DistributionInfo,
    pub microtomy_megas: DistributionInfo,
    pub load_staining_machine_regular: DistributionInfo,
    pub load_staining_machine_megas: DistributionInfo,
    pub staining_regular: DistributionInfo,
    pub staining_megas: DistributionInfo,
    pub unload_staining_machine_regular: DistributionInfo,
    pub unload_staining_machine_megas: DistributionInfo,
    pub load_coverslip_machine_regular: DistributionInfo,
    pub coverslip_regular: DistributionInfo,
    pub coverslip_megas: DistributionInfo,
    pub unload_coverslip_machine_regular: DistributionInfo,
    pub labelling: DistributionInfo,
    pub load_scanning_machine_regular: DistributionInfo,
    pub load_scanning_machine_megas: DistributionInfo,
    pub scanning_regular: DistributionInfo,
    pub scanning_megas: DistributionInfo,
    pub unload_scanning_machine_regular: DistributionInfo,
    pub unload_scanning_machine_megas: DistributionInfo,
    pub block_and_quality_check: DistributionInfo,
    pub assign_histopathologist: DistributionInfo,
    pub write_report: DistributionInfo,
}

impl TaskDurations {
    /// Field-name/value pairs, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &DistributionInfo)> {
        [
            ("receive_and_sort", &self.receive_and_sort),
            (
                "pre_booking_in_investigation",
                &self.pre_booking_in_investigation,
            ),
            ("booking_in_internal", &self.booking_in_internal),
            ("booking_in_external", &self.booking_in_external),
            (
                "booking_in_investigation_internal_easy",
                &self.booking_in_investigation_internal_easy,
            ),
            (
                "booking_in_investigation_internal_hard",
                &self.booking_in_investigation_internal_hard,
            ),
            (
                "booking_in_investigation_external",
                &self.booking_in_investigation_external,
            ),
            ("cut_up_bms", &self.cut_up_bms),
            ("cut_up_pool", &self.cut_up_pool),
            ("cut_up_large_specimens", &self.cut_up_large_specimens),
            ("load_bone_station", &self.load_bone_station),
            ("decalc", &self.decalc),
            ("unload_bone_station", &self.unload_bone_station),
            ("load_into_decalc_oven", &self.load_into_decalc_oven),
            ("unload_from_decalc_oven", &self.unload_from_decalc_oven),
            ("load_processing_machine", &self.load_processing_machine),
            ("unload_processing_machine", &self.unload_processing_machine),
            ("processing_urgent", &self.processing_urgent),
            (
                "processing_small_surgicals",
                &self.processing_small_surgicals,
            ),
            (
                "processing_large_surgicals",
                &self.processing_large_surgicals,
            ),
            ("processing_megas", &self.processing_megas),
            ("embedding", &self.embedding),
            ("embedding_cooldown", &self.embedding_cooldown),
            ("block_trimming", &self.block_trimming),
            ("microtomy_serials", &self.microtomy_serials),
            ("microtomy_levels", &self.microtomy_levels),
            ("microtomy_larges", &self.microtomy_larges),
            ("microtomy_megas", &self.microtomy_megas),
            (
                "load_staining_machine_regular",
                &self.load_staining_machine_regular,
            ),
            (
                "load_staining_machine_megas",
                &self.load_staining_machine_megas,
            ),
            ("staining_regular", &self.staining_regular),
            ("staining_megas", &self.staining_megas),
            (
                "unload_staining_machine_regular",
                &self.unload_staining_machine_regular,
            ),
            (
                "unload_staining_machine_megas",
                &self.unload_staining_machine_megas,
            ),
            (
                "load_coverslip_machine_regular",
                &self.load_coverslip_machine_regular,
            ),
            ("coverslip_regular", &self.coverslip_regular),
            ("coverslip_megas", &self.coverslip_megas),
            (
                "unload_coverslip_machine_regular",
                &self.unload_coverslip_machine_regular,
            ),
            ("labelling", &self.labelling),
            (
                "load_scanning_machine_regular",
                &self.load_scanning_machine_regular,
            ),
            (
                "load_scanning_machine_megas",
                &self.load_scanning_machine_megas,
            ),
            ("scanning_regular", &self.scanning_regular),
            ("scanning_megas", &self.scanning_megas),
            (
                "unload_scanning_machine_regular",
                &self.unload_scanning_machine_regular,
            ),
            (
                "unload_scanning_machine_megas",
                &self.unload_scanning_machine_megas,
            ),
            ("block_and_quality_check", &self.block_and_quality_check),
            ("assign_histopathologist", &self.assign_histopathologist),
            ("write_report", &self.write_report),
        ]
        .into_iter()
    }
}

/// Batch sizes for delivery and machine tasks. Batches are homogeneous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSizes {
    pub deliver_reception_to_cut_up: u32,
    pub deliver_cut_up_to_processing: u32,
    pub deliver_processing_to_microtomy: u32,
    pub deliver_microtomy_to_staining: u32,
    pub deliver_staining_to_labelling: u32,
    pub deliver_labelling_to_scanning: u32,
    pub deliver_scanning_to_qc: u32,
    pub bone_station: u32,
    pub processing_regular: u32,
    pub processing_megas: u32,
    pub staining_regular: u32,
    pub staining_megas: u32,
    pub digital_scanning_regular: u32,
    pub digital_scanning_megas: u32,
}

impl BatchSizes {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u32)> {
        [
            (
                "deliver_reception_to_cut_up",
                self.deliver_reception_to_cut_up,
            ),
            (
                "deliver_cut_up_to_processing",
                self.deliver_cut_up_to_processing,
            ),
            (
                "deliver_processing_to_microtomy",
                self.deliver_processing_to_microtomy,
            ),
            (
                "deliver_microtomy_to_staining",
                self.deliver_microtomy_to_staining,
            ),
            (
                "deliver_staining_to_labelling",
                self.deliver_staining_to_labelling,
            ),
            (
                "deliver_labelling_to_scanning",
                self.deliver_labelling_to_scanning,
            ),
            ("deliver_scanning_to_qc", self.deliver_scanning_to_qc),
            ("bone_station", self.bone_station),
            ("processing_regular", self.processing_regular),
            ("processing_megas", self.processing_megas),
            ("staining_regular", self.staining_regular),
            ("staining_megas", self.staining_megas),
            ("digital_scanning_regular", self.digital_scanning_regular),
            ("digital_scanning_megas", self.digital_scanning_megas),
        ]
        .into_iter()
    }
}

/// Runner travel times between adjacent stages (seconds), plus the shared
/// loading/unloading overheads and a speed divisor applied to the
/// stage-pair values (1.0 means the values are already times).
#[derive(Debug, Clone, Serialize, Deserialize)]
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
    #[serde(default = "default_speed")]
    pub speed: f64,
}

impl RunnerTimes {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [
            ("reception_cutup", self.reception_cutup),
            ("cutup_processing", self.cutup_processing),
            ("processing_microtomy", self.processing_microtomy),
            ("microtomy_staining", self.microtomy_staining),
            ("staining_labelling", self.staining_labelling),
            ("labelling_scanning", self.labelling_scanning),
            ("scanning_qc", self.scanning_qc),
            ("extra_loading", self.extra_loading),
            ("extra_unloading", self.extra_unloading),
        ]
        .into_iter()
    }
}

/// Global branching probabilities and count distributions.
#[derive(Debug, Clone, Serialize, Deserialize)]
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
    pub num_blocks_large_surgical: IntDistributionInfo,
    pub num_blocks_mega: IntDistributionInfo,
    pub num_slides_larges: IntDistributionInfo,
    pub num_slides_levels: IntDistributionInfo,
    pub num_slides_megas: IntDistributionInfo,
    pub num_slides_serials: IntDistributionInfo,
}

impl Globals {
    pub fn probabilities(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [
            ("prob_internal", self.prob_internal),
            ("prob_urgent_cancer", self.prob_urgent_cancer),
            ("prob_urgent_non_cancer", self.prob_urgent_non_cancer),
            ("prob_priority_cancer", self.prob_priority_cancer),
            ("prob_priority_non_cancer", self.prob_priority_non_cancer),
            ("prob_prebook", self.prob_prebook),
            ("prob_invest_easy", self.prob_invest_easy),
            ("prob_invest_hard", self.prob_invest_hard),
            ("prob_invest_external", self.prob_invest_external),
            ("prob_bms_cutup", self.prob_bms_cutup),
            ("prob_bms_cutup_urgent", self.prob_bms_cutup_urgent),
            ("prob_large_cutup", self.prob_large_cutup),
            ("prob_large_cutup_urgent", self.prob_large_cutup_urgent),
            ("prob_pool_cutup", self.prob_pool_cutup),
            ("prob_pool_cutup_urgent", self.prob_pool_cutup_urgent),
            ("prob_mega_blocks", self.prob_mega_blocks),
            ("prob_decalc_bone", self.prob_decalc_bone),
            ("prob_decalc_oven", self.prob_decalc_oven),
            ("prob_microtomy_levels", self.prob_microtomy_levels),
        ]
        .into_iter()
    }

    pub fn count_dists(&self) -> impl Iterator<Item = (&'static str, &IntDistributionInfo)> {
        [
            (
                "num_blocks_large_surgical",
                &self.num_blocks_large_surgical,
            ),
            ("num_blocks_mega", &self.num_blocks_mega),
            ("num_slides_larges", &self.num_slides_larges),
            ("num_slides_levels", &self.num_slides_levels),
            ("num_slides_megas", &self.num_slides_megas),
            ("num_slides_serials", &self.num_slides_serials),
        ]
        .into_iter()
    }
}

impl Config {
    /// Validates cross-field rules, reporting the offending field path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, sched) in [
            ("arrivals.cancer", &self.arrivals.cancer),
            ("arrivals.noncancer", &self.arrivals.noncancer),
        ] {
            let path = format!("{name}.rates");
            if sched.rates.len() != 168 {
                return Err(ConfigError::field(
                    &path,
                    format!("expected 168 hourly rates, got {}", sched.rates.len()),
                ));
            }
            if let Some(i) = sched.rates.iter().position(|r| !r.is_finite() || *r < 0.0) {
                return Err(ConfigError::field(
                    format!("{path}[{i}]"),
                    "rates must be finite and non-negative",
                ));
            }
        }

        for (name, info) in self.resources.iter() {
            let path = format!("resources.{name}.schedule");
            if info.schedule.day_flags.len() != 7 {
                return Err(ConfigError::field(
                    format!("{path}.day_flags"),
                    format!("expected 7 day flags, got {}", info.schedule.day_flags.len()),
                ));
            }
            if info.schedule.allocation.len() != 48 {
                return Err(ConfigError::field(
                    format!("{path}.allocation"),
                    format!(
                        "expected 48 half-hour slots, got {}",
                        info.schedule.allocation.len()
                    ),
                ));
            }
        }

        for (name, info) in self.task_durations.iter() {
            let path = format!("task_durations.{name}");
            validate_dist_info(&path, info)?;
        }

        for (name, size) in self.batch_sizes.iter() {
            if size == 0 {
                return Err(ConfigError::field(
                    format!("batch_sizes.{name}"),
                    "batch sizes must be positive",
                ));
            }
        }

        for (name, v) in self.runner_times.iter() {
            if !v.is_finite() || v < 0.0 {
                return Err(ConfigError::field(
                    format!("runner_times.{name}"),
                    "runner times must be finite and non-negative",
                ));
            }
        }
        if !self.runner_times.speed.is_finite() || self.runner_times.speed <= 0.0 {
            return Err(ConfigError::field(
                "runner_times.speed",
                "speed must be positive",
            ));
        }

        for (name, p) in self.global_vars.probabilities() {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::field(
                    format!("global_vars.{name}"),
                    format!("probability {p} outside [0, 1]"),
                ));
            }
        }
        for (name, d) in self.global_vars.count_dists() {
            let path = format!("global_vars.{name}");
            if d.kind != IntDistKind::Constant && !(d.low <= d.mode && d.mode <= d.high) {
                return Err(ConfigError::field(
                    &path,
                    format!(
                        "non-monotone triple (low={}, mode={}, high={})",
                        d.low, d.mode, d.high
                    ),
                ));
            }
        }

        if !self.sim_hours.is_finite() || self.sim_hours <= 0.0 {
            return Err(ConfigError::field(
                "sim_hours",
                "simulation length must be positive",
            ));
        }
        if self.num_reps == 0 {
            return Err(ConfigError::field(
                "num_reps",
                "replication count must be positive",
            ));
        }
        Ok(())
    }
}

fn validate_dist_info(path: &str, info: &DistributionInfo) -> Result<(), ConfigError> {
    match info.time_unit.chars().next() {
        Some('s' | 'm' | 'h') => {}
        _ => {
            return Err(ConfigError::field(
                format!("{path}.time_unit"),
                format!("invalid time unit string {:?}", info.time_unit),
            ));
        }
    }
    let finite = [info.low, info.mode, info.high]
        .iter()
        .all(|v| v.is_finite() && *v >= 0.0);
    if !finite {
        return Err(ConfigError::field(
            path,
            "parameters must be finite and non-negative",
        ));
    }
    // Constant uses the mode only; the triple need not be ordered.
    if info.kind != DistKind::Constant && !(info.low <= info.mode && info.mode <= info.high) {
        return Err(ConfigError::field(
            path,
            format!(
                "non-monotone triple (low={}, mode={}, high={})",
                info.low, info.mode, info.high
            ),
        ));
    }
    Ok(())
}
