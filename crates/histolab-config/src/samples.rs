//! Sample configuration documents.
//!
//! `sample_config` produces a complete, valid document with all-constant
//! durations, quiet arrivals, and single-unit batches. It is the starting
//! point for hand-edited job configs (`histolab sample-config`) and the
//! baseline the scenario tests perturb.

use crate::schema::*;

/// A constant five-minute task duration.
pub fn constant_duration(mode: f64, unit: &str) -> DistributionInfo {
    DistributionInfo {
        kind: DistKind::Constant,
        low: mode,
        mode,
        high: mode,
        time_unit: unit.to_owned(),
    }
}

/// A degenerate count distribution.
pub fn constant_count(mode: u32) -> IntDistributionInfo {
    IntDistributionInfo {
        kind: IntDistKind::Constant,
        low: mode,
        mode,
        high: mode,
    }
}

/// An always-on schedule with the given allocation in every slot.
pub fn flat_schedule(units: u32) -> ResourceSchedule {
    ResourceSchedule {
        day_flags: vec![true; 7],
        allocation: vec![units; 48],
    }
}

fn resource(name: &str, kind: ResourceKind, units: u32) -> ResourceInfo {
    ResourceInfo {
        name: name.to_owned(),
        kind,
        schedule: flat_schedule(units),
    }
}

/// A complete valid document: zero arrivals, constant five-minute tasks,
/// one unit of every resource around the clock, single-item batches.
pub fn sample_config() -> Config {
    let d = constant_duration(5.0, "m");
    Config {
        arrivals: ArrivalSchedules {
            cancer: ArrivalSchedule {
                rates: vec![0.0; 168],
            },
            noncancer: ArrivalSchedule {
                rates: vec![0.0; 168],
            },
        },
        batch_sizes: BatchSizes {
            deliver_reception_to_cut_up: 1,
            deliver_cut_up_to_processing: 1,
            deliver_processing_to_microtomy: 1,
            deliver_microtomy_to_staining: 1,
            deliver_staining_to_labelling: 1,
            deliver_labelling_to_scanning: 1,
            deliver_scanning_to_qc: 1,
            bone_station: 1,
            processing_regular: 1,
            processing_megas: 1,
            staining_regular: 1,
            staining_megas: 1,
            digital_scanning_regular: 1,
            digital_scanning_megas: 1,
        },
        global_vars: Globals {
            prob_internal: 1.0,
            prob_urgent_cancer: 0.0,
            prob_urgent_non_cancer: 0.0,
            prob_priority_cancer: 0.0,
            prob_priority_non_cancer: 0.0,
            prob_prebook: 0.0,
            prob_invest_easy: 0.0,
            prob_invest_hard: 0.0,
            prob_invest_external: 0.0,
            prob_bms_cutup: 1.0,
            prob_bms_cutup_urgent: 1.0,
            prob_large_cutup: 0.0,
            prob_large_cutup_urgent: 0.0,
            prob_pool_cutup: 0.0,
            prob_pool_cutup_urgent: 0.0,
            prob_mega_blocks: 0.0,
            prob_decalc_bone: 0.0,
            prob_decalc_oven: 0.0,
            prob_microtomy_levels: 0.0,
            num_blocks_large_surgical: constant_count(1),
            num_blocks_mega: constant_count(1),
            num_slides_larges: constant_count(1),
            num_slides_levels: constant_count(1),
            num_slides_megas: constant_count(1),
            num_slides_serials: constant_count(1),
        },
        resources: ResourcesInfo {
            booking_in_staff: resource("Booking-in staff", ResourceKind::Staff, 1),
            bms: resource("BMS", ResourceKind::Staff, 1),
            cut_up_assistant: resource("Cut-up assistant", ResourceKind::Staff, 1),
            processing_room_staff: resource("Processing room staff", ResourceKind::Staff, 1),
            microtomy_staff: resource("Microtomy staff", ResourceKind::Staff, 1),
            staining_staff: resource("Staining staff", ResourceKind::Staff, 1),
            scanning_staff: resource("Scanning staff", ResourceKind::Staff, 1),
            qc_staff: resource("QC staff", ResourceKind::Staff, 1),
            histopathologist: resource("Histopathologist", ResourceKind::Staff, 1),
            bone_station: resource("Bone station", ResourceKind::Machine, 1),
            processing_machine: resource("Processing machine", ResourceKind::Machine, 1),
            staining_machine: resource("Staining machine", ResourceKind::Machine, 1),
            coverslip_machine: resource("Coverslip machine", ResourceKind::Machine, 1),
            scanning_machine_regular: resource(
                "Scanning machine (regular)",
                ResourceKind::Machine,
                1,
            ),
            scanning_machine_megas: resource("Scanning machine (megas)", ResourceKind::Machine, 1),
        },
        runner_times: RunnerTimes {
            reception_cutup: 60.0,
            cutup_processing: 60.0,
            processing_microtomy: 60.0,
            microtomy_staining: 60.0,
            staining_labelling: 60.0,
            labelling_scanning: 60.0,
            scanning_qc: 60.0,
            extra_loading: 10.0,
            extra_unloading: 10.0,
            speed: 1.0,
        },
        task_durations: TaskDurations {
            receive_and_sort: d.clone(),
            pre_booking_in_investigation: d.clone(),
            booking_in_internal: d.clone(),
            booking_in_external: d.clone(),
            booking_in_investigation_internal_easy: d.clone(),
            booking_in_investigation_internal_hard: d.clone(),
            booking_in_investigation_external: d.clone(),
            cut_up_bms: d.clone(),
            cut_up_pool: d.clone(),
            cut_up_large_specimens: d.clone(),
            load_bone_station: d.clone(),
            decalc: d.clone(),
            unload_bone_station: d.clone(),
            load_into_decalc_oven: d.clone(),
            unload_from_decalc_oven: d.clone(),
            load_processing_machine: d.clone(),
            unload_processing_machine: d.clone(),
            processing_urgent: d.clone(),
            processing_small_surgicals: d.clone(),
            processing_large_surgicals: d.clone(),
            processing_megas: d.clone(),
            embedding: d.clone(),
            embedding_cooldown: d.clone(),
            block_trimming: d.clone(),
            microtomy_serials: d.clone(),
            microtomy_levels: d.clone(),
            microtomy_larges: d.clone(),
            microtomy_megas: d.clone(),
            load_staining_machine_regular: d.clone(),
            load_staining_machine_megas: d.clone(),
            staining_regular: d.clone(),
            staining_megas: d.clone(),
            unload_staining_machine_regular: d.clone(),
            unload_staining_machine_megas: d.clone(),
            load_coverslip_machine_regular: d.clone(),
            coverslip_regular: d.clone(),
            coverslip_megas: d.clone(),
            unload_coverslip_machine_regular: d.clone(),
            labelling: d.clone(),
            load_scanning_machine_regular: d.clone(),
            load_scanning_machine_megas: d.clone(),
            scanning_regular: d.clone(),
            scanning_megas: d.clone(),
            unload_scanning_machine_regular: d.clone(),
            unload_scanning_machine_megas: d.clone(),
            block_and_quality_check: d.clone(),
            assign_histopathologist: d.clone(),
            write_report: d,
        },
        sim_hours: 168.0,
        num_reps: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_validates() {
        sample_config().validate().unwrap();
    }
}
