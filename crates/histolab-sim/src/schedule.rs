//! Scheduled resource capacity.
//!
//! Each schedulable resource gets one actor cycling a 7-day schedule: a day
//! whose flag is unset zeroes the capacity for 24 hours; otherwise the 48
//! half-hour allocation slots are applied in turn. Shrinking below the
//! claimed count never revokes in-flight claims; raises re-examine the
//! pending queue.

use crate::clock::DAY;
use crate::error::SimResult;
use crate::resource::ResourceId;
use crate::sim::{Ctx, Model};

/// Half-hour allocation grid step.
pub const ALLOCATION_INTERVAL_HOURS: f64 = 0.5;

/// Weekly capacity schedule: one flag per day (Mon..Sun) and 48 half-hour
/// allocation slots applied on flagged days.
#[derive(Debug, Clone)]
pub struct CapacitySchedule {
    pub day_flags: [bool; 7],
    pub allocation: Vec<u32>,
}

/// Actor body driving one resource's capacity through its weekly schedule.
pub async fn capacity_scheduler<M: Model>(
    ctx: Ctx<M>,
    resource: ResourceId,
    schedule: CapacitySchedule,
) -> SimResult<()> {
    debug_assert_eq!(schedule.allocation.len(), 48);
    loop {
        for day in 0..7 {
            if !schedule.day_flags[day] {
                ctx.set_capacity(resource, 0);
                ctx.hold(DAY).await;
            } else {
                for &units in &schedule.allocation {
                    ctx.set_capacity(resource, units);
                    ctx.hold(ALLOCATION_INTERVAL_HOURS).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::RandomSource;
    use crate::sim::{Sim, SimBuilder};

    struct NoState;

    impl Model for NoState {
        type Item = ();
    }

    fn scheduled_sim(day_flags: [bool; 7], allocation: Vec<u32>) -> (Sim<NoState>, ResourceId) {
        let mut b = SimBuilder::new();
        let res = b.resource("staff");
        let sim = b.finish(NoState, &RandomSource::new(0));
        sim.spawn("scheduler [staff]", 0, move |ctx| {
            capacity_scheduler(
                ctx,
                res,
                CapacitySchedule {
                    day_flags,
                    allocation,
                },
            )
        });
        (sim, res)
    }

    #[test]
    fn allocation_slots_apply_on_half_hour_grid() {
        // Zero for 00:00-08:00, four units for the rest of the day.
        let mut allocation = vec![0; 16];
        allocation.extend(std::iter::repeat(4).take(32));
        let (sim, res) = scheduled_sim([true; 7], allocation);
        sim.run(24.0).unwrap();
        let series = sim.resource_series(res).capacity;
        assert_eq!(series, vec![(0.0, 0.0), (8.0, 4.0), (24.0, 0.0)]);
    }

    #[test]
    fn unflagged_day_is_zero_capacity() {
        let (sim, res) = scheduled_sim(
            [false, true, false, false, false, false, false],
            vec![2; 48],
        );
        sim.run(72.0).unwrap();
        let series = sim.resource_series(res).capacity;
        assert_eq!(series, vec![(0.0, 0.0), (24.0, 2.0), (48.0, 0.0), (72.0, 0.0)]);
    }

    #[test]
    fn queued_seize_waits_for_capacity_raise() {
        let mut allocation = vec![0; 16];
        allocation.extend(std::iter::repeat(4).take(32));
        let (sim, res) = scheduled_sim([true; 7], allocation);
        sim.spawn("task", 0, move |ctx| async move {
            ctx.seize_one(res, 1, 0).await?;
            let started = ctx.now();
            assert_eq!(started, 8.0);
            ctx.hold(10.0).await;
            ctx.release_all()?;
            Ok(())
        });
        sim.run(24.0).unwrap();
        assert_eq!(sim.resource_claimed(res), 0);
    }

    #[test]
    fn shrink_does_not_revoke_claims() {
        // Capacity 3 for the first half-hour only, then 1.
        let mut allocation = vec![1; 48];
        allocation[0] = 3;
        let (sim, res) = scheduled_sim([true; 7], allocation);
        sim.spawn("task", 0, move |ctx| async move {
            ctx.seize_one(res, 3, 0).await?;
            ctx.hold(2.0).await;
            ctx.release_all()?;
            Ok(())
        });
        sim.run(1.0).unwrap();
        // At the horizon the shrink happened but the claim is intact.
        assert_eq!(sim.resource_capacity(res), 1);
        assert_eq!(sim.resource_claimed(res), 3);
    }
}
