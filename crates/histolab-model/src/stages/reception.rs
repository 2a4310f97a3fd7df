//! Reception: receive and sort, booking-in, delivery to cut-up.

use histolab_sim::{Ctx, IntDist, Sim, SimResult};

use crate::entities::{Entity, Priority, Source, SpecimenId};
use crate::process::{spawn_batcher, spawn_delivery, spawn_specimen_worker};
use crate::world::Lab;

pub(crate) fn register(sim: &Sim<Lab>) {
    spawn_specimen_worker(sim, "arrive_reception", arrive_reception);
    spawn_specimen_worker(sim, "booking_in", booking_in);

    let (size, runner, durations) = sim.with(|lab| {
        (
            lab.batch_sizes.deliver_reception_to_cut_up,
            lab.res.booking_in_staff,
            lab.runner.durations_for(lab.runner.reception_cutup),
        )
    });
    spawn_batcher(
        sim,
        "batcher.reception_to_cutup",
        IntDist::constant(size),
        "reception_to_cutup",
    );
    spawn_delivery(sim, "reception_to_cutup", runner, durations, "cutup_start");
}

async fn arrive_reception(ctx: Ctx<Lab>, spec: SpecimenId) -> SimResult<()> {
    let t = ctx.now();
    let (staff, d) = ctx.with(|lab| {
        lab.wips.total.incr(t);
        lab.wips.in_reception.incr(t);
        lab.timestamp(spec, "reception_start", t);
        (lab.res.booking_in_staff, lab.durations.clone())
    });

    // Receiving new specimens always takes priority over non-urgent
    // booking-in tasks.
    ctx.seize_one(staff, 1, Priority::Urgent.level()).await?;
    ctx.hold(&d.receive_and_sort).await;
    ctx.release_all()?;

    let (store, prio) = ctx.with(|lab| (lab.store("booking_in"), lab.specimens[spec.0].prio));
    ctx.push_sorted(store, Entity::Specimen(spec), prio.level());
    Ok(())
}

async fn booking_in(ctx: Ctx<Lab>, spec: SpecimenId) -> SimResult<()> {
    let (d, g, staff, prio, internal) = ctx.with(|lab| {
        (
            lab.durations.clone(),
            lab.globals.clone(),
            lab.res.booking_in_staff,
            lab.specimens[spec.0].prio,
            lab.specimens[spec.0].source == Source::Internal,
        )
    });

    ctx.seize_one(staff, 1, prio.level()).await?;

    if ctx.u01() < g.prob_prebook {
        ctx.hold(&d.pre_booking_in_investigation).await;
    }

    if internal {
        ctx.hold(&d.booking_in_internal).await;
    } else {
        ctx.hold(&d.booking_in_external).await;
    }

    // Additional investigation: internal specimens branch easy/hard on one
    // draw against conditional thresholds.
    if internal {
        let r = ctx.u01();
        if r < g.prob_invest_easy {
            ctx.hold(&d.booking_in_investigation_internal_easy).await;
        } else if r < g.prob_invest_hard {
            ctx.hold(&d.booking_in_investigation_internal_hard).await;
        }
    } else if ctx.u01() < g.prob_invest_external {
        ctx.hold(&d.booking_in_investigation_external).await;
    }

    ctx.release_all()?;
    let t = ctx.now();
    let (direct, batcher) = ctx.with(|lab| {
        lab.timestamp(spec, "reception_end", t);
        lab.wips.in_reception.decr(t);
        (
            lab.store("reception_to_cutup"),
            lab.store("batcher.reception_to_cutup"),
        )
    });

    // Urgent specimens skip the batcher and go straight to delivery.
    if prio == Priority::Urgent {
        ctx.push_sorted(direct, Entity::Specimen(spec), Priority::Urgent.level());
    } else {
        ctx.push(batcher, Entity::Specimen(spec));
    }
    Ok(())
}
