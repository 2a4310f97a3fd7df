//! Labelling, done in the main lab by microtomy staff.

use histolab_sim::{Ctx, IntDist, Sim, SimResult};

use crate::entities::{Entity, Priority, SpecimenId};
use crate::process::{spawn_batcher, spawn_delivery, spawn_specimen_worker};
use crate::world::Lab;

pub(crate) fn register(sim: &Sim<Lab>) {
    spawn_specimen_worker(sim, "labelling", labelling);

    let (size, runner, durations) = sim.with(|lab| {
        (
            lab.batch_sizes.deliver_labelling_to_scanning,
            lab.res.microtomy_staff,
            lab.runner.durations_for(lab.runner.labelling_scanning),
        )
    });
    spawn_batcher(
        sim,
        "batcher.labelling_to_scanning",
        IntDist::constant(size),
        "labelling_to_scanning",
    );
    spawn_delivery(
        sim,
        "labelling_to_scanning",
        runner,
        durations,
        "scanning_start",
    );
}

/// Labels every slide of a specimen under one staff seize.
async fn labelling(ctx: Ctx<Lab>, spec: SpecimenId) -> SimResult<()> {
    let t = ctx.now();
    let (d, staff, prio, slide_count) = ctx.with(|lab| {
        lab.wips.in_labelling.incr(t);
        lab.timestamp(spec, "labelling_start", t);
        let slides: usize = lab.specimens[spec.0]
            .blocks
            .iter()
            .map(|b| lab.blocks[b.0].slides.len())
            .sum();
        (
            lab.durations.clone(),
            lab.res.microtomy_staff,
            lab.specimens[spec.0].prio,
            slides,
        )
    });

    ctx.seize_one(staff, 1, prio.level()).await?;
    for _ in 0..slide_count {
        ctx.hold(&d.labelling).await;
    }
    ctx.release_all()?;

    let t = ctx.now();
    let (direct, batcher) = ctx.with(|lab| {
        lab.wips.in_labelling.decr(t);
        lab.timestamp(spec, "labelling_end", t);
        (
            lab.store("labelling_to_scanning"),
            lab.store("batcher.labelling_to_scanning"),
        )
    });
    if prio == Priority::Urgent {
        ctx.push_sorted(direct, Entity::Specimen(spec), Priority::Urgent.level());
    } else {
        ctx.push(batcher, Entity::Specimen(spec));
    }
    Ok(())
}
