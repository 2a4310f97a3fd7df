//! Staining and cover-slipping.
//!
//! Regular slides go through the staining machine and the coverslip
//! machine in batches; mega slides are cover-slipped by hand one at a time
//! under the staining staff claim retained from unloading.

use histolab_sim::{Ctx, IntDist, Sim, SimResult};

use crate::entities::{Batch, Entity, Priority, SlideType, SpecimenId};
use crate::process::{
    CountAttr, spawn_batch_worker, spawn_batcher, spawn_collator, spawn_delivery,
    spawn_specimen_worker,
};
use crate::world::Lab;

pub(crate) fn register(sim: &Sim<Lab>) {
    spawn_specimen_worker(sim, "staining_start", staining_start);
    spawn_batch_worker(sim, "staining_regular", staining_regular);
    spawn_batch_worker(sim, "staining_megas", staining_megas);
    spawn_specimen_worker(sim, "post_staining", post_staining);

    let (regular, megas, deliver, runner, durations) = sim.with(|lab| {
        (
            lab.batch_sizes.staining_regular,
            lab.batch_sizes.staining_megas,
            lab.batch_sizes.deliver_staining_to_labelling,
            lab.res.microtomy_staff,
            lab.runner.durations_for(lab.runner.staining_labelling),
        )
    });

    spawn_batcher(
        sim,
        "batcher.staining_regular",
        IntDist::constant(regular),
        "staining_regular",
    );
    spawn_batcher(
        sim,
        "batcher.staining_megas",
        IntDist::constant(megas),
        "staining_megas",
    );

    spawn_collator(
        sim,
        "collate.staining.slides",
        CountAttr::NumSlides,
        "collate.staining.blocks",
    );
    spawn_collator(
        sim,
        "collate.staining.blocks",
        CountAttr::NumBlocks,
        "post_staining",
    );

    spawn_batcher(
        sim,
        "batcher.staining_to_labelling",
        IntDist::constant(deliver),
        "staining_to_labelling",
    );
    spawn_delivery(sim, "staining_to_labelling", runner, durations, "labelling");
}

/// Separates a specimen's slides and routes them to the staining batchers.
async fn staining_start(ctx: Ctx<Lab>, spec: SpecimenId) -> SimResult<()> {
    let t = ctx.now();
    let (prio, slides, regular, megas) = ctx.with(|lab| {
        lab.wips.in_staining.incr(t);
        lab.timestamp(spec, "staining_start", t);
        let mut slides = Vec::new();
        for &block in &lab.specimens[spec.0].blocks {
            for &slide in &lab.blocks[block.0].slides {
                slides.push((slide, lab.slides[slide.0].slide_type == SlideType::Megas));
            }
        }
        (
            lab.specimens[spec.0].prio,
            slides,
            lab.store("batcher.staining_regular"),
            lab.store("batcher.staining_megas"),
        )
    });
    for (slide, is_mega) in slides {
        let store = if is_mega { megas } else { regular };
        ctx.push_sorted(store, Entity::Slide(slide), prio.level());
    }
    Ok(())
}

/// Stains and cover-slips a batch of regular-sized slides.
async fn staining_regular(ctx: Ctx<Lab>, batch: Batch) -> SimResult<()> {
    let (d, staff, stainer, coverslipper) = ctx.with(|lab| {
        (
            lab.durations.clone(),
            lab.res.staining_staff,
            lab.res.staining_machine,
            lab.res.coverslip_machine,
        )
    });

    ctx.seize(&[(staff, 1, 0), (stainer, 1, 0)]).await?;
    ctx.hold(&d.load_staining_machine_regular).await;
    ctx.release(&[staff])?;

    ctx.hold(&d.staining_regular).await;

    ctx.seize_one(staff, 1, 0).await?;
    ctx.hold(&d.unload_staining_machine_regular).await;
    ctx.release_all()?;

    ctx.seize(&[(staff, 1, 0), (coverslipper, 1, 0)]).await?;
    ctx.hold(&d.load_coverslip_machine_regular).await;
    ctx.release(&[staff])?;

    ctx.hold(&d.coverslip_regular).await;

    ctx.seize_one(staff, 1, 0).await?;
    ctx.hold(&d.unload_coverslip_machine_regular).await;
    ctx.release_all()?;

    let out = ctx.with(|lab| lab.store("collate.staining.slides"));
    for slide in batch.items {
        ctx.push(out, slide);
    }
    Ok(())
}

/// Stains a batch of mega slides, then cover-slips each by hand while
/// keeping the staff claim.
async fn staining_megas(ctx: Ctx<Lab>, batch: Batch) -> SimResult<()> {
    let (d, staff, stainer) = ctx.with(|lab| {
        (
            lab.durations.clone(),
            lab.res.staining_staff,
            lab.res.staining_machine,
        )
    });

    ctx.seize(&[(staff, 1, 0), (stainer, 1, 0)]).await?;
    ctx.hold(&d.load_staining_machine_megas).await;
    ctx.release(&[staff])?;

    ctx.hold(&d.staining_megas).await;

    ctx.seize_one(staff, 1, 0).await?;
    ctx.hold(&d.unload_staining_machine_megas).await;
    ctx.release(&[stainer])?;

    let out = ctx.with(|lab| lab.store("collate.staining.slides"));
    for slide in batch.items {
        ctx.hold(&d.coverslip_megas).await;
        ctx.push(out, slide);
    }

    ctx.release_all()?;
    Ok(())
}

/// Post-staining: the whole specimen moves on to labelling.
async fn post_staining(ctx: Ctx<Lab>, spec: SpecimenId) -> SimResult<()> {
    let t = ctx.now();
    let (prio, direct, batcher) = ctx.with(|lab| {
        lab.wips.in_staining.decr(t);
        lab.timestamp(spec, "staining_end", t);
        (
            lab.specimens[spec.0].prio,
            lab.store("staining_to_labelling"),
            lab.store("batcher.staining_to_labelling"),
        )
    });
    if prio == Priority::Urgent {
        ctx.push_sorted(direct, Entity::Specimen(spec), Priority::Urgent.level());
    } else {
        ctx.push(batcher, Entity::Specimen(spec));
    }
    Ok(())
}
