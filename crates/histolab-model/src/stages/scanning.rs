//! Digital scanning, with dedicated machines for regular and mega slides.

use histolab_sim::{Ctx, Dist, IntDist, ResourceId, Sim, SimResult};

use crate::entities::{Batch, Entity, SlideType, SpecimenId};
use crate::process::{
    CountAttr, spawn_batch_worker, spawn_batcher, spawn_collator, spawn_delivery,
    spawn_specimen_worker,
};
use crate::world::Lab;

pub(crate) fn register(sim: &Sim<Lab>) {
    spawn_specimen_worker(sim, "scanning_start", scanning_start);
    spawn_batch_worker(sim, "scanning_regular", scanning_regular);
    spawn_batch_worker(sim, "scanning_megas", scanning_megas);
    spawn_specimen_worker(sim, "post_scanning", post_scanning);

    let (regular, megas, deliver, runner, durations) = sim.with(|lab| {
        (
            lab.batch_sizes.digital_scanning_regular,
            lab.batch_sizes.digital_scanning_megas,
            lab.batch_sizes.deliver_scanning_to_qc,
            lab.res.scanning_staff,
            lab.runner.durations_for(lab.runner.scanning_qc),
        )
    });

    spawn_batcher(
        sim,
        "batcher.scanning_regular",
        IntDist::constant(regular),
        "scanning_regular",
    );
    spawn_batcher(
        sim,
        "batcher.scanning_megas",
        IntDist::constant(megas),
        "scanning_megas",
    );

    spawn_collator(
        sim,
        "collate.scanning.slides",
        CountAttr::NumSlides,
        "collate.scanning.blocks",
    );
    spawn_collator(
        sim,
        "collate.scanning.blocks",
        CountAttr::NumBlocks,
        "post_scanning",
    );

    spawn_batcher(
        sim,
        "batcher.scanning_to_qc",
        IntDist::constant(deliver),
        "scanning_to_qc",
    );
    spawn_delivery(sim, "scanning_to_qc", runner, durations, "qc");
}

/// Routes a specimen's slides to the scanning batchers.
async fn scanning_start(ctx: Ctx<Lab>, spec: SpecimenId) -> SimResult<()> {
    let t = ctx.now();
    let (slides, regular, megas) = ctx.with(|lab| {
        lab.wips.in_scanning.incr(t);
        lab.timestamp(spec, "scanning_start", t);
        let mut slides = Vec::new();
        for &block in &lab.specimens[spec.0].blocks {
            for &slide in &lab.blocks[block.0].slides {
                slides.push((slide, lab.slides[slide.0].slide_type == SlideType::Megas));
            }
        }
        (
            slides,
            lab.store("batcher.scanning_regular"),
            lab.store("batcher.scanning_megas"),
        )
    });
    for (slide, is_mega) in slides {
        ctx.push(if is_mega { megas } else { regular }, Entity::Slide(slide));
    }
    Ok(())
}

async fn scanning_generic(
    ctx: Ctx<Lab>,
    batch: Batch,
    machine: ResourceId,
    load: Dist,
    scan: Dist,
    unload: Dist,
) -> SimResult<()> {
    let staff = ctx.with(|lab| lab.res.scanning_staff);

    ctx.seize(&[(staff, 1, 0), (machine, 1, 0)]).await?;
    ctx.hold(&load).await;
    ctx.release(&[staff])?;

    ctx.hold(&scan).await;

    ctx.seize_one(staff, 1, 0).await?;
    ctx.hold(&unload).await;
    ctx.release_all()?;

    let out = ctx.with(|lab| lab.store("collate.scanning.slides"));
    for slide in batch.items {
        ctx.push(out, slide);
    }
    Ok(())
}

/// Scans a batch of regular slides.
async fn scanning_regular(ctx: Ctx<Lab>, batch: Batch) -> SimResult<()> {
    let (machine, load, scan, unload) = ctx.with(|lab| {
        (
            lab.res.scanning_machine_regular,
            lab.durations.load_scanning_machine_regular.clone(),
            lab.durations.scanning_regular.clone(),
            lab.durations.unload_scanning_machine_regular.clone(),
        )
    });
    scanning_generic(ctx, batch, machine, load, scan, unload).await
}

/// Scans a batch of mega slides.
async fn scanning_megas(ctx: Ctx<Lab>, batch: Batch) -> SimResult<()> {
    let (machine, load, scan, unload) = ctx.with(|lab| {
        (
            lab.res.scanning_machine_megas,
            lab.durations.load_scanning_machine_megas.clone(),
            lab.durations.scanning_megas.clone(),
            lab.durations.unload_scanning_machine_megas.clone(),
        )
    });
    scanning_generic(ctx, batch, machine, load, scan, unload).await
}

/// Post-scanning: the whole specimen queues for delivery to QC.
async fn post_scanning(ctx: Ctx<Lab>, spec: SpecimenId) -> SimResult<()> {
    let t = ctx.now();
    let (prio, batcher) = ctx.with(|lab| {
        lab.wips.in_scanning.decr(t);
        lab.timestamp(spec, "scanning_end", t);
        (lab.specimens[spec.0].prio, lab.store("batcher.scanning_to_qc"))
    });
    ctx.push_sorted(batcher, Entity::Specimen(spec), prio.level());
    Ok(())
}
