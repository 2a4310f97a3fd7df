//! Tissue processing: decalcification, processing machines, embedding and
//! trimming, then collation back to whole specimens.

use histolab_sim::{Ctx, Dist, IntDist, Sim, SimResult};

use crate::entities::{AttrValue, Batch, BlockId, BlockType, Entity, Priority, SpecimenId};
use crate::process::{
    CountAttr, spawn_batch_worker, spawn_batcher, spawn_block_worker, spawn_collator,
    spawn_delivery, spawn_specimen_worker,
};
use crate::world::Lab;

pub(crate) fn register(sim: &Sim<Lab>) {
    spawn_specimen_worker(sim, "processing_start", processing_start);

    spawn_batch_worker(sim, "decalc_bone_station", decalc_bone_station);
    spawn_block_worker(sim, "decalc_oven", decalc_oven);

    spawn_block_worker(sim, "processing_assign_queue", processing_assign_queue);
    spawn_batch_worker(sim, "processing_urgents", processing_urgents);
    spawn_batch_worker(sim, "processing_smalls", processing_smalls);
    spawn_batch_worker(sim, "processing_larges", processing_larges);
    spawn_batch_worker(sim, "processing_megas", processing_megas);

    spawn_block_worker(sim, "embed_and_trim", embed_and_trim);
    spawn_specimen_worker(sim, "post_processing", post_processing);

    let (sizes, runner, durations) = sim.with(|lab| {
        (
            (
                lab.batch_sizes.bone_station,
                lab.batch_sizes.processing_regular,
                lab.batch_sizes.processing_megas,
                lab.batch_sizes.deliver_processing_to_microtomy,
            ),
            lab.res.processing_room_staff,
            lab.runner.durations_for(lab.runner.processing_microtomy),
        )
    });
    let (bone, regular, megas, deliver) = sizes;

    // Bone station and processing machine batches. Urgents use the regular
    // processing batch size.
    for (batcher, out, size) in [
        ("batcher.decalc_bone_station", "decalc_bone_station", bone),
        ("batcher.processing_urgents", "processing_urgents", regular),
        ("batcher.processing_smalls", "processing_smalls", regular),
        ("batcher.processing_larges", "processing_larges", regular),
        ("batcher.processing_megas", "processing_megas", megas),
    ] {
        spawn_batcher(sim, batcher, IntDist::constant(size), out);
    }

    spawn_collator(
        sim,
        "collate.processing",
        CountAttr::NumBlocks,
        "post_processing",
    );

    spawn_batcher(
        sim,
        "batcher.processing_to_microtomy",
        IntDist::constant(deliver),
        "processing_to_microtomy",
    );
    spawn_delivery(
        sim,
        "processing_to_microtomy",
        runner,
        durations,
        "microtomy",
    );
}

/// Routes arriving specimens to decalc if needed, else straight to queue
/// assignment.
async fn processing_start(ctx: Ctx<Lab>, spec: SpecimenId) -> SimResult<()> {
    let t = ctx.now();
    let (g, prio, blocks) = ctx.with(|lab| {
        lab.wips.in_processing.incr(t);
        lab.timestamp(spec, "processing_start", t);
        (
            lab.globals.clone(),
            lab.specimens[spec.0].prio,
            lab.specimens[spec.0].blocks.clone(),
        )
    });

    let r = ctx.u01();
    let out = ctx.with(|lab| {
        if r < g.prob_decalc_bone {
            lab.set_attr(spec, "decalc_type", AttrValue::Text("bone station".into()));
            lab.store("batcher.decalc_bone_station")
        } else if r < g.prob_decalc_bone + g.prob_decalc_oven {
            lab.set_attr(spec, "decalc_type", AttrValue::Text("decalc oven".into()));
            lab.store("decalc_oven")
        } else {
            lab.store("processing_assign_queue")
        }
    });

    for block in blocks {
        ctx.push_sorted(out, Entity::Block(block), prio.level());
    }
    Ok(())
}

/// Decalcifies a batch of blocks in a bone station.
async fn decalc_bone_station(ctx: Ctx<Lab>, batch: Batch) -> SimResult<()> {
    let (d, station, bms) = ctx.with(|lab| {
        (
            lab.durations.clone(),
            lab.res.bone_station,
            lab.res.bms,
        )
    });

    ctx.seize_one(station, 1, 0).await?;

    ctx.seize_one(bms, 1, 0).await?;
    ctx.hold(&d.load_bone_station).await;
    ctx.release(&[bms])?;

    ctx.hold(&d.decalc).await;

    ctx.seize_one(bms, 1, 0).await?;
    ctx.hold(&d.unload_bone_station).await;
    ctx.release(&[bms])?;

    ctx.release_all()?;

    let out = ctx.with(|lab| lab.store("processing_assign_queue"));
    for item in batch.items {
        let prio = ctx.with(|lab| lab.entity_prio(&item));
        ctx.push_sorted(out, item, prio.level());
    }
    Ok(())
}

/// Decalcifies a single block in an oven. Oven capacity is not modelled.
async fn decalc_oven(ctx: Ctx<Lab>, block: BlockId) -> SimResult<()> {
    let (d, bms, prio) = ctx.with(|lab| {
        (
            lab.durations.clone(),
            lab.res.bms,
            lab.block_prio(block),
        )
    });

    ctx.seize_one(bms, 1, 0).await?;
    ctx.hold(&d.load_into_decalc_oven).await;
    ctx.release_all()?;

    ctx.hold(&d.decalc).await;

    ctx.seize_one(bms, 1, 0).await?;
    ctx.hold(&d.unload_from_decalc_oven).await;
    ctx.release_all()?;

    let out = ctx.with(|lab| lab.store("processing_assign_queue"));
    ctx.push_sorted(out, Entity::Block(block), prio.level());
    Ok(())
}

/// Assigns incoming blocks to the matching batcher by priority and type.
async fn processing_assign_queue(ctx: Ctx<Lab>, block: BlockId) -> SimResult<()> {
    let (out, prio) = ctx.with(|lab| {
        let prio = lab.block_prio(block);
        let store = if prio == Priority::Urgent {
            lab.store("batcher.processing_urgents")
        } else {
            match lab.blocks[block.0].block_type {
                BlockType::SmallSurgical => lab.store("batcher.processing_smalls"),
                BlockType::LargeSurgical => lab.store("batcher.processing_larges"),
                BlockType::Mega => lab.store("batcher.processing_megas"),
            }
        };
        (store, prio)
    });
    ctx.push_sorted(out, Entity::Block(block), prio.level());
    Ok(())
}

/// Processing machine programme for urgent batches.
async fn processing_urgents(ctx: Ctx<Lab>, batch: Batch) -> SimResult<()> {
    let (d, staff, machine) = ctx.with(|lab| {
        (
            lab.durations.clone(),
            lab.res.processing_room_staff,
            lab.res.processing_machine,
        )
    });
    let urgent = Priority::Urgent.level();

    ctx.seize(&[(staff, 1, urgent), (machine, 1, urgent)]).await?;
    ctx.hold(&d.load_processing_machine).await;
    ctx.release(&[staff])?;

    ctx.hold(&d.processing_urgent).await;

    ctx.seize_one(staff, 1, urgent).await?;
    ctx.hold(&d.unload_processing_machine).await;
    ctx.release_all()?;

    forward_to_embedding(&ctx, batch).await
}

async fn processing_generic(ctx: Ctx<Lab>, batch: Batch, duration: Dist) -> SimResult<()> {
    let (d, staff, machine) = ctx.with(|lab| {
        (
            lab.durations.clone(),
            lab.res.processing_room_staff,
            lab.res.processing_machine,
        )
    });

    ctx.seize(&[(staff, 1, 0), (machine, 1, 0)]).await?;
    ctx.hold(&d.load_processing_machine).await;
    ctx.release(&[staff])?;

    ctx.hold(&duration).await;

    ctx.seize_one(staff, 1, 0).await?;
    ctx.hold(&d.unload_processing_machine).await;
    ctx.release_all()?;

    forward_to_embedding(&ctx, batch).await
}

async fn forward_to_embedding(ctx: &Ctx<Lab>, batch: Batch) -> SimResult<()> {
    let out = ctx.with(|lab| lab.store("embed_and_trim"));
    for item in batch.items {
        let prio = ctx.with(|lab| lab.entity_prio(&item));
        ctx.push_sorted(out, item, prio.level());
    }
    Ok(())
}

/// Processing machine programme for small surgical blocks.
async fn processing_smalls(ctx: Ctx<Lab>, batch: Batch) -> SimResult<()> {
    let duration = ctx.with(|lab| lab.durations.processing_small_surgicals.clone());
    processing_generic(ctx, batch, duration).await
}

/// Processing machine programme for large surgical blocks.
async fn processing_larges(ctx: Ctx<Lab>, batch: Batch) -> SimResult<()> {
    let duration = ctx.with(|lab| lab.durations.processing_large_surgicals.clone());
    processing_generic(ctx, batch, duration).await
}

/// Processing machine programme for mega blocks.
async fn processing_megas(ctx: Ctx<Lab>, batch: Batch) -> SimResult<()> {
    let duration = ctx.with(|lab| lab.durations.processing_megas.clone());
    processing_generic(ctx, batch, duration).await
}

/// Embeds a block in wax and trims the excess.
async fn embed_and_trim(ctx: Ctx<Lab>, block: BlockId) -> SimResult<()> {
    let (d, staff, prio) = ctx.with(|lab| {
        (
            lab.durations.clone(),
            lab.res.processing_room_staff,
            lab.block_prio(block),
        )
    });

    ctx.seize_one(staff, 1, 0).await?;
    ctx.hold(&d.embedding).await;
    ctx.release_all()?;

    // Cooldown holds no resources.
    ctx.hold(&d.embedding_cooldown).await;

    ctx.seize_one(staff, 1, 0).await?;
    ctx.hold(&d.block_trimming).await;
    ctx.release_all()?;

    let out = ctx.with(|lab| lab.store("collate.processing"));
    ctx.push_sorted(out, Entity::Block(block), prio.level());
    Ok(())
}

/// Post-processing: the whole specimen moves on to microtomy.
async fn post_processing(ctx: Ctx<Lab>, spec: SpecimenId) -> SimResult<()> {
    let t = ctx.now();
    let (prio, direct, batcher) = ctx.with(|lab| {
        lab.wips.in_processing.decr(t);
        lab.timestamp(spec, "processing_end", t);
        (
            lab.specimens[spec.0].prio,
            lab.store("processing_to_microtomy"),
            lab.store("batcher.processing_to_microtomy"),
        )
    });
    if prio == Priority::Urgent {
        ctx.push_sorted(direct, Entity::Specimen(spec), Priority::Urgent.level());
    } else {
        ctx.push(batcher, Entity::Specimen(spec));
    }
    Ok(())
}
