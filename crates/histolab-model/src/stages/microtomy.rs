//! Microtomy: slicing blocks into slides.

use histolab_sim::{Ctx, IntDist, Sim, SimResult};

use crate::entities::{AttrValue, BlockType, Entity, Priority, SlideType, SpecimenId};
use crate::process::{spawn_batcher, spawn_delivery, spawn_specimen_worker};
use crate::world::Lab;

pub(crate) fn register(sim: &Sim<Lab>) {
    spawn_specimen_worker(sim, "microtomy", microtomy);

    let (size, runner, durations) = sim.with(|lab| {
        (
            lab.batch_sizes.deliver_microtomy_to_staining,
            lab.res.microtomy_staff,
            lab.runner.durations_for(lab.runner.microtomy_staining),
        )
    });
    spawn_batcher(
        sim,
        "batcher.microtomy_to_staining",
        IntDist::constant(size),
        "microtomy_to_staining",
    );
    spawn_delivery(
        sim,
        "microtomy_to_staining",
        runner,
        durations,
        "staining_start",
    );
}

/// Generates all slides for a specimen; each block is a separate
/// seize-release of the microtomy staff.
async fn microtomy(ctx: Ctx<Lab>, spec: SpecimenId) -> SimResult<()> {
    let t = ctx.now();
    let (d, g, staff, prio, blocks) = ctx.with(|lab| {
        lab.wips.in_microtomy.incr(t);
        lab.timestamp(spec, "microtomy_start", t);
        lab.set_attr(spec, "total_slides", AttrValue::Int(0));
        (
            lab.durations.clone(),
            lab.globals.clone(),
            lab.res.microtomy_staff,
            lab.specimens[spec.0].prio,
            lab.specimens[spec.0].blocks.clone(),
        )
    });

    for block in blocks {
        ctx.seize_one(staff, 1, prio.level()).await?;

        let block_type = ctx.with(|lab| lab.blocks[block.0].block_type);
        let (slide_type, num_slides) = match block_type {
            BlockType::SmallSurgical => {
                if ctx.u01() < g.prob_microtomy_levels {
                    ctx.hold(&d.microtomy_levels).await;
                    (SlideType::Levels, ctx.sample_int(&g.num_slides_levels))
                } else {
                    ctx.hold(&d.microtomy_serials).await;
                    (SlideType::Serials, ctx.sample_int(&g.num_slides_serials))
                }
            }
            BlockType::LargeSurgical => {
                ctx.hold(&d.microtomy_larges).await;
                (SlideType::Larges, ctx.sample_int(&g.num_slides_larges))
            }
            BlockType::Mega => {
                ctx.hold(&d.microtomy_megas).await;
                (SlideType::Megas, ctx.sample_int(&g.num_slides_megas))
            }
        };

        ctx.with(|lab| {
            for _ in 0..num_slides {
                lab.new_slide(block, slide_type);
            }
            lab.blocks[block.0].num_slides = Some(num_slides);
            let name = lab.specimens[spec.0].name.clone();
            if let Some(attrs) = lab.specimen_data.get_mut(&name) {
                let current = match attrs.get("total_slides") {
                    Some(AttrValue::Int(v)) => *v,
                    _ => 0,
                };
                attrs.insert(
                    "total_slides".into(),
                    AttrValue::Int(current + u64::from(num_slides)),
                );
            }
        });

        ctx.release_all()?;
    }

    let t = ctx.now();
    let (direct, batcher) = ctx.with(|lab| {
        lab.wips.in_microtomy.decr(t);
        lab.timestamp(spec, "microtomy_end", t);
        (
            lab.store("microtomy_to_staining"),
            lab.store("batcher.microtomy_to_staining"),
        )
    });
    if prio == Priority::Urgent {
        ctx.push_sorted(direct, Entity::Specimen(spec), Priority::Urgent.level());
    } else {
        ctx.push(batcher, Entity::Specimen(spec));
    }
    Ok(())
}
