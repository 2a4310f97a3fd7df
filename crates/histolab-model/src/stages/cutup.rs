//! Cut-up: BMS, pool, and large-specimen routes.
//!
//! Specialities are ignored; the cut-up rooms are pooled into one unit.

use histolab_sim::{Ctx, IntDist, Sim, SimResult};

use crate::entities::{AttrValue, BlockType, Entity, Priority, SpecimenId};
use crate::process::{spawn_batcher, spawn_delivery, spawn_specimen_worker};
use crate::world::Lab;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CutupKind {
    Bms,
    Pool,
    Large,
}

impl CutupKind {
    fn stores(self) -> (&'static str, &'static str) {
        match self {
            Self::Bms => (
                "cutup_bms_to_processing",
                "batcher.cutup_bms_to_processing",
            ),
            Self::Pool => (
                "cutup_pool_to_processing",
                "batcher.cutup_pool_to_processing",
            ),
            Self::Large => (
                "cutup_large_to_processing",
                "batcher.cutup_large_to_processing",
            ),
        }
    }
}

pub(crate) fn register(sim: &Sim<Lab>) {
    spawn_specimen_worker(sim, "cutup_start", cutup_start);
    spawn_specimen_worker(sim, "cutup_bms", cutup_bms);
    spawn_specimen_worker(sim, "cutup_pool", cutup_pool);
    spawn_specimen_worker(sim, "cutup_large", cutup_large);

    let (size, bms, assistant, durations) = sim.with(|lab| {
        (
            lab.batch_sizes.deliver_cut_up_to_processing,
            lab.res.bms,
            lab.res.cut_up_assistant,
            lab.runner.durations_for(lab.runner.cutup_processing),
        )
    });

    // The BMS route is run by the BMS; pool and large by the assistant.
    for (kind, runner) in [
        (CutupKind::Bms, bms),
        (CutupKind::Pool, assistant),
        (CutupKind::Large, assistant),
    ] {
        let (delivery, batcher) = kind.stores();
        spawn_batcher(sim, batcher, IntDist::constant(size), delivery);
        spawn_delivery(sim, delivery, runner, durations, "processing_start");
    }
}

/// Sorts arriving specimens onto the matching cut-up queue.
async fn cutup_start(ctx: Ctx<Lab>, spec: SpecimenId) -> SimResult<()> {
    let t = ctx.now();
    let (g, prio) = ctx.with(|lab| {
        lab.wips.in_cut_up.incr(t);
        lab.timestamp(spec, "cutup_start", t);
        (lab.globals.clone(), lab.specimens[spec.0].prio)
    });

    let (p_bms, p_pool) = if prio == Priority::Urgent {
        (g.prob_bms_cutup_urgent, g.prob_pool_cutup_urgent)
    } else {
        (g.prob_bms_cutup, g.prob_pool_cutup)
    };
    let r = ctx.u01();
    let (label, next) = if r < p_bms {
        ("BMS", "cutup_bms")
    } else if r < p_bms + p_pool {
        ("Pool", "cutup_pool")
    } else {
        ("Large specimens", "cutup_large")
    };

    let store = ctx.with(|lab| {
        lab.set_attr(spec, "cutup_type", AttrValue::Text(label.into()));
        lab.store(next)
    });
    ctx.push_sorted(store, Entity::Specimen(spec), prio.level());
    Ok(())
}

/// BMS cut-up. Always produces 1 small surgical block.
async fn cutup_bms(ctx: Ctx<Lab>, spec: SpecimenId) -> SimResult<()> {
    cutup_generic(ctx, spec, CutupKind::Bms).await
}

/// Pool cut-up. Always produces 1 large surgical block.
async fn cutup_pool(ctx: Ctx<Lab>, spec: SpecimenId) -> SimResult<()> {
    cutup_generic(ctx, spec, CutupKind::Pool).await
}

/// Large-specimen cut-up. Produces a random number of blocks.
async fn cutup_large(ctx: Ctx<Lab>, spec: SpecimenId) -> SimResult<()> {
    cutup_generic(ctx, spec, CutupKind::Large).await
}

async fn cutup_generic(ctx: Ctx<Lab>, spec: SpecimenId, kind: CutupKind) -> SimResult<()> {
    let (d, g, prio, resource) = ctx.with(|lab| {
        (
            lab.durations.clone(),
            lab.globals.clone(),
            lab.specimens[spec.0].prio,
            if kind == CutupKind::Bms {
                lab.res.bms
            } else {
                lab.res.cut_up_assistant
            },
        )
    });
    let duration = match kind {
        CutupKind::Bms => &d.cut_up_bms,
        CutupKind::Pool => &d.cut_up_pool,
        CutupKind::Large => &d.cut_up_large_specimens,
    };

    let r = ctx.u01();
    // Large cut-ups of urgent specimens always take the large-surgical
    // sub-branch; the r < prob_mega_blocks comparison keeps the branch
    // orientation of the planning workbook.
    let block_type = match kind {
        CutupKind::Bms => BlockType::SmallSurgical,
        CutupKind::Pool => BlockType::LargeSurgical,
        CutupKind::Large => {
            if prio == Priority::Urgent || r < g.prob_mega_blocks {
                BlockType::LargeSurgical
            } else {
                BlockType::Mega
            }
        }
    };
    let n_blocks = if kind == CutupKind::Large {
        if block_type == BlockType::Mega {
            ctx.sample_int(&g.num_blocks_mega)
        } else {
            ctx.sample_int(&g.num_blocks_large_surgical)
        }
    } else {
        1
    };

    ctx.seize_one(resource, 1, prio.level()).await?;
    ctx.hold(duration).await;
    ctx.with(|lab| {
        for _ in 0..n_blocks {
            lab.new_block(spec, block_type);
        }
        lab.set_attr(spec, "num_blocks", AttrValue::Int(u64::from(n_blocks)));
    });
    ctx.release_all()?;

    let t = ctx.now();
    let (delivery, batcher) = kind.stores();
    let (direct, batch_store) = ctx.with(|lab| {
        lab.wips.in_cut_up.decr(t);
        lab.timestamp(spec, "cutup_end", t);
        (lab.store(delivery), lab.store(batcher))
    });
    if prio == Priority::Urgent {
        ctx.push_sorted(direct, Entity::Specimen(spec), Priority::Urgent.level());
    } else {
        ctx.push(batch_store, Entity::Specimen(spec));
    }
    Ok(())
}
