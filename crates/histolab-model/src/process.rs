//! Process-graph primitives.
//!
//! Workers pull one entity at a time from their in-store and run the
//! registered stage body for it as a fresh actor named after the entity, so
//! many entities move through a stage concurrently while the worker keeps
//! pulling. Batchers gather a sampled number of entities into one Batch;
//! collators reassemble a parent once its expected child count arrives;
//! delivery actors move entities or batches between stages under a runner
//! resource claim. The arrival generator cycles the weekly rate vector and
//! spawns an Exponential sub-generator for each busy hour.

use std::collections::HashMap;
use std::future::Future;

use histolab_sim::{Ctx, Dist, IntDist, ResourceId, Sim, SimError, SimResult};
use tracing::trace;

use crate::entities::{Batch, BlockId, Entity, Priority, Source, SpecimenId};
use crate::world::Lab;

/// Runner leg durations, in hours: collect, outbound, unload, return.
#[derive(Debug, Clone, Copy)]
pub struct RunnerDurations {
    pub collect: f64,
    pub outbound: f64,
    pub unload: f64,
    pub ret: f64,
}

fn unexpected(process: &str, clock: f64) -> SimError {
    SimError::UnexpectedEntity {
        process: process.to_owned(),
        clock,
    }
}

/// A worker whose body handles specimens.
pub(crate) fn spawn_specimen_worker<F, Fut>(sim: &Sim<Lab>, name: &'static str, body: F)
where
    F: Fn(Ctx<Lab>, SpecimenId) -> Fut + Copy + 'static,
    Fut: Future<Output = SimResult<()>> + 'static,
{
    sim.spawn(name, 0, move |ctx| async move {
        let in_store = ctx.with(|lab| lab.store(name));
        loop {
            match ctx.pull(in_store).await {
                Entity::Specimen(id) => {
                    let (actor, prio) = ctx.with(|lab| {
                        let s = &lab.specimens[id.0];
                        (s.name.clone(), s.prio)
                    });
                    ctx.spawn(actor, prio.level(), move |c| body(c, id));
                }
                _ => return Err(unexpected(name, ctx.now())),
            }
        }
    });
}

/// A worker whose body handles single blocks.
pub(crate) fn spawn_block_worker<F, Fut>(sim: &Sim<Lab>, name: &'static str, body: F)
where
    F: Fn(Ctx<Lab>, BlockId) -> Fut + Copy + 'static,
    Fut: Future<Output = SimResult<()>> + 'static,
{
    sim.spawn(name, 0, move |ctx| async move {
        let in_store = ctx.with(|lab| lab.store(name));
        loop {
            match ctx.pull(in_store).await {
                Entity::Block(id) => {
                    let (actor, prio) =
                        ctx.with(|lab| (lab.blocks[id.0].name.clone(), lab.block_prio(id)));
                    ctx.spawn(actor, prio.level(), move |c| body(c, id));
                }
                _ => return Err(unexpected(name, ctx.now())),
            }
        }
    });
}

/// A worker whose body handles whole batches.
pub(crate) fn spawn_batch_worker<F, Fut>(sim: &Sim<Lab>, name: &'static str, body: F)
where
    F: Fn(Ctx<Lab>, Batch) -> Fut + Copy + 'static,
    Fut: Future<Output = SimResult<()>> + 'static,
{
    sim.spawn(name, 0, move |ctx| async move {
        let in_store = ctx.with(|lab| lab.store(name));
        loop {
            match ctx.pull(in_store).await {
                Entity::Batch(batch) => {
                    let actor = batch.name.clone();
                    ctx.spawn(actor, Priority::Routine.level(), move |c| body(c, batch));
                }
                _ => return Err(unexpected(name, ctx.now())),
            }
        }
    });
}

/// Gathers `batch_size` entities (sampled once per batch) and pushes the
/// batch at the tail of the downstream process's in-store.
pub(crate) fn spawn_batcher(
    sim: &Sim<Lab>,
    name: &'static str,
    batch_size: IntDist,
    out: &'static str,
) {
    sim.spawn(name, 0, move |ctx| async move {
        let (in_store, out_store) = ctx.with(|lab| (lab.store(name), lab.store(out)));
        loop {
            let size = ctx.sample_int(&batch_size).max(1) as usize;
            let mut items = Vec::with_capacity(size);
            for _ in 0..size {
                items.push(ctx.pull(in_store).await);
            }
            let batch_name = ctx.with(Lab::next_batch_name);
            trace!(batch = %batch_name, size, "batch assembled");
            ctx.push(
                out_store,
                Entity::Batch(Batch {
                    name: batch_name,
                    items,
                }),
            );
        }
    });
}

/// Which attribute on the parent carries the expected child count.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CountAttr {
    /// Children are blocks; the parent specimen's `num_blocks`.
    NumBlocks,
    /// Children are slides; the parent block's `num_slides`.
    NumSlides,
}

impl CountAttr {
    fn name(self) -> &'static str {
        match self {
            Self::NumBlocks => "num_blocks",
            Self::NumSlides => "num_slides",
        }
    }
}

/// Pools children by parent; once the expected count is reached, pushes the
/// parent (sorted by its priority) downstream and discards the group.
pub(crate) fn spawn_collator(
    sim: &Sim<Lab>,
    name: &'static str,
    attr: CountAttr,
    out: &'static str,
) {
    sim.spawn(name, 0, move |ctx| async move {
        let (in_store, out_store) = ctx.with(|lab| (lab.store(name), lab.store(out)));
        let mut pool: HashMap<String, u32> = HashMap::new();
        loop {
            let item = ctx.pull(in_store).await;
            let t = ctx.now();
            let (parent, key, expected, prio) = ctx.with(|lab| match (attr, &item) {
                (CountAttr::NumBlocks, Entity::Block(b)) => {
                    let spec = lab.blocks[b.0].specimen;
                    let key = lab.specimens[spec.0].name.clone();
                    let expected = lab
                        .specimen_data
                        .get(&key)
                        .and_then(|attrs| attrs.get("num_blocks"))
                        .and_then(|v| match v {
                            crate::entities::AttrValue::Int(n) => Some(*n as u32),
                            _ => None,
                        })
                        .ok_or_else(|| SimError::CollationStall {
                            parent: key.clone(),
                            child: lab.blocks[b.0].name.clone(),
                            attr: attr.name().to_owned(),
                            clock: t,
                        })?;
                    Ok((
                        Entity::Specimen(spec),
                        key,
                        expected,
                        lab.specimens[spec.0].prio,
                    ))
                }
                (CountAttr::NumSlides, Entity::Slide(s)) => {
                    let block = lab.slides[s.0].block;
                    let key = lab.blocks[block.0].name.clone();
                    let expected =
                        lab.blocks[block.0]
                            .num_slides
                            .ok_or_else(|| SimError::CollationStall {
                                parent: key.clone(),
                                child: lab.slides[s.0].name.clone(),
                                attr: attr.name().to_owned(),
                                clock: t,
                            })?;
                    Ok((Entity::Block(block), key, expected, lab.block_prio(block)))
                }
                _ => Err(unexpected(name, t)),
            })?;
            let count = pool.entry(key.clone()).or_insert(0);
            *count += 1;
            if *count == expected {
                pool.remove(&key);
                trace!(parent = %key, expected, "collation complete");
                ctx.push_sorted(out_store, parent, prio.level());
            }
        }
    });
}

/// Moves entities or batches to the next stage under a runner claim:
/// collect, outbound, unload (batches dissolve here), return, release.
pub(crate) fn spawn_delivery(
    sim: &Sim<Lab>,
    name: &'static str,
    runner: ResourceId,
    durations: RunnerDurations,
    out: &'static str,
) {
    sim.spawn(name, 0, move |ctx| async move {
        let (in_store, out_store) = ctx.with(|lab| (lab.store(name), lab.store(out)));
        loop {
            let entity = ctx.pull(in_store).await;
            let prio = ctx.with(|lab| lab.entity_prio(&entity));
            ctx.seize_one(runner, 1, prio.level()).await?;

            ctx.hold(durations.collect).await;
            ctx.hold(durations.outbound).await;

            ctx.hold(durations.unload).await;
            match entity {
                Entity::Batch(batch) => {
                    for item in batch.items {
                        let p = ctx.with(|lab| lab.entity_prio(&item));
                        ctx.push_sorted(out_store, item, p.level());
                    }
                }
                single => {
                    let p = ctx.with(|lab| lab.entity_prio(&single));
                    ctx.push_sorted(out_store, single, p.level());
                }
            }

            ctx.hold(durations.ret).await;
            ctx.release_all()?;
        }
    });
}

/// Cycles the 168-hour weekly rate vector; each hour with a positive rate
/// gets a sub-generator creating specimens at Exponential(rate)
/// inter-arrival times.
pub(crate) fn spawn_arrival_generator(
    sim: &Sim<Lab>,
    label: &'static str,
    rates: Vec<f64>,
    cancer: bool,
) {
    sim.spawn(label, 0, move |ctx| async move {
        let mut hour = 0usize;
        loop {
            let rate = rates[hour % rates.len()];
            hour += 1;
            if rate > 0.0 {
                let iat = Dist::exponential(rate)?;
                ctx.spawn(format!("{label}.sub"), 0, move |c| {
                    arrival_burst(c, iat, 1.0, cancer)
                });
            }
            ctx.hold(1.0).await;
        }
    });
}

/// Creates specimens for one rate window, then stops.
async fn arrival_burst(ctx: Ctx<Lab>, iat: Dist, window: f64, cancer: bool) -> SimResult<()> {
    let mut elapsed = 0.0;
    loop {
        let dt = ctx.sample(&iat);
        elapsed += dt;
        if elapsed > window {
            return Ok(());
        }
        ctx.hold(dt).await;
        create_specimen(&ctx, cancer);
    }
}

/// Samples a newborn specimen's source and priority, records it in
/// `specimen_data`, and starts it through reception.
pub(crate) fn create_specimen(ctx: &Ctx<Lab>, cancer: bool) -> SpecimenId {
    let r_source = ctx.u01();
    let r_prio = ctx.u01();
    let (id, name, prio) = ctx.with(|lab| {
        let g = lab.globals.clone();
        let source = if r_source < g.prob_internal {
            Source::Internal
        } else {
            Source::External
        };
        let (p_urgent, p_priority, base) = if cancer {
            (g.prob_urgent_cancer, g.prob_priority_cancer, Priority::Cancer)
        } else {
            (
                g.prob_urgent_non_cancer,
                g.prob_priority_non_cancer,
                Priority::Routine,
            )
        };
        let prio = if r_prio < p_urgent {
            Priority::Urgent
        } else if r_prio < p_urgent + p_priority {
            Priority::Priority
        } else {
            base
        };
        let id = lab.new_specimen(prio, source, cancer);
        (id, lab.specimens[id.0].name.clone(), prio)
    });
    trace!(specimen = %name, ?prio, "specimen arrived");
    ctx.spawn(name, prio.level(), move |c| async move {
        let store = c.with(|lab| lab.store("arrive_reception"));
        c.push(store, Entity::Specimen(id));
        Ok(())
    });
    id
}
