//! Block and quality check.
//!
//! Slides are already scanned, so there is no hand-off to the
//! histopathologist here; batching and delivery are not part of this stage.

use histolab_sim::{Ctx, Sim, SimResult};

use crate::entities::{Entity, SpecimenId};
use crate::process::spawn_specimen_worker;
use crate::world::Lab;

pub(crate) fn register(sim: &Sim<Lab>) {
    spawn_specimen_worker(sim, "qc", qc);
}

async fn qc(ctx: Ctx<Lab>, spec: SpecimenId) -> SimResult<()> {
    let t = ctx.now();
    let (d, staff, prio) = ctx.with(|lab| {
        lab.wips.in_qc.incr(t);
        lab.timestamp(spec, "qc_start", t);
        (
            lab.durations.clone(),
            lab.res.qc_staff,
            lab.specimens[spec.0].prio,
        )
    });

    ctx.seize_one(staff, 1, prio.level()).await?;
    ctx.hold(&d.block_and_quality_check).await;
    ctx.release_all()?;

    let t = ctx.now();
    let out = ctx.with(|lab| {
        lab.wips.in_qc.decr(t);
        lab.timestamp(spec, "qc_end", t);
        lab.store("assign_histopath")
    });
    ctx.push(out, Entity::Specimen(spec));
    Ok(())
}
