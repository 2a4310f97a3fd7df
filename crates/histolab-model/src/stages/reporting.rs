//! Histopathologist assignment and report writing.

use histolab_sim::{Ctx, Sim, SimResult};

use crate::entities::{Entity, SpecimenId};
use crate::process::spawn_specimen_worker;
use crate::world::Lab;

pub(crate) fn register(sim: &Sim<Lab>) {
    spawn_specimen_worker(sim, "assign_histopath", assign_histopath);
    spawn_specimen_worker(sim, "report", report);
}

/// Assigns a histopathologist to the specimen.
async fn assign_histopath(ctx: Ctx<Lab>, spec: SpecimenId) -> SimResult<()> {
    let (d, staff, prio) = ctx.with(|lab| {
        (
            lab.durations.clone(),
            lab.res.qc_staff,
            lab.specimens[spec.0].prio,
        )
    });
    ctx.seize_one(staff, 1, prio.level()).await?;
    ctx.hold(&d.assign_histopathologist).await;
    ctx.release_all()?;

    let out = ctx.with(|lab| lab.store("report"));
    ctx.push(out, Entity::Specimen(spec));
    Ok(())
}

/// Writes the final histopathological report; the specimen leaves the
/// system here.
async fn report(ctx: Ctx<Lab>, spec: SpecimenId) -> SimResult<()> {
    let t = ctx.now();
    let (d, pathologist, prio) = ctx.with(|lab| {
        lab.wips.in_reporting.incr(t);
        lab.timestamp(spec, "reporting_start", t);
        (
            lab.durations.clone(),
            lab.res.histopathologist,
            lab.specimens[spec.0].prio,
        )
    });

    ctx.seize_one(pathologist, 1, prio.level()).await?;
    ctx.hold(&d.write_report).await;
    ctx.release_all()?;

    let t = ctx.now();
    ctx.with(|lab| {
        lab.wips.in_reporting.decr(t);
        lab.timestamp(spec, "reporting_end", t);
        lab.wips.total.decr(t);
    });
    Ok(())
}
