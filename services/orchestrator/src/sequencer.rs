use tracing::info;

use seismic::{CalculationRequest, JobId};

use crate::error::{RunError, Step};
use crate::progress;
use crate::run::RunContext;
use crate::state::Stage;

/// Runs calculate -> travel times -> submit, stopping at the first failure.
/// Returns the job to poll, or `None` if the run failed or was cancelled.
pub(crate) async fn run_stages(ctx: &RunContext, request: &CalculationRequest) -> Option<JobId> {
    // 1) source parameters
    info!(run_id=%ctx.run_id, magnitude=request.magnitude, depth=request.depth, "sequencer: calculate");
    let params = match ctx.guard(ctx.backend.calculate(request)).await? {
        Ok(p) => p.with_epicenter_fallback(request),
        Err(e) => {
            ctx.fail(RunError::stage_failed(Step::Calculate, &e));
            return None;
        }
    };
    let applied = ctx.apply(|s| {
        s.source_params = Some(params);
        s.stage = Stage::TravelTimes;
        s.advance(progress::CALCULATED);
    });
    if !applied {
        return None;
    }

    // 2) travel times
    info!(run_id=%ctx.run_id, "sequencer: travel times");
    let travel = match ctx.guard(ctx.backend.travel_times(request)).await? {
        Ok(t) => t,
        Err(e) => {
            ctx.fail(RunError::stage_failed(Step::TravelTimes, &e));
            return None;
        }
    };
    let applied = ctx.apply(|s| {
        s.travel_times = Some(travel);
        s.advance(progress::TRAVEL_TIMES_READY);
    });
    if !applied {
        return None;
    }

    // 3) submit the simulation
    info!(run_id=%ctx.run_id, "sequencer: submit");
    let created = match ctx.guard(ctx.backend.run_simulation(request)).await? {
        Ok(c) => c,
        Err(e) => {
            ctx.fail(RunError::stage_failed(Step::Submit, &e));
            return None;
        }
    };
    let job_id = created.job_id;
    let applied = ctx.apply(|s| {
        s.job_id = Some(job_id.clone());
        s.stage = Stage::Processing;
        s.advance(progress::SUBMITTED);
    });
    if !applied {
        return None;
    }

    info!(run_id=%ctx.run_id, job_id=%job_id, message=?created.message, "sequencer: job submitted");
    Some(job_id)
}
