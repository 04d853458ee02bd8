use tokio::time::sleep;
use tracing::{debug, info, warn};

use seismic::{JobId, JobState, JobStatusReport};

use crate::error::RunError;
use crate::progress;
use crate::run::RunContext;
use crate::state::{OrchestrationState, Stage};

/// Polls `job_id` until it is terminal, the query fails, or the run is cancelled.
///
/// One query at a time: the next one is only scheduled after the previous
/// response was applied.
pub(crate) async fn poll_job(ctx: &RunContext, job_id: &JobId) {
    let mut polls: u32 = 0;

    loop {
        polls += 1;
        let report = match ctx.guard(ctx.backend.job_status(job_id)).await {
            None => return,
            Some(Ok(r)) => r,
            Some(Err(e)) => {
                warn!(run_id=%ctx.run_id, job_id=%job_id, polls, "poller: status query failed");
                ctx.fail(RunError::polling_failed(&e));
                return;
            }
        };

        debug!(run_id=%ctx.run_id, job_id=%job_id, polls, status=%report.status, "poller: status");
        let terminal = report.is_terminal();
        if !ctx.apply(|s| merge(s, report)) {
            return;
        }
        if terminal {
            info!(run_id=%ctx.run_id, job_id=%job_id, polls, "poller: job finished");
            return;
        }

        if ctx.guard(sleep(ctx.poll_every)).await.is_none() {
            return;
        }
    }
}

fn merge(state: &mut OrchestrationState, report: JobStatusReport) {
    match report.status {
        JobState::Completed => {
            state.stage = Stage::Complete;
            state.advance(progress::COMPLETE);
        }
        JobState::Failed => {
            state.fail(RunError::job_failed(report.error.as_deref()));
        }
        _ => {
            state.stage = Stage::Processing;
            state.progress = progress::estimate(state.progress, &report);
        }
    }
    state.job_status = Some(report);
}
