use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::SimulationBackend;
use crate::error::RunError;
use crate::state::{OrchestrationState, StateStore};

/// Everything one calculation run needs. Every await goes through `guard`,
/// every state write through `apply`.
pub(crate) struct RunContext {
    pub run_id: Uuid,
    pub token: CancellationToken,
    pub store: StateStore,
    pub backend: Arc<dyn SimulationBackend>,
    pub poll_every: Duration,
}

impl RunContext {
    /// Drives `fut` until it finishes or the run is cancelled (`None`).
    /// Cancelling drops the future, which aborts an in-flight request.
    pub async fn guard<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            out = fut => Some(out),
        }
    }

    pub fn apply<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut OrchestrationState),
    {
        let applied = self.store.apply_if_live(&self.token, f);
        if !applied {
            debug!(run_id=%self.run_id, "run cancelled; update dropped");
        }
        applied
    }

    pub fn fail(&self, err: RunError) {
        warn!(run_id=%self.run_id, error=%err, "run failed");
        self.apply(|s| s.fail(err));
    }
}
