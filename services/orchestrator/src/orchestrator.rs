use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use seismic::{JobId, ValidatedRequest};

use crate::backend::{BackendInfo, SimulationBackend};
use crate::backend_http::HttpBackend;
use crate::config::{AppConfig, DEFAULT_POLL_INTERVAL};
use crate::run::RunContext;
use crate::state::{OrchestrationState, Stage, StateStore};
use crate::{poller, progress, sequencer};

struct ActiveRun {
    run_id: Uuid,
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Drives calculation runs against a [`SimulationBackend`] and publishes
/// their [`OrchestrationState`].
///
/// At most one run is live: starting a run or calling [`reset`](Self::reset)
/// cancels the previous one, and nothing it produces afterwards reaches the
/// state. Runs are spawned on the current tokio runtime.
pub struct Orchestrator {
    backend: Arc<dyn SimulationBackend>,
    poll_every: Duration,
    store: StateStore,
    // also serializes start/reset against each other
    active: Mutex<Option<ActiveRun>>,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn SimulationBackend>) -> Self {
        Self {
            backend,
            poll_every: DEFAULT_POLL_INTERVAL,
            store: StateStore::new(),
            active: Mutex::new(None),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(Arc::new(HttpBackend::from_config(cfg))).with_poll_interval(cfg.poll_interval)
    }

    pub fn with_poll_interval(mut self, every: Duration) -> Self {
        self.poll_every = every;
        self
    }

    pub fn backend_info(&self) -> BackendInfo {
        self.backend.info()
    }

    pub fn state(&self) -> OrchestrationState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<OrchestrationState> {
        self.store.subscribe()
    }

    /// Starts a new run for `request`, cancelling whatever was running.
    pub fn submit(&self, request: ValidatedRequest) -> Uuid {
        let request = request.into_inner();
        let initial = OrchestrationState {
            stage: Stage::Calculating,
            ..OrchestrationState::default()
        };

        self.start(initial, move |ctx| async move {
            if let Some(job_id) = sequencer::run_stages(&ctx, &request).await {
                poller::poll_job(&ctx, &job_id).await;
            }
        })
    }

    /// Follows a job submitted earlier (e.g. before the client restarted).
    pub fn resume(&self, job_id: JobId) -> Uuid {
        let initial = OrchestrationState {
            stage: Stage::Processing,
            progress: progress::SUBMITTED,
            job_id: Some(job_id.clone()),
            ..OrchestrationState::default()
        };

        self.start(initial, move |ctx| async move {
            poller::poll_job(&ctx, &job_id).await;
        })
    }

    /// Cancels the live run, if any, and restores the initial state.
    pub fn reset(&self) {
        let mut active = self.active.lock();
        if let Some(run) = active.take() {
            run.token.cancel();
            info!(run_id=%run.run_id, "reset: run cancelled");
        }
        self.store.replace(OrchestrationState::default());
    }

    /// Cancels the live run and waits for its task to exit.
    pub async fn shutdown(self) {
        let run = self.active.lock().take();
        if let Some(run) = run {
            run.token.cancel();
            let _ = run.task.await;
            info!(run_id=%run.run_id, "shutdown: run stopped");
        }
    }

    fn start<F, Fut>(&self, initial: OrchestrationState, body: F) -> Uuid
    where
        F: FnOnce(RunContext) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut active = self.active.lock();
        if let Some(prev) = active.take() {
            prev.token.cancel();
            info!(run_id=%prev.run_id, "run superseded");
        }

        let run_id = Uuid::new_v4();
        let token = CancellationToken::new();
        self.store.replace(initial);

        let ctx = RunContext {
            run_id,
            token: token.clone(),
            store: self.store.clone(),
            backend: self.backend.clone(),
            poll_every: self.poll_every,
        };
        let task = tokio::spawn(body(ctx).instrument(info_span!("run", %run_id)));

        info!(run_id=%run_id, "run started");
        *active = Some(ActiveRun { run_id, token, task });
        run_id
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if let Some(run) = self.active.get_mut().take() {
            run.token.cancel();
        }
    }
}
