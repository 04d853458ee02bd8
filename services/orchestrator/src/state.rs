use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use seismic::{JobId, JobStatusReport, SourceParameters, TravelTimes};

use crate::error::RunError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Idle,
    Calculating,
    TravelTimes,
    Processing,
    Complete,
    Error,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Complete | Stage::Error)
    }

    pub fn is_busy(self) -> bool {
        matches!(self, Stage::Calculating | Stage::TravelTimes | Stage::Processing)
    }
}

/// What the UI renders from. Only the orchestrator writes it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrchestrationState {
    pub stage: Stage,
    pub progress: u8,
    pub error: Option<RunError>,
    pub source_params: Option<SourceParameters>,
    pub travel_times: Option<TravelTimes>,
    pub job_id: Option<JobId>,
    pub job_status: Option<JobStatusReport>,
}

impl Default for OrchestrationState {
    fn default() -> Self {
        Self {
            stage: Stage::Idle,
            progress: 0,
            error: None,
            source_params: None,
            travel_times: None,
            job_id: None,
            job_status: None,
        }
    }
}

impl OrchestrationState {
    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    pub fn is_busy(&self) -> bool {
        self.stage.is_busy()
    }

    /// Moves progress forward to `to`; never backwards, never past 100.
    pub(crate) fn advance(&mut self, to: u8) {
        self.progress = self.progress.max(to.min(100));
    }

    pub(crate) fn fail(&mut self, err: RunError) {
        self.stage = Stage::Error;
        self.error = Some(err);
    }
}

/// Latest [`OrchestrationState`] plus its subscribers.
#[derive(Clone)]
pub struct StateStore {
    tx: Arc<watch::Sender<OrchestrationState>>,
}

impl StateStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(OrchestrationState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> OrchestrationState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<OrchestrationState> {
        self.tx.subscribe()
    }

    pub(crate) fn replace(&self, state: OrchestrationState) {
        self.tx.send_replace(state);
    }

    /// Applies `f` unless `token` is cancelled. The check runs under the
    /// channel's write lock, so a reset that cancelled first always wins.
    pub(crate) fn apply_if_live<F>(&self, token: &CancellationToken, f: F) -> bool
    where
        F: FnOnce(&mut OrchestrationState),
    {
        self.tx.send_if_modified(|state| {
            if token.is_cancelled() {
                return false;
            }
            f(state);
            true
        })
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
