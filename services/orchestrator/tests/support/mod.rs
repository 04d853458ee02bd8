#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use orchestrator::{BackendError, BackendInfo, OrchestrationState, Orchestrator, SimulationBackend};
use seismic::{
    CalculationRequest, JobCreated, JobId, JobState, JobStatusReport, ProgressDetails,
    SourceParameters, TravelTimes, ValidatedRequest,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Calculate,
    TravelTimes,
    RunSimulation,
    JobStatus(String),
}

/// In-memory backend with canned responses and optional gates that hold a
/// call open until the test releases it.
pub struct ScriptedBackend {
    calls: Mutex<Vec<(Call, Instant)>>,
    calculate: Mutex<Result<SourceParameters, BackendError>>,
    travel: Mutex<Result<TravelTimes, BackendError>>,
    submit: Mutex<Result<JobCreated, BackendError>>,
    statuses: Mutex<VecDeque<Result<JobStatusReport, BackendError>>>,
    hold_calculate: Mutex<Option<Arc<Semaphore>>>,
    hold_status: Mutex<Option<(usize, Arc<Semaphore>)>>,
    status_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedBackend {
    /// Every call succeeds; the job reports `running` until told otherwise.
    pub fn happy() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            calculate: Mutex::new(Ok(source_params())),
            travel: Mutex::new(Ok(TravelTimes::default())),
            submit: Mutex::new(Ok(JobCreated {
                job_id: JobId::from("abc"),
                status: Some("queued".into()),
                message: None,
            })),
            statuses: Mutex::new(VecDeque::new()),
            hold_calculate: Mutex::new(None),
            hold_status: Mutex::new(None),
            status_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_calculate(self, r: Result<SourceParameters, BackendError>) -> Self {
        *self.calculate.lock() = r;
        self
    }

    pub fn with_travel_times(self, r: Result<TravelTimes, BackendError>) -> Self {
        *self.travel.lock() = r;
        self
    }

    pub fn with_submit(self, r: Result<JobCreated, BackendError>) -> Self {
        *self.submit.lock() = r;
        self
    }

    pub fn with_statuses(self, s: Vec<Result<JobStatusReport, BackendError>>) -> Self {
        *self.statuses.lock() = s.into();
        self
    }

    /// The first `calculate` call waits on the returned gate.
    pub fn hold_first_calculate(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.hold_calculate.lock() = Some(gate.clone());
        gate
    }

    /// The `n`-th (1-based) status query waits on the returned gate.
    pub fn hold_status_call(&self, n: usize) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.hold_status.lock() = Some((n, gate.clone()));
        gate
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn status_times(&self) -> Vec<Instant> {
        self.calls
            .lock()
            .iter()
            .filter(|(c, _)| matches!(c, Call::JobStatus(_)))
            .map(|(_, t)| *t)
            .collect()
    }

    pub fn status_call_count(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().push((call, Instant::now()));
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SimulationBackend for ScriptedBackend {
    async fn calculate(&self, _request: &CalculationRequest) -> Result<SourceParameters, BackendError> {
        self.record(Call::Calculate);
        let gate = self.hold_calculate.lock().take();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await;
        }
        self.calculate.lock().clone()
    }

    async fn travel_times(&self, _request: &CalculationRequest) -> Result<TravelTimes, BackendError> {
        self.record(Call::TravelTimes);
        self.travel.lock().clone()
    }

    async fn run_simulation(&self, _request: &CalculationRequest) -> Result<JobCreated, BackendError> {
        self.record(Call::RunSimulation);
        self.submit.lock().clone()
    }

    async fn job_status(&self, job_id: &JobId) -> Result<JobStatusReport, BackendError> {
        self.record(Call::JobStatus(job_id.to_string()));
        let n = self.status_calls.fetch_add(1, Ordering::SeqCst) + 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        // give a concurrent poll the chance to overlap
        tokio::task::yield_now().await;

        let gate = {
            let hold = self.hold_status.lock();
            match &*hold {
                Some((at, gate)) if *at == n => Some(gate.clone()),
                _ => None,
            }
        };
        if let Some(gate) = gate {
            let _permit = gate.acquire().await;
        }

        self.statuses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(JobStatusReport::new(JobState::Running)))
    }

    fn info(&self) -> BackendInfo {
        BackendInfo {
            name: "scripted".into(),
            base_url: "memory://".into(),
        }
    }
}

pub fn source_params() -> SourceParameters {
    serde_json::from_value(serde_json::json!({
        "length": 50000.0,
        "width": 25000.0,
        "dislocation": 1.5,
        "seismic_moment": 2.2e20,
        "tsunami_warning": "Genera tsunami"
    }))
    .unwrap()
}

pub fn request() -> ValidatedRequest {
    CalculationRequest {
        magnitude: 7.5,
        depth: 10.0,
        latitude: -20.5,
        longitude: -70.5,
        datetime: Utc.with_ymd_and_hms(2024, 5, 10, 8, 30, 0).unwrap(),
    }
    .validate()
    .unwrap()
}

pub fn running_steps(current_step: u32, total_steps: u32) -> Result<JobStatusReport, BackendError> {
    Ok(JobStatusReport {
        details: Some(ProgressDetails::Steps { current_step, total_steps }),
        ..JobStatusReport::new(JobState::Running)
    })
}

pub fn completed(download_url: &str) -> Result<JobStatusReport, BackendError> {
    Ok(JobStatusReport {
        download_url: Some(download_url.to_string()),
        ..JobStatusReport::new(JobState::Completed)
    })
}

pub fn failed(error: Option<&str>) -> Result<JobStatusReport, BackendError> {
    Ok(JobStatusReport {
        error: error.map(str::to_string),
        ..JobStatusReport::new(JobState::Failed)
    })
}

pub async fn wait_terminal(orch: &Orchestrator) -> OrchestrationState {
    let mut rx = orch.subscribe();
    let state = rx.wait_for(|s| s.is_terminal()).await.unwrap();
    state.clone()
}

/// Waits until the backend has seen `n` status queries.
pub async fn wait_status_calls(backend: &ScriptedBackend, n: usize) {
    while backend.status_call_count() < n {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}
